pub mod puzzle_source;
pub mod session_manager;
pub mod sheet;
