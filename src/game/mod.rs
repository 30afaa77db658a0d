pub mod fallback;
pub mod puzzle;
pub mod randomizer;
pub mod resolution;
pub mod sequence;
pub mod session;
pub mod tips;
