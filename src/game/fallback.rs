use crate::game::puzzle::{Puzzle, RawCategory, RawPuzzle};
use crate::game::randomizer::randomize_puzzle;

/// Hardcoded puzzle served whenever the puzzle source fails or hands back
/// malformed content.
pub fn fallback_raw_puzzle() -> RawPuzzle {
    RawPuzzle {
        date: None,
        categories: vec![
            RawCategory::conventional(
                "Planets",
                ["Mars", "Venus", "Saturn", "Apollo"],
                "Apollo is a Greek god, not a planet.",
            ),
            RawCategory::conventional(
                "Greek Gods",
                ["Zeus", "Athena", "Hermes", "Gemini"],
                "Gemini is a constellation and star sign, not a god.",
            ),
            RawCategory::conventional(
                "Card Games",
                ["Poker", "Bridge", "Rummy", "Solitaire"],
                "Solitaire is played alone; the others need several players.",
            ),
            RawCategory::conventional(
                "Zodiac Signs",
                ["Leo", "Aries", "Virgo", "Mercury"],
                "Mercury is a planet, not a sign of the zodiac.",
            ),
        ],
        meta_category: "NASA space programs".to_string(),
        ultimate_category: Some(2),
        ultimate_explanation: "Apollo, Gemini and Mercury were NASA crewed spaceflight programs. Solitaire was not."
            .to_string(),
    }
}

/// The fallback content, shuffled like any other puzzle.
pub fn fallback_puzzle() -> Puzzle {
    match randomize_puzzle(&fallback_raw_puzzle()) {
        Ok(puzzle) => puzzle,
        // The fallback content always satisfies the shape contract.
        Err(e) => unreachable!("fallback puzzle is malformed: {}", e),
    }
}
