//! Puzzle data model: the raw content coming from a puzzle source and the
//! randomized, immutable [`Puzzle`] a game session plays against.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of rows (categories) in a puzzle.
pub const ROW_COUNT: usize = 4;

/// Number of words in each row.
pub const WORDS_PER_ROW: usize = 4;

/// Index of the outlier word inside a raw category block, by sheet convention.
pub const SOURCE_OUTLIER_INDEX: usize = 3;

// ============================================================================
// RAW CONTENT (as authored)
// ============================================================================

/// One authored category block: a name, four words and the index of the
/// word that does not belong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCategory {
    pub name: String,
    pub words: Vec<String>,
    pub outlier_index: Option<usize>,
    pub explanation: String,
}

impl RawCategory {
    /// Builds a block following the sheet convention (last word is the outlier).
    pub fn conventional(name: &str, words: [&str; WORDS_PER_ROW], explanation: &str) -> Self {
        Self {
            name: name.to_string(),
            words: words.iter().map(|w| w.to_string()).collect(),
            outlier_index: Some(SOURCE_OUTLIER_INDEX),
            explanation: explanation.to_string(),
        }
    }

    pub fn outlier_word(&self) -> Option<&str> {
        self.outlier_index
            .and_then(|index| self.words.get(index))
            .map(String::as_str)
    }
}

/// Authored puzzle content before shuffling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPuzzle {
    pub date: Option<NaiveDate>,
    pub categories: Vec<RawCategory>,
    pub meta_category: String,
    /// Index into `categories` of the block whose outlier is the oddest one out.
    pub ultimate_category: Option<usize>,
    pub ultimate_explanation: String,
}

// ============================================================================
// RANDOMIZED PUZZLE (as played)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    pub category: String,
    pub words: Vec<Word>,
    pub outlier_index: usize,
    pub explanation: String,
}

impl Row {
    pub fn outlier(&self) -> &Word {
        &self.words[self.outlier_index]
    }

    pub fn is_outlier(&self, word_index: usize) -> bool {
        word_index == self.outlier_index
    }
}

/// A shuffled puzzle instance. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    pub date: Option<NaiveDate>,
    pub rows: Vec<Row>,
    pub meta_category: String,
    pub ultimate_outlier_row_index: usize,
    pub ultimate_explanation: String,
}

impl Puzzle {
    pub fn row(&self, row_index: usize) -> Option<&Row> {
        self.rows.get(row_index)
    }

    pub fn is_ultimate(&self, row_index: usize) -> bool {
        row_index == self.ultimate_outlier_row_index
    }

    /// The oddest one out: the outlier word of the ultimate row.
    pub fn ultimate_word(&self) -> &Word {
        self.rows[self.ultimate_outlier_row_index].outlier()
    }

    /// Outliers that share the meta-category (every row but the ultimate one).
    pub fn meta_members(&self) -> Vec<&Word> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.is_ultimate(*index))
            .map(|(_, row)| row.outlier())
            .collect()
    }

    pub fn word_count(&self) -> usize {
        self.rows.iter().map(|row| row.words.len()).sum()
    }
}
