//! Turns authored puzzle content into a playable [`Puzzle`]: rows shuffled
//! into presentation order, words shuffled inside each row, outlier and
//! ultimate positions tracked through both permutations.

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::game::puzzle::{Puzzle, RawCategory, RawPuzzle, Row, Word, ROW_COUNT, WORDS_PER_ROW};
use crate::{OddestOneOutError, Result};

/// Randomizes with the thread-local generator.
pub fn randomize_puzzle(raw: &RawPuzzle) -> Result<Puzzle> {
    randomize_puzzle_with(raw, &mut rand::rng())
}

pub fn randomize_puzzle_with<R: Rng + ?Sized>(raw: &RawPuzzle, rng: &mut R) -> Result<Puzzle> {
    validate_raw_puzzle(raw)?;

    // order[new_position] = original_position
    let row_order = permutation(ROW_COUNT, rng);
    let ultimate_category = raw.ultimate_category.unwrap_or_default();
    let ultimate_outlier_row_index = row_order
        .iter()
        .position(|&original| original == ultimate_category)
        .ok_or_else(|| malformed("ultimate category lost while shuffling rows"))?;

    let rows = row_order
        .iter()
        .map(|&original| shuffle_category(&raw.categories[original], rng))
        .collect::<Result<Vec<Row>>>()?;

    log::debug!(
        "🎲 Puzzle {:?} randomized: row order {:?}, ultimate row {}",
        raw.date,
        row_order,
        ultimate_outlier_row_index
    );

    Ok(Puzzle {
        date: raw.date,
        rows,
        meta_category: raw.meta_category.clone(),
        ultimate_outlier_row_index,
        ultimate_explanation: raw.ultimate_explanation.clone(),
    })
}

/// Checks the shape contract: four blocks of four non-blank words, every
/// block with an outlier in range, and an ultimate block in range.
pub fn validate_raw_puzzle(raw: &RawPuzzle) -> Result<()> {
    if raw.categories.len() != ROW_COUNT {
        return Err(malformed(format!(
            "expected {} categories, found {}",
            ROW_COUNT,
            raw.categories.len()
        )));
    }

    for (index, category) in raw.categories.iter().enumerate() {
        validate_category(index, category)?;
    }

    match raw.ultimate_category {
        None => Err(malformed("no category is marked as the ultimate one")),
        Some(index) if index >= ROW_COUNT => Err(malformed(format!(
            "ultimate category {} is out of range",
            index
        ))),
        Some(_) => Ok(()),
    }
}

fn validate_category(index: usize, category: &RawCategory) -> Result<()> {
    if category.words.len() != WORDS_PER_ROW {
        return Err(malformed(format!(
            "category {} ({}) has {} words, expected {}",
            index,
            category.name,
            category.words.len(),
            WORDS_PER_ROW
        )));
    }
    if category.words.iter().any(|word| word.trim().is_empty()) {
        return Err(malformed(format!(
            "category {} ({}) contains a blank word",
            index, category.name
        )));
    }
    match category.outlier_index {
        None => Err(malformed(format!(
            "category {} ({}) has no outlier",
            index, category.name
        ))),
        Some(outlier) if outlier >= WORDS_PER_ROW => Err(malformed(format!(
            "category {} ({}) outlier index {} is out of range",
            index, category.name, outlier
        ))),
        Some(_) => Ok(()),
    }
}

fn shuffle_category<R: Rng + ?Sized>(category: &RawCategory, rng: &mut R) -> Result<Row> {
    let word_order = permutation(category.words.len(), rng);
    let original_outlier = category.outlier_index.unwrap_or_default();
    let outlier_index = word_order
        .iter()
        .position(|&original| original == original_outlier)
        .ok_or_else(|| malformed(format!("outlier of {} lost while shuffling", category.name)))?;

    let words = word_order
        .iter()
        .map(|&original| Word {
            text: category.words[original].trim().to_string(),
            id: Uuid::new_v4().to_string(),
        })
        .collect();

    Ok(Row {
        id: Uuid::new_v4().to_string(),
        category: category.name.clone(),
        words,
        outlier_index,
        explanation: category.explanation.clone(),
    })
}

/// Unbiased permutation of `0..len` (Fisher–Yates via `SliceRandom::shuffle`).
fn permutation<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order
}

fn malformed(reason: impl Into<String>) -> OddestOneOutError {
    OddestOneOutError::MalformedPuzzleInput(reason.into())
}
