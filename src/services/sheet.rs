// src/services/sheet.rs - Puzzle sheet (CSV export of the authoring spreadsheet)
//
// One puzzle per line. Columns:
//   date, meta_category, ultimate_category, ultimate_explanation,
//   then for n in 1..=4: category_n, word_n_1 .. word_n_4, explanation_n
// Word 4 of each category is the outlier.

use std::collections::HashMap;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::game::puzzle::{RawCategory, RawPuzzle, ROW_COUNT, SOURCE_OUTLIER_INDEX, WORDS_PER_ROW};
use crate::game::randomizer::validate_raw_puzzle;
use crate::{OddestOneOutError, Result};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Parses the whole sheet. Lines that do not describe a well-formed puzzle
/// are skipped with a warning; a header missing a required column fails.
pub fn parse_sheet(text: &str) -> Result<Vec<RawPuzzle>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = SheetColumns::from_headers(reader.headers()?)?;
    let mut puzzles = Vec::new();

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        match columns.parse_record(&record) {
            Ok(puzzle) => puzzles.push(puzzle),
            // +2: one for the header, one for 1-based line numbers
            Err(e) => log::warn!("⚠️ Skipping sheet line {}: {}", line + 2, e),
        }
    }

    log::info!("📄 Sheet parsed: {} puzzles", puzzles.len());
    Ok(puzzles)
}

pub fn parse_sheet_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value.trim(), format).ok())
}

struct SheetColumns {
    index: HashMap<String, usize>,
}

impl SheetColumns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_lowercase(), i))
            .collect();

        let columns = Self { index };
        for name in required_columns() {
            if !columns.index.contains_key(&name) {
                return Err(OddestOneOutError::MalformedPuzzleInput(format!(
                    "sheet is missing column '{}'",
                    name
                )));
            }
        }
        Ok(columns)
    }

    fn field<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.index
            .get(name)
            .and_then(|&i| record.get(i))
            .unwrap_or_default()
    }

    fn parse_record(&self, record: &StringRecord) -> Result<RawPuzzle> {
        let date_field = self.field(record, "date");
        let date = if date_field.is_empty() {
            None
        } else {
            Some(parse_sheet_date(date_field).ok_or_else(|| {
                OddestOneOutError::MalformedPuzzleInput(format!("unreadable date '{}'", date_field))
            })?)
        };

        let categories: Vec<RawCategory> = (1..=ROW_COUNT)
            .map(|n| RawCategory {
                name: self.field(record, &format!("category_{n}")).to_string(),
                words: (1..=WORDS_PER_ROW)
                    .map(|w| self.field(record, &format!("word_{n}_{w}")).to_string())
                    .collect(),
                outlier_index: Some(SOURCE_OUTLIER_INDEX),
                explanation: self.field(record, &format!("explanation_{n}")).to_string(),
            })
            .collect();

        let ultimate_category =
            parse_ultimate_category(self.field(record, "ultimate_category"), &categories);

        let puzzle = RawPuzzle {
            date,
            categories,
            meta_category: self.field(record, "meta_category").to_string(),
            ultimate_category,
            ultimate_explanation: self.field(record, "ultimate_explanation").to_string(),
        };
        validate_raw_puzzle(&puzzle)?;
        Ok(puzzle)
    }
}

/// Accepts either a 1-based position or the category's name.
fn parse_ultimate_category(value: &str, categories: &[RawCategory]) -> Option<usize> {
    if let Ok(position) = value.parse::<usize>() {
        return position.checked_sub(1).filter(|&index| index < categories.len());
    }
    categories
        .iter()
        .position(|category| !value.is_empty() && category.name.eq_ignore_ascii_case(value))
}

fn required_columns() -> Vec<String> {
    let mut columns: Vec<String> = ["date", "meta_category", "ultimate_category", "ultimate_explanation"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    for n in 1..=ROW_COUNT {
        columns.push(format!("category_{n}"));
        columns.extend((1..=WORDS_PER_ROW).map(|w| format!("word_{n}_{w}")));
        columns.push(format!("explanation_{n}"));
    }
    columns
}

/// Header line of a valid sheet, handy for tests and authoring templates.
pub fn sheet_header() -> String {
    required_columns().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn sheet_line(date: &str, ultimate: &str) -> String {
        format!(
            "{date},NASA space programs,{ultimate},Only Solitaire is not a program,\
             Planets,Mars,Venus,Saturn,Apollo,Apollo is a god,\
             Greek Gods,Zeus,Athena,Hermes,Gemini,Gemini is a sign,\
             Card Games,Poker,Bridge,Rummy,Solitaire,Solitaire is solo,\
             Zodiac Signs,Leo,Aries,Virgo,Mercury,Mercury is a planet"
        )
    }

    #[test]
    fn test_parse_sheet_reads_puzzles() {
        let text = format!(
            "{}\n{}\n{}\n",
            sheet_header(),
            sheet_line("2026-10-18", "3"),
            sheet_line("10/19/2026", "Card Games")
        );
        let puzzles = parse_sheet(&text).unwrap();
        assert_eq!(puzzles.len(), 2);

        let first = &puzzles[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2026, 10, 18));
        assert_eq!(first.ultimate_category, Some(2));
        assert_eq!(first.categories[0].name, "Planets");
        assert_eq!(first.categories[0].outlier_word(), Some("Apollo"));
        assert_eq!(first.categories[3].explanation, "Mercury is a planet");
        assert_eq!(puzzles[1].ultimate_category, Some(2));
        assert_eq!(puzzles[1].date, NaiveDate::from_ymd_opt(2026, 10, 19));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let text = format!(
            "{}\n{}\n{}\n{}\n,,,,\n",
            sheet_header(),
            sheet_line("2026-10-18", "9"),
            sheet_line("not a date", "3"),
            sheet_line("2026-10-17", "1"),
        );
        let puzzles = parse_sheet(&text).unwrap();
        assert_eq!(puzzles.len(), 1);
        assert_eq!(puzzles[0].ultimate_category, Some(0));
    }

    #[test]
    fn test_line_with_missing_words_is_skipped() {
        let text = format!("{}\n2026-10-18,meta,1,why,Planets,Mars\n", sheet_header());
        assert!(parse_sheet(&text).unwrap().is_empty());
    }

    #[test]
    fn test_missing_column_fails_the_sheet() {
        let text = "date,meta_category\n2026-10-18,meta\n";
        assert_matches!(
            parse_sheet(text),
            Err(OddestOneOutError::MalformedPuzzleInput(reason)) if reason.contains("ultimate_category")
        );
    }

    #[test]
    fn test_undated_line_is_kept() {
        let text = format!("{}\n{}\n", sheet_header(), sheet_line("", "3"));
        let puzzles = parse_sheet(&text).unwrap();
        assert_eq!(puzzles.len(), 1);
        assert_eq!(puzzles[0].date, None);
    }
}
