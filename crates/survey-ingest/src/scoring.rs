//! Per-strand score aggregation for reconciled dataset uploads.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use survey_model::Strand;

use crate::reconcile::{MatchPolicy, ReferenceQuestions};
use crate::schema::DatasetSheet;

/// Scores of one respondent row, as the server will store them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub row_number: usize,
    pub strand: Strand,
    pub stem_score: i64,
    pub abm_score: i64,
    pub humss_score: i64,
}

impl RecordDraft {
    /// Total for one strand.
    pub fn score(&self, strand: Strand) -> i64 {
        match strand {
            Strand::Stem => self.stem_score,
            Strand::Abm => self.abm_score,
            Strand::Humss => self.humss_score,
        }
    }

    /// Adds `value` to a strand total. Returns `None` on overflow.
    fn add(&mut self, strand: Strand, value: i64) -> Option<()> {
        let total = match strand {
            Strand::Stem => &mut self.stem_score,
            Strand::Abm => &mut self.abm_score,
            Strand::Humss => &mut self.humss_score,
        };
        *total = total.checked_add(value)?;
        Some(())
    }
}

/// An answer that is not a whole number, or whose strand total overflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidScore {
    pub row: usize,
    pub question: String,
    pub value: String,
}

impl fmt::Display for InvalidScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid score for question '{}' in row {}: '{}'",
            self.question, self.row, self.value
        )
    }
}

/// Parses an answer cell. Empty means zero; integral floats are accepted.
fn parse_score(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return Some(0);
    }
    if let Ok(score) = value.parse::<i64>() {
        return Some(score);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|score| score.is_finite() && score.fract() == 0.0)
        .map(|score| score as i64)
}

/// Sums each respondent's answers per strand of the answered question.
///
/// Answers to questions outside the reference set, or whose reference strand
/// is unrecognised, are ignored. Rows without a recognised strand are skipped;
/// [`crate::reconcile`] reports them.
pub fn score_rows(
    sheet: &DatasetSheet,
    reference: &ReferenceQuestions,
    policy: MatchPolicy,
) -> Result<Vec<RecordDraft>, InvalidScore> {
    let strands: HashMap<String, Strand> = reference
        .entries()
        .filter_map(|(text, strand)| strand.map(|s| (policy.key(text), s)))
        .collect();
    // Only the first column matching a reference question is scored.
    let mut scored = HashSet::new();
    let column_strands: Vec<(&str, Strand)> = sheet
        .question_columns
        .iter()
        .filter_map(|col| {
            let key = policy.key(col);
            let strand = *strands.get(&key)?;
            scored.insert(key).then_some((col.as_str(), strand))
        })
        .collect();

    let mut drafts = Vec::with_capacity(sheet.rows.len());
    for row in &sheet.rows {
        let Some(strand) = row.strand_label() else {
            continue;
        };
        let mut draft = RecordDraft {
            row_number: row.row_number,
            strand,
            stem_score: 0,
            abm_score: 0,
            humss_score: 0,
        };
        for (column, question_strand) in &column_strands {
            let value = row.answers.get(*column).map(String::as_str).unwrap_or_default();
            let invalid = || InvalidScore {
                row: row.row_number,
                question: (*column).to_string(),
                value: value.to_string(),
            };
            let score = parse_score(value).ok_or_else(invalid)?;
            draft.add(*question_strand, score).ok_or_else(invalid)?;
        }
        drafts.push(draft);
    }
    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{ValidDatasetRow, ValidQuestionRow};
    use std::collections::BTreeMap;

    fn reference() -> ReferenceQuestions {
        let rows = [("Likes math", "STEM"), ("Likes ledgers", "ABM"), ("Likes history", "HUMSS")];
        ReferenceQuestions::from_rows(
            &rows
                .iter()
                .enumerate()
                .map(|(idx, (text, strand))| ValidQuestionRow {
                    row_number: idx + 2,
                    question_text: (*text).to_string(),
                    strand: (*strand).to_string(),
                })
                .collect::<Vec<_>>(),
        )
    }

    fn sheet(rows: &[(&str, [&str; 3])]) -> DatasetSheet {
        let columns = ["Likes math", "Likes ledgers", "Likes history"];
        DatasetSheet {
            strand_column: Some("Strand".to_string()),
            question_columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(idx, (strand, answers))| ValidDatasetRow {
                    row_number: idx + 2,
                    strand: (*strand).to_string(),
                    answers: columns
                        .iter()
                        .zip(answers)
                        .map(|(c, a)| ((*c).to_string(), (*a).to_string()))
                        .collect::<BTreeMap<_, _>>(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score(""), Some(0));
        assert_eq!(parse_score(" 4 "), Some(4));
        assert_eq!(parse_score("5.0"), Some(5));
        assert_eq!(parse_score("2.5"), None);
        assert_eq!(parse_score("yes"), None);
    }

    #[test]
    fn test_scores_are_summed_per_strand() {
        let drafts = score_rows(
            &sheet(&[("STEM", ["5", "1", ""]), ("Humanities and Social Sciences", ["2", "3", "4"])]),
            &reference(),
            MatchPolicy::Strict,
        )
        .unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].strand, Strand::Stem);
        assert_eq!(drafts[0].score(Strand::Stem), 5);
        assert_eq!(drafts[0].score(Strand::Humss), 0);
        assert_eq!(drafts[1].strand, Strand::Humss);
        assert_eq!((drafts[1].stem_score, drafts[1].abm_score, drafts[1].humss_score), (2, 3, 4));
    }

    #[test]
    fn test_invalid_score_names_cell() {
        let err = score_rows(
            &sheet(&[("ABM", ["1", "often", "2"])]),
            &reference(),
            MatchPolicy::Strict,
        )
        .unwrap_err();
        assert_eq!(err.row, 2);
        assert_eq!(err.question, "Likes ledgers");
        assert_eq!(
            err.to_string(),
            "Invalid score for question 'Likes ledgers' in row 2: 'often'"
        );
    }

    #[test]
    fn test_overflowing_total_is_invalid_score() {
        let err = score_rows(
            &sheet(&[("STEM", ["9223372036854775807", "1", "0"])]),
            &ReferenceQuestions::from_rows(&[
                ValidQuestionRow {
                    row_number: 2,
                    question_text: "Likes math".to_string(),
                    strand: "STEM".to_string(),
                },
                ValidQuestionRow {
                    row_number: 3,
                    question_text: "Likes ledgers".to_string(),
                    strand: "STEM".to_string(),
                },
            ]),
            MatchPolicy::Strict,
        )
        .unwrap_err();
        assert_eq!(err.row, 2);
        assert_eq!(err.question, "Likes ledgers");
        assert_eq!(err.value, "1");
    }

    #[test]
    fn test_question_matched_by_two_columns_is_scored_once() {
        let mut sheet = sheet(&[("STEM", ["3", "1", "0"])]);
        sheet.question_columns.insert(1, "LIKES MATH".to_string());
        sheet.rows[0].answers.insert("LIKES MATH".to_string(), "4".to_string());

        let drafts = score_rows(&sheet, &reference(), MatchPolicy::Strict).unwrap();
        assert_eq!(drafts[0].stem_score, 3);
    }
}
