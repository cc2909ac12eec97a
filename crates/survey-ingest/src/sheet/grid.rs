//! Header detection and row assembly shared by the CSV and workbook readers.

use std::collections::{BTreeMap, HashSet};

use super::{ParsedSheet, RawRow};

/// Raw cell grid: `(row_number, cells)` in sheet order.
pub(crate) type Grid = Vec<(usize, Vec<String>)>;

/// Placeholder name for a header cell left blank.
const EMPTY_HEADER: &str = "__EMPTY";

/// Comparison key for header names: trimmed, lowercased, inner whitespace
/// collapsed to single spaces.
pub fn header_key(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Returns true for the generated name of a blank header cell.
pub(crate) fn is_placeholder_header(header: &str) -> bool {
    header
        .strip_prefix(EMPTY_HEADER)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
}

fn is_blank(cells: &[String]) -> bool {
    cells.iter().all(|cell| cell.trim().is_empty())
}

/// Names every header column, giving blank cells a placeholder and suffixing
/// repeats with `_1`, `_2`, ...
fn name_headers(cells: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(cells.len());

    for cell in cells {
        let base = match cell.trim() {
            "" => EMPTY_HEADER,
            trimmed => trimmed,
        };
        let mut name = base.to_string();
        let mut suffix = 0usize;
        while taken.contains(&name) {
            suffix += 1;
            name = format!("{base}_{suffix}");
        }
        taken.insert(name.clone());
        headers.push(name);
    }

    headers
}

/// Builds a [`ParsedSheet`] from a cell grid.
///
/// The first non-blank row is the header. Blank rows after it are skipped.
/// Short rows are padded with empty strings, cells beyond the last header are
/// dropped.
pub(crate) fn assemble(grid: Grid) -> ParsedSheet {
    let mut rows = grid.into_iter().filter(|(_, cells)| !is_blank(cells));

    let Some((_, header_cells)) = rows.next() else {
        return ParsedSheet::default();
    };

    // Trailing blank header cells carry no column.
    let width = header_cells
        .iter()
        .rposition(|cell| !cell.trim().is_empty())
        .map_or(0, |last| last + 1);
    let headers = name_headers(&header_cells[..width]);

    let rows = rows
        .map(|(row_number, cells)| {
            let cells: BTreeMap<String, String> = headers
                .iter()
                .enumerate()
                .map(|(idx, header)| {
                    let value = cells.get(idx).map(|v| v.trim()).unwrap_or_default();
                    (header.clone(), value.to_string())
                })
                .collect();
            RawRow { row_number, cells }
        })
        .filter(|row| row.cells.values().any(|v| !v.is_empty()))
        .collect();

    ParsedSheet { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .enumerate()
            .map(|(idx, cells)| (idx + 1, cells.iter().map(|c| (*c).to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_header_key() {
        assert_eq!(header_key("  Questions "), "questions");
        assert_eq!(header_key("Current\t STRAND"), "current strand");
    }

    #[test]
    fn test_first_non_blank_row_is_header() {
        let sheet = assemble(grid(&[
            &["", ""],
            &["Questions", "Strand"],
            &["", ""],
            &["Q1", "STEM"],
        ]));
        assert_eq!(sheet.headers, vec!["Questions", "Strand"]);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].row_number, 4);
        assert_eq!(sheet.rows[0].get("Questions"), "Q1");
    }

    #[test]
    fn test_blank_and_duplicate_headers_are_named() {
        let sheet = assemble(grid(&[&["A", "", "A", "", "A", "B"], &["1", "2", "3", "4", "5", "6"]]));
        assert_eq!(
            sheet.headers,
            vec!["A", "__EMPTY", "A_1", "__EMPTY_1", "A_2", "B"]
        );
        assert_eq!(sheet.rows[0].get("A_2"), "5");
    }

    #[test]
    fn test_placeholder_headers() {
        assert!(is_placeholder_header("__EMPTY"));
        assert!(is_placeholder_header("__EMPTY_2"));
        assert!(!is_placeholder_header("Questions"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let sheet = assemble(grid(&[&["Questions", "Strand"], &["Q1"]]));
        assert_eq!(sheet.rows[0].get("Strand"), "");
    }

    #[test]
    fn test_header_only_sheet_is_empty() {
        let sheet = assemble(grid(&[&["Questions", "Strand"]]));
        assert_eq!(sheet.headers.len(), 2);
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_no_rows_at_all() {
        let sheet = assemble(Vec::new());
        assert!(sheet.headers.is_empty());
        assert!(sheet.is_empty());
    }
}
