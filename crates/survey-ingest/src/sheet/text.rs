//! CSV decoding.

use std::borrow::Cow;

use csv::{ReaderBuilder, StringRecord};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use super::grid::Grid;
use crate::error::{IngestError, Result};

/// Decodes CSV bytes into text.
///
/// A byte order mark selects the encoding. Without one the bytes must be
/// UTF-8, falling back to Windows-1252 for legacy spreadsheet exports.
fn decode(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let text = if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        if had_errors {
            return Err(IngestError::UnsupportedEncoding {
                encoding: format!("malformed {}", encoding.name()),
            });
        }
        text
    } else if let Ok(text) = std::str::from_utf8(bytes) {
        Cow::Borrowed(text)
    } else {
        tracing::warn!(
            expected = UTF_8.name(),
            fallback = WINDOWS_1252.name(),
            "CSV is not valid UTF-8, decoding as legacy encoding"
        );
        let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
        text
    };

    if text.contains('\0') {
        return Err(IngestError::BinaryContent);
    }
    Ok(text)
}

/// Reads CSV bytes into a cell grid. Rows are numbered by source line.
///
/// The reader skips empty lines without counting them, so line numbers are
/// tracked from the raw bytes instead.
pub(crate) fn read_csv_grid(bytes: &[u8]) -> Result<Grid> {
    let text = decode(bytes)?;
    let source = text.as_bytes();
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(source);

    let mut grid = Grid::new();
    let mut record = StringRecord::new();
    let mut line = 1;
    let mut counted = 0;
    loop {
        let mut start = usize::try_from(reader.position().byte()).unwrap_or(source.len());
        while matches!(source.get(start), Some(b'\r' | b'\n')) {
            start += 1;
        }
        let start = start.min(source.len());
        line += newlines(&source[counted.min(start)..start]);
        counted = counted.max(start);

        let more = reader.read_record(&mut record).map_err(|e| IngestError::Csv {
            line: line as u64,
            message: e.to_string(),
        })?;
        if !more {
            break;
        }
        grid.push((line, record.iter().map(str::to_string).collect()));
    }
    Ok(grid)
}

fn newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|b| **b == b'\n').count()
}
