// Line dispatcher
//
// Reads the two-byte type tag, looks up the layout and applies every field.
// Lines with an unknown tag are not an error; they yield `Ok(None)`.

use crate::extract::extract;
use crate::models::{FieldValue, Record};
use crate::schema::{schema_for, FieldSpec};
use std::borrow::Cow;
use thiserror::Error;

/// Longest line accepted, terminator excluded
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// How field bytes become text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decoding {
    /// Invalid UTF-8 in any field fails the line. A field boundary that
    /// splits a valid multibyte character is not invalid; the partial
    /// character decodes as U+FFFD.
    #[default]
    Strict,
    /// Invalid sequences become U+FFFD and the line is kept
    Lossy,
}

impl std::str::FromStr for Decoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Decoding::Strict),
            "lossy" => Ok(Decoding::Lossy),
            other => Err(format!("Invalid decoding: {} (expected strict or lossy)", other)),
        }
    }
}

/// A fault confined to one line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("field {field} at bytes {start}..{end} is not valid UTF-8")]
    Encoding {
        field: &'static str,
        start: usize,
        end: usize,
    },

    #[error("line exceeds {limit} bytes")]
    TooLong { limit: usize },
}

/// Parse one line with strict decoding
pub fn parse_line(line: &[u8]) -> Result<Option<Record>, LineError> {
    parse_line_with(line, Decoding::Strict)
}

pub fn parse_line_with(line: &[u8], decoding: Decoding) -> Result<Option<Record>, LineError> {
    if line.len() > MAX_LINE_BYTES {
        return Err(LineError::TooLong {
            limit: MAX_LINE_BYTES,
        });
    }

    let Some(schema) = schema_for(extract(line, 0, 2)) else {
        return Ok(None);
    };

    let values = schema
        .fields
        .iter()
        .map(|field| extract_field(line, field, decoding))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Record {
        record_type: schema.record_type,
        values,
    }))
}

fn extract_field(line: &[u8], field: &FieldSpec, decoding: Decoding) -> Result<FieldValue, LineError> {
    let mut values = field
        .ranges()
        .map(|(start, end)| decode(line, field, start, end, decoding))
        .collect::<Result<Vec<_>, _>>()?;

    if field.is_repeated() {
        Ok(FieldValue::Repeated(values))
    } else {
        Ok(FieldValue::Scalar(values.pop().unwrap_or_default()))
    }
}

fn decode(
    line: &[u8],
    field: &FieldSpec,
    start: usize,
    end: usize,
    decoding: Decoding,
) -> Result<String, LineError> {
    let bytes = extract(line, start, end);
    let text = match decoding {
        Decoding::Strict => match std::str::from_utf8(bytes) {
            Ok(text) => Cow::Borrowed(text),
            Err(_) => {
                let (char_start, char_end) = char_bounds(line, start, end);
                std::str::from_utf8(&line[char_start..char_end]).map_err(|_| {
                    LineError::Encoding {
                        field: field.name,
                        start,
                        end,
                    }
                })?;
                String::from_utf8_lossy(bytes)
            },
        },
        Decoding::Lossy => String::from_utf8_lossy(bytes),
    };

    Ok(if field.trim {
        text.trim().to_string()
    } else {
        text.into_owned()
    })
}

/// Widen `[start, end)` outward to the nearest character boundaries
fn char_bounds(line: &[u8], start: usize, end: usize) -> (usize, usize) {
    let len = line.len();
    let mut char_start = start.min(len);
    let mut char_end = end.min(len).max(char_start);
    let limit_end = char_end;

    // A UTF-8 character is at most 4 bytes, so at most 3 continuation bytes
    while char_start > 0
        && char_start < len
        && start - char_start < 3
        && is_continuation(line[char_start])
    {
        char_start -= 1;
    }
    while char_end < len && char_end - limit_end < 3 && is_continuation(line[char_end]) {
        char_end += 1;
    }
    (char_start, char_end)
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}
