//! Shared fixtures for NIBRS ingest integration tests
//!
//! Lines are built by placing values at absolute offsets on a space-filled
//! buffer, so a test states exactly which bytes land in which field.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// A line of `width` spaces with `tag` at 0 and each value at its offset
pub fn fixed_width(tag: &str, width: usize, fields: &[(usize, &str)]) -> String {
    let mut line = vec![b' '; width.max(2)];
    line[..2].copy_from_slice(tag.as_bytes());
    for (start, value) in fields {
        let end = start + value.len();
        if line.len() < end {
            line.resize(end, b' ');
        }
        line[*start..end].copy_from_slice(value.as_bytes());
    }
    String::from_utf8(line).unwrap()
}

/// Offender segment whose incident number encodes `n`
pub fn offender_line(n: usize) -> String {
    let incident = format!("{:012}", n);
    fixed_width(
        "05",
        45,
        &[
            (16, "TX0010000"),
            (25, &incident),
            (37, "01"),
            (39, "0025"),
            (43, "M"),
            (44, "W"),
        ],
    )
}

/// Batch header for an agency
pub fn batch_header_line(ori: &str, city: &str) -> String {
    let city = format!("{:<25}", city);
    fixed_width("BH", 75, &[(8, "2023"), (16, ori), (40, &city), (65, "TX"), (67, "02300000")])
}

/// One line of each of the seven layouts followed by an unknown tag
pub fn mixed_lines(n: usize) -> Vec<String> {
    let incident = format!("{:012}", n);
    vec![
        batch_header_line("TX0010000", "HOUSTON"),
        fixed_width("01", 57, &[(16, "TX0010000"), (25, &incident), (37, "20230115")]),
        fixed_width("02", 63, &[(16, "TX0010000"), (25, &incident), (37, "13A"), (40, "C")]),
        fixed_width("03", 232, &[(16, "TX0010000"), (25, &incident), (37, "7"), (38, "10")]),
        fixed_width("04", 89, &[(16, "TX0010000"), (25, &incident), (37, "001"), (40, "13A")]),
        offender_line(n),
        fixed_width("06", 79, &[(16, "TX0010000"), (25, &incident), (37, "01")]),
        fixed_width("99", 20, &[]),
    ]
}

/// Write lines to `dir/name`, newline-terminated
pub fn write_source(dir: &Path, name: &str, lines: impl IntoIterator<Item = String>) -> PathBuf {
    let path = dir.join(name);
    let mut text = String::new();
    for line in lines {
        text.push_str(&line);
        text.push('\n');
    }
    std::fs::write(&path, text).unwrap();
    path
}
