// Positional field extraction
//
// Every layout in the registry is expressed in terms of this single primitive.

/// Return the bytes of `line` in the half-open range `[start, end)`.
///
/// Short lines never fail: if the line ends before `start` the result is
/// empty, and if it ends inside the range the available tail is returned.
/// An inverted range (`end < start`) yields an empty slice.
#[inline]
pub fn extract(line: &[u8], start: usize, end: usize) -> &[u8] {
    if start >= line.len() || end <= start {
        return &[];
    }
    &line[start..end.min(line.len())]
}
