//! Byte offsets and ranges within an edit buffer.

pub use text_size::{TextRange, TextSize};

/// Convert a `usize` byte offset into a [`TextSize`], saturating at `u32::MAX`.
#[inline]
pub fn text_size(offset: usize) -> TextSize {
    TextSize::from(u32::try_from(offset).unwrap_or(u32::MAX))
}

/// Build a [`TextRange`] from `usize` bounds.
#[inline]
pub fn text_range(start: usize, end: usize) -> TextRange {
    TextRange::new(text_size(start), text_size(end.max(start)))
}

/// Move `offset` back to the nearest UTF-8 character boundary of `text`.
///
/// Offsets past the end are clamped to `text.len()`.
pub fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Convert a character count into a byte offset within `text`.
///
/// Editors that count cursors in characters rather than bytes go through
/// this before calling into the engine.
pub fn char_to_byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_char_boundary() {
        let text = "aé b";
        assert_eq!(floor_char_boundary(text, 0), 0);
        assert_eq!(floor_char_boundary(text, 2), 1);
        assert_eq!(floor_char_boundary(text, 3), 3);
        assert_eq!(floor_char_boundary(text, 99), text.len());
    }

    #[test]
    fn test_char_to_byte_offset() {
        let text = "éé.x";
        assert_eq!(char_to_byte_offset(text, 0), 0);
        assert_eq!(char_to_byte_offset(text, 2), 4);
        assert_eq!(char_to_byte_offset(text, 10), text.len());
    }

    #[test]
    fn test_text_range_never_inverted() {
        let range = text_range(5, 2);
        assert_eq!(range.start(), TextSize::from(5));
        assert!(range.is_empty());
    }
}
