use crate::error::{Error, Result};

/// A contiguous slice of a larger text.
///
/// Offsets and lengths are counted in characters. Chunks produced by
/// [`chunk`] never overlap and leave no gaps, so concatenating their `text`
/// in order gives back the input exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunk<'a> {
    /// Position in the chunk sequence (0-indexed)
    pub index: usize,
    /// Character offset of the first character in the source text
    pub offset: usize,
    pub text: &'a str,
}

impl TextChunk<'_> {
    /// Length in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Split `text` into consecutive chunks of at most `max_len` characters.
///
/// The last chunk may be shorter. Empty input yields no chunks.
pub fn chunk(text: &str, max_len: usize) -> Result<Vec<TextChunk<'_>>> {
    if max_len == 0 {
        return Err(Error::InvalidArgument(
            "chunk length must be greater than 0".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    let mut count = 0;

    for (byte_idx, _) in text.char_indices() {
        if count == max_len {
            chunks.push(TextChunk {
                index: chunks.len(),
                offset,
                text: &text[start..byte_idx],
            });
            start = byte_idx;
            offset += count;
            count = 0;
        }
        count += 1;
    }

    if count > 0 {
        chunks.push(TextChunk {
            index: chunks.len(),
            offset,
            text: &text[start..],
        });
    }

    Ok(chunks)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn joined(chunks: &[TextChunk<'_>]) -> String {
        chunks.iter().map(|c| c.text).collect()
    }

    #[test]
    fn test_ten_thousand_chars() {
        let text = "a".repeat(10_000);
        let chunks = chunk(&text, 4500).unwrap();
        let lens: Vec<_> = chunks.iter().map(TextChunk::len).collect();
        assert_eq!(lens, vec![4500, 4500, 1000]);
        assert_eq!(chunks[1].offset, 4500);
        assert_eq!(chunks[2].offset, 9000);
        assert_eq!(joined(&chunks), text);
    }

    #[test]
    fn test_empty_input() {
        assert!(chunk("", 10).unwrap().is_empty());
    }

    #[test]
    fn test_zero_max_len_rejected() {
        let err = chunk("abc", 0).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_exact_multiple() {
        let chunks = chunk("abcdef", 3).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "abc");
        assert_eq!(chunks[1].text, "def");
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn test_multibyte_characters_not_split() {
        let text = "héllo wörld ✓ 日本語テキスト";
        for max_len in 1..=8 {
            let chunks = chunk(text, max_len).unwrap();
            assert_eq!(joined(&chunks), text);
            assert!(chunks.iter().all(|c| c.len() <= max_len));
            let expected = text.chars().count().div_ceil(max_len);
            assert_eq!(chunks.len(), expected);
        }
    }

    #[test]
    fn test_offsets_are_contiguous() {
        let text = "The quick brown fox jumps over the lazy dog";
        let chunks = chunk(text, 7).unwrap();
        let mut expected_offset = 0;
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
            assert_eq!(c.offset, expected_offset);
            expected_offset += c.len();
        }
        assert_eq!(expected_offset, text.len());
    }

    #[test]
    fn test_deterministic() {
        let text = "répété ".repeat(50);
        assert_eq!(chunk(&text, 13).unwrap(), chunk(&text, 13).unwrap());
    }
}
