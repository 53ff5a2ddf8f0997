//! Small cursor/text helpers shared by the position-based features.

/// The text of one zero-based line, without its trailing newline.
pub(crate) fn line_str(code: &str, line: u32) -> Option<&str> {
    code.split('\n')
        .nth(line as usize)
        .map(|text| text.strip_suffix('\r').unwrap_or(text))
}

/// Byte offset of a character column within one line, clamped to its end.
pub(crate) fn byte_col(line_text: &str, character: u32) -> usize {
    line_text
        .char_indices()
        .nth(character as usize)
        .map(|(idx, _)| idx)
        .unwrap_or(line_text.len())
}

/// The identifier-ish word under the cursor, with its byte bounds.
pub(crate) fn word_at(line_text: &str, character: u32) -> (String, usize, usize) {
    let cursor = byte_col(line_text, character);
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    let start = line_text[..cursor]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word(*c))
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(cursor);
    let end = line_text[cursor..]
        .find(|c: char| !is_word(c))
        .map(|offset| cursor + offset)
        .unwrap_or(line_text.len());

    (line_text[start..end].to_string(), start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_extends_both_directions() {
        let (word, start, end) = word_at("x = total_level + 1", 8);
        assert_eq!(word, "total_level");
        assert_eq!((start, end), (4, 15));
    }

    #[test]
    fn word_is_empty_between_tokens() {
        let (word, _, _) = word_at("a + b", 2);
        assert_eq!(word, "");
    }

    #[test]
    fn byte_col_clamps_past_line_end() {
        assert_eq!(byte_col("ab", 99), 2);
    }
}
