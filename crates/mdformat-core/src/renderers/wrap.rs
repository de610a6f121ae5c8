//! Paragraph word wrap
//!
//! Renderers mark the places where a line may break with [`WRAP_POINT`].
//! Wrapping turns each marker into a space or a newline; any other
//! character, including non-ASCII whitespace, is kept as it is.

/// Marks a location where word wrap may break a line
pub const WRAP_POINT: char = '\u{0}';

/// Target width of a wrapped paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapWidth {
    /// Join everything between hard breaks onto one line
    NoWrap,
    /// Break lines greedily at this many characters
    Columns(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Word(&'a str),
    WrapPoint,
    LineBreak,
}

fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut word_start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if c != WRAP_POINT && c != '\n' {
            word_start.get_or_insert(i);
            continue;
        }
        if let Some(start) = word_start.take() {
            segments.push(Segment::Word(&text[start..i]));
        }
        match c {
            '\n' => segments.push(Segment::LineBreak),
            // Consecutive wrap points collapse into one
            _ if segments.last() != Some(&Segment::WrapPoint) => {
                segments.push(Segment::WrapPoint)
            }
            _ => {}
        }
    }
    if let Some(start) = word_start {
        segments.push(Segment::Word(&text[start..]));
    }
    segments
}

/// Wrap text at its wrap points.
///
/// Newlines are hard breaks and are kept. Words longer than the width are
/// never split. A leading wrap point becomes a single space, trailing ones
/// are dropped.
pub fn wrap(text: &str, width: WrapWidth) -> String {
    let mut out = String::with_capacity(text.len());
    let mut line_len = 0;
    let mut line_has_word = false;
    let mut pending_space = false;

    for segment in segments(text) {
        match segment {
            Segment::LineBreak => {
                out.push('\n');
                line_len = 0;
                line_has_word = false;
                pending_space = false;
            }
            Segment::WrapPoint if !line_has_word => out.push(' '),
            Segment::WrapPoint => pending_space = true,
            Segment::Word(word) => {
                let word_len = word.chars().count();
                if pending_space {
                    match width {
                        WrapWidth::Columns(columns) if line_len + 1 + word_len > columns => {
                            out.push('\n');
                            line_len = 0;
                        }
                        _ => {
                            out.push(' ');
                            line_len += 1;
                        }
                    }
                }
                out.push_str(word);
                line_len += word_len;
                line_has_word = true;
                pending_space = false;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn marked(words: &[&str]) -> String {
        words.join(&WRAP_POINT.to_string())
    }

    #[test]
    fn test_wrap_columns() {
        let text = marked(&["aaa", "bb", "cccc", "d"]);
        assert_eq!(wrap(&text, WrapWidth::Columns(6)), "aaa bb\ncccc d");
        assert_eq!(wrap(&text, WrapWidth::Columns(1)), "aaa\nbb\ncccc\nd");
        assert_eq!(wrap(&text, WrapWidth::NoWrap), "aaa bb cccc d");
    }

    #[test]
    fn test_long_words_are_not_split() {
        let text = marked(&["a", "abcdefghij", "b"]);
        assert_eq!(wrap(&text, WrapWidth::Columns(4)), "a\nabcdefghij\nb");
    }

    #[test]
    fn test_hard_breaks_are_kept() {
        let text = format!("aa{WRAP_POINT}bb\\\ncc{WRAP_POINT}dd");
        assert_eq!(wrap(&text, WrapWidth::NoWrap), "aa bb\\\ncc dd");
        assert_eq!(wrap(&text, WrapWidth::Columns(3)), "aa\nbb\\\ncc\ndd");
    }

    #[test]
    fn test_edge_wrap_points() {
        let text = format!("{WRAP_POINT}{WRAP_POINT}a{WRAP_POINT}{WRAP_POINT}b{WRAP_POINT}");
        assert_eq!(wrap(&text, WrapWidth::NoWrap), " a b");
    }

    #[test]
    fn test_non_ascii_whitespace_is_preserved() {
        let text = format!("a\u{a0}b{WRAP_POINT}c");
        assert_eq!(wrap(&text, WrapWidth::Columns(2)), "a\u{a0}b\nc");
    }

    #[test]
    fn test_width_counts_chars() {
        let text = marked(&["äö", "ü"]);
        assert_eq!(wrap(&text, WrapWidth::Columns(4)), "äö ü");
    }

    proptest! {
        #[test]
        fn wrapping_twice_is_stable(
            words in proptest::collection::vec("[a-z]{1,12}", 1..40),
            columns in 1usize..60,
        ) {
            let width = WrapWidth::Columns(columns);
            let words: Vec<&str> = words.iter().map(String::as_str).collect();
            let once = wrap(&marked(&words), width);
            let remarked = once.replace([' ', '\n'], &WRAP_POINT.to_string());
            prop_assert_eq!(wrap(&remarked, width), once);
        }

        #[test]
        fn lines_fit_unless_single_word(
            words in proptest::collection::vec("[a-z]{1,12}", 1..40),
            columns in 1usize..60,
        ) {
            let words: Vec<&str> = words.iter().map(String::as_str).collect();
            let wrapped = wrap(&marked(&words), WrapWidth::Columns(columns));
            for line in wrapped.lines() {
                prop_assert!(line.len() <= columns || !line.contains(' '));
            }
        }
    }
}
