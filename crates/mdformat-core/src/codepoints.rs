//! Character classes used by the escaping heuristics.

/// Characters CommonMark treats as Unicode whitespace.
pub const UNICODE_WHITESPACE: &[char] = &[
    '\t', '\n', '\u{0b}', '\u{0c}', '\r', ' ', '\u{a0}', '\u{1680}', '\u{2000}',
    '\u{2001}', '\u{2002}', '\u{2003}', '\u{2004}', '\u{2005}', '\u{2006}',
    '\u{2007}', '\u{2008}', '\u{2009}', '\u{200a}', '\u{202f}', '\u{205f}',
    '\u{3000}',
];

/// ASCII whitespace: the only whitespace that may turn into a line break on wrap.
pub const ASCII_WHITESPACE: &[char] = &['\t', '\n', '\u{0b}', '\u{0c}', '\r', ' '];

/// Check if a character is Unicode whitespace
pub fn is_unicode_whitespace(c: char) -> bool {
    UNICODE_WHITESPACE.contains(&c)
}

/// Check if a character is ASCII whitespace
pub fn is_ascii_whitespace(c: char) -> bool {
    ASCII_WHITESPACE.contains(&c)
}

/// Check if a character is an ASCII control character (U+0000..=U+001F)
pub fn is_ascii_control(c: char) -> bool {
    (c as u32) < 0x20
}

/// Check if a character is Unicode punctuation.
///
/// Non-ASCII characters count as punctuation unless they are alphanumeric,
/// whitespace or control characters. This is wider than the Unicode `P`
/// and `S` categories (format characters such as U+200D count too), which
/// only leads to extra escapes.
pub fn is_unicode_punctuation(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_punctuation();
    }
    !(c.is_alphanumeric() || c.is_whitespace() || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_whitespace() {
        assert!(is_unicode_whitespace(' '));
        assert!(is_unicode_whitespace('\u{a0}'));
        assert!(is_unicode_whitespace('\u{3000}'));
        assert!(!is_unicode_whitespace('a'));
        assert!(!is_unicode_whitespace('\u{200b}'));
        assert_eq!(UNICODE_WHITESPACE.len(), 22);
    }

    #[test]
    fn test_ascii_whitespace_is_subset() {
        assert!(ASCII_WHITESPACE.iter().all(|c| is_unicode_whitespace(*c)));
        assert!(!is_ascii_whitespace('\u{a0}'));
    }

    #[test]
    fn test_punctuation() {
        assert!(is_unicode_punctuation('!'));
        assert!(is_unicode_punctuation('_'));
        assert!(is_unicode_punctuation('\u{2014}'));
        assert!(is_unicode_punctuation('\u{3001}'));
        assert!(!is_unicode_punctuation('a'));
        assert!(!is_unicode_punctuation('\u{e4}'));
        assert!(!is_unicode_punctuation('\u{a0}'));
        // Over-approximation: a format character counts as punctuation
        assert!(is_unicode_punctuation('\u{200d}'));
    }

    #[test]
    fn test_ascii_control() {
        assert!(is_ascii_control('\0'));
        assert!(is_ascii_control('\u{1f}'));
        assert!(!is_ascii_control(' '));
    }
}
