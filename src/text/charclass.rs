//! Character classes shared by the decoder, scorer and cleaner.

/// CJK Unified Ideographs or Extension A.
#[inline]
pub fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}')
}

/// CJK punctuation block or halfwidth/fullwidth forms.
#[inline]
pub fn is_cjk_punctuation(c: char) -> bool {
    matches!(c, '\u{3000}'..='\u{303F}' | '\u{FF00}'..='\u{FFEF}')
}

/// Alphanumeric or CJK ideograph.
#[inline]
pub fn is_signal(c: char) -> bool {
    c.is_alphanumeric() || is_cjk(c)
}

/// Unicode noncharacter (U+FDD0..U+FDEF and every U+xxFFFE/U+xxFFFF).
#[inline]
pub fn is_noncharacter(c: char) -> bool {
    let cp = c as u32;
    (0xFDD0..=0xFDEF).contains(&cp) || (cp & 0xFFFE) == 0xFFFE
}

/// Map Word paragraph and cell controls as the decoder sees them.
///
/// CR, LF, VT and FF become a newline, TAB and BEL (cell mark) a space.
/// Other controls and U+FFFD are dropped.
#[inline]
pub fn map_decoded_control(c: char) -> Option<char> {
    match c {
        '\r' | '\n' | '\u{0B}' | '\u{0C}' => Some('\n'),
        '\t' | '\u{07}' => Some(' '),
        '\u{FFFD}' => None,
        c if c.is_control() => None,
        c => Some(c),
    }
}

/// Number of CJK ideographs in `text`.
pub fn cjk_count(text: &str) -> usize {
    text.chars().filter(|&c| is_cjk(c)).count()
}

/// Share of CJK ideographs among all characters; 0 for empty text.
pub fn cjk_density(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    cjk_count(text) as f64 / total as f64
}

/// True when `text` holds at least one alphanumeric or CJK character.
pub fn has_meaningful_chars(text: &str) -> bool {
    text.chars().any(is_signal)
}

/// Count of alphanumeric or CJK characters.
pub fn meaningful_count(text: &str) -> usize {
    text.chars().filter(|&c| is_signal(c)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cjk_ranges() {
        assert!(is_cjk('中'));
        assert!(is_cjk('\u{3400}'));
        assert!(!is_cjk('。'));
        assert!(is_cjk_punctuation('。'));
        assert!(is_cjk_punctuation('，'));
        assert!(!is_cjk('A'));
    }

    #[test]
    fn test_control_mapping() {
        assert_eq!(map_decoded_control('\r'), Some('\n'));
        assert_eq!(map_decoded_control('\u{0B}'), Some('\n'));
        assert_eq!(map_decoded_control('\u{07}'), Some(' '));
        assert_eq!(map_decoded_control('\u{01}'), None);
        assert_eq!(map_decoded_control('\u{FFFD}'), None);
        assert_eq!(map_decoded_control('字'), Some('字'));
    }

    #[test]
    fn test_density() {
        assert_eq!(cjk_density(""), 0.0);
        assert_eq!(cjk_density("中文ab"), 0.5);
        assert_eq!(cjk_count("中文ab"), 2);
        assert!(has_meaningful_chars("  - 1"));
        assert!(!has_meaningful_chars(" -- !! "));
        assert!(is_noncharacter('\u{FFFF}'));
        assert!(is_noncharacter('\u{FDD0}'));
        assert!(!is_noncharacter('a'));
    }
}
