//! Final normalization of recovered text.
//!
//! Recovered text (particularly from the heuristic scan) carries binary
//! debris: stray symbols, lone glyphs, and lines made of punctuation.
//! [`TextCleaner`] strips that while keeping paragraph structure.

use super::charclass::{is_noncharacter, meaningful_count};
use once_cell::sync::Lazy;
use regex::Regex;

/// Runs of characters outside the allow-list.
///
/// Allowed: word characters, whitespace, CJK ideographs and Extension A, CJK
/// punctuation, fullwidth forms, and common Latin and typographic punctuation.
static DISALLOWED_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"[^\w\s",
        r"\x{4E00}-\x{9FFF}\x{3400}-\x{4DBF}\x{3000}-\x{303F}\x{FF00}-\x{FFEF}",
        r#".,;:!?'"()\[\]{}<>\-_/\\@#$%\&*+=\~|"#,
        "“”‘’—–…·",
        "]+"
    ))
    .expect("Failed to build cleaner allow-list regex")
});

/// Thresholds for line filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanOptions {
    /// Lines with fewer characters are dropped
    pub min_line_chars: usize,
    /// Minimum share of alphanumeric or CJK characters per line
    pub min_signal_ratio: f64,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            min_line_chars: 2,
            min_signal_ratio: 0.3,
        }
    }
}

impl CleanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_line_chars(mut self, chars: usize) -> Self {
        self.min_line_chars = chars;
        self
    }

    pub fn with_min_signal_ratio(mut self, ratio: f64) -> Self {
        self.min_signal_ratio = ratio;
        self
    }
}

/// Normalizes recovered text. `clean` is idempotent.
///
/// # Examples
///
/// ```
/// use docsift::text::TextCleaner;
///
/// let cleaner = TextCleaner::default();
/// let text = "第一段文字\r\u{0001}x\r\n  ¤¤ Second line ¤¤  \r***";
/// assert_eq!(cleaner.clean(text), "第一段文字\nSecond line");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TextCleaner {
    options: CleanOptions,
}

impl TextCleaner {
    pub fn new(options: CleanOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &CleanOptions {
        &self.options
    }

    pub fn clean(&self, text: &str) -> String {
        let normalized = normalize_controls(text);
        let collapsed = DISALLOWED_RUN.replace_all(&normalized, " ");

        collapsed
            .split('\n')
            .map(str::trim)
            .filter(|line| self.keep_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn keep_line(&self, line: &str) -> bool {
        let total = line.chars().count();
        if total < self.options.min_line_chars || total == 0 {
            return false;
        }
        meaningful_count(line) as f64 / total as f64 >= self.options.min_signal_ratio
    }
}

/// Map Word paragraph and cell marks to newlines and strip other controls.
fn normalize_controls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                chars.next_if_eq(&'\n');
                out.push('\n');
            }
            '\n' | '\u{0B}' | '\u{0C}' | '\u{07}' => out.push('\n'),
            '\t' => out.push('\t'),
            '\u{FFFD}' => {}
            c if c.is_control() || is_noncharacter(c) => {}
            c => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_paragraph_marks_become_lines() {
        let cleaner = TextCleaner::default();
        assert_eq!(
            cleaner.clean("First paragraph\rSecond\u{0B}Third\u{07}Cell"),
            "First paragraph\nSecond\nThird\nCell"
        );
        assert_eq!(cleaner.clean("one line\r\ntwo line"), "one line\ntwo line");
    }

    #[test]
    fn test_short_and_noisy_lines_dropped() {
        let cleaner = TextCleaner::default();
        let text = "a\n中\n-- ** -- ** x\nReal content here\n中文";
        assert_eq!(cleaner.clean(text), "Real content here\n中文");
    }

    #[test]
    fn test_disallowed_runs_collapse() {
        let cleaner = TextCleaner::default();
        assert_eq!(cleaner.clean("abc\u{2603}\u{2604}def"), "abc def");
        assert_eq!(cleaner.clean("价格：100元，“好”。"), "价格：100元，“好”。");
        assert_eq!(cleaner.clean("price ¥¥ 100 yen"), "price   100 yen");
    }

    #[test]
    fn test_empty_and_whitespace() {
        let cleaner = TextCleaner::default();
        assert_eq!(cleaner.clean(""), "");
        assert_eq!(cleaner.clean(" \r\n\t "), "");
    }

    #[test]
    fn test_custom_thresholds() {
        let lenient = TextCleaner::new(CleanOptions::new().with_min_line_chars(1).with_min_signal_ratio(0.0));
        assert_eq!(lenient.clean("a\n--"), "a\n--");
        assert_eq!(lenient.options().min_line_chars, 1);

        let strict = TextCleaner::new(CleanOptions::new().with_min_signal_ratio(0.9));
        assert_eq!(strict.clean("hello, world\nhelloworld"), "helloworld");
    }

    proptest! {
        #[test]
        fn prop_clean_is_idempotent(text in any::<String>()) {
            let cleaner = TextCleaner::default();
            let once = cleaner.clean(&text);
            prop_assert_eq!(cleaner.clean(&once), once);
        }

        #[test]
        fn prop_clean_is_idempotent_on_mixed_scripts(text in "[a-zA-Z0-9 中文档。，\r\n\t\u{07}\u{0B}¤*-]{0,200}") {
            let cleaner = TextCleaner::default();
            let once = cleaner.clean(&text);
            prop_assert_eq!(cleaner.clean(&once), once);
        }

        #[test]
        fn prop_output_has_no_controls(text in any::<String>()) {
            let cleaned = TextCleaner::default().clean(&text);
            prop_assert!(cleaned.chars().all(|c| c == '\n' || c == '\t' || !c.is_control()));
        }
    }
}
