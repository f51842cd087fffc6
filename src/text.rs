//! Width-aware text helpers shared by the line editor and the apps
use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use unicode_width::UnicodeWidthChar;

/// Matches ANSI/VT escape sequences, including CSI with parameters and the
/// C1 control range.
fn re_ansi() -> &'static Regex {
    static RE_ANSI: OnceLock<Regex> = OnceLock::new();
    RE_ANSI.get_or_init(|| {
        Regex::new(r"\x1B[@-Z\\-_]|[\x80-\x9A\x9C-\x9F]|(?:\x1B\[|\x9B)[0-?]*[ -/]*[@-~]")
            .expect("hard-coded pattern")
    })
}

/// Remove every escape sequence from `s`, leaving only visible text.
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    re_ansi().replace_all(s, "")
}

/// Shorten `s` to at most `precision` characters, replacing the tail with
/// an ellipsis. Strings that already fit (or a precision below 3) are
/// returned unchanged.
pub fn trim(s: &str, precision: usize) -> Cow<'_, str> {
    let len = s.chars().count();
    if precision >= 3 && precision < len {
        let head: String = s.chars().take(precision - 3).collect();
        Cow::Owned(format!("{head}..."))
    } else {
        Cow::Borrowed(s)
    }
}

/// Terminal column count of `s`: East-Asian wide and fullwidth characters
/// occupy two cells, everything else one.
pub fn unicode_len(s: &str) -> usize {
    s.chars()
        .map(|c| if c.width() == Some(2) { 2 } else { 1 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::{strip_ansi, trim, unicode_len};

    #[test]
    fn trim_bounds() {
        assert_eq!("hello", trim("hello", 5));
        assert_eq!("hello", trim("hello", 80));
        assert_eq!("he...", trim("hello!", 5));
        assert_eq!("...", trim("hello!", 3));
        // below the minimum precision nothing is done
        assert_eq!("hello!", trim("hello!", 2));
        for w in 3..10usize {
            let trimmed = trim("a long label to shorten", w);
            assert!(trimmed.chars().count() <= w);
            assert_eq!(1, trimmed.matches("...").count());
        }
    }

    #[test]
    fn widths() {
        assert_eq!(5, unicode_len("hello"));
        assert_eq!(4, unicode_len("\u{4f60}\u{597d}")); // 你好
        assert_eq!(7, unicode_len("a\u{ff21}b\u{ff22}c")); // fullwidth A/B
        assert_eq!(0, unicode_len(""));
    }

    #[test]
    fn ansi_stripping() {
        assert_eq!("plain", strip_ansi("plain"));
        assert_eq!("ab", strip_ansi("\x1b[1;36ma\x1b[22;39mb"));
        assert_eq!("x", strip_ansi("\x1b[48;5;22mx\x1b[0m"));
        assert_eq!("", strip_ansi("\x1b[2K\x1b[0G"));
        assert_eq!(" \u{2590}   it", strip_ansi(" \x1b[2;39m\u{2590}\x1b[0m   it"));
    }
}
