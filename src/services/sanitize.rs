//! Text clean-up applied to user input and to public share pages.

use regex::Regex;
use std::sync::{Arc, OnceLock};

pub const BASIC: &str = "basic";
pub const PII_MASK: &str = "pii-mask";

/// Names accepted by [`sanitizer_from_name`].
pub const SANITIZER_NAMES: [&str; 2] = [BASIC, PII_MASK];

pub trait TextSanitizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn sanitize(&self, text: &str) -> String;
}

/// Replaces control characters (other than tab, newline and carriage return)
/// with a space and trims the result. Nothing else is removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicSanitizer;

impl TextSanitizer for BasicSanitizer {
    fn name(&self) -> &'static str {
        BASIC
    }

    fn sanitize(&self, text: &str) -> String {
        text.chars()
            .map(|c| {
                if c.is_control() && !matches!(c, '\t' | '\n' | '\r') {
                    ' '
                } else {
                    c
                }
            })
            .collect::<String>()
            .trim()
            .to_string()
    }
}

/// [`BasicSanitizer`] plus masking of e-mail addresses, URLs and phone-like
/// digit runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiiMaskingSanitizer;

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"https?://[^\s<>]+")
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(
        &RE,
        r"\b(?:\+?\d{1,3}[- ]?)?\d{2,4}[- ]?\d{2,4}[- ]?\d{3,4}\b",
    )
}

/// Street addresses led by a prefecture or major city name, up to the next
/// separator.
fn address_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(
        &RE,
        r"(?:東京都|大阪府|福岡県|北海道|京都府|神奈川県|愛知県|埼玉県|千葉県|兵庫県|福岡市|横浜市)[^\n、，。 ]{0,20}",
    )
}

impl TextSanitizer for PiiMaskingSanitizer {
    fn name(&self) -> &'static str {
        PII_MASK
    }

    fn sanitize(&self, text: &str) -> String {
        let text = BasicSanitizer.sanitize(text);
        // URLs first: they can contain something that looks like an address.
        let text = url_regex().replace_all(&text, "[url masked]");
        let text = email_regex().replace_all(&text, "[email masked]");
        let text = phone_regex().replace_all(&text, "[tel masked]");
        let text = address_regex().replace_all(&text, "[address masked]");
        text.into_owned()
    }
}

/// Resolves a configured sanitizer name.
#[must_use]
pub fn sanitizer_from_name(name: &str) -> Option<Arc<dyn TextSanitizer>> {
    match name.trim() {
        BASIC => Some(Arc::new(BasicSanitizer)),
        PII_MASK => Some(Arc::new(PiiMaskingSanitizer)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_replaces_control_chars_and_trims() {
        let out = BasicSanitizer.sanitize("  a\u{0}b\tc\nd\u{7}  ");
        assert_eq!(out, "a b\tc\nd");
    }

    #[test]
    fn basic_keeps_ordinary_text() {
        let text = "Prices rose 3% in May (see <b>chart</b>).";
        assert_eq!(BasicSanitizer.sanitize(text), text);
    }

    #[test]
    fn pii_masks_email_url_and_phone() {
        let out = PiiMaskingSanitizer
            .sanitize("mail bob@example.com, see https://ex.com/a?b=c or call 090-1234-5678");

        assert_eq!(
            out,
            "mail [email masked], see [url masked] or call [tel masked]"
        );
    }

    #[test]
    fn pii_masks_address_up_to_separator() {
        let out = PiiMaskingSanitizer.sanitize("送付先は東京都千代田区丸の内1丁目、よろしく");
        assert_eq!(out, "送付先は[address masked]、よろしく");

        let out = PiiMaskingSanitizer.sanitize("Moved to 横浜市西区 last year");
        assert_eq!(out, "Moved to [address masked] last year");
    }

    #[test]
    fn pii_leaves_short_numbers_and_dates() {
        let text = "Posted 2024-05-01, 42 replies";
        assert_eq!(PiiMaskingSanitizer.sanitize(text), text);
    }

    #[test]
    fn resolves_known_names_only() {
        assert_eq!(sanitizer_from_name("basic").unwrap().name(), BASIC);
        assert_eq!(sanitizer_from_name(" pii-mask ").unwrap().name(), PII_MASK);
        assert!(sanitizer_from_name("strip-all").is_none());
    }
}
