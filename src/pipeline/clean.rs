//! Line cleaning: reduce one line of extracted text to target-script words.
//!
//! OCR output and scraped wiki dumps carry a lot of noise around the script we
//! actually want: markup, reference blocks, citation markers, URLs, Latin
//! words, digits and punctuation. [`LineCleaner::clean`] strips all of it and
//! leaves only target-script characters separated by single spaces.
//!
//! ## Rule order
//!
//! 1. Decode HTML/XML entities (`&lt;ref&gt;` must become `<ref>` before
//!    the markup rules see it)
//! 2. Remove `<ref ...>...</ref>` blocks together with their content
//! 3. Remove remaining tags
//! 4. Remove bracketed numeric citations (`[12]`)
//! 5. Remove `== heading ==` delimiters and what they enclose
//! 6. Remove URLs
//! 7. Remove Latin letters
//! 8. Remove decimal digits of any script
//! 9. Remove every character that is neither whitespace nor in the target block
//! 10. Collapse whitespace runs and trim
//!
//! Rules 2–6 replace a match with a space so neighbouring words do not fuse;
//! rules 7–9 delete outright.
//!
//! The output contains only target-block characters and single spaces, which
//! no rule touches, so `clean(clean(x)) == clean(x)`.

use crate::config::ScriptBlock;
use once_cell::sync::Lazy;
use regex::Regex;

/// Per-line cleaner for one target script.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCleaner {
    script: ScriptBlock,
}

impl LineCleaner {
    pub fn new(script: ScriptBlock) -> Self {
        Self { script }
    }

    pub fn script(&self) -> ScriptBlock {
        self.script
    }

    /// Apply all ten rules to `line`.
    pub fn clean(&self, line: &str) -> String {
        let s = decode_entities(line);
        let s = remove_ref_blocks(&s);
        let s = remove_tags(&s);
        let s = remove_citations(&s);
        let s = remove_headings(&s);
        let s = remove_urls(&s);
        let s = remove_latin(&s);
        let s = remove_digits(&s);
        let s = self.keep_script_only(&s);
        collapse_whitespace(&s)
    }

    /// True if `text` holds at least one character of the target block.
    pub fn has_script_char(&self, text: &str) -> bool {
        text.chars().any(|c| self.script.contains(c))
    }

    // ── Rule 9: Keep only whitespace and the target block ───────────────────

    fn keep_script_only(&self, input: &str) -> String {
        input
            .chars()
            .filter(|&c| c.is_whitespace() || self.script.contains(c))
            .collect()
    }
}

// ── Rule 1: Decode entities ──────────────────────────────────────────────────

fn decode_entities(input: &str) -> String {
    html_escape::decode_html_entities(input).into_owned()
}

// ── Rule 2: Reference blocks ─────────────────────────────────────────────────

static RE_REF_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<ref\b[^>]*>.*?</ref>").unwrap());

fn remove_ref_blocks(input: &str) -> String {
    RE_REF_BLOCK.replace_all(input, " ").into_owned()
}

// ── Rule 3: Tags ─────────────────────────────────────────────────────────────

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

fn remove_tags(input: &str) -> String {
    RE_TAG.replace_all(input, " ").into_owned()
}

// ── Rule 4: Citation markers ─────────────────────────────────────────────────

static RE_CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\]").unwrap());

fn remove_citations(input: &str) -> String {
    RE_CITATION.replace_all(input, " ").into_owned()
}

// ── Rule 5: Heading delimiters ───────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"={2,}.*?={2,}").unwrap());

fn remove_headings(input: &str) -> String {
    RE_HEADING.replace_all(input, " ").into_owned()
}

// ── Rule 6: URLs ─────────────────────────────────────────────────────────────

static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+|www\.\S+").unwrap());

fn remove_urls(input: &str) -> String {
    RE_URL.replace_all(input, " ").into_owned()
}

// ── Rule 7: Latin letters ────────────────────────────────────────────────────

static RE_LATIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").unwrap());

fn remove_latin(input: &str) -> String {
    RE_LATIN.replace_all(input, "").into_owned()
}

// ── Rule 8: Digits (Unicode Nd) ──────────────────────────────────────────────

static RE_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").unwrap());

fn remove_digits(input: &str) -> String {
    RE_DIGIT.replace_all(input, "").into_owned()
}

// ── Rule 10: Whitespace ──────────────────────────────────────────────────────

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kannada() -> LineCleaner {
        LineCleaner::new(ScriptBlock::KANNADA)
    }

    #[test]
    fn test_entities_decoded_before_markup() {
        assert_eq!(kannada().clean("ಕನ್ನಡ &lt;b&gt;ನುಡಿ&lt;/b&gt;"), "ಕನ್ನಡ ನುಡಿ");
    }

    #[test]
    fn test_ref_block_dropped_with_content() {
        let line = "ಮೊದಲು<ref name=\"a\">ಉಲ್ಲೇಖ ಪಠ್ಯ</ref>ನಂತರ";
        assert_eq!(kannada().clean(line), "ಮೊದಲು ನಂತರ");
    }

    #[test]
    fn test_ref_block_is_case_insensitive() {
        assert_eq!(kannada().clean("ಅ<REF>ಇ</Ref>ಉ"), "ಅ ಉ");
    }

    #[test]
    fn test_tags_replaced_with_space() {
        assert_eq!(kannada().clean("ಒಂದು<br/>ಎರಡು"), "ಒಂದು ಎರಡು");
    }

    #[test]
    fn test_citations_and_headings() {
        assert_eq!(kannada().clean("ಪದ[12] == ಶೀರ್ಷಿಕೆ == ಪದ"), "ಪದ ಪದ");
    }

    #[test]
    fn test_urls_removed() {
        assert_eq!(
            kannada().clean("ನೋಡಿ https://kn.wikipedia.org/wiki/ಕನ್ನಡ ಮತ್ತು www.example.com/ಪುಟ"),
            "ನೋಡಿ ಮತ್ತು"
        );
    }

    #[test]
    fn test_latin_digits_and_punctuation_removed() {
        assert_eq!(kannada().clean("ಕನ್ನಡ Kannada 2024, ೧೯೫೬!"), "ಕನ್ನಡ");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(kannada().clean("  ಅ \t\t ಆ   "), "ಅ ಆ");
    }

    #[test]
    fn test_only_markup_script_yields_empty() {
        assert_eq!(kannada().clean("<ref>ಕನ್ನಡ</ref> [3] hello"), "");
    }

    #[test]
    fn test_other_script_block() {
        let tamil = LineCleaner::new(ScriptBlock::TAMIL);
        assert_eq!(tamil.clean("தமிழ் ಕನ್ನಡ"), "தமிழ்");
        assert!(tamil.has_script_char("தமிழ்"));
        assert!(!tamil.has_script_char("ಕನ್ನಡ"));
    }

    #[test]
    fn test_idempotent() {
        let c = kannada();
        let samples = [
            "ಕನ್ನಡ &amp;lt;ref&amp;gt; ಪದ",
            "<ref>ಒಂದು</ref>== ಎರಡು ==ಮೂರು[4]",
            "www.ಕನ್ನಡ.com ಪದ &#3221;",
            "ಅ&nbsp;ಆ\u{200c}ಇ",
            "= ಏಕ = ಚಿಹ್ನೆ ==",
            "&lt;&gt;ಕ&lt;",
            "",
        ];
        for s in samples {
            let once = c.clean(s);
            assert_eq!(c.clean(&once), once, "not idempotent for {s:?}");
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Pieces of noisy wiki and OCR text; concatenation also builds
        /// entities and markup split across fragment boundaries.
        fn fragment() -> impl Strategy<Value = &'static str> {
            prop::sample::select(vec![
                "ಕನ್ನಡ", "ಭಾಷೆ", "ಮೈಸೂರು", " ", "  ", "\t", "\r\n", "\r", "\n", "abc",
                "Karnataka", "1956", "೧೯೫೬", "&amp;", "&lt;", "&gt;", "&#3221;", "&nbsp;",
                "&amp;lt;ref&amp;gt;", "<ref>", "</ref>", "<ref name=\"a\">", "<b>", "</b>",
                "[12]", "[", "]", "==", "= ", "https://kn.wikipedia.org/wiki/x", "www.",
                ".", ",", "।", "\u{200c}", "<doc id=\"1\">", "</doc>", "ಅ", "lt;",
            ])
        }

        fn noisy_text() -> impl Strategy<Value = String> {
            prop::collection::vec(fragment(), 0..32).prop_map(|parts| parts.concat())
        }

        proptest! {
            #[test]
            fn prop_clean_is_idempotent(raw in noisy_text()) {
                let c = kannada();
                let once = c.clean(&raw);
                prop_assert_eq!(c.clean(&once), once);
            }

            #[test]
            fn prop_clean_is_idempotent_on_arbitrary_text(raw in "\\PC{0,64}") {
                let c = kannada();
                let once = c.clean(&raw);
                prop_assert_eq!(c.clean(&once), once);
            }

            #[test]
            fn prop_output_is_script_and_single_spaces(raw in noisy_text()) {
                let c = kannada();
                let out = c.clean(&raw);
                prop_assert!(!out.starts_with(' ') && !out.ends_with(' '));
                prop_assert!(!out.contains("  "));
                prop_assert!(out.chars().all(|ch| ch == ' ' || ScriptBlock::KANNADA.contains(ch)));
            }
        }
    }
}
