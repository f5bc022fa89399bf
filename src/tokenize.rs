use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Words with inner apostrophes, hyphens, dots or `@` kept whole (`ain't`, `yo-yo`,
/// `www.reddit.com`, `some.one@email.com`), a leading `#` or `@` kept (`#hashtag`,
/// `@someone`), and runs of emoji (flags, skin tones and ZWJ sequences included) or other
/// non-ASCII symbols as tokens of their own.
pub const TOKEN_PATTERN: &str = r"[#@]?[\w--\x{200D}]+(?:['’\-.@][\w--\x{200D}]+)*|(?:\p{Extended_Pictographic}|\p{Regional_Indicator}|\p{Emoji_Modifier}|\x{FE0F}|\x{200D}|[^\x00-\x7F\s\w\p{P}])+";

/// Regex tokenizer emitting every match in order.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    re: Regex,
    lowercase: bool,
}

impl Tokenizer {
    pub fn new(pattern: &str, lowercase: bool) -> Result<Self> {
        let re = Regex::new(pattern).with_context(|| format!("invalid token pattern '{pattern}'"))?;
        Ok(Self { re, lowercase })
    }

    pub fn pattern(&self) -> &str {
        self.re.as_str()
    }

    pub fn lowercase(&self) -> bool {
        self.lowercase
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        if self.lowercase {
            let lower = text.to_lowercase();
            self.re.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
        } else {
            self.re.find_iter(text).map(|m| m.as_str().to_string()).collect()
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        static DEFAULT: OnceLock<Tokenizer> = OnceLock::new();
        DEFAULT
            .get_or_init(|| Tokenizer { re: Regex::new(TOKEN_PATTERN).unwrap(), lowercase: true })
            .clone()
    }
}

/// Lower-case `text` and split it with [`TOKEN_PATTERN`].
pub fn tokenize(text: &str) -> Vec<String> {
    static DEFAULT: OnceLock<Tokenizer> = OnceLock::new();
    DEFAULT.get_or_init(Tokenizer::default).tokenize(text)
}
