use std::fmt;

use sha2::{Digest, Sha256};
use url::Url;

/// A named scan target pointing at one listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
    pub url: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
    BlankName,
    InvalidUrl(String),
    UnsupportedScheme(String),
}

impl fmt::Display for TopicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicError::BlankName => write!(f, "topic name is blank"),
            TopicError::InvalidUrl(reason) => write!(f, "invalid url: {reason}"),
            TopicError::UnsupportedScheme(scheme) => {
                write!(f, "unsupported url scheme {scheme}")
            }
        }
    }
}

impl std::error::Error for TopicError {}

impl Topic {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            disabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    /// Checks the name is usable as a record key and the url is absolute http(s).
    pub fn validate(&self) -> Result<(), TopicError> {
        if self.name.trim().is_empty() {
            return Err(TopicError::BlankName);
        }
        let parsed = Url::parse(&self.url).map_err(|e| TopicError::InvalidUrl(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(TopicError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn record_file_name(&self) -> String {
        record_file_name(&self.name)
    }
}

/// Deterministic, filesystem-safe record file name for a topic: `{stem}.json`.
///
/// Names that need no substitution keep their trimmed form as the stem. Names
/// where characters were replaced get `--{short_hash(name)}` appended so that
/// `a/b` and `a:b` land in different files.
pub fn record_file_name(topic: &str) -> String {
    let trimmed = topic.trim();
    let mut replaced = false;
    let mut stem: String = trimmed
        .chars()
        .map(|c| {
            if is_forbidden(c) {
                replaced = true;
                '_'
            } else {
                c
            }
        })
        .collect();

    if stem.is_empty() {
        stem = "untitled".to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    if replaced {
        stem.push_str("--");
        stem.push_str(&short_hash(trimmed));
    }
    format!("{stem}.json")
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
