use crate::agent::prompt::{default_greeting, NEEDS_DATABASE_TAG};
use once_cell::sync::Lazy;
use regex::Regex;

// the upper-case tag anywhere, or any casing when nothing but markup precedes it
static CONVERSATIONAL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[*_\s]*(?:\bCONVERSATIONAL\b|(?i:^[\W\d_]*conversational\b))[*_\s:\-.)\]]*")
        .unwrap()
});

static FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[^\n`]*\n(.*?)```$").unwrap()
});

static LABEL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(clarified|rewritten|standalone)\s+(query|question)\s*:\s*").unwrap()
});

/// what the short-circuit stage decided about the latest question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    NeedsDatabase,
    Conversational(String),
    Direct(String),
}

impl Classification {
    /// the reply to hand back when no database work is needed
    pub fn answer(&self) -> Option<&str> {
        match self {
            Classification::NeedsDatabase => None,
            Classification::Conversational(answer) | Classification::Direct(answer) => Some(answer),
        }
    }
}

pub fn parse_classification(output: &str) -> Classification {
    let text = output.trim();

    // an empty reply is not an answer
    if text.is_empty() || text.to_uppercase().contains(NEEDS_DATABASE_TAG) {
        return Classification::NeedsDatabase;
    }

    if let Some(mat) = CONVERSATIONAL_REGEX.find(text) {
        let after = text[mat.end()..].trim();
        let before = text[..mat.start()]
            .trim_end_matches(|c: char| c.is_whitespace() || "*_([".contains(c));

        // text before the tag is only kept when it reads like a reply, not a label
        let reply = if !after.is_empty() {
            after
        } else if before.ends_with(':') || !before.chars().any(char::is_alphabetic) {
            ""
        } else {
            before
        };

        return if reply.is_empty() {
            Classification::Conversational(default_greeting())
        } else {
            Classification::Conversational(reply.to_string())
        };
    }

    Classification::Direct(text.to_string())
}

/// strip labels, fences and quotes models wrap around a rewritten question
pub fn clean_rewrite(output: &str) -> String {
    let text = output.trim();

    // strip markdown fences, including any info string such as ```text
    let text = match FENCE_REGEX.captures(text) {
        Some(captures) => captures.get(1).map(|m| m.as_str().trim()).unwrap_or(text),
        None => text,
    };

    let text = LABEL_REGEX.replace(text, "");
    let text = text.trim();

    let unquoted = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);

    unquoted.trim().to_string()
}
