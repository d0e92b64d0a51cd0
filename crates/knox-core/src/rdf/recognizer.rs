use serde::{Deserialize, Serialize};

pub const LABEL_EMAIL: &str = "EMAIL";
pub const LABEL_URL: &str = "URL";
pub const LABEL_DATE: &str = "DATE";
pub const LABEL_PUMP: &str = "PUMP";

/// An entity found in article text, labelled with the recognizer's tag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    pub text: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl EntityMention {
    #[must_use]
    pub fn new(text: String, label: String, start: usize, end: usize) -> Self {
        Self {
            text,
            label,
            start,
            end,
        }
    }
}

/// Finds entity mentions in text. Statistical NER models plug in here; the
/// crate ships the pattern-based [`PatternRecognizer`].
pub trait EntityRecognizer: Send + Sync {
    fn recognize(&self, text: &str) -> Vec<EntityMention>;
}

pub struct MentionPattern {
    pub label: String,
    pub regex: regex::Regex,
}

impl MentionPattern {
    pub fn new(label: &str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label: label.to_string(),
            regex: regex::Regex::new(pattern)?,
        })
    }
}

const EMAIL_PATTERN: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";
const URL_PATTERN: &str = r#"https?://[^\s<>"]*[^\s<>".,;:!?)]"#;
const DATE_PATTERN: &str = r"(?i)\b(?:\d{4}-\d{2}-\d{2}|\d{1,2}[./-]\d{1,2}[./-]\d{2,4}|\d{1,2}\.?\s+(?:january|januar|february|februar|march|marts|april|may|maj|june|juni|july|juli|august|september|october|oktober|november|december)(?:\s+\d{4})?)\b";
const PUMP_PATTERN: &str = r"\b(?:CRE|CRN|CR|SQE|SQ|SP|MAGNA3|MAGNA|ALPHA2|ALPHA1|ALPHA|UPS|UPM|TP|NB|NK|CME|CM|JP|SCALA2|SCALA1|UNILIFT)\s?\d+(?:[-/]\d+)*\b";

/// Regex-driven recognizer. Overlapping matches are resolved in favour of the
/// one starting first, then the longest.
pub struct PatternRecognizer {
    patterns: Vec<MentionPattern>,
}

impl PatternRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: MentionPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    fn with_builtin(mut self, label: &str, pattern: &str) -> Self {
        match MentionPattern::new(label, pattern) {
            Ok(p) => self.patterns.push(p),
            Err(e) => tracing::warn!("Skipping invalid {} pattern: {}", label, e),
        }
        self
    }

    /// E-mail addresses, links and dates.
    #[must_use]
    pub fn for_articles() -> Self {
        Self::new()
            .with_builtin(LABEL_EMAIL, EMAIL_PATTERN)
            .with_builtin(LABEL_URL, URL_PATTERN)
            .with_builtin(LABEL_DATE, DATE_PATTERN)
    }

    /// Everything [`Self::for_articles`] finds plus pump model designations.
    #[must_use]
    pub fn for_manuals() -> Self {
        Self::for_articles().with_builtin(LABEL_PUMP, PUMP_PATTERN)
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for PatternRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRecognizer for PatternRecognizer {
    fn recognize(&self, text: &str) -> Vec<EntityMention> {
        let mut found: Vec<EntityMention> = self
            .patterns
            .iter()
            .flat_map(|pattern| {
                pattern.regex.find_iter(text).map(|m| {
                    EntityMention::new(
                        m.as_str().to_string(),
                        pattern.label.clone(),
                        m.start(),
                        m.end(),
                    )
                })
            })
            .collect();

        found.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut kept: Vec<EntityMention> = Vec::with_capacity(found.len());
        for mention in found {
            if kept.last().is_some_and(|last| mention.start < last.end) {
                continue;
            }
            kept.push(mention);
        }
        kept
    }
}
