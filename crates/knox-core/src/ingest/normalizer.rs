use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::lemmatizer::{LemmatizationResult, Lemmatizer};
use super::progress::{ProgressReporter, ProgressStage};
use crate::document::{Document, DocumentVariant};

static SPECIAL_CHARACTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9 ]").expect("valid regex"));

const DIGIT_WORDS: [&str; 10] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

/// Removes every character outside `[A-Za-z0-9 ]`.
pub fn remove_special_characters(text: &str) -> String {
    SPECIAL_CHARACTERS.replace_all(text, "").into_owned()
}

/// Spells out every ASCII digit. Digits of one run are joined with `_`, so
/// `"12 bar"` becomes `"one_two bar"`. The result is trimmed.
pub fn numbers_to_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut previous_was_digit = false;

    for c in text.chars() {
        if let Some(digit) = c.to_digit(10) {
            if previous_was_digit {
                out.push('_');
            }
            out.push_str(DIGIT_WORDS[digit as usize]);
            previous_was_digit = true;
        } else {
            out.push(c);
            previous_was_digit = false;
        }
    }

    out.trim().to_string()
}

pub fn to_lower(text: &str) -> String {
    text.to_lowercase()
}

/// Rewrites the articles of a document in place into normalized text.
#[async_trait::async_trait]
pub trait Normalizer: Send + Sync {
    async fn process(&self, document: &mut Document) -> LemmatizationResult<()>;
}

/// Normalizer for one document variant: strips special characters, spells
/// out numbers, lemmatizes in the variant's language and lower-cases.
pub struct PreProcessor {
    variant: DocumentVariant,
    lemmatizer: Arc<dyn Lemmatizer>,
    progress: ProgressReporter,
}

impl PreProcessor {
    #[must_use]
    pub fn new(variant: DocumentVariant, lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        Self {
            variant,
            lemmatizer,
            progress: ProgressReporter::disabled(),
        }
    }

    #[must_use]
    pub fn manuals(lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        Self::new(DocumentVariant::Manuals, lemmatizer)
    }

    #[must_use]
    pub fn articles(lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        Self::new(DocumentVariant::Articles, lemmatizer)
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn variant(&self) -> DocumentVariant {
        self.variant
    }

    async fn normalize_field(&self, text: &str) -> LemmatizationResult<String> {
        let cleaned = numbers_to_text(&remove_special_characters(text));
        let lemmatized = self
            .lemmatizer
            .lemmatize(self.variant.language(), &cleaned)
            .await?;
        Ok(to_lower(&lemmatized))
    }
}

#[async_trait::async_trait]
impl Normalizer for PreProcessor {
    async fn process(&self, document: &mut Document) -> LemmatizationResult<()> {
        let publisher = document.publisher().to_string();
        let total = document.articles.len();

        for (index, article) in document.articles.iter_mut().enumerate() {
            if article.is_normalized() {
                tracing::debug!(article = %article.id, "Article already normalized");
                continue;
            }

            article.title = self.normalize_field(&article.title).await?;
            article.body = self.normalize_field(&article.body).await?;
            article.mark_normalized();

            self.progress
                .report(ProgressStage::Normalization, &publisher, index + 1, total);
        }

        Ok(())
    }
}
