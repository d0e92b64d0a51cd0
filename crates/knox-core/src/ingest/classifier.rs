use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use super::lemmatizer::Lemmatizer;
use super::normalizer::{Normalizer, PreProcessor};
use super::progress::{ProgressReporter, ProgressStage};
use crate::document::{Article, Document, DocumentVariant};

/// Generator tag of payloads produced by the manuals handler.
pub const MANUALS_GENERATOR: &str = "GrundfosManuals_Handler";
/// Document type of news publications.
pub const PUBLICATION_TYPE: &str = "Publication";

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("Unable to classify document (type: {doc_type:?}, generator: {generator:?})")]
    Unrecognized {
        doc_type: Option<String>,
        generator: Option<String>,
    },
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

pub type ClassificationResult<T> = Result<T, ClassificationError>;

#[derive(Debug, Deserialize)]
struct ContentPayload {
    publisher: String,
    #[serde(default)]
    publication: Option<String>,
    articles: Vec<ArticlePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArticleIdPayload {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
struct ArticlePayload {
    #[serde(default)]
    id: Option<ArticleIdPayload>,
    headline: String,
    extracted_from: Vec<String>,
    #[serde(default)]
    paragraphs: Vec<ParagraphPayload>,
}

#[derive(Debug, Deserialize)]
struct ParagraphPayload {
    value: String,
}

/// A document together with the variant that decides how it is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedDocument {
    pub variant: DocumentVariant,
    pub document: Document,
}

impl ClassifiedDocument {
    /// The normalizer matching this document's variant.
    #[must_use]
    pub fn normalizer(&self, lemmatizer: Arc<dyn Lemmatizer>) -> PreProcessor {
        PreProcessor::new(self.variant, lemmatizer)
    }
}

/// Routes inbound payloads to a document variant and builds the document.
#[derive(Debug, Clone, Default)]
pub struct DocumentClassifier {
    progress: ProgressReporter,
}

impl DocumentClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Decides the variant of `payload`. The generator tag wins over the
    /// document type.
    pub fn variant_of(payload: &Value) -> ClassificationResult<DocumentVariant> {
        let generator = payload.pointer("/generator/app").and_then(Value::as_str);
        let doc_type = payload.get("type").and_then(Value::as_str);

        if generator == Some(MANUALS_GENERATOR) {
            return Ok(DocumentVariant::Manuals);
        }
        if doc_type == Some(PUBLICATION_TYPE) {
            return Ok(DocumentVariant::Articles);
        }

        Err(ClassificationError::Unrecognized {
            doc_type: doc_type.map(String::from),
            generator: generator.map(String::from),
        })
    }

    pub fn classify(&self, payload: &Value) -> ClassificationResult<ClassifiedDocument> {
        if !payload.is_object() {
            return Err(ClassificationError::MalformedPayload(
                "payload is not a JSON object".to_string(),
            ));
        }

        let variant = Self::variant_of(payload)?;

        let content = payload
            .get("content")
            .ok_or_else(|| ClassificationError::MalformedPayload("missing content".to_string()))?;
        let content = ContentPayload::deserialize(content)
            .map_err(|e| ClassificationError::MalformedPayload(e.to_string()))?;

        let document = self.build_document(content)?;

        tracing::debug!(
            publisher = document.publisher(),
            %variant,
            articles = document.article_count(),
            "Classified document"
        );

        Ok(ClassifiedDocument { variant, document })
    }

    fn build_document(&self, content: ContentPayload) -> ClassificationResult<Document> {
        let mut document = Document::new(content.publisher);
        document.publication = content.publication;

        let total = content.articles.len();
        for (index, payload) in content.articles.into_iter().enumerate() {
            let path = payload.extracted_from.into_iter().next().ok_or_else(|| {
                ClassificationError::MalformedPayload(format!(
                    "article {:?} has an empty extracted_from list",
                    payload.headline
                ))
            })?;

            let body = payload
                .paragraphs
                .iter()
                .map(|p| p.value.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            let mut article = Article::new(payload.headline, body, path);
            match payload.id {
                Some(ArticleIdPayload::Text(id)) => article = article.with_id(id),
                Some(ArticleIdPayload::Number(id)) => article = article.with_id(id.to_string()),
                None => {}
            }
            document.articles.push(article);

            self.progress.report(
                ProgressStage::Construction,
                document.publisher(),
                index + 1,
                total,
            );
        }

        self.progress
            .report(ProgressStage::Construction, document.publisher(), total, total);
        Ok(document)
    }

    /// Classifies `payload` and runs the variant's normalizer over it.
    pub async fn classify_and_normalize(
        &self,
        payload: &Value,
        lemmatizer: Arc<dyn Lemmatizer>,
    ) -> super::PipelineResult<ClassifiedDocument> {
        let mut classified = self.classify(payload)?;
        classified
            .normalizer(lemmatizer)
            .with_progress(self.progress.clone())
            .process(&mut classified.document)
            .await?;
        Ok(classified)
    }
}
