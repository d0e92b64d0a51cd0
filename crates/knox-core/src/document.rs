use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Publisher family a document belongs to. Decides the normalizer language
/// and the triple extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentVariant {
    /// Product manuals produced by the manuals handler
    Manuals,
    /// News publications
    Articles,
}

impl DocumentVariant {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manuals => "manuals",
            Self::Articles => "articles",
        }
    }

    /// Language code sent to the lemmatizer.
    #[must_use]
    pub fn language(&self) -> &'static str {
        match self {
            Self::Manuals => "en",
            Self::Articles => "da",
        }
    }
}

impl std::fmt::Display for DocumentVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single article of a publication, as consumed by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub body: String,
    pub path: String,
    #[serde(default)]
    normalized: bool,
}

impl Article {
    #[must_use]
    pub fn new(title: String, body: String, path: String) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            title,
            body,
            path,
            normalized: false,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: String) -> Self {
        self.id = id;
        self
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub(crate) fn mark_normalized(&mut self) {
        self.normalized = true;
    }
}

/// A publication from one publisher, split into ordered articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    publisher: String,
    pub publication: Option<String>,
    pub articles: Vec<Article>,
}

impl Document {
    #[must_use]
    pub fn new(publisher: String) -> Self {
        Self {
            publisher,
            publication: None,
            articles: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_publication(mut self, publication: String) -> Self {
        self.publication = Some(publication);
        self
    }

    #[must_use]
    pub fn with_article(mut self, article: Article) -> Self {
        self.articles.push(article);
        self
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    /// Name under which the document's triples are stored in the graph store.
    pub fn graph_name(&self) -> &str {
        self.publication.as_deref().unwrap_or(&self.publisher)
    }

    pub fn article_count(&self) -> usize {
        self.articles.len()
    }
}
