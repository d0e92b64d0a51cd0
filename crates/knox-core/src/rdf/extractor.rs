use std::collections::{HashMap, HashSet};

use super::graph::TripleGraph;
use super::recognizer::{EntityMention, EntityRecognizer, PatternRecognizer, LABEL_PUMP};
use super::term::{generate_uri_reference, reference_name, Iri, Triple, Vocab};
use crate::document::{Article, Document, DocumentVariant};

pub const ARTICLE_CLASS: &str = "Article";
pub const PUBLICATION_CLASS: &str = "Publication";
pub const PUBLISHER_CLASS: &str = "Publisher";

/// `(name, class)` pairs declared as named individuals, in first-seen order.
/// Names are keyed in their IRI form, so references that only differ in
/// `/` versus `-` are one individual.
#[derive(Debug, Clone, Default)]
pub struct NamedIndividualRegistry {
    order: Vec<(String, String)>,
    seen: HashSet<(String, String)>,
}

impl NamedIndividualRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the pair was already registered.
    pub fn register(&mut self, name: &str, class: &str) -> bool {
        let key = (reference_name(name), class.to_string());
        if self.seen.contains(&key) {
            return false;
        }
        self.seen.insert(key.clone());
        self.order.push(key);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.order.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

/// Accumulates the triples and named individuals of one extraction run.
#[derive(Debug)]
pub struct TripleBuilder {
    namespace: String,
    triples: Vec<Triple>,
    registry: NamedIndividualRegistry,
    flushed: usize,
}

impl TripleBuilder {
    #[must_use]
    pub fn new(namespace: String) -> Self {
        Self {
            namespace,
            triples: Vec::new(),
            registry: NamedIndividualRegistry::new(),
            flushed: 0,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn uri(&self, segments: &[&str], reference: &str) -> Iri {
        generate_uri_reference(&self.namespace, segments, reference)
    }

    pub fn relation(&self, vocab: Vocab) -> Iri {
        vocab.iri(&self.namespace)
    }

    pub fn queue_named_individual(&mut self, name: &str, class: &str) {
        self.registry.register(name, class);
    }

    pub fn append_literal(&mut self, segments: &[&str], value: &str, relation: Vocab, literal: &str) {
        let triple = Triple::literal(self.uri(segments, value), self.relation(relation), literal);
        self.triples.push(triple);
    }

    pub fn append_uri(
        &mut self,
        subject_segments: &[&str],
        subject: &str,
        relation: Vocab,
        object_segments: &[&str],
        object: &str,
    ) {
        let triple = Triple::new(
            self.uri(subject_segments, subject),
            self.relation(relation),
            self.uri(object_segments, object),
        );
        self.triples.push(triple);
    }

    /// Emits `article mentions entity` and `entity Name "text"` and registers
    /// the entity under `class`. Returns the entity's reference name.
    pub fn append_mention(&mut self, article: &Article, mention: &EntityMention, class: &str) -> String {
        let reference = mention.text.replace(' ', "_");
        let entity = self.uri(&[class], &reference);

        self.triples.push(Triple::new(
            self.uri(&[ARTICLE_CLASS], &article.id),
            self.relation(Vocab::Mentions),
            entity.clone(),
        ));
        self.triples.push(Triple::literal(
            entity,
            self.relation(Vocab::Name),
            mention.text.clone(),
        ));
        self.queue_named_individual(&reference, class);
        reference
    }

    /// Emits the two type declarations for every named individual registered
    /// since the previous flush.
    pub fn append_named_individuals(&mut self) {
        let rdf_type = self.relation(Vocab::RdfType);
        let named_individual = self.relation(Vocab::OwlNamedIndividual);

        let pending: Vec<(String, String)> = self
            .registry
            .iter()
            .skip(self.flushed)
            .map(|(n, c)| (n.to_string(), c.to_string()))
            .collect();

        for (name, class) in &pending {
            let subject = self.uri(&[class.as_str()], name);
            self.triples.push(Triple::new(
                subject.clone(),
                rdf_type.clone(),
                named_individual.clone(),
            ));
            self.triples
                .push(Triple::new(subject, rdf_type.clone(), self.uri(&[], class)));
        }
        self.flushed += pending.len();
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    pub fn registry(&self) -> &NamedIndividualRegistry {
        &self.registry
    }

    pub fn clear(&mut self) {
        self.triples.clear();
        self.registry.clear();
        self.flushed = 0;
    }
}

/// Maps recognizer labels to ontology classes; unknown labels map to
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct LabelTable(HashMap<String, String>);

impl LabelTable {
    #[must_use]
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(label, class)| ((*label).to_string(), (*class).to_string()))
                .collect(),
        )
    }

    pub fn class_for<'a>(&'a self, label: &'a str) -> &'a str {
        self.0.get(label).map_or(label, String::as_str)
    }

    #[must_use]
    pub fn articles() -> Self {
        Self::new(&[
            ("EMAIL", "Email"),
            ("URL", "Link"),
            ("DATE", "DateMention"),
            ("PER", "Person"),
            ("ORG", "Organisation"),
            ("LOC", "Location"),
        ])
    }

    #[must_use]
    pub fn manuals() -> Self {
        Self::new(&[
            ("EMAIL", "Email"),
            ("URL", "Link"),
            ("DATE", "DateMention"),
            (LABEL_PUMP, "Pump"),
        ])
    }
}

/// Publisher-specific part of triple extraction.
pub trait ContentExtractor: Send + Sync {
    fn variant(&self) -> DocumentVariant;

    /// `mention_text` holds, per article of `document`, the text the entity
    /// recognizer runs over.
    fn extract_content(
        &self,
        document: &Document,
        mention_text: &[String],
        out: &mut TripleBuilder,
    );
}

fn article_text(article: &Article) -> String {
    format!("{} {}", article.title, article.body)
}

/// Recognizer input per article of `document`, taken from the matching
/// article of `source`.
fn mention_texts(document: &Document, source: &Document) -> Vec<String> {
    document
        .articles
        .iter()
        .enumerate()
        .map(|(i, article)| article_text(source.articles.get(i).unwrap_or(article)))
        .collect()
}

fn append_article(out: &mut TripleBuilder, article: &Article) {
    out.queue_named_individual(&article.id, ARTICLE_CLASS);
    out.append_literal(&[ARTICLE_CLASS], &article.id, Vocab::ArticleTitle, &article.title);
}

pub struct ArticlesContentExtractor {
    recognizer: Box<dyn EntityRecognizer>,
    labels: LabelTable,
}

impl ArticlesContentExtractor {
    #[must_use]
    pub fn new(recognizer: Box<dyn EntityRecognizer>, labels: LabelTable) -> Self {
        Self { recognizer, labels }
    }
}

impl Default for ArticlesContentExtractor {
    fn default() -> Self {
        Self::new(Box::new(PatternRecognizer::for_articles()), LabelTable::articles())
    }
}

impl ContentExtractor for ArticlesContentExtractor {
    fn variant(&self) -> DocumentVariant {
        DocumentVariant::Articles
    }

    fn extract_content(
        &self,
        document: &Document,
        mention_text: &[String],
        out: &mut TripleBuilder,
    ) {
        let publication = document.publication.as_ref().map(|p| p.replace(' ', "_"));

        for (article, text) in document.articles.iter().zip(mention_text) {
            append_article(out, article);

            if let Some(publication) = &publication {
                out.append_uri(
                    &[ARTICLE_CLASS],
                    &article.id,
                    Vocab::IsPublishedOn,
                    &[PUBLICATION_CLASS],
                    publication,
                );
            }

            for mention in self.recognizer.recognize(text) {
                let class = self.labels.class_for(&mention.label);
                out.append_mention(article, &mention, class);
            }
        }
    }
}

pub struct ManualsContentExtractor {
    recognizer: Box<dyn EntityRecognizer>,
    labels: LabelTable,
}

impl ManualsContentExtractor {
    #[must_use]
    pub fn new(recognizer: Box<dyn EntityRecognizer>, labels: LabelTable) -> Self {
        Self { recognizer, labels }
    }
}

impl Default for ManualsContentExtractor {
    fn default() -> Self {
        Self::new(Box::new(PatternRecognizer::for_manuals()), LabelTable::manuals())
    }
}

impl ContentExtractor for ManualsContentExtractor {
    fn variant(&self) -> DocumentVariant {
        DocumentVariant::Manuals
    }

    fn extract_content(
        &self,
        document: &Document,
        mention_text: &[String],
        out: &mut TripleBuilder,
    ) {
        for (article, text) in document.articles.iter().zip(mention_text) {
            append_article(out, article);

            for mention in self.recognizer.recognize(text) {
                let class = self.labels.class_for(&mention.label);
                let reference = out.append_mention(article, &mention, class);

                if mention.label == LABEL_PUMP {
                    out.append_uri(
                        &[class],
                        &reference,
                        Vocab::PumpRelates,
                        &[ARTICLE_CLASS],
                        &article.id,
                    );
                }
            }
        }
    }
}

/// Runs publication extraction, the variant's content extraction and the
/// named-individual flush over a document.
pub struct TripleExtractor {
    builder: TripleBuilder,
    content: Box<dyn ContentExtractor>,
}

impl TripleExtractor {
    #[must_use]
    pub fn new(namespace: String, content: Box<dyn ContentExtractor>) -> Self {
        Self {
            builder: TripleBuilder::new(namespace),
            content,
        }
    }

    /// Extractor with the default recognizer and label table of `variant`.
    #[must_use]
    pub fn for_variant(variant: DocumentVariant, namespace: String) -> Self {
        let content: Box<dyn ContentExtractor> = match variant {
            DocumentVariant::Manuals => Box::new(ManualsContentExtractor::default()),
            DocumentVariant::Articles => Box::new(ArticlesContentExtractor::default()),
        };
        Self::new(namespace, content)
    }

    pub fn variant(&self) -> DocumentVariant {
        self.content.variant()
    }

    pub fn extract(&mut self, document: &Document) -> &[Triple] {
        self.extract_normalized(document, document)
    }

    /// Extracts from the normalized `document` while entity recognition runs
    /// over the articles of `original`, which still carry the punctuation
    /// e-mail addresses, links and dates need.
    pub fn extract_normalized(&mut self, document: &Document, original: &Document) -> &[Triple] {
        let mention_text = mention_texts(document, original);

        self.extract_publication(document);
        self.content.extract_content(document, &mention_text, &mut self.builder);
        self.builder.append_named_individuals();

        tracing::debug!(
            publisher = document.publisher(),
            triples = self.builder.triples().len(),
            individuals = self.builder.registry().len(),
            "Extracted triples"
        );
        self.builder.triples()
    }

    pub fn extract_publication(&mut self, document: &Document) {
        let Some(publication) = &document.publication else {
            return;
        };

        let publication_ref = publication.replace(' ', "_");
        let publisher_ref = document.publisher().replace(' ', "_");

        self.builder
            .queue_named_individual(&publication_ref, PUBLICATION_CLASS);
        self.builder.append_literal(
            &[PUBLICATION_CLASS],
            &publication_ref,
            Vocab::Name,
            publication,
        );

        self.builder
            .queue_named_individual(&publisher_ref, PUBLISHER_CLASS);
        self.builder.append_literal(
            &[PUBLISHER_CLASS],
            &publisher_ref,
            Vocab::Name,
            &publisher_ref,
        );

        self.builder.append_uri(
            &[PUBLISHER_CLASS],
            &publisher_ref,
            Vocab::Publishes,
            &[PUBLICATION_CLASS],
            &publication_ref,
        );
    }

    pub fn triples(&self) -> &[Triple] {
        self.builder.triples()
    }

    pub fn named_individuals(&self) -> &NamedIndividualRegistry {
        self.builder.registry()
    }

    pub fn graph(&self) -> TripleGraph {
        TripleGraph::from_triples(self.builder.triples())
    }

    /// Serialized graph (N-Triples, absolute IRIs only).
    pub fn serialize(&self) -> String {
        self.graph().to_ntriples()
    }

    pub fn clear(&mut self) {
        self.builder.clear();
    }
}
