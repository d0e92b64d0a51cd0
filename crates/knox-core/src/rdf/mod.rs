//! Knowledge-graph extraction: vocabulary, entity recognition and the
//! per-publisher triple extractors.

pub mod extractor;
pub mod graph;
pub mod recognizer;
pub mod term;

pub use extractor::{
    ArticlesContentExtractor, ContentExtractor, LabelTable, ManualsContentExtractor,
    NamedIndividualRegistry, TripleBuilder, TripleExtractor,
};
pub use graph::TripleGraph;
pub use recognizer::{EntityMention, EntityRecognizer, MentionPattern, PatternRecognizer};
pub use term::{
    generate_uri_reference, reference_name, Iri, RdfError, RdfResult, Term, Triple, Vocab,
};
