use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RDF_NAMESPACE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const OWL_NAMESPACE: &str = "http://www.w3.org/2002/07/owl#";

#[derive(Debug, Error)]
pub enum RdfError {
    #[error("Unknown relation: {0}")]
    UnknownRelation(String),
}

pub type RdfResult<T> = Result<T, RdfError>;

/// An absolute IRI.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Iri(String);

impl Iri {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Iri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subject-position or object-position term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Term {
    Iri(Iri),
    Literal(String),
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Iri,
    pub relation: Iri,
    pub object: Term,
}

impl Triple {
    #[must_use]
    pub fn new(subject: Iri, relation: Iri, object: impl Into<Term>) -> Self {
        Self {
            subject,
            relation,
            object: object.into(),
        }
    }

    #[must_use]
    pub fn literal(subject: Iri, relation: Iri, literal: impl Into<String>) -> Self {
        Self {
            subject,
            relation,
            object: Term::Literal(literal.into()),
        }
    }
}

/// The closed set of vocabulary terms the extractor may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vocab {
    RdfType,
    OwlNamedIndividual,
    IsPublishedBy,
    Mentions,
    IsPublishedOn,
    Publishes,
    Email,
    DateMention,
    Link,
    Name,
    PublicationDay,
    PublicationMonth,
    PublicationYear,
    ArticleTitle,
    IsWrittenBy,
    PumpRelates,
}

impl Vocab {
    pub const ALL: [Self; 16] = [
        Self::RdfType,
        Self::OwlNamedIndividual,
        Self::IsPublishedBy,
        Self::Mentions,
        Self::IsPublishedOn,
        Self::Publishes,
        Self::Email,
        Self::DateMention,
        Self::Link,
        Self::Name,
        Self::PublicationDay,
        Self::PublicationMonth,
        Self::PublicationYear,
        Self::ArticleTitle,
        Self::IsWrittenBy,
        Self::PumpRelates,
    ];

    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::RdfType => "rdf",
            Self::OwlNamedIndividual => "owl",
            _ => "knox",
        }
    }

    #[must_use]
    pub fn local_name(&self) -> &'static str {
        match self {
            Self::RdfType => "type",
            Self::OwlNamedIndividual => "NamedIndividual",
            Self::IsPublishedBy => "isPublishedBy",
            Self::Mentions => "mentions",
            Self::IsPublishedOn => "isPublishedOn",
            Self::Publishes => "publishes",
            Self::Email => "Email",
            Self::DateMention => "DateMention",
            Self::Link => "Link",
            Self::Name => "Name",
            Self::PublicationDay => "PublicationDay",
            Self::PublicationMonth => "PublicationMonth",
            Self::PublicationYear => "PublicationYear",
            Self::ArticleTitle => "ArticleTitle",
            Self::IsWrittenBy => "isWrittenBy",
            Self::PumpRelates => "PumpRelates",
        }
    }

    /// Full IRI of the term. Knox terms live under the ontology namespace.
    #[must_use]
    pub fn iri(&self, ontology_namespace: &str) -> Iri {
        let namespace = match self.prefix() {
            "rdf" => RDF_NAMESPACE,
            "owl" => OWL_NAMESPACE,
            _ => ontology_namespace,
        };
        Iri(format!("{namespace}{}", self.local_name()))
    }
}

impl std::fmt::Display for Vocab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.prefix(), self.local_name())
    }
}

impl std::str::FromStr for Vocab {
    type Err = RdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, name) = s
            .split_once(':')
            .ok_or_else(|| RdfError::UnknownRelation(s.to_string()))?;

        Self::ALL
            .into_iter()
            .find(|v| v.prefix() == prefix && v.local_name() == name)
            .ok_or_else(|| RdfError::UnknownRelation(s.to_string()))
    }
}

/// The form a reference takes in the last IRI segment: `/` becomes `-`.
#[must_use]
pub fn reference_name(reference: &str) -> String {
    reference.replace('/', "-")
}

/// Builds `namespace + seg1/ + seg2/ + ... + reference` with every part
/// percent-encoded. A `/` inside the reference becomes `-` first so it can
/// never introduce an extra path segment.
#[must_use]
pub fn generate_uri_reference(namespace: &str, segments: &[&str], reference: &str) -> Iri {
    let mut iri = String::from(namespace);

    for segment in segments {
        iri.push_str(&urlencoding::encode(segment));
        iri.push('/');
    }

    iri.push_str(&urlencoding::encode(&reference_name(reference)));
    Iri(iri)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://example.org/";

    #[test]
    fn test_uri_reference_layout() {
        let iri = generate_uri_reference(NS, &["person", "important", "localhero"], "BobTheMan");
        assert_eq!(iri.as_str(), "http://example.org/person/important/localhero/BobTheMan");
    }

    #[test]
    fn test_uri_reference_without_segments() {
        let iri = generate_uri_reference(NS, &[], "Pump");
        assert_eq!(iri.as_str(), "http://example.org/Pump");
    }

    #[test]
    fn test_uri_reference_replaces_slash() {
        let iri = generate_uri_reference(NS, &["Pump"], "SQE 5/70");
        assert_eq!(iri.as_str(), "http://example.org/Pump/SQE%205-70");
    }

    #[test]
    fn test_uri_reference_encodes_segments() {
        let iri = generate_uri_reference(NS, &["a/b", "æ"], "x");
        assert_eq!(iri.as_str(), "http://example.org/a%2Fb/%C3%A6/x");
    }

    #[test]
    fn test_uri_reference_is_pure() {
        let inputs = [
            (NS, vec!["Article"], "0194-a"),
            ("http://knox#", vec!["Email"], "info@grundfos.com"),
            (NS, vec![], "with/slash and space"),
        ];

        for (ns, segments, reference) in inputs {
            let a = generate_uri_reference(ns, &segments, reference);
            let b = generate_uri_reference(ns, &segments, reference);
            assert_eq!(a, b);
            assert!(!a.as_str()[ns.len()..].contains("with/slash"));
        }
    }

    #[test]
    fn test_vocab_iris() {
        let ns = "http://knox.example/ontology#";

        assert_eq!(
            Vocab::RdfType.iri(ns).as_str(),
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#type"
        );
        assert_eq!(
            Vocab::OwlNamedIndividual.iri(ns).as_str(),
            "http://www.w3.org/2002/07/owl#NamedIndividual"
        );
        assert_eq!(Vocab::Mentions.iri(ns).as_str(), "http://knox.example/ontology#mentions");
    }

    #[test]
    fn test_vocab_parse_round_trip() {
        for vocab in Vocab::ALL {
            assert_eq!(vocab.to_string().parse::<Vocab>().unwrap(), vocab);
        }
    }

    #[test]
    fn test_vocab_parse_rejects_unknown() {
        assert!(matches!("knox:likes".parse::<Vocab>(), Err(RdfError::UnknownRelation(_))));
        assert!(matches!("xsd:string".parse::<Vocab>(), Err(RdfError::UnknownRelation(_))));
        assert!(matches!("type".parse::<Vocab>(), Err(RdfError::UnknownRelation(_))));
    }
}
