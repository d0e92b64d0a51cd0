//! In-memory triple graph and its N-Triples rendering.
//!
//! N-Triples is a subset of Turtle: one triple per line, absolute IRIs only,
//! no prefix declarations. The store ingests it as Turtle.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use super::term::{Iri, Term, Triple};

/// Directed labelled graph: nodes are terms, edges carry the relation IRI.
/// Adding a triple that is already present is a no-op.
#[derive(Debug, Default)]
pub struct TripleGraph {
    graph: DiGraph<Term, Iri>,
    nodes: HashMap<Term, NodeIndex>,
}

impl TripleGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_triples<'a>(triples: impl IntoIterator<Item = &'a Triple>) -> Self {
        let mut graph = Self::new();
        for triple in triples {
            graph.add(triple);
        }
        graph
    }

    fn node(&mut self, term: Term) -> NodeIndex {
        if let Some(&index) = self.nodes.get(&term) {
            return index;
        }
        let index = self.graph.add_node(term.clone());
        self.nodes.insert(term, index);
        index
    }

    /// Returns `false` when the triple was already in the graph.
    pub fn add(&mut self, triple: &Triple) -> bool {
        let subject = self.node(Term::Iri(triple.subject.clone()));
        let object = self.node(triple.object.clone());

        if self
            .graph
            .edges_connecting(subject, object)
            .any(|edge| edge.weight() == &triple.relation)
        {
            return false;
        }

        self.graph.add_edge(subject, object, triple.relation.clone());
        true
    }

    pub fn len(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        let Some(&subject) = self.nodes.get(&Term::Iri(triple.subject.clone())) else {
            return false;
        };
        let Some(&object) = self.nodes.get(&triple.object) else {
            return false;
        };
        self.graph
            .edges_connecting(subject, object)
            .any(|edge| edge.weight() == &triple.relation)
    }

    /// All triples in canonical (sorted) order.
    pub fn triples(&self) -> Vec<Triple> {
        let mut triples: Vec<Triple> = self
            .graph
            .edge_references()
            .filter_map(|edge| {
                let Term::Iri(subject) = &self.graph[edge.source()] else {
                    return None;
                };
                Some(Triple {
                    subject: subject.clone(),
                    relation: edge.weight().clone(),
                    object: self.graph[edge.target()].clone(),
                })
            })
            .collect();
        triples.sort();
        triples
    }

    /// Number of distinct subjects that have at least one outgoing triple.
    pub fn subject_count(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&n| self.graph.edges(n).next().is_some())
            .count()
    }

    #[must_use]
    pub fn to_ntriples(&self) -> String {
        let mut out = String::with_capacity(self.len() * 128);
        for triple in self.triples() {
            write_triple(&mut out, &triple);
        }
        out
    }
}

fn write_triple(out: &mut String, triple: &Triple) {
    out.push('<');
    out.push_str(triple.subject.as_str());
    out.push_str("> <");
    out.push_str(triple.relation.as_str());
    out.push_str("> ");
    match &triple.object {
        Term::Iri(iri) => {
            out.push('<');
            out.push_str(iri.as_str());
            out.push('>');
        }
        Term::Literal(value) => {
            out.push('"');
            out.push_str(&escape_literal(value));
            out.push('"');
        }
    }
    out.push_str(" .\n");
}

fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}
