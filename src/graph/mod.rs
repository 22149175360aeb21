//! Triple collections and label extraction.
//!
//! The approximate alignment strategies only need three things from a graph:
//! all subjects, all objects of a subject, and whether an object is a literal.
//! [`TripleCollection`] captures exactly that; [`TripleSet`] is an in-memory
//! implementation; [`LocalStore`](crate::sparql::LocalStore) and a raw oxigraph
//! `Store` are adapted through a snapshot of their default graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use oxigraph::store::Store;

use crate::error::QueryResult;
use crate::sparql::local::store_triples;
use crate::sparql::{LocalStore, QueryService};

/// `{entity -> text labels}` used by approximate string alignment.
pub type LabelDict = BTreeMap<String, Vec<String>>;

/// An RDF term as seen by the alignment engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Node {
    Iri(String),
    Literal(String),
    Blank(String),
}

impl Node {
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// String key for this node: the IRI, the literal value, or `_:id`.
    pub fn key(&self) -> String {
        match self {
            Self::Iri(iri) => iri.clone(),
            Self::Literal(value) => value.clone(),
            Self::Blank(id) => format!("_:{id}"),
        }
    }
}

/// A read-only collection of triples.
pub trait TripleCollection {
    /// Every distinct subject.
    fn subjects(&self) -> Vec<Node>;

    /// Every object attached to `subject`, across all predicates.
    fn objects(&self, subject: &Node) -> Vec<Node>;

    /// Map each subject to the literal values attached to it.
    ///
    /// Subjects without literals are kept with an empty label list.
    fn label_dict(&self) -> LabelDict {
        self.subjects()
            .into_iter()
            .map(|s| {
                let labels = self
                    .objects(&s)
                    .into_iter()
                    .filter_map(|o| match o {
                        Node::Literal(value) => Some(value),
                        _ => None,
                    })
                    .collect();
                (s.key(), labels)
            })
            .collect()
    }

    /// Like [`label_dict`](Self::label_dict), but reports a collection that
    /// cannot be read instead of treating it as empty.
    fn try_label_dict(&self) -> QueryResult<LabelDict> {
        Ok(self.label_dict())
    }
}

/// In-memory triple collection indexed by subject.
#[derive(Debug, Clone, Default)]
pub struct TripleSet {
    by_subject: BTreeMap<Node, Vec<(String, Node)>>,
    len: usize,
}

impl TripleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a triple. Exact duplicates are ignored.
    pub fn insert(&mut self, subject: Node, predicate: impl Into<String>, object: Node) {
        let predicate = predicate.into();
        let edges = self.by_subject.entry(subject).or_default();
        if edges.iter().any(|(p, o)| *p == predicate && *o == object) {
            return;
        }
        edges.push((predicate, object));
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Objects of `subject` via `predicate`.
    pub fn objects_by(&self, subject: &Node, predicate: &str) -> Vec<Node> {
        self.by_subject
            .get(subject)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|(p, _)| p == predicate)
                    .map(|(_, o)| o.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TripleCollection for TripleSet {
    fn subjects(&self) -> Vec<Node> {
        self.by_subject.keys().cloned().collect()
    }

    fn objects(&self, subject: &Node) -> Vec<Node> {
        self.by_subject
            .get(subject)
            .map(|edges| edges.iter().map(|(_, o)| o.clone()).collect())
            .unwrap_or_default()
    }
}

impl TripleCollection for LocalStore {
    fn subjects(&self) -> Vec<Node> {
        self.snapshot().subjects()
    }

    fn objects(&self, subject: &Node) -> Vec<Node> {
        self.snapshot().objects(subject)
    }

    /// Single pass over the store instead of one query per subject.
    fn label_dict(&self) -> LabelDict {
        self.snapshot().label_dict()
    }

    fn try_label_dict(&self) -> QueryResult<LabelDict> {
        Ok(self.triple_set()?.label_dict())
    }
}

impl TripleCollection for Store {
    fn subjects(&self) -> Vec<Node> {
        snapshot(self, "oxigraph").subjects()
    }

    fn objects(&self, subject: &Node) -> Vec<Node> {
        snapshot(self, "oxigraph").objects(subject)
    }

    fn label_dict(&self) -> LabelDict {
        snapshot(self, "oxigraph").label_dict()
    }

    fn try_label_dict(&self) -> QueryResult<LabelDict> {
        Ok(store_triples(self)?.label_dict())
    }
}

impl LocalStore {
    fn snapshot(&self) -> TripleSet {
        snapshot(self.store(), &QueryService::name(self))
    }
}

fn snapshot(store: &Store, name: &str) -> TripleSet {
    match store_triples(store) {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!(
                store = %name,
                error = %e,
                "failed to read triples, treating store as empty"
            );
            TripleSet::new()
        }
    }
}

/// Extract a [`LabelDict`] from any triple collection.
pub fn graph_to_label_dict<G: TripleCollection + ?Sized>(graph: &G) -> LabelDict {
    graph.label_dict()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
    const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

    fn taxonomy() -> TripleSet {
        let mut set = TripleSet::new();
        let human = Node::iri("https://ncbi.example/taxon/9606");
        set.insert(human.clone(), RDFS_LABEL, Node::literal("Homo sapiens"));
        set.insert(human.clone(), RDFS_LABEL, Node::literal("human"));
        set.insert(human, RDF_TYPE, Node::iri("https://ncbi.example/Taxon"));
        set.insert(
            Node::iri("https://ncbi.example/Taxon"),
            RDF_TYPE,
            Node::iri("http://www.w3.org/2002/07/owl#Class"),
        );
        set
    }

    #[test]
    fn duplicate_triples_are_ignored() {
        let mut set = taxonomy();
        let before = set.len();
        set.insert(
            Node::iri("https://ncbi.example/taxon/9606"),
            RDFS_LABEL,
            Node::literal("human"),
        );
        assert_eq!(set.len(), before);
    }

    #[test]
    fn label_dict_keeps_only_literals() {
        let dict = graph_to_label_dict(&taxonomy());
        assert_eq!(
            dict["https://ncbi.example/taxon/9606"],
            vec!["Homo sapiens".to_string(), "human".to_string()]
        );
        assert!(dict["https://ncbi.example/Taxon"].is_empty());
    }

    #[test]
    fn objects_by_predicate() {
        let set = taxonomy();
        let types = set.objects_by(&Node::iri("https://ncbi.example/taxon/9606"), RDF_TYPE);
        assert_eq!(types, vec![Node::iri("https://ncbi.example/Taxon")]);
    }

    #[test]
    fn local_store_label_dict_matches_triple_set() {
        let store = LocalStore::in_memory("labels").unwrap();
        store
            .load_ntriples(
                "<http://ex.org/a> <http://www.w3.org/2000/01/rdf-schema#label> \"Daphnia magna\" .\n\
                 <http://ex.org/a> <http://ex.org/rank> <http://ex.org/species> .\n",
            )
            .unwrap();
        let dict = store.label_dict();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict["http://ex.org/a"], vec!["Daphnia magna".to_string()]);
        assert_eq!(store.store().label_dict(), dict);
        assert_eq!(store.try_label_dict().unwrap(), dict);
        assert_eq!(store.store().try_label_dict().unwrap(), dict);
    }

    /// A collection whose reads always fail.
    struct Unreadable;

    impl TripleCollection for Unreadable {
        fn subjects(&self) -> Vec<Node> {
            Vec::new()
        }

        fn objects(&self, _subject: &Node) -> Vec<Node> {
            Vec::new()
        }

        fn try_label_dict(&self) -> QueryResult<LabelDict> {
            Err(crate::error::QueryError::Sparql {
                message: "store closed".into(),
            })
        }
    }

    #[test]
    fn try_label_dict_surfaces_read_failures() {
        assert!(Unreadable.label_dict().is_empty());
        assert!(Unreadable.try_label_dict().is_err());
        assert_eq!(taxonomy().try_label_dict().unwrap(), taxonomy().label_dict());
    }
}
