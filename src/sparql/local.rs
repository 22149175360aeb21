//! In-process SPARQL store backed by oxigraph.
//!
//! Holds triples produced by the ingestion layer (or loaded from RDF files)
//! and answers the same [`QueryService`] interface as a remote endpoint.

use std::io::Read;

use oxigraph::io::RdfFormat;
use oxigraph::model::Term;
use oxigraph::sparql::{QueryResults, QuerySolution};
use oxigraph::store::Store;

use super::{QueryService, Row};
use crate::error::{QueryError, QueryResult};
use crate::graph::{Node, TripleSet};

/// SPARQL-capable in-memory RDF store.
pub struct LocalStore {
    name: String,
    store: Store,
}

impl LocalStore {
    /// Create a new empty in-memory store.
    pub fn in_memory(name: impl Into<String>) -> QueryResult<Self> {
        let store = Store::new().map_err(|e| QueryError::Sparql {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self {
            name: name.into(),
            store,
        })
    }

    /// Parse RDF from `reader` into the default graph.
    pub fn load(&self, format: RdfFormat, reader: impl Read) -> QueryResult<()> {
        self.store
            .load_from_reader(format, reader)
            .map_err(|e| QueryError::RdfLoad {
                message: e.to_string(),
            })
    }

    /// Parse N-Triples from a string.
    pub fn load_ntriples(&self, data: &str) -> QueryResult<()> {
        self.load(RdfFormat::NTriples, data.as_bytes())
    }

    /// Open an RDF file, guessing the format from its extension.
    pub fn load_file(&self, path: &std::path::Path) -> QueryResult<()> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(RdfFormat::from_extension)
            .ok_or_else(|| QueryError::RdfLoad {
                message: format!("unknown RDF format for {}", path.display()),
            })?;
        let file = std::fs::File::open(path).map_err(|e| QueryError::RdfLoad {
            message: format!("failed to open {}: {e}", path.display()),
        })?;
        self.load(format, std::io::BufReader::new(file))
    }

    /// Number of quads in the store.
    pub fn len(&self) -> QueryResult<usize> {
        self.store.len().map_err(|e| QueryError::Sparql {
            message: e.to_string(),
        })
    }

    pub fn is_empty(&self) -> QueryResult<bool> {
        self.len().map(|n| n == 0)
    }

    /// Snapshot every triple of the default graph.
    pub fn triple_set(&self) -> QueryResult<TripleSet> {
        store_triples(&self.store)
    }

    /// Get internal store reference (for advanced oxigraph operations).
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn evaluate(&self, sparql: &str) -> QueryResult<Vec<QuerySolution>> {
        evaluate(&self.store, sparql)
    }
}

fn evaluate(store: &Store, sparql: &str) -> QueryResult<Vec<QuerySolution>> {
    let results = store.query(sparql).map_err(|e| QueryError::Sparql {
        message: format!("SPARQL query failed: {e}"),
    })?;

    match results {
        QueryResults::Solutions(solutions) => solutions
            .map(|s| {
                s.map_err(|e| QueryError::Sparql {
                    message: format!("solution error: {e}"),
                })
            })
            .collect(),
        _ => Err(QueryError::Sparql {
            message: "expected SELECT solutions".into(),
        }),
    }
}

/// Every triple of the default graph of a raw oxigraph store.
pub(crate) fn store_triples(store: &Store) -> QueryResult<TripleSet> {
    let results = evaluate(store, "SELECT ?s ?p ?o WHERE { ?s ?p ?o }")?;
    let mut set = TripleSet::new();
    for solution in results {
        let (Some(s), Some(p), Some(o)) = (
            solution.get("s").map(term_to_node),
            solution.get("p").map(term_value),
            solution.get("o").map(term_to_node),
        ) else {
            continue;
        };
        set.insert(s, p, o);
    }
    Ok(set)
}

impl QueryService for LocalStore {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn select(&self, query: &str, vars: &[&str]) -> QueryResult<Vec<Row>> {
        let solutions = self.evaluate(query)?;
        Ok(solutions
            .iter()
            .map(|solution| {
                vars.iter()
                    .map(|v| solution.get(*v).map(term_value))
                    .collect()
            })
            .collect())
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").field("name", &self.name).finish()
    }
}

/// Lexical value of a term: IRI string, literal value, or blank node id.
pub(crate) fn term_value(term: &Term) -> String {
    match term {
        Term::NamedNode(n) => n.as_str().to_string(),
        Term::Literal(l) => l.value().to_string(),
        Term::BlankNode(b) => format!("_:{}", b.as_str()),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}

pub(crate) fn term_to_node(term: &Term) -> Node {
    match term {
        Term::NamedNode(n) => Node::Iri(n.as_str().to_string()),
        Term::Literal(l) => Node::Literal(l.value().to_string()),
        Term::BlankNode(b) => Node::Blank(b.as_str().to_string()),
        #[allow(unreachable_patterns)]
        other => Node::Blank(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"
<http://example.org/a> <http://www.w3.org/2002/07/owl#sameAs> <http://example.org/b> .
<http://example.org/a> <http://www.w3.org/2000/01/rdf-schema#label> "Aspirin" .
_:x <http://www.w3.org/2000/01/rdf-schema#label> "orphan" .
"#;

    fn store() -> LocalStore {
        let store = LocalStore::in_memory("test").unwrap();
        store.load_ntriples(DATA).unwrap();
        store
    }

    #[test]
    fn load_and_count() {
        assert_eq!(store().len().unwrap(), 3);
    }

    #[test]
    fn select_projects_requested_vars() {
        let rows = store()
            .select(
                "SELECT ?s ?o WHERE { ?s <http://www.w3.org/2002/07/owl#sameAs> ?o }",
                &["s", "o"],
            )
            .unwrap();
        assert_eq!(
            rows,
            vec![vec![
                Some("http://example.org/a".to_string()),
                Some("http://example.org/b".to_string())
            ]]
        );
    }

    #[test]
    fn unprojected_var_is_none() {
        let rows = store()
            .select(
                "SELECT ?s WHERE { ?s <http://www.w3.org/2002/07/owl#sameAs> ?o }",
                &["s", "missing"],
            )
            .unwrap();
        assert_eq!(rows[0][1], None);
    }

    #[test]
    fn literal_values_are_unquoted() {
        let rows = store()
            .select(
                "SELECT ?l WHERE { <http://example.org/a> <http://www.w3.org/2000/01/rdf-schema#label> ?l }",
                &["l"],
            )
            .unwrap();
        assert_eq!(rows[0][0].as_deref(), Some("Aspirin"));
    }

    #[test]
    fn bad_query_is_sparql_error() {
        let err = store().select("SELEKT nothing", &["s"]).unwrap_err();
        assert!(matches!(err, QueryError::Sparql { .. }));
    }

    #[test]
    fn triple_set_snapshot() {
        let set = store().triple_set().unwrap();
        assert_eq!(set.len(), 3);
    }
}
