//! Structured-query boundary: SPARQL SELECT against a remote endpoint or a
//! local oxigraph store.
//!
//! - **Remote** ([`SparqlEndpoint`]): SPARQL 1.1 protocol over HTTP via `ureq`
//! - **Local** ([`LocalStore`]): in-process `oxigraph` store
//!
//! Both answer [`QueryService::select`] with one [`Row`] per solution, one
//! position per requested variable, `None` marking an unbound variable.

pub mod endpoint;
pub mod local;

use std::collections::BTreeMap;

pub use endpoint::{EndpointConfig, SparqlEndpoint};
pub use local::LocalStore;

use crate::error::QueryResult;

/// Default public Wikidata SPARQL endpoint.
pub const WIKIDATA_ENDPOINT: &str = "https://query.wikidata.org/sparql";

/// One solution row, positionally matching the requested variables.
pub type Row = Vec<Option<String>>;

/// A service that evaluates SPARQL SELECT queries.
pub trait QueryService: Send + Sync {
    /// Short human-readable name used in logs and errors.
    fn name(&self) -> String;

    /// Evaluate `query` and project `vars` (without the leading `?`).
    fn select(&self, query: &str, vars: &[&str]) -> QueryResult<Vec<Row>>;
}

/// Render a prefix map as SPARQL `PREFIX` declarations.
pub fn render_prefixes(prefixes: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (prefix, iri) in prefixes {
        out.push_str(&format!("PREFIX {prefix}: <{iri}>\n"));
    }
    out
}

/// Prefixes shared by every dataset facade.
pub fn standard_prefixes() -> BTreeMap<String, String> {
    [
        ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
        ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
        ("owl", "http://www.w3.org/2002/07/owl#"),
        ("unit", "http://qudt.org/vocab/unit#"),
        ("mesh", "http://id.nlm.nih.gov/mesh/"),
        ("obo", "http://purl.obolibrary.org/obo/"),
        ("pubchem", "http://rdf.ncbi.nlm.nih.gov/pubchem/vocabulary#"),
        ("compound", "http://rdf.ncbi.nlm.nih.gov/pubchem/compound/"),
        ("wd", "http://www.wikidata.org/entity/"),
        ("wdt", "http://www.wikidata.org/prop/direct/"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Escape a string for use inside a double-quoted SPARQL literal.
pub fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
