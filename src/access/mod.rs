//! Data-access facade: one per dataset.
//!
//! A [`DataAccess`] owns the dataset's query service (a remote endpoint or a
//! local store), its namespace and prefixes, and the [`SchemeRegistry`] of
//! alignments that [`DataAccess::convert_id`] routes through.

pub mod fingerprint;
pub mod presets;
pub mod router;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub use fingerprint::{FingerprintSource, PubChemFingerprints, StaticFingerprints};
pub use router::SchemeRegistry;

use crate::align::Alignment;
use crate::error::{QueryError, QueryResult, RouteResult, TeraResult};
use crate::identifier::{Conversion, Converted, IdInput};
use crate::similarity::{tanimoto, Fingerprint};
use crate::sparql::{escape_literal, render_prefixes, standard_prefixes, QueryService, Row};

/// Per-dataset facade over a query service and its identifier alignments.
pub struct DataAccess {
    name: String,
    namespace: String,
    prefixes: BTreeMap<String, String>,
    service: Option<Arc<dyn QueryService>>,
    fingerprints: Option<Arc<dyn FingerprintSource>>,
    registry: SchemeRegistry,
}

/// Scheme fingerprints are looked up in.
const FINGERPRINT_SCHEME: &str = "cid";

impl DataAccess {
    /// Facade with no query service and no alignments.
    ///
    /// The dataset namespace is bound to the `ns:` prefix.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, hub: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let mut prefixes = standard_prefixes();
        prefixes.insert("ns".into(), namespace.clone());
        Self {
            name: name.into(),
            namespace,
            prefixes,
            service: None,
            fingerprints: None,
            registry: SchemeRegistry::new(hub),
        }
    }

    pub fn with_service(mut self, service: Arc<dyn QueryService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_fingerprints(mut self, source: Arc<dyn FingerprintSource>) -> Self {
        self.fingerprints = Some(source);
        self
    }

    pub fn with_alignment(mut self, scheme: impl Into<String>, alignment: Alignment) -> Self {
        self.register(scheme, Arc::new(alignment));
        self
    }

    /// Register (or replace) the alignment from the hub to `scheme`.
    pub fn register(&mut self, scheme: impl Into<String>, alignment: Arc<Alignment>) {
        self.registry.register(scheme, alignment);
    }

    /// Add a query prefix; an existing prefix is overwritten.
    pub fn add_prefix(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn hub(&self) -> &str {
        self.registry.hub()
    }

    pub fn registry(&self) -> &SchemeRegistry {
        &self.registry
    }

    pub fn service(&self) -> Option<&Arc<dyn QueryService>> {
        self.service.as_ref()
    }

    /// Convert identifiers between any two available schemes.
    ///
    /// Routing goes through the hub: see [`SchemeRegistry::convert`].
    pub fn convert_id(
        &self,
        input: impl Into<IdInput>,
        from: &str,
        to: &str,
        strip: bool,
    ) -> RouteResult<Converted> {
        let input = input.into();
        tracing::debug!(
            facade = %self.name,
            from,
            to,
            ids = input.len(),
            "converting identifiers"
        );
        self.registry.convert(&self.name, &input, from, to, strip)
    }

    /// Schemes that can be passed to [`convert_id`](Self::convert_id).
    pub fn available_conversions(&self) -> BTreeSet<String> {
        self.registry.available_conversions()
    }

    /// Fingerprints of compounds given in scheme `from`, keyed by input id.
    ///
    /// Inputs are converted to `cid` first; compounds without a CID or without
    /// a fingerprint are left out.
    pub fn fingerprints(
        &self,
        input: impl Into<IdInput>,
        from: &str,
        strip: bool,
    ) -> TeraResult<BTreeMap<String, Fingerprint>> {
        let source = self
            .fingerprints
            .as_ref()
            .ok_or_else(|| QueryError::NoFingerprints {
                facade: self.name.clone(),
            })?;
        let input = input.into();
        let key = match &input {
            IdInput::One(id) => id.clone(),
            IdInput::Many(_) => String::new(),
        };
        let cids = self
            .convert_id(input, from, FINGERPRINT_SCHEME, strip)?
            .into_map(&key);

        let mut out = BTreeMap::new();
        for (id, conversion) in cids {
            let Conversion::Mapped(cid) = conversion else {
                continue;
            };
            if let Some(fingerprint) = source.fingerprint(&cid)? {
                out.insert(id, fingerprint);
            }
        }
        Ok(out)
    }

    /// Tanimoto similarity of `id` to each of `others`, all in scheme `from`.
    ///
    /// Compounds without a fingerprint are left out; when `id` itself has
    /// none the result is empty.
    pub fn similarity(
        &self,
        id: &str,
        others: impl Into<IdInput>,
        from: &str,
        strip: bool,
    ) -> TeraResult<BTreeMap<String, f64>> {
        let Some(reference) = self.fingerprints(id, from, strip)?.remove(id) else {
            tracing::debug!(facade = %self.name, id, "no fingerprint for reference compound");
            return Ok(BTreeMap::new());
        };
        Ok(self
            .fingerprints(others, from, strip)?
            .into_iter()
            .map(|(other, fp)| {
                let score = tanimoto(&reference, &fp);
                (other, score)
            })
            .collect())
    }

    /// Run a SELECT with the facade prefixes prepended.
    pub fn query(&self, body: &str, vars: &[&str]) -> QueryResult<Vec<Row>> {
        let service = self.service.as_ref().ok_or_else(|| QueryError::NoService {
            facade: self.name.clone(),
        })?;
        let query = format!("{}{body}", render_prefixes(&self.prefixes));
        service.select(&query, vars)
    }

    fn query_set(&self, body: &str) -> QueryResult<BTreeSet<String>> {
        Ok(self
            .query(body, &["s"])?
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect())
    }

    /// Entities with `rdf:type <class>`.
    pub fn query_type(&self, class: &str) -> QueryResult<BTreeSet<String>> {
        self.query_set(&format!("SELECT ?s WHERE {{ ?s rdf:type <{class}> . }}"))
    }

    /// Direct subclasses of `parent`.
    pub fn query_child(&self, parent: &str) -> QueryResult<BTreeSet<String>> {
        self.query_set(&format!("SELECT ?s WHERE {{ ?s rdfs:subClassOf <{parent}> . }}"))
    }

    /// Direct superclasses of `child`.
    pub fn query_parent(&self, child: &str) -> QueryResult<BTreeSet<String>> {
        self.query_set(&format!("SELECT ?s WHERE {{ <{child}> rdfs:subClassOf ?s . }}"))
    }

    /// Entities whose `rdfs:label` is exactly `label`.
    pub fn query_label(&self, label: &str) -> QueryResult<BTreeSet<String>> {
        self.query_set(&format!(
            "SELECT ?s WHERE {{ ?s rdfs:label \"{}\" . }}",
            escape_literal(label)
        ))
    }

    /// `(property, literal)` pairs for properties declared sub-properties of
    /// `rdfs:label`.
    pub fn query_alt_labels(&self, entity: &str) -> QueryResult<BTreeSet<(String, String)>> {
        let rows = self.query(
            &format!(
                "SELECT ?p ?s WHERE {{\n  <{entity}> ?p ?s .\n  ?p rdfs:subPropertyOf rdfs:label .\n  FILTER(isLiteral(?s))\n}}"
            ),
            &["p", "s"],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let mut it = row.into_iter();
                match (it.next().flatten(), it.next().flatten()) {
                    (Some(p), Some(s)) => Some((p, s)),
                    _ => None,
                }
            })
            .collect())
    }
}

impl std::fmt::Debug for DataAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataAccess")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("hub", &self.registry.hub())
            .field("schemes", &self.registry.schemes().collect::<Vec<_>>())
            .field("service", &self.service.as_ref().map(|s| s.name()))
            .field("fingerprints", &self.fingerprints.as_ref().map(|s| s.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::MappingTable;
    use crate::error::RouteError;
    use crate::identifier::Conversion;
    use crate::sparql::LocalStore;

    const NS: &str = "https://cfpub.epa.gov/ecotox/";

    fn store() -> Arc<dyn QueryService> {
        let store = LocalStore::in_memory("ecotox").unwrap();
        store
            .load_ntriples(
                r#"
<https://cfpub.epa.gov/ecotox/taxon/1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <https://cfpub.epa.gov/ecotox/Taxon> .
<https://cfpub.epa.gov/ecotox/taxon/2> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <https://cfpub.epa.gov/ecotox/Taxon> .
<https://cfpub.epa.gov/ecotox/taxon/2> <http://www.w3.org/2000/01/rdf-schema#subClassOf> <https://cfpub.epa.gov/ecotox/taxon/1> .
<https://cfpub.epa.gov/ecotox/taxon/2> <http://www.w3.org/2000/01/rdf-schema#label> "Daphnia \"water flea\" magna" .
<https://cfpub.epa.gov/ecotox/commonName> <http://www.w3.org/2000/01/rdf-schema#subPropertyOf> <http://www.w3.org/2000/01/rdf-schema#label> .
<https://cfpub.epa.gov/ecotox/taxon/2> <https://cfpub.epa.gov/ecotox/commonName> "water flea" .
<https://cfpub.epa.gov/ecotox/taxon/2> <https://cfpub.epa.gov/ecotox/commonName> <https://cfpub.epa.gov/ecotox/notALiteral> .
"#,
            )
            .unwrap();
        Arc::new(store)
    }

    fn facade() -> DataAccess {
        let table: MappingTable = [("9606", "327955")].into_iter().collect();
        DataAccess::new("Taxonomy API", NS, "ncbi")
            .with_service(store())
            .with_alignment("eol", Alignment::from_table("eol", table))
    }

    #[test]
    fn type_child_parent_queries() {
        let api = facade();
        let taxa = api.query_type(&format!("{NS}Taxon")).unwrap();
        assert_eq!(taxa.len(), 2);
        assert!(api
            .query_child(&format!("{NS}taxon/1"))
            .unwrap()
            .contains(&format!("{NS}taxon/2")));
        assert!(api
            .query_parent(&format!("{NS}taxon/2"))
            .unwrap()
            .contains(&format!("{NS}taxon/1")));
    }

    #[test]
    fn label_query_escapes_quotes() {
        let found = facade().query_label("Daphnia \"water flea\" magna").unwrap();
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![format!("{NS}taxon/2")]
        );
    }

    #[test]
    fn alt_labels_only_literals() {
        let alt = facade().query_alt_labels(&format!("{NS}taxon/2")).unwrap();
        assert_eq!(alt.len(), 1);
        assert!(alt.contains(&(format!("{NS}commonName"), "water flea".to_string())));
    }

    #[test]
    fn ns_prefix_is_bound_to_namespace() {
        let rows = facade()
            .query("SELECT ?s WHERE { ?s a ns:Taxon . }", &["s"])
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn query_without_service_fails() {
        let api = DataAccess::new("bare", NS, "ncbi");
        let err = api.query_type("http://x.org/T").unwrap_err();
        assert!(matches!(err, QueryError::NoService { .. }));
    }

    #[test]
    fn convert_through_facade() {
        let api = facade();
        assert_eq!(
            api.convert_id("9606", "ncbi", "eol", false).unwrap(),
            Converted::One(Conversion::Mapped("327955".into()))
        );
        assert_eq!(
            api.convert_id("327955", "eol", "ncbi", false).unwrap(),
            Converted::One(Conversion::Mapped("9606".into()))
        );
        assert!(matches!(
            api.convert_id("9606", "ncbi", "gbif", false),
            Err(RouteError::Unsupported { .. })
        ));
    }

    fn chemical_with_fingerprints() -> DataAccess {
        let cids: MappingTable = [("KEY-A", "2244"), ("KEY-B", "1983"), ("KEY-C", "7")]
            .into_iter()
            .collect();
        let fingerprints: StaticFingerprints = [
            ("2244", Fingerprint::from_hex("F0").unwrap()),
            ("1983", Fingerprint::from_hex("FF").unwrap()),
        ]
        .into_iter()
        .collect();
        DataAccess::new("Chemical API", NS, "inchikey")
            .with_alignment("cid", Alignment::from_table("cid", cids))
            .with_fingerprints(Arc::new(fingerprints))
    }

    #[test]
    fn similarity_routes_through_cid() {
        let api = chemical_with_fingerprints();
        let scores = api
            .similarity("KEY-A", vec!["KEY-A", "KEY-B", "KEY-C", "KEY-X"], "inchikey", false)
            .unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores["KEY-A"], 1.0);
        assert_eq!(scores["KEY-B"], 0.5);
    }

    #[test]
    fn similarity_without_reference_fingerprint_is_empty() {
        let api = chemical_with_fingerprints();
        let scores = api
            .similarity("KEY-C", vec!["KEY-A", "KEY-B"], "inchikey", false)
            .unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn fingerprints_without_source_fail() {
        let err = facade().fingerprints("9606", "ncbi", false).unwrap_err();
        assert!(matches!(
            err,
            crate::error::TeraError::Query(QueryError::NoFingerprints { .. })
        ));
    }

    #[test]
    fn available_conversions_is_hub_plus_schemes() {
        let schemes = facade().available_conversions();
        assert!(schemes.contains("ncbi"));
        assert!(schemes.contains("eol"));
        assert_eq!(schemes.len(), 2);
    }
}
