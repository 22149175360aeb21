//! Exact source mappings pulled from a structured-query service.
//!
//! - [`EndpointMapping`]: pairs related by `owl:sameAs`
//! - [`PropertyPairMapping`]: two identifier-valued properties of one subject,
//!   typically Wikidata external-id properties

use std::fmt;
use std::sync::Arc;

use super::{MappingSource, MappingTable};
use crate::error::{LoadError, LoadResult};
use crate::sparql::{QueryService, Row};

const OWL_SAME_AS: &str = "http://www.w3.org/2002/07/owl#sameAs";
const WDT: &str = "http://www.wikidata.org/prop/direct/";

/// Build a table from `(from, to)` rows; rows with a null position are skipped.
fn table_from_rows(rows: Vec<Row>) -> MappingTable {
    let mut table = MappingTable::new();
    for row in rows {
        let mut it = row.into_iter();
        if let (Some(Some(from)), Some(Some(to))) = (it.next(), it.next()) {
            table.insert(from, to);
        }
    }
    table
}

/// `owl:sameAs` pairs published by a query service.
pub struct EndpointMapping {
    service: Arc<dyn QueryService>,
}

impl EndpointMapping {
    pub fn new(service: Arc<dyn QueryService>) -> Self {
        Self { service }
    }

    pub fn query() -> String {
        format!("SELECT ?s ?o WHERE {{ ?s <{OWL_SAME_AS}> ?o . }}")
    }
}

impl MappingSource for EndpointMapping {
    fn describe(&self) -> String {
        format!("owl:sameAs @ {}", self.service.name())
    }

    fn load(&self) -> LoadResult<MappingTable> {
        let rows = self
            .service
            .select(&Self::query(), &["s", "o"])
            .map_err(|source| LoadError::Query {
                source_name: self.service.name(),
                source,
            })?;
        Ok(table_from_rows(rows))
    }
}

/// Wikidata external-identifier properties used by the presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WikidataProperty {
    /// P235
    InChIKey,
    /// P231
    Cas,
    /// P662
    PubChemCid,
    /// P683
    ChEBI,
    /// P592
    ChEMBL,
    /// P486
    MeSH,
    /// P685
    NcbiTaxon,
    /// P830
    Eol,
}

impl WikidataProperty {
    /// The property id, e.g. `"P235"`.
    pub fn id(self) -> &'static str {
        match self {
            Self::InChIKey => "P235",
            Self::Cas => "P231",
            Self::PubChemCid => "P662",
            Self::ChEBI => "P683",
            Self::ChEMBL => "P592",
            Self::MeSH => "P486",
            Self::NcbiTaxon => "P685",
            Self::Eol => "P830",
        }
    }

    /// Full `wdt:` IRI of the property.
    pub fn iri(self) -> String {
        format!("{WDT}{}", self.id())
    }
}

impl fmt::Display for WikidataProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Pairs `(?from, ?to)` selected by an arbitrary query over a service.
///
/// The query must project the variables `from` and `to`.
pub struct PropertyPairMapping {
    service: Arc<dyn QueryService>,
    query: String,
    label: String,
}

impl PropertyPairMapping {
    pub fn new(service: Arc<dyn QueryService>, query: impl Into<String>) -> Self {
        Self {
            service,
            query: query.into(),
            label: "custom query".into(),
        }
    }

    /// Values of `from` and `to` on the same subject.
    pub fn properties(service: Arc<dyn QueryService>, from_iri: &str, to_iri: &str) -> Self {
        let query = format!(
            "SELECT ?from ?to WHERE {{\n  ?item <{from_iri}> ?from .\n  ?item <{to_iri}> ?to .\n}}"
        );
        Self {
            service,
            query,
            label: format!("<{from_iri}> -> <{to_iri}>"),
        }
    }

    /// Wikidata items carrying both external identifiers.
    pub fn wikidata(
        service: Arc<dyn QueryService>,
        from: WikidataProperty,
        to: WikidataProperty,
    ) -> Self {
        let mut mapping = Self::properties(service, &from.iri(), &to.iri());
        mapping.label = format!("wikidata {from}->{to}");
        mapping
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl MappingSource for PropertyPairMapping {
    fn describe(&self) -> String {
        format!("{} @ {}", self.label, self.service.name())
    }

    fn load(&self) -> LoadResult<MappingTable> {
        let rows = self
            .service
            .select(&self.query, &["from", "to"])
            .map_err(|source| LoadError::Query {
                source_name: self.service.name(),
                source,
            })?;
        Ok(table_from_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::Alignment;
    use crate::error::QueryError;
    use crate::identifier::Conversion;
    use crate::sparql::LocalStore;

    fn wikidata_like() -> Arc<dyn QueryService> {
        let store = LocalStore::in_memory("wikidata-fixture").unwrap();
        store
            .load_ntriples(
                r#"
<http://www.wikidata.org/entity/Q18216> <http://www.wikidata.org/prop/direct/P235> "BSYNRYMUTXBXSQ-UHFFFAOYSA-N" .
<http://www.wikidata.org/entity/Q18216> <http://www.wikidata.org/prop/direct/P231> "50-78-2" .
<http://www.wikidata.org/entity/Q18216> <http://www.wikidata.org/prop/direct/P662> "2244" .
<http://www.wikidata.org/entity/Q2270> <http://www.wikidata.org/prop/direct/P235> "RZVAJINKPMORJF-UHFFFAOYSA-N" .
<http://www.wikidata.org/entity/Q2270> <http://www.wikidata.org/prop/direct/P662> "1983" .
<http://ex.org/a> <http://www.w3.org/2002/07/owl#sameAs> <http://other.org/a> .
"#,
            )
            .unwrap();
        Arc::new(store)
    }

    struct DownService;

    impl QueryService for DownService {
        fn name(&self) -> String {
            "down".into()
        }

        fn select(&self, _query: &str, _vars: &[&str]) -> crate::error::QueryResult<Vec<Row>> {
            Err(QueryError::Unreachable {
                endpoint: "down".into(),
                message: "connection refused".into(),
            })
        }
    }

    #[test]
    fn same_as_pairs_become_table() {
        let table = EndpointMapping::new(wikidata_like()).load().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("http://ex.org/a"), Some("http://other.org/a"));
    }

    #[test]
    fn wikidata_pairs_only_where_both_present() {
        let mapping = PropertyPairMapping::wikidata(
            wikidata_like(),
            WikidataProperty::InChIKey,
            WikidataProperty::Cas,
        );
        let table = mapping.load().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("BSYNRYMUTXBXSQ-UHFFFAOYSA-N"), Some("50-78-2"));

        let cid = PropertyPairMapping::wikidata(
            wikidata_like(),
            WikidataProperty::InChIKey,
            WikidataProperty::PubChemCid,
        )
        .load()
        .unwrap();
        assert_eq!(cid.len(), 2);
    }

    #[test]
    fn null_bindings_are_skipped() {
        let rows = vec![
            vec![Some("a".to_string()), None],
            vec![None, Some("b".to_string())],
            vec![Some("c".to_string()), Some("d".to_string())],
        ];
        let table = table_from_rows(rows);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("c"), Some("d"));
    }

    #[test]
    fn duplicate_source_keys_last_wins() {
        let rows = vec![
            vec![Some("k".to_string()), Some("first".to_string())],
            vec![Some("k".to_string()), Some("second".to_string())],
        ];
        assert_eq!(table_from_rows(rows).get("k"), Some("second"));
    }

    #[test]
    fn unreachable_service_degrades_to_empty_alignment() {
        let alignment = Alignment::new(
            "cas",
            PropertyPairMapping::wikidata(
                Arc::new(DownService),
                WikidataProperty::InChIKey,
                WikidataProperty::Cas,
            ),
        );
        assert_eq!(
            alignment.convert_one("BSYNRYMUTXBXSQ-UHFFFAOYSA-N"),
            Conversion::NoMapping
        );
        assert!(alignment.load_error().unwrap().contains("connection refused"));
    }

    #[test]
    fn property_ids() {
        assert_eq!(WikidataProperty::NcbiTaxon.id(), "P685");
        assert_eq!(
            WikidataProperty::Eol.iri(),
            "http://www.wikidata.org/prop/direct/P830"
        );
    }
}
