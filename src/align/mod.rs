//! Alignments: one-time-computed correspondences between two identifier schemes.
//!
//! An [`Alignment`] wraps a [`MappingSource`] strategy. Construction is cheap;
//! the mapping table is populated on first use and is read-only afterwards.
//!
//! - **Exact source** ([`endpoint`], [`logmap`], [`table`]): explicit pairs
//!   from a query service, a scored alignment file, or a two-column table
//! - **Approximate** ([`string_match`]): label similarity above a threshold
//!
//! A source that fails to load leaves the alignment with an empty table; every
//! lookup then reports [`Conversion::NoMapping`] and the failure stays
//! available through [`Alignment::load_error`].

pub mod endpoint;
pub mod logmap;
pub mod string_match;
pub mod table;

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

pub use endpoint::{EndpointMapping, PropertyPairMapping, WikidataProperty};
pub use logmap::{AlignmentCell, LogMapMapping};
pub use string_match::{StringFileMapping, StringGraphMapping, StringMatchingMapping};
pub use table::TableMapping;

use crate::error::LoadResult;
use crate::identifier::{dispatch_infallible, strip_default, Conversion, Converted, IdInput};

/// Default acceptance threshold for scored and approximate strategies.
pub const DEFAULT_THRESHOLD: f64 = 0.95;

/// Finite mapping from source-scheme identifiers to target-scheme identifiers.
///
/// Keys are unique; inserting an existing key replaces its target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: BTreeMap<String, String>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair; the last value for a key wins.
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.entries.insert(from.into(), to.into());
    }

    pub fn get(&self, from: &str) -> Option<&str> {
        self.entries.get(from).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Invert the table. When several keys share a target, the last key in
    /// sorted order wins.
    pub fn inverted(&self) -> HashMap<String, String> {
        let mut reverse = HashMap::with_capacity(self.entries.len());
        for (from, to) in &self.entries {
            reverse.insert(to.clone(), from.clone());
        }
        reverse
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MappingTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

/// A strategy that knows how to populate a mapping table once.
pub trait MappingSource: Send + Sync {
    /// Short description used in logs, e.g. `"wikidata P235->P231"`.
    fn describe(&self) -> String;

    /// Compute the full mapping table. Called at most once per [`Alignment`].
    fn load(&self) -> LoadResult<MappingTable>;
}

/// Table that has already been computed.
pub struct StaticMapping {
    table: MappingTable,
}

impl StaticMapping {
    pub fn new(table: MappingTable) -> Self {
        Self { table }
    }
}

impl MappingSource for StaticMapping {
    fn describe(&self) -> String {
        format!("static ({} entries)", self.table.len())
    }

    fn load(&self) -> LoadResult<MappingTable> {
        Ok(self.table.clone())
    }
}

struct Loaded {
    table: MappingTable,
    error: Option<String>,
}

/// Lazily-loaded bidirectional mapping between two identifier schemes.
///
/// The load transition runs at most once even under concurrent first use.
pub struct Alignment {
    name: String,
    source: Box<dyn MappingSource>,
    loaded: OnceLock<Loaded>,
    reverse: OnceLock<HashMap<String, String>>,
}

impl Alignment {
    /// Wrap a strategy. Nothing is loaded yet.
    pub fn new(name: impl Into<String>, source: impl MappingSource + 'static) -> Self {
        Self::from_boxed(name, Box::new(source))
    }

    pub fn from_boxed(name: impl Into<String>, source: Box<dyn MappingSource>) -> Self {
        Self {
            name: name.into(),
            source,
            loaded: OnceLock::new(),
            reverse: OnceLock::new(),
        }
    }

    /// Alignment over an already computed table.
    pub fn from_table(name: impl Into<String>, table: MappingTable) -> Self {
        Self::new(name, StaticMapping::new(table))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the one-time load has happened.
    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Force the load and return the table.
    pub fn mappings(&self) -> &MappingTable {
        &self.state().table
    }

    /// The load failure, if the source could not be read.
    pub fn load_error(&self) -> Option<&str> {
        self.state().error.as_deref()
    }

    pub fn len(&self) -> usize {
        self.mappings().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings().is_empty()
    }

    fn state(&self) -> &Loaded {
        self.loaded.get_or_init(|| match self.source.load() {
            Ok(table) => {
                tracing::info!(
                    alignment = %self.name,
                    source = %self.source.describe(),
                    entries = table.len(),
                    "alignment loaded"
                );
                Loaded { table, error: None }
            }
            Err(e) => {
                tracing::warn!(
                    alignment = %self.name,
                    source = %self.source.describe(),
                    error = %e,
                    "alignment source failed, continuing with an empty mapping"
                );
                Loaded {
                    table: MappingTable::new(),
                    error: Some(format_error_chain(&e)),
                }
            }
        })
    }

    fn reverse_index(&self) -> &HashMap<String, String> {
        self.reverse.get_or_init(|| self.mappings().inverted())
    }

    /// Look up one identifier.
    pub fn lookup(&self, id: &str, reverse: bool) -> Conversion {
        let hit = if reverse {
            self.reverse_index().get(id).cloned()
        } else {
            self.mappings().get(id).map(str::to_string)
        };
        Conversion::from(hit)
    }

    /// Convert one identifier or a batch.
    ///
    /// With `strip`, the namespace is removed from each input before lookup;
    /// batch results stay keyed by the original inputs.
    pub fn convert(&self, input: &IdInput, reverse: bool, strip: bool) -> Converted {
        dispatch_infallible(input, |id| {
            if strip {
                self.lookup(&strip_default(id), reverse)
            } else {
                self.lookup(id, reverse)
            }
        })
    }

    /// Forward conversion of a single identifier.
    pub fn convert_one(&self, id: &str) -> Conversion {
        self.lookup(id, false)
    }
}

impl std::fmt::Debug for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Alignment")
            .field("name", &self.name)
            .field("source", &self.source.describe())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

fn format_error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        source = s.source();
    }
    msg
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::LoadError;

    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    impl MappingSource for CountingSource {
        fn describe(&self) -> String {
            "counting".into()
        }

        fn load(&self) -> LoadResult<MappingTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok([("a", "1"), ("b", "2")].into_iter().collect())
        }
    }

    struct FailingSource;

    impl MappingSource for FailingSource {
        fn describe(&self) -> String {
            "failing".into()
        }

        fn load(&self) -> LoadResult<MappingTable> {
            Err(LoadError::Malformed {
                path: "broken.tsv".into(),
                message: "bad row".into(),
            })
        }
    }

    fn sample() -> Alignment {
        Alignment::from_table(
            "sample",
            [("k1", "v1"), ("k2", "v2"), ("k3", "v3")].into_iter().collect(),
        )
    }

    #[test]
    fn load_is_lazy_and_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let alignment = Alignment::new(
            "counting",
            CountingSource {
                calls: Arc::clone(&calls),
            },
        );
        assert!(!alignment.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(alignment.convert_one("a"), Conversion::Mapped("1".into()));
        assert_eq!(alignment.convert_one("b"), Conversion::Mapped("2".into()));
        let _ = alignment.convert(&IdInput::from("a"), true, false);
        assert!(alignment.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_use_loads_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let alignment = Arc::new(Alignment::new(
            "counting",
            CountingSource {
                calls: Arc::clone(&calls),
            },
        ));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let a = Arc::clone(&alignment);
                std::thread::spawn(move || a.convert_one("a"))
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), Conversion::Mapped("1".into()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_source_yields_no_mapping() {
        let alignment = Alignment::new("broken", FailingSource);
        assert_eq!(alignment.convert_one("anything"), Conversion::NoMapping);
        assert_eq!(alignment.lookup("anything", true), Conversion::NoMapping);
        assert!(alignment.is_empty());
        assert!(alignment.load_error().unwrap().contains("broken.tsv"));
    }

    #[test]
    fn round_trip_for_every_key() {
        let alignment = sample();
        for (k, _) in alignment.mappings().iter() {
            let forward = alignment.lookup(k, false);
            let back = alignment.lookup(forward.as_mapped().unwrap(), true);
            assert_eq!(back, Conversion::Mapped(k.to_string()));
        }
    }

    #[test]
    fn missing_keys_return_no_mapping_both_ways() {
        let alignment = sample();
        assert_eq!(alignment.lookup("nope", false), Conversion::NoMapping);
        assert_eq!(alignment.lookup("k1", true), Conversion::NoMapping);
        assert_eq!(alignment.lookup("v1", true), Conversion::Mapped("k1".into()));
    }

    #[test]
    fn batch_equals_individual_conversion() {
        let alignment = sample();
        let ids = ["k1", "k2", "missing", "k1"];
        let batch = alignment.convert(&IdInput::from(ids), false, false);
        let map = batch.many().unwrap();
        assert_eq!(map.len(), 3);
        for id in ids {
            assert_eq!(map[id], alignment.convert_one(id));
        }
    }

    #[test]
    fn strip_removes_namespace_but_keys_by_input() {
        let alignment = sample();
        let out = alignment.convert(&IdInput::from(vec!["http://example.org/k2"]), false, true);
        assert_eq!(
            out.many().unwrap()["http://example.org/k2"],
            Conversion::Mapped("v2".into())
        );
    }

    #[test]
    fn reverse_collision_last_key_wins() {
        let alignment = Alignment::from_table(
            "collide",
            [("a", "shared"), ("b", "shared")].into_iter().collect(),
        );
        assert_eq!(alignment.lookup("shared", true), Conversion::Mapped("b".into()));
    }

    #[test]
    fn table_last_insert_wins() {
        let mut table = MappingTable::new();
        table.insert("k", "first");
        table.insert("k", "second");
        assert_eq!(table.get("k"), Some("second"));
        assert_eq!(table.len(), 1);
    }
}
