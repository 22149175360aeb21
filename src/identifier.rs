//! Identifier values, conversion outcomes, and single/batch dispatch.
//!
//! Every conversion-style operation accepts an [`IdInput`] (one identifier or a
//! collection of them) and answers with a [`Converted`] of the same shape.
//! A failed lookup is the explicit [`Conversion::NoMapping`] value, never an error.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Separators used when removing a namespace from an identifier.
///
/// `CID` is the compound-id marker used by PubChem URIs
/// (`.../compound/CID2244` → `2244`).
pub const NAMESPACE_SEPARATORS: &[&str] = &["/", "#", "CID"];

/// Outcome of converting one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conversion {
    /// The identifier in the target scheme.
    Mapped(String),
    /// The source identifier has no counterpart in the target scheme.
    NoMapping,
}

impl Conversion {
    /// The mapped identifier, if any.
    pub fn as_mapped(&self) -> Option<&str> {
        match self {
            Self::Mapped(id) => Some(id),
            Self::NoMapping => None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped(_))
    }

    pub fn into_mapped(self) -> Option<String> {
        match self {
            Self::Mapped(id) => Some(id),
            Self::NoMapping => None,
        }
    }
}

impl From<Option<String>> for Conversion {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::NoMapping, Self::Mapped)
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mapped(id) => write!(f, "{id}"),
            Self::NoMapping => write!(f, "no mapping"),
        }
    }
}

/// One identifier or a finite collection of identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdInput {
    One(String),
    Many(Vec<String>),
}

impl IdInput {
    /// Number of identifiers carried (duplicates included).
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Many(ids) if ids.is_empty())
    }
}

impl From<&str> for IdInput {
    fn from(id: &str) -> Self {
        Self::One(id.to_string())
    }
}

impl From<String> for IdInput {
    fn from(id: String) -> Self {
        Self::One(id)
    }
}

impl From<Vec<String>> for IdInput {
    fn from(ids: Vec<String>) -> Self {
        Self::Many(ids)
    }
}

impl From<Vec<&str>> for IdInput {
    fn from(ids: Vec<&str>) -> Self {
        Self::Many(ids.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for IdInput {
    fn from(ids: &[&str]) -> Self {
        Self::Many(ids.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for IdInput {
    fn from(ids: [&str; N]) -> Self {
        Self::Many(ids.iter().map(|s| s.to_string()).collect())
    }
}

impl FromIterator<String> for IdInput {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::Many(iter.into_iter().collect())
    }
}

/// Result of a conversion: the shape follows the [`IdInput`] it came from.
///
/// A batch result is associative, keyed by each original input identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Converted {
    One(Conversion),
    Many(BTreeMap<String, Conversion>),
}

impl Converted {
    /// The single conversion, if this is a scalar result.
    pub fn one(&self) -> Option<&Conversion> {
        match self {
            Self::One(c) => Some(c),
            Self::Many(_) => None,
        }
    }

    /// The batch map, if this is a collection result.
    pub fn many(&self) -> Option<&BTreeMap<String, Conversion>> {
        match self {
            Self::One(_) => None,
            Self::Many(m) => Some(m),
        }
    }

    /// Consume into a map; a scalar result is keyed by `key`.
    pub fn into_map(self, key: &str) -> BTreeMap<String, Conversion> {
        match self {
            Self::One(c) => BTreeMap::from([(key.to_string(), c)]),
            Self::Many(m) => m,
        }
    }
}

/// Apply a scalar conversion to one identifier or to every element of a batch.
///
/// Duplicate elements are converted once. The first error aborts the batch.
pub fn dispatch<E, F>(input: &IdInput, mut convert: F) -> Result<Converted, E>
where
    F: FnMut(&str) -> Result<Conversion, E>,
{
    match input {
        IdInput::One(id) => convert(id).map(Converted::One),
        IdInput::Many(ids) => {
            let mut out = BTreeMap::new();
            for id in ids {
                if out.contains_key(id) {
                    continue;
                }
                let converted = convert(id)?;
                out.insert(id.clone(), converted);
            }
            Ok(Converted::Many(out))
        }
    }
}

/// Infallible variant of [`dispatch`].
pub fn dispatch_infallible<F>(input: &IdInput, mut convert: F) -> Converted
where
    F: FnMut(&str) -> Conversion,
{
    match dispatch::<std::convert::Infallible, _>(input, |id| Ok(convert(id))) {
        Ok(converted) => converted,
        Err(never) => match never {},
    }
}

/// Remove the namespace from an identifier.
///
/// Splits on each separator and keeps the shortest trailing fragment. An
/// identifier without any separator is returned unchanged.
pub fn strip_namespace(id: &str, separators: &[&str]) -> String {
    let mut shortest = id;
    for sep in separators {
        if sep.is_empty() {
            continue;
        }
        if let Some(tail) = id.rsplit(*sep).next() {
            if tail.len() < shortest.len() {
                shortest = tail;
            }
        }
    }
    shortest.to_string()
}

/// [`strip_namespace`] with the default separators.
pub fn strip_default(id: &str) -> String {
    strip_namespace(id, NAMESPACE_SEPARATORS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_keeps_shortest_fragment() {
        assert_eq!(
            strip_default("http://rdf.ncbi.nlm.nih.gov/pubchem/compound/CID2244"),
            "2244"
        );
        assert_eq!(strip_default("http://purl.obolibrary.org/obo#CHEBI_15365"), "CHEBI_15365");
        assert_eq!(
            strip_default("https://www.ncbi.nlm.nih.gov/taxonomy/taxon/9606"),
            "9606"
        );
    }

    #[test]
    fn strip_without_separator_is_identity() {
        assert_eq!(strip_default("BSYNRYMUTXBXSQ-UHFFFAOYSA-N"), "BSYNRYMUTXBXSQ-UHFFFAOYSA-N");
    }

    #[test]
    fn strip_trailing_separator_yields_empty() {
        assert_eq!(strip_namespace("http://example.org/", &["/"]), "");
    }

    #[test]
    fn dispatch_single_returns_scalar() {
        let out = dispatch_infallible(&IdInput::from("a"), |id| {
            Conversion::Mapped(id.to_uppercase())
        });
        assert_eq!(out, Converted::One(Conversion::Mapped("A".into())));
    }

    #[test]
    fn dispatch_batch_collapses_duplicates() {
        let mut calls = 0;
        let out = dispatch_infallible(&IdInput::from(vec!["a", "b", "a"]), |id| {
            calls += 1;
            if id == "a" {
                Conversion::Mapped("x".into())
            } else {
                Conversion::NoMapping
            }
        });
        assert_eq!(calls, 2);
        let map = out.many().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], Conversion::Mapped("x".into()));
        assert_eq!(map["b"], Conversion::NoMapping);
    }

    #[test]
    fn dispatch_propagates_first_error() {
        let out: Result<Converted, &str> =
            dispatch(&IdInput::from(vec!["ok", "bad"]), |id| {
                if id == "bad" {
                    Err("boom")
                } else {
                    Ok(Conversion::NoMapping)
                }
            });
        assert_eq!(out, Err("boom"));
    }

    #[test]
    fn no_mapping_is_distinct_from_literal_string() {
        let literal = Conversion::Mapped("no mapping".into());
        assert_ne!(literal, Conversion::NoMapping);
        assert_eq!(literal.to_string(), Conversion::NoMapping.to_string());
        assert!(literal.is_mapped());
    }
}
