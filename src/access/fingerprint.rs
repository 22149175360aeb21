//! Chemical fingerprints keyed by PubChem compound id.
//!
//! [`DataAccess::similarity`](super::DataAccess::similarity) converts its inputs
//! to `cid` through the facade's alignments, then asks a [`FingerprintSource`]
//! for each compound.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{QueryError, QueryResult};
use crate::similarity::Fingerprint;
use crate::sparql::EndpointConfig;

/// PubChem PUG REST base URL.
pub const PUBCHEM_REST: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";

/// Looks up the fingerprint of a compound by PubChem CID.
pub trait FingerprintSource: Send + Sync {
    fn name(&self) -> String;

    /// `Ok(None)` when the compound is unknown or has no fingerprint.
    fn fingerprint(&self, cid: &str) -> QueryResult<Option<Fingerprint>>;
}

/// Fingerprints held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticFingerprints(BTreeMap<String, Fingerprint>);

impl StaticFingerprints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cid: impl Into<String>, fingerprint: Fingerprint) {
        self.0.insert(cid.into(), fingerprint);
    }
}

impl<K: Into<String>> FromIterator<(K, Fingerprint)> for StaticFingerprints {
    fn from_iter<I: IntoIterator<Item = (K, Fingerprint)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl FingerprintSource for StaticFingerprints {
    fn name(&self) -> String {
        format!("static ({} compounds)", self.0.len())
    }

    fn fingerprint(&self, cid: &str) -> QueryResult<Option<Fingerprint>> {
        Ok(self.0.get(cid).cloned())
    }
}

/// Substructure fingerprints from the PubChem compound record.
pub struct PubChemFingerprints {
    config: EndpointConfig,
    agent: ureq::Agent,
}

impl PubChemFingerprints {
    /// `config.url` is the PUG REST base, e.g. [`PUBCHEM_REST`].
    pub fn new(config: EndpointConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build();
        Self { config, agent }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(EndpointConfig::new(url))
    }
}

impl FingerprintSource for PubChemFingerprints {
    fn name(&self) -> String {
        self.config.url.clone()
    }

    fn fingerprint(&self, cid: &str) -> QueryResult<Option<Fingerprint>> {
        if cid.is_empty() || !cid.chars().all(|c| c.is_ascii_digit()) {
            tracing::debug!(cid, "not a PubChem CID");
            return Ok(None);
        }
        let url = format!(
            "{}/compound/cid/{cid}/JSON",
            self.config.url.trim_end_matches('/')
        );
        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            // PubChem answers unknown or withdrawn CIDs with 404 (or 400).
            Err(ureq::Error::Status(status @ (400 | 404), _)) => {
                tracing::debug!(cid, status, "compound not found");
                return Ok(None);
            }
            Err(ureq::Error::Status(status, _)) => {
                return Err(QueryError::HttpStatus {
                    endpoint: self.config.url.clone(),
                    status,
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(QueryError::Unreachable {
                    endpoint: self.config.url.clone(),
                    message: transport.to_string(),
                });
            }
        };

        parse_compound_record(std::io::BufReader::new(response.into_reader()))
    }
}

impl std::fmt::Debug for PubChemFingerprints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubChemFingerprints")
            .field("url", &self.config.url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CompoundRecord {
    #[serde(rename = "PC_Compounds", default)]
    compounds: Vec<Compound>,
}

#[derive(Debug, Deserialize)]
struct Compound {
    #[serde(default)]
    props: Vec<Property>,
}

#[derive(Debug, Deserialize)]
struct Property {
    urn: Urn,
    value: PropertyValue,
}

#[derive(Debug, Deserialize)]
struct Urn {
    #[serde(default)]
    label: String,
}

#[derive(Debug, Deserialize)]
struct PropertyValue {
    #[serde(default)]
    binary: Option<String>,
}

/// Extract the `Fingerprint` property of the first compound in a PUG REST
/// record.
pub fn parse_compound_record(reader: impl std::io::Read) -> QueryResult<Option<Fingerprint>> {
    let record: CompoundRecord =
        serde_json::from_reader(reader).map_err(|e| QueryError::Malformed {
            message: e.to_string(),
        })?;
    let Some(hex) = record
        .compounds
        .into_iter()
        .next()
        .into_iter()
        .flat_map(|c| c.props)
        .find(|p| p.urn.label == "Fingerprint")
        .and_then(|p| p.value.binary)
    else {
        return Ok(None);
    };
    Fingerprint::from_hex(&hex)
        .map(Some)
        .ok_or_else(|| QueryError::Malformed {
            message: format!("fingerprint is not hexadecimal: {hex}"),
        })
}
