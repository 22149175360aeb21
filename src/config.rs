//! TOML configuration: datasets, their hubs, and alignment definitions.
//!
//! ```toml
//! timeout_secs = 30
//!
//! [[datasets]]
//! name = "chemical"
//! preset = "chemical"
//!
//! [[datasets]]
//! name = "ecotox-taxonomy"
//! hub = "ncbi"
//! namespace = "https://cfpub.epa.gov/ecotox/"
//! files = ["ecotox_taxonomy.nt"]
//!
//! [[datasets.alignments]]
//! kind = "table"
//! scheme = "eol"
//! path = "ncbi_eol.tsv"
//! ```
//!
//! Relative paths resolve against the directory of the config file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::access::fingerprint::PUBCHEM_REST;
use crate::access::{presets, DataAccess, PubChemFingerprints};
use crate::align::{
    Alignment, EndpointMapping, LogMapMapping, MappingSource, PropertyPairMapping,
    StringFileMapping, TableMapping, DEFAULT_THRESHOLD,
};
use crate::error::{ConfigError, ConfigResult, TeraResult};
use crate::sparql::{EndpointConfig, LocalStore, QueryService, SparqlEndpoint, WIKIDATA_ENDPOINT};

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeraConfig {
    /// Timeout applied to every remote query, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub datasets: Vec<DatasetConfig>,
    /// Directory relative paths resolve against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// One dataset facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    /// Hub scheme. Required unless a preset supplies it.
    #[serde(default)]
    pub hub: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    /// Remote SPARQL endpoint holding the dataset.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// RDF files loaded into a local store when no endpoint is given.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// `chemical` or `taxonomy`.
    #[serde(default)]
    pub preset: Option<String>,
    /// Endpoint answering the preset's Wikidata queries.
    #[serde(default = "default_wikidata")]
    pub mapping_endpoint: String,
    /// PubChem PUG REST base for chemical similarity. The `chemical` preset
    /// defaults to the public service.
    #[serde(default)]
    pub fingerprint_endpoint: Option<String>,
    #[serde(default)]
    pub alignments: Vec<AlignmentConfig>,
}

/// One alignment from the dataset hub to `scheme`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignmentConfig {
    /// `owl:sameAs` pairs from an endpoint.
    SameAs {
        scheme: String,
        #[serde(default = "default_wikidata")]
        endpoint: String,
    },
    /// Two identifier properties on one subject. Properties are Wikidata ids
    /// (`P235`) or full IRIs; `query` overrides both.
    PropertyPair {
        scheme: String,
        #[serde(default = "default_wikidata")]
        endpoint: String,
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        query: Option<String>,
    },
    /// Scored alignment file in the Alignment API RDF/XML format.
    Logmap {
        scheme: String,
        path: PathBuf,
        #[serde(default = "default_threshold")]
        threshold: f64,
        #[serde(default)]
        strip: bool,
    },
    /// Two-column delimited table.
    Table {
        scheme: String,
        path: PathBuf,
        #[serde(default = "default_delimiter")]
        delimiter: char,
        #[serde(default)]
        has_header: bool,
    },
    /// Label similarity between two RDF files.
    StringMatch {
        scheme: String,
        source: PathBuf,
        target: PathBuf,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_user_agent() -> String {
    concat!("tera-kg/", env!("CARGO_PKG_VERSION")).into()
}
fn default_wikidata() -> String {
    WIKIDATA_ENDPOINT.into()
}
fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}
fn default_delimiter() -> char {
    '\t'
}

impl Default for TeraConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            datasets: Vec::new(),
            base_dir: None,
        }
    }
}

impl AlignmentConfig {
    pub fn scheme(&self) -> &str {
        match self {
            Self::SameAs { scheme, .. }
            | Self::PropertyPair { scheme, .. }
            | Self::Logmap { scheme, .. }
            | Self::Table { scheme, .. }
            | Self::StringMatch { scheme, .. } => scheme,
        }
    }
}

/// `P235` becomes the `wdt:` IRI; anything else is taken as an IRI.
fn property_iri(property: &str) -> String {
    let is_wikidata_id = property
        .strip_prefix('P')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
    if is_wikidata_id {
        format!("http://www.wikidata.org/prop/direct/{property}")
    } else {
        property.to_string()
    }
}

impl TeraConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    /// Unreadable or invalid files are still errors.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        match Self::load(path) {
            Err(ConfigError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::debug!(config = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        let mut seen = std::collections::HashSet::new();
        for dataset in &self.datasets {
            if !seen.insert(dataset.name.as_str()) {
                return Err(ConfigError::Invalid {
                    message: format!("dataset \"{}\" is defined twice", dataset.name),
                });
            }
            match &dataset.preset {
                Some(preset) if !presets::PRESETS.contains(&preset.as_str()) => {
                    return Err(ConfigError::UnknownPreset {
                        preset: preset.clone(),
                    });
                }
                Some(_) => {}
                None if dataset.hub.is_none() => {
                    return Err(ConfigError::Invalid {
                        message: format!(
                            "dataset \"{}\" needs either a `hub` or a `preset`",
                            dataset.name
                        ),
                    });
                }
                None => {}
            }
            for alignment in &dataset.alignments {
                if let AlignmentConfig::PropertyPair {
                    scheme,
                    from,
                    to,
                    query: None,
                    ..
                } = alignment
                {
                    if from.is_none() || to.is_none() {
                        return Err(ConfigError::Invalid {
                            message: format!(
                                "property_pair alignment \"{scheme}\" needs `from` and `to`, or a `query`"
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn dataset(&self, name: &str) -> ConfigResult<&DatasetConfig> {
        self.datasets
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ConfigError::DatasetNotFound {
                name: name.to_string(),
            })
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().map(|d| d.name.as_str())
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn endpoint(&self, url: &str) -> SparqlEndpoint {
        SparqlEndpoint::new(EndpointConfig {
            url: url.to_string(),
            timeout_secs: self.timeout_secs,
            user_agent: self.user_agent.clone(),
        })
    }

    /// Construct the facade for dataset `name`. No alignment is loaded yet.
    pub fn build_facade(&self, name: &str) -> TeraResult<DataAccess> {
        let dataset = self.dataset(name)?;
        let mut services = ServiceCache::new(self);

        let mut access = match &dataset.preset {
            Some(preset) => {
                let mappings = services.get(&dataset.mapping_endpoint);
                presets::by_name(preset, dataset.namespace.as_deref(), mappings).ok_or_else(
                    || ConfigError::UnknownPreset {
                        preset: preset.clone(),
                    },
                )?
            }
            None => {
                let hub = dataset.hub.clone().ok_or_else(|| ConfigError::Invalid {
                    message: format!("dataset \"{}\" has no hub", dataset.name),
                })?;
                DataAccess::new(
                    dataset.name.clone(),
                    dataset.namespace.clone().unwrap_or_default(),
                    hub,
                )
            }
        };

        if let Some(url) = &dataset.endpoint {
            access = access.with_service(services.get(url));
        } else if !dataset.files.is_empty() {
            let store = LocalStore::in_memory(dataset.name.clone())?;
            for file in &dataset.files {
                store.load_file(&self.resolve(file))?;
            }
            access = access.with_service(Arc::new(store));
        }

        let fingerprint_url = dataset.fingerprint_endpoint.as_deref().or(
            (dataset.preset.as_deref() == Some("chemical")).then_some(PUBCHEM_REST),
        );
        if let Some(url) = fingerprint_url {
            access = access.with_fingerprints(Arc::new(PubChemFingerprints::new(EndpointConfig {
                url: url.to_string(),
                timeout_secs: self.timeout_secs,
                user_agent: self.user_agent.clone(),
            })));
        }

        for alignment in &dataset.alignments {
            let source = self.alignment_source(alignment, &mut services)?;
            access.register(
                alignment.scheme(),
                Arc::new(Alignment::from_boxed(alignment.scheme(), source)),
            );
        }

        tracing::info!(
            dataset = %dataset.name,
            hub = %access.hub(),
            schemes = access.available_conversions().len(),
            "dataset facade ready"
        );
        Ok(access)
    }

    fn alignment_source(
        &self,
        alignment: &AlignmentConfig,
        services: &mut ServiceCache<'_>,
    ) -> TeraResult<Box<dyn MappingSource>> {
        let source: Box<dyn MappingSource> = match alignment {
            AlignmentConfig::SameAs { endpoint, .. } => {
                Box::new(EndpointMapping::new(services.get(endpoint)))
            }
            AlignmentConfig::PropertyPair {
                scheme,
                endpoint,
                from,
                to,
                query,
            } => {
                let service = services.get(endpoint);
                match (query, from, to) {
                    (Some(query), _, _) => Box::new(PropertyPairMapping::new(service, query.clone())),
                    (None, Some(from), Some(to)) => Box::new(PropertyPairMapping::properties(
                        service,
                        &property_iri(from),
                        &property_iri(to),
                    )),
                    _ => {
                        return Err(ConfigError::Invalid {
                            message: format!(
                                "property_pair alignment \"{scheme}\" needs `from` and `to`, or a `query`"
                            ),
                        }
                        .into());
                    }
                }
            }
            AlignmentConfig::Logmap {
                path,
                threshold,
                strip,
                ..
            } => Box::new(
                LogMapMapping::new(self.resolve(path))
                    .with_threshold(*threshold)
                    .with_strip(*strip),
            ),
            AlignmentConfig::Table {
                path,
                delimiter,
                has_header,
                ..
            } => Box::new(
                TableMapping::new(self.resolve(path))
                    .with_delimiter(*delimiter)
                    .with_header(*has_header),
            ),
            AlignmentConfig::StringMatch {
                source,
                target,
                threshold,
                ..
            } => Box::new(
                StringFileMapping::new(self.resolve(source), self.resolve(target))
                    .with_threshold(*threshold),
            ),
        };
        Ok(source)
    }
}

/// One client per endpoint URL within a facade build.
struct ServiceCache<'a> {
    config: &'a TeraConfig,
    services: HashMap<String, Arc<dyn QueryService>>,
}

impl<'a> ServiceCache<'a> {
    fn new(config: &'a TeraConfig) -> Self {
        Self {
            config,
            services: HashMap::new(),
        }
    }

    fn get(&mut self, url: &str) -> Arc<dyn QueryService> {
        let config = self.config;
        Arc::clone(
            self.services
                .entry(url.to_string())
                .or_insert_with(|| Arc::new(config.endpoint(url)) as Arc<dyn QueryService>),
        )
    }
}
