//! Approximate string mapping between two labelled entity sets.
//!
//! Every entity of the first dictionary is compared with every entity of the
//! second: the pair score is the best [`SimilarityScorer`] score over all
//! label pairs, and a pair is accepted when it reaches the threshold. Each
//! source entity keeps its single best-scoring target.
//!
//! Cost is `O(|dict1| × |dict2| × labels²)` scorer calls. No blocking or
//! indexing is attempted; the outer loop runs on the rayon thread pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use oxigraph::io::RdfFormat;
use rayon::prelude::*;

use super::{MappingSource, MappingTable, DEFAULT_THRESHOLD};
use crate::error::{LoadError, LoadResult};
use crate::graph::{LabelDict, TripleCollection};
use crate::similarity::{best_label_score, LevenshteinRatio, SimilarityScorer};
use crate::sparql::LocalStore;

/// Best target per source entity with score `>= threshold`.
///
/// Ties keep the first target in `dict2` key order. Entities with no labels,
/// or only empty ones, score `0.0` against everything.
pub fn match_label_dicts(
    dict1: &LabelDict,
    dict2: &LabelDict,
    threshold: f64,
    scorer: &dyn SimilarityScorer,
) -> MappingTable {
    let pairs: Vec<(String, String)> = dict1
        .par_iter()
        .filter_map(|(k1, labels1)| {
            let mut best: Option<(&String, f64)> = None;
            for (k2, labels2) in dict2 {
                let score = best_label_score(scorer, labels1, labels2);
                if score < threshold {
                    continue;
                }
                if best.is_none_or(|(_, b)| score > b) {
                    best = Some((k2, score));
                }
            }
            best.map(|(k2, _)| (k1.clone(), k2.clone()))
        })
        .collect();

    pairs.into_iter().collect()
}

/// Alignment between two label dictionaries.
pub struct StringMatchingMapping {
    dict1: LabelDict,
    dict2: LabelDict,
    threshold: f64,
    scorer: Arc<dyn SimilarityScorer>,
}

impl StringMatchingMapping {
    pub fn new(dict1: LabelDict, dict2: LabelDict) -> Self {
        Self {
            dict1,
            dict2,
            threshold: DEFAULT_THRESHOLD,
            scorer: Arc::new(LevenshteinRatio::default()),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Number of entity-pair comparisons a load will perform.
    pub fn comparisons(&self) -> usize {
        self.dict1.len() * self.dict2.len()
    }
}

impl MappingSource for StringMatchingMapping {
    fn describe(&self) -> String {
        format!(
            "string match {}x{} (threshold {})",
            self.dict1.len(),
            self.dict2.len(),
            self.threshold
        )
    }

    fn load(&self) -> LoadResult<MappingTable> {
        tracing::debug!(comparisons = self.comparisons(), "starting all-pairs label matching");
        Ok(match_label_dicts(
            &self.dict1,
            &self.dict2,
            self.threshold,
            self.scorer.as_ref(),
        ))
    }
}

/// Shared handle to a triple collection usable from the alignment thread pool.
pub type SharedGraph = Arc<dyn TripleCollection + Send + Sync>;

/// Alignment between two graphs using the literals attached to each subject.
///
/// Label extraction is deferred to load time.
pub struct StringGraphMapping {
    graph1: SharedGraph,
    graph2: SharedGraph,
    threshold: f64,
    scorer: Arc<dyn SimilarityScorer>,
}

impl StringGraphMapping {
    pub fn new(graph1: SharedGraph, graph2: SharedGraph) -> Self {
        Self {
            graph1,
            graph2,
            threshold: DEFAULT_THRESHOLD,
            scorer: Arc::new(LevenshteinRatio::default()),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }
}

impl MappingSource for StringGraphMapping {
    fn describe(&self) -> String {
        format!("graph string match (threshold {})", self.threshold)
    }

    fn load(&self) -> LoadResult<MappingTable> {
        let dict1 = graph_labels(self.graph1.as_ref(), "source graph")?;
        let dict2 = graph_labels(self.graph2.as_ref(), "target graph")?;
        Ok(match_graph_labels(
            &dict1,
            &dict2,
            self.threshold,
            self.scorer.as_ref(),
        ))
    }
}

fn graph_labels(graph: &dyn TripleCollection, name: &str) -> LoadResult<LabelDict> {
    graph.try_label_dict().map_err(|source| LoadError::Query {
        source_name: name.to_string(),
        source,
    })
}

fn match_graph_labels(
    dict1: &LabelDict,
    dict2: &LabelDict,
    threshold: f64,
    scorer: &dyn SimilarityScorer,
) -> MappingTable {
    tracing::debug!(
        entities1 = dict1.len(),
        entities2 = dict2.len(),
        "extracted label dictionaries"
    );
    match_label_dicts(dict1, dict2, threshold, scorer)
}

/// Alignment between two RDF files using the literals attached to each subject.
///
/// Both files are parsed at load time; the format follows the file extension.
#[derive(Clone)]
pub struct StringFileMapping {
    source: PathBuf,
    target: PathBuf,
    threshold: f64,
    scorer: Arc<dyn SimilarityScorer>,
}

impl StringFileMapping {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            threshold: DEFAULT_THRESHOLD,
            scorer: Arc::new(LevenshteinRatio::default()),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }
}

fn read_graph(path: &Path) -> LoadResult<LabelDict> {
    let name = path.display().to_string();
    let malformed = |message: String| LoadError::Malformed {
        path: name.clone(),
        message,
    };
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(RdfFormat::from_extension)
        .ok_or_else(|| malformed("unknown RDF format".into()))?;
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: name.clone(),
        source,
    })?;

    let store = LocalStore::in_memory(name.clone()).map_err(|e| malformed(e.to_string()))?;
    store
        .load(format, std::io::BufReader::new(file))
        .map_err(|e| malformed(e.to_string()))?;
    store.try_label_dict().map_err(|e| malformed(e.to_string()))
}

impl MappingSource for StringFileMapping {
    fn describe(&self) -> String {
        format!(
            "string match {} x {} (threshold {})",
            self.source.display(),
            self.target.display(),
            self.threshold
        )
    }

    fn load(&self) -> LoadResult<MappingTable> {
        let dict1 = read_graph(&self.source)?;
        let dict2 = read_graph(&self.target)?;
        Ok(match_graph_labels(
            &dict1,
            &dict2,
            self.threshold,
            self.scorer.as_ref(),
        ))
    }
}
