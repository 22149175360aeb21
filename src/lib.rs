// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # tera-kg
//!
//! Identifier resolution and entity alignment for a toxicology knowledge graph
//! built from heterogeneous datasets (taxonomies, chemical registries, effect
//! records).
//!
//! ## Architecture
//!
//! - **Alignments** (`align`): lazily-loaded mappings between two identifier
//!   schemes, from exact sources (query services, scored alignment files,
//!   tables) or approximate label matching
//! - **Routing** (`access`): per-dataset facades converting between any two
//!   schemes through a hub scheme
//! - **Query boundary** (`sparql`): remote SPARQL endpoints via `ureq`, local
//!   `oxigraph` stores
//! - **Graphs** (`graph`): triple collections and label extraction
//!
//! ## Library usage
//!
//! ```
//! use tera_kg::access::DataAccess;
//! use tera_kg::align::{Alignment, MappingTable};
//! use tera_kg::identifier::{Conversion, Converted};
//!
//! let cas: MappingTable = [("BSYNRYMUTXBXSQ-UHFFFAOYSA-N", "50-78-2")].into_iter().collect();
//! let api = DataAccess::new("chemicals", "https://cfpub.epa.gov/ecotox/", "inchikey")
//!     .with_alignment("cas", Alignment::from_table("cas", cas));
//!
//! let out = api.convert_id("50-78-2", "cas", "inchikey", false).unwrap();
//! assert_eq!(out, Converted::One(Conversion::Mapped("BSYNRYMUTXBXSQ-UHFFFAOYSA-N".into())));
//! ```

pub mod access;
pub mod align;
pub mod config;
pub mod error;
pub mod graph;
pub mod identifier;
pub mod similarity;
pub mod sparql;
