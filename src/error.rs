//! Rich diagnostic error types for the tera-kg alignment engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.
//!
//! Note that a missed lookup is never an error: it is reported as
//! [`Conversion::NoMapping`](crate::identifier::Conversion::NoMapping).

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the tera-kg engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum TeraError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Query service errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("endpoint unreachable: {endpoint}: {message}")]
    #[diagnostic(
        code(tera::query::unreachable),
        help(
            "The SPARQL endpoint could not be contacted. Check the URL, your network \
             connection, and whether the service is up (`tera probe <endpoint>`)."
        )
    )]
    Unreachable { endpoint: String, message: String },

    #[error("endpoint {endpoint} returned HTTP {status}")]
    #[diagnostic(
        code(tera::query::http_status),
        help(
            "The endpoint rejected the request. A 400 usually means the query is \
             malformed; 429 or 5xx means the service is overloaded, so retry later."
        )
    )]
    HttpStatus { endpoint: String, status: u16 },

    #[error("malformed query results: {message}")]
    #[diagnostic(
        code(tera::query::malformed),
        help("The endpoint did not answer with SPARQL 1.1 JSON results.")
    )]
    Malformed { message: String },

    #[error("SPARQL evaluation failed: {message}")]
    #[diagnostic(
        code(tera::query::sparql),
        help("Check the query syntax and that the requested variables are projected.")
    )]
    Sparql { message: String },

    #[error("{facade} has no query service")]
    #[diagnostic(
        code(tera::query::no_service),
        help("Attach an endpoint or a local store to the facade before issuing pattern queries.")
    )]
    NoService { facade: String },

    #[error("{facade} has no fingerprint source")]
    #[diagnostic(
        code(tera::query::no_fingerprints),
        help("Chemical similarity needs a fingerprint source; the `chemical` preset uses PubChem.")
    )]
    NoFingerprints { facade: String },

    #[error("failed to load RDF into the local store: {message}")]
    #[diagnostic(
        code(tera::query::rdf_load),
        help("Verify the RDF file is well formed and matches the declared format.")
    )]
    RdfLoad { message: String },
}

// ---------------------------------------------------------------------------
// Alignment load errors
// ---------------------------------------------------------------------------

/// Why an alignment could not populate its mapping table.
///
/// Load errors are recovered inside [`Alignment`](crate::align::Alignment): the
/// table falls back to empty and the error is kept for diagnostics.
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("query for {source_name} failed")]
    #[diagnostic(
        code(tera::load::query),
        help("The mapping source query failed; lookups will report no mapping.")
    )]
    Query {
        source_name: String,
        #[source]
        source: QueryError,
    },

    #[error("failed to read {path}")]
    #[diagnostic(
        code(tera::load::io),
        help("Check that the mapping file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed mapping source {path}: {message}")]
    #[diagnostic(
        code(tera::load::malformed),
        help("The mapping file could not be parsed. Check its format and encoding.")
    )]
    Malformed { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Routing errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RouteError {
    #[error("{facade} has no registered mappings")]
    #[diagnostic(
        code(tera::route::no_mappings),
        help(
            "Register at least one alignment on the facade before converting \
             identifiers, or use a preset dataset."
        )
    )]
    NoMappings { facade: String },

    #[error("conversion from {from} to {to} is not supported; supported schemes: {available}")]
    #[diagnostic(
        code(tera::route::unsupported),
        help(
            "Conversions are routed through the hub scheme. Both schemes must be \
             either the hub or have an alignment registered against it."
        )
    )]
    Unsupported {
        from: String,
        to: String,
        available: String,
    },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(tera::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {message}")]
    #[diagnostic(
        code(tera::config::parse),
        help("Check the TOML syntax and the `kind` of each alignment entry.")
    )]
    Parse { message: String },

    #[error("dataset \"{name}\" not found in config")]
    #[diagnostic(
        code(tera::config::dataset_not_found),
        help("List the configured datasets with `tera datasets`.")
    )]
    DatasetNotFound { name: String },

    #[error("unknown preset \"{preset}\"")]
    #[diagnostic(
        code(tera::config::unknown_preset),
        help("Valid presets are: chemical, taxonomy.")
    )]
    UnknownPreset { preset: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(tera::config::invalid), help("{message}"))]
    Invalid { message: String },
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
pub type LoadResult<T> = std::result::Result<T, LoadError>;
pub type RouteResult<T> = std::result::Result<T, RouteError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Convenience alias for functions returning tera-kg results.
pub type TeraResult<T> = std::result::Result<T, TeraError>;
