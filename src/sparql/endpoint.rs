//! Remote SPARQL endpoint client.
//!
//! Uses `ureq` for synchronous HTTP requests with a per-agent timeout. Results
//! are decoded from the SPARQL 1.1 Query Results JSON format.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use serde::Deserialize;

use super::{QueryService, Row};
use crate::error::{QueryError, QueryResult};

const RESULTS_JSON: &str = "application/sparql-results+json";

/// Connection settings for a remote endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Endpoint URL, e.g. `https://query.wikidata.org/sparql`.
    pub url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent sent with each request (Wikidata rejects anonymous clients).
    pub user_agent: String,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: super::WIKIDATA_ENDPOINT.into(),
            timeout_secs: 60,
            user_agent: concat!("tera-kg/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// A SPARQL endpoint reached over HTTP.
pub struct SparqlEndpoint {
    config: EndpointConfig,
    agent: ureq::Agent,
}

impl SparqlEndpoint {
    pub fn new(config: EndpointConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build();
        Self { config, agent }
    }

    /// Endpoint with default timeout and user agent.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(EndpointConfig::new(url))
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Check that the endpoint answers a trivial query.
    pub fn probe(&self) -> bool {
        match self.select("SELECT ?s ?p ?o WHERE { ?s ?p ?o } LIMIT 1", &["s"]) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(endpoint = %self.config.url, error = %e, "endpoint probe failed");
                false
            }
        }
    }
}

impl QueryService for SparqlEndpoint {
    fn name(&self) -> String {
        self.config.url.clone()
    }

    fn select(&self, query: &str, vars: &[&str]) -> QueryResult<Vec<Row>> {
        let response = match self
            .agent
            .get(&self.config.url)
            .query("query", query)
            .set("Accept", RESULTS_JSON)
            .call()
        {
            Ok(response) => response,
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

        parse_results_reader(response.into_reader(), vars)
    }
}

impl std::fmt::Debug for SparqlEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparqlEndpoint")
            .field("url", &self.config.url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ResultsDocument {
    results: ResultsBody,
}

#[derive(Debug, Deserialize)]
struct ResultsBody {
    bindings: Vec<HashMap<String, Binding>>,
}

#[derive(Debug, Deserialize)]
struct Binding {
    value: String,
}

/// Decode a SPARQL 1.1 JSON results document into rows of `vars`.
pub fn parse_results_json(body: &str, vars: &[&str]) -> QueryResult<Vec<Row>> {
    parse_results_reader(body.as_bytes(), vars)
}

/// Decode a results document straight from a byte stream.
///
/// Response bodies are not buffered into a string first; Wikidata answers for
/// whole-property alignments run to tens of megabytes.
pub fn parse_results_reader(reader: impl Read, vars: &[&str]) -> QueryResult<Vec<Row>> {
    let doc: ResultsDocument =
        serde_json::from_reader(std::io::BufReader::new(reader)).map_err(|e| {
            QueryError::Malformed {
                message: e.to_string(),
            }
        })?;

    Ok(doc
        .results
        .bindings
        .into_iter()
        .map(|mut solution| {
            vars.iter()
                .map(|v| solution.remove(*v).map(|b| b.value))
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "head": { "vars": ["from", "to"] },
        "results": { "bindings": [
            { "from": { "type": "literal", "value": "BSYNRYMUTXBXSQ-UHFFFAOYSA-N" },
              "to":   { "type": "literal", "value": "50-78-2" } },
            { "from": { "type": "literal", "value": "RYYVLZVUVIJVGH-UHFFFAOYSA-N" } }
        ] }
    }"#;

    #[test]
    fn parses_bindings_in_variable_order() {
        let rows = parse_results_json(BODY, &["to", "from"]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec![
                Some("50-78-2".to_string()),
                Some("BSYNRYMUTXBXSQ-UHFFFAOYSA-N".to_string())
            ]
        );
    }

    #[test]
    fn unbound_variable_is_none() {
        let rows = parse_results_json(BODY, &["from", "to"]).unwrap();
        assert_eq!(rows[1][1], None);
    }

    #[test]
    fn malformed_body_is_an_error() {
        let err = parse_results_json("<html>rate limited</html>", &["s"]).unwrap_err();
        assert!(matches!(err, QueryError::Malformed { .. }));
    }

    #[test]
    fn unreachable_endpoint_fails_probe() {
        let endpoint = SparqlEndpoint::new(EndpointConfig {
            url: "http://127.0.0.1:9/sparql".into(),
            timeout_secs: 1,
            ..Default::default()
        });
        assert!(!endpoint.probe());
        assert!(endpoint.select("SELECT ?s WHERE { ?s ?p ?o }", &["s"]).is_err());
    }

    /// Serve one HTTP response with `body` on a local port; returns the URL.
    fn serve_once(body: String) -> String {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: {RESULTS_JSON}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(body.as_bytes()).unwrap();
            stream.flush().unwrap();
        });
        format!("http://{addr}/sparql")
    }

    fn large_results_body(rows: usize) -> String {
        let bindings: Vec<String> = (0..rows)
            .map(|i| {
                format!(
                    r#"{{"from":{{"type":"literal","value":"KEY{i:08}-PADDINGPADDING-N"}},"to":{{"type":"literal","value":"CAS-{i:08}-PADDINGPADDINGPADDING"}}}}"#
                )
            })
            .collect();
        format!(
            r#"{{"head":{{"vars":["from","to"]}},"results":{{"bindings":[{}]}}}}"#,
            bindings.join(",")
        )
    }

    #[test]
    fn result_sets_over_ten_megabytes_are_decoded() {
        let rows = 100_000;
        let body = large_results_body(rows);
        assert!(body.len() > 10 * 1024 * 1024);
        let url = serve_once(body);

        let endpoint = SparqlEndpoint::new(EndpointConfig {
            url,
            timeout_secs: 60,
            ..Default::default()
        });
        let result = endpoint
            .select("SELECT ?from ?to WHERE { ?s ?p ?o }", &["from", "to"])
            .unwrap();
        assert_eq!(result.len(), rows);
        assert_eq!(result[0][0].as_deref(), Some("KEY00000000-PADDINGPADDING-N"));
    }

    #[test]
    fn non_json_response_is_malformed_not_unreachable() {
        let url = serve_once("<html>rate limited</html>".into());
        let endpoint = SparqlEndpoint::with_url(url);
        let err = endpoint.select("SELECT ?s WHERE { ?s ?p ?o }", &["s"]).unwrap_err();
        assert!(matches!(err, QueryError::Malformed { .. }), "{err}");
    }
}
