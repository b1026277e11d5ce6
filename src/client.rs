use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::search::{Backend, Record, SearchError};

// Per-request limit for health checks, the client timeout applies to searches
const HEALTH_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<Record>,
    #[serde(default)]
    count: Option<usize>,
}

/// Talks to the search backend over http.
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        Ok(HttpBackend {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn search_url(&self, keyword: &str) -> String {
        format!(
            "{}/api/search?keyword={}",
            self.base_url,
            urlencoding::encode(keyword)
        )
    }

    pub fn health_url(&self) -> String {
        format!("{}/api/health", self.base_url)
    }

    fn get(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<reqwest::blocking::Response, SearchError> {
        trace!("GET {url}");
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

impl Backend for HttpBackend {
    fn search(&self, keyword: &str) -> Result<Vec<Record>, SearchError> {
        let response = self.get(&self.search_url(keyword), None)?;
        let body: SearchResponse = response
            .json()
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        if let Some(count) = body.count
            && count != body.results.len()
        {
            debug!(
                "Backend reported {count} results but sent {}",
                body.results.len()
            );
        }
        Ok(body.results)
    }

    fn health(&self) -> Result<(), SearchError> {
        self.get(&self.health_url(), Some(HEALTH_TIMEOUT))
            .map(|_| ())
    }
}
