use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::rows::ResultSet;

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Please enter a keyword to search.")]
    EmptyKeyword,
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Response status: {0}")]
    Status(u16),
    #[error("Invalid response: {0}")]
    Decode(String),
}

/// The search service the ui talks to.
pub trait Backend: Send + Sync {
    fn search(&self, keyword: &str) -> Result<Vec<Record>, SearchError>;
    fn health(&self) -> Result<(), SearchError>;
}

#[derive(Debug)]
pub enum SearchOutcome {
    Loaded(ResultSet),
    Failed { keyword: String, error: SearchError },
}

struct Completion {
    id: u64,
    keyword: String,
    result: Result<Vec<Record>, SearchError>,
}

/// Runs searches on worker threads. Only the most recently submitted search is authoritative,
/// completions of older requests are dropped when they arrive.
pub struct SearchOrchestrator {
    backend: Arc<dyn Backend>,
    latest: u64,
    pending: Option<u64>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl SearchOrchestrator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (tx, rx) = mpsc::channel();
        SearchOrchestrator {
            backend,
            latest: 0,
            pending: None,
            tx,
            rx,
        }
    }

    /// The keyword is sent as typed, only a blank one is rejected.
    pub fn submit(&mut self, keyword: &str) -> Result<u64, SearchError> {
        if keyword.trim().is_empty() {
            return Err(SearchError::EmptyKeyword);
        }

        self.latest += 1;
        let id = self.latest;
        if let Some(old) = self.pending.replace(id) {
            debug!("Search #{old} superseded by #{id}");
        }

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let keyword = keyword.to_string();
        info!("Search #{id} for {keyword:?}");
        thread::spawn(move || {
            let result = backend.search(&keyword);
            // The receiver is gone when the app quits while a search is running
            let _ = tx.send(Completion {
                id,
                keyword,
                result,
            });
        });
        Ok(id)
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Collects finished searches without blocking.
    pub fn poll(&mut self) -> Vec<SearchOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            if let Some(outcome) = self.accept(completion) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Like `poll` but waits up to `timeout` for the first completion.
    pub fn poll_timeout(&mut self, timeout: Duration) -> Vec<SearchOutcome> {
        let mut outcomes = Vec::new();
        if let Ok(completion) = self.rx.recv_timeout(timeout)
            && let Some(outcome) = self.accept(completion)
        {
            outcomes.push(outcome);
        }
        outcomes.extend(self.poll());
        outcomes
    }

    fn accept(&mut self, completion: Completion) -> Option<SearchOutcome> {
        if completion.id != self.latest {
            debug!(
                "Dropping stale search #{} for {:?} (latest #{})",
                completion.id, completion.keyword, self.latest
            );
            return None;
        }
        self.pending = None;
        match completion.result {
            Ok(records) => {
                trace!("Search #{} returned {} rows", completion.id, records.len());
                Some(SearchOutcome::Loaded(ResultSet::new(
                    completion.keyword,
                    records,
                )))
            }
            Err(error) => {
                warn!("Search #{} for {:?} failed: {error}", completion.id, completion.keyword);
                Some(SearchOutcome::Failed {
                    keyword: completion.keyword,
                    error,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    Waiting(SearchError),
    Connected,
}

/// Polls the backend health endpoint at a fixed interval until it answers once.
pub struct HealthProbe {
    rx: Receiver<ProbeEvent>,
}

impl HealthProbe {
    pub fn start(backend: Arc<dyn Backend>, interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            loop {
                match backend.health() {
                    Ok(()) => {
                        info!("Backend is up");
                        let _ = tx.send(ProbeEvent::Connected);
                        return;
                    }
                    Err(e) => {
                        trace!("Backend not ready: {e}");
                        if tx.send(ProbeEvent::Waiting(e)).is_err() {
                            return;
                        }
                    }
                }
                thread::sleep(interval);
            }
        });
        HealthProbe { rx }
    }

    pub fn poll(&mut self) -> Vec<ProbeEvent> {
        self.rx.try_iter().collect()
    }
}
