//! In-memory directory, for tests and dry runs.
//!
//! Entries are registered per filter; a search returns the entries
//! registered for its exact rendered filter (`None` for the match-all
//! search), or nothing. Every connection and search is recorded.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use config::ConnectionParams;
use errors::{LookupError, LookupResult};
use tokio::sync::RwLock;
use tracing::warn;

use crate::directory::{DirectoryConnector, DirectoryEntry, DirectorySession};
use crate::search::SearchDescription;

/// A search as the directory received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSearch {
    pub description: SearchDescription,
    pub attrlist: Option<Vec<String>>
}

#[derive(Default)]
struct State {
    entries: HashMap<Option<String>, Vec<DirectoryEntry>>,
    bind_error: Option<String>,
    connections: Vec<ConnectionParams>,
    searches: Vec<RecordedSearch>,
    unbinds: usize
}

#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<State>>
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the entries returned for `filter`.
    #[must_use]
    pub fn with_entries(self, filter: Option<&str>, entries: Vec<DirectoryEntry>) -> Self {
        self.configure(|state| {
            state.entries.insert(filter.map(str::to_string), entries);
        })
    }

    /// Make every bind fail with `reason`.
    #[must_use]
    pub fn rejecting_bind(self, reason: &str) -> Self {
        self.configure(|state| state.bind_error = Some(reason.to_string()))
    }

    /// Apply a setup change. A handle that is not yet cloned owns its state
    /// outright; a cloned one goes through the shared lock.
    fn configure(mut self, apply: impl FnOnce(&mut State)) -> Self {
        if let Some(lock) = Arc::get_mut(&mut self.state) {
            apply(lock.get_mut());
            return self;
        }
        match self.state.try_write() {
            Ok(mut state) => apply(&mut state),
            Err(_) => warn!("In-memory directory is locked; setup change ignored")
        }
        self
    }

    pub async fn add_entries(&self, filter: Option<&str>, entries: Vec<DirectoryEntry>) {
        let mut state = self.state.write().await;
        state.entries.insert(filter.map(str::to_string), entries);
    }

    pub async fn connections(&self) -> Vec<ConnectionParams> {
        self.state.read().await.connections.clone()
    }

    pub async fn searches(&self) -> Vec<RecordedSearch> {
        self.state.read().await.searches.clone()
    }

    pub async fn unbinds(&self) -> usize {
        self.state.read().await.unbinds
    }
}

#[async_trait]
impl DirectoryConnector for InMemoryDirectory {
    async fn connect(&self, params: &ConnectionParams) -> LookupResult<Box<dyn DirectorySession>> {
        let mut state = self.state.write().await;
        state.connections.push(params.clone());
        if let Some(reason) = &state.bind_error {
            return Err(LookupError::directory("bind", reason));
        }
        Ok(Box::new(InMemorySession {
            state: Arc::clone(&self.state)
        }))
    }
}

struct InMemorySession {
    state: Arc<RwLock<State>>
}

#[async_trait]
impl DirectorySession for InMemorySession {
    async fn search(
        &mut self,
        description: &SearchDescription,
        attrlist: Option<&[String]>
    ) -> LookupResult<Vec<DirectoryEntry>> {
        let mut state = self.state.write().await;
        state.searches.push(RecordedSearch {
            description: description.clone(),
            attrlist: attrlist.map(<[String]>::to_vec)
        });

        if let Some(filter) = &description.filter {
            check_filter(filter)?;
        }

        Ok(state
            .entries
            .get(&description.filter)
            .cloned()
            .unwrap_or_default())
    }

    async fn unbind(&mut self) -> LookupResult<()> {
        self.state.write().await.unbinds += 1;
        Ok(())
    }
}

/// Rejects filters that are not wrapped in balanced parentheses.
fn check_filter(filter: &str) -> LookupResult<()> {
    let mut depth = 0usize;
    for c in filter.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    LookupError::directory("search", format!("bad search filter {filter}"))
                })?;
            }
            _ => {}
        }
    }
    if depth != 0 || !filter.starts_with('(') || !filter.ends_with(')') {
        return Err(LookupError::directory(
            "search",
            format!("bad search filter {filter}")
        ));
    }
    Ok(())
}
