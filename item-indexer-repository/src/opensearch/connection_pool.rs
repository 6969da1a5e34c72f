//! Connection pool spreading requests over several OpenSearch nodes.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use opensearch::http::transport::{Connection, ConnectionPool};
use url::Url;

use crate::errors::SearchIndexError;

/// Hands out the configured nodes in turn, one per request.
///
/// Clones share the rotation counter.
#[derive(Debug, Clone)]
pub struct RoundRobinConnectionPool {
    connections: Vec<Connection>,
    next: Arc<AtomicUsize>,
}

impl RoundRobinConnectionPool {
    pub fn new(urls: Vec<Url>) -> Result<Self, SearchIndexError> {
        if urls.is_empty() {
            return Err(SearchIndexError::validation(
                "At least one OpenSearch URL must be provided",
            ));
        }

        Ok(Self {
            connections: urls.into_iter().map(Connection::new).collect(),
            next: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn next_index(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len()
    }
}

impl ConnectionPool for RoundRobinConnectionPool {
    fn next(&self) -> &Connection {
        &self.connections[self.next_index()]
    }
}
