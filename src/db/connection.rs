//! Process-wide memoized connection to the document store.
//!
//! Lifecycle: a cache is created empty at startup and shared through `AppState`.
//! The first `ensure_connected` call starts a connection attempt and memoizes it;
//! concurrent callers join that same attempt and all see its outcome. A failed attempt
//! is forgotten so the next call retries. Once resolved, the connection is reused for
//! the life of the process. `reset` empties the cache again and hands back whatever
//! connection it held.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::config::DATABASE_URL_VAR;
use crate::errors::AppError;

/// Opens connections to the backing store.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: Clone + Send + Sync + 'static;

    async fn connect(&self, uri: &str) -> Result<Self::Connection, AppError>;
}

type Attempt<T> = Shared<BoxFuture<'static, Result<T, AppError>>>;

enum Slot<T> {
    Empty,
    Connecting { generation: u64, attempt: Attempt<T> },
    Ready(T),
}

struct CacheState<T> {
    slot: Slot<T>,
    /// Bumped for every attempt started; stale attempts never overwrite newer state.
    generation: u64,
}

pub struct ConnectionCache<C: Connector> {
    connector: Arc<C>,
    uri: Option<String>,
    state: Mutex<CacheState<C::Connection>>,
}

impl<C: Connector> ConnectionCache<C> {
    pub fn new(connector: C, uri: Option<String>) -> Self {
        Self {
            connector: Arc::new(connector),
            uri,
            state: Mutex::new(CacheState {
                slot: Slot::Empty,
                generation: 0,
            }),
        }
    }

    // Never held across an await, so a poisoned lock still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, CacheState<C::Connection>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached connection, establishing it on first use.
    pub async fn ensure_connected(&self) -> Result<C::Connection, AppError> {
        let (generation, attempt) = {
            let mut state = self.lock();
            match &state.slot {
                Slot::Ready(connection) => {
                    tracing::trace!("Using cached connection");
                    return Ok(connection.clone());
                }
                Slot::Connecting {
                    generation,
                    attempt,
                } => {
                    tracing::debug!("Joining in-flight connection attempt");
                    (*generation, attempt.clone())
                }
                Slot::Empty => {
                    let uri = self.uri.clone().ok_or_else(|| {
                        AppError::Configuration(format!(
                            "{} is not set; cannot connect to the database",
                            DATABASE_URL_VAR
                        ))
                    })?;
                    let connector = Arc::clone(&self.connector);
                    let attempt = async move {
                        tracing::info!("Connecting to database...");
                        let result = connector.connect(&uri).await;
                        match &result {
                            Ok(_) => tracing::info!("Connected to database"),
                            Err(e) => tracing::error!("Database connection failed: {}", e),
                        }
                        result
                    }
                    .boxed()
                    .shared();

                    state.generation += 1;
                    let generation = state.generation;
                    state.slot = Slot::Connecting {
                        generation,
                        attempt: attempt.clone(),
                    };
                    (generation, attempt)
                }
            }
        };

        let result = attempt.await;

        let mut state = self.lock();
        if matches!(&state.slot, Slot::Connecting { generation: g, .. } if *g == generation) {
            state.slot = match &result {
                Ok(connection) => Slot::Ready(connection.clone()),
                Err(_) => Slot::Empty,
            };
        }
        result
    }

    /// Empty the cache so the next call reconnects. Returns the connection it held, if any.
    pub fn reset(&self) -> Option<C::Connection> {
        let mut state = self.lock();
        match std::mem::replace(&mut state.slot, Slot::Empty) {
            Slot::Ready(connection) => {
                tracing::debug!("Connection cache reset");
                Some(connection)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts attempts; fails the first `failures` of them.
    struct CountingConnector {
        attempts: Arc<AtomicUsize>,
        failures: usize,
    }

    impl CountingConnector {
        fn new(failures: usize) -> (Self, Arc<AtomicUsize>) {
            let attempts = Arc::new(AtomicUsize::new(0));
            let connector = Self {
                attempts: attempts.clone(),
                failures,
            };
            (connector, attempts)
        }
    }

    #[async_trait]
    impl Connector for CountingConnector {
        type Connection = usize;

        async fn connect(&self, _uri: &str) -> Result<usize, AppError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
            if attempt <= self.failures {
                return Err(AppError::Persistence("connection refused".to_string()));
            }
            Ok(attempt)
        }
    }

    #[tokio::test]
    async fn concurrent_first_calls_share_one_attempt() {
        let (connector, attempts) = CountingConnector::new(0);
        let cache = Arc::new(ConnectionCache::new(connector, Some("test://".to_string())));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.ensure_connected().await.unwrap() })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 1);
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        // Warm calls never reach the connector.
        cache.ensure_connected().await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_a_failed_attempt() {
        let (connector, attempts) = CountingConnector::new(usize::MAX);
        let cache = Arc::new(ConnectionCache::new(connector, Some("test://".to_string())));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.ensure_connected().await })
            })
            .collect();

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(err, AppError::Persistence(_)));
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        // The failure is not memoized; the next call tries again.
        cache.ensure_connected().await.unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_attempt_is_not_cached() {
        let (connector, attempts) = CountingConnector::new(1);
        let cache = ConnectionCache::new(connector, Some("test://".to_string()));

        let err = cache.ensure_connected().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));

        assert_eq!(cache.ensure_connected().await.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_uri_is_a_configuration_error() {
        let (connector, attempts) = CountingConnector::new(0);
        let cache = ConnectionCache::new(connector, None);

        let err = cache.ensure_connected().await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reset_forces_a_new_connection() {
        let (connector, attempts) = CountingConnector::new(0);
        let cache = ConnectionCache::new(connector, Some("test://".to_string()));

        assert_eq!(cache.reset(), None);
        assert_eq!(cache.ensure_connected().await.unwrap(), 1);
        assert_eq!(cache.reset(), Some(1));
        assert_eq!(cache.ensure_connected().await.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
