//! Cache-aside store for payload schemas.
//!
//! [`SchemaCache`] consults its map first and only calls the wrapped
//! [`SchemaFetcher`] on a miss. Concurrent misses for the same type share one
//! in-flight fetch: the first caller leads it while later callers park on the
//! same flight and receive a clone of its outcome. Failed fetches are never
//! cached, so the next lookup after an error fetches again.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::envelope::Identifier;
use crate::error::{ConfigurationError, FetchError};
use crate::validator::Schema;

const CACHE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::schema_cache");

/// Result of resolving the schema for one message type.
///
/// `Ok(None)` means the source has explicitly no schema for the type, so the
/// payload is accepted without validation.
pub type FetchOutcome = Result<Option<Arc<Schema>>, FetchError>;

/// Capability that supplies the schema for a message type.
pub trait SchemaFetcher: Send + Sync {
    /// Resolves the schema for `message_type`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the source cannot supply a schema.
    fn fetch(&self, message_type: &Identifier) -> FetchOutcome;
}

impl<F> SchemaFetcher for F
where
    F: Fn(&Identifier) -> FetchOutcome + Send + Sync,
{
    fn fetch(&self, message_type: &Identifier) -> FetchOutcome {
        self(message_type)
    }
}

/// Memoizing wrapper around a [`SchemaFetcher`].
pub struct SchemaCache<F> {
    fetcher: F,
    entries: Mutex<HashMap<Identifier, Slot>>,
}

enum Slot {
    Ready(Option<Arc<Schema>>),
    Pending(Arc<Flight>),
}

enum Role {
    Lead(Arc<Flight>),
    Follow(Arc<Flight>),
}

impl<F: SchemaFetcher> SchemaCache<F> {
    /// Creates an empty cache over `fetcher`.
    #[must_use]
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a cache from an optional fetcher, as assembled from loosely
    /// typed settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfiguration`] when no fetcher
    /// is supplied.
    pub fn try_new(fetcher: Option<F>) -> Result<Self, ConfigurationError> {
        fetcher
            .map(Self::new)
            .ok_or_else(|| ConfigurationError::invalid("a schema cache requires a fetch capability"))
    }

    /// Returns `true` when an entry exists for the type, including an entry
    /// that records "no schema".
    #[must_use]
    pub fn is_cached(&self, message_type: &Identifier) -> bool {
        matches!(self.lock_entries().get(message_type), Some(Slot::Ready(_)))
    }

    /// Writes an entry unconditionally.
    pub fn set(&self, message_type: Identifier, schema: Option<Arc<Schema>>) {
        self.lock_entries().insert(message_type, Slot::Ready(schema));
    }

    /// Deletes the entry for the type; a no-op when absent.
    pub fn remove(&self, message_type: &Identifier) {
        if self.lock_entries().remove(message_type).is_some() {
            debug!(target: CACHE_TARGET, %message_type, "schema cache entry removed");
        }
    }

    /// Returns the cached schema, fetching it on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the fetcher's error unchanged. Errors are not cached.
    pub fn get(&self, message_type: &Identifier) -> FetchOutcome {
        let role = {
            let mut entries = self.lock_entries();
            match entries.entry(message_type.clone()) {
                Entry::Occupied(occupied) => match occupied.get() {
                    Slot::Ready(schema) => return Ok(schema.clone()),
                    Slot::Pending(flight) => Role::Follow(Arc::clone(flight)),
                },
                Entry::Vacant(vacant) => {
                    let flight = Arc::new(Flight::default());
                    vacant.insert(Slot::Pending(Arc::clone(&flight)));
                    Role::Lead(flight)
                }
            }
        };

        match role {
            Role::Follow(flight) => {
                debug!(target: CACHE_TARGET, %message_type, "joining in-flight schema fetch");
                flight.wait()
            }
            Role::Lead(flight) => self.lead(message_type, &flight),
        }
    }

    /// Borrows the wrapped fetcher.
    #[must_use]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn lead(&self, message_type: &Identifier, flight: &Arc<Flight>) -> FetchOutcome {
        debug!(target: CACHE_TARGET, %message_type, "schema cache miss");
        let mut guard = FlightGuard {
            entries: &self.entries,
            message_type,
            flight,
            settled: false,
        };
        let outcome = self.fetcher.fetch(message_type);
        guard.complete(outcome.clone());
        outcome
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<Identifier, Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F: SchemaFetcher> SchemaFetcher for SchemaCache<F> {
    fn fetch(&self, message_type: &Identifier) -> FetchOutcome {
        self.get(message_type)
    }
}

/// Shared rendezvous for callers waiting on one fetch.
#[derive(Default)]
struct Flight {
    outcome: Mutex<Option<FetchOutcome>>,
    settled: Condvar,
}

impl Flight {
    fn settle(&self, outcome: FetchOutcome) {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(outcome);
        }
        self.settled.notify_all();
    }

    fn wait(&self) -> FetchOutcome {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self
                .settled
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Publishes the leader's outcome, or an interruption if the fetcher
/// unwound before returning.
struct FlightGuard<'a> {
    entries: &'a Mutex<HashMap<Identifier, Slot>>,
    message_type: &'a Identifier,
    flight: &'a Arc<Flight>,
    settled: bool,
}

impl FlightGuard<'_> {
    fn complete(&mut self, outcome: FetchOutcome) {
        self.settled = true;
        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if self.owns_slot(&entries) {
                match &outcome {
                    Ok(schema) => {
                        entries.insert(self.message_type.clone(), Slot::Ready(schema.clone()));
                    }
                    Err(_) => {
                        entries.remove(self.message_type);
                    }
                }
            } else {
                debug!(
                    target: CACHE_TARGET,
                    message_type = %self.message_type,
                    "entry changed during fetch; result not cached"
                );
            }
        }
        self.flight.settle(outcome);
    }

    fn owns_slot(&self, entries: &HashMap<Identifier, Slot>) -> bool {
        matches!(
            entries.get(self.message_type),
            Some(Slot::Pending(flight)) if Arc::ptr_eq(flight, self.flight)
        )
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if self.owns_slot(&entries) {
                entries.remove(self.message_type);
            }
        }
        self.flight
            .settle(Err(FetchError::interrupted(self.message_type)));
    }
}
