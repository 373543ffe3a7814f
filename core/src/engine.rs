use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::mealdb::payload_to_meal;
use crate::models::{MealDetail, MealRecord, Snapshot, UpsertReport};
use crate::source::{self, DEFAULT_PARTITIONS, MealSource, PartitionFailure};

/// Where the current load cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    ColdStart,
    CacheServed,
    Refreshing,
    Reconciled,
    StaleFallback,
    /// The store failed; nothing after the failure was exposed.
    Failed,
}

/// One step of a load cycle, in delivery order. A cycle emits at most one
/// `CacheServed`, then exactly one of the other variants.
#[derive(Debug)]
pub enum LoadEvent {
    /// Cached meals, sent before the remote refresh starts. Only emitted when
    /// the cache is non-empty.
    CacheServed(Snapshot),
    /// Canonical store contents after the refresh was applied.
    Reconciled {
        snapshot: Snapshot,
        failed_partitions: Vec<PartitionFailure>,
        upsert: UpsertReport,
    },
    /// Refresh failed but a cached snapshot was already served. Callers keep
    /// showing it; this is not a user-facing error.
    StaleFallback { reason: String },
    Failed(Error),
}

impl LoadEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadEvent::CacheServed(_))
    }
}

/// Final view of a load cycle once every event has been consumed.
#[derive(Debug)]
pub struct LoadOutcome {
    pub state: SyncState,
    pub snapshot: Snapshot,
    pub failed_partitions: Vec<PartitionFailure>,
    pub error: Option<Error>,
}

/// Receiving side of a load cycle.
pub struct LoadStream {
    rx: mpsc::Receiver<LoadEvent>,
}

impl LoadStream {
    pub async fn next(&mut self) -> Option<LoadEvent> {
        self.rx.recv().await
    }

    /// Drain the cycle, keeping the most authoritative snapshot seen.
    pub async fn finish(mut self) -> LoadOutcome {
        let mut outcome = LoadOutcome {
            state: SyncState::ColdStart,
            snapshot: Snapshot::default(),
            failed_partitions: Vec::new(),
            error: None,
        };
        while let Some(event) = self.next().await {
            match event {
                LoadEvent::CacheServed(snapshot) => {
                    outcome.state = SyncState::CacheServed;
                    outcome.snapshot = snapshot;
                }
                LoadEvent::Reconciled {
                    snapshot,
                    failed_partitions,
                    ..
                } => {
                    outcome.state = SyncState::Reconciled;
                    outcome.snapshot = snapshot;
                    outcome.failed_partitions = failed_partitions;
                }
                LoadEvent::StaleFallback { .. } => outcome.state = SyncState::StaleFallback,
                LoadEvent::Failed(e) => {
                    outcome.state = match e {
                        Error::Unavailable(_) => SyncState::StaleFallback,
                        _ => SyncState::Failed,
                    };
                    outcome.error = Some(e);
                }
            }
        }
        outcome
    }
}

fn read_snapshot(db: &Database) -> Result<Snapshot> {
    Ok(Snapshot {
        meals: db.get_all_meals()?,
        categories: db.get_categories()?,
    })
}

/// Keeps the local meal cache in step with a remote [`MealSource`].
///
/// Owns the only store handle. SQLite calls run on the blocking pool and are
/// serialized by a mutex; load cycles are serialized by a separate async
/// lock so two reconciled snapshots never interleave. Favorite changes do not
/// take the refresh lock.
pub struct SyncEngine {
    db: Arc<Mutex<Database>>,
    source: Arc<dyn MealSource>,
    partitions: Vec<char>,
    refresh_lock: tokio::sync::Mutex<()>,
    state: watch::Sender<SyncState>,
}

impl SyncEngine {
    pub fn new(db: Database, source: Arc<dyn MealSource>) -> Self {
        let (state, _) = watch::channel(SyncState::ColdStart);
        Self {
            db: Arc::new(Mutex::new(db)),
            source,
            partitions: DEFAULT_PARTITIONS.to_vec(),
            refresh_lock: tokio::sync::Mutex::new(()),
            state,
        }
    }

    #[must_use]
    pub fn with_partitions(mut self, partitions: Vec<char>) -> Self {
        self.partitions = partitions;
        self
    }

    #[must_use]
    pub fn partitions(&self) -> &[char] {
        &self.partitions
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Close the store. Fails only if SQLite refuses to close the handle.
    pub fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.db) {
            Ok(db) => db.into_inner().unwrap_or_else(PoisonError::into_inner).close(),
            // A blocking task still holds the handle; it closes on drop.
            Err(_) => Ok(()),
        }
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let db = db.lock().unwrap_or_else(PoisonError::into_inner);
            f(&db)
        })
        .await?
    }

    fn set_state(&self, state: SyncState) {
        tracing::debug!(?state, "sync state");
        self.state.send_replace(state);
    }

    // --- Load cycle ---

    /// Start a load cycle on the runtime and return its event stream.
    ///
    /// The cycle is not cancelled if the stream is dropped; it runs to
    /// completion and its writes still land in the store.
    pub fn load(self: &Arc<Self>) -> LoadStream {
        let (tx, rx) = mpsc::channel(2);
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run_cycle(&tx).await });
        LoadStream { rx }
    }

    /// Run one cycle, delivering events to `tx`.
    pub async fn run_cycle(&self, tx: &mpsc::Sender<LoadEvent>) {
        let _refresh = self.refresh_lock.lock().await;
        self.set_state(SyncState::ColdStart);

        let cached = match self
            .with_db(|db| {
                db.initialize()?;
                read_snapshot(db)
            })
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "failed to read meal cache");
                self.set_state(SyncState::Failed);
                let _ = tx.send(LoadEvent::Failed(e)).await;
                return;
            }
        };

        let had_cache = !cached.is_empty();
        if had_cache {
            tracing::info!(count = cached.meals.len(), "serving cached meals");
            self.set_state(SyncState::CacheServed);
            let _ = tx.send(LoadEvent::CacheServed(cached)).await;
        }

        self.set_state(SyncState::Refreshing);
        let event = match source::fetch_all(self.source.as_ref(), &self.partitions).await {
            Ok(fetched) => {
                let failed_partitions = fetched.failures;
                let meals = fetched.meals;
                let applied = self
                    .with_db(move |db| {
                        let upsert = db.upsert_meals(&meals);
                        Ok((upsert, read_snapshot(db)?))
                    })
                    .await;
                match applied {
                    Ok((upsert, snapshot)) => {
                        tracing::info!(
                            stored = upsert.stored,
                            failed = upsert.failed.len(),
                            total = snapshot.meals.len(),
                            failed_partitions = failed_partitions.len(),
                            "meal cache reconciled"
                        );
                        self.set_state(SyncState::Reconciled);
                        LoadEvent::Reconciled {
                            snapshot,
                            failed_partitions,
                            upsert,
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to apply refresh");
                        self.set_state(SyncState::Failed);
                        LoadEvent::Failed(e)
                    }
                }
            }
            Err(e) if had_cache => {
                tracing::info!(error = %e, "refresh failed, keeping cached meals");
                self.set_state(SyncState::StaleFallback);
                LoadEvent::StaleFallback {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed with an empty cache");
                self.set_state(SyncState::StaleFallback);
                LoadEvent::Failed(Error::Unavailable(e.to_string()))
            }
        };
        let _ = tx.send(event).await;
    }

    // --- Cache reads ---

    pub async fn cached(&self) -> Result<Snapshot> {
        self.with_db(read_snapshot).await
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        self.with_db(Database::get_categories).await
    }

    pub async fn favorites(&self) -> Result<Vec<MealRecord>> {
        self.with_db(Database::get_favorites).await
    }

    pub async fn is_favorite(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.with_db(move |db| db.is_favorite(&id)).await
    }

    /// Look a meal up in the cache only.
    pub async fn cached_detail(&self, id: &str) -> Result<Option<MealDetail>> {
        let id = id.to_string();
        self.with_db(move |db| {
            let meal = db.get_meal_by_id(&id)?;
            let favorite = db.is_favorite(&id)?;
            Ok(meal.map(|meal| MealDetail { meal, favorite }))
        })
        .await
    }

    /// Look a meal up in the cache, falling back to the remote source. A
    /// remote hit is cached before it is returned.
    pub async fn meal_detail(&self, id: &str) -> Result<Option<MealDetail>> {
        let cached = self.cached_detail(id).await?;
        if cached.is_some() {
            return Ok(cached);
        }

        let Some(meal) = self
            .source
            .lookup(id)
            .await
            .map_err(Error::Network)?
            .and_then(payload_to_meal)
        else {
            return Ok(None);
        };

        tracing::debug!(meal_id = %meal.id, "caching meal from lookup");
        self.with_db(move |db| {
            db.upsert_meal(&meal)?;
            let favorite = db.is_favorite(&meal.id)?;
            Ok(Some(MealDetail { meal, favorite }))
        })
        .await
    }

    /// Search the remote source by name and cache whatever comes back.
    ///
    /// Every decoded match is returned; the report says which of them could
    /// not be written to the cache.
    pub async fn search_remote(&self, name: &str) -> Result<(Vec<MealRecord>, UpsertReport)> {
        let payloads = self.source.search(name).await.map_err(Error::Network)?;
        let (meals, _) = source::decode_payloads(payloads);
        let (meals, upsert) = self
            .with_db(move |db| {
                let upsert = db.upsert_meals(&meals);
                Ok((meals, upsert))
            })
            .await?;
        tracing::info!(
            found = meals.len(),
            stored = upsert.stored,
            failed = upsert.failed.len(),
            "cached remote search results"
        );
        Ok((meals, upsert))
    }

    // --- Favorites ---

    /// Write the favorite flag and return it. The returned value is only
    /// produced after the store accepted the write.
    pub async fn set_favorite(&self, id: &str, favorite: bool) -> Result<bool> {
        let id = id.to_string();
        self.with_db(move |db| {
            if favorite {
                db.add_favorite(&id)?;
            } else {
                db.remove_favorite(&id)?;
            }
            Ok(favorite)
        })
        .await
    }

    pub async fn toggle_favorite(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.with_db(move |db| {
            let favorite = !db.is_favorite(&id)?;
            if favorite {
                db.add_favorite(&id)?;
            } else {
                db.remove_favorite(&id)?;
            }
            Ok(favorite)
        })
        .await
    }
}
