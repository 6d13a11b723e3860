use std::{
    collections::{BTreeMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{NaiveDate, SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::{Event, NewEvent};
use crate::query::{self, OrganizerStats, SearchCriteria, SortBy};
use crate::registrations::{RegistrationBook, UserContext};
use crate::seed::seed_events;
use crate::snapshot::{Snapshot, SnapshotError};
use crate::storage::Storage;
use crate::utils;

pub const DEFAULT_STORAGE_KEY: &str = "vibecraft-events";

#[derive(Clone, Debug)]
pub struct StoreOptions {
    pub key: String,
    /// Start from the built-in sample events when nothing usable is stored.
    pub seed_when_empty: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_STORAGE_KEY.to_string(),
            seed_when_empty: true,
        }
    }
}

/// Where the in-memory state came from at `init`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Restored,
    SeededEmpty,
    SeededAfterCorruption,
    SeededAfterReadError,
    /// The stored snapshot is from a newer build; it is left untouched and
    /// this session does not write.
    SeededNewerSchema,
}

/// A write-through that did not go as planned. The in-memory change always
/// stands; this only says what happened to the durable copy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistWarning {
    #[error("failed to save events: {0}")]
    WriteFailed(String),
    #[error("stored snapshot moved from version {expected} to {found} since it was loaded")]
    LostUpdate { expected: u64, found: u64 },
    #[error("storage holds a newer snapshot format; changes are kept in memory only")]
    ReadOnly,
    /// Initial load failed and storage may still hold real data, so seed
    /// data is not written over it.
    #[error("stored events could not be verified; changes are kept in memory only")]
    Unverified,
}

impl PersistWarning {
    /// Whether the change made it to storage despite the warning.
    pub fn saved(&self) -> bool {
        matches!(self, PersistWarning::LostUpdate { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt<T> {
    pub value: T,
    pub warning: Option<PersistWarning>,
}

impl<T> Receipt<T> {
    pub fn saved(&self) -> bool {
        self.warning.as_ref().map_or(true, PersistWarning::saved)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("event {0} not found")]
    NotFound(String),
    #[error("event {0} is at full capacity")]
    SoldOut(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CancelError {
    #[error("no registration to cancel for event {0}")]
    NotRegistered(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    /// The user already held a seat; nothing changed.
    AlreadyRegistered,
}

struct State {
    events: Vec<Event>,
    registrations: RegistrationBook,
    /// Snapshot version last read or written by this instance.
    version: u64,
    last_issued_id: i64,
    writable: bool,
    /// Storage contents are known. False after the initial read failed.
    verified: bool,
    /// In-memory state differs from what storage holds.
    dirty: bool,
    last_warning: Option<PersistWarning>,
}

/// The single owner of events and registrations. Every read hands out
/// copies; every mutation goes through here and is written through to
/// storage before returning.
pub struct EventStore {
    storage: Box<dyn Storage>,
    key: String,
    origin: Origin,
    state: Mutex<State>,
}

impl EventStore {
    pub fn init(storage: Box<dyn Storage>, options: StoreOptions) -> Self {
        let (snapshot, origin) = match storage.read(&options.key) {
            Ok(Some(raw)) => match Snapshot::decode(&raw) {
                Ok(snapshot) => (Some(snapshot), Origin::Restored),
                Err(err @ SnapshotError::Unsupported { .. }) => {
                    warn!(key = %options.key, %err, "leaving newer snapshot untouched");
                    (None, Origin::SeededNewerSchema)
                }
                Err(err) => {
                    warn!(key = %options.key, %err, "stored events unreadable, starting from seed data");
                    (None, Origin::SeededAfterCorruption)
                }
            },
            Ok(None) => (None, Origin::SeededEmpty),
            Err(err) => {
                error!(key = %options.key, %err, "failed to read stored events");
                (None, Origin::SeededAfterReadError)
            }
        };

        let state = match snapshot {
            Some(snapshot) => State {
                last_issued_id: max_numeric_id(&snapshot.events),
                events: repair(snapshot.events),
                registrations: RegistrationBook::from_sorted(snapshot.registrations),
                version: snapshot.version,
                writable: true,
                verified: true,
                dirty: false,
                last_warning: None,
            },
            None => {
                let events = if options.seed_when_empty {
                    seed_events()
                } else {
                    Vec::new()
                };
                State {
                    last_issued_id: max_numeric_id(&events),
                    events,
                    registrations: RegistrationBook::default(),
                    version: 0,
                    writable: origin != Origin::SeededNewerSchema,
                    verified: origin != Origin::SeededAfterReadError,
                    dirty: true,
                    last_warning: None,
                }
            }
        };

        let store = Self {
            storage,
            key: options.key,
            origin,
            state: Mutex::new(state),
        };

        if matches!(origin, Origin::SeededEmpty | Origin::SeededAfterCorruption) {
            let mut state = store.state();
            store.persist(&mut state);
        }

        info!(
            key = %store.key,
            origin = ?store.origin,
            events = store.state().events.len(),
            "event store ready"
        );
        store
    }

    /// Flushes anything a failed write-through left behind. Returns the
    /// warning if storage still does not have the latest state.
    pub fn shutdown(self) -> Result<(), PersistWarning> {
        let mut state = self.state();
        if !state.dirty {
            return Ok(());
        }
        match self.persist(&mut state) {
            Some(warning) if !warning.saved() => Err(warning),
            _ => Ok(()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn version(&self) -> u64 {
        self.state().version
    }

    pub fn last_warning(&self) -> Option<PersistWarning> {
        self.state().last_warning.clone()
    }

    pub fn get_all(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    pub fn get_by_id(&self, id: &str) -> Option<Event> {
        self.state().events.iter().find(|e| e.id == id).cloned()
    }

    pub fn get_by_category(&self, category: &str) -> Vec<Event> {
        self.state()
            .events
            .iter()
            .filter(|e| query::category_matches(e, Some(category)))
            .cloned()
            .collect()
    }

    pub fn get_featured(&self) -> Vec<Event> {
        self.state()
            .events
            .iter()
            .filter(|e| e.featured)
            .cloned()
            .collect()
    }

    pub fn get_upcoming(&self) -> Vec<Event> {
        self.get_upcoming_on(utils::today_utc())
    }

    pub fn get_upcoming_on(&self, today: NaiveDate) -> Vec<Event> {
        query::upcoming_on(&self.state().events, today)
    }

    pub fn search(&self, text: &str, category: Option<&str>, location: Option<&str>) -> Vec<Event> {
        query::search(
            &self.state().events,
            &SearchCriteria::new(text, category, location),
        )
    }

    pub fn search_sorted(&self, criteria: &SearchCriteria<'_>, order: SortBy) -> Vec<Event> {
        let mut found = query::search(&self.state().events, criteria);
        query::sort_events(&mut found, order);
        found
    }

    pub fn get_by_organizer(&self, organizer_id: &str) -> Vec<Event> {
        self.state()
            .events
            .iter()
            .filter(|e| e.organizer_id == organizer_id)
            .cloned()
            .collect()
    }

    pub fn organizer_stats(&self, organizer_id: &str) -> OrganizerStats {
        let state = self.state();
        query::organizer_stats(state.events.iter().filter(|e| e.organizer_id == organizer_id))
    }

    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        query::category_counts(&self.state().events)
    }

    pub fn is_user_registered(&self, user: &UserContext, event_id: &str) -> bool {
        self.state().registrations.contains(&user.id, event_id)
    }

    /// The user's registrations in store order. Ids that no longer resolve
    /// are skipped.
    pub fn get_user_registered_events(&self, user: &UserContext) -> Vec<Event> {
        let state = self.state();
        let Some(ids) = state.registrations.events_for(&user.id) else {
            return Vec::new();
        };
        state
            .events
            .iter()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect()
    }

    /// Adds a listing. Field validation is the caller's job (see
    /// `NewEvent::validate`); the store only assigns id, timestamp and a
    /// zero attendee count.
    pub fn create(&self, new_event: NewEvent) -> Receipt<Event> {
        let mut state = self.state();
        let id = next_id(&mut state);
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let event = new_event.materialize(id, created_at);
        state.events.push(event.clone());
        debug!(id = %event.id, title = %event.title, "event created");
        let warning = self.persist(&mut state);
        Receipt {
            value: event,
            warning,
        }
    }

    /// Takes a seat for `user`. Registering again is a no-op success, so
    /// one user never holds more than one seat per event.
    pub fn register(
        &self,
        user: &UserContext,
        event_id: &str,
    ) -> Result<Receipt<RegisterOutcome>, RegisterError> {
        let mut state = self.state();
        let State {
            events,
            registrations,
            ..
        } = &mut *state;

        let event = events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| RegisterError::NotFound(event_id.to_string()))?;

        if registrations.contains(&user.id, event_id) {
            debug!(user = %user.id, event = %event_id, "already registered");
            return Ok(Receipt {
                value: RegisterOutcome::AlreadyRegistered,
                warning: None,
            });
        }
        if event.attendees >= event.capacity {
            return Err(RegisterError::SoldOut(event_id.to_string()));
        }

        event.attendees += 1;
        registrations.insert(&user.id, event_id);
        debug!(user = %user.id, event = %event_id, "registered");

        let warning = self.persist(&mut state);
        Ok(Receipt {
            value: RegisterOutcome::Registered,
            warning,
        })
    }

    pub fn cancel_registration(
        &self,
        user: &UserContext,
        event_id: &str,
    ) -> Result<Receipt<()>, CancelError> {
        let mut state = self.state();
        if !state.registrations.remove(&user.id, event_id) {
            return Err(CancelError::NotRegistered(event_id.to_string()));
        }

        match state.events.iter_mut().find(|e| e.id == event_id) {
            Some(event) if event.attendees == 0 => {
                warn!(event = %event_id, "attendee count already zero on cancel");
            }
            Some(event) => event.attendees -= 1,
            None => warn!(event = %event_id, "cancelled registration for unknown event"),
        }
        debug!(user = %user.id, event = %event_id, "registration cancelled");

        let warning = self.persist(&mut state);
        Ok(Receipt {
            value: (),
            warning,
        })
    }

    /// Full-snapshot write-through. Failures are logged and returned, never
    /// raised; the in-memory state is kept either way.
    fn persist(&self, state: &mut State) -> Option<PersistWarning> {
        let warning = self.write_snapshot(state);
        state.dirty = warning.as_ref().map_or(false, |w| !w.saved());
        state.last_warning = warning.clone();
        warning
    }

    fn write_snapshot(&self, state: &mut State) -> Option<PersistWarning> {
        if !state.writable {
            return Some(PersistWarning::ReadOnly);
        }
        if !state.verified {
            if let Some(warning) = self.verify_storage(state) {
                return Some(warning);
            }
        }

        let stored_version = match self.storage.read(&self.key) {
            Ok(Some(raw)) => Snapshot::peek_version(&raw),
            Ok(None) => 0,
            Err(err) => {
                warn!(key = %self.key, %err, "could not check stored version before write");
                state.version
            }
        };

        let mut warning = None;
        if stored_version > state.version {
            warn!(
                key = %self.key,
                expected = state.version,
                found = stored_version,
                "stored events changed since load, overwriting"
            );
            warning = Some(PersistWarning::LostUpdate {
                expected: state.version,
                found: stored_version,
            });
        }

        let next_version = stored_version.max(state.version).saturating_add(1);
        let saved_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let written = Snapshot::encode_parts(
            next_version,
            &saved_at,
            &state.events,
            &state.registrations.to_sorted(),
        )
        .map_err(|err| err.to_string())
        .and_then(|raw| {
            self.storage
                .write(&self.key, &raw)
                .map_err(|err| err.to_string())
        });

        match written {
            Ok(()) => {
                state.version = next_version;
                warning
            }
            Err(err) => {
                error!(key = %self.key, %err, "failed to save events");
                Some(PersistWarning::WriteFailed(err))
            }
        }
    }

    /// Re-reads storage after a failed initial load. Writing is only allowed
    /// once storage turns out to hold nothing we would lose.
    fn verify_storage(&self, state: &mut State) -> Option<PersistWarning> {
        match self.storage.read(&self.key) {
            Ok(Some(raw)) => match Snapshot::decode(&raw) {
                Ok(stored) => {
                    warn!(
                        key = %self.key,
                        events = stored.events.len(),
                        "stored events readable again, not overwriting them with seed data"
                    );
                    return Some(PersistWarning::Unverified);
                }
                Err(SnapshotError::Unsupported { .. }) => {
                    state.writable = false;
                    return Some(PersistWarning::ReadOnly);
                }
                Err(err) => debug!(key = %self.key, %err, "stored events still unreadable"),
            },
            Ok(None) => {}
            Err(err) => {
                warn!(key = %self.key, %err, "stored events still unavailable");
                return Some(PersistWarning::Unverified);
            }
        }
        state.verified = true;
        None
    }
}

/// Ids are millisecond timestamps, bumped past anything already issued or
/// stored. Once the numeric range is used up, ids get a `-n` suffix instead.
fn next_id(state: &mut State) -> String {
    let now = Utc::now().timestamp_millis();
    let events = &state.events;
    let taken = |id: &str| events.iter().any(|e| e.id == id);

    let mut candidate = state.last_issued_id.checked_add(1).map(|floor| now.max(floor));
    while let Some(n) = candidate {
        if !taken(&n.to_string()) {
            state.last_issued_id = n;
            return n.to_string();
        }
        candidate = n.checked_add(1);
    }

    warn!("numeric event ids exhausted, falling back to suffixed ids");
    let mut suffix: u64 = 1;
    loop {
        let id = format!("{now}-{suffix}");
        if !taken(&id) {
            return id;
        }
        suffix += 1;
    }
}

fn max_numeric_id(events: &[Event]) -> i64 {
    events
        .iter()
        .filter_map(|e| e.id.parse::<i64>().ok())
        .max()
        .unwrap_or(0)
}

/// Brings loaded records back within the invariants: unique ids and
/// attendees never above capacity.
fn repair(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::new();
    let mut repaired = Vec::with_capacity(events.len());
    for mut event in events {
        if !seen.insert(event.id.clone()) {
            warn!(id = %event.id, "dropping duplicate event id from snapshot");
            continue;
        }
        if event.attendees > event.capacity {
            warn!(
                id = %event.id,
                attendees = event.attendees,
                capacity = event.capacity,
                "clamping attendees to capacity"
            );
            event.attendees = event.capacity;
        }
        repaired.push(event);
    }
    repaired
}
