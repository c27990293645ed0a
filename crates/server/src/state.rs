use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::FromRef;
use clubhouse_api::EnrollmentResponse;
use clubhouse_backend::Backend;
use clubhouse_core::Enrollment;
use tokio::sync::watch;
use uuid::Uuid;

/// Backend handle shared by every handler.
pub type SharedBackend = Arc<dyn Backend>;

/// One wizard; its own lock sequences that wizard's calls.
pub type Wizard = Arc<tokio::sync::Mutex<Enrollment>>;

/// Wizards untouched for this long are dropped on the next `start`.
pub const WIZARD_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: SharedBackend,
    pub config: AppConfig,
    pub enrollments: Enrollments,
}

/// Server configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Public origin, used for recovery links.
    pub base_url: String,
}

impl AppState {
    pub fn new(backend: SharedBackend, config: AppConfig) -> Self {
        Self {
            backend,
            config,
            enrollments: Enrollments::default(),
        }
    }
}

impl FromRef<AppState> for SharedBackend {
    fn from_ref(state: &AppState) -> Self {
        state.backend.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Enrollments {
    fn from_ref(state: &AppState) -> Self {
        state.enrollments.clone()
    }
}

/// A wizard plus its last published snapshot.
///
/// The snapshot is readable without the wizard lock, so polling sees the
/// in-flight status while a step is still waiting on the backend.
#[derive(Clone)]
pub struct Entry {
    pub wizard: Wizard,
    live: Arc<watch::Sender<EnrollmentResponse>>,
}

impl Entry {
    fn open(id: &Uuid) -> Self {
        let mut enrollment = Enrollment::new();
        let (live, _) = watch::channel(enrollment.to_response(&id.to_string()));
        let live = Arc::new(live);
        let feed = live.clone();
        enrollment.on_status(move |status| {
            feed.send_modify(|snap| snap.status = status.to_string());
        });
        Self {
            wizard: Arc::new(tokio::sync::Mutex::new(enrollment)),
            live,
        }
    }

    pub fn current(&self) -> EnrollmentResponse {
        self.live.borrow().clone()
    }

    pub fn publish(&self, snapshot: EnrollmentResponse) {
        self.live.send_replace(snapshot);
    }
}

struct Slot {
    entry: Entry,
    touched: Instant,
}

/// In-flight enrollment wizards, keyed by the id handed to the browser.
#[derive(Clone)]
pub struct Enrollments {
    wizards: Arc<Mutex<HashMap<Uuid, Slot>>>,
    idle_ttl: Duration,
}

impl Default for Enrollments {
    fn default() -> Self {
        Self::with_idle_ttl(WIZARD_IDLE_TTL)
    }
}

impl Enrollments {
    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            wizards: Arc::default(),
            idle_ttl,
        }
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Slot>> {
        self.wizards.lock().expect("enrollment store mutex poisoned")
    }

    pub fn start(&self) -> (Uuid, Entry) {
        let id = Uuid::new_v4();
        let entry = Entry::open(&id);
        let mut map = self.map();
        let before = map.len();
        map.retain(|_, slot| slot.touched.elapsed() < self.idle_ttl);
        if map.len() < before {
            tracing::debug!(dropped = before - map.len(), "idle enrollments swept");
        }
        map.insert(
            id,
            Slot {
                entry: entry.clone(),
                touched: Instant::now(),
            },
        );
        (id, entry)
    }

    pub fn get(&self, id: &Uuid) -> Option<Entry> {
        let mut map = self.map();
        let slot = map.get_mut(id)?;
        slot.touched = Instant::now();
        Some(slot.entry.clone())
    }

    pub fn remove(&self, id: &Uuid) {
        self.map().remove(id);
    }

    pub fn open_count(&self) -> usize {
        self.map().len()
    }
}
