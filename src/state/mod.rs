pub mod rooms;
pub mod session;
pub mod state_machine;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{models::Category, score_store::ScoreStore},
    error::ServiceError,
    providers::{JudgeProvider, RosterProvider},
    state::session::ScoringSession,
};

pub use self::rooms::RoomHub;
pub use self::state_machine::{
    AbortError, ApplyError, Plan, PlanError, PlanId, SessionPhase, Snapshot,
};

pub type SharedState = Arc<AppState>;

/// Key addressing the single live session per team within a bucket.
pub type SessionKey = (uuid::Uuid, Category);

/// Central application state storing the room hub, live scoring sessions,
/// collaborator handles, and the persistence backend.
pub struct AppState {
    score_store: RwLock<Option<Arc<dyn ScoreStore>>>,
    rooms: RoomHub,
    sessions: DashMap<SessionKey, Arc<Mutex<ScoringSession>>>,
    roster: Arc<dyn RosterProvider>,
    judge_roster: Arc<dyn JudgeProvider>,
    config: AppConfig,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        config: AppConfig,
        roster: Arc<dyn RosterProvider>,
        judge_roster: Arc<dyn JudgeProvider>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let rooms = RoomHub::new(config.room_capacity());
        Arc::new(Self {
            score_store: RwLock::new(None),
            rooms,
            sessions: DashMap::new(),
            roster,
            judge_roster,
            config,
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current score store, if one is installed.
    pub async fn score_store(&self) -> Option<Arc<dyn ScoreStore>> {
        let guard = self.score_store.read().await;
        guard.as_ref().cloned()
    }

    /// Score store handle or a degraded-mode error.
    pub async fn require_score_store(&self) -> Result<Arc<dyn ScoreStore>, ServiceError> {
        self.score_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new score store implementation and leave degraded mode.
    pub async fn install_score_store(&self, store: Arc<dyn ScoreStore>) {
        {
            let mut guard = self.score_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current score store and enter degraded mode.
    pub async fn clear_score_store(&self) {
        {
            let mut guard = self.score_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        if self.is_degraded() == value {
            return;
        }

        let _ = self.degraded.send(value);
    }

    /// Room hub fanning live events out to bucket subscribers.
    pub fn rooms(&self) -> &RoomHub {
        &self.rooms
    }

    /// Team and player roster collaborator.
    pub fn roster(&self) -> Arc<dyn RosterProvider> {
        self.roster.clone()
    }

    /// Judge roster collaborator.
    pub fn judge_roster(&self) -> Arc<dyn JudgeProvider> {
        self.judge_roster.clone()
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Look up the live session for a (team, bucket) pair.
    pub fn session(&self, key: &SessionKey) -> Option<Arc<Mutex<ScoringSession>>> {
        self.sessions.get(key).map(|entry| entry.value().clone())
    }

    /// Install a freshly opened session, replacing any previous one for the key.
    pub fn install_session(
        &self,
        key: SessionKey,
        session: ScoringSession,
    ) -> Arc<Mutex<ScoringSession>> {
        let handle = Arc::new(Mutex::new(session));
        self.sessions.insert(key, handle.clone());
        handle
    }

    /// Dispose of a live session, returning its handle when one existed.
    pub fn remove_session(&self, key: &SessionKey) -> Option<Arc<Mutex<ScoringSession>>> {
        self.sessions.remove(key).map(|(_, handle)| handle)
    }

    /// Every live session scoring within a bucket.
    pub fn sessions_in_category(&self, category: &Category) -> Vec<Arc<Mutex<ScoringSession>>> {
        self.sessions
            .iter()
            .filter(|entry| &entry.key().1 == category)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Every live session, regardless of bucket.
    pub fn all_sessions(&self) -> Vec<Arc<Mutex<ScoringSession>>> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
