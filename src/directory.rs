//! The game-code directory (C6): the only structure shared across rooms.
//! Maps `gameCode -> RoomHandle`, guarded by a short critical section so
//! concurrent creates for the same code cannot both succeed (§4.6, §5).
//!
//! Grounded on `congress/src/state/mod.rs`'s `AppState` as a process-wide
//! `Arc<RwLock<...>>`-guarded registry, narrowed here to just the
//! code->handle map — rooms own everything else themselves (§4.6/§9
//! "the directory owns rooms; rooms own state; sessions hold a handle to
//! exactly one room; no cycles").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::RoomError;
use crate::room::actor::{self, RoomHandle};
use crate::types::{normalize_game_code, random_game_code, GameCode};

pub struct GameDirectory {
    rooms: Mutex<HashMap<GameCode, RoomHandle>>,
}

impl GameDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
        })
    }

    /// Resolve-or-create the room for `requested_code`, or mint a fresh
    /// random code if none was supplied. The room actor itself decides
    /// whether a `createGame` on an existing room attaches to a vacant
    /// host slot or fails with `GameCodeConflict` (§4.5) — this only
    /// guarantees the code->handle mapping is created exactly once.
    pub async fn create_or_attach(
        &self,
        requested_code: Option<String>,
    ) -> Result<RoomHandle, RoomError> {
        let mut rooms = self.rooms.lock().await;

        if let Some(raw) = requested_code {
            let code = normalize_game_code(&raw)
                .ok_or_else(|| RoomError::MalformedMessage(format!("invalid game code {raw}")))?;
            if let Some(handle) = rooms.get(&code) {
                return Ok(handle.clone());
            }
            let handle = actor::spawn(code.clone());
            rooms.insert(code, handle.clone());
            return Ok(handle);
        }

        loop {
            let code = random_game_code();
            if !rooms.contains_key(&code) {
                let handle = actor::spawn(code.clone());
                rooms.insert(code, handle.clone());
                return Ok(handle);
            }
        }
    }

    /// Read-only lookup used by teams and watchers (§4.6).
    pub async fn resolve(&self, raw_code: &str) -> Result<RoomHandle, RoomError> {
        let code = normalize_game_code(raw_code)
            .ok_or_else(|| RoomError::GameNotFound(raw_code.to_string()))?;
        self.rooms
            .lock()
            .await
            .get(&code)
            .cloned()
            .ok_or_else(|| RoomError::GameNotFound(code))
    }

    /// Remove `code` from the map. Called by the idle reaper once it has
    /// decided a room should shut down (§4.6 `retire`).
    pub async fn retire(&self, code: &str) {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.remove(code) {
            handle.shutdown().await;
        }
    }

    async fn codes(&self) -> Vec<GameCode> {
        self.rooms.lock().await.keys().cloned().collect()
    }

    async fn handle_for(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.lock().await.get(code).cloned()
    }
}

/// Background task that retires rooms with no connected host and no
/// connected team once they have been idle past `grace` (§3 Lifecycles "A
/// Room is ... destroyed ... after a grace period with no host and no
/// connected teams"; §5 Cancellation).
pub fn spawn_idle_reaper(directory: Arc<GameDirectory>, grace: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            for code in directory.codes().await {
                let Some(handle) = directory.handle_for(&code).await else {
                    continue;
                };
                let Some(status) = handle.status().await else {
                    // Actor already gone; drop the stale mapping.
                    directory.retire(&code).await;
                    continue;
                };
                if !status.host_connected && !status.any_team_connected && status.idle_for >= grace
                {
                    tracing::info!(game_code = %code, "retiring idle room");
                    directory.retire(&code).await;
                }
            }
        }
    });
}
