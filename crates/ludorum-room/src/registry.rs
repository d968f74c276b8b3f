//! Room registry: the process-wide map from game code to room actor.
//!
//! Rooms are created lazily on the first connection to an unknown code.
//! The code is first resolved against the persistence port: an ACTIVE
//! tournament row seeds a tournament room, a COMPLETED one rejects the
//! connection, and an unknown code creates a permissive manual room with
//! the connector as host.
//!
//! The mutex guards only the map itself; tournament lookups and all
//! actor work happen outside it. A background reaper drains
//! [`RegistryEvent::Closed`] announcements and drops dead handles.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use ludorum_engine::{DiceRoller, GameCode};
use tokio::sync::{mpsc, Mutex};

use crate::room::{spawn_room, RegistryEvent, RoomHandle, RoomSeed};
use crate::{Persistence, RoomConfig, RoomError, TournamentStatus};

/// Factory for per-room dice. Injected so tests and scripted demos can
/// hand every room a deterministic roller.
pub type DiceFactory = Arc<dyn Fn() -> Box<dyn DiceRoller> + Send + Sync>;

/// The process-wide registry of live rooms.
pub struct Registry<P: Persistence> {
    rooms: Mutex<HashMap<GameCode, RoomHandle>>,
    persistence: Arc<P>,
    config: RoomConfig,
    dice_factory: DiceFactory,
    events: mpsc::UnboundedSender<RegistryEvent>,
}

impl<P: Persistence> Registry<P> {
    /// Creates a registry and spawns its reaper task.
    pub fn new(persistence: Arc<P>, config: RoomConfig, dice_factory: DiceFactory) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
            persistence,
            config,
            dice_factory,
            events: events_tx,
        });
        tokio::spawn(reap_closed_rooms(Arc::downgrade(&registry), events_rx));
        registry
    }

    /// Resolves `code` to a live room handle, creating the room if the
    /// code is unknown (or its previous actor already stopped).
    pub async fn attach(&self, code: &GameCode) -> Result<RoomHandle, RoomError> {
        if let Some(handle) = self.live_handle(code).await {
            return Ok(handle);
        }

        // Resolve the code against persistence outside the map lock.
        let tournament = self
            .persistence
            .find_tournament(code)
            .await
            .map_err(|e| RoomError::Lookup(e.to_string()))?;
        let seed = match tournament {
            Some(t) if t.status == TournamentStatus::Completed => {
                return Err(RoomError::TournamentOver(code.clone()));
            }
            Some(t) => RoomSeed::tournament(t.id, t.max_players, t.prize),
            None => RoomSeed::manual(),
        };

        let mut config = self.config.clone();
        if let Ok(settings) = self.persistence.load_settings().await {
            if let Some(ms) = settings.auto_start_delay_ms {
                config.auto_start_delay = std::time::Duration::from_millis(ms);
            }
        }

        let mut rooms = self.rooms.lock().await;
        // Re-check: another connection may have created the room while
        // we were looking the tournament up.
        if let Some(handle) = rooms.get(code) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }
        let handle = spawn_room(
            code.clone(),
            seed,
            config,
            Arc::clone(&self.persistence),
            (self.dice_factory)(),
            self.events.clone(),
        );
        rooms.insert(code.clone(), handle.clone());
        tracing::info!(%code, "room registered");
        Ok(handle)
    }

    /// Number of registered rooms (live or awaiting the reaper).
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    async fn live_handle(&self, code: &GameCode) -> Option<RoomHandle> {
        let rooms = self.rooms.lock().await;
        rooms.get(code).filter(|h| !h.is_closed()).cloned()
    }
}

/// Drops map entries for rooms that announced shutdown. Holds only a
/// weak reference so the registry can be dropped independently.
async fn reap_closed_rooms<P: Persistence>(
    registry: Weak<Registry<P>>,
    mut events: mpsc::UnboundedReceiver<RegistryEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(registry) = registry.upgrade() else {
            break;
        };
        match event {
            RegistryEvent::Closed(code) => {
                let mut rooms = registry.rooms.lock().await;
                // Only drop the entry if it still points at the stopped
                // actor; a fresh room may already sit under this code.
                if rooms.get(&code).is_some_and(|h| h.is_closed()) {
                    rooms.remove(&code);
                    tracing::info!(%code, "room evicted");
                }
            }
        }
    }
}
