//! Room actor: an isolated Tokio task that owns one game.
//!
//! Each live game code runs in its own task, fed by an mpsc inbox. All
//! mutations serialize through that inbox, so the rule engine never
//! observes concurrent access, and timer-driven follow-ups (dice
//! resolution, delayed advances, grace expiry, eviction) are just more
//! commands posted into the same queue.
//!
//! ```text
//!  sessions ──Join/Action/Leave──►┐
//!  turn clock ──Tick (interval)──►├── inbox ──► engine ──► broadcast
//!  delayed tasks ──ResolveRoll──►─┘
//! ```
//!
//! Scheduled commands that race a state change are disarmed in one of
//! two ways: `ResolveRoll`/`AutoStart`/`Evict` carry the epoch or
//! generation they were scheduled under and are dropped when stale;
//! `AdvanceTurn` and `GraceExpired` are guarded by the game state
//! itself (`pending_advance`, the per-user disconnect generation).

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ludorum_engine::{
    ChatEntry, DiceRoller, Game, GameCode, GameKind, GameStatus, RollOutcome, UserId,
};
use ludorum_protocol::{ClientAction, ServerFrame};
use tokio::sync::{mpsc, oneshot};

use crate::{Persistence, RoomConfig, RoomError};

/// Write-side of one peer connection. The session owns the socket; the
/// room only holds this handle and drops frames for dead peers.
pub type PeerWriter = mpsc::UnboundedSender<ServerFrame>;

/// Commands accepted by a room actor.
pub enum RoomCommand {
    /// A session attached after AUTH. Registers the writer, seats the
    /// player during Setup, reconciles reconnects.
    Join {
        user_id: UserId,
        name: String,
        writer: PeerWriter,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// A post-auth client action.
    Action { user_id: UserId, action: ClientAction },

    /// The session's connection closed (not a voluntary LEAVE_GAME).
    Leave { user_id: UserId },

    /// Metadata snapshot for diagnostics.
    Info { reply: oneshot::Sender<RoomInfo> },

    // -- timer-posted ----------------------------------------------------
    /// Resolve the roll started at `epoch`.
    ResolveRoll { epoch: u64 },

    /// Advance the seat after a no-move or three-sixes display delay.
    AdvanceTurn,

    /// Start a full tournament room if nothing changed since `epoch`.
    AutoStart { epoch: u64 },

    /// A disconnected player's grace ran out.
    GraceExpired { user_id: UserId, generation: u64 },

    /// Tear the room down if the attach generation still matches.
    Evict { generation: u64 },
}

/// Room metadata (not the game snapshot).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: GameCode,
    pub status: GameStatus,
    pub seated: usize,
    pub connected: usize,
}

/// Announced to the registry when an actor stops, so the map entry can
/// be reaped.
#[derive(Debug)]
pub enum RegistryEvent {
    Closed(GameCode),
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cheap clonable handle for sending commands to a room actor.
#[derive(Clone)]
pub struct RoomHandle {
    code: GameCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// The room's game code.
    pub fn code(&self) -> &GameCode {
        &self.code
    }

    /// `true` once the actor has stopped and the inbox is gone.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Attaches a peer: registers the writer and seats or reconnects
    /// the player.
    pub async fn join(
        &self,
        user_id: UserId,
        name: String,
        writer: PeerWriter,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                user_id,
                name,
                writer,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Forwards a client action (fire-and-forget).
    pub async fn action(&self, user_id: UserId, action: ClientAction) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Action { user_id, action })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Reports a closed connection.
    pub async fn leave(&self, user_id: UserId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Leave { user_id })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Requests room metadata.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

enum Flow {
    Continue,
    Stop,
}

struct RoomActor<P: Persistence> {
    game: Game,
    config: RoomConfig,
    writers: HashMap<UserId, PeerWriter>,
    dice: Box<dyn DiceRoller>,
    persistence: std::sync::Arc<P>,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Clone handed to delayed tasks so follow-ups land in the inbox.
    sender: mpsc::Sender<RoomCommand>,
    registry: mpsc::UnboundedSender<RegistryEvent>,

    /// Bumped on every turn-state transition. Scheduled commands carry
    /// the epoch they were armed under.
    epoch: u64,
    /// Bumped on every Join; disarms idle evictions.
    attach_generation: u64,
    /// Per-user disconnect counters; a reconnect disarms the pending
    /// grace expiry.
    disconnect_generation: HashMap<UserId, u64>,
    /// Prefix of `game.turn_log` already appended through the port.
    persisted_events: usize,
    prize: i64,
    prize_credited: bool,
}

impl<P: Persistence> RoomActor<P> {
    async fn run(mut self) {
        tracing::info!(code = %self.game.code, kind = ?self.game.kind, "room started");

        let mut clock = tokio::time::interval(self.config.turn_tick);
        clock.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first interval tick completes immediately; swallow it so
        // the game clock starts a full tick after creation.
        clock.tick().await;

        loop {
            tokio::select! {
                command = self.receiver.recv() => match command {
                    Some(command) => {
                        if let Flow::Stop = self.handle(command).await {
                            break;
                        }
                    }
                    None => break,
                },
                _ = clock.tick() => self.on_clock_tick().await,
            }
        }

        tracing::info!(code = %self.game.code, "room stopped");
        let _ = self
            .registry
            .send(RegistryEvent::Closed(self.game.code.clone()));
    }

    async fn handle(&mut self, command: RoomCommand) -> Flow {
        match command {
            RoomCommand::Join {
                user_id,
                name,
                writer,
                reply,
            } => {
                let result = self.handle_join(user_id, name, writer);
                let _ = reply.send(result);
            }
            RoomCommand::Action { user_id, action } => {
                self.handle_action(user_id, action).await;
            }
            RoomCommand::Leave { user_id } => self.handle_disconnect(user_id),
            RoomCommand::Info { reply } => {
                let _ = reply.send(RoomInfo {
                    code: self.game.code.clone(),
                    status: self.game.status,
                    seated: self.game.players.len(),
                    connected: self.writers.len(),
                });
            }
            RoomCommand::ResolveRoll { epoch } => self.handle_resolve_roll(epoch).await,
            RoomCommand::AdvanceTurn => {
                if self.game.advance_turn() {
                    self.epoch += 1;
                    self.broadcast();
                }
            }
            RoomCommand::AutoStart { epoch } => {
                if epoch == self.epoch
                    && self.game.status == GameStatus::Setup
                    && self.game.players.len() == usize::from(self.game.max_players)
                {
                    self.game.start_game(None);
                    self.epoch += 1;
                    tracing::info!(code = %self.game.code, "tournament auto-started");
                    self.broadcast();
                    self.persist_new_events().await;
                }
            }
            RoomCommand::GraceExpired {
                user_id,
                generation,
            } => self.handle_grace_expired(user_id, generation).await,
            RoomCommand::Evict { generation } => {
                let evictable = self.game.status == GameStatus::Finished
                    || self.writers.is_empty();
                if generation == self.attach_generation && evictable {
                    return Flow::Stop;
                }
            }
        }
        Flow::Continue
    }

    // -- joins and disconnects --------------------------------------------

    fn handle_join(
        &mut self,
        user_id: UserId,
        name: String,
        writer: PeerWriter,
    ) -> Result<(), RoomError> {
        if self.game.status == GameStatus::Finished {
            return Err(RoomError::GameOver(self.game.code.clone()));
        }

        if self.game.seat_of(&user_id).is_some() {
            // Reconnect (or a second tab): the new writer wins, and any
            // pending grace expiry is disarmed.
            self.game.set_disconnected(&user_id, false);
            *self.disconnect_generation.entry(user_id.clone()).or_insert(0) += 1;
            tracing::info!(code = %self.game.code, %user_id, "player reconnected");
        } else {
            if self.game.status != GameStatus::Setup {
                return Err(RoomError::InProgress(self.game.code.clone()));
            }
            use ludorum_engine::JoinOutcome;
            match self.game.add_player(&user_id, &name) {
                JoinOutcome::Seated { seat } => {
                    tracing::info!(code = %self.game.code, %user_id, seat, "player seated");
                }
                JoinOutcome::GameFull => {
                    return Err(RoomError::RoomFull(self.game.code.clone()))
                }
                JoinOutcome::AlreadyStarted => {
                    return Err(RoomError::InProgress(self.game.code.clone()))
                }
                JoinOutcome::AlreadySeated => {}
            }
        }

        self.attach_generation += 1;
        // Auth acknowledgement goes to the joining writer only; the
        // snapshot reaches it through the join broadcast.
        let _ = writer.send(ServerFrame::AuthSuccess {});
        self.writers.insert(user_id, writer);
        self.broadcast();

        // A full tournament table starts itself after a short delay.
        if self.game.kind == GameKind::Tournament
            && self.game.status == GameStatus::Setup
            && self.game.players.len() == usize::from(self.game.max_players)
        {
            self.schedule(
                RoomCommand::AutoStart { epoch: self.epoch },
                self.config.auto_start_delay,
            );
        }
        Ok(())
    }

    fn handle_disconnect(&mut self, user_id: UserId) {
        if self.writers.remove(&user_id).is_none() {
            return;
        }
        tracing::info!(code = %self.game.code, %user_id, "peer detached");

        match self.game.status {
            GameStatus::Setup => {
                // No game to protect yet: free the seat immediately.
                self.game.leave_game(&user_id);
                self.broadcast();
            }
            GameStatus::Playing => {
                if self.game.set_disconnected(&user_id, true) {
                    let generation = {
                        let g = self
                            .disconnect_generation
                            .entry(user_id.clone())
                            .or_insert(0);
                        *g += 1;
                        *g
                    };
                    self.broadcast();
                    self.schedule(
                        RoomCommand::GraceExpired {
                            user_id,
                            generation,
                        },
                        self.config.reconnect_grace,
                    );
                }
            }
            GameStatus::Finished => {}
        }

        if self.writers.is_empty() && self.game.status != GameStatus::Finished {
            self.schedule(
                RoomCommand::Evict {
                    generation: self.attach_generation,
                },
                self.config.idle_evict_delay,
            );
        }
    }

    async fn handle_grace_expired(&mut self, user_id: UserId, generation: u64) {
        if self.disconnect_generation.get(&user_id) != Some(&generation) {
            return; // reconnected (or disconnected again) in the meantime
        }
        let still_gone = self
            .game
            .player(&user_id)
            .map(|p| p.disconnected && !p.is_removed)
            .unwrap_or(false);
        if !still_gone || self.game.status != GameStatus::Playing {
            return;
        }
        tracing::info!(code = %self.game.code, %user_id, "grace expired, leaving on behalf");
        self.game.leave_game(&user_id);
        self.epoch += 1;
        self.broadcast();
        self.persist_new_events().await;
        if self.game.status == GameStatus::Finished {
            self.on_finished().await;
        }
    }

    // -- client actions ---------------------------------------------------

    async fn handle_action(&mut self, user_id: UserId, action: ClientAction) {
        // Every action requires a seat, chat included.
        if self.game.seat_of(&user_id).is_none() {
            tracing::debug!(code = %self.game.code, %user_id, "action from unseated user dropped");
            return;
        }

        match action {
            ClientAction::StartGame => {
                use ludorum_engine::StartOutcome;
                match self.game.start_game(Some(&user_id)) {
                    StartOutcome::Started => {
                        self.epoch += 1;
                        tracing::info!(code = %self.game.code, "game started");
                        self.broadcast();
                        self.persist_new_events().await;
                    }
                    outcome => {
                        tracing::debug!(code = %self.game.code, %user_id, ?outcome, "start dropped");
                    }
                }
            }

            ClientAction::RollDice => {
                if self.game.initiate_roll(&user_id) {
                    self.epoch += 1;
                    self.broadcast();
                    self.schedule(
                        RoomCommand::ResolveRoll { epoch: self.epoch },
                        self.config.roll_resolve_delay,
                    );
                }
            }

            ClientAction::MovePiece { piece_id } => {
                use ludorum_engine::MoveOutcome;
                match self.game.move_piece(&user_id, piece_id) {
                    MoveOutcome::Rejected => {
                        tracing::debug!(code = %self.game.code, %user_id, piece_id, "move dropped");
                    }
                    outcome => {
                        self.epoch += 1;
                        self.broadcast();
                        self.persist_new_events().await;
                        if let MoveOutcome::Won = outcome {
                            self.on_finished().await;
                        }
                    }
                }
            }

            ClientAction::LeaveGame => {
                use ludorum_engine::LeaveOutcome;
                if self.game.leave_game(&user_id) == LeaveOutcome::Removed {
                    self.epoch += 1;
                    self.broadcast();
                    self.persist_new_events().await;
                    if self.game.status == GameStatus::Finished {
                        self.on_finished().await;
                    }
                }
            }

            ClientAction::SendChatMessage { text } => self.handle_chat(user_id, text).await,

            // AUTH is consumed by the session layer; NoOp is an unknown
            // tag. Both are dropped here.
            ClientAction::Auth { .. } | ClientAction::NoOp => {}
        }
    }

    async fn handle_chat(&mut self, user_id: UserId, text: String) {
        let Some(player) = self.game.player(&user_id) else {
            return;
        };
        if player.is_removed || text.is_empty() {
            return;
        }
        let entry = ChatEntry {
            user_id: user_id.clone(),
            name: player.name.clone(),
            text,
            sent_at_ms: now_ms(),
        };
        self.game.push_chat(entry.clone());
        self.broadcast();

        if let Some(tournament_id) = self.game.tournament_id.clone() {
            if let Err(error) = self.persistence.append_chat(&tournament_id, &entry).await {
                tracing::warn!(code = %self.game.code, %error, "chat append failed");
            }
        }
    }

    // -- timers -----------------------------------------------------------

    async fn on_clock_tick(&mut self) {
        use ludorum_engine::TickOutcome;
        match self.game.tick_second() {
            TickOutcome::Idle => {}
            TickOutcome::Counted(left) => {
                // Reduced cadence while only the clock moves.
                if left % self.config.broadcast_every_ticks == 0 {
                    self.broadcast();
                }
            }
            TickOutcome::Expired => {
                let outcome = self.game.handle_missed_turn();
                tracing::debug!(code = %self.game.code, ?outcome, "turn clock expired");
                self.epoch += 1;
                self.broadcast();
                self.persist_new_events().await;
                if self.game.status == GameStatus::Finished {
                    self.on_finished().await;
                }
            }
        }
    }

    async fn handle_resolve_roll(&mut self, epoch: u64) {
        if epoch != self.epoch {
            return; // the turn state moved on while the dice spun
        }
        let outcome = self.game.complete_roll(self.dice.as_mut());
        if let RollOutcome::NotRolling = outcome {
            return;
        }
        self.epoch += 1;
        self.broadcast();
        self.persist_new_events().await;

        match outcome {
            RollOutcome::NoMove { .. } | RollOutcome::ThreeSixes => {
                self.schedule(RoomCommand::AdvanceTurn, self.config.no_move_advance_delay);
            }
            _ => {}
        }
    }

    // -- output -----------------------------------------------------------

    /// Snapshots the game and best-effort sends to every registered
    /// writer. Writers whose session is gone are pruned here.
    fn broadcast(&mut self) {
        let frame = ServerFrame::snapshot(&self.game);
        self.writers
            .retain(|_, writer| writer.send(frame.clone()).is_ok());
    }

    /// Appends turn-log entries produced since the last call. Only
    /// tournament rooms persist; failures are logged and swallowed.
    async fn persist_new_events(&mut self) {
        let Some(tournament_id) = self.game.tournament_id.clone() else {
            self.persisted_events = self.game.turn_log.len();
            return;
        };
        while self.persisted_events < self.game.turn_log.len() {
            let event = self.game.turn_log[self.persisted_events].clone();
            if let Err(error) = self
                .persistence
                .append_turn_event(&tournament_id, &event)
                .await
            {
                tracing::warn!(code = %self.game.code, %error, "turn log append failed");
                // Skip rather than retry: the in-memory log remains the
                // source of truth and gameplay must not stall.
            }
            self.persisted_events += 1;
        }
    }

    /// Finish housekeeping: pay the winner (tournaments) and arm the
    /// post-game eviction.
    async fn on_finished(&mut self) {
        if let (Some(tournament_id), Some(winner)) =
            (self.game.tournament_id.clone(), self.game.winner.clone())
        {
            if self.prize > 0 && !self.prize_credited {
                let transaction_id = format!("{tournament_id}:{winner}:win");
                match self
                    .persistence
                    .credit_balance(&winner, self.prize, &transaction_id)
                    .await
                {
                    Ok(()) => {
                        self.prize_credited = true;
                        tracing::info!(code = %self.game.code, %winner, prize = self.prize, "prize credited");
                    }
                    Err(error) => {
                        tracing::warn!(code = %self.game.code, %error, "prize credit failed");
                    }
                }
            }
        }
        self.schedule(
            RoomCommand::Evict {
                generation: self.attach_generation,
            },
            self.config.finished_evict_delay,
        );
    }

    /// Posts `command` back into the inbox after `delay`. The task is
    /// fire-and-forget; a closed inbox just drops it.
    fn schedule(&self, command: RoomCommand, delay: Duration) {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sender.send(command).await;
        });
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Seed data for a new room, resolved by the registry at first connect.
#[derive(Debug, Clone)]
pub struct RoomSeed {
    pub kind: GameKind,
    pub max_players: u8,
    pub tournament_id: Option<String>,
    pub prize: i64,
}

impl RoomSeed {
    /// An ad-hoc room: 4 seats, no tournament row behind it.
    pub fn manual() -> Self {
        Self {
            kind: GameKind::Manual,
            max_players: 4,
            tournament_id: None,
            prize: 0,
        }
    }

    /// A room seeded from an ACTIVE tournament row.
    pub fn tournament(id: String, max_players: u8, prize: i64) -> Self {
        Self {
            kind: GameKind::Tournament,
            max_players,
            tournament_id: Some(id),
            prize,
        }
    }
}

/// Spawns a room actor and returns its handle.
pub fn spawn_room<P: Persistence>(
    code: GameCode,
    seed: RoomSeed,
    config: RoomConfig,
    persistence: std::sync::Arc<P>,
    dice: Box<dyn DiceRoller>,
    registry: mpsc::UnboundedSender<RegistryEvent>,
) -> RoomHandle {
    let (sender, receiver) = mpsc::channel(config.inbox_capacity);

    let mut game = Game::new(code.clone(), seed.kind, seed.max_players, config.rules.clone());
    game.tournament_id = seed.tournament_id;

    let actor = RoomActor {
        game,
        config,
        writers: HashMap::new(),
        dice,
        persistence,
        receiver,
        sender: sender.clone(),
        registry,
        epoch: 0,
        attach_generation: 0,
        disconnect_generation: HashMap::new(),
        persisted_events: 0,
        prize: seed.prize,
        prize_credited: false,
    };
    tokio::spawn(actor.run());

    RoomHandle { code, sender }
}
