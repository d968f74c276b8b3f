//! The rule operations: everything that mutates a [`Game`].
//!
//! Every operation is total. Inputs that the rules reject (wrong turn,
//! unknown piece, wrong phase) produce an explicit `Rejected`/no-op
//! outcome rather than an error; the room actor silently drops those per
//! the protocol's error policy. No operation panics and none performs
//! I/O; the only non-determinism is the injected [`DiceRoller`].
//!
//! Turn flow, as driven by the room actor:
//!
//! ```text
//!   initiate_roll ──(500ms)──► complete_roll ──┬─ Rolled ──► move_piece
//!                                              ├─ NoMove ──(delay)──► advance_turn
//!                                              └─ ThreeSixes ─(delay)─► advance_turn
//!   move_piece ──┬─ bonus (six / capture / finish) ──► same seat rolls again
//!                ├─ all four finished ──► game over, winner declared
//!                └─ otherwise ──► advance_seat
//! ```

use crate::board::{is_safe, target_of, Color, FINISH_START};
use crate::dice::DiceRoller;
use crate::ids::UserId;
use crate::state::{
    Game, GameStatus, PieceState, Player, TurnEvent, PITY_ROLL_THRESHOLD, THREE_SIXES,
};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of seating a player during Setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Seated { seat: usize },
    AlreadySeated,
    GameFull,
    AlreadyStarted,
}

/// Result of a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    NotHost,
    NotEnoughPlayers,
    NotInSetup,
}

/// Result of resolving a roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollOutcome {
    /// The player has at least one legal move for `value`.
    Rolled { value: u8 },
    /// No piece can use `value`; the seat advances after a display delay.
    NoMove { value: u8 },
    /// Third consecutive six; the turn is forfeited without a move.
    ThreeSixes,
    /// There was no roll in flight.
    NotRolling,
}

/// Result of a move request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The move applied; `bonus` means the seat keeps the turn.
    Moved { bonus: bool },
    /// The move finished the player's fourth piece; game over.
    Won,
    /// Not this player's turn, not a movable piece, or wrong phase.
    Rejected,
}

/// Result of a turn-clock expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissOutcome {
    /// Strike recorded, seat advanced.
    Strike { strikes: u8 },
    /// Strike limit reached; the seat was forfeited as-if LEAVE.
    Forfeited,
    /// The game was not in a state where turns can be missed.
    Ignored,
}

/// Result of one second elapsing on the turn clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Clock decremented; seconds remaining.
    Counted(u32),
    /// Clock hit zero; the actor should apply `handle_missed_turn`.
    Expired,
    /// Clock paused (not playing, roll in flight, or advance pending).
    Idle,
}

/// Result of a leave, voluntary or forced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    Removed,
    NoOp,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl Game {
    /// Seats `user_id` on the next free seat. Setup only; the first
    /// joiner becomes host.
    pub fn add_player(&mut self, user_id: &UserId, name: &str) -> JoinOutcome {
        if self.seat_of(user_id).is_some() {
            return JoinOutcome::AlreadySeated;
        }
        if self.status != GameStatus::Setup {
            return JoinOutcome::AlreadyStarted;
        }
        if self.players.len() >= usize::from(self.max_players) {
            return JoinOutcome::GameFull;
        }

        let seat = self.players.len();
        let color = Color::seating(self.max_players)[seat];
        let is_host = self.host_id.is_none();
        if is_host {
            self.host_id = Some(user_id.clone());
        }
        self.players
            .push(Player::new(user_id.clone(), name.to_string(), color, is_host));
        self.message = format!("{name} joined");
        JoinOutcome::Seated { seat }
    }

    /// Starts the game. `by = None` is the system (tournament
    /// auto-start); otherwise only the host may start.
    pub fn start_game(&mut self, by: Option<&UserId>) -> StartOutcome {
        if self.status != GameStatus::Setup {
            return StartOutcome::NotInSetup;
        }
        if let Some(user_id) = by {
            if self.host_id.as_ref() != Some(user_id) {
                return StartOutcome::NotHost;
            }
        }
        if self.players.len() < 2 {
            return StartOutcome::NotEnoughPlayers;
        }

        self.status = GameStatus::Playing;
        self.player_order = self.players.iter().map(|p| p.color).collect();
        self.current_seat = 0;
        self.dice = None;
        self.is_rolling = false;
        self.movable.clear();
        self.pending_advance = false;
        self.turn_seconds_left = self.rules.turn_limit_secs;
        self.message = format!("{}'s turn", self.players[0].name);
        self.turn_log.push(TurnEvent::GameStarted {
            order: self.player_order.clone(),
        });
        StartOutcome::Started
    }

    /// Begins a roll for the current player. Returns `false` when it is
    /// not that player's turn or a roll/advance is already in flight.
    pub fn initiate_roll(&mut self, by: &UserId) -> bool {
        if self.status != GameStatus::Playing
            || self.is_rolling
            || self.pending_advance
            || self.dice.is_some()
        {
            return false;
        }
        let Some(current) = self.players.get_mut(self.current_seat) else {
            return false;
        };
        if &current.id != by || !current.is_live() {
            return false;
        }

        current.inactive_turns = 0;
        self.is_rolling = true;
        self.message = format!("{} is rolling", current.name);
        true
    }

    /// Resolves the roll in flight: samples the dice (pity six applies),
    /// runs the three-sixes bookkeeping, and computes the movable set.
    ///
    /// `NoMove` and `ThreeSixes` leave the game with `pending_advance`
    /// set; the turn controller calls [`advance_turn`](Self::advance_turn)
    /// after the display delay.
    pub fn complete_roll(&mut self, dice: &mut dyn DiceRoller) -> RollOutcome {
        if self.status != GameStatus::Playing || !self.is_rolling {
            return RollOutcome::NotRolling;
        }
        self.is_rolling = false;

        let pity_six = self.rules.pity_six;
        let penalty = self.rules.three_sixes_penalty;
        let Some(current) = self.players.get_mut(self.current_seat) else {
            return RollOutcome::NotRolling;
        };

        let forced = pity_six
            && current.all_home()
            && current.rolls_without_six_when_all_home >= PITY_ROLL_THRESHOLD;
        let value = if forced { 6 } else { dice.roll().clamp(1, 6) };

        if value == 6 {
            current.rolls_without_six_when_all_home = 0;
            current.consecutive_sixes += 1;
        } else {
            if current.all_home() {
                current.rolls_without_six_when_all_home += 1;
            }
            current.consecutive_sixes = 0;
        }

        if penalty && current.consecutive_sixes >= THREE_SIXES {
            let user_id = current.id.clone();
            let name = current.name.clone();
            self.dice = None;
            self.movable.clear();
            self.pending_advance = true;
            self.message = format!("{name} rolled three sixes, turn forfeited");
            self.turn_log.push(TurnEvent::ThreeSixes { user_id });
            return RollOutcome::ThreeSixes;
        }

        let user_id = current.id.clone();
        let name = current.name.clone();
        let movable = movable_pieces(current, value);
        self.turn_log.push(TurnEvent::Rolled {
            user_id,
            value,
        });
        self.dice = Some(value);

        if movable.is_empty() {
            self.movable.clear();
            self.pending_advance = true;
            self.message = format!("{name} rolled {value}, no moves");
            RollOutcome::NoMove { value }
        } else {
            self.movable = movable;
            self.turn_seconds_left = self.rules.turn_limit_secs;
            self.message = format!("{name} rolled {value}");
            RollOutcome::Rolled { value }
        }
    }

    /// Moves one of the current player's pieces by the rolled value.
    ///
    /// Applies the position function, captures opposing pieces on
    /// non-safe main-path cells, then arbitrates the turn: win
    /// declaration, bonus turn, or seat advance.
    pub fn move_piece(&mut self, by: &UserId, piece_id: u8) -> MoveOutcome {
        if self.status != GameStatus::Playing || self.is_rolling || self.pending_advance {
            return MoveOutcome::Rejected;
        }
        let Some(value) = self.dice else {
            return MoveOutcome::Rejected;
        };
        if !self.movable.contains(&piece_id) {
            return MoveOutcome::Rejected;
        }
        let seat = self.current_seat;
        let Some(current) = self.players.get(seat) else {
            return MoveOutcome::Rejected;
        };
        if &current.id != by {
            return MoveOutcome::Rejected;
        }
        let color = current.color;
        let Some(piece) = current.piece(piece_id) else {
            return MoveOutcome::Rejected;
        };
        let from = piece.position;
        let Some((to, new_state)) = target_of(piece, color, value) else {
            return MoveOutcome::Rejected;
        };

        // Apply the move, then resolve captures at the destination.
        // Between these two writes the board may briefly hold two colors
        // on one cell; nothing observes the game mid-call.
        if let Some(piece) = self.players[seat].piece_mut(piece_id) {
            piece.position = to;
            piece.state = new_state;
        }
        let captures = self.capture_at(seat, to, new_state);
        let finished_piece = new_state == PieceState::Finished;

        let current = &mut self.players[seat];
        current.inactive_turns = 0;
        let user_id = current.id.clone();
        let name = current.name.clone();
        self.dice = None;
        self.movable.clear();
        self.turn_log.push(TurnEvent::Moved {
            user_id: user_id.clone(),
            piece_id,
            from,
            to,
            captures: captures.clone(),
        });

        // Win check before any bonus: finishing the fourth piece ends
        // the game on the spot.
        if finished_piece && self.players[seat].all_finished() {
            self.players[seat].has_finished = true;
            self.finish(Some(user_id));
            return MoveOutcome::Won;
        }

        if value == 6 || !captures.is_empty() || finished_piece {
            self.turn_seconds_left = self.rules.turn_limit_secs;
            self.message = format!("{name} gets another turn");
            MoveOutcome::Moved { bonus: true }
        } else {
            self.advance_seat();
            MoveOutcome::Moved { bonus: false }
        }
    }

    /// The delayed seat advance after a `NoMove` or `ThreeSixes` roll.
    /// Returns `false` if no advance was pending (stale timer).
    pub fn advance_turn(&mut self) -> bool {
        if self.status != GameStatus::Playing || !self.pending_advance {
            return false;
        }
        self.advance_seat();
        true
    }

    /// One second of turn clock. The clock pauses while a roll resolves
    /// or an advance is pending.
    pub fn tick_second(&mut self) -> TickOutcome {
        if self.status != GameStatus::Playing || self.is_rolling || self.pending_advance {
            return TickOutcome::Idle;
        }
        self.turn_seconds_left = self.turn_seconds_left.saturating_sub(1);
        if self.turn_seconds_left == 0 {
            TickOutcome::Expired
        } else {
            TickOutcome::Counted(self.turn_seconds_left)
        }
    }

    /// The turn clock expired: record a strike against the current seat,
    /// forfeiting it entirely at the strike limit.
    pub fn handle_missed_turn(&mut self) -> MissOutcome {
        if self.status != GameStatus::Playing {
            return MissOutcome::Ignored;
        }
        let seat = self.current_seat;
        let Some(current) = self.players.get_mut(seat) else {
            return MissOutcome::Ignored;
        };
        current.inactive_turns += 1;
        let strikes = current.inactive_turns;
        let user_id = current.id.clone();

        if strikes >= self.rules.max_inactive_turns {
            self.turn_log.push(TurnEvent::PlayerForfeited {
                user_id: user_id.clone(),
            });
            self.message = format!(
                "{} forfeited after {strikes} missed turns",
                self.players[seat].name
            );
            self.remove_from_play(seat);
            MissOutcome::Forfeited
        } else {
            self.turn_log.push(TurnEvent::TurnMissed { user_id, strikes });
            self.advance_seat();
            MissOutcome::Strike { strikes }
        }
    }

    /// Removes a player from the game. Idempotent: repeated leaves are
    /// no-ops. During Setup the seat is freed entirely; during Playing
    /// the player is marked removed and attrition may end the game.
    pub fn leave_game(&mut self, user_id: &UserId) -> LeaveOutcome {
        let Some(seat) = self.seat_of(user_id) else {
            return LeaveOutcome::NoOp;
        };
        match self.status {
            GameStatus::Setup => {
                let left = self.players.remove(seat);
                self.message = format!("{} left", left.name);
                // Free seats re-color by join order; reassign the host
                // if the host walked.
                for (index, player) in self.players.iter_mut().enumerate() {
                    player.color = Color::seating(self.max_players)[index];
                    let base = player.color.index() * 4;
                    for (slot, piece) in player.pieces.iter_mut().enumerate() {
                        piece.id = base + slot as u8;
                    }
                }
                if left.is_host {
                    self.host_id = self.players.first().map(|p| p.id.clone());
                    if let Some(first) = self.players.first_mut() {
                        first.is_host = true;
                    }
                }
                LeaveOutcome::Removed
            }
            GameStatus::Playing => {
                if self.players[seat].is_removed {
                    return LeaveOutcome::NoOp;
                }
                self.message = format!("{} left the game", self.players[seat].name);
                self.turn_log.push(TurnEvent::PlayerLeft {
                    user_id: user_id.clone(),
                });
                self.remove_from_play(seat);
                LeaveOutcome::Removed
            }
            GameStatus::Finished => LeaveOutcome::NoOp,
        }
    }

    // -- internal ---------------------------------------------------------

    /// Sends every opposing piece on a non-safe main-path destination
    /// back Home. Returns the captured piece ids.
    fn capture_at(&mut self, seat: usize, to: i16, new_state: PieceState) -> Vec<u8> {
        let mut captures = Vec::new();
        if new_state != PieceState::Active || to >= FINISH_START || is_safe(to) {
            return captures;
        }
        for (index, opponent) in self.players.iter_mut().enumerate() {
            if index == seat {
                continue;
            }
            for piece in opponent.pieces.iter_mut() {
                if piece.state == PieceState::Active && piece.position == to {
                    piece.send_home();
                    captures.push(piece.id);
                }
            }
        }
        captures
    }

    /// Marks a seat removed, then settles the fallout: a lone survivor
    /// wins by attrition, an empty table finishes with no winner, and a
    /// removed current seat passes the turn on.
    fn remove_from_play(&mut self, seat: usize) {
        self.players[seat].is_removed = true;

        let live: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_live())
            .map(|(index, _)| index)
            .collect();
        match live.as_slice() {
            [lone] => {
                let winner = self.players[*lone].id.clone();
                self.finish(Some(winner));
            }
            [] => self.finish(None),
            _ => {
                if seat == self.current_seat {
                    self.advance_seat();
                }
            }
        }
    }

    /// Passes the turn to the next live seat, resetting per-turn state.
    /// With no live seat left the game finishes without a winner.
    pub(crate) fn advance_seat(&mut self) {
        self.dice = None;
        self.movable.clear();
        self.is_rolling = false;
        self.pending_advance = false;

        let seats = self.players.len();
        for step in 1..=seats {
            let seat = (self.current_seat + step) % seats;
            if self.players[seat].is_live() {
                self.current_seat = seat;
                self.players[seat].consecutive_sixes = 0;
                self.turn_seconds_left = self.rules.turn_limit_secs;
                self.message = format!("{}'s turn", self.players[seat].name);
                return;
            }
        }
        self.finish(None);
    }

    /// Transitions to Finished and freezes all per-turn state.
    fn finish(&mut self, winner: Option<UserId>) {
        self.status = GameStatus::Finished;
        self.dice = None;
        self.movable.clear();
        self.is_rolling = false;
        self.pending_advance = false;
        self.turn_seconds_left = 0;
        self.message = match winner
            .as_ref()
            .and_then(|id| self.player(id))
            .map(|p| p.name.clone())
        {
            Some(name) => format!("{name} wins!"),
            None => "Game over".to_string(),
        };
        self.winner = winner.clone();
        self.turn_log.push(TurnEvent::GameFinished { winner });
    }
}

/// Piece ids of `player` that have a legal move for `value`, in slot
/// order.
pub fn movable_pieces(player: &Player, value: u8) -> Vec<u8> {
    player
        .pieces
        .iter()
        .filter(|piece| target_of(piece, player.color, value).is_some())
        .map(|piece| piece.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{FINISH_POSITION, HOME_POSITION};
    use crate::dice::SequenceDice;
    use crate::ids::GameCode;
    use crate::state::{GameKind, Rules};

    // -- Helpers ----------------------------------------------------------

    fn uid(id: &str) -> UserId {
        UserId::from(id)
    }

    fn code() -> GameCode {
        GameCode::parse("TEST1").unwrap()
    }

    /// A fresh 2-player game (Green=p1, Blue=p2) already Playing, p1 to
    /// act.
    fn playing_pair() -> Game {
        let mut game = Game::new(code(), GameKind::Manual, 2, Rules::default());
        assert_eq!(game.add_player(&uid("p1"), "Ann"), JoinOutcome::Seated { seat: 0 });
        assert_eq!(game.add_player(&uid("p2"), "Ben"), JoinOutcome::Seated { seat: 1 });
        assert_eq!(game.start_game(Some(&uid("p1"))), StartOutcome::Started);
        game
    }

    /// Rolls a scripted value for the current player.
    fn roll(game: &mut Game, value: u8) -> RollOutcome {
        let current = game.current_player().unwrap().id.clone();
        assert!(game.initiate_roll(&current), "roll should start");
        game.complete_roll(&mut SequenceDice::new([value]))
    }

    /// Places a piece of `user` directly on the board (test fixture).
    fn place(game: &mut Game, user: &str, piece_id: u8, position: i16) {
        let player = game.player_mut(&uid(user)).unwrap();
        let piece = player.piece_mut(piece_id).unwrap();
        piece.state = if position == FINISH_POSITION {
            PieceState::Finished
        } else {
            PieceState::Active
        };
        piece.position = position;
    }

    /// The quantified invariants of the data model, checked wholesale.
    fn assert_invariants(game: &Game) {
        let mut ids = std::collections::HashSet::new();
        for player in &game.players {
            assert_eq!(player.pieces.len(), 4);
            for piece in &player.pieces {
                assert!(ids.insert(piece.id), "duplicate piece id {}", piece.id);
                match piece.state {
                    PieceState::Home => assert_eq!(piece.position, HOME_POSITION),
                    PieceState::Finished => assert_eq!(piece.position, FINISH_POSITION),
                    PieceState::Active => {
                        assert!(
                            (1..=52).contains(&piece.position)
                                || (100..FINISH_POSITION).contains(&piece.position),
                            "active piece at {}",
                            piece.position
                        );
                    }
                }
            }
        }
        if game.status == GameStatus::Playing {
            let current = game.current_player().expect("current seat must exist");
            assert!(current.is_live(), "current seat must be live");
        }
        if game.dice.is_some() {
            assert!(!game.is_rolling);
            assert_eq!(game.status, GameStatus::Playing);
        }
        if let Some(current) = game.current_player() {
            for id in &game.movable {
                assert!(current.piece(*id).is_some(), "movable id not current player's");
            }
        }
        let (home, active, finished) = game.piece_census();
        assert_eq!(home + active + finished, 4 * game.players.len());
    }

    // =====================================================================
    // Seating and starting
    // =====================================================================

    #[test]
    fn test_add_player_first_joiner_is_host() {
        let mut game = Game::new(code(), GameKind::Manual, 2, Rules::default());
        game.add_player(&uid("p1"), "Ann");
        assert_eq!(game.host_id, Some(uid("p1")));
        assert!(game.players[0].is_host);
    }

    #[test]
    fn test_add_player_two_player_colors() {
        let game = playing_pair();
        assert_eq!(game.players[0].color, Color::Green);
        assert_eq!(game.players[1].color, Color::Blue);
        assert_eq!(game.players[0].pieces[0].id, 4);
        assert_eq!(game.players[1].pieces[0].id, 8);
    }

    #[test]
    fn test_add_player_rejects_duplicate() {
        let mut game = Game::new(code(), GameKind::Manual, 2, Rules::default());
        game.add_player(&uid("p1"), "Ann");
        assert_eq!(game.add_player(&uid("p1"), "Ann"), JoinOutcome::AlreadySeated);
    }

    #[test]
    fn test_add_player_rejects_full_table() {
        let mut game = Game::new(code(), GameKind::Manual, 2, Rules::default());
        game.add_player(&uid("p1"), "Ann");
        game.add_player(&uid("p2"), "Ben");
        assert_eq!(game.add_player(&uid("p3"), "Cat"), JoinOutcome::GameFull);
    }

    #[test]
    fn test_add_player_rejects_after_start() {
        let mut game = playing_pair();
        assert_eq!(game.add_player(&uid("p3"), "Cat"), JoinOutcome::AlreadyStarted);
    }

    #[test]
    fn test_start_game_requires_host() {
        let mut game = Game::new(code(), GameKind::Manual, 2, Rules::default());
        game.add_player(&uid("p1"), "Ann");
        game.add_player(&uid("p2"), "Ben");
        assert_eq!(game.start_game(Some(&uid("p2"))), StartOutcome::NotHost);
        assert_eq!(game.start_game(Some(&uid("p1"))), StartOutcome::Started);
    }

    #[test]
    fn test_start_game_requires_two_players() {
        let mut game = Game::new(code(), GameKind::Manual, 4, Rules::default());
        game.add_player(&uid("p1"), "Ann");
        assert_eq!(game.start_game(Some(&uid("p1"))), StartOutcome::NotEnoughPlayers);
    }

    #[test]
    fn test_start_game_fixes_player_order() {
        let game = playing_pair();
        assert_eq!(game.player_order, vec![Color::Green, Color::Blue]);
        assert_eq!(game.current_seat, 0);
        assert_invariants(&game);
    }

    #[test]
    fn test_system_start_bypasses_host_check() {
        let mut game = Game::new(code(), GameKind::Tournament, 2, Rules::default());
        game.add_player(&uid("p1"), "Ann");
        game.add_player(&uid("p2"), "Ben");
        assert_eq!(game.start_game(None), StartOutcome::Started);
    }

    // =====================================================================
    // Rolling
    // =====================================================================

    #[test]
    fn test_initiate_roll_only_current_player() {
        let mut game = playing_pair();
        assert!(!game.initiate_roll(&uid("p2")));
        assert!(game.initiate_roll(&uid("p1")));
        // A second initiate while one is in flight is refused.
        assert!(!game.initiate_roll(&uid("p1")));
    }

    #[test]
    fn test_complete_roll_without_initiate_is_noop() {
        let mut game = playing_pair();
        let outcome = game.complete_roll(&mut SequenceDice::new([6]));
        assert_eq!(outcome, RollOutcome::NotRolling);
    }

    #[test]
    fn test_roll_six_with_all_home_offers_every_piece() {
        let mut game = playing_pair();
        assert_eq!(roll(&mut game, 6), RollOutcome::Rolled { value: 6 });
        assert_eq!(game.movable, vec![4, 5, 6, 7]);
        assert_invariants(&game);
    }

    #[test]
    fn test_roll_non_six_with_all_home_has_no_move() {
        let mut game = playing_pair();
        assert_eq!(roll(&mut game, 3), RollOutcome::NoMove { value: 3 });
        assert!(game.movable.is_empty());
        assert!(game.pending_advance);
        assert_eq!(game.players[0].rolls_without_six_when_all_home, 1);
        // The clock pauses until the delayed advance lands.
        assert_eq!(game.tick_second(), TickOutcome::Idle);
        assert!(game.advance_turn());
        assert_eq!(game.current_seat, 1);
        assert_invariants(&game);
    }

    #[test]
    fn test_roll_resets_inactivity_strikes() {
        let mut game = playing_pair();
        game.players[0].inactive_turns = 3;
        roll(&mut game, 6);
        assert_eq!(game.players[0].inactive_turns, 0);
    }

    #[test]
    fn test_pity_six_forces_deterministic_six() {
        let mut game = playing_pair();
        game.players[0].rolls_without_six_when_all_home = PITY_ROLL_THRESHOLD;
        // The scripted 1 must be ignored in favor of the forced six.
        assert_eq!(roll(&mut game, 1), RollOutcome::Rolled { value: 6 });
        assert_eq!(game.dice, Some(6));
        assert_eq!(game.players[0].rolls_without_six_when_all_home, 0);
    }

    #[test]
    fn test_pity_six_disabled_by_rules() {
        let mut game = playing_pair();
        game.rules.pity_six = false;
        game.players[0].rolls_without_six_when_all_home = PITY_ROLL_THRESHOLD;
        assert_eq!(roll(&mut game, 1), RollOutcome::NoMove { value: 1 });
    }

    #[test]
    fn test_pity_counter_ignored_once_a_piece_is_out() {
        let mut game = playing_pair();
        place(&mut game, "p1", 4, 10);
        game.players[0].rolls_without_six_when_all_home = PITY_ROLL_THRESHOLD;
        // Not all home any more: the scripted value stands.
        assert_eq!(roll(&mut game, 2), RollOutcome::Rolled { value: 2 });
    }

    // =====================================================================
    // Scenario 1: lone Home piece and the first six
    // =====================================================================

    #[test]
    fn test_scenario_first_six_enters_on_start_with_bonus() {
        let mut game = playing_pair();
        roll(&mut game, 6);
        let outcome = game.move_piece(&uid("p1"), 4);
        assert_eq!(outcome, MoveOutcome::Moved { bonus: true });

        let piece = game.players[0].piece(4).unwrap();
        assert_eq!(piece.position, 1);
        assert_eq!(piece.state, PieceState::Active);
        // Bonus: seat unchanged, dice cleared for the re-roll.
        assert_eq!(game.current_seat, 0);
        assert_eq!(game.dice, None);
        assert_invariants(&game);
    }

    // =====================================================================
    // Scenario 2: captures and the SAFE-cell exemption
    // =====================================================================

    #[test]
    fn test_scenario_landing_on_safe_cell_never_captures() {
        let mut game = playing_pair();
        place(&mut game, "p1", 4, 10);
        place(&mut game, "p2", 8, 14); // 14 is SAFE
        roll(&mut game, 4);
        let outcome = game.move_piece(&uid("p1"), 4);
        // No capture, no six: the turn passes.
        assert_eq!(outcome, MoveOutcome::Moved { bonus: false });
        let victim = game.players[1].piece(8).unwrap();
        assert_eq!(victim.state, PieceState::Active);
        assert_eq!(victim.position, 14);
        assert_eq!(game.current_seat, 1);
        assert_invariants(&game);
    }

    #[test]
    fn test_scenario_capture_on_open_cell_earns_bonus() {
        let mut game = playing_pair();
        place(&mut game, "p1", 4, 10);
        place(&mut game, "p2", 8, 13); // 13 is not SAFE
        roll(&mut game, 3);
        let outcome = game.move_piece(&uid("p1"), 4);
        assert_eq!(outcome, MoveOutcome::Moved { bonus: true });

        let victim = game.players[1].piece(8).unwrap();
        assert_eq!(victim.state, PieceState::Home);
        assert_eq!(victim.position, HOME_POSITION);
        assert_eq!(game.current_seat, 0, "capture keeps the seat");
        assert!(matches!(
            game.turn_log.last(),
            Some(TurnEvent::Moved { captures, .. }) if captures == &vec![8]
        ));
        assert_invariants(&game);
    }

    #[test]
    fn test_capture_takes_every_stacked_opponent() {
        let mut game = playing_pair();
        place(&mut game, "p1", 4, 10);
        place(&mut game, "p2", 8, 13);
        place(&mut game, "p2", 9, 13);
        roll(&mut game, 3);
        game.move_piece(&uid("p1"), 4);
        assert_eq!(game.players[1].piece(8).unwrap().state, PieceState::Home);
        assert_eq!(game.players[1].piece(9).unwrap().state, PieceState::Home);
    }

    #[test]
    fn test_own_pieces_are_never_captured() {
        let mut game = playing_pair();
        place(&mut game, "p1", 4, 10);
        place(&mut game, "p1", 5, 13);
        roll(&mut game, 3);
        game.move_piece(&uid("p1"), 4);
        assert_eq!(game.players[0].piece(5).unwrap().position, 13);
        assert_eq!(game.players[0].piece(5).unwrap().state, PieceState::Active);
    }

    // =====================================================================
    // Scenario 3: three sixes forfeit the turn
    // =====================================================================

    #[test]
    fn test_scenario_three_sixes_forfeits_without_move() {
        let mut game = playing_pair();

        roll(&mut game, 6);
        game.move_piece(&uid("p1"), 4);
        roll(&mut game, 6);
        game.move_piece(&uid("p1"), 5);
        assert_eq!(game.players[0].consecutive_sixes, 2);

        let before = game.players[0].clone();
        assert_eq!(roll(&mut game, 6), RollOutcome::ThreeSixes);
        // No move applied: pieces exactly as before the third roll.
        assert_eq!(game.players[0].pieces, before.pieces);
        assert_eq!(game.dice, None);
        assert!(game.movable.is_empty());
        assert!(game.pending_advance);

        assert!(game.advance_turn());
        assert_eq!(game.current_seat, 1);
        assert_eq!(game.players[1].consecutive_sixes, 0);
        assert_invariants(&game);
    }

    #[test]
    fn test_consecutive_sixes_reset_by_lower_roll() {
        let mut game = playing_pair();
        roll(&mut game, 6);
        game.move_piece(&uid("p1"), 4);
        assert_eq!(game.players[0].consecutive_sixes, 1);
        // A 2 moves the piece on the board and resets the streak.
        roll(&mut game, 2);
        game.move_piece(&uid("p1"), 4);
        assert_eq!(game.players[0].consecutive_sixes, 0);
    }

    #[test]
    fn test_three_sixes_penalty_disabled_by_rules() {
        let mut game = playing_pair();
        game.rules.three_sixes_penalty = false;
        roll(&mut game, 6);
        game.move_piece(&uid("p1"), 4);
        roll(&mut game, 6);
        game.move_piece(&uid("p1"), 4);
        assert_eq!(roll(&mut game, 6), RollOutcome::Rolled { value: 6 });
    }

    // =====================================================================
    // Scenario 4: inactivity forfeiture
    // =====================================================================

    #[test]
    fn test_missed_turn_records_strike_and_advances() {
        let mut game = playing_pair();
        assert_eq!(game.handle_missed_turn(), MissOutcome::Strike { strikes: 1 });
        assert_eq!(game.current_seat, 1);
        assert_invariants(&game);
    }

    #[test]
    fn test_scenario_five_strikes_forfeit_and_award_by_attrition() {
        let mut game = playing_pair();
        // Both seats keep missing; p1 reaches the limit first.
        for _ in 0..8 {
            assert!(matches!(game.handle_missed_turn(), MissOutcome::Strike { .. }));
        }
        assert_eq!(game.players[0].inactive_turns, 4);
        assert_eq!(game.players[1].inactive_turns, 4);

        assert_eq!(game.handle_missed_turn(), MissOutcome::Forfeited);
        assert!(game.players[0].is_removed);
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.winner, Some(uid("p2")));
        assert_invariants(&game);
    }

    #[test]
    fn test_forfeit_in_four_player_game_keeps_playing() {
        let mut game = Game::new(code(), GameKind::Manual, 4, Rules::default());
        game.add_player(&uid("p1"), "Ann");
        game.add_player(&uid("p2"), "Ben");
        game.add_player(&uid("p3"), "Cat");
        game.start_game(Some(&uid("p1")));

        game.players[0].inactive_turns = 4;
        assert_eq!(game.handle_missed_turn(), MissOutcome::Forfeited);
        assert!(game.players[0].is_removed);
        assert_eq!(game.status, GameStatus::Playing);
        assert_eq!(game.current_seat, 1);
        assert_invariants(&game);
    }

    #[test]
    fn test_tick_second_drives_clock_to_expiry() {
        let mut game = playing_pair();
        game.turn_seconds_left = 2;
        assert_eq!(game.tick_second(), TickOutcome::Counted(1));
        assert_eq!(game.tick_second(), TickOutcome::Expired);
    }

    #[test]
    fn test_tick_second_pauses_while_rolling() {
        let mut game = playing_pair();
        game.initiate_roll(&uid("p1"));
        assert_eq!(game.tick_second(), TickOutcome::Idle);
    }

    // =====================================================================
    // Scenario 5: leave declares the survivor winner
    // =====================================================================

    #[test]
    fn test_scenario_leave_awards_survivor() {
        let mut game = playing_pair();
        assert_eq!(game.leave_game(&uid("p2")), LeaveOutcome::Removed);
        assert!(game.players[1].is_removed);
        assert_eq!(game.winner, Some(uid("p1")));
        assert_eq!(game.status, GameStatus::Finished);
        assert_invariants(&game);
    }

    #[test]
    fn test_leave_is_idempotent() {
        let mut game = Game::new(code(), GameKind::Manual, 4, Rules::default());
        game.add_player(&uid("p1"), "Ann");
        game.add_player(&uid("p2"), "Ben");
        game.add_player(&uid("p3"), "Cat");
        game.start_game(Some(&uid("p1")));

        let first = game.leave_game(&uid("p2"));
        let state_after_first = serde_json::to_vec(&game).unwrap();
        let second = game.leave_game(&uid("p2"));
        let state_after_second = serde_json::to_vec(&game).unwrap();

        assert_eq!(first, LeaveOutcome::Removed);
        assert_eq!(second, LeaveOutcome::NoOp);
        assert_eq!(state_after_first, state_after_second);
    }

    #[test]
    fn test_leave_of_current_seat_passes_turn() {
        let mut game = Game::new(code(), GameKind::Manual, 4, Rules::default());
        game.add_player(&uid("p1"), "Ann");
        game.add_player(&uid("p2"), "Ben");
        game.add_player(&uid("p3"), "Cat");
        game.start_game(Some(&uid("p1")));

        game.leave_game(&uid("p1"));
        assert_eq!(game.status, GameStatus::Playing);
        assert_eq!(game.current_seat, 1);
        assert_invariants(&game);
    }

    #[test]
    fn test_leave_during_setup_frees_seat_and_reassigns_host() {
        let mut game = Game::new(code(), GameKind::Manual, 4, Rules::default());
        game.add_player(&uid("p1"), "Ann");
        game.add_player(&uid("p2"), "Ben");
        game.leave_game(&uid("p1"));

        assert_eq!(game.players.len(), 1);
        assert_eq!(game.host_id, Some(uid("p2")));
        assert!(game.players[0].is_host);
        // The remaining player re-colors to the first seat.
        assert_eq!(game.players[0].color, Color::Red);
        assert_eq!(game.players[0].pieces[0].id, 0);
    }

    // =====================================================================
    // Scenario 6: finishing the fourth piece wins immediately
    // =====================================================================

    #[test]
    fn test_scenario_last_piece_finishing_declares_winner() {
        let mut game = playing_pair();
        place(&mut game, "p1", 4, FINISH_POSITION);
        place(&mut game, "p1", 5, FINISH_POSITION);
        place(&mut game, "p1", 6, FINISH_POSITION);
        place(&mut game, "p1", 7, 104);

        roll(&mut game, 1);
        assert_eq!(game.move_piece(&uid("p1"), 7), MoveOutcome::Won);

        let piece = game.players[0].piece(7).unwrap();
        assert_eq!(piece.position, FINISH_POSITION);
        assert_eq!(piece.state, PieceState::Finished);
        assert!(game.players[0].has_finished);
        assert_eq!(game.winner, Some(uid("p1")));
        assert_eq!(game.status, GameStatus::Finished);
        assert_invariants(&game);
    }

    #[test]
    fn test_finishing_a_piece_earns_bonus_when_game_continues() {
        let mut game = playing_pair();
        place(&mut game, "p1", 4, 104);
        roll(&mut game, 1);
        assert_eq!(game.move_piece(&uid("p1"), 4), MoveOutcome::Moved { bonus: true });
        assert_eq!(game.current_seat, 0);
        assert_invariants(&game);
    }

    // =====================================================================
    // Move rejection
    // =====================================================================

    #[test]
    fn test_move_rejected_for_non_current_player() {
        let mut game = playing_pair();
        roll(&mut game, 6);
        assert_eq!(game.move_piece(&uid("p2"), 8), MoveOutcome::Rejected);
    }

    #[test]
    fn test_move_rejected_for_piece_outside_movable_set() {
        let mut game = playing_pair();
        place(&mut game, "p1", 4, 10);
        roll(&mut game, 3);
        // Only piece 4 can use a 3; the home pieces cannot.
        assert_eq!(game.movable, vec![4]);
        assert_eq!(game.move_piece(&uid("p1"), 5), MoveOutcome::Rejected);
    }

    #[test]
    fn test_move_rejected_without_dice() {
        let mut game = playing_pair();
        assert_eq!(game.move_piece(&uid("p1"), 4), MoveOutcome::Rejected);
    }

    #[test]
    fn test_move_consumes_dice_exactly_as_position_function_predicts() {
        let mut game = playing_pair();
        place(&mut game, "p1", 4, 20);
        roll(&mut game, 5);
        let predicted = target_of(game.players[0].piece(4).unwrap(), Color::Green, 5).unwrap();
        game.move_piece(&uid("p1"), 4);
        let piece = game.players[0].piece(4).unwrap();
        assert_eq!((piece.position, piece.state), predicted);
    }
}
