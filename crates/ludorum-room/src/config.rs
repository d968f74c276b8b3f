//! Room timing and rule configuration.

use std::time::Duration;

use ludorum_engine::Rules;

/// Everything tunable about a room: the rule parameters handed to the
/// engine, and the timing the turn controller runs on.
///
/// Tests shrink the durations to drive hours of game clock in
/// milliseconds; production keeps the defaults.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Rule parameters (turn limit, strike limit, pity six, penalty).
    pub rules: Rules,

    /// How long a disconnected player keeps their seat before the
    /// server leaves on their behalf.
    pub reconnect_grace: Duration,

    /// Eviction delay after the game finishes.
    pub finished_evict_delay: Duration,

    /// Eviction delay after the last peer detaches pre-finish.
    /// Cancelled if anyone re-attaches inside the window.
    pub idle_evict_delay: Duration,

    /// Pause between a roll starting and the dice value resolving, so
    /// clients can animate.
    pub roll_resolve_delay: Duration,

    /// Pause before the seat advances after a no-move roll or a
    /// three-sixes forfeit, so clients can render the outcome.
    pub no_move_advance_delay: Duration,

    /// Delay before a full tournament room auto-starts.
    pub auto_start_delay: Duration,

    /// Cadence of the turn clock. One second of game time per tick.
    pub turn_tick: Duration,

    /// While only the clock is ticking, broadcast every Nth tick to
    /// avoid traffic amplification.
    pub broadcast_every_ticks: u32,

    /// Bound on the actor's command inbox.
    pub inbox_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            rules: Rules::default(),
            reconnect_grace: Duration::from_secs(30),
            finished_evict_delay: Duration::from_secs(5),
            idle_evict_delay: Duration::from_secs(60),
            roll_resolve_delay: Duration::from_millis(500),
            no_move_advance_delay: Duration::from_millis(1500),
            auto_start_delay: Duration::from_millis(1500),
            turn_tick: Duration::from_secs(1),
            broadcast_every_ticks: 5,
            inbox_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_turn_contract() {
        let config = RoomConfig::default();
        assert_eq!(config.rules.turn_limit_secs, 30);
        assert_eq!(config.rules.max_inactive_turns, 5);
        assert_eq!(config.reconnect_grace, Duration::from_secs(30));
        assert_eq!(config.finished_evict_delay, Duration::from_secs(5));
        assert_eq!(config.idle_evict_delay, Duration::from_secs(60));
        assert_eq!(config.broadcast_every_ticks, 5);
    }
}
