//! Board geometry: the shared 52-cell loop, per-color landmarks, and the
//! position function that decides where a piece lands for a given dice
//! value.
//!
//! Position encoding (kept identical in snapshots):
//!
//! ```text
//!   -1          piece is at Home, off the board
//!   1..=52      main-path cell
//!   100..=105   home-stretch cell; 105 is the finish
//! ```
//!
//! A piece circles the main path from its color's START cell, passes its
//! PRE_HOME cell, and diverts into its private six-cell stretch on the
//! next forward step. Captures only happen on main-path cells that are
//! not SAFE.

use serde::{Deserialize, Serialize};

use crate::state::{Piece, PieceState};

/// Number of cells in the shared main-path loop.
pub const TOTAL_PATH_LENGTH: i16 = 52;

/// Number of cells in each color's private home stretch.
pub const HOME_STRETCH_LENGTH: i16 = 6;

/// First home-stretch position; stretch cells are `100..=105`.
pub const FINISH_START: i16 = 100;

/// The terminal position of a finished piece.
pub const FINISH_POSITION: i16 = FINISH_START + HOME_STRETCH_LENGTH - 1;

/// Position of a piece that is at Home.
pub const HOME_POSITION: i16 = -1;

/// Main-path cells on which captures are prohibited and stacking is
/// allowed.
pub const SAFE_CELLS: [i16; 8] = [1, 9, 14, 22, 27, 35, 40, 48];

/// Returns `true` if `cell` is a SAFE main-path cell.
pub fn is_safe(cell: i16) -> bool {
    SAFE_CELLS.contains(&cell)
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// The four seat colors. The enum order fixes the color index used in
/// piece ids (`color index * 4 + slot`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
}

impl Color {
    /// Fixed index of this color: Red=0, Green=1, Blue=2, Yellow=3.
    pub fn index(self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
            Self::Yellow => 3,
        }
    }

    /// The main-path cell a piece enters on when leaving Home.
    pub fn start(self) -> i16 {
        match self {
            Self::Green => 1,
            Self::Red => 14,
            Self::Blue => 27,
            Self::Yellow => 40,
        }
    }

    /// The cell a piece must pass (or sit on) before diverting into its
    /// home stretch on the next forward step.
    pub fn pre_home(self) -> i16 {
        match self {
            Self::Green => 51,
            Self::Red => 12,
            Self::Blue => 25,
            Self::Yellow => 38,
        }
    }

    /// Seat-to-color assignment by join order. Two-player games sit on
    /// opposite corners.
    pub fn seating(max_players: u8) -> &'static [Color] {
        if max_players == 2 {
            &[Color::Green, Color::Blue]
        } else {
            &[Color::Red, Color::Green, Color::Blue, Color::Yellow]
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Green => write!(f, "green"),
            Self::Blue => write!(f, "blue"),
            Self::Yellow => write!(f, "yellow"),
        }
    }
}

// ---------------------------------------------------------------------------
// Position function
// ---------------------------------------------------------------------------

/// Computes where `piece` of `color` would land with dice value `dice`.
///
/// Returns `None` when the piece has no legal move for that value:
/// a Home piece without a six, an overshoot past the finish cell, or a
/// piece that has already finished.
pub fn target_of(piece: &Piece, color: Color, dice: u8) -> Option<(i16, PieceState)> {
    if !(1..=6).contains(&dice) {
        return None;
    }
    let steps = i16::from(dice);

    match piece.state {
        PieceState::Finished => None,

        PieceState::Home => {
            (dice == 6).then(|| (color.start(), PieceState::Active))
        }

        // Main path: divert into the stretch once PRE_HOME is passed.
        PieceState::Active if piece.position < FINISH_START => {
            let to_pre_home = (color.pre_home() - piece.position
                + TOTAL_PATH_LENGTH)
                .rem_euclid(TOTAL_PATH_LENGTH);
            if steps > to_pre_home {
                let stretch_index = steps - to_pre_home - 1;
                if stretch_index == HOME_STRETCH_LENGTH - 1 {
                    Some((FINISH_POSITION, PieceState::Finished))
                } else if stretch_index < HOME_STRETCH_LENGTH - 1 {
                    Some((FINISH_START + stretch_index, PieceState::Active))
                } else {
                    None
                }
            } else {
                let landed = (piece.position - 1 + steps)
                    .rem_euclid(TOTAL_PATH_LENGTH)
                    + 1;
                Some((landed, PieceState::Active))
            }
        }

        // Home stretch: exact landing on the finish cell, no overshoot.
        PieceState::Active => {
            let landed = piece.position + steps;
            if landed == FINISH_POSITION {
                Some((landed, PieceState::Finished))
            } else if landed < FINISH_POSITION {
                Some((landed, PieceState::Active))
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home_piece() -> Piece {
        Piece {
            id: 4,
            state: PieceState::Home,
            position: HOME_POSITION,
        }
    }

    fn active_at(position: i16) -> Piece {
        Piece {
            id: 4,
            state: PieceState::Active,
            position,
        }
    }

    // =====================================================================
    // Leaving Home
    // =====================================================================

    #[test]
    fn test_home_piece_moves_only_on_six() {
        for dice in 1..=5 {
            assert_eq!(target_of(&home_piece(), Color::Green, dice), None);
        }
        assert_eq!(
            target_of(&home_piece(), Color::Green, 6),
            Some((1, PieceState::Active))
        );
    }

    #[test]
    fn test_home_piece_enters_on_color_start() {
        assert_eq!(target_of(&home_piece(), Color::Red, 6).unwrap().0, 14);
        assert_eq!(target_of(&home_piece(), Color::Blue, 6).unwrap().0, 27);
        assert_eq!(target_of(&home_piece(), Color::Yellow, 6).unwrap().0, 40);
    }

    // =====================================================================
    // Main path
    // =====================================================================

    #[test]
    fn test_main_path_simple_advance() {
        assert_eq!(
            target_of(&active_at(10), Color::Green, 4),
            Some((14, PieceState::Active))
        );
    }

    #[test]
    fn test_main_path_wraps_past_52() {
        // Yellow's pre-home is 38, so 50 → 2 stays on the main path.
        assert_eq!(
            target_of(&active_at(50), Color::Yellow, 4),
            Some((2, PieceState::Active))
        );
    }

    #[test]
    fn test_pre_home_cell_enters_stretch_with_any_value() {
        // Spec boundary: a piece sitting on PRE_HOME must divert.
        for color in [Color::Red, Color::Green, Color::Blue, Color::Yellow] {
            let piece = active_at(color.pre_home());
            for dice in 1..=5u8 {
                let (pos, state) = target_of(&piece, color, dice).unwrap();
                assert_eq!(pos, FINISH_START + i16::from(dice) - 1);
                assert_eq!(state, PieceState::Active);
            }
            assert_eq!(
                target_of(&piece, color, 6),
                Some((FINISH_POSITION, PieceState::Finished))
            );
        }
    }

    #[test]
    fn test_stretch_entry_counts_steps_past_pre_home() {
        // Green one cell before PRE_HOME (50): a 3 spends one step to
        // reach 51 and two more into the stretch, landing on index 1.
        assert_eq!(
            target_of(&active_at(50), Color::Green, 3),
            Some((101, PieceState::Active))
        );
    }

    #[test]
    fn test_cell_past_pre_home_needs_a_full_lap() {
        // Green at 52 already passed its divert point at 51, so the
        // distance back to PRE_HOME is a near-full lap and the piece
        // stays on the main path.
        assert_eq!(
            target_of(&active_at(52), Color::Green, 3),
            Some((3, PieceState::Active))
        );
    }

    // =====================================================================
    // Home stretch
    // =====================================================================

    #[test]
    fn test_stretch_advances_within_lane() {
        assert_eq!(
            target_of(&active_at(100), Color::Blue, 3),
            Some((103, PieceState::Active))
        );
    }

    #[test]
    fn test_stretch_exact_finish() {
        assert_eq!(
            target_of(&active_at(104), Color::Blue, 1),
            Some((FINISH_POSITION, PieceState::Finished))
        );
        assert_eq!(
            target_of(&active_at(100), Color::Blue, 5),
            Some((FINISH_POSITION, PieceState::Finished))
        );
    }

    #[test]
    fn test_stretch_overshoot_is_illegal() {
        assert_eq!(target_of(&active_at(104), Color::Blue, 2), None);
        assert_eq!(target_of(&active_at(101), Color::Blue, 6), None);
    }

    #[test]
    fn test_finished_piece_never_moves() {
        let piece = Piece {
            id: 0,
            state: PieceState::Finished,
            position: FINISH_POSITION,
        };
        for dice in 1..=6 {
            assert_eq!(target_of(&piece, Color::Red, dice), None);
        }
    }

    // =====================================================================
    // Geometry constants
    // =====================================================================

    #[test]
    fn test_start_cells_are_safe() {
        for color in [Color::Red, Color::Green, Color::Blue, Color::Yellow] {
            assert!(is_safe(color.start()), "{color} start must be safe");
        }
    }

    #[test]
    fn test_pre_home_is_two_cells_before_start() {
        // Each PRE_HOME sits 2 cells before the color's own start.
        for color in [Color::Red, Color::Green, Color::Blue, Color::Yellow] {
            let gap = (color.start() - color.pre_home()).rem_euclid(52);
            assert_eq!(gap, 2, "{color}");
        }
    }

    #[test]
    fn test_two_player_seating_is_green_blue() {
        assert_eq!(Color::seating(2), &[Color::Green, Color::Blue]);
    }

    #[test]
    fn test_four_player_seating_order() {
        assert_eq!(
            Color::seating(4),
            &[Color::Red, Color::Green, Color::Blue, Color::Yellow]
        );
    }
}
