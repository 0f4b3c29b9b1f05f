//! Four-in-a-row on a 6×7 grid.
//!
//! Commands:
//! - `MOVE:<col>` — drop the caller's mark into column 0–6
//! - `RESET` — clear the board; either player may do this at any time

use serde::{Deserialize, Serialize};

use crate::{Color, GameEvent, Reply};

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

/// Marks in a row needed to win.
const CONNECT: usize = 4;

/// Row 0 is the top of the board; marks fall toward row `ROWS - 1`.
type Board = [[Option<Color>; COLS]; ROWS];

/// Broadcast payload for `ReceiveMove` and `GameReset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectFourSnapshot {
    pub board: Board,
    pub current_turn: Color,
    pub winner: Option<Color>,
}

enum Command {
    Move(usize),
    Reset,
}

impl Command {
    fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("RESET") {
            return Some(Self::Reset);
        }
        let (verb, arg) = input.split_once(':')?;
        if !verb.trim().eq_ignore_ascii_case("MOVE") {
            return None;
        }
        arg.trim().parse().ok().map(Self::Move)
    }
}

#[derive(Debug, Clone)]
pub struct ConnectFour {
    board: Board,
    turn: Color,
    winner: Option<Color>,
}

impl ConnectFour {
    pub fn new() -> Self {
        Self {
            board: [[None; COLS]; ROWS],
            turn: Color::Red,
            winner: None,
        }
    }

    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    pub fn current_turn(&self) -> Color {
        self.turn
    }

    pub fn snapshot(&self) -> ConnectFourSnapshot {
        ConnectFourSnapshot {
            board: self.board,
            current_turn: self.turn,
            winner: self.winner,
        }
    }

    pub(crate) fn apply(&mut self, color: Color, input: &str) -> Reply {
        match Command::parse(input) {
            Some(Command::Move(col)) => {
                if self.play(color, col) {
                    Reply::Broadcast(GameEvent::ReceiveMove(self.snapshot()))
                } else {
                    Reply::Ignored
                }
            }
            Some(Command::Reset) => {
                *self = Self::new();
                Reply::Broadcast(GameEvent::GameReset(self.snapshot()))
            }
            None => Reply::Ignored,
        }
    }

    /// Drops `color`'s mark into `col`. Returns `false` (and changes
    /// nothing) if the move is not legal right now.
    fn play(&mut self, color: Color, col: usize) -> bool {
        if self.winner.is_some() || color != self.turn || col >= COLS {
            return false;
        }
        let Some(row) = (0..ROWS).rev().find(|&r| self.board[r][col].is_none())
        else {
            return false;
        };

        self.board[row][col] = Some(color);
        if self.completes_line(row, col, color) {
            self.winner = Some(color);
            tracing::debug!(%color, "four in a row");
        } else {
            self.turn = color.other();
        }
        true
    }

    /// Checks the four axes through the freshly placed mark.
    fn completes_line(&self, row: usize, col: usize, color: Color) -> bool {
        const AXES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];
        AXES.iter().any(|&(dr, dc)| {
            1 + self.run_length(row, col, dr, dc, color)
                + self.run_length(row, col, -dr, -dc, color)
                >= CONNECT
        })
    }

    /// Counts contiguous `color` marks stepping away from (row, col),
    /// not counting the starting cell.
    fn run_length(
        &self,
        row: usize,
        col: usize,
        dr: isize,
        dc: isize,
        color: Color,
    ) -> usize {
        let mut count = 0;
        let (mut r, mut c) = (row as isize + dr, col as isize + dc);
        while (0..ROWS as isize).contains(&r)
            && (0..COLS as isize).contains(&c)
            && self.board[r as usize][c as usize] == Some(color)
        {
            count += 1;
            r += dr;
            c += dc;
        }
        count
    }
}

impl Default for ConnectFour {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn play_all(game: &mut ConnectFour, moves: &[usize]) {
        for &col in moves {
            let color = game.current_turn();
            let reply = game.apply(color, &format!("MOVE:{col}"));
            assert!(!reply.is_ignored(), "move {col} should be legal");
        }
    }

    /// Brute-force scan of the whole board for any line of four.
    fn has_four(board: &Board) -> Option<Color> {
        for r in 0..ROWS {
            for c in 0..COLS {
                let Some(color) = board[r][c] else { continue };
                for (dr, dc) in [(0isize, 1isize), (1, 0), (1, 1), (1, -1)] {
                    let line = (0..4).all(|k| {
                        let rr = r as isize + dr * k;
                        let cc = c as isize + dc * k;
                        (0..ROWS as isize).contains(&rr)
                            && (0..COLS as isize).contains(&cc)
                            && board[rr as usize][cc as usize] == Some(color)
                    });
                    if line {
                        return Some(color);
                    }
                }
            }
        }
        None
    }

    #[test]
    fn test_move_drops_to_lowest_empty_row() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[3, 3]);
        let snap = game.snapshot();
        assert_eq!(snap.board[ROWS - 1][3], Some(Color::Red));
        assert_eq!(snap.board[ROWS - 2][3], Some(Color::Yellow));
        assert_eq!(snap.current_turn, Color::Red);
    }

    #[test]
    fn test_vertical_win() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[0, 1, 0, 1, 0, 1, 0]);
        assert_eq!(game.winner(), Some(Color::Red));
    }

    #[test]
    fn test_horizontal_win_when_gap_is_filled_last() {
        // Red holds 0, 1 and 3; dropping into 2 joins both sides.
        let mut game = ConnectFour::new();
        play_all(&mut game, &[0, 0, 1, 1, 3, 3, 2]);
        assert_eq!(game.winner(), Some(Color::Red));
    }

    #[test]
    fn test_rising_diagonal_win() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[0, 1, 1, 2, 2, 3, 2, 3, 3, 6, 3]);
        assert_eq!(game.winner(), Some(Color::Red));
    }

    #[test]
    fn test_falling_diagonal_win() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[6, 5, 5, 4, 4, 3, 4, 3, 3, 0, 3]);
        assert_eq!(game.winner(), Some(Color::Red));
    }

    #[test]
    fn test_three_in_a_row_is_not_a_win() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[0, 0, 1, 1, 2]);
        assert_eq!(game.winner(), None);
    }

    #[test]
    fn test_wrong_color_is_ignored() {
        let mut game = ConnectFour::new();
        let before = game.snapshot();
        assert!(game.apply(Color::Yellow, "MOVE:2").is_ignored());
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_out_of_range_and_malformed_are_ignored() {
        let mut game = ConnectFour::new();
        let before = game.snapshot();
        for cmd in ["MOVE:7", "MOVE:-1", "MOVE:", "MOVE:x", "JUMP:1", ""] {
            assert!(game.apply(Color::Red, cmd).is_ignored(), "{cmd:?}");
        }
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_full_column_is_ignored() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[4, 4, 4, 4, 4, 4]);
        let before = game.snapshot();
        assert!(game.apply(Color::Red, "MOVE:4").is_ignored());
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_move_after_win_is_ignored() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[0, 1, 0, 1, 0, 1, 0]);
        let before = game.snapshot();
        assert!(game.apply(Color::Yellow, "MOVE:1").is_ignored());
        assert!(game.apply(Color::Red, "MOVE:5").is_ignored());
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_reset_clears_even_after_win() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[0, 1, 0, 1, 0, 1, 0]);
        let reply = game.apply(Color::Yellow, "reset");
        let Reply::Broadcast(GameEvent::GameReset(snap)) = reply else {
            panic!("expected GameReset broadcast, got {reply:?}");
        };
        assert_eq!(snap.winner, None);
        assert_eq!(snap.current_turn, Color::Red);
        assert!(snap.board.iter().flatten().all(Option::is_none));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut game = ConnectFour::new();
        game.apply(Color::Red, "MOVE:0");
        let json = serde_json::to_value(game.snapshot()).unwrap();
        assert_eq!(json["currentTurn"], "yellow");
        assert!(json["winner"].is_null());
        assert_eq!(json["board"][5][0], "red");
        assert_eq!(json["board"].as_array().unwrap().len(), ROWS);
    }

    #[test]
    fn test_winner_set_iff_four_connected_random_games() {
        let mut rng = StdRng::seed_from_u64(0xC4);
        for _ in 0..300 {
            let mut game = ConnectFour::new();
            for _ in 0..ROWS * COLS {
                if game.winner().is_some() {
                    break;
                }
                let col = rng.random_range(0..COLS);
                let color = game.current_turn();
                game.apply(color, &format!("MOVE:{col}"));
                let snap = game.snapshot();
                assert_eq!(snap.winner, has_four(&snap.board));
            }
        }
    }
}
