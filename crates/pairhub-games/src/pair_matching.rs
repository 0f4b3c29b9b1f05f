//! Pair matching ("memory") on a 3×6 grid of nine value pairs.
//!
//! Commands:
//! - `flip <col> <row>` — turn a face-down card face-up
//! - `reset` — vote for a fresh board; takes effect once both colors voted
//! - `getBoard` — snapshot for the caller only
//!
//! A non-matching pair stays face-up after it resolves and is only
//! turned back down at the start of the next `flip`.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::{ByColor, Color, GameEvent, Reply};

pub const ROWS: usize = 3;
pub const COLS: usize = 6;

/// Pairs a color must collect to win.
pub const WINNING_SCORE: u8 = 5;

/// A grid of card values, indexed `[row][col]`.
pub type Layout = [[u8; COLS]; ROWS];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardState {
    Down,
    Up,
    Matched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub value: u8,
    pub state: CardState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub col: usize,
    pub row: usize,
}

/// Payload for `ReceiveBoard` and `ResetGame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairMatchingSnapshot {
    pub cards: [[Card; COLS]; ROWS],
    pub flipped: Vec<Position>,
    pub scores: ByColor<u8>,
    pub current_turn: Color,
    pub winner: Option<Color>,
    pub reset_votes: ByColor<bool>,
}

enum Command {
    Flip(Position),
    Reset,
    GetBoard,
}

impl Command {
    fn parse(input: &str) -> Option<Self> {
        let mut parts = input.split_whitespace();
        let verb = parts.next()?;
        let command = if verb.eq_ignore_ascii_case("flip") {
            let col = parts.next()?.parse().ok()?;
            let row = parts.next()?.parse().ok()?;
            Self::Flip(Position { col, row })
        } else if verb.eq_ignore_ascii_case("reset") {
            Self::Reset
        } else if verb.eq_ignore_ascii_case("getBoard") {
            Self::GetBoard
        } else {
            return None;
        };
        // Trailing junk makes the whole command invalid.
        parts.next().is_none().then_some(command)
    }
}

#[derive(Debug, Clone)]
pub struct PairMatching {
    cards: [[Card; COLS]; ROWS],
    turn: Color,
    scores: ByColor<u8>,
    flipped: Vec<Position>,
    reset_votes: ByColor<bool>,
    winner: Option<Color>,
}

impl PairMatching {
    /// Deals a freshly shuffled board.
    pub fn new() -> Self {
        Self::with_layout(shuffled_layout(&mut rand::rng()))
    }

    /// Deals a fixed layout; used for replays and tests.
    pub fn with_layout(layout: Layout) -> Self {
        Self {
            cards: layout.map(|row| {
                row.map(|value| Card {
                    value,
                    state: CardState::Down,
                })
            }),
            turn: Color::Red,
            scores: ByColor::default(),
            flipped: Vec::with_capacity(2),
            reset_votes: ByColor::default(),
            winner: None,
        }
    }

    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    pub fn current_turn(&self) -> Color {
        self.turn
    }

    pub fn snapshot(&self) -> PairMatchingSnapshot {
        PairMatchingSnapshot {
            cards: self.cards,
            flipped: self.flipped.clone(),
            scores: self.scores,
            current_turn: self.turn,
            winner: self.winner,
            reset_votes: self.reset_votes,
        }
    }

    pub(crate) fn apply(&mut self, color: Color, input: &str) -> Reply {
        match Command::parse(input) {
            Some(Command::Flip(pos)) => {
                if self.flip(color, pos) {
                    Reply::Broadcast(GameEvent::ReceiveBoard(self.snapshot()))
                } else {
                    Reply::Ignored
                }
            }
            Some(Command::Reset) => self.vote_reset(color),
            Some(Command::GetBoard) => {
                Reply::Caller(GameEvent::ReceiveBoard(self.snapshot()))
            }
            None => Reply::Ignored,
        }
    }

    pub(crate) fn observe(&self, input: &str) -> Reply {
        match Command::parse(input) {
            Some(Command::GetBoard) => {
                Reply::Caller(GameEvent::ReceiveBoard(self.snapshot()))
            }
            _ => Reply::Ignored,
        }
    }

    /// Returns `true` if anything on the board changed.
    fn flip(&mut self, color: Color, pos: Position) -> bool {
        if self.winner.is_some()
            || color != self.turn
            || pos.col >= COLS
            || pos.row >= ROWS
        {
            return false;
        }

        let mut changed = false;
        if self.flipped.len() == 2 {
            for p in self.flipped.drain(..) {
                self.cards[p.row][p.col].state = CardState::Down;
            }
            changed = true;
        }

        let card = &mut self.cards[pos.row][pos.col];
        if card.state != CardState::Down {
            return changed;
        }
        card.state = CardState::Up;
        self.flipped.push(pos);

        if let &[a, b] = self.flipped.as_slice() {
            self.resolve_pair(color, a, b);
        }
        true
    }

    fn resolve_pair(&mut self, color: Color, a: Position, b: Position) {
        if self.cards[a.row][a.col].value == self.cards[b.row][b.col].value {
            self.cards[a.row][a.col].state = CardState::Matched;
            self.cards[b.row][b.col].state = CardState::Matched;
            self.flipped.clear();
            self.scores[color] += 1;
            if self.scores[color] >= WINNING_SCORE {
                self.winner = Some(color);
                tracing::debug!(%color, "pair matching won");
            }
        }
        self.turn = color.other();
    }

    fn vote_reset(&mut self, color: Color) -> Reply {
        if self.reset_votes[color] {
            return Reply::Ignored;
        }
        self.reset_votes[color] = true;
        if !self.reset_votes.both() {
            return Reply::Ignored;
        }
        *self = Self::new();
        Reply::Broadcast(GameEvent::ResetGame(self.snapshot()))
    }
}

impl Default for PairMatching {
    fn default() -> Self {
        Self::new()
    }
}

/// Values 1–9, each twice, in random order.
pub fn shuffled_layout<R: Rng + ?Sized>(rng: &mut R) -> Layout {
    let mut values: Vec<u8> = (1..=9).flat_map(|v| [v, v]).collect();
    values.shuffle(rng);
    let mut layout = [[0; COLS]; ROWS];
    for (i, value) in values.into_iter().enumerate() {
        layout[i / COLS][i % COLS] = value;
    }
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    /// Row 0: 1 1 2 2 3 3 / row 1: 4 4 5 5 6 6 / row 2: 7 7 8 8 9 9
    fn ordered() -> PairMatching {
        PairMatching::with_layout([
            [1, 1, 2, 2, 3, 3],
            [4, 4, 5, 5, 6, 6],
            [7, 7, 8, 8, 9, 9],
        ])
    }

    fn flip(game: &mut PairMatching, color: Color, col: usize, row: usize) -> Reply {
        game.apply(color, &format!("flip {col} {row}"))
    }

    fn state(game: &PairMatching, col: usize, row: usize) -> CardState {
        game.snapshot().cards[row][col].state
    }

    #[test]
    fn test_shuffled_layout_has_every_pair() {
        let layout = shuffled_layout(&mut StdRng::seed_from_u64(7));
        let mut counts = [0u8; 10];
        for v in layout.iter().flatten() {
            counts[*v as usize] += 1;
        }
        assert_eq!(counts[0], 0);
        assert!(counts[1..].iter().all(|&c| c == 2));
    }

    #[test]
    fn test_matching_pair_scores_and_passes_turn() {
        let mut game = ordered();
        assert!(!flip(&mut game, Color::Red, 0, 0).is_ignored());
        let reply = flip(&mut game, Color::Red, 1, 0);
        assert!(matches!(reply, Reply::Broadcast(GameEvent::ReceiveBoard(_))));

        assert_eq!(state(&game, 0, 0), CardState::Matched);
        assert_eq!(state(&game, 1, 0), CardState::Matched);
        let snap = game.snapshot();
        assert_eq!(snap.scores, ByColor::new(1, 0));
        assert!(snap.flipped.is_empty());
        assert_eq!(snap.current_turn, Color::Yellow);
    }

    #[test]
    fn test_mismatch_stays_visible_until_next_flip() {
        let mut game = ordered();
        flip(&mut game, Color::Red, 0, 0); // 1
        flip(&mut game, Color::Red, 2, 0); // 2
        let snap = game.snapshot();
        assert_eq!(snap.scores, ByColor::new(0, 0));
        assert_eq!(snap.current_turn, Color::Yellow);
        assert_eq!(state(&game, 0, 0), CardState::Up);
        assert_eq!(state(&game, 2, 0), CardState::Up);
        assert_eq!(snap.flipped.len(), 2);

        // Yellow's next flip turns the stale pair down first.
        flip(&mut game, Color::Yellow, 0, 1);
        assert_eq!(state(&game, 0, 0), CardState::Down);
        assert_eq!(state(&game, 2, 0), CardState::Down);
        assert_eq!(state(&game, 0, 1), CardState::Up);
        assert_eq!(game.snapshot().flipped, vec![Position { col: 0, row: 1 }]);
    }

    #[test]
    fn test_can_reflip_card_just_turned_down() {
        let mut game = ordered();
        flip(&mut game, Color::Red, 0, 0);
        flip(&mut game, Color::Red, 2, 0);
        assert!(!flip(&mut game, Color::Yellow, 0, 0).is_ignored());
        assert_eq!(state(&game, 0, 0), CardState::Up);
    }

    #[test]
    fn test_flip_out_of_turn_is_ignored() {
        let mut game = ordered();
        let before = game.snapshot();
        assert!(flip(&mut game, Color::Yellow, 0, 0).is_ignored());
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_flip_out_of_range_or_malformed_is_ignored() {
        let mut game = ordered();
        let before = game.snapshot();
        for cmd in ["flip 6 0", "flip 0 3", "flip", "flip a b", "flip 1 1 1", "peek 0 0"] {
            assert!(game.apply(Color::Red, cmd).is_ignored(), "{cmd:?}");
        }
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_flip_same_card_twice_is_ignored() {
        let mut game = ordered();
        flip(&mut game, Color::Red, 3, 2);
        let before = game.snapshot();
        assert!(flip(&mut game, Color::Red, 3, 2).is_ignored());
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_flip_matched_card_after_cleanup_still_broadcasts() {
        let mut game = ordered();
        flip(&mut game, Color::Red, 0, 0);
        flip(&mut game, Color::Red, 1, 0); // matched, yellow to move
        flip(&mut game, Color::Yellow, 2, 0);
        flip(&mut game, Color::Yellow, 4, 0); // mismatch, red to move
        // Targeting a matched card: only the cleanup happens.
        let reply = flip(&mut game, Color::Red, 0, 0);
        assert!(matches!(reply, Reply::Broadcast(_)));
        assert_eq!(state(&game, 2, 0), CardState::Down);
        assert_eq!(state(&game, 4, 0), CardState::Down);
        assert!(game.snapshot().flipped.is_empty());
        assert_eq!(game.current_turn(), Color::Red);
    }

    #[test]
    fn test_five_pairs_win_and_freeze_board() {
        let mut game = ordered();
        // Red matches on each of its turns, yellow always misses.
        let red_pairs = [(0, 0, 1, 0), (2, 0, 3, 0), (4, 0, 5, 0), (0, 1, 1, 1), (2, 1, 3, 1)];
        for (i, (c1, r1, c2, r2)) in red_pairs.into_iter().enumerate() {
            flip(&mut game, Color::Red, c1, r1);
            flip(&mut game, Color::Red, c2, r2);
            if i < 4 {
                flip(&mut game, Color::Yellow, 0, 2); // 7
                flip(&mut game, Color::Yellow, 2, 2); // 8
            }
        }
        assert_eq!(game.winner(), Some(Color::Red));
        assert_eq!(game.snapshot().scores.red, WINNING_SCORE);

        let before = game.snapshot();
        assert!(flip(&mut game, Color::Yellow, 4, 1).is_ignored());
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_reset_requires_both_votes() {
        let mut game = ordered();
        flip(&mut game, Color::Red, 0, 0);
        flip(&mut game, Color::Red, 1, 0);

        assert!(game.apply(Color::Red, "reset").is_ignored());
        assert!(game.apply(Color::Red, "reset").is_ignored());
        assert_eq!(game.snapshot().scores.red, 1, "board untouched");
        assert!(game.snapshot().reset_votes.red);

        let reply = game.apply(Color::Yellow, "RESET");
        let Reply::Broadcast(GameEvent::ResetGame(snap)) = reply else {
            panic!("expected ResetGame, got {reply:?}");
        };
        assert_eq!(snap.scores, ByColor::new(0, 0));
        assert_eq!(snap.reset_votes, ByColor::new(false, false));
        assert_eq!(snap.winner, None);
        assert!(snap.flipped.is_empty());
        assert!(snap.cards.iter().flatten().all(|c| c.state == CardState::Down));
    }

    #[test]
    fn test_get_board_is_caller_only_and_read_only() {
        let mut game = ordered();
        let before = game.snapshot();
        let reply = game.apply(Color::Yellow, "getBoard");
        assert_eq!(reply, Reply::Caller(GameEvent::ReceiveBoard(before.clone())));
        assert_eq!(game.snapshot(), before);
        assert!(game.observe("flip 0 0").is_ignored());
    }

    #[test]
    fn test_equal_values_always_match_random_layouts() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let layout = shuffled_layout(&mut rng);
            let mut game = PairMatching::with_layout(layout);
            let a = Position { col: 0, row: 0 };
            let b = (0..ROWS * COLS)
                .map(|i| Position { col: i % COLS, row: i / COLS })
                .find(|p| *p != a && layout[p.row][p.col] == layout[0][0])
                .unwrap();
            flip(&mut game, Color::Red, a.col, a.row);
            flip(&mut game, Color::Red, b.col, b.row);
            assert_eq!(state(&game, a.col, a.row), CardState::Matched);
            assert_eq!(state(&game, b.col, b.row), CardState::Matched);
            assert_eq!(game.snapshot().scores.red, 1);
        }
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut game = ordered();
        flip(&mut game, Color::Red, 5, 2);
        let json = serde_json::to_value(game.snapshot()).unwrap();
        assert_eq!(json["cards"][2][5]["value"], 9);
        assert_eq!(json["cards"][2][5]["state"], "up");
        assert_eq!(json["flipped"][0]["col"], 5);
        assert_eq!(json["currentTurn"], "red");
        assert_eq!(json["scores"]["yellow"], 0);
        assert_eq!(json["resetVotes"]["red"], false);
    }
}
