//! Session state: one game in progress. Holds the board, score, combo and
//! cursor, and advances the cascade one engine step per UI tick so the
//! presentation layer controls pacing, not the rules.

use crate::board::{Grid, MarbleFactory, Pos};
use crate::engine::{self, StepStatus, SwapOutcome};

/// Externally observable game state, mutated only through engine operations.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub grid: Grid,
    factory: MarbleFactory,
    pub score: u32,
    pub best_score: u32,
    pub combo: u32,
    pub cursor: Pos,
    pub selected: Option<Pos>,
    pub game_over: bool,
    /// Cascade iterations still pending; advanced by `tick`.
    cascading: bool,
    /// Cells cleared by the most recent step, for the clear animation.
    pub last_cleared: Vec<Pos>,
    /// Centroid of the last removal, for the combo popup.
    pub last_centroid: Option<(f32, f32)>,
    pub last_score_delta: u32,
    /// Seed this session was created with (shown in the sidebar).
    pub seed: u64,
}

impl GameSession {
    /// Fresh deal. Starts in the cascading state so the opening resolution
    /// pass clears any accidental matches before input is accepted.
    pub fn new(size: usize, colors: usize, seed: u64, best_score: u32) -> Self {
        let mut factory = MarbleFactory::new(colors, seed);
        let grid = factory.new_grid(size);
        Self {
            grid,
            factory,
            score: 0,
            best_score,
            combo: 0,
            cursor: Pos::new(size / 2, size / 2),
            selected: None,
            game_over: false,
            cascading: true,
            last_cleared: Vec::new(),
            last_centroid: None,
            last_score_delta: 0,
            seed,
        }
    }

    /// True while cascade steps are pending; input is ignored meanwhile.
    pub fn is_busy(&self) -> bool {
        self.cascading
    }

    /// Palette size this session deals from.
    pub fn colors_in_play(&self) -> usize {
        self.factory.colors()
    }

    /// Advance the cascade by one engine step. Returns the step's status, or
    /// None when the board is already quiescent.
    pub fn tick(&mut self) -> Option<StepStatus> {
        if !self.cascading || self.game_over {
            return None;
        }
        let step = engine::step(&self.grid, &mut self.factory, self.combo);
        self.grid = step.grid;
        self.combo = step.combo;
        self.score += step.score_delta;
        self.best_score = self.best_score.max(self.score);
        self.last_cleared = step.cleared;
        self.last_centroid = step.centroid;
        self.last_score_delta = step.score_delta;
        match step.status {
            StepStatus::Cascading => {}
            StepStatus::Idle => self.cascading = false,
            StepStatus::GameOver => {
                self.cascading = false;
                self.game_over = true;
            }
        }
        Some(step.status)
    }

    pub fn move_cursor(&mut self, dr: isize, dc: isize) {
        if self.game_over {
            return;
        }
        let n = self.grid.size() as isize;
        let row = (self.cursor.row as isize + dr).clamp(0, n - 1);
        let col = (self.cursor.col as isize + dc).clamp(0, n - 1);
        self.cursor = Pos::new(row as usize, col as usize);
    }

    /// First press selects the cursor cell; second press swaps when adjacent.
    /// Selection always clears after the second press, matched or not.
    pub fn select(&mut self) {
        if self.cascading || self.game_over {
            return;
        }
        match self.selected.take() {
            None => self.selected = Some(self.cursor),
            Some(sel) if sel == self.cursor => {}
            Some(sel) if sel.is_adjacent(self.cursor) => self.swap(sel, self.cursor),
            Some(_) => self.selected = Some(self.cursor),
        }
    }

    fn swap(&mut self, a: Pos, b: Pos) {
        match engine::try_swap(&self.grid, a, b, &mut self.factory) {
            SwapOutcome::Rejected => {}
            SwapOutcome::Matched { grid } => {
                self.grid = grid;
                self.combo = 0;
                self.cascading = true;
            }
            SwapOutcome::Activated {
                grid,
                score_delta,
                cleared,
            } => {
                self.grid = grid;
                self.combo = 0;
                self.score += score_delta;
                self.best_score = self.best_score.max(self.score);
                self.last_cleared = cleared;
                self.last_score_delta = score_delta;
                self.cascading = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(session: &mut GameSession) {
        while session.tick().is_some() {}
    }

    #[test]
    fn test_opening_pass_resolves_before_play() {
        let mut session = GameSession::new(7, 6, 99, 0);
        assert!(session.is_busy());
        settle(&mut session);
        assert!(!session.is_busy());
        assert!(session.grid.is_full());
        if !session.game_over {
            assert!(engine::find_matches(&session.grid).is_empty());
        }
    }

    #[test]
    fn test_same_seed_same_session() {
        let mut s1 = GameSession::new(7, 6, 4242, 0);
        let mut s2 = GameSession::new(7, 6, 4242, 0);
        settle(&mut s1);
        settle(&mut s2);
        assert_eq!(s1.grid, s2.grid);
        assert_eq!(s1.score, s2.score);
    }

    #[test]
    fn test_best_score_tracks_running_score() {
        let mut session = GameSession::new(7, 6, 7, 30);
        settle(&mut session);
        assert!(session.best_score >= 30);
        assert!(session.best_score >= session.score);
    }

    #[test]
    fn test_cursor_clamped_to_board() {
        let mut session = GameSession::new(7, 6, 1, 0);
        session.move_cursor(-10, -10);
        assert_eq!(session.cursor, Pos::new(0, 0));
        session.move_cursor(10, 10);
        assert_eq!(session.cursor, Pos::new(6, 6));
    }

    #[test]
    fn test_select_ignored_while_cascading() {
        let mut session = GameSession::new(7, 6, 1, 0);
        assert!(session.is_busy());
        session.select();
        assert!(session.selected.is_none());
    }

    #[test]
    fn test_reselect_moves_selection() {
        let mut session = GameSession::new(7, 6, 1, 0);
        settle(&mut session);
        if session.game_over {
            return;
        }
        session.select();
        assert_eq!(session.selected, Some(session.cursor));
        session.move_cursor(2, 0); // not adjacent
        session.select();
        assert_eq!(session.selected, Some(session.cursor));
    }
}
