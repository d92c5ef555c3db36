//! Pure match-3 rules: match detection, special-item chaining, cascade steps,
//! move validation. No timers and no rendering; the caller paces the steps.

use crate::board::{Grid, MarbleColor, MarbleFactory, MarbleId, Pos, SpecialKind};
use std::collections::HashSet;

/// Points per removed marble in a cascade iteration.
pub const MATCH_POINTS: u32 = 10;
/// Combo streak at which the score multiplier kicks in.
pub const BIG_COMBO: u32 = 3;
/// Score multiplier for big combos.
pub const COMBO_MULTIPLIER: u32 = 2;
/// Points per removed marble when two special items are swapped together.
pub const PAIR_SWAP_POINTS: u32 = 20;
/// Points per special item triggered by a lone-item swap.
pub const ACTIVATION_POINTS: u32 = 15;

/// Request to place a special marble where a long run was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialSpawn {
    pub pos: Pos,
    pub kind: SpecialKind,
    pub color: MarbleColor,
}

/// One detection pass over a grid snapshot.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Every marble in a run of 3+, deduplicated across overlapping runs.
    pub matched_ids: HashSet<MarbleId>,
    /// Spawn requests, one per run of 4+ (two at an L/T junction).
    pub spawns: Vec<SpecialSpawn>,
    /// Positions of matched marbles that already carry a special kind; their
    /// effects are chained in later, not at detection time.
    pub matched_specials: Vec<Pos>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.matched_ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Horizontal,
    Vertical,
}

/// Scan all horizontal and vertical runs of length >= 3 of equal colour.
/// Empty cells break runs.
pub fn find_matches(grid: &Grid) -> MatchResult {
    let mut result = MatchResult::default();
    let n = grid.size();
    for row in 0..n {
        let line: Vec<Pos> = (0..n).map(|col| Pos::new(row, col)).collect();
        scan_line(grid, &line, Orientation::Horizontal, &mut result);
    }
    for col in 0..n {
        let line: Vec<Pos> = (0..n).map(|row| Pos::new(row, col)).collect();
        scan_line(grid, &line, Orientation::Vertical, &mut result);
    }
    result
}

fn scan_line(grid: &Grid, line: &[Pos], orientation: Orientation, out: &mut MatchResult) {
    let mut i = 0;
    while i < line.len() {
        let Some(first) = grid.get(line[i]) else {
            i += 1;
            continue;
        };
        let mut j = i + 1;
        while j < line.len()
            && grid.get(line[j]).is_some_and(|m| m.color == first.color)
        {
            j += 1;
        }
        if j - i >= 3 {
            record_run(grid, &line[i..j], orientation, first.color, out);
        }
        i = j;
    }
}

fn record_run(
    grid: &Grid,
    run: &[Pos],
    orientation: Orientation,
    color: MarbleColor,
    out: &mut MatchResult,
) {
    for &pos in run {
        let Some(marble) = grid.get(pos) else {
            continue;
        };
        out.matched_ids.insert(marble.id);
        if marble.is_special() {
            out.matched_specials.push(pos);
        }
    }
    // One spawn per run: 4 -> perpendicular line clear, 5+ -> bomb, at the
    // run's middle position (rounded down).
    if run.len() >= 4 {
        let mid = run[(run.len() - 1) / 2];
        let kind = if run.len() >= 5 {
            SpecialKind::Bomb
        } else {
            match orientation {
                Orientation::Horizontal => SpecialKind::ColClear,
                Orientation::Vertical => SpecialKind::RowClear,
            }
        };
        out.spawns.push(SpecialSpawn {
            pos: mid,
            kind,
            color,
        });
    }
}

/// Result of chaining a special item's effect through the board.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    pub affected: HashSet<MarbleId>,
    /// Number of special items triggered in the chain, seed included.
    pub count: u32,
}

/// Cells a special kind reaches from `pos`, clipped to the board.
fn effect_positions(grid: &Grid, pos: Pos, kind: SpecialKind) -> Vec<Pos> {
    let n = grid.size();
    match kind {
        SpecialKind::RowClear => (0..n).map(|col| Pos::new(pos.row, col)).collect(),
        SpecialKind::ColClear => (0..n).map(|row| Pos::new(row, pos.col)).collect(),
        SpecialKind::Bomb => block_around(n, pos, 1),
    }
}

/// Square block of the given radius around `center`, clipped to the board.
fn block_around(n: usize, center: Pos, radius: usize) -> Vec<Pos> {
    let r0 = center.row.saturating_sub(radius);
    let r1 = (center.row + radius).min(n - 1);
    let c0 = center.col.saturating_sub(radius);
    let c1 = (center.col + radius).min(n - 1);
    (r0..=r1)
        .flat_map(|row| (c0..=c1).map(move |col| Pos::new(row, col)))
        .collect()
}

/// Activate the special item at `pos`, chaining recursively through every
/// not-yet-visited special inside its affected area. Returns an empty
/// activation when the cell is empty, carries no special, or was already
/// visited.
pub fn activate_special(grid: &Grid, pos: Pos, visited: &mut HashSet<MarbleId>) -> Activation {
    let Some(marble) = grid.get(pos) else {
        return Activation::default();
    };
    let Some(kind) = marble.special else {
        return Activation::default();
    };
    if !visited.insert(marble.id) {
        return Activation::default();
    }

    let mut activation = Activation {
        affected: HashSet::new(),
        count: 1,
    };
    let reach = effect_positions(grid, pos, kind);
    for &p in &reach {
        if let Some(m) = grid.get(p) {
            activation.affected.insert(m.id);
        }
    }
    // Chain reaction: any special caught in the blast fires too.
    for &p in &reach {
        if grid.get(p).is_some_and(|m| m.is_special() && !visited.contains(&m.id)) {
            let chained = activate_special(grid, p, visited);
            activation.affected.extend(chained.affected);
            activation.count += chained.count;
        }
    }
    activation
}

/// Removal set for two special items swapped directly into adjacency.
/// Anchored at `first` (where the player's first-selected marble landed):
/// row-clear + column-clear makes a cross, bomb + bomb a clipped 5x5 block.
/// Other pairings have no combined effect and remove nothing. The set is
/// deliberately not run back through the chain resolver.
pub fn pair_swap_effect(grid: &Grid, first: Pos, second: Pos) -> HashSet<MarbleId> {
    let n = grid.size();
    let a = grid.get(first).and_then(|m| m.special);
    let b = grid.get(second).and_then(|m| m.special);
    let positions: Vec<Pos> = match (a, b) {
        (Some(SpecialKind::RowClear), Some(SpecialKind::ColClear))
        | (Some(SpecialKind::ColClear), Some(SpecialKind::RowClear)) => (0..n)
            .map(|col| Pos::new(first.row, col))
            .chain((0..n).map(|row| Pos::new(row, first.col)))
            .collect(),
        (Some(SpecialKind::Bomb), Some(SpecialKind::Bomb)) => block_around(n, first, 2),
        _ => Vec::new(),
    };
    positions
        .into_iter()
        .filter_map(|p| grid.get(p))
        .map(|m| m.id)
        .collect()
}

/// Cascade state after one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// More iterations pending; call `step` again.
    Cascading,
    /// Quiescent: no matches remain and a legal move exists.
    Idle,
    /// Quiescent with no legal move anywhere. Terminal.
    GameOver,
}

/// One cascade iteration: detect, remove, spawn, fall, refill.
#[derive(Debug, Clone)]
pub struct CascadeStep {
    pub grid: Grid,
    pub combo: u32,
    pub score_delta: u32,
    /// Cells cleared this iteration, at their pre-gravity positions.
    pub cleared: Vec<Pos>,
    /// Average (row, col) of the removed marbles; UI feedback only.
    pub centroid: Option<(f32, f32)>,
    pub status: StepStatus,
}

/// Run one cascade iteration against a grid snapshot. Pure: the input grid is
/// untouched, the successor grid is returned in the step. Callers loop until
/// the status is no longer `Cascading`.
pub fn step(grid: &Grid, factory: &mut MarbleFactory, combo: u32) -> CascadeStep {
    let matches = find_matches(grid);
    if matches.is_empty() {
        let status = if has_legal_move(grid) {
            StepStatus::Idle
        } else {
            StepStatus::GameOver
        };
        return CascadeStep {
            grid: grid.clone(),
            combo: 0,
            score_delta: 0,
            cleared: Vec::new(),
            centroid: None,
            status,
        };
    }

    // Removal set: matched ids plus the full chained effect of every matched
    // special, all computed against the detection snapshot.
    let mut removal = matches.matched_ids.clone();
    let mut visited = HashSet::new();
    for &pos in &matches.matched_specials {
        let activation = activate_special(grid, pos, &mut visited);
        removal.extend(activation.affected);
    }

    let cleared: Vec<Pos> = grid
        .positions()
        .filter(|&p| grid.get(p).is_some_and(|m| removal.contains(&m.id)))
        .collect();
    let centroid = centroid_of(&cleared);

    let combo = combo + 1;
    let multiplier = if combo >= BIG_COMBO { COMBO_MULTIPLIER } else { 1 };
    let score_delta = removal.len() as u32 * MATCH_POINTS * multiplier;

    let mut next = grid.clone();
    for &pos in &cleared {
        next.set(pos, None);
    }
    // Spawns land only in cells that were cleared; never overwrite a survivor.
    for spawn in &matches.spawns {
        if next.get(spawn.pos).is_none() {
            let marble = factory.special_marble(spawn.kind, spawn.color);
            next.set(spawn.pos, Some(marble));
        }
    }
    settle(&mut next, factory);

    CascadeStep {
        grid: next,
        combo,
        score_delta,
        cleared,
        centroid,
        status: StepStatus::Cascading,
    }
}

/// Step until quiescence or game over. The final (terminal) step is included.
pub fn run_cascade(grid: &Grid, factory: &mut MarbleFactory, combo: u32) -> Vec<CascadeStep> {
    let mut steps = Vec::new();
    let mut current = grid.clone();
    let mut combo = combo;
    loop {
        let s = step(&current, factory, combo);
        current = s.grid.clone();
        combo = s.combo;
        let done = s.status != StepStatus::Cascading;
        steps.push(s);
        if done {
            return steps;
        }
    }
}

fn centroid_of(cells: &[Pos]) -> Option<(f32, f32)> {
    if cells.is_empty() {
        return None;
    }
    let (rs, cs) = cells
        .iter()
        .fold((0.0f32, 0.0f32), |(r, c), p| (r + p.row as f32, c + p.col as f32));
    let n = cells.len() as f32;
    Some((rs / n, cs / n))
}

/// Gravity then refill: compact each column downward preserving order, then
/// fill the empties left at the top with fresh marbles.
fn settle(grid: &mut Grid, factory: &mut MarbleFactory) {
    apply_gravity(grid);
    refill(grid, factory);
}

fn apply_gravity(grid: &mut Grid) {
    let n = grid.size();
    for col in 0..n {
        let stack: Vec<_> = (0..n)
            .rev()
            .filter_map(|row| grid.get(Pos::new(row, col)))
            .collect();
        for (offset, marble) in stack.iter().enumerate() {
            grid.set(Pos::new(n - 1 - offset, col), Some(*marble));
        }
        for row in 0..n - stack.len() {
            grid.set(Pos::new(row, col), None);
        }
    }
}

fn refill(grid: &mut Grid, factory: &mut MarbleFactory) {
    let n = grid.size();
    for col in 0..n {
        for row in 0..n {
            let pos = Pos::new(row, col);
            if grid.get(pos).is_none() {
                let marble = factory.random_marble();
                grid.set(pos, Some(marble));
            }
        }
    }
}

/// Outcome of a player swap request.
#[derive(Debug, Clone)]
pub enum SwapOutcome {
    /// No match and no special: the swap is undone, the board is unchanged.
    Rejected,
    /// The swap stands and produced matches; run the cascade from combo 0.
    Matched { grid: Grid },
    /// Special item(s) fired on the swap; the board has already been cleared
    /// and settled. Re-detection must still run from combo 0.
    Activated {
        grid: Grid,
        score_delta: u32,
        cleared: Vec<Pos>,
    },
}

/// Tentatively exchange two adjacent occupied cells and resolve the result.
/// Non-adjacent positions or empty cells are caller bugs and panic.
pub fn try_swap(grid: &Grid, a: Pos, b: Pos, factory: &mut MarbleFactory) -> SwapOutcome {
    assert!(a.is_adjacent(b), "swap cells must be adjacent");
    let first = grid.get(a).expect("swap from an empty cell");
    let second = grid.get(b).expect("swap into an empty cell");

    let mut swapped = grid.clone();
    swapped.swap(a, b);

    // Item + item: combo effect, anchored where the first marble landed.
    if first.is_special() && second.is_special() {
        let removal = pair_swap_effect(&swapped, b, a);
        let score_delta = removal.len() as u32 * PAIR_SWAP_POINTS;
        let (grid, cleared) = remove_and_settle(&swapped, &removal, factory);
        return SwapOutcome::Activated {
            grid,
            score_delta,
            cleared,
        };
    }

    // Matches take priority over lone-item activation.
    if !find_matches(&swapped).is_empty() {
        return SwapOutcome::Matched { grid: swapped };
    }

    // No match: a swapped-in special fires alone, chain included.
    for pos in [b, a] {
        if swapped.get(pos).is_some_and(|m| m.is_special()) {
            let mut visited = HashSet::new();
            let activation = activate_special(&swapped, pos, &mut visited);
            let score_delta = activation.count * ACTIVATION_POINTS;
            let (grid, cleared) = remove_and_settle(&swapped, &activation.affected, factory);
            return SwapOutcome::Activated {
                grid,
                score_delta,
                cleared,
            };
        }
    }

    SwapOutcome::Rejected
}

fn remove_and_settle(
    grid: &Grid,
    removal: &HashSet<MarbleId>,
    factory: &mut MarbleFactory,
) -> (Grid, Vec<Pos>) {
    let cleared: Vec<Pos> = grid
        .positions()
        .filter(|&p| grid.get(p).is_some_and(|m| removal.contains(&m.id)))
        .collect();
    let mut next = grid.clone();
    for &pos in &cleared {
        next.set(pos, None);
    }
    settle(&mut next, factory);
    (next, cleared)
}

/// True when any swap can still produce an effect. Special items are always
/// playable; otherwise every right/down neighbour pair is tried against the
/// detector. O(n^2) trials of O(n^2) scans; fine at the board sizes we play.
pub fn has_legal_move(grid: &Grid) -> bool {
    if grid
        .positions()
        .any(|p| grid.get(p).is_some_and(|m| m.is_special()))
    {
        return true;
    }
    let n = grid.size();
    for pos in grid.positions() {
        for other in [Pos::new(pos.row, pos.col + 1), Pos::new(pos.row + 1, pos.col)] {
            if other.row >= n || other.col >= n {
                continue;
            }
            let mut trial = grid.clone();
            trial.swap(pos, other);
            if !find_matches(&trial).is_empty() {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Marble;

    /// Build a grid from rows of colour letters; '.' is an empty cell.
    /// b/p/g/u/y/c = blue, pink, green, purple, yellow, cyan.
    fn grid_from(rows: &[&str]) -> Grid {
        let size = rows.len();
        let mut grid = Grid::new(size);
        let mut id = 1000;
        for (r, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), size);
            for (c, ch) in row.chars().enumerate() {
                let color = match ch {
                    'b' => MarbleColor::Blue,
                    'p' => MarbleColor::Pink,
                    'g' => MarbleColor::Green,
                    'u' => MarbleColor::Purple,
                    'y' => MarbleColor::Yellow,
                    'c' => MarbleColor::Cyan,
                    '.' => continue,
                    other => panic!("unknown colour letter {other}"),
                };
                grid.set(
                    Pos::new(r, c),
                    Some(Marble {
                        id,
                        color,
                        special: None,
                    }),
                );
                id += 1;
            }
        }
        grid
    }

    fn make_special(grid: &mut Grid, pos: Pos, kind: SpecialKind) {
        let mut marble = grid.get(pos).unwrap();
        marble.special = Some(kind);
        grid.set(pos, Some(marble));
    }

    /// Diagonal colouring (r + c) mod 4: no runs and no single swap can make
    /// one. Verified exhaustively.
    fn no_move_rows() -> [&'static str; 7] {
        [
            "bpgubpg", "pgubpgu", "gubpgub", "ubpgubp", "bpgubpg", "pgubpgu", "gubpgub",
        ]
    }

    fn id_at(grid: &Grid, pos: Pos) -> MarbleId {
        grid.get(pos).unwrap().id
    }

    #[test]
    fn test_horizontal_run_of_three() {
        // Scenario A: one horizontal run, no vertical runs, no spawns.
        let grid = grid_from(&["ggg", "pbu", "ybp"]);
        let m = find_matches(&grid);
        let expect: HashSet<_> = (0..3).map(|c| id_at(&grid, Pos::new(0, c))).collect();
        assert_eq!(m.matched_ids, expect);
        assert!(m.spawns.is_empty());
        assert!(m.matched_specials.is_empty());
    }

    #[test]
    fn test_empty_cell_breaks_run() {
        let grid = grid_from(&["gg.ggbp", "pgubpgu", "gubpgub", "ubpgubp", "bpgubpg", "pgubpgu", "gubpgub"]);
        assert!(find_matches(&grid).is_empty());
    }

    #[test]
    fn test_run_of_four_spawns_perpendicular_clear() {
        // Scenario B: horizontal 4-run spawns a column clear at the middle.
        let grid = grid_from(&["ggggbpg", "pgubpgu", "gubpgub", "ubpgubp", "bpgubpg", "pgubpgu", "gubpgub"]);
        let m = find_matches(&grid);
        assert_eq!(m.matched_ids.len(), 4);
        assert_eq!(
            m.spawns,
            vec![SpecialSpawn {
                pos: Pos::new(0, 1),
                kind: SpecialKind::ColClear,
                color: MarbleColor::Green,
            }]
        );
    }

    #[test]
    fn test_run_of_five_spawns_bomb() {
        // Scenario C: 5-run spawns one bomb at the middle.
        let grid = grid_from(&["gggggbp", "pgubpgu", "gubpgub", "ubpgubp", "bpgubpg", "pgubpgu", "gubpgub"]);
        let m = find_matches(&grid);
        assert_eq!(m.matched_ids.len(), 5);
        assert_eq!(
            m.spawns,
            vec![SpecialSpawn {
                pos: Pos::new(0, 2),
                kind: SpecialKind::Bomb,
                color: MarbleColor::Green,
            }]
        );
    }

    #[test]
    fn test_run_of_six_spawns_single_bomb() {
        let grid = grid_from(&["ggggggb", "pgubpgu", "gubpgub", "ubpgubp", "bpgubpg", "pgubpgu", "gubpgub"]);
        let m = find_matches(&grid);
        assert_eq!(m.matched_ids.len(), 6);
        assert_eq!(m.spawns.len(), 1);
        assert_eq!(m.spawns[0].kind, SpecialKind::Bomb);
        assert_eq!(m.spawns[0].pos, Pos::new(0, 2));
    }

    #[test]
    fn test_junction_dedupes_ids_but_keeps_both_spawns() {
        // 4-run along row 0 and 4-run down column 0 meeting at (0,0).
        let grid = grid_from(&["ggggbpg", "ggubpgu", "gubpgub", "gbpgubp", "bpgubpg", "pgubpgu", "gubpgub"]);
        let m = find_matches(&grid);
        assert_eq!(m.matched_ids.len(), 7);
        assert_eq!(m.spawns.len(), 2);
        let kinds: Vec<_> = m.spawns.iter().map(|s| (s.pos, s.kind)).collect();
        assert!(kinds.contains(&(Pos::new(0, 1), SpecialKind::ColClear)));
        assert!(kinds.contains(&(Pos::new(1, 0), SpecialKind::RowClear)));
    }

    #[test]
    fn test_bomb_chains_through_row_clear() {
        // Scenario D: bomb blast reaches a row-clear item; its full row joins
        // the affected set and both activations are counted.
        let mut grid = grid_from(&no_move_rows());
        make_special(&mut grid, Pos::new(2, 2), SpecialKind::Bomb);
        make_special(&mut grid, Pos::new(1, 2), SpecialKind::RowClear);
        let mut visited = HashSet::new();
        let activation = activate_special(&grid, Pos::new(2, 2), &mut visited);
        assert_eq!(activation.count, 2);
        // Whole of row 1, including cells outside the 3x3.
        for col in 0..7 {
            assert!(activation.affected.contains(&id_at(&grid, Pos::new(1, col))));
        }
        // 3x3 block rows 1..=3, cols 1..=3 plus row 1: 9 + 4 extra row cells.
        assert_eq!(activation.affected.len(), 13);
        assert!(!activation.affected.contains(&id_at(&grid, Pos::new(4, 4))));
    }

    #[test]
    fn test_activation_respects_visited() {
        let mut grid = grid_from(&no_move_rows());
        make_special(&mut grid, Pos::new(3, 3), SpecialKind::Bomb);
        let mut visited = HashSet::new();
        visited.insert(id_at(&grid, Pos::new(3, 3)));
        let activation = activate_special(&grid, Pos::new(3, 3), &mut visited);
        assert_eq!(activation.count, 0);
        assert!(activation.affected.is_empty());
    }

    #[test]
    fn test_pair_swap_cross_does_not_chain() {
        // Scenario E: row-clear + column-clear swap makes exactly a cross at
        // the first item's position; a bomb sitting in the row must not fire.
        let mut grid = grid_from(&no_move_rows());
        make_special(&mut grid, Pos::new(3, 3), SpecialKind::RowClear);
        make_special(&mut grid, Pos::new(3, 4), SpecialKind::ColClear);
        make_special(&mut grid, Pos::new(3, 0), SpecialKind::Bomb);
        let mut factory = MarbleFactory::new(6, 1);
        let outcome = try_swap(&grid, Pos::new(3, 3), Pos::new(3, 4), &mut factory);
        let SwapOutcome::Activated {
            score_delta,
            cleared,
            grid: after,
        } = outcome
        else {
            panic!("expected activation");
        };
        // Row 3 plus column 4 minus the shared cell.
        assert_eq!(cleared.len(), 13);
        assert_eq!(score_delta, 13 * PAIR_SWAP_POINTS);
        let cleared_set: HashSet<Pos> = cleared.into_iter().collect();
        for col in 0..7 {
            assert!(cleared_set.contains(&Pos::new(3, col)));
        }
        for row in 0..7 {
            assert!(cleared_set.contains(&Pos::new(row, 4)));
        }
        // Bomb at (3,0) was removed but never activated: its neighbours survive.
        assert!(!cleared_set.contains(&Pos::new(2, 0)));
        assert!(!cleared_set.contains(&Pos::new(4, 1)));
        assert!(after.is_full());
    }

    #[test]
    fn test_pair_swap_double_bomb_is_5x5() {
        let mut grid = grid_from(&no_move_rows());
        make_special(&mut grid, Pos::new(3, 3), SpecialKind::Bomb);
        make_special(&mut grid, Pos::new(3, 4), SpecialKind::Bomb);
        let mut factory = MarbleFactory::new(6, 1);
        let outcome = try_swap(&grid, Pos::new(3, 3), Pos::new(3, 4), &mut factory);
        let SwapOutcome::Activated { cleared, .. } = outcome else {
            panic!("expected activation");
        };
        // Anchored at (3,4) where the first marble landed; 5x5 clipped: rows
        // 1..=5, cols 2..=6.
        let cleared_set: HashSet<Pos> = cleared.into_iter().collect();
        assert_eq!(cleared_set.len(), 25);
        assert!(cleared_set.contains(&Pos::new(1, 2)));
        assert!(cleared_set.contains(&Pos::new(5, 6)));
        assert!(!cleared_set.contains(&Pos::new(0, 4)));
        assert!(!cleared_set.contains(&Pos::new(3, 1)));
    }

    #[test]
    fn test_lone_special_swap_activates() {
        let mut grid = grid_from(&no_move_rows());
        make_special(&mut grid, Pos::new(2, 2), SpecialKind::Bomb);
        let mut factory = MarbleFactory::new(6, 1);
        let outcome = try_swap(&grid, Pos::new(2, 2), Pos::new(2, 3), &mut factory);
        let SwapOutcome::Activated {
            score_delta,
            cleared,
            grid: after,
        } = outcome
        else {
            panic!("expected activation");
        };
        // Bomb fired from its landing cell (2,3): 3x3, one activation.
        assert_eq!(cleared.len(), 9);
        assert_eq!(score_delta, ACTIVATION_POINTS);
        assert!(after.is_full());
    }

    #[test]
    fn test_swap_without_effect_is_rejected() {
        let grid = grid_from(&no_move_rows());
        let mut factory = MarbleFactory::new(6, 1);
        let outcome = try_swap(&grid, Pos::new(0, 0), Pos::new(0, 1), &mut factory);
        assert!(matches!(outcome, SwapOutcome::Rejected));
    }

    #[test]
    #[should_panic(expected = "adjacent")]
    fn test_swap_non_adjacent_panics() {
        let grid = grid_from(&no_move_rows());
        let mut factory = MarbleFactory::new(6, 1);
        let _ = try_swap(&grid, Pos::new(0, 0), Pos::new(2, 0), &mut factory);
    }

    #[test]
    fn test_no_move_grid_reports_game_over() {
        // Scenario F: the diagonal grid has no matches and no legal swap.
        let grid = grid_from(&no_move_rows());
        assert!(!has_legal_move(&grid));
        assert!(!has_legal_move(&grid)); // idempotent
        let mut factory = MarbleFactory::new(6, 1);
        let s = step(&grid, &mut factory, 0);
        assert_eq!(s.status, StepStatus::GameOver);
        assert_eq!(s.combo, 0);
        assert_eq!(s.score_delta, 0);
    }

    #[test]
    fn test_special_makes_board_playable() {
        let mut grid = grid_from(&no_move_rows());
        assert!(!has_legal_move(&grid));
        make_special(&mut grid, Pos::new(6, 6), SpecialKind::RowClear);
        assert!(has_legal_move(&grid));
    }

    #[test]
    fn test_step_clears_scores_and_settles() {
        // Bottom-row 4-run: the spawned column clear must stay on the bottom
        // row while the cleared columns compact and refill.
        let grid = grid_from(&["bpgubpg", "pgubpgu", "gubpgub", "ubpgubp", "bpgubpg", "pgubpgu", "ggggubp"]);
        let mut factory = MarbleFactory::new(6, 5);
        let s = step(&grid, &mut factory, 0);
        assert_eq!(s.status, StepStatus::Cascading);
        assert_eq!(s.combo, 1);
        assert_eq!(s.score_delta, 4 * MATCH_POINTS);
        assert_eq!(s.cleared.len(), 4);
        let spawned = s.grid.get(Pos::new(6, 1)).unwrap();
        assert_eq!(spawned.special, Some(SpecialKind::ColClear));
        assert_eq!(spawned.color, MarbleColor::Green);
        assert!(s.grid.is_full());
        let (r, c) = s.centroid.unwrap();
        assert!((r - 6.0).abs() < f32::EPSILON);
        assert!((c - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_big_combo_doubles_score() {
        let grid = grid_from(&["bpgubpg", "pgubpgu", "gubpgub", "ubpgubp", "bpgubpg", "pgubpgu", "ggggubp"]);
        let mut factory = MarbleFactory::new(6, 5);
        let s = step(&grid, &mut factory, 2);
        assert_eq!(s.combo, 3);
        assert_eq!(s.score_delta, 4 * MATCH_POINTS * COMBO_MULTIPLIER);
    }

    #[test]
    fn test_gravity_preserves_column_order() {
        let mut grid = grid_from(&["bpgubpg", "pgubpgu", "gubpgub", "ubpgubp", "bpgubpg", "pgubpgu", "gubpgub"]);
        let top = id_at(&grid, Pos::new(0, 3));
        let mid = id_at(&grid, Pos::new(2, 3));
        grid.set(Pos::new(1, 3), None);
        grid.set(Pos::new(4, 3), None);
        apply_gravity(&mut grid);
        assert!(grid.get(Pos::new(0, 3)).is_none());
        assert!(grid.get(Pos::new(1, 3)).is_none());
        assert_eq!(id_at(&grid, Pos::new(2, 3)), top);
        assert_eq!(id_at(&grid, Pos::new(3, 3)), mid);
    }

    #[test]
    fn test_cascade_reaches_quiescence_with_full_matchless_grid() {
        for seed in 1..=10u64 {
            let mut factory = MarbleFactory::new(6, seed);
            let grid = factory.new_grid(7);
            let steps = run_cascade(&grid, &mut factory, 0);
            let last = steps.last().unwrap();
            assert_ne!(last.status, StepStatus::Cascading);
            assert!(last.grid.is_full());
            if last.status == StepStatus::Idle {
                assert!(find_matches(&last.grid).is_empty());
            }
        }
    }

    #[test]
    fn test_identical_seeds_replay_identically() {
        let mut f1 = MarbleFactory::new(6, 12345);
        let mut f2 = MarbleFactory::new(6, 12345);
        let g1 = f1.new_grid(7);
        let g2 = f2.new_grid(7);
        assert_eq!(g1, g2);
        let s1 = run_cascade(&g1, &mut f1, 0);
        let s2 = run_cascade(&g2, &mut f2, 0);
        assert_eq!(s1.len(), s2.len());
        let score1: u32 = s1.iter().map(|s| s.score_delta).sum();
        let score2: u32 = s2.iter().map(|s| s.score_delta).sum();
        assert_eq!(score1, score2);
        assert_eq!(s1.last().unwrap().grid, s2.last().unwrap().grid);
    }
}
