//! Board data: marbles, the grid, and the seedable marble factory.

/// Board side length used by the reference layout (7x7).
pub const DEFAULT_BOARD_SIZE: usize = 7;

/// Marble identity. Stable across swaps and gravity; removal sets are keyed on it.
pub type MarbleId = u64;

/// Marble colours (full palette). A session may restrict the factory to a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarbleColor {
    Blue,
    Pink,
    Green,
    Purple,
    Yellow,
    Cyan,
}

impl MarbleColor {
    pub const ALL: [Self; 6] = [
        Self::Blue,
        Self::Pink,
        Self::Green,
        Self::Purple,
        Self::Yellow,
        Self::Cyan,
    ];

    /// Colour index 0..6 for theme.marble_color().
    pub fn index(&self) -> u8 {
        match self {
            Self::Blue => 0,
            Self::Pink => 1,
            Self::Green => 2,
            Self::Purple => 3,
            Self::Yellow => 4,
            Self::Cyan => 5,
        }
    }
}

/// Area-of-effect kinds a marble can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKind {
    /// Clears the marble's entire row.
    RowClear,
    /// Clears the marble's entire column.
    ColClear,
    /// Clears the 3x3 block around the marble, clipped to the board.
    Bomb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marble {
    pub id: MarbleId,
    pub color: MarbleColor,
    pub special: Option<SpecialKind>,
}

impl Marble {
    #[inline]
    pub fn is_special(&self) -> bool {
        self.special.is_some()
    }
}

/// Cell coordinate. Row 0 is the top of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// True when the two cells share an edge (orthogonal neighbours).
    pub fn is_adjacent(&self, other: Pos) -> bool {
        let dr = self.row.abs_diff(other.row);
        let dc = self.col.abs_diff(other.col);
        (dr == 1 && dc == 0) || (dr == 0 && dc == 1)
    }
}

/// N x N board of optional marbles. Out-of-bounds access is a bug and panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Option<Marble>>,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "grid size must be positive");
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn idx(&self, pos: Pos) -> usize {
        assert!(
            pos.row < self.size && pos.col < self.size,
            "position ({}, {}) outside {}x{} grid",
            pos.row,
            pos.col,
            self.size,
            self.size
        );
        pos.row * self.size + pos.col
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> Option<Marble> {
        self.cells[self.idx(pos)]
    }

    #[inline]
    pub fn set(&mut self, pos: Pos, cell: Option<Marble>) {
        let i = self.idx(pos);
        self.cells[i] = cell;
    }

    /// Exchange the contents of two cells.
    pub fn swap(&mut self, a: Pos, b: Pos) {
        let (i, j) = (self.idx(a), self.idx(b));
        self.cells.swap(i, j);
    }

    /// All cell positions, row-major.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        let size = self.size;
        (0..size).flat_map(move |row| (0..size).map(move |col| Pos::new(row, col)))
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

/// Deterministic xorshift64 PRNG; the injectable random source for the factory.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        // xorshift state must be non-zero
        Self {
            state: seed.max(1),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut s = self.state;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.state = s;
        s
    }

    /// Uniform value in 0..bound.
    pub fn next_below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }
}

/// Produces marbles with session-unique ids and seeded random colours.
#[derive(Debug, Clone)]
pub struct MarbleFactory {
    rng: Rng,
    next_id: MarbleId,
    colors: usize,
}

impl MarbleFactory {
    /// `colors` restricts random draws to the first N palette entries.
    pub fn new(colors: usize, seed: u64) -> Self {
        assert!(
            (2..=MarbleColor::ALL.len()).contains(&colors),
            "palette size {} out of range",
            colors
        );
        Self {
            rng: Rng::new(seed),
            next_id: 0,
            colors,
        }
    }

    /// Active palette size (first N entries of [`MarbleColor::ALL`]).
    pub fn colors(&self) -> usize {
        self.colors
    }

    fn fresh_id(&mut self) -> MarbleId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Plain marble with a uniformly random colour from the active palette.
    pub fn random_marble(&mut self) -> Marble {
        let color = MarbleColor::ALL[self.rng.next_below(self.colors)];
        Marble {
            id: self.fresh_id(),
            color,
            special: None,
        }
    }

    /// Special marble with an explicit kind and colour (match rewards).
    pub fn special_marble(&mut self, kind: SpecialKind, color: MarbleColor) -> Marble {
        Marble {
            id: self.fresh_id(),
            color,
            special: Some(kind),
        }
    }

    /// Fresh fully-populated board. Accidental matches are dealt with by the
    /// cascade engine's opening pass, exactly like a fresh deal.
    pub fn new_grid(&mut self, size: usize) -> Grid {
        let mut grid = Grid::new(size);
        for pos in (0..size)
            .flat_map(|row| (0..size).map(move |col| Pos::new(row, col)))
        {
            let marble = self.random_marble();
            grid.set(pos, Some(marble));
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacency() {
        let p = Pos::new(2, 2);
        assert!(p.is_adjacent(Pos::new(1, 2)));
        assert!(p.is_adjacent(Pos::new(2, 3)));
        assert!(!p.is_adjacent(Pos::new(1, 1)));
        assert!(!p.is_adjacent(Pos::new(2, 2)));
        assert!(!p.is_adjacent(Pos::new(4, 2)));
    }

    #[test]
    fn test_factory_ids_unique_and_monotonic() {
        let mut f = MarbleFactory::new(6, 42);
        let a = f.random_marble();
        let b = f.random_marble();
        let c = f.special_marble(SpecialKind::Bomb, MarbleColor::Pink);
        assert!(a.id < b.id && b.id < c.id);
    }

    #[test]
    fn test_factory_same_seed_same_sequence() {
        let mut f1 = MarbleFactory::new(6, 7);
        let mut f2 = MarbleFactory::new(6, 7);
        for _ in 0..100 {
            assert_eq!(f1.random_marble().color, f2.random_marble().color);
        }
    }

    #[test]
    fn test_factory_respects_palette_size() {
        let mut f = MarbleFactory::new(4, 99);
        for _ in 0..200 {
            assert!(f.random_marble().color.index() < 4);
        }
    }

    #[test]
    fn test_new_grid_is_full() {
        let mut f = MarbleFactory::new(6, 3);
        let grid = f.new_grid(DEFAULT_BOARD_SIZE);
        assert!(grid.is_full());
        assert_eq!(grid.size(), 7);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_out_of_bounds_panics() {
        let grid = Grid::new(5);
        let _ = grid.get(Pos::new(5, 0));
    }

    #[test]
    fn test_grid_swap() {
        let mut f = MarbleFactory::new(6, 1);
        let mut grid = f.new_grid(3);
        let a = grid.get(Pos::new(0, 0));
        let b = grid.get(Pos::new(0, 1));
        grid.swap(Pos::new(0, 0), Pos::new(0, 1));
        assert_eq!(grid.get(Pos::new(0, 0)), b);
        assert_eq!(grid.get(Pos::new(0, 1)), a);
    }
}
