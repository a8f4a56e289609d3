//! Neighbor addressing on the grid.
//!
//! Grid boundaries are hard edges: a cell on the west column has no west
//! neighbor, and so on. Absence is an explicit `Option`, never a sentinel
//! index. The relation is symmetric by construction: a cell's east neighbor
//! always has that cell as its west neighbor.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellIdx(pub u32);

impl CellIdx {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The 4 orthogonal directions for neighbor addressing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    West = 0,  // (x-1, y)
    East = 1,  // (x+1, y)
    South = 2, // (x, y-1)
    North = 3, // (x, y+1)
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::West,
        Direction::East,
        Direction::South,
        Direction::North,
    ];

    /// The coordinate offset for this direction.
    #[inline]
    pub const fn offset(self) -> (i64, i64) {
        match self {
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::North => (0, 1),
        }
    }

    /// The reverse direction (for bidirectional linking).
    #[inline]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::West => Direction::East,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Resolve the four neighbor identities of `(x, y)`.
///
/// Pure function of the coordinate and the grid shape. Out-of-range
/// coordinates are a caller bug and abort.
pub fn resolve(x: usize, y: usize, width: usize, height: usize) -> [Option<CellIdx>; 4] {
    assert!(
        x < width && y < height,
        "cell ({x}, {y}) out of range for {width}x{height} grid"
    );
    let idx = y * width + x;
    let mut out = [None; 4];
    if x > 0 {
        out[Direction::West.index()] = Some(CellIdx((idx - 1) as u32));
    }
    if x < width - 1 {
        out[Direction::East.index()] = Some(CellIdx((idx + 1) as u32));
    }
    if y > 0 {
        out[Direction::South.index()] = Some(CellIdx((idx - width) as u32));
    }
    if y < height - 1 {
        out[Direction::North.index()] = Some(CellIdx((idx + width) as u32));
    }
    out
}

/// Per-cell neighbor identities, resolved once per balancing pass.
pub struct NeighborTable {
    slots: Vec<[Option<CellIdx>; 4]>,
}

impl NeighborTable {
    pub fn build(width: usize, height: usize) -> Self {
        let mut slots = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                slots.push(resolve(x, y, width, height));
            }
        }
        Self { slots }
    }

    #[inline]
    pub fn get(&self, idx: usize) -> &[Option<CellIdx>; 4] {
        &self.slots[idx]
    }

    #[inline]
    pub fn slots(&self) -> &[[Option<CellIdx>; 4]] {
        &self.slots
    }
}
