//! Marching squares lookup tables.
//!
//! Corners and edges of a cell are numbered counter-clockwise starting at the
//! corner with the lowest `x` and highest `y`:
//!
//! ```text
//!   3 ----2---- 2
//!   |           |
//!   3           1
//!   |           |
//!   0 ----0---- 1
//! ```
//!
//! Edge `e` joins corner `e` and corner `(e + 1) % 4`.

/// Corner pair joined by each edge.
pub const EDGE_CORNER_INDICES: [[usize; 2]; 4] = [[0, 1], [1, 2], [2, 3], [3, 0]];

/// Maps a classification index to a 4-bit mask of the edges crossed by the contour.
pub const EDGE_TABLE: [u8; 16] = [
    0b0000, 0b1001, 0b0011, 0b1010, 0b0110, 0b1111, 0b0101, 0b1100,
    0b1100, 0b0101, 0b1111, 0b0110, 0b1010, 0b0011, 0b1001, 0b0000,
];

/// Maps a classification index to the edge pairs that form line segments.
///
/// Pairs are stored flat and terminated by `-1`:
/// ```text
/// SEGMENT_TABLE[state] = [e0, e1,  e2, e3]
///                         \seg0/   \seg1/
/// ```
/// The saddle cases 5 and 10 always resolve to the same fixed pairing.
pub static SEGMENT_TABLE: [[i8; 4]; 16] = [
    [-1, -1, -1, -1],
    [0, 3, -1, -1],
    [0, 1, -1, -1],
    [1, 3, -1, -1],
    [1, 2, -1, -1],
    [0, 1, 2, 3],
    [0, 2, -1, -1],
    [2, 3, -1, -1],
    [2, 3, -1, -1],
    [0, 2, -1, -1],
    [0, 3, 1, 2],
    [1, 2, -1, -1],
    [1, 3, -1, -1],
    [0, 1, -1, -1],
    [0, 3, -1, -1],
    [-1, -1, -1, -1],
];
