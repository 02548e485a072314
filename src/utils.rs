use crate::{
    field::ScalarField,
    interp::{find_t, interpolate_points},
    tables::{EDGE_CORNER_INDICES, EDGE_TABLE, SEGMENT_TABLE},
    types::{LineSegment, Point, Value},
};

/// Converts the crossing points for a given marching squares `state` into line segments.
///
/// `SEGMENT_TABLE[state]` contains edge indices in pairs, terminated by `-1`.
/// Each edge index maps into `edge_points` to retrieve the interpolated crossing.
/// Pairs whose crossing is missing are dropped.
#[inline]
pub fn segments_from_state(
    edge_points: &[Option<Point>; 4],
    state: usize,
) -> impl Iterator<Item = LineSegment> + '_ {
    SEGMENT_TABLE[state]
        .chunks_exact(2)
        .take_while(|pair| pair[0] != -1)
        .filter_map(|pair| {
            let start = edge_points[pair[0] as usize]?;
            let end = edge_points[pair[1] as usize]?;
            Some(LineSegment::new(start, end))
        })
}

/// Returns the 4 world-space corner positions of the cell whose lowest corner
/// is sample `(x, y)`.
///
/// ```text
///   3 ---- 2        (x, y)     (x+1, y)
///   |      |
///   0 ---- 1        (x, y+1)   (x+1, y+1)
/// ```
#[inline]
pub fn get_corner_positions(x: usize, y: usize, spacing: Value) -> [Point; 4] {
    let x0 = spacing * x as Value;
    let y0 = spacing * y as Value;
    let x1 = x0 + spacing;
    let y1 = y0 + spacing;

    [
        Point::new(x0, y1),
        Point::new(x1, y1),
        Point::new(x1, y0),
        Point::new(x0, y0),
    ]
}

/// Returns the 4 corner values of the cell at `(x, y)`, in the order of
/// [`get_corner_positions`].
#[inline]
pub fn get_corner_values(field: &ScalarField, x: usize, y: usize) -> [Value; 4] {
    [
        field.get(x, y + 1),
        field.get(x + 1, y + 1),
        field.get(x + 1, y),
        field.get(x, y),
    ]
}

/// Computes the marching squares state bitmask for a cell.
///
/// A bit is set when the corner's value is **strictly below** the isolevel:
///
/// ```text
/// corner index:  3  2  1  0
/// state bits:   [_][_][_][_]
///                         ^-- corner 0 below?
/// ```
///
/// NaN corners never count as below.
#[inline]
pub fn get_state(corner_values: &[Value; 4], isolevel: Value) -> usize {
    corner_values
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v < isolevel)
        .fold(0, |state, (i, _)| state | (1 << i))
}

/// Interpolates the crossing along each edge of the cell flagged in `edges_mask`.
///
/// `edges_mask` is a 4-bit field from `EDGE_TABLE`; a set bit means the edge is crossed.
#[inline]
pub fn get_edge_points(
    edges_mask: u8,
    corner_positions: &[Point; 4],
    corner_values: &[Value; 4],
    isolevel: Value,
) -> [Option<Point>; 4] {
    let mut edge_points: [Option<Point>; 4] = [None; 4];

    for (i, [c0, c1]) in EDGE_CORNER_INDICES.iter().copied().enumerate() {
        if (edges_mask & (1 << i)) == 0 {
            continue;
        }

        let t = find_t(corner_values[c0], corner_values[c1], isolevel);
        edge_points[i] = Some(interpolate_points(corner_positions[c0], corner_positions[c1], t));
    }

    edge_points
}

/// Runs marching squares on a single cell.
///
/// ```text
/// 1. get_state             →  16-entry lookup key
/// 2. EDGE_TABLE[state]     →  bitmask of crossed edges
/// 3. get_edge_points       →  up to 4 interpolated points
/// 4. segments_from_state   →  0, 1 or 2 segments from SEGMENT_TABLE
/// ```
pub fn polygonize_cell(
    corner_positions: &[Point; 4],
    corner_values: &[Value; 4],
    isolevel: Value,
) -> Vec<LineSegment> {
    let state = get_state(corner_values, isolevel);
    let edges_mask = EDGE_TABLE[state];
    if edges_mask == 0 {
        return Vec::new();
    }

    let edge_points = get_edge_points(edges_mask, corner_positions, corner_values, isolevel);
    segments_from_state(&edge_points, state).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_cell() -> [Point; 4] {
        get_corner_positions(0, 0, 1.0)
    }

    #[test]
    fn uniform_cells_produce_nothing() {
        assert_eq!(get_state(&[0.0; 4], 1.0), 15);
        assert_eq!(get_state(&[3.0; 4], 1.0), 0);
        assert!(polygonize_cell(&unit_cell(), &[0.0; 4], 1.0).is_empty());
        assert!(polygonize_cell(&unit_cell(), &[3.0; 4], 1.0).is_empty());
    }

    #[test]
    fn value_equal_to_isolevel_is_not_below() {
        assert_eq!(get_state(&[1.0, 0.5, 1.0, 2.0], 1.0), 0b0010);
    }

    #[test]
    fn nan_corners_are_not_below() {
        assert_eq!(get_state(&[Value::NAN, 0.0, 0.0, 0.0], 1.0), 0b1110);
    }

    #[test]
    fn straddling_cell_crosses_side_edges_at_midpoints() {
        let cell = unit_cell();
        let values = [0.0, 0.0, 2.0, 2.0];

        let state = get_state(&values, 1.0);
        assert_eq!(state, 0b0011);
        assert_eq!(EDGE_TABLE[state], 0b1010);

        let segments = polygonize_cell(&cell, &values, 1.0);
        assert_eq!(segments.len(), 1);

        let LineSegment { start, end } = segments[0];
        // edge 1: corner 1 (1, 1) -> corner 2 (1, 0)
        assert_relative_eq!(start.x, 1.0);
        assert_relative_eq!(start.y, 0.5);
        // edge 3: corner 3 (0, 0) -> corner 0 (0, 1)
        assert_relative_eq!(end.x, 0.0);
        assert_relative_eq!(end.y, 0.5);
    }

    #[test]
    fn saddle_cells_produce_two_segments() {
        let cell = unit_cell();
        for values in [[0.0, 2.0, 0.0, 2.0], [2.0, 0.0, 2.0, 0.0]] {
            let state = get_state(&values, 1.0);
            assert!(state == 5 || state == 10);
            let segments = polygonize_cell(&cell, &values, 1.0);
            assert_eq!(segments.len(), 2, "state {state}");
            for s in segments {
                assert_relative_eq!(s.length(), 0.5_f64.sqrt(), max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn single_corner_cells_produce_one_segment() {
        let cell = unit_cell();
        for corner in 0..4 {
            let mut values = [2.0; 4];
            values[corner] = 0.0;
            assert_eq!(polygonize_cell(&cell, &values, 1.0).len(), 1);
            let mut values = [0.0; 4];
            values[corner] = 2.0;
            assert_eq!(polygonize_cell(&cell, &values, 1.0).len(), 1);
        }
    }

    #[test]
    fn crossing_is_interpolated_linearly() {
        let cell = get_corner_positions(2, 3, 2.0);
        // corner 0 below, everything else above
        let values = [0.0, 4.0, 4.0, 1.0];
        let segments = polygonize_cell(&cell, &values, 0.5);
        assert_eq!(segments.len(), 1);

        // edge 0: (4, 8) -> (6, 8), t = 0.125
        assert_relative_eq!(segments[0].start.x, 4.25);
        assert_relative_eq!(segments[0].start.y, 8.0);
        // edge 3: (4, 6) -> (4, 8), t = (0.5 - 1) / (0 - 1) = 0.5
        assert_relative_eq!(segments[0].end.x, 4.0);
        assert_relative_eq!(segments[0].end.y, 7.0);
    }

    #[test]
    fn corner_positions_follow_the_winding() {
        let [c0, c1, c2, c3] = get_corner_positions(1, 2, 0.5);
        assert_eq!(c0, Point::new(0.5, 1.5));
        assert_eq!(c1, Point::new(1.0, 1.5));
        assert_eq!(c2, Point::new(1.0, 1.0));
        assert_eq!(c3, Point::new(0.5, 1.0));
    }
}
