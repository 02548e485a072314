use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    field::ScalarField,
    types::{LineSegment, Value},
    utils::{get_corner_positions, get_corner_values, polygonize_cell},
};

/// Isocontour of a [`ScalarField`]: raw marching squares segments, one or two per
/// crossed cell, in row-major cell order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contour {
    /// Level the contour was extracted at.
    pub isolevel: Value,
    /// Undirected line segments; not stitched into polylines.
    pub segments: Vec<LineSegment>,
}

impl Contour {
    /// Extracts the contour of `field` at `isolevel`.
    ///
    /// Work is parallelised over rows of cells using Rayon; the segment order is
    /// the same as [`IsoLines`] would produce.
    pub fn extract(field: &ScalarField, isolevel: Value) -> Self {
        Self {
            isolevel,
            segments: extract_par(field, isolevel),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Lazily walks every cell of a field and yields the segments of its isocontour.
///
/// Cells are visited row by row, `(width - 1) × (height - 1)` in total.
///
/// ```rust,ignore
/// for segment in IsoLines::new(&field, 1.0) {
///     draw_line(segment.start, segment.end);
/// }
/// ```
pub struct IsoLines<'a> {
    field: &'a ScalarField,
    isolevel: Value,
    x: usize,
    y: usize,
    pending: Vec<LineSegment>,
}

impl<'a> IsoLines<'a> {
    pub fn new(field: &'a ScalarField, isolevel: Value) -> Self {
        Self {
            field,
            isolevel,
            x: 0,
            y: 0,
            pending: Vec::with_capacity(2),
        }
    }
}

impl Iterator for IsoLines<'_> {
    type Item = LineSegment;

    fn next(&mut self) -> Option<LineSegment> {
        let cells_x = self.field.width().saturating_sub(1);
        let cells_y = self.field.height().saturating_sub(1);

        loop {
            if let Some(segment) = self.pending.pop() {
                return Some(segment);
            }
            if cells_x == 0 || self.y >= cells_y {
                return None;
            }

            let mut segments = march_cell(self.field, self.x, self.y, self.isolevel);
            // pop() takes from the back
            segments.reverse();
            self.pending = segments;

            self.x += 1;
            if self.x == cells_x {
                self.x = 0;
                self.y += 1;
            }
        }
    }
}

#[inline]
fn march_cell(field: &ScalarField, x: usize, y: usize, isolevel: Value) -> Vec<LineSegment> {
    let corner_positions = get_corner_positions(x, y, field.grid().spacing);
    let corner_values = get_corner_values(field, x, y);
    polygonize_cell(&corner_positions, &corner_values, isolevel)
}

/// Runs marching squares over every cell of `field`, one Rayon task per row of cells.
///
/// Rows are merged in order, so the output matches [`IsoLines`].
pub fn extract_par(field: &ScalarField, isolevel: Value) -> Vec<LineSegment> {
    let cells_x = field.width().saturating_sub(1);
    let cells_y = field.height().saturating_sub(1);

    let per_row: Vec<Vec<LineSegment>> = (0..cells_y)
        .into_par_iter()
        .map(|y| {
            (0..cells_x)
                .flat_map(|x| march_cell(field, x, y, isolevel))
                .collect()
        })
        .collect();

    let total: usize = per_row.iter().map(Vec::len).sum();
    let mut segments = Vec::with_capacity(total);
    for mut row in per_row {
        segments.append(&mut row);
    }

    tracing::debug!(segments = total, isolevel, "extracted isocontour");
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        field::GridSpec,
        kernel::Kernel,
        skeleton::Skeleton,
        types::Point,
    };
    use approx::assert_relative_eq;

    fn capsule_field() -> ScalarField {
        let mut skeleton = Skeleton::default();
        let a = skeleton.add_bone(Point::new(10.5, 15.3));
        let b = skeleton.add_bone(Point::new(30.5, 15.3));
        skeleton.add_segment(a, b).unwrap();
        skeleton.field(GridSpec::new(41, 31), &Kernel::default()).unwrap()
    }

    #[test]
    fn zero_field_has_no_contour() {
        let field = ScalarField::zeros(GridSpec::new(12, 9));
        assert_eq!(IsoLines::new(&field, 1.0).count(), 0);
        assert!(Contour::extract(&field, 1.0).is_empty());
    }

    #[test]
    fn single_checkerboard_cell_gives_two_segments() {
        let mut field = ScalarField::zeros(GridSpec::new(2, 2));
        field.set(0, 0, 2.0);
        field.set(1, 1, 2.0);
        let segments: Vec<_> = IsoLines::new(&field, 1.0).collect();
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn sequential_and_parallel_extraction_agree() {
        let field = capsule_field();
        let lazy: Vec<_> = IsoLines::new(&field, 1.0).collect();
        let contour = Contour::extract(&field, 1.0);

        assert!(!lazy.is_empty());
        assert_eq!(lazy, contour.segments);
        assert_eq!(contour.isolevel, 1.0);
    }

    #[test]
    fn capsule_contour_follows_the_isolevel() {
        let field = capsule_field();
        let contour = Contour::extract(&field, 1.0);
        let kernel = Kernel::default();
        let (a, b) = (Point::new(10.5, 15.3), Point::new(30.5, 15.3));

        // Beside the middle of the segment the contour runs parallel to its axis,
        // so the crossings are interpolated along short vertical edges only.
        let beside_middle: Vec<Point> = contour
            .segments
            .iter()
            .flat_map(|s| [s.start, s.end])
            .filter(|p| (p.x - 20.5).abs() < 3.0)
            .collect();
        assert!(!beside_middle.is_empty());
        for p in beside_middle {
            assert!((p.y - 15.3).abs() < 5.0, "{p}");
            assert_relative_eq!(kernel.potential(a, 5.0, b, 5.0, p), 1.0, max_relative = 0.05);
        }
    }

    #[test]
    fn contour_points_stay_inside_the_grid() {
        let field = capsule_field();
        for s in IsoLines::new(&field, 1.0) {
            for p in [s.start, s.end] {
                assert!((0.0..=40.0).contains(&p.x));
                assert!((0.0..=30.0).contains(&p.y));
            }
        }
    }

    #[test]
    fn spacing_scales_the_contour() {
        let mut field = ScalarField::zeros(GridSpec::new(3, 3).with_spacing(4.0));
        field.set(1, 1, 2.0);
        let segments: Vec<_> = IsoLines::new(&field, 1.0).collect();

        // A single high sample is surrounded by a diamond of four segments.
        assert_eq!(segments.len(), 4);
        for s in segments {
            assert_relative_eq!(s.length(), 8.0_f64.sqrt(), max_relative = 1e-12);
        }
    }
}
