use ndarray::Array2;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    error::{ConvolutionError, Result},
    kernel::Kernel,
    skeleton::{Bone, Segment, resolve_segments},
    types::{Point, Value},
};

/// Dimensions of the sampling grid.
///
/// The grid has `width × height` sample points; sample `(x, y)` sits at
/// `(x · spacing, y · spacing)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    /// Number of samples along X. Default: `150`.
    pub width: usize,
    /// Number of samples along Y. Default: `150`.
    pub height: usize,
    /// Distance between neighbouring samples. Default: `1.0`.
    pub spacing: Value,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            width: 150,
            height: 150,
            spacing: 1.0,
        }
    }
}

impl GridSpec {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Sets the distance between neighbouring samples.
    pub fn with_spacing(mut self, spacing: Value) -> Self {
        self.spacing = spacing;
        self
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that the grid holds at least one cell and has a usable spacing.
    pub fn validate(&self) -> Result<()> {
        if self.width < 2 || self.height < 2 {
            return Err(ConvolutionError::InvalidGrid {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.spacing.is_finite() && self.spacing > 0.0) {
            return Err(ConvolutionError::InvalidSpacing);
        }
        Ok(())
    }

    /// Maps a flat row-major index to its `(x, y)` grid coordinates.
    #[inline]
    pub fn coords(&self, n: usize) -> (usize, usize) {
        (n % self.width, n / self.width)
    }

    /// World-space position of sample `(x, y)`.
    #[inline]
    pub fn position(&self, x: usize, y: usize) -> Point {
        Point::new(x as Value * self.spacing, y as Value * self.spacing)
    }
}

/// A dense scalar field sampled on a [`GridSpec`].
///
/// Values are stored row-major: sample `(x, y)` lives at flat index `y * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    grid: GridSpec,
    values: Array2<Value>,
}

impl ScalarField {
    /// Creates a field of zeros.
    pub fn zeros(grid: GridSpec) -> Self {
        Self {
            grid,
            values: Array2::zeros((grid.height, grid.width)),
        }
    }

    /// Wraps row-major `values`. Fails if `values.len() != width * height`.
    pub fn from_vec(grid: GridSpec, values: Vec<Value>) -> Result<Self> {
        let values = Array2::from_shape_vec((grid.height, grid.width), values)?;
        Ok(Self { grid, values })
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn width(&self) -> usize {
        self.grid.width
    }

    pub fn height(&self) -> usize {
        self.grid.height
    }

    /// Returns the value of sample `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Value {
        self.values[[y, x]]
    }

    /// Sets the value of sample `(x, y)`.
    pub fn set(&mut self, x: usize, y: usize, v: Value) {
        self.values[[y, x]] = v
    }

    /// The samples as a `(height, width)` array.
    pub fn values(&self) -> &Array2<Value> {
        &self.values
    }

    /// The samples as a flat row-major slice.
    pub fn as_slice(&self) -> Option<&[Value]> {
        self.values.as_slice()
    }
}

/// Samples the summed potential of every segment on `grid`.
///
/// Each sample starts at zero and receives one [`Kernel::potential`] contribution
/// per segment, using the radii of the segment's two bones. Segments that
/// reference an empty bone slot are skipped. Samples are evaluated in parallel;
/// within a sample the segments are summed in order, so the result is deterministic.
pub fn accumulate(
    bones: &[Option<Bone>],
    segments: &[Segment],
    grid: GridSpec,
    kernel: &Kernel,
) -> Result<ScalarField> {
    grid.validate()?;
    kernel.validate()?;

    let primitives: Vec<(Bone, Bone)> = resolve_segments(bones, segments).collect();
    let skipped = segments.len() - primitives.len();
    if skipped > 0 {
        tracing::debug!(skipped, "skipping segments with an empty bone slot");
    }
    tracing::debug!(
        segments = primitives.len(),
        width = grid.width,
        height = grid.height,
        "accumulating convolution field"
    );

    if primitives.is_empty() {
        return Ok(ScalarField::zeros(grid));
    }

    let values: Vec<Value> = (0..grid.len())
        .into_par_iter()
        .map(|n| {
            let (x, y) = grid.coords(n);
            let p = grid.position(x, y);
            primitives.iter().fold(0.0, |sum, (a, b)| {
                sum + kernel.potential(a.position, a.radius, b.position, b.radius, p)
            })
        })
        .collect();

    ScalarField::from_vec(grid, values)
}
