use bevy::prelude::*;

use crate::{
    contour::Contour,
    field::{GridSpec, ScalarField},
    kernel::Kernel,
    skeleton::Skeleton,
    types::Value,
};

/// System sets for the convolution surface pipeline.
///
/// Use these to order your own systems relative to the field rebuild:
///
/// ```rust,ignore
/// // Edit the skeleton before the field is sampled, draw after the contour is ready:
/// app.add_systems(Update, (
///     edit_skeleton.before(ConvolutionSet::Accumulate),
///     draw_contour.after(ConvolutionSet::Extract),
/// ));
/// ```
///
/// ```text
/// ConvolutionSet::Accumulate  →  ConvolutionSet::Extract  →  [your systems]
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConvolutionSet {
    /// Samples the [`Skeleton`] into [`SurfaceField`].
    Accumulate,
    /// Runs marching squares on [`SurfaceField`] into [`SurfaceContour`].
    Extract,
}

/// Runtime configuration of the convolution surface.
///
/// Inserted as a resource by [`ConvolutionSurfacePlugin`]. Modify it at any time;
/// the field and contour are rebuilt on the next frame:
///
/// ```rust,ignore
/// fn thicken(mut config: ResMut<SurfaceConfig>) {
///     config.isolevel = 0.5;
/// }
/// ```
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    /// Sampling grid. Default: `150 × 150`, spacing `1`.
    pub grid: GridSpec,
    /// Segment kernel. Default: exponent `2`, sigma `1`, normalised.
    pub kernel: Kernel,
    /// Level of the extracted contour. Default: `1.0`.
    pub isolevel: Value,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            kernel: Kernel::default(),
            isolevel: 1.0,
        }
    }
}

/// The most recently sampled field, or `None` until the first rebuild succeeds.
#[derive(Resource, Debug, Clone, Default)]
pub struct SurfaceField(pub Option<ScalarField>);

/// The most recently extracted contour, ready to be drawn.
#[derive(Resource, Debug, Clone, Default)]
pub struct SurfaceContour(pub Contour);

/// Bevy plugin that keeps a convolution surface contour in sync with a [`Skeleton`].
///
/// When the `auto_update` feature is enabled, the field and its contour are
/// rebuilt from scratch in `Update` whenever the [`Skeleton`] or the
/// [`SurfaceConfig`] resource changes:
///
/// ```text
/// Skeleton / SurfaceConfig changed
///   → SurfaceField rebuilt      (ConvolutionSet::Accumulate)
///   → SurfaceContour rebuilt    (ConvolutionSet::Extract)
///   → [your drawing systems here]
/// ```
pub struct ConvolutionSurfacePlugin {
    /// Initial value for [`SurfaceConfig::grid`].
    pub grid: GridSpec,
    /// Initial value for [`SurfaceConfig::kernel`].
    pub kernel: Kernel,
    /// Initial value for [`SurfaceConfig::isolevel`].
    pub isolevel: Value,
    /// Radius of bones added to the [`Skeleton`] without an explicit radius.
    pub default_radius: Value,
}

impl Default for ConvolutionSurfacePlugin {
    fn default() -> Self {
        let config = SurfaceConfig::default();
        Self {
            grid: config.grid,
            kernel: config.kernel,
            isolevel: config.isolevel,
            default_radius: Skeleton::default().default_radius,
        }
    }
}

impl Plugin for ConvolutionSurfacePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SurfaceConfig {
            grid: self.grid,
            kernel: self.kernel,
            isolevel: self.isolevel,
        })
        .insert_resource(Skeleton::new(self.default_radius))
        .init_resource::<SurfaceField>()
        .init_resource::<SurfaceContour>();

        #[cfg(feature = "auto_update")]
        app.configure_sets(
            Update,
            (ConvolutionSet::Accumulate, ConvolutionSet::Extract).chain(),
        )
        .add_systems(
            Update,
            (
                accumulate_field.in_set(ConvolutionSet::Accumulate).run_if(
                    resource_changed::<Skeleton>.or(resource_changed::<SurfaceConfig>),
                ),
                extract_contour
                    .in_set(ConvolutionSet::Extract)
                    .run_if(resource_changed::<SurfaceField>),
            ),
        );
    }
}

/// Resamples the [`Skeleton`] into [`SurfaceField`].
///
/// On an invalid configuration the error is logged and the field is cleared.
pub fn accumulate_field(
    skeleton: Res<Skeleton>,
    config: Res<SurfaceConfig>,
    mut field: ResMut<SurfaceField>,
) {
    match skeleton.field(config.grid, &config.kernel) {
        Ok(sampled) => field.0 = Some(sampled),
        Err(err) => {
            tracing::error!("could not sample convolution field: {err}");
            field.0 = None;
        }
    }
}

/// Runs marching squares on [`SurfaceField`] into [`SurfaceContour`].
pub fn extract_contour(
    field: Res<SurfaceField>,
    config: Res<SurfaceConfig>,
    mut contour: ResMut<SurfaceContour>,
) {
    contour.0 = match &field.0 {
        Some(sampled) => Contour::extract(sampled, config.isolevel),
        None => Contour {
            isolevel: config.isolevel,
            segments: Vec::new(),
        },
    };
}
