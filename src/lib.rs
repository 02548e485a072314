pub mod contour;
pub mod error;
pub mod field;
pub mod interp;
pub mod kernel;
pub mod plugin;
pub mod skeleton;
pub mod tables;
pub mod types;
pub mod utils;

pub use plugin::ConvolutionSurfacePlugin;
