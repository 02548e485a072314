use derive_more::{Display, From};

use crate::skeleton::BoneId;

pub type Result<T> = core::result::Result<T, ConvolutionError>;

#[derive(Debug, Display, From)]
pub enum ConvolutionError {
    #[display("{_0} does not exist")]
    MissingBone(BoneId),
    #[display("{_0} is used more than once in the same primitive")]
    DuplicateBone(BoneId),
    #[display("grid must be at least 2x2, got {width}x{height}")]
    InvalidGrid { width: usize, height: usize },
    #[display("grid spacing must be positive and finite")]
    InvalidSpacing,
    #[display("kernel exponent must be at least 1, got {_0}")]
    InvalidExponent(u32),
    #[display("kernel sigma must be positive and finite")]
    InvalidSigma,
    #[display("field shape mismatch: {_0}")]
    #[from]
    Shape(ndarray::ShapeError),
}

impl std::error::Error for ConvolutionError {}
