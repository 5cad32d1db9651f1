use thiserror::Error;

use crate::particle::FLOATS_PER_PARTICLE;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("particle set must contain at least one particle")]
    Empty,
    #[error("packed buffer holds {len} floats, not a multiple of {FLOATS_PER_PARTICLE}")]
    Misaligned { len: usize },
}
