use thiserror::Error;

use crate::MediaType;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AbrError {
    #[error("invalid value for rule parameter {key}: {value}")]
    InvalidParam { key: String, value: f64 },

    #[error("failed to parse rule parameters: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("quality ladder for {media} is not ordered by ascending bitrate")]
    UnorderedLadder { media: MediaType },
}

pub type AbrResult<T> = Result<T, AbrError>;
