pub mod password;

pub use password::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Unsupported password hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Malformed password hash")]
    MalformedHash,
}
