//! Error type for the few fallible operations: config I/O and starting the
//! render thread. Everything geometric is clamped instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("could not serialize config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
    #[error("could not start render thread: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
