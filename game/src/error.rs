use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key-value store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("could not encode value for key [{key}]: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid has no rows")]
    Empty,
    #[error("row {row} has {len} cells, expected {size}")]
    NotSquare { row: usize, len: usize, size: usize },
    #[error("cell ({row},{col}) holds {value}, which is not 0 or a power of two >= 2")]
    InvalidTile { row: usize, col: usize, value: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown direction [{0}]")]
    Direction(String),
    #[error("unknown game mode [{0}]")]
    Mode(String),
    #[error("malformed date key [{0}], expected YYYY-MM-DD")]
    DateKey(String),
}
