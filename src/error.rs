use thiserror::Error;

/// Errors raised by configuration-time I/O (coefficient and lookup-table
/// files). The streaming path never returns errors; invalid runtime
/// configuration is clamped at the setters instead.
#[derive(Error, Debug)]
pub enum CoeffIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, CoeffIoError>;
