use std::fmt::{self, Display, Formatter};

/// The error type for everything that can go wrong in a simulation run.
///
/// Configuration problems are reported before the first simulated day;
/// an `Invariant` means a compartment transition was attempted out of
/// order, which is a programming defect and aborts the run rather than
/// silently corrupting the epidemic counts.
#[derive(Debug)]
pub enum EpinetError {
    Config(String),
    Invariant(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
}

impl Display for EpinetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EpinetError::Config(message) => write!(f, "configuration error: {message}"),
            EpinetError::Invariant(message) => write!(f, "invariant violation: {message}"),
            EpinetError::Io(error) => write!(f, "io error: {error}"),
            EpinetError::Json(error) => write!(f, "json error: {error}"),
            EpinetError::Csv(error) => write!(f, "csv error: {error}"),
        }
    }
}

impl std::error::Error for EpinetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EpinetError::Io(error) => Some(error),
            EpinetError::Json(error) => Some(error),
            EpinetError::Csv(error) => Some(error),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EpinetError {
    fn from(error: std::io::Error) -> Self {
        EpinetError::Io(error)
    }
}

impl From<serde_json::Error> for EpinetError {
    fn from(error: serde_json::Error) -> Self {
        EpinetError::Json(error)
    }
}

impl From<csv::Error> for EpinetError {
    fn from(error: csv::Error) -> Self {
        EpinetError::Csv(error)
    }
}
