use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
  /// Rejected before any mutation took place.
  #[error("Invalid argument: {0}")]
  InvalidArgument(String),

  /// A command was run or undone in the wrong lifecycle state.
  #[error("Illegal state: {0}")]
  IllegalState(String),

  #[error("Parse error in line {line}: {message}")]
  Parse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn invalid<T, S: Into<String>>(message: S) -> Result<T> {
  return Err(Error::InvalidArgument(message.into()));
}
