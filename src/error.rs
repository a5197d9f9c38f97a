//! Error taxonomy for the search session.
//!
//! None of these are fatal: each one is surfaced to the user and cleared by retrying the action
//! that produced it.

use thiserror::Error;

/// Malformed query input or a malformed search response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("enter search terms")]
  EmptyQuery,

  #[error("response is not valid JSON: {0}")]
  NotJson(String),

  #[error("response is not a list of results")]
  NotAList,

  #[error("result {index} is not an object")]
  NotAnObject { index: usize },

  #[error("result {index}: missing field `{field}`")]
  MissingField { index: usize, field: &'static str },

  #[error("result {index}: field `{field}` must be {expected}")]
  WrongType { index: usize, field: &'static str, expected: &'static str },

  #[error("result {index}: field `{field}` is not a valid URL")]
  InvalidUrl { index: usize, field: &'static str },
}

/// The search request failed or returned something unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// Non-2xx response. Displays like `404 | Not Found`.
  #[error("{status} | {reason}")]
  Status { status: u16, reason: String },

  #[error("search request failed: {0}")]
  Transport(String),

  #[error("malformed search response: {0}")]
  Invalid(#[from] ValidationError),

  #[error("search task ended without a response")]
  Interrupted,
}

/// The feedback write failed. The ledger is left untouched so a retry is safe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
  #[error("{status} | {reason}")]
  Status { status: u16, reason: String },

  #[error("feedback request failed: {0}")]
  Transport(String),

  #[error("feedback task ended without a response")]
  Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
  #[error("no result {index}: only {len} results")]
  OutOfRange { index: usize, len: usize },
}
