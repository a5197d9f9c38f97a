//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Backend
  pub api_base: String,
  pub search_path: String,
  pub feedback_path: String,
  pub request_timeout_secs: u64,

  // Player / sharing
  pub embed_base: String,
  pub share_base: String,
  pub share_query_param: String,

  // Interaction loop
  pub poll_interval_ms: u64,
  pub notice_ttl_secs: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is caught by the tests below.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert_eq!(c.search_path, "/api/search");
    assert_eq!(c.feedback_path, "/api/feedback");
    assert_eq!(c.share_query_param, "q");
    assert!(c.request_timeout_secs > 0);
    assert!(c.poll_interval_ms > 0);
  }
}
