use reqwest::Url;
use std::fmt;
use tracing::{debug, warn};

use crate::error::ValidationError;

/// A trimmed, non-empty search query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query(String);

impl Query {
  pub fn parse(raw: &str) -> Result<Self, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return Err(ValidationError::EmptyQuery);
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Query {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Owns the current query and mirrors it into a shareable URL.
#[derive(Debug, Clone)]
pub struct QueryState {
  current: Option<Query>,
  share_base: Url,
  param: String,
}

impl QueryState {
  pub fn new(share_base: Url, param: impl Into<String>) -> Self {
    Self { current: None, share_base, param: param.into() }
  }

  pub fn current(&self) -> Option<&Query> {
    self.current.as_ref()
  }

  /// Replace the query with `raw` if it is valid. On error the previous query is kept.
  pub fn submit(&mut self, raw: &str) -> Result<&Query, ValidationError> {
    let query = Query::parse(raw)?;
    Ok(&*self.current.insert(query))
  }

  pub fn clear(&mut self) {
    self.current = None;
  }

  /// Shareable URL reproducing the current query. Without a query the parameter is omitted.
  pub fn share_url(&self) -> Url {
    let mut url = self.share_base.clone();
    let kept: Vec<(String, String)> =
      url.query_pairs().filter(|(k, _)| *k != self.param).map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
    url.set_query(None);
    if !kept.is_empty() || self.current.is_some() {
      let mut pairs = url.query_pairs_mut();
      pairs.extend_pairs(kept);
      if let Some(ref query) = self.current {
        pairs.append_pair(&self.param, query.as_str());
      }
    }
    url
  }

  /// Restore the query from a share URL. Invalid or missing values leave no query.
  pub fn restore_from_url(&mut self, url: &Url) -> Option<&Query> {
    let raw = url.query_pairs().find(|(k, _)| *k == self.param).map(|(_, v)| v.into_owned());
    self.restore_raw(raw.as_deref())
  }

  /// Like [`restore_from_url`](Self::restore_from_url) but for unparsed input.
  pub fn restore_from_str(&mut self, raw_url: &str) -> Option<&Query> {
    match Url::parse(raw_url) {
      Ok(url) => self.restore_from_url(&url),
      Err(e) => {
        warn!(err = %e, url = raw_url, "query: ignoring unparseable share URL");
        self.current = None;
        None
      }
    }
  }

  /// Restore from a bare stored value, with the same validation as a manual submission.
  pub fn restore_raw(&mut self, raw: Option<&str>) -> Option<&Query> {
    self.current = match raw.map(Query::parse) {
      Some(Ok(query)) => {
        debug!(query = %query, "query: restored");
        Some(query)
      }
      Some(Err(e)) => {
        warn!(err = %e, "query: stored value is not a valid query, starting empty");
        None
      }
      None => None,
    };
    self.current.as_ref()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn state() -> QueryState {
    QueryState::new(Url::parse("https://fastsearch.danteoz.com/").unwrap(), "q")
  }

  #[test]
  fn parse_trims() {
    assert_eq!(Query::parse("  neural nets \n").unwrap().as_str(), "neural nets");
  }

  #[test]
  fn parse_rejects_blank() {
    assert_eq!(Query::parse("").unwrap_err(), ValidationError::EmptyQuery);
    assert_eq!(Query::parse(" \t ").unwrap_err(), ValidationError::EmptyQuery);
  }

  #[test]
  fn failed_submit_keeps_previous_query() {
    let mut s = state();
    s.submit("transformers").unwrap();
    assert!(s.submit("   ").is_err());
    assert_eq!(s.current().map(Query::as_str), Some("transformers"));
  }

  #[test]
  fn submit_replaces_query() {
    let mut s = state();
    s.submit("a").unwrap();
    s.submit(" b ").unwrap();
    assert_eq!(s.current().map(Query::as_str), Some("b"));
  }

  #[test]
  fn share_url_encodes_query() {
    let mut s = state();
    assert_eq!(s.share_url().as_str(), "https://fastsearch.danteoz.com/");
    s.submit("neural nets & SGD").unwrap();
    assert_eq!(s.share_url().as_str(), "https://fastsearch.danteoz.com/?q=neural+nets+%26+SGD");
  }

  #[test]
  fn share_url_preserves_other_params() {
    let mut s = QueryState::new(Url::parse("https://example.com/search?lang=en&q=old").unwrap(), "q");
    s.submit("new").unwrap();
    assert_eq!(s.share_url().as_str(), "https://example.com/search?lang=en&q=new");
  }

  #[test]
  fn share_url_round_trips_through_restore() {
    let mut s = state();
    s.submit("  lesson 3 ").unwrap();
    let url = s.share_url();

    let mut restored = state();
    assert_eq!(restored.restore_from_url(&url).map(Query::as_str), Some("lesson 3"));
  }

  #[test]
  fn restore_treats_invalid_values_as_absent() {
    let mut s = state();
    assert!(s.restore_from_str("https://fastsearch.danteoz.com/?q=%20%20").is_none());
    assert!(s.restore_from_str("https://fastsearch.danteoz.com/").is_none());
    assert!(s.restore_from_str("not a url").is_none());
    assert!(s.current().is_none());
  }
}
