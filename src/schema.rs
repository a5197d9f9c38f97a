use reqwest::Url;
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// A single media segment returned by the search endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
  /// Unique within one result set; sent back as `result_id` with feedback.
  pub id: String,
  pub media_id: String,
  pub title: String,
  pub text: String,
  /// Segment offset in whole seconds.
  pub start: u64,
  pub thumbnail_url: String,
  pub lesson: Option<Url>,
  pub forum: Option<Url>,
  pub course: Option<Url>,
}

/// Identity of a result set. Issued by the session, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(pub(crate) u64);

/// Results for one query, in rank order. Replaced wholesale, never edited.
#[derive(Debug, Clone)]
pub struct ResultSet {
  id: SetId,
  results: Vec<SearchResult>,
}

impl ResultSet {
  pub(crate) fn new(id: SetId, results: Vec<SearchResult>) -> Self {
    Self { id, results }
  }

  pub fn id(&self) -> SetId {
    self.id
  }

  pub fn get(&self, index: usize) -> Option<&SearchResult> {
    self.results.get(index)
  }

  pub fn len(&self) -> usize {
    self.results.len()
  }

  pub fn is_empty(&self) -> bool {
    self.results.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, SearchResult> {
    self.results.iter()
  }
}

/// Validate a decoded search response into typed results.
///
/// Fail-closed: the first bad element rejects the whole payload, nothing is defaulted or skipped.
pub fn validate(raw: &Value) -> Result<Vec<SearchResult>, ValidationError> {
  let items = raw.as_array().ok_or(ValidationError::NotAList)?;
  items.iter().enumerate().map(|(index, item)| validate_item(index, item)).collect()
}

fn validate_item(index: usize, item: &Value) -> Result<SearchResult, ValidationError> {
  let obj = item.as_object().ok_or(ValidationError::NotAnObject { index })?;
  let fields = Fields { index, obj };

  Ok(SearchResult {
    id: fields.id()?,
    media_id: fields.string(&["video_id", "mediaId"])?,
    title: fields.string(&["title"])?,
    text: fields.string(&["text"])?,
    start: fields.start()?,
    thumbnail_url: fields.string(&["thumbnail", "thumbnailUrl"])?,
    lesson: fields.reference("lesson")?,
    forum: fields.reference("forum")?,
    course: fields.reference("course")?,
  })
}

struct Fields<'a> {
  index: usize,
  obj: &'a Map<String, Value>,
}

impl Fields<'_> {
  /// Look a field up under its wire name or any accepted alias.
  /// Explicit `null` counts as missing for required fields.
  fn required(&self, names: &[&'static str]) -> Result<(&'static str, &Value), ValidationError> {
    names
      .iter()
      .find_map(|name| self.obj.get(*name).filter(|v| !v.is_null()).map(|v| (*name, v)))
      .ok_or(ValidationError::MissingField { index: self.index, field: names[0] })
  }

  fn string(&self, names: &[&'static str]) -> Result<String, ValidationError> {
    let (field, value) = self.required(names)?;
    value
      .as_str()
      .map(str::to_string)
      .ok_or(ValidationError::WrongType { index: self.index, field, expected: "a string" })
  }

  /// The service emits integer ids; older revisions emit strings. Both normalize to a string.
  fn id(&self) -> Result<String, ValidationError> {
    let (field, value) = self.required(&["id"])?;
    match value {
      Value::String(s) => Ok(s.clone()),
      Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
      _ => Err(ValidationError::WrongType { index: self.index, field, expected: "a string or integer" }),
    }
  }

  fn start(&self) -> Result<u64, ValidationError> {
    let (field, value) = self.required(&["start"])?;
    let wrong = ValidationError::WrongType { index: self.index, field, expected: "a non-negative number of seconds" };
    if let Some(secs) = value.as_u64() {
      return Ok(secs);
    }
    match value.as_f64() {
      Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs.floor() as u64),
      _ => Err(wrong),
    }
  }

  /// Optional link: missing, `null` or `""` is absent; anything else must be an absolute URL.
  fn reference(&self, field: &'static str) -> Result<Option<Url>, ValidationError> {
    match self.obj.get(field) {
      None | Some(Value::Null) => Ok(None),
      Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
      Some(Value::String(s)) => {
        Url::parse(s).map(Some).map_err(|_| ValidationError::InvalidUrl { index: self.index, field })
      }
      Some(_) => Err(ValidationError::WrongType { index: self.index, field, expected: "a string or null" }),
    }
  }
}
