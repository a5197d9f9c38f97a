/// A user's rating of one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackValue {
  Positive,
  Negative,
  #[default]
  Unset,
}

impl FeedbackValue {
  /// Wire encoding (`1` / `-1`). `Unset` is never sent.
  pub fn wire(self) -> Option<i8> {
    match self {
      FeedbackValue::Positive => Some(1),
      FeedbackValue::Negative => Some(-1),
      FeedbackValue::Unset => None,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      FeedbackValue::Positive => "positive",
      FeedbackValue::Negative => "negative",
      FeedbackValue::Unset => "unset",
    }
  }
}

/// Per-result feedback, index-aligned with the current result set.
///
/// Rebuilt with [`FeedbackLedger::reset`] every time a new result set is applied, so its length
/// always matches the set it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackLedger {
  entries: Vec<FeedbackValue>,
}

impl FeedbackLedger {
  pub fn reset(size: usize) -> Self {
    Self { entries: vec![FeedbackValue::Unset; size] }
  }

  pub fn get(&self, index: usize) -> Option<FeedbackValue> {
    self.entries.get(index).copied()
  }

  /// Record an acknowledged rating. Out-of-range writes are ignored and return `false`.
  pub fn set(&mut self, index: usize, value: FeedbackValue) -> bool {
    match self.entries.get_mut(index) {
      Some(entry) => {
        *entry = value;
        true
      }
      None => false,
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn as_slice(&self) -> &[FeedbackValue] {
    &self.entries
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use FeedbackValue::*;

  #[test]
  fn reset_is_all_unset() {
    assert_eq!(FeedbackLedger::reset(3).as_slice(), &[Unset, Unset, Unset]);
    assert!(FeedbackLedger::reset(0).is_empty());
  }

  #[test]
  fn set_updates_one_entry() {
    let mut ledger = FeedbackLedger::reset(2);
    assert!(ledger.set(1, Negative));
    assert_eq!(ledger.as_slice(), &[Unset, Negative]);
    assert_eq!(ledger.get(1), Some(Negative));
  }

  #[test]
  fn set_out_of_range_is_ignored() {
    let mut ledger = FeedbackLedger::reset(1);
    assert!(!ledger.set(1, Positive));
    assert_eq!(ledger.as_slice(), &[Unset]);
    assert_eq!(ledger.get(5), None);
  }

  #[test]
  fn wire_values() {
    assert_eq!(Positive.wire(), Some(1));
    assert_eq!(Negative.wire(), Some(-1));
    assert_eq!(Unset.wire(), None);
  }
}
