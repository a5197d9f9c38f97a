use chrono::NaiveTime;
use reqwest::Url;

use crate::error::SelectionError;
use crate::ledger::FeedbackValue;
use crate::schema::{ResultSet, SearchResult};

/// Which result, if any, is open in the theater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
  #[default]
  None,
  Selected(usize),
}

impl Selection {
  pub fn index(self) -> Option<usize> {
    match self {
      Selection::None => None,
      Selection::Selected(i) => Some(i),
    }
  }
}

/// What the embedded player should load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerTarget {
  pub media_id: String,
  pub start: u64,
  pub autoplay: bool,
  /// Bumped by every manual restart; a change means the player must re-mount even though the
  /// URL is unchanged.
  pub mount_key: u32,
}

impl PlayerTarget {
  /// `{embed_base}/{media_id}?start={start}&autoplay={0|1}&rel=0`
  pub fn embed_url(&self, embed_base: &Url) -> Url {
    let mut url = embed_base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.pop_if_empty().push(&self.media_id);
    }
    url
      .query_pairs_mut()
      .clear()
      .append_pair("start", &self.start.to_string())
      .append_pair("autoplay", if self.autoplay { "1" } else { "0" })
      .append_pair("rel", "0");
    url
  }
}

/// Selection plus the replay token. Everything else in the theater is derived.
#[derive(Debug, Clone, Default)]
pub struct TheaterController {
  selection: Selection,
  replay: u32,
}

impl TheaterController {
  pub fn selection(&self) -> Selection {
    self.selection
  }

  /// Open result `index` of a set with `len` results.
  ///
  /// Returns `Ok(true)` if the selection changed. Re-picking the open result is a no-op and
  /// keeps its replay state.
  pub fn pick(&mut self, index: usize, len: usize) -> Result<bool, SelectionError> {
    if index >= len {
      return Err(SelectionError::OutOfRange { index, len });
    }
    if self.selection == Selection::Selected(index) {
      return Ok(false);
    }
    self.selection = Selection::Selected(index);
    self.replay = 0;
    Ok(true)
  }

  /// Drop the selection. Called whenever a new result set is applied.
  pub fn clear(&mut self) {
    self.selection = Selection::None;
    self.replay = 0;
  }

  /// Restart the open segment. Returns `false` with nothing selected.
  pub fn restart(&mut self) -> bool {
    if self.selection == Selection::None {
      return false;
    }
    self.replay = self.replay.wrapping_add(1).max(1);
    true
  }

  /// Derive the player target for the open result, if the selection is valid for `results`.
  pub fn target(&self, results: &ResultSet) -> Option<PlayerTarget> {
    let result = results.get(self.selection.index()?)?;
    Some(PlayerTarget {
      media_id: result.media_id.clone(),
      start: result.start,
      autoplay: self.replay > 0,
      mount_key: self.replay,
    })
  }
}

/// Read-only view of the open result.
#[derive(Debug, Clone)]
pub struct Theater<'a> {
  pub index: usize,
  pub result: &'a SearchResult,
  pub feedback: FeedbackValue,
  pub target: PlayerTarget,
}

impl Theater<'_> {
  /// External course links, in display order. `None` means the link is disabled.
  pub fn resources(&self) -> [(&'static str, Option<&Url>); 3] {
    [
      ("Lesson", self.result.lesson.as_ref()),
      ("Forum", self.result.forum.as_ref()),
      ("Course", self.result.course.as_ref()),
    ]
  }
}

/// Format seconds as `HH:MM:SS`, wrapping at 24 hours.
pub fn format_timestamp(secs: u64) -> String {
  let in_day = (secs % 86_400) as u32;
  NaiveTime::from_num_seconds_from_midnight_opt(in_day, 0).map(|t| t.format("%H:%M:%S").to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::SetId;

  fn result(media_id: &str, start: u64) -> SearchResult {
    SearchResult {
      id: format!("{media_id}-{start}"),
      media_id: media_id.to_string(),
      title: "title".to_string(),
      text: "text".to_string(),
      start,
      thumbnail_url: "thumb.jpg".to_string(),
      lesson: None,
      forum: Some(Url::parse("https://forums.fast.ai/t/lesson-1/1").unwrap()),
      course: None,
    }
  }

  fn set() -> ResultSet {
    ResultSet::new(SetId(1), vec![result("aaa", 30), result("bbb", 3725)])
  }

  fn embed_base() -> Url {
    Url::parse("https://www.youtube-nocookie.com/embed").unwrap()
  }

  #[test]
  fn pick_validates_range() {
    let mut t = TheaterController::default();
    assert_eq!(t.pick(2, 2), Err(SelectionError::OutOfRange { index: 2, len: 2 }));
    assert_eq!(t.selection(), Selection::None);
    assert_eq!(t.pick(1, 2), Ok(true));
    assert_eq!(t.selection(), Selection::Selected(1));
  }

  #[test]
  fn target_follows_selection() {
    let mut t = TheaterController::default();
    assert!(t.target(&set()).is_none());
    t.pick(1, 2).unwrap();
    let target = t.target(&set()).unwrap();
    assert_eq!(target.media_id, "bbb");
    assert_eq!(target.start, 3725);
    assert!(!target.autoplay);
  }

  #[test]
  fn embed_url_encodes_target() {
    let target = PlayerTarget { media_id: "aaa".to_string(), start: 30, autoplay: false, mount_key: 0 };
    assert_eq!(
      target.embed_url(&embed_base()).as_str(),
      "https://www.youtube-nocookie.com/embed/aaa?start=30&autoplay=0&rel=0"
    );
    let with_slash = Url::parse("https://www.youtube-nocookie.com/embed/").unwrap();
    assert_eq!(target.embed_url(&with_slash), target.embed_url(&embed_base()));
  }

  #[test]
  fn restart_autoplays_same_url_with_new_mount_key() {
    let mut t = TheaterController::default();
    assert!(!t.restart());
    t.pick(0, 2).unwrap();
    let before = t.target(&set()).unwrap();
    assert!(t.restart());
    let first = t.target(&set()).unwrap();
    assert!(t.restart());
    let second = t.target(&set()).unwrap();

    assert!(first.autoplay);
    assert_eq!(first.embed_url(&embed_base()), second.embed_url(&embed_base()));
    assert_ne!(first.mount_key, second.mount_key);
    assert_ne!(before.embed_url(&embed_base()), first.embed_url(&embed_base()));
    assert_eq!(t.selection(), Selection::Selected(0));
  }

  #[test]
  fn picking_another_result_resets_replay() {
    let mut t = TheaterController::default();
    t.pick(0, 2).unwrap();
    t.restart();
    t.pick(1, 2).unwrap();
    let target = t.target(&set()).unwrap();
    assert!(!target.autoplay);
    assert_eq!(target.mount_key, 0);
  }

  #[test]
  fn repicking_open_result_keeps_replay() {
    let mut t = TheaterController::default();
    t.pick(0, 2).unwrap();
    t.restart();
    assert_eq!(t.pick(0, 2), Ok(false));
    assert!(t.target(&set()).unwrap().autoplay);
  }

  #[test]
  fn clear_drops_selection() {
    let mut t = TheaterController::default();
    t.pick(1, 2).unwrap();
    t.clear();
    assert_eq!(t.selection(), Selection::None);
    assert!(t.target(&set()).is_none());
  }

  #[test]
  fn theater_lists_resources_in_order() {
    let results = set();
    let theater = Theater {
      index: 0,
      result: results.get(0).unwrap(),
      feedback: FeedbackValue::Unset,
      target: PlayerTarget { media_id: "aaa".to_string(), start: 30, autoplay: false, mount_key: 0 },
    };
    let links = theater.resources();
    assert_eq!(links.map(|(label, _)| label), ["Lesson", "Forum", "Course"]);
    assert!(links[0].1.is_none());
    assert!(links[1].1.is_some());
  }

  #[test]
  fn timestamps() {
    assert_eq!(format_timestamp(0), "00:00:00");
    assert_eq!(format_timestamp(754), "00:12:34");
    assert_eq!(format_timestamp(3725), "01:02:05");
    assert_eq!(format_timestamp(86_400 + 61), "00:01:01");
  }
}
