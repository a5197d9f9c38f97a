use reqwest::Url;
use std::fmt::Write as _;

use crate::api::Backend;
use crate::ledger::FeedbackValue;
use crate::session::{Notice, NoticeKind, Session, SessionEvent};
use crate::theater::{Theater, format_timestamp};

// --- Helpers ---

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

fn feedback_marker(value: FeedbackValue) -> &'static str {
  match value {
    FeedbackValue::Positive => "[+]",
    FeedbackValue::Negative => "[-]",
    FeedbackValue::Unset => "   ",
  }
}

// --- Rendering ---

/// The result list, or the error notice that replaces it.
pub fn render_results<B: Backend>(session: &Session<B>) -> String {
  if let Some(err) = session.search_error() {
    return format!("⚠ {err}, please search again.\n");
  }
  let results = session.results();
  if results.is_empty() {
    return match session.query() {
      Some(q) => format!("No results for '{q}'.\n"),
      None => String::new(),
    };
  }

  let selected = session.selection().index();
  let mut out = String::new();
  for (i, result) in results.iter().enumerate() {
    let cursor = if selected == Some(i) { '▶' } else { ' ' };
    let marker = feedback_marker(session.ledger().get(i).unwrap_or_default());
    let _ = writeln!(out, "{cursor}{:>3}. {marker} {}", i + 1, truncate_str(&result.title, 70));
    let _ = writeln!(out, "          {}  {}", format_timestamp(result.start), truncate_str(&result.text, 90));
  }
  out
}

/// The open result: title, player URL, rating and course links.
pub fn render_theater(theater: &Theater<'_>, embed_base: &Url) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "▶ {}", theater.result.title);
  let _ = writeln!(out, "  {}", theater.target.embed_url(embed_base));
  let _ = writeln!(out, "  Restart segment: {}", format_timestamp(theater.target.start));
  let _ = writeln!(out, "  Rating: {}", theater.feedback.label());
  let links: Vec<String> = theater
    .resources()
    .into_iter()
    .map(|(label, url)| match url {
      Some(url) => format!("{label}: {url}"),
      None => format!("{label}: -"),
    })
    .collect();
  let _ = writeln!(out, "  fast.ai  {}", links.join("  "));
  out
}

pub fn render_notice(notice: &Notice) -> String {
  let icon = match notice.kind {
    NoticeKind::Input => "✎",
    NoticeKind::Search | NoticeKind::Feedback => "⚠",
  };
  format!("{icon} {}", notice.message)
}

/// One status line per applied event.
pub fn render_event(event: &SessionEvent) -> String {
  match event {
    SessionEvent::ResultsReady { query: Some(q), count } => format!("{count} results for '{q}'"),
    SessionEvent::ResultsReady { query: None, .. } => "Cleared results".to_string(),
    SessionEvent::SearchFailed(e) => format!("Search failed: {e}"),
    SessionEvent::FeedbackRecorded { index, value } => format!("Rated result {} {}", index + 1, value.label()),
    SessionEvent::FeedbackFailed(e) => format!("Feedback failed: {e}"),
  }
}

pub const HELP: &str = "\
Type search terms and press Enter to search.
  open N      play result N
  up | down   rate the playing result
  restart     restart the segment
  clear       drop the query and results
  list        show results again
  theater     show the playing result
  share       print a link to this search
  wait        wait for pending requests
  dismiss     clear the current message
  help        this text
  quit        exit";
