use reqwest::Url;

use crate::api::Backend;
use crate::ledger::FeedbackValue;
use crate::session::{RateOutcome, Session};
use crate::ui;

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  /// Anything that isn't a command word is search input, including a blank line.
  Search(String),
  /// 0-based index of the result to open.
  Open(usize),
  BadOpen(String),
  Rate(FeedbackValue),
  Restart,
  /// Back to an empty session with no query.
  Clear,
  List,
  Theater,
  Share,
  Wait,
  Dismiss,
  Help,
  Quit,
}

impl Command {
  pub fn parse(line: &str) -> Self {
    let trimmed = line.trim();
    let (word, rest) = trimmed.split_once(char::is_whitespace).map_or((trimmed, ""), |(w, r)| (w, r.trim()));

    match (word.to_lowercase().as_str(), rest) {
      ("open", arg) if !arg.is_empty() => match arg.parse::<usize>() {
        Ok(n) if n > 0 => Command::Open(n - 1),
        _ => Command::BadOpen(arg.to_string()),
      },
      ("up", "") | ("+", "") => Command::Rate(FeedbackValue::Positive),
      ("down", "") | ("-", "") => Command::Rate(FeedbackValue::Negative),
      ("restart", "") => Command::Restart,
      ("clear", "") => Command::Clear,
      ("list", "") => Command::List,
      ("theater", "") => Command::Theater,
      ("share", "") => Command::Share,
      ("wait", "") => Command::Wait,
      ("dismiss", "") => Command::Dismiss,
      ("help", "") | ("?", "") => Command::Help,
      ("quit", "") | ("exit", "") => Command::Quit,
      _ => Command::Search(line.to_string()),
    }
  }
}

/// What the run loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
  Continue,
  /// Block until in-flight requests finish, then continue.
  Settle,
  Quit,
}

/// Apply a command to the session and return the text to print.
pub fn handle_command<B: Backend>(session: &mut Session<B>, command: Command, embed_base: &Url) -> (Flow, String) {
  let text = match command {
    Command::Search(raw) => match session.submit_query(&raw) {
      Ok(()) if session.is_searching() => format!("Searching '{}'…", raw.trim()),
      Ok(()) => ui::render_results(session),
      Err(_) => session.notice().map(ui::render_notice).unwrap_or_default(),
    },
    Command::Open(index) => match session.select(index) {
      Ok(()) => session.theater().map(|t| ui::render_theater(&t, embed_base)).unwrap_or_default(),
      Err(e) => e.to_string(),
    },
    Command::BadOpen(arg) => format!("Not a result number: {arg}"),
    Command::Rate(value) => match session.rate(value) {
      RateOutcome::Submitted => "Sending feedback…".to_string(),
      RateOutcome::NoSelection => "Open a result first.".to_string(),
      RateOutcome::Unchanged => format!("Already rated {}.", value.label()),
      RateOutcome::InFlight => "Feedback already on its way.".to_string(),
      RateOutcome::NotARating => String::new(),
    },
    Command::Restart => {
      if session.restart_segment() {
        session.theater().map(|t| ui::render_theater(&t, embed_base)).unwrap_or_default()
      } else {
        "Open a result first.".to_string()
      }
    }
    Command::Clear => {
      session.reset();
      "Cleared.".to_string()
    }
    Command::List => ui::render_results(session),
    Command::Theater => {
      session.theater().map(|t| ui::render_theater(&t, embed_base)).unwrap_or_else(|| "Nothing playing.".to_string())
    }
    Command::Share => session.share_url().to_string(),
    Command::Wait => return (Flow::Settle, String::new()),
    Command::Dismiss => {
      session.dismiss_notice();
      String::new()
    }
    Command::Help => ui::HELP.to_string(),
    Command::Quit => return (Flow::Quit, String::new()),
  };
  (Flow::Continue, text)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_commands() {
    assert_eq!(Command::parse("open 3"), Command::Open(2));
    assert_eq!(Command::parse("  OPEN   1 "), Command::Open(0));
    assert_eq!(Command::parse("up"), Command::Rate(FeedbackValue::Positive));
    assert_eq!(Command::parse("-"), Command::Rate(FeedbackValue::Negative));
    assert_eq!(Command::parse("restart"), Command::Restart);
    assert_eq!(Command::parse("clear"), Command::Clear);
    assert_eq!(Command::parse("quit"), Command::Quit);
    assert_eq!(Command::parse("?"), Command::Help);
  }

  #[test]
  fn bad_open_arguments() {
    assert_eq!(Command::parse("open 0"), Command::BadOpen("0".to_string()));
    assert_eq!(Command::parse("open two"), Command::BadOpen("two".to_string()));
  }

  #[test]
  fn other_text_is_search_input() {
    assert_eq!(Command::parse("neural nets"), Command::Search("neural nets".to_string()));
    assert_eq!(Command::parse("open"), Command::Search("open".to_string()));
    assert_eq!(Command::parse("list comprehension"), Command::Search("list comprehension".to_string()));
    assert_eq!(Command::parse("   "), Command::Search("   ".to_string()));
  }
}
