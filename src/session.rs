use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{Backend, FeedbackRequest, fetch_results};
use crate::error::{FetchError, SelectionError, SubmitError, ValidationError};
use crate::ledger::{FeedbackLedger, FeedbackValue};
use crate::query::{Query, QueryState};
use crate::schema::{ResultSet, SearchResult, SetId};
use crate::theater::{Selection, Theater, TheaterController};

// --- Types ---

pub type SearchOutcome = Result<Vec<SearchResult>, FetchError>;
pub type SubmitOutcome = Result<(), SubmitError>;

/// Something the session applied while draining finished network work.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
  ResultsReady { query: Option<Query>, count: usize },
  SearchFailed(FetchError),
  FeedbackRecorded { index: usize, value: FeedbackValue },
  FeedbackFailed(SubmitError),
}

/// Result of asking to rate the open result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOutcome {
  /// A feedback write was dispatched.
  Submitted,
  NoSelection,
  /// `Unset` is not a rating.
  NotARating,
  /// The ledger already records this value.
  Unchanged,
  /// The same rating is already on its way.
  InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
  Input,
  Search,
  Feedback,
}

/// A dismissible user-facing message.
#[derive(Debug, Clone)]
pub struct Notice {
  pub kind: NoticeKind,
  pub message: String,
  at: Instant,
}

/// In-flight search, together with the query it was issued for.
struct PendingSearch {
  query: Query,
  rx: oneshot::Receiver<SearchOutcome>,
  handle: JoinHandle<()>,
}

/// Where a feedback write has to land when its ack comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FeedbackTicket {
  set: SetId,
  index: usize,
  value: FeedbackValue,
}

struct PendingFeedback {
  ticket: FeedbackTicket,
  rx: oneshot::Receiver<SubmitOutcome>,
  /// A newer rating for the same result was sent after this one; its outcome is ignored.
  superseded: bool,
}

/// In-flight async task receivers and handles.
#[derive(Default)]
struct AsyncTasks {
  search: Option<PendingSearch>,
  feedback: Vec<PendingFeedback>,
}

// --- Session ---

/// One user's search-and-review session.
///
/// Owns the query, the current result set, its feedback ledger and the theater selection.
/// The three result-bound pieces change together: every new result set goes through
/// [`Session::apply_results`], which rebuilds the ledger and clears the selection in the same
/// `&mut self` call, so no reader can observe them out of step.
///
/// Network calls run as spawned tasks. Their outcomes are only applied from [`Session::poll`] or
/// [`Session::settle`].
pub struct Session<B: Backend> {
  backend: Arc<B>,
  query: QueryState,
  results: ResultSet,
  /// Query the current result set was fetched for.
  results_query: Option<Query>,
  ledger: FeedbackLedger,
  theater: TheaterController,
  search_error: Option<FetchError>,
  notice: Option<Notice>,
  notice_ttl: Duration,
  next_set: u64,
  tasks: AsyncTasks,
}

impl<B: Backend> Session<B> {
  pub fn new(backend: Arc<B>, query: QueryState, notice_ttl: Duration) -> Self {
    Self {
      backend,
      query,
      results: ResultSet::new(SetId(0), Vec::new()),
      results_query: None,
      ledger: FeedbackLedger::reset(0),
      theater: TheaterController::default(),
      search_error: None,
      notice: None,
      notice_ttl,
      next_set: 1,
      tasks: AsyncTasks::default(),
    }
  }

  // --- Accessors ---

  pub fn query(&self) -> Option<&Query> {
    self.query.current()
  }

  pub fn share_url(&self) -> reqwest::Url {
    self.query.share_url()
  }

  pub fn results(&self) -> &ResultSet {
    &self.results
  }

  pub fn ledger(&self) -> &FeedbackLedger {
    &self.ledger
  }

  pub fn selection(&self) -> Selection {
    self.theater.selection()
  }

  pub fn search_error(&self) -> Option<&FetchError> {
    self.search_error.as_ref()
  }

  pub fn notice(&self) -> Option<&Notice> {
    self.notice.as_ref()
  }

  pub fn is_searching(&self) -> bool {
    self.tasks.search.is_some()
  }

  pub fn pending_feedback(&self) -> usize {
    self.tasks.feedback.len()
  }

  /// The open result with its derived player target, if any.
  pub fn theater(&self) -> Option<Theater<'_>> {
    let index = self.theater.selection().index()?;
    let result = self.results.get(index)?;
    Some(Theater {
      index,
      result,
      feedback: self.ledger.get(index).unwrap_or_default(),
      target: self.theater.target(&self.results)?,
    })
  }

  // --- Notices ---

  fn set_notice(&mut self, kind: NoticeKind, message: String) {
    self.notice = Some(Notice { kind, message, at: Instant::now() });
  }

  pub fn dismiss_notice(&mut self) {
    self.notice = None;
  }

  /// Clear a notice once it has been shown for the configured time.
  fn expire_notice(&mut self) {
    if let Some(ref notice) = self.notice
      && notice.at.elapsed() >= self.notice_ttl
    {
      self.notice = None;
    }
  }

  // --- Query ---

  /// Submit raw search input. Blank input is rejected and changes nothing else.
  pub fn submit_query(&mut self, raw: &str) -> Result<(), ValidationError> {
    let query = match self.query.submit(raw) {
      Ok(query) => query.clone(),
      Err(e) => {
        debug!("search: rejected blank input");
        self.set_notice(NoticeKind::Input, "Please enter search term(s)...".to_string());
        return Err(e);
      }
    };
    if self.notice.as_ref().is_some_and(|n| n.kind == NoticeKind::Input) {
      self.dismiss_notice();
    }
    self.request(Some(query));
    Ok(())
  }

  /// Restore the query from a share URL and fetch it. Invalid values start an empty session.
  pub fn restore(&mut self, share_url: &str) {
    let restored = self.query.restore_from_str(share_url).cloned();
    self.request(restored);
  }

  /// Back to "no query yet". The empty result set is applied without touching the network.
  pub fn reset(&mut self) {
    self.query.clear();
    self.request(None);
  }

  fn request(&mut self, query: Option<Query>) {
    let Some(query) = query else {
      self.cancel_search();
      self.apply_results(None, Vec::new());
      return;
    };

    if self.tasks.search.as_ref().is_some_and(|p| p.query == query) {
      debug!(query = %query, "search: already in flight");
      return;
    }
    if self.tasks.search.is_none() && self.search_error.is_none() && self.results_query.as_ref() == Some(&query) {
      debug!(query = %query, "search: results already current");
      return;
    }

    self.cancel_search();
    info!(query = %query, "search: dispatched");

    let backend = Arc::clone(&self.backend);
    let task_query = query.clone();
    let (tx, rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
      let _ = tx.send(fetch_results(backend.as_ref(), Some(&task_query)).await);
    });
    self.tasks.search = Some(PendingSearch { query, rx, handle });
  }

  /// Abort the in-flight search. Its outcome can no longer be observed.
  fn cancel_search(&mut self) {
    if let Some(pending) = self.tasks.search.take() {
      debug!(query = %pending.query, "search: superseded");
      pending.handle.abort();
    }
  }

  // --- Result set transitions ---

  /// Install a new result set. Ledger and selection are rebuilt in the same step.
  fn apply_results(&mut self, query: Option<Query>, results: Vec<SearchResult>) {
    let id = SetId(self.next_set);
    self.next_set += 1;
    self.results = ResultSet::new(id, results);
    self.ledger = FeedbackLedger::reset(self.results.len());
    self.theater.clear();
    self.results_query = query;
    self.search_error = None;
  }

  fn finish_search(&mut self, query: Query, outcome: SearchOutcome) -> SessionEvent {
    match outcome {
      Ok(results) => {
        let count = results.len();
        info!(query = %query, count, "search: results applied");
        if self.notice.as_ref().is_some_and(|n| n.kind == NoticeKind::Search) {
          self.dismiss_notice();
        }
        self.apply_results(Some(query.clone()), results);
        SessionEvent::ResultsReady { query: Some(query), count }
      }
      Err(e) => {
        warn!(query = %query, err = %e, "search: failed");
        self.apply_results(None, Vec::new());
        self.search_error = Some(e.clone());
        self.set_notice(NoticeKind::Search, format!("{e}, please search again."));
        SessionEvent::SearchFailed(e)
      }
    }
  }

  // --- Theater ---

  /// Open result `index` in the theater.
  pub fn select(&mut self, index: usize) -> Result<(), SelectionError> {
    if self.theater.pick(index, self.results.len())? {
      debug!(index, set = ?self.results.id(), "theater: selected");
    }
    Ok(())
  }

  /// Replay the open segment from its start offset. `false` with nothing open.
  pub fn restart_segment(&mut self) -> bool {
    self.theater.restart()
  }

  // --- Feedback ---

  /// Rate the open result. Only a change against the acknowledged ledger value, or against a
  /// rating still on its way, is sent. The newest rating for a result is the only one whose ack
  /// reaches the ledger.
  pub fn rate(&mut self, value: FeedbackValue) -> RateOutcome {
    let Some(index) = self.theater.selection().index() else {
      return RateOutcome::NoSelection;
    };
    let (Some(result), Some(recorded)) = (self.results.get(index), self.ledger.get(index)) else {
      return RateOutcome::NoSelection;
    };
    if value == FeedbackValue::Unset {
      return RateOutcome::NotARating;
    }
    let set = self.results.id();
    let active = self.tasks.feedback.iter().find(|p| !p.superseded && p.ticket.set == set && p.ticket.index == index);
    match active.map(|p| p.ticket.value) {
      Some(pending) if pending == value => return RateOutcome::InFlight,
      None if recorded == value => {
        debug!(index, value = value.label(), "feedback: unchanged, not sent");
        return RateOutcome::Unchanged;
      }
      _ => {}
    }
    let ticket = FeedbackTicket { set, index, value };

    // A selection can only exist after a query produced results.
    let Some(query) = self.results_query.as_ref().or(self.query.current()) else {
      return RateOutcome::NoSelection;
    };
    let Some(request) = FeedbackRequest::new(value, query, result) else {
      return RateOutcome::NotARating;
    };
    info!(index, result_id = %request.result_id, value = value.label(), "feedback: dispatched");

    for pending in self.tasks.feedback.iter_mut().filter(|p| p.ticket.set == set && p.ticket.index == index) {
      debug!(index, value = pending.ticket.value.label(), "feedback: superseded by a newer rating");
      pending.superseded = true;
    }

    let backend = Arc::clone(&self.backend);
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(backend.submit_feedback(&request).await);
    });
    self.tasks.feedback.push(PendingFeedback { ticket, rx, superseded: false });
    RateOutcome::Submitted
  }

  fn finish_feedback(&mut self, pending: PendingFeedback, outcome: SubmitOutcome) -> Option<SessionEvent> {
    let ticket = pending.ticket;
    if pending.superseded {
      debug!(index = ticket.index, value = ticket.value.label(), "feedback: outcome of a superseded rating, ignored");
      return None;
    }
    match outcome {
      Ok(()) if ticket.set != self.results.id() => {
        debug!(set = ?ticket.set, current = ?self.results.id(), "feedback: ack for a replaced result set, dropped");
        None
      }
      Ok(()) => {
        if !self.ledger.set(ticket.index, ticket.value) {
          return None;
        }
        info!(index = ticket.index, value = ticket.value.label(), "feedback: recorded");
        Some(SessionEvent::FeedbackRecorded { index: ticket.index, value: ticket.value })
      }
      Err(e) => {
        warn!(index = ticket.index, err = %e, "feedback: failed");
        self.set_notice(NoticeKind::Feedback, "Failed to submit feedback. Please retry.".to_string());
        Some(SessionEvent::FeedbackFailed(e))
      }
    }
  }

  // --- Draining ---

  /// Apply every finished network outcome without waiting.
  pub fn poll(&mut self) -> Vec<SessionEvent> {
    let mut events = Vec::new();

    if let Some(mut pending) = self.tasks.search.take() {
      match pending.rx.try_recv() {
        Ok(outcome) => events.push(self.finish_search(pending.query, outcome)),
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.search = Some(pending),
        Err(oneshot::error::TryRecvError::Closed) => {
          events.push(self.finish_search(pending.query, Err(FetchError::Interrupted)));
        }
      }
    }

    for mut pending in mem::take(&mut self.tasks.feedback) {
      match pending.rx.try_recv() {
        Ok(outcome) => events.extend(self.finish_feedback(pending, outcome)),
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.feedback.push(pending),
        Err(oneshot::error::TryRecvError::Closed) => {
          events.extend(self.finish_feedback(pending, Err(SubmitError::Interrupted)));
        }
      }
    }

    self.expire_notice();
    events
  }

  /// Wait for all in-flight work, then apply it. The search outcome is applied before any
  /// feedback ack, so acks are always checked against the newest result set.
  pub async fn settle(&mut self) -> Vec<SessionEvent> {
    let mut events = Vec::new();

    if let Some(pending) = self.tasks.search.take() {
      let outcome = pending.rx.await.unwrap_or(Err(FetchError::Interrupted));
      events.push(self.finish_search(pending.query, outcome));
    }

    let waiting = mem::take(&mut self.tasks.feedback).into_iter().map(|mut pending| async move {
      let outcome = (&mut pending.rx).await.unwrap_or(Err(SubmitError::Interrupted));
      (pending, outcome)
    });
    for (pending, outcome) in futures::future::join_all(waiting).await {
      events.extend(self.finish_feedback(pending, outcome));
    }

    events
  }
}
