mod api;
mod config;
mod constants;
mod error;
mod input;
mod ledger;
mod logging;
mod query;
mod schema;
mod session;
mod theater;
mod ui;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use api::{FeedbackMethod, HttpBackend, SearchMethod};
use config::{Config, Settings};
use constants::constants;
use input::{Command, Flow, handle_command};
use query::QueryState;
use session::{Session, SessionEvent};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Search fast.ai lesson transcripts and jump to the moment", long_about = None)]
struct Args {
  /// Search for this on startup
  #[arg(short, long, conflicts_with = "url")]
  query: Option<String>,

  /// Restore a session from a share link
  #[arg(long)]
  url: Option<String>,

  /// Base URL of the search service
  #[arg(long)]
  api_base: Option<String>,

  /// HTTP method for search requests
  #[arg(long, value_enum)]
  search_method: Option<SearchMethod>,

  /// HTTP method for feedback writes
  #[arg(long, value_enum)]
  feedback_method: Option<FeedbackMethod>,

  /// Request timeout in seconds
  #[arg(long)]
  timeout: Option<u64>,

  /// Log filter, e.g. 'debug' (RUST_LOG takes precedence)
  #[arg(long)]
  log_level: Option<String>,

  /// Save the given options to the config file and exit
  #[arg(long)]
  write_config: bool,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<Shell>,
}

impl Args {
  fn overrides(&self) -> Config {
    Config {
      api_base: self.api_base.clone(),
      search_method: self.search_method,
      feedback_method: self.feedback_method,
      request_timeout_secs: self.timeout,
      log_level: self.log_level.clone(),
      ..Config::default()
    }
  }
}

// --- Output ---

fn print_block(text: &str) {
  if !text.is_empty() {
    println!("{}", text.trim_end());
  }
}

fn print_events(session: &Session<HttpBackend>, events: &[SessionEvent]) {
  for event in events {
    println!("{}", ui::render_event(event));
    match event {
      SessionEvent::ResultsReady { .. } | SessionEvent::SearchFailed(_) => print_block(&ui::render_results(session)),
      SessionEvent::FeedbackFailed(_) => print_block(&session.notice().map(ui::render_notice).unwrap_or_default()),
      SessionEvent::FeedbackRecorded { .. } => {}
    }
  }
}

fn prompt() -> Result<()> {
  print!("> ");
  std::io::stdout().flush().context("Failed to flush stdout")
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), env!("CARGO_PKG_NAME"), &mut std::io::stdout());
    return Ok(());
  }

  if args.write_config {
    let merged = Config::load().merge(args.overrides());
    Settings::resolve(&merged)?;
    let path = merged.save()?;
    println!("Saved {}", path.display());
    return Ok(());
  }

  let config = Config::load().merge(args.overrides());
  let settings = Settings::resolve(&config)?;
  let _guard = logging::init(&settings.log_level)?;
  info!(search_url = %settings.search_url, method = ?settings.search_method, "startup: settings resolved");

  run(args, settings).await
}

async fn run(args: Args, settings: Settings) -> Result<()> {
  let backend = HttpBackend::new(
    settings.search_url.clone(),
    settings.feedback_url.clone(),
    settings.search_method,
    settings.feedback_method,
    settings.request_timeout,
  )
  .context("Failed to build HTTP client")?;

  let query = QueryState::new(settings.share_base.clone(), constants().share_query_param.clone());
  let mut session = Session::new(Arc::new(backend), query, settings.notice_ttl);

  if let Some(url) = args.url.as_deref() {
    session.restore(url);
  } else if let Some(q) = args.query.as_deref() {
    if session.submit_query(q).is_err() {
      warn!("startup: ignoring blank --query");
    }
  }

  println!("Type search terms, or 'help'.");
  prompt()?;

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut tick = tokio::time::interval(settings.poll_interval);

  loop {
    tokio::select! {
      line = lines.next_line() => {
        let Some(line) = line.context("Failed to read stdin")? else { break };
        let (flow, text) = handle_command(&mut session, Command::parse(&line), &settings.embed_base);
        print_block(&text);
        match flow {
          Flow::Continue => {}
          Flow::Settle => {
            let events = session.settle().await;
            if events.is_empty() {
              println!("Nothing pending.");
            }
            print_events(&session, &events);
          }
          Flow::Quit => break,
        }
        prompt()?;
      }
      _ = tick.tick() => {
        let events = session.poll();
        if !events.is_empty() {
          println!();
          print_events(&session, &events);
          prompt()?;
        }
      }
    }
  }

  info!(pending = session.pending_feedback(), "shutdown");
  Ok(())
}
