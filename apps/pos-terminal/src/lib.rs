//! # MediPOS Terminal
//!
//! Keyboard-driven front end for the pharmacy POS session.
//!
//! ## Application Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MediPOS Terminal                                 │
//! │                                                                         │
//! │   stdin line ──► Command::parse ──► App::execute                        │
//! │                                         │                               │
//! │                  ┌──────────────────────┼─────────────────────┐         │
//! │                  ▼                      ▼                     ▼         │
//! │          session commands        prescription / help      quit          │
//! │          (keys, typing, clicks)                                         │
//! │                  │                                                      │
//! │                  ▼                                                      │
//! │          notices printed now                                            │
//! │          backend effects ──► tokio::spawn ──► Dispatcher::run           │
//! │                                                   │                     │
//! │                  screen redraw ◄── notice channel ◄┘                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Backend work never blocks the prompt: the operator can keep typing while a
//! sale is in flight, and the session itself refuses a second submit.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (stderr)
//! 2. Load `ClientConfig` (optional path as first argument)
//! 3. Build the HTTP client, receipt sink and session
//! 4. Fetch settings, catalog and customers
//! 5. Read commands until `quit` or end of input

pub mod commands;
pub mod error;
pub mod screen;

use std::path::PathBuf;

use medipos_client::{
    partition, ClientConfig, Dispatcher, FileReceiptSink, HttpPosApi, PosApi, ReceiptSink,
    SharedSession,
};
use medipos_core::workflow::Notice;
use medipos_core::PosSession;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, Instrument, Level};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use commands::document::load_prescription;
use commands::Command;
use error::{AppError, ErrorCode};

/// What the prompt does after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Show these notices, then the screen.
    Redraw(Vec<Notice>),
    /// Show this text as-is.
    Print(String),
    Quit,
}

pub struct App<A, S> {
    dispatcher: Dispatcher<A, S>,
    background: mpsc::UnboundedSender<Vec<Notice>>,
}

impl<A, S> App<A, S>
where
    A: PosApi + 'static,
    S: ReceiptSink + 'static,
{
    /// Returns the app and the receiver for notices from background work.
    pub fn new(dispatcher: Dispatcher<A, S>) -> (Self, mpsc::UnboundedReceiver<Vec<Notice>>) {
        let (background, rx) = mpsc::unbounded_channel();
        (
            App {
                dispatcher,
                background,
            },
            rx,
        )
    }

    pub fn session(&self) -> &SharedSession {
        self.dispatcher.session()
    }

    pub async fn bootstrap(&self) -> Vec<Notice> {
        self.dispatcher.bootstrap().await
    }

    pub fn execute(&self, line: &str) -> Result<Step, AppError> {
        let command = Command::parse(line)?;
        debug!(?command, "Command");

        match command {
            Command::Show => Ok(Step::Redraw(Vec::new())),
            Command::Help => Ok(Step::Print(commands::help_text())),
            Command::Quit => {
                if self.session().with_session(|s| s.ui().is_submitting()) {
                    return Err(AppError::new(
                        ErrorCode::BusinessLogic,
                        "A transaction is still being submitted",
                    ));
                }
                Ok(Step::Quit)
            }
            Command::Prescription(path) => {
                let context = load_prescription(&path)?;
                let notice = match self.dispatcher.print_prescription(&context)? {
                    Some(path) => Notice::info(format!("Prescription saved to {}", path.display())),
                    None => Notice::info("Prescription printed"),
                };
                Ok(Step::Redraw(vec![notice]))
            }
            other => {
                let effects = self
                    .session()
                    .with_session_mut(|s| commands::session::apply(s, &other))
                    .unwrap_or_default();
                let (notices, work) = partition(effects);
                if !work.is_empty() {
                    self.spawn(work);
                }
                Ok(Step::Redraw(notices))
            }
        }
    }

    /// Runs backend effects off the prompt; notices come back on the channel.
    fn spawn(&self, work: Vec<medipos_core::Effect>) {
        let dispatcher = self.dispatcher.clone();
        let background = self.background.clone();
        tokio::spawn(
            async move {
                let notices = dispatcher.run(work).await;
                // Receiver gone means the prompt has exited.
                let _ = background.send(notices);
            }
            .in_current_span(),
        );
    }
}

/// Runs the terminal until `quit` or end of input.
pub async fn run(config_path: Option<PathBuf>) -> Result<(), AppError> {
    init_tracing();

    let span = info_span!("terminal", session_id = %Uuid::new_v4());
    async move {
        info!("Starting MediPOS terminal");

        let config = ClientConfig::load_or_default(config_path);
        let api = HttpPosApi::new(&config)?;
        info!(api = %api.base_url(), "Backend configured");

        let sink = FileReceiptSink::from_config(&config);
        let session = SharedSession::new(PosSession::default().with_history_limit(config.history_limit));
        let (app, mut background) = App::new(Dispatcher::new(api, sink, session));

        print_notices(&app.bootstrap().await);
        redraw(&app);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    match app.execute(&line) {
                        Ok(Step::Quit) => break,
                        Ok(Step::Print(text)) => println!("{text}"),
                        Ok(Step::Redraw(notices)) => {
                            print_notices(&notices);
                            redraw(&app);
                        }
                        Err(err) => println!("! {}", err.message),
                    }
                }
                Some(notices) = background.recv() => {
                    print_notices(&notices);
                    redraw(&app);
                }
            }
        }

        info!("Terminal closed");
        Ok::<(), AppError>(())
    }
    .instrument(span)
    .await
}

fn print_notices(notices: &[Notice]) {
    for notice in notices {
        println!("{}", screen::render_notice(notice));
    }
}

fn redraw<A, S>(app: &App<A, S>)
where
    A: PosApi + 'static,
    S: ReceiptSink + 'static,
{
    print!("{}", app.session().with_session(screen::render));
}

/// Initializes the tracing subscriber on stderr so logs stay off the screen.
///
/// ## Log Levels
/// - Default: INFO for all, DEBUG for medipos crates
/// - Override with RUST_LOG environment variable
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,medipos=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .try_init();
}
