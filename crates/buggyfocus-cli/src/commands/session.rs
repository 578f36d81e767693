use std::io::{self, Write};

use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};
#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use buggyfocus_core::{
    BlockMode, Config, CoreError, Event, FocusService, SessionConfig, SessionError,
};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a session and stay attached until it ends.
    ///
    /// Events are printed as JSON lines. Commands on stdin: `extend <minutes>`,
    /// `end`, `quit`, `status`, `snark <category>`, `restore`. Ctrl-C, SIGTERM,
    /// SIGHUP or closing stdout end the session early.
    Start {
        /// What you are working on
        #[arg(long)]
        task: String,
        /// Optional goal for this session
        #[arg(long)]
        goal: Option<String>,
        /// Countdown length (defaults to session.default_duration)
        #[arg(long, conflicts_with = "flow")]
        minutes: Option<u32>,
        /// Count up with no fixed end
        #[arg(long)]
        flow: bool,
        /// Site to watch for and, in hard mode, block (repeatable)
        #[arg(long = "site")]
        sites: Vec<String>,
        /// App to close in hard mode (repeatable)
        #[arg(long = "app")]
        apps: Vec<String>,
        /// gentle or hard (defaults to session.default_block_mode)
        #[arg(long)]
        block_mode: Option<BlockMode>,
        /// Overlay theme name
        #[arg(long)]
        theme: Option<String>,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();

    match action {
        SessionAction::Start {
            task,
            goal,
            minutes,
            flow,
            sites,
            apps,
            block_mode,
            theme,
        } => {
            let session = SessionConfig {
                task,
                session_goal: goal,
                blocked_sites: if sites.is_empty() {
                    config.blocking.sites.clone()
                } else {
                    sites
                },
                blocked_apps: if apps.is_empty() {
                    config.blocking.apps.clone()
                } else {
                    apps
                },
                block_mode: block_mode.unwrap_or(config.session.default_block_mode),
                duration_minutes: (!flow)
                    .then(|| minutes.unwrap_or(config.session.default_duration)),
                theme,
                is_flow_mode: flow,
            };
            // Reject bad input before touching the runtime.
            session.validate()?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(attach(&config, session))
        }
    }
}

async fn attach(config: &Config, session: SessionConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut stop = StopSignals::install()?;
    let service = FocusService::from_config(config)?;
    let mut events = service.subscribe();
    service.start(session).await?;

    let outcome = drive(&service, &mut events, &mut stop).await;
    if outcome.is_err() {
        if let Err(e) = end_if_active(&service).await {
            warn!(error = %e, "Could not end the session");
        }
    }
    // Always revert blocking, whatever happened to our streams.
    service.shutdown().await?;
    outcome
}

async fn drive(
    service: &FocusService,
    events: &mut broadcast::Receiver<Event>,
    stop: &mut StopSignals,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            // Drain published events before reading the next command.
            biased;
            received = events.recv() => match received {
                Ok(event) => {
                    if let Err(e) = print_event(&event) {
                        return output_closed(service, e).await;
                    }
                    if matches!(event, Event::SessionEnded { .. }) {
                        return Ok(());
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Dropped events"),
                Err(RecvError::Closed) => return Ok(()),
            },
            line = stdin.next_line(), if stdin_open => match line? {
                Some(line) => match handle_command(service, line.trim()).await {
                    Ok(Some(output)) => {
                        if let Err(e) = write_line(&output) {
                            return output_closed(service, e).await;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let _ = writeln!(io::stderr(), "error: {e}");
                    }
                },
                None => stdin_open = false,
            },
            () = stop.recv() => {
                info!("Stop requested, ending the session early");
                if !end_if_active(service).await? {
                    return Ok(());
                }
            }
        }
    }
}

/// Handle one stdin command. Returns a line to print, if any.
async fn handle_command(
    service: &FocusService,
    line: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();

    match command {
        "extend" => {
            let minutes: u32 = arg.ok_or("usage: extend <minutes>")?.parse()?;
            service.extend(minutes).await?;
        }
        "end" => {
            // Ending a timed session before the countdown hits zero is early.
            let state = service.state().await?;
            let early = !state.is_flow_mode && state.seconds_left > 0;
            service.end(early).await?;
        }
        "quit" => service.end(true).await?,
        "status" => return Ok(Some(serde_json::to_string(&service.state().await?)?)),
        "snark" => {
            let message = service.snark(arg.unwrap_or("idle")).await?;
            return Ok(Some(serde_json::to_string(&Event::SnarkMessage { message })?));
        }
        "restore" => {
            service.restore().await?;
        }
        other => return Err(format!("unknown command: {other}").into()),
    }
    Ok(None)
}

/// Nobody is reading any more: end the session early so it is recorded.
/// A closed pipe is a normal way to detach.
async fn output_closed(service: &FocusService, error: io::Error) -> Result<(), Box<dyn std::error::Error>> {
    end_if_active(service).await?;
    if error.kind() == io::ErrorKind::BrokenPipe {
        info!("Output closed, session ended early");
        return Ok(());
    }
    Err(error.into())
}

/// End the session early. Returns `false` if it had already ended.
async fn end_if_active(service: &FocusService) -> Result<bool, CoreError> {
    match service.end(true).await {
        Ok(()) => Ok(true),
        Err(CoreError::Session(SessionError::NotActive)) => Ok(false),
        Err(e) => Err(e),
    }
}

fn print_event(event: &Event) -> io::Result<()> {
    write_line(&serde_json::to_string(event).map_err(io::Error::other)?)
}

fn write_line(line: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{line}")?;
    out.flush()
}

/// Ctrl-C, plus SIGTERM and SIGHUP on unix.
struct StopSignals {
    #[cfg(unix)]
    terminate: Signal,
    #[cfg(unix)]
    hangup: Signal,
}

impl StopSignals {
    /// Handlers are registered here so a signal sent right after start is
    /// not lost.
    #[cfg(unix)]
    fn install() -> io::Result<Self> {
        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    #[cfg(not(unix))]
    fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    #[cfg(unix)]
    async fn recv(&mut self) {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Ctrl-C handler failed");
                    std::future::pending::<()>().await;
                }
            }
            _ = self.terminate.recv() => {}
            _ = self.hangup.recv() => {}
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl-C handler failed");
            std::future::pending::<()>().await;
        }
    }
}
