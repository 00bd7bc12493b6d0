mod feed;
mod layout;
mod plain;
mod theme;
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use feed::{FeedEvent, FeedSource};
use futures_util::StreamExt;
use layout::FeedLabel;
use meshmon_core::config::{load_config, resolve_config_path};
use meshmon_core::{DashboardView, DriverState, FeedConfig, RenderDriver, RenderSink};
use plain::PlainSink;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tui::TuiSink;

const FEED_CHANNEL_CAPACITY: usize = 256;
const SCROLL_PAGE: isize = 5;

#[derive(Parser, Debug)]
#[command(name = "meshmon", about = "Live terminal dashboard for a mesh telemetry MQTT feed")]
struct Args {
    /// Configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    topic: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long, env = "MESHMON_MQTT_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[arg(long, default_value_t = false)]
    tls: bool,
    /// Clear-and-print output instead of the full-screen dashboard.
    #[arg(long, default_value_t = false)]
    plain: bool,
    /// Read NDJSON messages from a file (`-` for stdin) instead of MQTT.
    #[arg(long)]
    replay: Option<PathBuf>,
    #[arg(long, requires = "replay")]
    replay_interval_ms: Option<u64>,
    #[arg(long, env = "MESHMON_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.plain, args.log_file.as_deref());

    let config_path = resolve_config_path(args.config.clone());
    let mut config = load_config(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    apply_overrides(&mut config.feed, &args);

    let (source, label) = match args.replay.clone() {
        Some(path) => {
            let label = FeedLabel {
                topic: config.feed.topic.clone(),
                endpoint: format!("replay:{}", path.display()),
            };
            let interval = args.replay_interval_ms.map(Duration::from_millis);
            (FeedSource::Replay { path, interval }, label)
        }
        None => {
            let label = FeedLabel {
                topic: config.feed.topic.clone(),
                endpoint: config.feed.endpoint(),
            };
            (FeedSource::Mqtt(config.feed.clone()), label)
        }
    };
    info!(
        event = "startup",
        config = %config_path.display(),
        broker = %label.endpoint,
        topic = %label.topic,
        plain = args.plain
    );

    let (feed_tx, feed_rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let feed_task = tokio::spawn(feed::run(source, feed_tx, shutdown_rx));

    let driver = RenderDriver::new(config.display);
    let outcome = if args.plain {
        run_plain(driver, feed_rx, label).await
    } else {
        run_tui(driver, feed_rx, label).await
    };

    let _ = shutdown_tx.send(true);
    if let Err(err) = feed_task.await {
        warn!(event = "feed_task_error", error = %err);
    }
    info!(event = "shutdown");
    outcome
}

fn apply_overrides(feed: &mut FeedConfig, args: &Args) {
    if let Some(host) = &args.host {
        feed.host = host.clone();
    }
    if let Some(port) = args.port {
        feed.port = port;
    }
    if let Some(topic) = &args.topic {
        feed.topic = topic.clone();
    }
    if let Some(username) = &args.username {
        feed.username = Some(username.clone());
    }
    if let Some(password) = &args.password {
        feed.password = Some(password.clone());
    }
    if args.tls {
        feed.tls = true;
    }
}

fn init_logging(plain: bool, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if plain {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
        return;
    }
    let file = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(err) => {
                eprintln!("log_file_error: {}: {err}", path.display());
                None
            }
        }
    });
    match file {
        Some(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
}

async fn run_tui(
    mut driver: RenderDriver,
    mut feed_rx: mpsc::Receiver<FeedEvent>,
    label: FeedLabel,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    let mut sink = TuiSink::new(terminal, label);

    let outcome = tui_loop(&mut driver, &mut feed_rx, &mut sink).await;

    disable_raw_mode()?;
    execute!(sink.terminal_mut().backend_mut(), LeaveAlternateScreen)?;
    sink.terminal_mut().show_cursor()?;
    outcome
}

async fn tui_loop<B: Backend>(
    driver: &mut RenderDriver,
    feed_rx: &mut mpsc::Receiver<FeedEvent>,
    sink: &mut TuiSink<B>,
) -> Result<()> {
    sink.render(&DashboardView::default())?;
    let mut events = EventStream::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            Some(event) = feed_rx.recv() => {
                apply_feed_event(driver, sink, event);
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if is_quit(&key) => break,
                    Some(Ok(Event::Key(key))) => {
                        if let Some(delta) = scroll_delta(&key) {
                            sink.scroll_by(delta);
                            refresh(driver, sink);
                        }
                    }
                    Some(Ok(Event::Resize(_, _))) => refresh(driver, sink),
                    Some(Ok(_)) => {}
                    Some(Err(err)) => warn!(event = "terminal_input_error", error = %err),
                    None => break,
                }
            }
        }
    }
    Ok(())
}

async fn run_plain(
    mut driver: RenderDriver,
    mut feed_rx: mpsc::Receiver<FeedEvent>,
    label: FeedLabel,
) -> Result<()> {
    let stdout = io::stdout();
    let styled = stdout.is_terminal();
    let mut sink = PlainSink::new(stdout, label, styled);
    sink.render(&DashboardView::default())?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            maybe_event = feed_rx.recv() => {
                let Some(event) = maybe_event else {
                    info!(event = "feed_closed");
                    break;
                };
                apply_feed_event(&mut driver, &mut sink, event);
            }
        }
    }
    Ok(())
}

fn is_quit(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn scroll_delta(key: &KeyEvent) -> Option<isize> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(-1),
        KeyCode::Down | KeyCode::Char('j') => Some(1),
        KeyCode::PageUp => Some(-SCROLL_PAGE),
        KeyCode::PageDown => Some(SCROLL_PAGE),
        KeyCode::Home => Some(isize::MIN),
        KeyCode::End => Some(isize::MAX),
        _ => None,
    }
}

fn apply_feed_event<S>(driver: &mut RenderDriver, sink: &mut S, event: FeedEvent)
where
    S: RenderSink + ?Sized,
{
    match event {
        FeedEvent::Connected => info!(event = "feed_connected"),
        FeedEvent::Disconnected { reason } => info!(event = "feed_disconnected", reason = %reason),
        FeedEvent::Message(raw) => {
            // Failures are logged by the driver; the loop keeps going.
            let _ = driver.ingest(&raw, sink);
        }
    }
}

/// Redraws after a resize. Before the first message the empty view is shown.
fn refresh<S>(driver: &RenderDriver, sink: &mut S)
where
    S: RenderSink + ?Sized,
{
    match driver.state() {
        DriverState::Idle => {
            if let Err(err) = sink.render(&DashboardView::default()) {
                warn!(event = "render_error", error = %err);
            }
        }
        DriverState::Active => {
            let _ = driver.redraw(sink);
        }
    }
}
