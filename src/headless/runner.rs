//! Headless mode runner - the main loop of `tvlink run`
//!
//! Starts a session per configured device, forwards their state updates to
//! stdout and feeds stdin intents to the right session.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tvlink_adb::{AdbRunner, AdbTool, UdpWakeOnLan};
use tvlink_app::config::load_config;
use tvlink_app::{AccessoryEvent, AccessorySink, ChannelAccessory, SessionManager, TvlinkConfig};
use tvlink_core::prelude::*;

use super::intent::{parse_intent_line, Intent, IntentLine};
use super::HeadlessEvent;

/// Run in headless mode until `quit` is read or Ctrl+C
///
/// Sessions keep running after stdin closes, so the bridge can be started
/// with stdin attached to `/dev/null`.
pub async fn run_headless(config_path: &Path) -> Result<()> {
    info!("tvlink starting in headless mode");
    info!("Config: {}", config_path.display());

    let config = match load_config(config_path).context("Failed to load configuration") {
        Ok(config) => config,
        Err(e) => {
            HeadlessEvent::error(e.to_string(), e.is_fatal()).emit();
            return Err(e);
        }
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AccessoryEvent>();
    let manager = start_sessions(&config, event_tx);

    for handle in manager.handles() {
        HeadlessEvent::session_started(handle.name(), handle.address()).emit();
    }

    let forwarder = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            HeadlessEvent::from(event).emit();
        }
    });

    let (intent_tx, intent_rx) = mpsc::channel::<IntentLine>(16);
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(intent_tx);
    });

    serve_intents(&manager, intent_rx, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Interrupted");
    })
    .await;

    manager.shutdown().await;
    // every sink is gone with its session, so the forwarder drains and ends
    if let Err(e) = forwarder.await {
        warn!("Event forwarder ended abnormally: {}", e);
    }

    info!("tvlink headless mode exiting");
    Ok(())
}

/// Apply intents as they arrive until `quit` is received or `shutdown` resolves
///
/// A closed intent channel only stops intent handling; the sessions keep
/// polling until `shutdown`.
pub async fn serve_intents<F>(
    manager: &SessionManager,
    mut intents: mpsc::Receiver<IntentLine>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut intents_open = true;

    loop {
        tokio::select! {
            line = intents.recv(), if intents_open => match line {
                Some(IntentLine { intent: Intent::Quit, .. }) => {
                    info!("Quit requested");
                    break;
                }
                Some(line) => {
                    for event in apply_intent(manager, line).await {
                        event.emit();
                    }
                }
                None => {
                    info!("Stdin closed, sessions keep running until interrupted");
                    intents_open = false;
                }
            },
            _ = &mut shutdown => break,
        }
    }
}

/// Start sessions once, reconcile, print a status snapshot and exit
pub async fn print_status(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    // status output only; pushed updates are not needed
    let (event_tx, _event_rx) = mpsc::unbounded_channel();
    let manager = start_sessions(&config, event_tx);

    manager.refresh_all().await;
    let snapshots = manager.snapshots().await;
    manager.shutdown().await;

    let json = serde_json::to_string_pretty(&snapshots)?;
    println!("{}", json);
    Ok(())
}

fn start_sessions(
    config: &TvlinkConfig,
    event_tx: mpsc::UnboundedSender<AccessoryEvent>,
) -> SessionManager {
    let tool = AdbTool::locate(config.adb.path.as_deref());
    if let Some(message) = tool.unavailable_message() {
        warn!("{}", message);
    }

    SessionManager::start_all(
        config,
        AdbRunner::from_tool(&tool),
        UdpWakeOnLan::default(),
        move |device| -> Arc<dyn AccessorySink> {
            Arc::new(ChannelAccessory::new(
                device.identity.name.clone(),
                event_tx.clone(),
            ))
        },
    )
}

/// Route one intent to its session and report the outcome as events
///
/// A `status` intent yields the status event before its result.
pub async fn apply_intent(manager: &SessionManager, line: IntentLine) -> Vec<HeadlessEvent> {
    let IntentLine { device, intent } = line;
    let mut events = Vec::new();

    let result = match intent {
        Intent::Power { on } => manager.set_power(device.as_deref(), on).await,
        Intent::Source { id } => manager.set_source(device.as_deref(), id).await,
        Intent::Status => {
            manager.refresh_all().await;
            events.push(HeadlessEvent::status(manager.snapshots().await));
            Ok(())
        }
        Intent::Quit => Ok(()),
    };

    match &result {
        Err(e) if e.is_recoverable() => warn!("{} intent failed: {}", intent.name(), e),
        Err(e) => error!("{} intent failed: {}", intent.name(), e),
        Ok(()) => {}
    }
    events.push(HeadlessEvent::intent_result(device, intent.name(), &result));
    events
}

/// Blocking stdin reader; runs on its own thread
fn spawn_stdin_reader_blocking(intent_tx: mpsc::Sender<IntentLine>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        match line {
            Ok(line) => match parse_intent_line(&line) {
                Ok(Some(intent)) => {
                    let quit = intent.intent == Intent::Quit;
                    if intent_tx.blocking_send(intent).is_err() || quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Ignoring stdin line {:?}: {}", line.trim(), e);
                    HeadlessEvent::error(format!("invalid intent: {}", e), false).emit();
                }
            },
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    info!("Stdin reader exiting");
}
