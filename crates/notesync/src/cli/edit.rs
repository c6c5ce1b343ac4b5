//! Interactive editing session.
//!
//! Connects to the relay, loads the note from the local database and turns
//! stdin lines into edits. Remote edits and save status are echoed to the
//! terminal.

use std::sync::{Arc, Weak};

use tokio::io::{AsyncBufReadExt, BufReader};

use notesync_core::channel::WebSocketChannel;
use notesync_core::config::SyncConfig;
use notesync_core::delta::Delta;
use notesync_core::store::SqliteStore;
use notesync_core::surface::{ChangeOrigin, EditingSurface, TextSurface};
use notesync_core::sync::{Mode, SaveOutcome, SessionState, SyncSession};

/// A parsed stdin line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineCommand {
    Append(String),
    Save,
    SetMode(Mode),
    ToggleReadOnly,
    Show,
    Quit,
    Invalid(String),
}

/// Lines starting with ':' are commands; everything else is text.
/// A leading "::" escapes a literal ':'.
pub fn parse_line(line: &str) -> LineCommand {
    if let Some(escaped) = line.strip_prefix("::") {
        return LineCommand::Append(format!(":{}", escaped));
    }
    let Some(command) = line.strip_prefix(':') else {
        return LineCommand::Append(line.to_string());
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("save"), None) => LineCommand::Save,
        (Some("mode"), Some(mode)) => match mode.parse::<Mode>() {
            Ok(mode) => LineCommand::SetMode(mode),
            Err(e) => LineCommand::Invalid(e),
        },
        (Some("readonly"), None) => LineCommand::ToggleReadOnly,
        (Some("show"), None) => LineCommand::Show,
        (Some("quit") | Some("q"), None) => LineCommand::Quit,
        _ => LineCommand::Invalid(format!("Unknown command: {}", line)),
    }
}

pub fn handle_edit(mut config: SyncConfig, mode: Option<Mode>) -> bool {
    if let Some(mode) = mode {
        config.initial_mode = mode;
    }
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("✗ Failed to create Tokio runtime: {}", e);
            return false;
        }
    };
    runtime.block_on(run_edit(config))
}

async fn run_edit(config: SyncConfig) -> bool {
    let store = match SqliteStore::open(&config.database_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!(
                "✗ Error opening database {}: {}",
                config.database_path.display(),
                e
            );
            return false;
        }
    };
    let (channel, inbound) = match WebSocketChannel::connect(&config.socket_url).await {
        Ok(connected) => connected,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    let surface = Arc::new(TextSurface::new());
    let session = Arc::new(SyncSession::new(
        surface.clone(),
        store,
        Arc::new(channel),
        config,
    ));
    print_remote_edits(&surface);

    match session.bootstrap().await {
        SessionState::Ready => {
            println!("Connected ({} mode). Type to append, :quit to exit.", session.mode());
            if !surface.is_empty() {
                println!("{}", surface.text());
            }
        }
        state => eprintln!("✗ Failed to load note (session {:?}); edits will not be loaded from the store", state),
    }

    let _autosave = session.spawn_autosave();
    let status_task = tokio::spawn({
        let mut status = session.subscribe_save_status();
        async move {
            while status.changed().await.is_ok() {
                let line = status.borrow_and_update().describe();
                eprintln!("[{}]", line);
            }
        }
    });
    let inbound_task = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.run_inbound(inbound).await }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("✗ Error reading stdin: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            LineCommand::Append(text) => {
                if let Err(e) = surface.append_text(&format!("{}\n", text)) {
                    eprintln!("✗ {}", e);
                }
            }
            LineCommand::Save => report_save(session.save_now().await),
            LineCommand::SetMode(mode) => {
                session.set_mode(mode);
                println!("Mode: {}", mode);
            }
            LineCommand::ToggleReadOnly => {
                let read_only = !surface.is_read_only();
                surface.set_read_only(read_only);
                println!("Read-only: {}", if read_only { "on" } else { "off" });
            }
            LineCommand::Show => println!("{}", surface.text()),
            LineCommand::Quit => break,
            LineCommand::Invalid(message) => eprintln!("{}", message),
        }
    }

    session.flush();
    report_save(session.save_now().await);
    session.shutdown().await;
    inbound_task.abort();
    status_task.abort();
    true
}

/// Print the whole note whenever a remote edit lands.
fn print_remote_edits(surface: &Arc<TextSurface>) {
    let weak: Weak<TextSurface> = Arc::downgrade(surface);
    surface.subscribe(Arc::new(move |_change: &Delta, origin: ChangeOrigin| {
        if origin != ChangeOrigin::Remote {
            return;
        }
        if let Some(surface) = weak.upgrade() {
            println!("--- remote edit ---\n{}", surface.text());
        }
    }));
}

fn report_save(outcome: SaveOutcome) {
    match outcome {
        SaveOutcome::Saved { .. } | SaveOutcome::Coalesced => {}
        SaveOutcome::Unchanged => println!("No changes to save."),
        SaveOutcome::NoSnapshot => eprintln!("Nothing to save."),
        SaveOutcome::Failed { attempts, error } => {
            eprintln!("✗ Save failed after {} attempts: {}", attempts, error)
        }
    }
}
