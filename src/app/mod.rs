use crate::audio::{self, RecordingManager};
use crate::auth::{LoginGate, SessionFile};
use crate::call::{CallRecord, CallStatus, ControllerOptions, SessionController, SessionEvent};
use crate::cli::{format_timestamp, interactive_login};
use crate::config::Config;
use crate::global;
use crate::history::{self, HistoryStore, SqliteHistory};
use crate::text_io::NumberClipboard;
use anyhow::{anyhow, Result};
use dialoguer::{theme::ColorfulTheme, FuzzySelect, Input, Select};
use std::io::{self, IsTerminal};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const HISTORY_PAGE: usize = 20;

/// Phone number of the saved session, or an error telling the user to log in.
pub fn require_login() -> Result<String> {
    match SessionFile::default_location()?.load()? {
        Some(session) => Ok(session.phone),
        None => Err(anyhow!("Not logged in. Run 'softdial login' first.")),
    }
}

pub fn build_controller(config: &Config) -> Result<SessionController> {
    let history: Arc<dyn HistoryStore> =
        Arc::new(SqliteHistory::open_default(config.history.max_entries)?);
    let recorder = RecordingManager::new(audio::input_from_config(&config.recording));
    info!("Recording input: {}", recorder.input_name());

    SessionController::new(
        recorder,
        history,
        ControllerOptions::from_config(config),
    )
}

pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received");
                token.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}

/// Forward `interrupt` to the controller's abort signal until the returned
/// task is aborted. Used around device waits so a Ctrl-C there abandons the
/// call, while a later one still hangs up cleanly.
pub fn abort_setup_on(
    interrupt: &CancellationToken,
    controller: &SessionController,
) -> JoinHandle<()> {
    let interrupt = interrupt.clone();
    let abort = controller.abort_signal();
    tokio::spawn(async move {
        interrupt.cancelled().await;
        abort.cancel();
    })
}

/// Print whatever the controller has announced since the last call.
pub fn report_events(events: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => {
                if let Some(notice) = event_notice(&event) {
                    println!("{}", notice);
                }
            }
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!("Missed {} session events", skipped);
            }
            Err(_) => break,
        }
    }
}

fn event_notice(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::StatusChanged(CallStatus::Calling) => {
            Some("Calling... (simulated)".to_string())
        }
        SessionEvent::StatusChanged(_) => None,
        SessionEvent::RecordingStarted { mime } => Some(format!("Recording... ({})", mime)),
        SessionEvent::RecordingUnavailable(reason) => {
            Some(format!("Microphone access required to record: {}", reason))
        }
        SessionEvent::RecordSaved(record) => Some(format!(
            "Saved call #{} with {} to history",
            record.id, record.number
        )),
    }
}

fn ensure_interactive(stdin_is_terminal: bool) -> Result<()> {
    if stdin_is_terminal {
        Ok(())
    } else {
        Err(anyhow!(
            "Non-interactive session. Use 'softdial call <NUMBER>' or 'softdial incoming' instead"
        ))
    }
}

/// Prompt failures mean the terminal is gone; retrying would spin.
fn is_prompt_failure(err: &anyhow::Error) -> bool {
    err.downcast_ref::<dialoguer::Error>().is_some()
}

/// Interactive dialer: log in if needed, then loop over the screen that
/// matches the current call status until the user quits.
pub async fn run_dialer() -> Result<()> {
    info!("Starting softdial dialer");
    ensure_interactive(io::stdin().is_terminal())?;

    let config = Config::load()?;
    let session_file = SessionFile::default_location()?;
    let gate = LoginGate::new(config.login.demo_otp.clone())?;

    let mut user = match session_file.load()? {
        Some(session) => session.phone,
        None => {
            let phone = interactive_login(&gate, None)?;
            session_file.save(&phone)?;
            phone
        }
    };

    let mut controller = build_controller(&config)?;
    let mut events = controller.subscribe();
    let mut clipboard = NumberClipboard::new();
    let mut dialer = Dialer::default();
    let theme = ColorfulTheme::default();

    loop {
        let step = match controller.status() {
            CallStatus::Idle | CallStatus::Calling => {
                idle_screen(&theme, &user, &mut dialer, &mut controller, &mut clipboard, &config)
                    .await
            }
            CallStatus::Incoming => incoming_screen(&theme, &mut controller).await,
            CallStatus::InCall => in_call_screen(&theme, &mut controller).await,
        };
        report_events(&mut events);

        match step {
            Ok(Step::Continue) => {}
            Ok(Step::Logout) => {
                session_file.clear()?;
                println!("Logged out");
                user = interactive_login(&gate, None)?;
                session_file.save(&user)?;
            }
            Ok(Step::Quit) => break,
            Err(e) if is_prompt_failure(&e) => {
                // Leave an in-progress call cleanly before giving up the terminal.
                if controller.status() == CallStatus::InCall {
                    controller.hangup().await?;
                    report_events(&mut events);
                }
                return Err(e);
            }
            Err(e) => {
                error!("Dialer action failed: {:#}", e);
                println!("{:#}", e);
            }
        }
    }

    info!("Dialer closed");
    Ok(())
}

enum Step {
    Continue,
    Logout,
    Quit,
}

#[derive(Default)]
struct Dialer {
    number: String,
}

impl Dialer {
    fn display(&self) -> &str {
        if self.number.is_empty() {
            "(empty)"
        } else {
            &self.number
        }
    }
}

async fn idle_screen(
    theme: &ColorfulTheme,
    user: &str,
    dialer: &mut Dialer,
    controller: &mut SessionController,
    clipboard: &mut NumberClipboard,
    config: &Config,
) -> Result<Step> {
    println!();
    println!("Logged in as {} | Number: {}", user, dialer.display());

    let items = [
        "Call",
        "Simulate incoming",
        "Edit number",
        "Copy number",
        "Paste number",
        "Clear number",
        "History",
        "Logout",
        "Quit",
    ];
    let choice = Select::with_theme(theme)
        .with_prompt("Dialer")
        .items(&items)
        .default(0)
        .interact()?;

    match choice {
        0 => {
            controller.place_call(&dialer.number).await?;
        }
        1 => {
            controller.simulate_incoming();
        }
        2 => {
            dialer.number = Input::<String>::with_theme(theme)
                .with_prompt("Number")
                .with_initial_text(dialer.number.clone())
                .allow_empty(true)
                .interact_text()?
                .trim()
                .to_string();
        }
        3 => {
            clipboard.copy(&dialer.number)?;
            println!("Copied {}", dialer.display());
        }
        4 => {
            dialer.number = clipboard.paste()?;
            println!("Pasted {}", dialer.display());
        }
        5 => dialer.number.clear(),
        6 => browse_history(theme, controller, clipboard, dialer, config)?,
        7 => return Ok(Step::Logout),
        _ => return Ok(Step::Quit),
    }

    Ok(Step::Continue)
}

async fn incoming_screen(
    theme: &ColorfulTheme,
    controller: &mut SessionController,
) -> Result<Step> {
    let from = controller
        .session()
        .map(|session| session.peer_number.clone())
        .unwrap_or_default();

    println!();
    println!("Incoming from {}", from);
    let choice = Select::with_theme(theme)
        .items(&["Receive", "Decline"])
        .default(0)
        .interact()?;

    if choice == 0 {
        controller.receive_call().await?;
    } else {
        controller.decline_call()?;
    }
    Ok(Step::Continue)
}

async fn in_call_screen(
    theme: &ColorfulTheme,
    controller: &mut SessionController,
) -> Result<Step> {
    if let Some(session) = controller.session() {
        println!();
        println!(
            "In call with {} {}",
            session.peer_number,
            if controller.is_recording() {
                "(Recording...)"
            } else {
                "(not recorded)"
            }
        );
    }

    Select::with_theme(theme)
        .items(&["Hang up"])
        .default(0)
        .interact()?;

    controller.hangup().await?;
    Ok(Step::Continue)
}

fn browse_history(
    theme: &ColorfulTheme,
    controller: &SessionController,
    clipboard: &mut NumberClipboard,
    dialer: &mut Dialer,
    config: &Config,
) -> Result<()> {
    let records = controller.history().recent(HISTORY_PAGE)?;

    if records.is_empty() {
        println!("No calls yet");
        return Ok(());
    }

    let mut labels: Vec<String> = records.iter().map(history_label).collect();
    labels.push("Back".to_string());

    let picked = FuzzySelect::with_theme(theme)
        .with_prompt("History")
        .items(&labels)
        .default(0)
        .interact()?;
    let Some(record) = records.get(picked) else {
        return Ok(());
    };

    let mut actions = vec!["Call back", "Copy number"];
    if record.has_audio() {
        actions.push("Play recording");
        actions.push("Save recording");
    }
    actions.push("Back");

    let action = Select::with_theme(theme)
        .items(&actions)
        .default(0)
        .interact()?;

    match actions[action] {
        "Call back" => {
            dialer.number = record.number.clone();
            println!("Number set to {}", record.number);
        }
        "Copy number" => {
            clipboard.copy(&record.number)?;
            println!("Copied {}", record.number);
        }
        "Play recording" => {
            history::play_record(record, config.history.player_command.as_deref())?;
        }
        "Save recording" => {
            let path = history::export_audio(record, &global::recordings_dir()?)?;
            println!("Saved to {}", path.display());
        }
        _ => {}
    }

    Ok(())
}

fn history_label(record: &CallRecord) -> String {
    format!(
        "{} {:<8} {}  {}s{}",
        format_timestamp(record.start),
        record.direction.as_str(),
        record.number,
        record.duration_seconds(),
        if record.has_audio() { "  [rec]" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallDirection;

    #[test]
    fn test_dialer_refuses_non_terminal_stdin() {
        let err = ensure_interactive(false).unwrap_err();
        assert!(err.to_string().contains("Non-interactive session"));
        assert!(ensure_interactive(true).is_ok());
    }

    #[test]
    fn test_prompt_errors_end_the_dialer_loop() {
        let not_a_terminal = io::Error::new(io::ErrorKind::NotConnected, "not a terminal");
        let prompt_err: anyhow::Error = dialoguer::Error::from(not_a_terminal).into();
        assert!(is_prompt_failure(&prompt_err));

        let action_err = anyhow!("no clipboard tool available");
        assert!(!is_prompt_failure(&action_err));
    }

    #[test]
    fn test_calling_notice_only_on_calling_status() {
        assert_eq!(
            event_notice(&SessionEvent::StatusChanged(CallStatus::Calling)).as_deref(),
            Some("Calling... (simulated)")
        );
        assert!(event_notice(&SessionEvent::StatusChanged(CallStatus::InCall)).is_none());
        assert!(event_notice(&SessionEvent::StatusChanged(CallStatus::Idle)).is_none());

        let missed = CallRecord::missed(42, "+911234567890", 1_000);
        assert_eq!(missed.direction, CallDirection::Missed);
        assert_eq!(
            event_notice(&SessionEvent::RecordSaved(missed)).as_deref(),
            Some("Saved call #42 with +911234567890 to history")
        );
    }
}
