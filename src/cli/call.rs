use anyhow::Result;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::args::{CallCliArgs, IncomingCliArgs};
use crate::app::{self, report_events};
use crate::call::{CallRecord, CallStatus, SessionController};
use crate::config::Config;

pub async fn handle_call_command(args: CallCliArgs) -> Result<()> {
    let user = app::require_login()?;
    let config = Config::load()?;
    let interrupt = CancellationToken::new();
    app::cancel_on_ctrl_c(interrupt.clone());

    let mut controller = app::build_controller(&config)?;
    let mut events = controller.subscribe();

    info!("{} dialing {}", user, args.number);
    let link = app::abort_setup_on(&interrupt, &controller);
    let status = controller.place_call(&args.number).await;
    link.abort();
    let status = status?;
    report_events(&mut events);

    if status == CallStatus::InCall {
        stay_in_call(&mut controller, args.seconds, &interrupt).await;
        let record = controller.hangup().await?;
        report_events(&mut events);
        print_outcome(record.as_ref());
    }

    Ok(())
}

pub async fn handle_incoming_command(args: IncomingCliArgs) -> Result<()> {
    app::require_login()?;
    let config = Config::load()?;
    let interrupt = CancellationToken::new();
    app::cancel_on_ctrl_c(interrupt.clone());

    let mut controller = app::build_controller(&config)?;
    let mut events = controller.subscribe();

    controller.simulate_incoming();
    if let Some(session) = controller.session() {
        println!("Incoming from {}", session.peer_number);
    }

    if args.decline {
        let record = controller.decline_call()?;
        report_events(&mut events);
        print_outcome(record.as_ref());
        return Ok(());
    }

    let link = app::abort_setup_on(&interrupt, &controller);
    let status = controller.receive_call().await;
    link.abort();
    let status = status?;
    report_events(&mut events);

    if status == CallStatus::InCall {
        stay_in_call(&mut controller, args.seconds, &interrupt).await;
        let record = controller.hangup().await?;
        report_events(&mut events);
        print_outcome(record.as_ref());
    }

    Ok(())
}

async fn stay_in_call(
    controller: &mut SessionController,
    seconds: u64,
    interrupt: &CancellationToken,
) {
    if let Some(session) = controller.session() {
        println!(
            "In call with {} ({}), hanging up in {}s",
            session.peer_number,
            if controller.is_recording() {
                "Recording..."
            } else {
                "Not recording"
            },
            seconds
        );
    }

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = interrupt.cancelled() => println!("Interrupted, hanging up"),
    }
}

fn print_outcome(record: Option<&CallRecord>) {
    match record {
        Some(record) => println!(
            "Saved call #{} ({}, {}s{})",
            record.id,
            record.direction.as_str(),
            record.duration_seconds(),
            if record.has_audio() { ", recorded" } else { "" }
        ),
        None => println!("Call ended, nothing recorded"),
    }
}
