use anyhow::Result;
use clap::Parser;
use softdial::{
    app,
    cli::{
        handle_call_command, handle_history_command, handle_incoming_command,
        handle_login_command, handle_logout_command, handle_whoami_command, Cli, CliCommand,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("softdial {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::Login(args)) => {
            handle_login_command(args)?;
            return Ok(());
        }
        Some(CliCommand::Logout) => {
            handle_logout_command()?;
            return Ok(());
        }
        Some(CliCommand::Whoami) => {
            handle_whoami_command()?;
            return Ok(());
        }
        Some(CliCommand::Call(args)) => {
            handle_call_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::Incoming(args)) => {
            handle_incoming_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::History(args)) => {
            handle_history_command(args)?;
            return Ok(());
        }
        None => {}
    }

    app::run_dialer().await
}
