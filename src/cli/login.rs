use anyhow::{anyhow, Result};
use dialoguer::{theme::ColorfulTheme, Input};
use std::io::{self, IsTerminal};

use super::args::LoginCliArgs;
use crate::auth::{LoginGate, SessionFile};
use crate::config::Config;

pub fn handle_login_command(args: LoginCliArgs) -> Result<()> {
    let config = Config::load()?;
    let gate = LoginGate::new(config.login.demo_otp.clone())?;
    let sessions = SessionFile::default_location()?;

    let phone = match (args.phone, args.otp) {
        (Some(phone), Some(otp)) => {
            let challenge = gate.request_otp(&phone)?;
            gate.verify(&challenge, &otp)?
        }
        (phone, _) => {
            if !io::stdin().is_terminal() {
                return Err(anyhow!(
                    "Non-interactive session. Use 'softdial login --phone <NUMBER> --otp <OTP>'"
                ));
            }
            interactive_login(&gate, phone)?
        }
    };

    sessions.save(&phone)?;
    println!("Logged in as: {}", phone);
    println!("Session saved to {}", sessions.path().display());
    Ok(())
}

/// Prompt until a valid phone and matching OTP are entered.
pub fn interactive_login(gate: &LoginGate, phone: Option<String>) -> Result<String> {
    let theme = ColorfulTheme::default();

    println!();
    println!("Login with Mobile (demo)");
    println!("========================");
    println!();

    let mut prefilled = phone;
    loop {
        let phone = match prefilled.take() {
            Some(phone) => phone,
            None => Input::<String>::with_theme(&theme)
                .with_prompt("Mobile number")
                .interact_text()?,
        };

        let challenge = match gate.request_otp(&phone) {
            Ok(challenge) => challenge,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        println!("OTP sent (demo code is {})", gate.demo_otp());

        loop {
            let otp = Input::<String>::with_theme(&theme)
                .with_prompt("Enter OTP (leave empty to go back)")
                .allow_empty(true)
                .interact_text()?;

            if otp.trim().is_empty() {
                break;
            }

            match gate.verify(&challenge, &otp) {
                Ok(phone) => return Ok(phone),
                Err(e) => println!("{}", e),
            }
        }
    }
}

pub fn handle_logout_command() -> Result<()> {
    if SessionFile::default_location()?.clear()? {
        println!("Logged out");
    } else {
        println!("Not logged in");
    }
    Ok(())
}

pub fn handle_whoami_command() -> Result<()> {
    match SessionFile::default_location()?.load()? {
        Some(session) => println!(
            "Logged in as: {} (since {})",
            session.phone, session.logged_in_at
        ),
        None => println!("Not logged in. Run 'softdial login' first."),
    }
    Ok(())
}
