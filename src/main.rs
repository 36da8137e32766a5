use clap::{Arg, ArgMatches, Command};
use log::{error, info, warn};
use std::process;

use signup_confirm::auth::{
    confirm_from_link, read_password, register_with_delivery, ConfirmationError,
    RegistrationResponse,
};
use signup_confirm::context::AppContext;
use signup_confirm::utils::io::read_line;
use signup_confirm::utils::logging::initialize_logging;
use signup_confirm::utils::time::format_timestamp;
use signup_confirm::{AppConfig, RegistrationCredentials, User};

fn cli() -> Command {
    Command::new("signup-confirm")
        .version("0.1.0")
        .about("Register accounts and confirm them from the emailed token")
        .subcommand_required(true)
        .subcommand(
            Command::new("register")
                .about("Start a registration and send the verification email")
                .arg(
                    Arg::new("username")
                        .help("Account username (prompted when omitted)")
                        .long("username")
                        .short('u')
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    Arg::new("email")
                        .help("Address the verification email goes to (prompted when omitted)")
                        .long("email")
                        .short('e')
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    Arg::new("password")
                        .help("Account password; read without echo when omitted")
                        .long("password")
                        .value_parser(clap::value_parser!(String)),
                ),
        )
        .subcommand(
            Command::new("confirm")
                .about("Confirm a pending registration")
                .arg(
                    Arg::new("token")
                        .help("Token from the verification email")
                        .required(true),
                ),
        )
}

/// Take an argument value or ask for it on stdin
fn value_or_prompt(
    matches: &ArgMatches,
    name: &str,
    prompt: impl FnOnce() -> std::io::Result<String>,
) -> std::io::Result<String> {
    match matches.get_one::<String>(name) {
        Some(value) => Ok(value.clone()),
        None => prompt(),
    }
}

/// Message for stdout on success, or for stderr on failure
fn registration_report(response: &RegistrationResponse) -> Result<String, String> {
    if response.error {
        Err(response.message.clone())
    } else {
        Ok(response.message.clone())
    }
}

/// Lines for stdout on success, or the failure line for stderr
fn confirmation_report(result: &Result<User, ConfirmationError>) -> Result<Vec<String>, String> {
    match result {
        Ok(user) => Ok(vec![
            format!("Account confirmed: {}", user.username),
            format!("Email: {}", user.email),
            format!("Created: {}", format_timestamp(user.created_at)),
        ]),
        Err(e) => Err(format!("{} ({})", e, e.kind())),
    }
}

async fn run_register(ctx: &AppContext, matches: &ArgMatches) -> std::io::Result<bool> {
    let username = value_or_prompt(matches, "username", || read_line("Username: "))?;
    let email = value_or_prompt(matches, "email", || read_line("Email: "))?;
    let password = value_or_prompt(matches, "password", || read_password("Password: "))?;

    let (response, delivery) =
        register_with_delivery(ctx, RegistrationCredentials::new(username, email, password)).await;
    match registration_report(&response) {
        Ok(message) => println!("{}", message),
        Err(message) => eprintln!("{}", message),
    }

    // The process is about to exit; let the detached send finish first
    if let Some(delivery) = delivery {
        match delivery.outcome().await {
            Ok(info) => info!("Verification email accepted: {}", info.message_id),
            Err(e) => warn!("Verification email was not sent: {}", e),
        }
    }

    Ok(!response.error)
}

async fn run_confirm(ctx: &AppContext, matches: &ArgMatches) -> bool {
    let token = match matches.get_one::<String>("token") {
        Some(token) => token,
        None => return false,
    };

    match confirmation_report(&confirm_from_link(ctx, token).await) {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            true
        }
        Err(message) => {
            eprintln!("{}", message);
            false
        }
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(2);
        }
    };

    if let Err(e) = initialize_logging(&config.log_file) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    for notice in &config.notices {
        warn!("{}", notice);
    }

    let ctx = match AppContext::connect(&config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Startup failed: {}", e);
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    let succeeded = match matches.subcommand() {
        Some(("register", sub_matches)) => match run_register(&ctx, sub_matches).await {
            Ok(succeeded) => succeeded,
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                false
            }
        },
        Some(("confirm", sub_matches)) => run_confirm(&ctx, sub_matches).await,
        _ => false,
    };

    if !succeeded {
        process::exit(1);
    }
}
