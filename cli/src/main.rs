use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use eventgate::services::gate::{DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD};
use eventgate::{AdminCredentials, FileStorage, GateError, RequiredRole, SessionGate, StorageError, guard};
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Gate(#[from] GateError),
    #[error("cannot open data directory: {0}")]
    Storage(#[from] StorageError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("access denied; visitor would be sent to {0}")]
    Denied(&'static str),
}

#[derive(Parser, Debug)]
#[command(name = "eventgate-cli", about = "Local session gate for the event site")]
struct Cli {
    /// Directory holding `users.json` and `authUser.json`.
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    #[arg(long, env = "ADMIN_EMAIL", default_value = DEFAULT_ADMIN_EMAIL)]
    admin_email: String,

    #[arg(long, env = "ADMIN_PASSWORD", default_value = DEFAULT_ADMIN_PASSWORD, hide_env_values = true)]
    admin_password: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a standard account.
    Signup {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and persist the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Clear the current session.
    Logout,
    /// Print the current session.
    Whoami,
    /// Print whether a session exists and whether it is an admin.
    Status,
    /// Make sure the admin account exists.
    SeedAdmin,
    /// Exit non-zero unless the current session passes the guard.
    Check {
        #[arg(long)]
        admin: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn open_gate(cli: &Cli) -> Result<SessionGate, CliError> {
    let storage = FileStorage::open(&cli.data_dir)?;
    let admin = AdminCredentials { email: cli.admin_email.clone(), password: cli.admin_password.clone() };
    Ok(SessionGate::new(Arc::new(storage)).with_admin(admin))
}

fn run(cli: Cli) -> Result<(), CliError> {
    let gate = open_gate(&cli)?;

    match cli.command {
        Command::Signup { first_name, last_name, email, password } => {
            let user = gate.create_account(&first_name, &last_name, &email, &password)?;
            print_json(&serde_json::to_value(user.public())?)
        }
        Command::Login { email, password } => {
            let session = gate.authenticate(&email, &password)?;
            print_json(&serde_json::to_value(session)?)
        }
        Command::Logout => {
            gate.logout()?;
            println!("logged out");
            Ok(())
        }
        Command::Whoami => match gate.get_current_session() {
            Some(session) => print_json(&serde_json::to_value(session)?),
            None => {
                println!("anonymous");
                Ok(())
            }
        },
        Command::Status => print_json(&json!({
            "authenticated": gate.is_authenticated(),
            "admin": gate.is_admin(),
        })),
        Command::SeedAdmin => {
            let admin = gate.create_admin_account()?;
            print_json(&serde_json::to_value(admin.public())?)
        }
        Command::Check { admin } => check(&gate, admin),
    }
}

fn check(gate: &SessionGate, admin: bool) -> Result<(), CliError> {
    let required = if admin { RequiredRole::Admin } else { RequiredRole::Authenticated };
    let session = gate.get_current_session();
    match guard(session.as_ref(), required).redirect_path() {
        None => {
            println!("ok");
            Ok(())
        }
        Some(target) => Err(CliError::Denied(target)),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
