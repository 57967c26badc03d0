use std::path::Path;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use carehub::config::{session_ttl_from_env, DbConfig, HashCost};
use carehub::credentials::CredentialService;
use carehub::database::{ManagerCell, PgConnector, PgUserDirectory};
use carehub::identity::{AccessController, AuthSession, SessionPrincipal, SessionStore};
use carehub::AppError;

/// `None` on Ctrl-C / Ctrl-D. The read blocks, so it runs under `block_in_place`.
fn prompt(rl: &mut DefaultEditor, text: &str) -> anyhow::Result<Option<String>> {
    match tokio::task::block_in_place(|| rl.readline(text)) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn run_dashboard(rl: &mut DefaultEditor, principal: &SessionPrincipal) -> anyhow::Result<()> {
    let menu = AccessController::menu_for(principal.role);
    loop {
        println!("\n=== {} DASHBOARD ({}) ===", principal.role.as_str().to_uppercase(), AccessController::dashboard_path(principal.role));
        for (i, item) in menu.iter().enumerate() {
            println!("{}. {}", i + 1, item.label);
        }
        println!("{}. Logout", menu.len() + 1);
        let Some(line) = prompt(rl, "Choose option: ")? else { return Ok(()) };
        match line.trim().parse::<usize>() {
            Ok(n) if n == menu.len() + 1 => return Ok(()),
            Ok(n) if (1..=menu.len()).contains(&n) => {
                let item = menu[n - 1];
                if AccessController::allows(principal.role, item.capability) {
                    println!("{} [{}]", item.label, item.capability);
                } else {
                    println!("Not permitted.");
                }
            }
            _ => println!("Invalid option."),
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let db_cfg = match std::env::args().nth(1) {
        Some(path) => DbConfig::from_properties_file(Path::new(&path))?,
        None => DbConfig::from_env()?,
    };
    let cost = HashCost::from_env()?;
    let ttl = session_ttl_from_env()?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "carehub",
        "carehub starting: RUST_LOG='{}', driver={}, db_user={}, hash_m_kib={}, hash_t={}, session_ttl_secs={}",
        rust_log, db_cfg.driver, db_cfg.user.as_deref().unwrap_or("<url>"), cost.memory_kib, cost.iterations, ttl.as_secs()
    );

    let cell = ManagerCell::new(db_cfg, PgConnector);
    let users = PgUserDirectory::new(cell.get_instance().await?);
    users.ensure_schema().await?;
    let auth = AuthSession::new(CredentialService::new(cost)?)?;
    let sessions = SessionStore::new(ttl);

    let mut rl = DefaultEditor::new()?;
    println!("Healthcare Management System");
    loop {
        println!("\n1. Login\n2. Exit");
        let Some(choice) = prompt(&mut rl, "Choose option: ")? else { break };
        match choice.trim() {
            "1" => {
                let Some(username) = prompt(&mut rl, "Username: ")? else { break };
                let Some(secret) = prompt(&mut rl, "Password (shown as typed): ")? else { break };
                match auth.login(username.trim(), &secret, &users).await {
                    Ok(principal) => {
                        let session = sessions.issue(principal)?;
                        println!("\nLogin successful! Welcome, {}", username.trim());
                        let res = run_dashboard(&mut rl, &session.principal);
                        sessions.logout(&session.token);
                        println!("Logged out.");
                        res?;
                    }
                    Err(e) if e.is_invalid_credentials() => println!("Invalid credentials."),
                    Err(e @ AppError::UserInput { .. }) => println!("{}", e.message()),
                    Err(e) => {
                        error!(target: "carehub", error = %e, "login failed");
                        println!("Login failed, please try again later.");
                    }
                }
            }
            "2" => break,
            _ => println!("Invalid option."),
        }
    }

    cell.shutdown().await;
    println!("Exiting...");
    Ok(())
}
