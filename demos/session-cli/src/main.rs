use clap::{Parser, Subcommand};
use tokenkeep::prelude::*;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Drive a Tokenkeep session from the terminal.
///
/// The session is restored from storage before every command.
#[derive(Parser, Debug)]
#[command(name = "session-cli", about = "Tokenkeep session demo")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Show who is signed in (the default).
    Status,
    /// Log in with a username and password.
    Login { username: String, password: String },
    /// Create an account. Does not log in.
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Sign out and forget the stored tokens.
    Logout,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn describe(view: &SessionProjection) -> String {
    match &view.identity {
        Some(identity) if view.is_authenticated => format!("signed in as {identity}"),
        _ if view.is_submitting => "waiting for the server".into(),
        _ => "signed out".into(),
    }
}

fn describe_notice(notice: &Notice) -> String {
    match notice {
        Notice::NavigateToAuthenticated(identity) => format!("welcome, {}", identity.username),
        Notice::LoginFailed(e) => format!("login failed: {e}"),
        Notice::SignupSucceeded => "account created, you can log in now".into(),
        Notice::SignupFailed(e) => format!("signup failed: {e}"),
        Notice::SessionDiscarded(DiscardReason::NoRefreshToken) => {
            "session expired, please log in again".into()
        }
        Notice::SessionDiscarded(DiscardReason::Malformed(e)) => {
            format!("stored session was unreadable ({e}), please log in again")
        }
        Notice::SessionDiscarded(DiscardReason::RefreshFailed(e)) => {
            format!("session could not be renewed ({e}), please log in again")
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("warn");

    let command = Cli::parse().command.unwrap_or(Command::Status);

    let config = Config::from_env()?;
    tracing::info!(
        environment = %config.environment,
        base_url = %config.base_url,
        storage = %config.storage_path.display(),
        "configuration loaded"
    );

    let session = SessionBuilder::from_config(&config).build();

    let mut notices = session.notices();
    let printer = tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            println!("* {}", describe_notice(&notice));
        }
    });

    session.startup().await?;

    let outcome = match command {
        Command::Status => Ok(()),
        Command::Login { username, password } => session
            .login(LoginRequest::new(username, password))
            .await
            .map(|_| ()),
        Command::Register {
            username,
            email,
            password,
        } => {
            session
                .register(RegisterRequest::new(username, email, password))
                .await
        }
        Command::Logout => session.logout().await,
    };

    println!("{}", describe(&session.projection()));

    // Closing the channel lets the printer drain and exit.
    drop(session);
    printer.await?;

    if let Err(e) = outcome {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
    Ok(())
}
