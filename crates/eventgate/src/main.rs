//! CLI for EventGate
//!
//! Subcommands:
//! - `server`: run the SSE server
//! - `token`: print a signed token for a subject (useful for curl smoke tests)

mod demo;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use eventgate_broker::Broker;
use eventgate_config::{Settings, load_config};
use eventgate_transport::{Authenticator, Role, Shutdown, start_http_server};
use eventgate_utils::ServeError;
use tracing::{error, info, warn};

/// How long open streams get to drain after a stop request.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "eventgate")]
enum Command {
    /// Start the SSE server
    Server,
    /// Issue a token without going through /login
    Token {
        /// Subject the token identifies; routes `User`-targeted messages
        #[arg(long)]
        subject: String,
        /// Grant the broadcaster role instead of subscriber
        #[arg(long)]
        broadcaster: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cmd = Command::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            eventgate_utils::logging::init("info");
            error!("{}", ServeError::from(e));
            return ExitCode::FAILURE;
        }
    };
    eventgate_utils::logging::init(&settings.log.level);

    let result = match cmd {
        Command::Server => run_server(settings).await,
        Command::Token {
            subject,
            broadcaster,
        } => print_token(&settings, &subject, broadcaster),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_server(settings: Settings) -> Result<(), ServeError> {
    let broker = Broker::start();
    let shutdown = Shutdown::new();

    if let Some(secs) = settings.broker.demo_interval_secs.filter(|secs| *secs > 0) {
        info!("Publishing demo messages every {secs}s");
        tokio::spawn(demo::run(broker.clone(), Duration::from_secs(secs)));
    }

    let mut server = tokio::spawn({
        let settings = settings.clone();
        let broker = broker.clone();
        let shutdown = shutdown.clone();
        async move { start_http_server(&settings, broker, shutdown).await }
    });

    tokio::select! {
        joined = &mut server => {
            // The server only returns on its own when it failed to start.
            return joined.unwrap_or_else(|e| Err(ServeError::Io(std::io::Error::other(e))));
        }
        res = wait_for_signal() => {
            res?;
            info!("Shutdown signal received. Exiting gracefully.");
        }
        _ = shutdown.wait() => {}
    }
    shutdown.trigger();

    match tokio::time::timeout(DRAIN_TIMEOUT, server).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(ServeError::Io(std::io::Error::other(e))),
        Err(_) => {
            warn!("Connections still open after {DRAIN_TIMEOUT:?}, exiting anyway");
            Ok(())
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = sigterm.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

fn print_token(settings: &Settings, subject: &str, broadcaster: bool) -> Result<(), ServeError> {
    let (role, username) = if broadcaster {
        (Role::Broadcaster, &settings.auth.broadcaster_username)
    } else {
        (Role::Subscriber, &settings.auth.client_username)
    };

    let issued = Authenticator::new(&settings.auth)
        .issue(subject, username, role)
        .map_err(std::io::Error::other)?;
    info!("Token for {subject} expires at {}", issued.expires_at);
    println!("{}", issued.token);
    Ok(())
}
