//! murmur: single-peer obfuscated TCP chat.
//!
//! # Usage
//!
//! ```bash
//! # Wait for a peer
//! murmur --key s3cret listen --bind 0.0.0.0 --port 65432
//!
//! # Join it
//! MURMUR_KEY=s3cret murmur connect --host 192.168.1.20 --port 65432
//!
//! # Browse recorded conversations
//! murmur history list
//! murmur history search hello
//! ```

use std::{
    io,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use murmur_cipher::Key;
use murmur_cli::{CliError, TerminalPresenter, chat, history};
use murmur_net::EndpointConfig;
use murmur_session::Session;
use murmur_store::RedbStore;
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Single-peer TCP chat with a shared-key XOR obfuscation layer
#[derive(Parser, Debug)]
#[command(name = "murmur")]
#[command(about = "Single-peer TCP chat with XOR obfuscation")]
#[command(version)]
struct Args {
    /// Shared key (blank selects the built-in default)
    #[arg(short, long, env = "MURMUR_KEY", hide_env_values = true, global = true)]
    key: Option<String>,

    /// History file
    #[arg(long, default_value = "murmur_history.redb", global = true)]
    db: PathBuf,

    /// Do not record history
    #[arg(long, global = true)]
    no_history: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Wait for one peer at a time
    Listen {
        /// Address to bind to
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,

        /// Port to bind to
        #[arg(short, long, default_value_t = 65432)]
        port: u16,
    },

    /// Connect to a listening peer
    Connect {
        /// Host to connect to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to connect to
        #[arg(short, long, default_value_t = 65432)]
        port: u16,
    },

    /// Browse recorded conversations
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// List sessions, newest first
    List,
    /// Print one session's transcript
    Show {
        /// Session id
        id: u64,
    },
    /// Find lines containing a keyword
    Search {
        /// Text to look for (case-insensitive)
        keyword: String,
    },
    /// Delete a session and its transcript
    Delete {
        /// Session id
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    match args.command {
        Mode::History { action } => {
            let store = RedbStore::open(&args.db)?;
            let mut out = io::stdout().lock();
            match action {
                HistoryAction::List => history::list(&store, &mut out)?,
                HistoryAction::Show { id } => history::show(&store, id, &mut out)?,
                HistoryAction::Search { keyword } => history::search(&store, &keyword, &mut out)?,
                HistoryAction::Delete { id } => history::delete(&store, id, &mut out)?,
            }
        },
        Mode::Listen { bind, port } => {
            let mut session = open_session(args.key.as_deref(), &args.db, args.no_history);
            session.listen(&bind, port).await?;
            converse(&mut session).await?;
        },
        Mode::Connect { host, port } => {
            let mut session = open_session(args.key.as_deref(), &args.db, args.no_history);
            session.connect(&host, port).await?;
            converse(&mut session).await?;
        },
    }

    Ok(())
}

type TerminalSession = Session<TerminalPresenter<io::Stdout>, RedbStore>;

/// Build an idle session. History problems are reported, not fatal.
fn open_session(key: Option<&str>, db: &Path, no_history: bool) -> TerminalSession {
    let key = key.map(Key::from_input).unwrap_or_default();
    tracing::info!(key = %key.masked(), "using key");

    let mut presenter = TerminalPresenter::new(io::stdout());
    let store = if no_history {
        None
    } else {
        match RedbStore::open(db) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(path = %db.display(), "history disabled: {e}");
                presenter.info(&format!("History disabled: {e}"));
                None
            },
        }
    };

    Session::new(presenter, store, key, EndpointConfig::default())
}

async fn converse(session: &mut TerminalSession) -> Result<(), CliError> {
    session.presenter_mut().info("Type a message and press Enter. /help lists commands.");
    let exit = chat::run(session, BufReader::new(tokio::io::stdin())).await?;
    tracing::info!(?exit, "conversation over");
    Ok(())
}
