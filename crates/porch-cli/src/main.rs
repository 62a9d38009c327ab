//! # porch
//!
//! Interact with a single decentralized post from the terminal:
//! - identity lifecycle (ephemeral, claimed, locked/unlocked, burned)
//! - show a post with its reactions, replies and the author's verified claim
//! - like, save and reply, reconciled with the local activity ledger
//!
//! Durable state lives in a JSON file under `storage.data_dir`; the session file,
//! which may hold an unlocked key, lives in the login's runtime directory.

mod commands;

use clap::{Parser, Subcommand};

use crate::commands::Context;

#[derive(Parser, Debug)]
#[command(name = "porch", version)]
#[command(about = "Identity vault and interactions for a single post")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the local identity
    Identity {
        #[command(subcommand)]
        command: IdentityCommand,
    },
    /// Show a post with its network context
    Show { identifier: String },
    /// Like a post, or undo an earlier like
    Like { identifier: String },
    /// Bookmark a post, or remove the bookmark
    Save { identifier: String },
    /// Reply to a post
    Reply { identifier: String, text: String },
    /// Print the local activity record
    Activity,
}

#[derive(Subcommand, Debug)]
enum IdentityCommand {
    /// Create an identity; with a password it is encrypted, otherwise ephemeral
    Create {
        #[arg(long, env = "PORCH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Decrypt the identity and keep it unlocked for the session
    Unlock {
        #[arg(long, env = "PORCH_PASSWORD", hide_env_values = true)]
        password: String,
        /// Cache the decrypted key, unencrypted, in the session file under
        /// $XDG_RUNTIME_DIR/porch (cleared at logout) until `porch identity lock`
        #[arg(long)]
        remember: bool,
    },
    /// Forget the session key
    Lock,
    /// Erase the identity and all local activity
    Burn {
        /// Required; burning cannot be undone
        #[arg(long)]
        yes: bool,
    },
    /// Protect the ephemeral identity with a password, keeping its keys
    Claim {
        #[arg(long, env = "PORCH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print the identity state
    Status,
    /// Print the unlocked secret key as nsec
    Export,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = porch_common::config::init()?;

    // Logs go to stderr; stdout is for command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "porch=info".into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("porch v{} starting", env!("CARGO_PKG_VERSION"));

    let ctx = Context::open(config)?;
    if let Err(e) = ctx.execute(args.command).await {
        tracing::debug!(code = e.error_code(), "Command failed: {e}");
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}
