//! Command handlers. Each one returns a typed error; `main` turns it into a message.

use std::sync::Arc;

use porch_common::{
    PorchError, PorchResult, PublicKey,
    config::AppConfig,
    models::IdentityState,
};
use porch_engine::{ContentSnapshot, InteractionAggregator, ensure_signer};
use porch_identity::{IdentitySession, KeyVault};
use porch_relay::{WellKnownVerifier, WsRelayPool, identifier};
use porch_store::Stores;
use tracing::info;

use crate::{Command, IdentityCommand};

pub struct Context {
    session: IdentitySession,
    aggregator: InteractionAggregator,
}

impl Context {
    pub fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let stores = Stores::open(&config.storage)?;
        let session = IdentitySession::new(stores, KeyVault::new(config.vault.kdf_iterations));

        let relay = Arc::new(WsRelayPool::from_config(&config.relays));
        let verifier = Arc::new(WellKnownVerifier::from_config(&config.verification)?);
        let aggregator = InteractionAggregator::new(relay, verifier, session.ledger().clone());

        info!("📡 {} relay(s) configured", config.relays.urls.len());
        Ok(Self { session, aggregator })
    }

    pub async fn execute(&self, command: Command) -> PorchResult<()> {
        match command {
            Command::Identity { command } => self.identity(command),
            Command::Show { identifier } => {
                let viewer = self.viewer()?;
                let snapshot = self.aggregator.load(&identifier, viewer).await?;
                print_snapshot(&snapshot);
                Ok(())
            }
            Command::Like { identifier } => {
                let signer = ensure_signer(&self.session)?;
                self.aggregator.load(&identifier, Some(signer.public)).await?;
                match self.aggregator.toggle_like(&signer.secret).await? {
                    Some(reaction) => println!("Liked ({})", reaction.id),
                    None => println!("Like removed locally"),
                }
                self.print_counts();
                Ok(())
            }
            Command::Save { identifier } => {
                let viewer = self.viewer()?;
                self.aggregator.load(&identifier, viewer).await?;
                let saved = self.aggregator.toggle_save()?;
                println!("{}", if saved { "Saved" } else { "Removed from saved" });
                Ok(())
            }
            Command::Reply { identifier, text } => {
                let signer = ensure_signer(&self.session)?;
                self.aggregator.load(&identifier, Some(signer.public)).await?;
                let reply = self.aggregator.post_reply(&signer.secret, &text).await?;
                println!("Replied ({})", reply.id);
                self.print_counts();
                Ok(())
            }
            Command::Activity => {
                let record = self.session.ledger().get_activity();
                let json = serde_json::to_string_pretty(&record)
                    .map_err(|e| PorchError::Internal(e.into()))?;
                println!("{json}");
                Ok(())
            }
        }
    }

    fn identity(&self, command: IdentityCommand) -> PorchResult<()> {
        match command {
            IdentityCommand::Create { password } => {
                let public = self.session.create_identity(password.as_deref())?;
                println!("{}", npub(&public)?);
                if password.is_some() {
                    println!("Identity is locked; run `porch identity unlock` to use it.");
                }
            }
            IdentityCommand::Unlock { password, remember } => {
                let keypair = self.session.unlock(&password, remember)?;
                println!("Unlocked {}", npub(&keypair.public)?);
            }
            IdentityCommand::Lock => {
                self.session.lock()?;
                println!("Locked");
            }
            IdentityCommand::Burn { yes } => {
                if !yes {
                    return Err(PorchError::validation("Burning is irreversible; pass --yes to confirm"));
                }
                self.session.burn_identity()?;
                println!("Identity and activity erased");
            }
            IdentityCommand::Claim { password } => {
                let public = self.session.claim(&password)?;
                println!("Claimed {}", npub(&public)?);
            }
            IdentityCommand::Status => {
                self.session.resume()?;
                match self.session.state() {
                    IdentityState::NoIdentity => println!("No identity"),
                    IdentityState::LockedEncrypted => println!("Locked (encrypted)"),
                    IdentityState::UnlockedEphemeral(pk) => println!("Ephemeral {}", npub(&pk)?),
                    IdentityState::UnlockedEncrypted(pk) => println!("Unlocked {}", npub(&pk)?),
                }
            }
            IdentityCommand::Export => {
                let nsec = self.session.export_secret()?;
                println!("{}", nsec.as_str());
            }
        }
        Ok(())
    }

    /// The identity usable without a password, if any.
    fn viewer(&self) -> PorchResult<Option<PublicKey>> {
        self.session.resume()?;
        Ok(self.session.state().public_key())
    }

    fn print_counts(&self) {
        if let Some(snapshot) = self.aggregator.snapshot() {
            let c = snapshot.reaction_counts;
            println!("♥ {}  ↻ {}  ⚡ {}  💬 {}", c.likes, c.reposts, c.zaps, c.replies);
        }
    }
}

fn npub(public: &PublicKey) -> PorchResult<String> {
    identifier::encode_npub(public).map_err(PorchError::from)
}

fn print_snapshot(snap: &ContentSnapshot) {
    let author = snap
        .author_profile
        .as_ref()
        .and_then(|p| p.label())
        .map(str::to_owned)
        .unwrap_or_else(|| snap.event.pubkey.chars().take(12).collect());
    let badge = if snap.is_author_verified { " ✓" } else { "" };
    let date = snap
        .event
        .created_at_utc()
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_default();

    println!("{author}{badge}  {date}");
    if let Ok(encoded) = snap.content_id.encoded() {
        println!("{encoded}");
    }
    println!();
    println!("{}", snap.parsed_body.text);
    for url in &snap.parsed_body.image_urls {
        println!("[image] {url}");
    }
    for url in &snap.parsed_body.video_urls {
        println!("[video] {url}");
    }
    println!();

    let c = snap.reaction_counts;
    let liked = if snap.is_liked_by_current_identity { " (you)" } else { "" };
    let saved = if snap.is_saved { "  [saved]" } else { "" };
    println!("♥ {}{liked}  ↻ {}  ⚡ {}  💬 {}{saved}", c.likes, c.reposts, c.zaps, c.replies);

    for reply in &snap.network_replies {
        let mine = snap.current_identity_replies.iter().any(|r| r.id == reply.id);
        let who = if mine { "you".to_owned() } else { reply.pubkey.chars().take(12).collect() };
        println!("  ↳ {who}: {}", reply.content.lines().next().unwrap_or_default());
    }
}
