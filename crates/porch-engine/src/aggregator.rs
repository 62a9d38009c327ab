//! Interaction aggregator.
//!
//! Loading a post:
//!
//! 1. Recover the content id from the identifier text.
//! 2. Fetch the post itself. Nothing else happens without it.
//! 3. Concurrently fetch the author profile (then verify its domain claim),
//!    reactions, reposts, zap receipts, replies, and, when an identity is
//!    active, that identity's own reactions and replies.
//! 4. Reconcile: likes and replies the network shows for the current identity
//!    are recorded in the ledger; a like the ledger has but the network tally
//!    lacks adds one to the displayed count.
//!
//! Every helper in step 3 degrades to an empty result on failure, so a flaky
//! source never sinks the whole load.
//!
//! Loads are tagged with a generation number. A load that finishes after a
//! newer one has started is returned to its caller but never installed as the
//! current snapshot. Write-through updates follow the post, not the load: they
//! apply to whichever snapshot of the same post is installed when they land.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use porch_common::{
    PorchError, PorchResult, PublicKey, SecretKey,
    models::{Event, Kind, Profile},
};
use porch_relay::{
    ContentId, Filter, IdentityVerifier, RelayClient,
    builders::{ReactionBuilder, ReplyBuilder},
};
use porch_store::ActivityLedger;
use tracing::{debug, info, warn};

use crate::{
    content::parse_body,
    snapshot::{ContentSnapshot, ReactionCounts, dedupe_newest_first, like_authors, repost_count, zap_count},
};

/// Upper bound on events requested per tally query.
const QUERY_LIMIT: usize = 500;

#[derive(Debug, Default)]
struct Current {
    generation: u64,
    content_id: Option<ContentId>,
    snapshot: Option<ContentSnapshot>,
}

pub struct InteractionAggregator {
    relay: Arc<dyn RelayClient>,
    verifier: Arc<dyn IdentityVerifier>,
    ledger: ActivityLedger,
    generation: AtomicU64,
    current: Mutex<Current>,
}

/// What the network shows for the post.
#[derive(Debug, Default)]
struct NetworkView {
    profile: Option<Profile>,
    verified: bool,
    reactions: Vec<Event>,
    reposts: Vec<Event>,
    zaps: Vec<Event>,
    replies: Vec<Event>,
    own_reactions: Vec<Event>,
    own_replies: Vec<Event>,
}

impl InteractionAggregator {
    pub fn new(relay: Arc<dyn RelayClient>, verifier: Arc<dyn IdentityVerifier>, ledger: ActivityLedger) -> Self {
        Self {
            relay,
            verifier,
            ledger,
            generation: AtomicU64::new(0),
            current: Mutex::new(Current::default()),
        }
    }

    /// The snapshot of the most recently started load, once it has resolved.
    pub fn snapshot(&self) -> Option<ContentSnapshot> {
        self.current().snapshot.clone()
    }

    // ── Loading ──────────────────────────────────────────────────────────────

    /// Load the post named by `identifier`. `viewer` is the unlocked identity, if any.
    pub async fn load(&self, identifier: &str, viewer: Option<PublicKey>) -> PorchResult<ContentSnapshot> {
        let content_id = ContentId::parse(identifier)
            .ok_or_else(|| PorchError::InvalidIdentifier(identifier.trim().to_owned()))?;
        self.load_content(content_id, viewer).await
    }

    /// Rebuild the snapshot of the currently loaded post.
    pub async fn refresh(&self, viewer: Option<PublicKey>) -> PorchResult<ContentSnapshot> {
        let content_id = self
            .current()
            .content_id
            .clone()
            .ok_or_else(|| PorchError::not_found("Loaded content"))?;
        self.load_content(content_id, viewer).await
    }

    async fn load_content(&self, content_id: ContentId, viewer: Option<PublicKey>) -> PorchResult<ContentSnapshot> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut current = self.current();
            current.generation = generation;
            current.content_id = Some(content_id.clone());
        }

        let result = self.build_snapshot(content_id.clone(), viewer).await;

        let mut current = self.current();
        if current.generation != generation {
            debug!("Discarding superseded load (generation {generation})");
            return result;
        }
        match &result {
            Ok(snapshot) => current.snapshot = Some(snapshot.clone()),
            // A failed reload of the same post keeps the last good snapshot.
            Err(_) if current.snapshot.as_ref().is_some_and(|s| s.event.id == content_id.id) => {}
            Err(_) => current.snapshot = None,
        }
        result
    }

    async fn build_snapshot(&self, content_id: ContentId, viewer: Option<PublicKey>) -> PorchResult<ContentSnapshot> {
        let hints = content_id.relays.clone();
        let event = self
            .relay
            .fetch_by_id(&content_id.id, &hints)
            .await?
            .ok_or_else(|| PorchError::not_found("Content"))?;

        let view = self.fetch_network_view(&event, viewer.as_ref(), &hints).await;
        Ok(self.reconcile(content_id, event, view, viewer.as_ref()))
    }

    async fn fetch_network_view(&self, event: &Event, viewer: Option<&PublicKey>, hints: &[String]) -> NetworkView {
        let (profile_and_verified, reactions, reposts, zaps, replies, (own_reactions, own_replies)) = tokio::join!(
            self.fetch_profile_verified(&event.pubkey, hints),
            self.query_or_empty("reactions", Filter::new().kind(Kind::REACTION).event(&event.id), hints),
            self.query_or_empty("reposts", Filter::new().kind(Kind::REPOST).event(&event.id), hints),
            self.query_or_empty("zaps", Filter::new().kind(Kind::ZAP_RECEIPT).event(&event.id), hints),
            self.query_or_empty("replies", Filter::new().kind(Kind::TEXT_NOTE).event(&event.id), hints),
            self.fetch_own_activity(&event.id, viewer, hints),
        );
        let (profile, verified) = profile_and_verified;

        NetworkView {
            profile,
            verified,
            reactions,
            reposts,
            zaps,
            replies: replies.into_iter().filter(|r| r.id != event.id).collect(),
            own_reactions,
            own_replies,
        }
    }

    async fn fetch_profile_verified(&self, author: &str, hints: &[String]) -> (Option<Profile>, bool) {
        let filter = Filter::new().kind(Kind::METADATA).author(author).limit(1);
        let profile = match self.relay.query_matching(&filter, hints).await {
            Ok(events) => events.iter().max_by_key(|e| e.created_at).and_then(Profile::from_event),
            Err(e) => {
                warn!("Profile fetch for {author} failed: {e}");
                None
            }
        };

        let verified = match (&profile, PublicKey::from_hex(author)) {
            (Some(Profile { nip05: Some(claim), .. }), Ok(pubkey)) if !claim.trim().is_empty() => {
                self.verifier.verify(claim, &pubkey).await
            }
            _ => false,
        };
        (profile, verified)
    }

    async fn fetch_own_activity(
        &self,
        event_id: &str,
        viewer: Option<&PublicKey>,
        hints: &[String],
    ) -> (Vec<Event>, Vec<Event>) {
        let Some(viewer) = viewer else {
            return (Vec::new(), Vec::new());
        };
        let filter = Filter::new()
            .author(viewer.to_hex())
            .kinds([Kind::REACTION, Kind::TEXT_NOTE])
            .event(event_id);
        let own = self.query_or_empty("own activity", filter, hints).await;
        own.into_iter().partition(|e| e.kind == Kind::REACTION)
    }

    async fn query_or_empty(&self, what: &str, filter: Filter, hints: &[String]) -> Vec<Event> {
        let filter = filter.limit(QUERY_LIMIT);
        match self.relay.query_matching(&filter, hints).await {
            Ok(events) => events,
            Err(e) => {
                warn!("Fetching {what} failed, showing none: {e}");
                Vec::new()
            }
        }
    }

    // ── Reconciliation ───────────────────────────────────────────────────────

    fn reconcile(
        &self,
        content_id: ContentId,
        event: Event,
        view: NetworkView,
        viewer: Option<&PublicKey>,
    ) -> ContentSnapshot {
        let viewer_hex = viewer.map(PublicKey::to_hex);
        let is_viewer = |e: &Event| viewer_hex.as_deref().is_some_and(|v| e.pubkey.eq_ignore_ascii_case(v));

        let likers = like_authors(&view.reactions);
        let tally_has_own_like = viewer_hex.as_deref().is_some_and(|v| likers.contains(&v.to_lowercase()));
        let network_liked = tally_has_own_like || view.own_reactions.iter().any(|e| e.is_like() && is_viewer(e));

        // Network is authoritative for confirmed likes.
        if network_liked && !self.ledger.has_liked(&event.id) {
            if let Err(e) = self.ledger.record_like(&event.id) {
                warn!("Could not record network-confirmed like: {e}");
            }
        }
        let ledger_liked = self.ledger.has_liked(&event.id);
        let is_liked = network_liked || ledger_liked;

        let own_replies = dedupe_newest_first(
            view.own_replies
                .into_iter()
                .chain(view.replies.iter().filter(|&r| is_viewer(r)).cloned())
                .filter(|r| r.references(&event.id)),
        );
        if !own_replies.is_empty() && !self.ledger.has_replied(&event.id) {
            if let Err(e) = self.ledger.record_reply(&event.id) {
                warn!("Could not record network-confirmed reply: {e}");
            }
        }
        let replies = dedupe_newest_first(view.replies.into_iter().chain(own_replies.iter().cloned()));

        let optimistic_like = usize::from(is_liked && !tally_has_own_like);
        let reaction_counts = ReactionCounts {
            likes: likers.len() + optimistic_like,
            reposts: repost_count(&view.reposts),
            zaps: zap_count(&view.zaps),
            replies: replies.len(),
        };

        ContentSnapshot {
            parsed_body: parse_body(&event.content),
            is_saved: self.ledger.has_saved(&event.id),
            content_id,
            event,
            author_profile: view.profile,
            reaction_counts,
            is_author_verified: view.verified,
            network_replies: replies,
            is_liked_by_current_identity: is_liked,
            current_identity_replies: own_replies,
        }
    }

    // ── Write-through operations ─────────────────────────────────────────────

    /// Sign and publish a reply to the loaded post.
    ///
    /// The ledger and snapshot change only after a relay accepts the reply.
    pub async fn post_reply(&self, secret: &SecretKey, text: &str) -> PorchResult<Event> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PorchError::validation("Reply text is empty"));
        }
        let (target, hints) = self.loaded()?;

        let reply = ReplyBuilder::new(&target, text)
            .relay_hint(hints.first().map(String::as_str))
            .build()
            .sign(secret)?;
        self.publish(&reply, &hints).await?;

        if let Err(e) = self.ledger.record_reply(&target.id) {
            warn!("Reply {} published but not recorded locally: {e}", reply.id);
        }
        self.update_loaded(&target.id, |snap| {
            // A reload that finished meanwhile may already show it.
            if !snap.network_replies.iter().any(|r| r.id == reply.id) {
                snap.network_replies.insert(0, reply.clone());
                snap.reaction_counts.replies += 1;
            }
            if !snap.current_identity_replies.iter().any(|r| r.id == reply.id) {
                snap.current_identity_replies.insert(0, reply.clone());
            }
        });
        info!("Replied to {} with {}", target.id, reply.id);
        Ok(reply)
    }

    /// Like the loaded post, or undo a local like.
    ///
    /// Returns the published reaction when liking, `None` when unliking. Unliking
    /// never touches the network; the earlier reaction stays published.
    pub async fn toggle_like(&self, secret: &SecretKey) -> PorchResult<Option<Event>> {
        let (target, hints) = self.loaded()?;

        if self.ledger.has_liked(&target.id) {
            self.ledger.remove_like(&target.id)?;
            self.update_loaded(&target.id, |snap| {
                snap.is_liked_by_current_identity = false;
                snap.reaction_counts.likes = snap.reaction_counts.likes.saturating_sub(1);
            });
            info!("Unliked {} locally", target.id);
            return Ok(None);
        }

        let reaction = ReactionBuilder::new(&target)
            .relay_hint(hints.first().map(String::as_str))
            .build()
            .sign(secret)?;
        self.publish(&reaction, &hints).await?;

        if let Err(e) = self.ledger.record_like(&target.id) {
            warn!("Like {} published but not recorded locally: {e}", reaction.id);
        }
        self.update_loaded(&target.id, |snap| {
            if !snap.is_liked_by_current_identity {
                snap.is_liked_by_current_identity = true;
                snap.reaction_counts.likes += 1;
            }
        });
        info!("Liked {} with {}", target.id, reaction.id);
        Ok(Some(reaction))
    }

    /// Bookmark or un-bookmark the loaded post. Local only. Returns the new state.
    pub fn toggle_save(&self) -> PorchResult<bool> {
        let (target, _) = self.loaded()?;
        let saved = if self.ledger.has_saved(&target.id) {
            self.ledger.remove_save(&target.id)?;
            false
        } else {
            self.ledger.record_save(&target.id)?;
            true
        };
        self.update_loaded(&target.id, |snap| snap.is_saved = saved);
        Ok(saved)
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn current(&self) -> MutexGuard<'_, Current> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Post and relay hints of the installed snapshot.
    fn loaded(&self) -> PorchResult<(Event, Vec<String>)> {
        let current = self.current();
        let snap = current
            .snapshot
            .as_ref()
            .ok_or_else(|| PorchError::not_found("Loaded content"))?;
        Ok((snap.event.clone(), snap.relay_hints().to_vec()))
    }

    async fn publish(&self, event: &Event, hints: &[String]) -> PorchResult<()> {
        match self.relay.publish(event, hints).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!("No relay accepted event {}", event.id);
                Err(PorchError::Network("no relay accepted the event".into()))
            }
            Err(e) => {
                warn!("Publishing event {} failed: {e}", event.id);
                Err(e.into())
            }
        }
    }

    /// Apply `apply` to the installed snapshot if it shows `event_id`.
    fn update_loaded(&self, event_id: &str, apply: impl FnOnce(&mut ContentSnapshot)) {
        let mut current = self.current();
        if let Some(snap) = current.snapshot.as_mut().filter(|s| s.event.id == event_id) {
            apply(snap);
        }
    }
}
