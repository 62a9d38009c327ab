//! porch-engine: everything about one post.
//!
//! [`InteractionAggregator`] loads a post together with its network context and
//! reconciles it with the local [`ActivityLedger`](porch_store::ActivityLedger);
//! its write-through operations publish first and record second.

pub mod aggregator;
pub mod content;
pub mod signer;
pub mod snapshot;

pub use aggregator::InteractionAggregator;
pub use content::{ParsedBody, parse_body};
pub use signer::ensure_signer;
pub use snapshot::{ContentSnapshot, ReactionCounts};
