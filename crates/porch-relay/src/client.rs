//! The relay client capability.
//!
//! Three operations cover everything porch needs from the network. Relay hints
//! are tried in addition to whatever relays the implementation already knows.

use async_trait::async_trait;
use porch_common::models::Event;

use crate::{error::RelayError, types::Filter};

#[async_trait]
pub trait RelayClient: Send + Sync {
    /// All events matching `filter`, newest first, de-duplicated by id.
    async fn query_matching(
        &self,
        filter: &Filter,
        relay_hints: &[String],
    ) -> Result<Vec<Event>, RelayError>;

    /// Publish a signed event. `Ok(true)` once at least one relay accepted it.
    async fn publish(&self, event: &Event, relay_hints: &[String]) -> Result<bool, RelayError>;

    /// A single event by id, or `None` if no relay returned it.
    async fn fetch_by_id(&self, id: &str, relay_hints: &[String]) -> Result<Option<Event>, RelayError> {
        let filter = Filter::new().id(id).limit(1);
        let events = self.query_matching(&filter, relay_hints).await?;
        Ok(events.into_iter().find(|e| e.id.eq_ignore_ascii_case(id)))
    }
}
