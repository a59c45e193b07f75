//! Background task ingesting peer invalidations.
//!
//! Each inbound payload is decoded, checked against the local process uuid
//! (self-loop suppression), and applied to the slot freshness table with the
//! receive time. Malformed payloads are logged and dropped; they are never
//! fatal. The task ends when the subscription stream does.

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use nearcache_core::{now_micros, InvalidationMessage, SlotFreshness};

use crate::backend::PayloadStream;

pub(crate) struct InvalidationListener {
    uuid: Uuid,
    freshness: Arc<SlotFreshness>,
}

impl InvalidationListener {
    pub(crate) fn new(uuid: Uuid, freshness: Arc<SlotFreshness>) -> Self {
        Self { uuid, freshness }
    }

    pub(crate) async fn run(self, mut stream: PayloadStream) {
        info!(uuid = %self.uuid, "invalidation listener started");

        while let Some(payload) = stream.next().await {
            let message = match InvalidationMessage::decode(&payload) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "dropping malformed invalidation payload");
                    continue;
                }
            };

            if message.uuid == self.uuid {
                debug!(slot = message.slot, "ignoring own invalidation");
                continue;
            }

            self.freshness.mark(message.slot, now_micros());
            debug!(slot = message.slot, origin = %message.uuid, "slot marked stale by peer");
        }

        info!(uuid = %self.uuid, "invalidation listener stopped");
    }
}
