//! In-process implementation of the backend contract.
//!
//! Replicates what the three server-side scripts do — a shared map with TTL
//! plus a broadcast of the invalidation payload — so the coherency scenarios
//! can run several cache instances against one "backend" without any network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use nearcache_core::Result;
use nearcache_redis::backend::{Backend, PayloadStream};

struct StoredValue {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

#[derive(Default)]
pub struct LoopbackBackend {
    store: Mutex<HashMap<String, StoredValue>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Vec<u8>>>>,
    reads: AtomicUsize,
}

impl LoopbackBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// How many times `get_with_ttl` has been executed. Lets tests assert a
    /// read was served without a backend round trip.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Deliver a payload to every subscriber, own-instance included, the way
    /// the real channel does.
    fn publish(&self, payload: &[u8]) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(payload.to_vec()).is_ok());
    }
}

#[async_trait]
impl Backend for LoopbackBackend {
    async fn set_and_publish(
        &self,
        key: &str,
        value: &[u8],
        ttl_secs: u64,
        _channel: &str,
        payload: &[u8],
    ) -> Result<()> {
        let expires_at = (ttl_secs > 0).then(|| Instant::now() + Duration::from_secs(ttl_secs));
        self.store.lock().insert(
            key.to_owned(),
            StoredValue {
                bytes: value.to_vec(),
                expires_at,
            },
        );
        self.publish(payload);
        Ok(())
    }

    async fn get_with_ttl(&self, key: &str) -> Result<Option<(Vec<u8>, i64)>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let mut store = self.store.lock();

        let expired = matches!(
            store.get(key),
            Some(value) if value.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
        );
        if expired {
            store.remove(key);
            return Ok(None);
        }

        Ok(store.get(key).map(|value| {
            let ttl = match value.expires_at {
                Some(deadline) => (deadline - Instant::now()).as_secs_f64().ceil() as i64,
                None => -1,
            };
            (value.bytes.clone(), ttl)
        }))
    }

    async fn delete_and_publish(&self, key: &str, _channel: &str, payload: &[u8]) -> Result<()> {
        self.store.lock().remove(key);
        self.publish(payload);
        Ok(())
    }

    async fn subscribe(&self, _channel: &str) -> Result<PayloadStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        let stream =
            futures_util::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|m| (m, rx)) });
        Ok(stream.boxed())
    }
}
