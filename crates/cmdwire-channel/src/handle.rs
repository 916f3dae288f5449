use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde_json::{Map, Value};
use tracing::debug;

use crate::channel::Channel;
use crate::config::ChannelConfig;
use crate::error::Result;
use crate::response::Response;

/// Shared access to one lazily-created [`Channel`].
///
/// Build it once at startup and clone it into whatever needs to talk to
/// the peer. Clones share the same channel; commands from different
/// threads are serialized by the inner mutex.
#[derive(Clone)]
pub struct ChannelHandle {
    config: ChannelConfig,
    cell: Arc<OnceLock<Mutex<Channel>>>,
    #[cfg(feature = "schema")]
    schema_registry: Option<Arc<cmdwire_schema::SchemaRegistry>>,
}

impl ChannelHandle {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            cell: Arc::new(OnceLock::new()),
            #[cfg(feature = "schema")]
            schema_registry: None,
        }
    }

    /// Attach a registry to the channel this handle creates.
    ///
    /// Has no effect once the channel exists.
    #[cfg(feature = "schema")]
    pub fn with_schema_registry(mut self, registry: Arc<cmdwire_schema::SchemaRegistry>) -> Self {
        self.schema_registry = Some(registry);
        self
    }

    /// Lock the channel, creating it on first use.
    ///
    /// A panic in another holder does not poison the handle: the channel
    /// reconnects on every send and carries nothing between calls.
    pub fn get(&self) -> MutexGuard<'_, Channel> {
        self.cell
            .get_or_init(|| {
                debug!(endpoint = %self.config.endpoint, "creating channel");
                let channel = Channel::new(self.config.clone());
                #[cfg(feature = "schema")]
                let channel = match &self.schema_registry {
                    Some(registry) => channel.with_schema_registry(Arc::clone(registry)),
                    None => channel,
                };
                Mutex::new(channel)
            })
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Shorthand for `self.get().send(name, params)`.
    pub fn send(&self, name: &str, params: Map<String, Value>) -> Result<Response> {
        self.get().send(name, params)
    }

    /// Shorthand for `self.get().send_value(name, params)`.
    pub fn send_value(&self, name: &str, params: Value) -> Result<Response> {
        self.get().send_value(name, params)
    }

    /// Whether the channel has been created yet.
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("endpoint", &self.config.endpoint)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::test_peer::{spawn_peer, PeerAction};

    fn ok_reply(n: u64) -> PeerAction {
        PeerAction::Reply(
            serde_json::to_vec(&json!({"status": "success", "result": n})).unwrap(),
        )
    }

    #[test]
    fn channel_is_created_on_first_use() {
        let (endpoint, peer) = spawn_peer(vec![ok_reply(1)]);
        let handle = ChannelHandle::new(
            ChannelConfig::new(endpoint).with_receive_timeout(Duration::from_secs(5)),
        );
        assert!(!handle.is_initialized());

        let response = handle.send("ping", Map::new()).unwrap();
        assert_eq!(response, Response::Ok { data: json!(1) });
        assert!(handle.is_initialized());

        peer.join().unwrap();
    }

    #[test]
    fn clones_share_one_channel() {
        let (endpoint, peer) = spawn_peer((0..4).map(ok_reply).collect());
        let handle = ChannelHandle::new(
            ChannelConfig::new(endpoint).with_receive_timeout(Duration::from_secs(5)),
        );

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || handle.send_value("ping", Value::Null).unwrap())
            })
            .collect();
        for worker in workers {
            assert!(worker.join().unwrap().is_ok());
        }

        assert_eq!(handle.get().connections_opened(), 4);
        assert_eq!(peer.join().unwrap().len(), 4);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let handle = ChannelHandle::new(ChannelConfig::default());
        let poisoner = handle.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.get();
            panic!("holder panicked");
        })
        .join();

        assert_eq!(handle.get().connections_opened(), 0);
    }
}
