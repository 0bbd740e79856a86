use super::bus::TranscriptBus;
use crate::broker::Broker;
use crate::error::{Result, TranscriptError};
use crate::message::{Clock, IdGenerator, SystemClock, UuidGenerator};
use crate::store::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;

/// Assembles a [`TranscriptBus`] from its collaborators.
///
/// Broker, store and RPC timeout are required. Clock and id generator default
/// to the wall clock and random UUIDs.
#[derive(Default)]
pub struct TranscriptBusBuilder {
    broker: Option<Arc<dyn Broker>>,
    store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    rpc_timeout: Option<Duration>,
}

impl TranscriptBusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broker(mut self, broker: Arc<dyn Broker>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// How long `tag_channel` waits for a worker's reply
    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = Some(timeout);
        self
    }

    /// Validate the collaborators without touching any of them.
    pub fn build(self) -> Result<TranscriptBus> {
        let broker = self.broker.ok_or_else(|| {
            TranscriptError::Configuration("a broker binding is required".to_string())
        })?;
        let store = self.store.ok_or_else(|| {
            TranscriptError::Configuration("a keyword store binding is required".to_string())
        })?;
        let rpc_timeout = match self.rpc_timeout {
            Some(timeout) if !timeout.is_zero() => timeout,
            Some(_) => {
                return Err(TranscriptError::Configuration(
                    "rpc timeout must be greater than zero".to_string(),
                ))
            }
            None => {
                return Err(TranscriptError::Configuration(
                    "an rpc timeout is required".to_string(),
                ))
            }
        };

        Ok(TranscriptBus::from_parts(
            broker,
            store,
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            self.ids.unwrap_or_else(|| Arc::new(UuidGenerator)),
            rpc_timeout,
        ))
    }
}
