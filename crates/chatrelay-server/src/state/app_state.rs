use crate::config::RelayConfig;
use crate::coordinator::Coordinator;
use crate::relay::EventRelay;
use crate::rooms::{HistoryStore, RoomDirectory};
use crate::transport::Hub;
use chatrelay_core::{CoordinationStore, EventBus, InstanceId, LocalBus, MemoryStore};
use chatrelay_redis::{RedisBus, RedisStore};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Identifier of this process on the bus
    pub instance_id: InstanceId,

    /// Effective configuration
    pub config: Arc<RelayConfig>,

    /// Locally connected clients and room groups
    pub hub: Arc<Hub>,

    /// Room existence and member counts
    pub directory: Arc<RoomDirectory>,

    /// Cross-instance relay
    pub relay: Arc<EventRelay>,

    /// Request handlers
    pub coordinator: Arc<Coordinator>,

    /// Prometheus renderer, absent when no recorder is installed
    pub metrics: Option<PrometheusHandle>,

    /// Bus receive loop
    pub relay_task: Arc<JoinHandle<()>>,
}

impl AppState {
    /// Connect the configured backends and start the relay
    pub async fn connect(config: RelayConfig, metrics: Option<PrometheusHandle>) -> anyhow::Result<Self> {
        let (store, bus): (Arc<dyn CoordinationStore>, Arc<dyn EventBus>) = match &config.redis_url {
            Some(url) => (
                Arc::new(RedisStore::connect(url).await?),
                Arc::new(RedisBus::connect(url, config.channel.clone()).await?),
            ),
            None => {
                info!("No Redis URL configured, running single-instance in memory");
                (Arc::new(MemoryStore::new()), Arc::new(LocalBus::default()))
            }
        };

        Ok(Self::build(config, store, bus, metrics).await?)
    }

    /// Wire components over the given backends. Instances sharing a store
    /// and bus behave as one cluster.
    pub async fn build(
        config: RelayConfig,
        store: Arc<dyn CoordinationStore>,
        bus: Arc<dyn EventBus>,
        metrics: Option<PrometheusHandle>,
    ) -> chatrelay_core::Result<Self> {
        let instance_id = InstanceId::generate();
        let hub = Arc::new(Hub::with_capacity(config.outbound_buffer));
        let directory = Arc::new(RoomDirectory::new(store.clone(), &config.key_prefix));
        let history = Arc::new(HistoryStore::new(
            store.clone(),
            &config.key_prefix,
            config.max_history,
        ));

        let relay = Arc::new(EventRelay::new(
            instance_id.clone(),
            bus,
            directory.clone(),
            history.clone(),
            hub.clone(),
        ));
        let relay_task = relay.clone().start().await?;

        let coordinator = Arc::new(Coordinator::new(
            directory.clone(),
            history,
            relay.clone(),
            hub.clone(),
        ));

        info!(
            instance = %instance_id,
            store = store.backend(),
            "Application state initialized"
        );

        Ok(Self {
            instance_id,
            config: Arc::new(config),
            hub,
            directory,
            relay,
            coordinator,
            metrics,
            relay_task: Arc::new(relay_task),
        })
    }
}
