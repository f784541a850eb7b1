//! Infrastructure wiring: event store, bus, projections, dropdown storage
//! and the realtime channel behind `/api/stream`.

use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tracing::{info, warn};

use loomworks_core::{Aggregate, AggregateId, DomainError, TenantId};
use loomworks_events::{EventEnvelope, InMemoryEventBus};
use loomworks_infra::{
    AppConfig,
    command_dispatcher::{CommandDispatcher, DispatchError},
    dropdowns::{DropdownStore, DropdownStoreError, InMemoryDropdownStore, PostgresDropdownStore},
    event_store::{EventStore, EventStoreError, InMemoryEventStore, PostgresEventStore, StoredEvent},
    projections::{Notification, ProjectionError, ProjectionSet, ReplayError, replay},
    workers::{ProjectionWorker, WorkerHandle},
};

/// Realtime message broadcast via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub tenant_id: TenantId,
    pub topic: String,
    pub payload: JsonValue,
}

impl RealtimeMessage {
    fn projection_updated(env: &EventEnvelope<JsonValue>) -> Self {
        let at = env.aggregate_type();
        Self {
            tenant_id: env.tenant_id(),
            topic: format!("{at}.projection_updated"),
            payload: serde_json::json!({
                "kind": "projection_update",
                "aggregate_type": at,
                "aggregate_id": env.aggregate_id().to_string(),
                "sequence_number": env.sequence_number(),
            }),
        }
    }

    fn notification(tenant_id: TenantId, notification: &Notification) -> Self {
        Self {
            tenant_id,
            topic: "notification".to_string(),
            payload: serde_json::to_value(notification).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("DATABASE_URL is required for persistent stores")]
    MissingDatabaseUrl,

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    EventStore(#[from] EventStoreError),

    #[error(transparent)]
    Dropdowns(#[from] DropdownStoreError),

    #[error("read model rebuild failed: {0}")]
    Replay(#[from] ReplayError),

    #[error("failed to start projection worker: {0}")]
    Worker(#[from] std::io::Error),
}

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type Dispatcher = CommandDispatcher<Arc<dyn EventStore>, Bus>;

pub struct AppServices {
    dispatcher: Dispatcher,
    projections: Arc<ProjectionSet>,
    dropdowns: Arc<dyn DropdownStore>,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
    default_gst_rate: f64,
    worker: Mutex<Option<WorkerHandle>>,
}

/// Connects the stores named by `config` and hands them to [`assemble`].
pub async fn build_services(config: &AppConfig) -> Result<Arc<AppServices>, ServiceError> {
    let (store, dropdowns): (Arc<dyn EventStore>, Arc<dyn DropdownStore>) = if config.use_persistent_stores {
        let url = config
            .database_url
            .as_deref()
            .ok_or(ServiceError::MissingDatabaseUrl)?;
        let pool = PgPool::connect(url).await?;

        let events = PostgresEventStore::new(pool.clone());
        events.ensure_schema().await?;
        let options = PostgresDropdownStore::new(pool);
        options.ensure_schema().await?;
        info!("using postgres stores");
        (Arc::new(events), Arc::new(options))
    } else {
        info!("using in-memory stores");
        (Arc::new(InMemoryEventStore::new()), Arc::new(InMemoryDropdownStore::new()))
    };

    assemble(store, dropdowns, config.default_gst_rate).await
}

/// Rebuilds every read model from `store` and starts the bus → projections
/// worker.
pub async fn assemble(
    store: Arc<dyn EventStore>,
    dropdowns: Arc<dyn DropdownStore>,
    default_gst_rate: f64,
) -> Result<Arc<AppServices>, ServiceError> {
    let projections = Arc::new(ProjectionSet::new());
    replay(store.as_ref(), &projections).await?;

    // Realtime channel (SSE): lossy broadcast, tenant-filtered per connection.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let worker = {
        let projections = projections.clone();
        let realtime_tx = realtime_tx.clone();
        ProjectionWorker::spawn("projections", bus.clone(), None, move |env| {
            apply_and_broadcast(&projections, &realtime_tx, &env)
        })?
    };

    Ok(Arc::new(AppServices {
        dispatcher: CommandDispatcher::new(store, bus),
        projections,
        dropdowns,
        realtime_tx,
        default_gst_rate,
        worker: Mutex::new(Some(worker)),
    }))
}

fn apply_and_broadcast(
    projections: &ProjectionSet,
    realtime_tx: &broadcast::Sender<RealtimeMessage>,
    env: &EventEnvelope<JsonValue>,
) -> Result<(), ProjectionError> {
    let notification = projections.apply(env)?;

    // No subscribers is not an error.
    let _ = realtime_tx.send(RealtimeMessage::projection_updated(env));
    if let Some(n) = notification {
        let _ = realtime_tx.send(RealtimeMessage::notification(env.tenant_id(), &n));
    }
    Ok(())
}

impl AppServices {
    pub fn projections(&self) -> &ProjectionSet {
        &self.projections
    }

    pub fn dropdowns(&self) -> &dyn DropdownStore {
        self.dropdowns.as_ref()
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }

    /// GST percent used when a product is created without one.
    pub fn default_gst_rate(&self) -> f64 {
        self.default_gst_rate
    }

    pub async fn dispatch<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: loomworks_events::Event + serde::Serialize + serde::de::DeserializeOwned,
    {
        self.dispatcher
            .dispatch::<A>(tenant_id, aggregate_id, aggregate_type, command, make_aggregate)
            .await
    }

    pub async fn load<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: serde::de::DeserializeOwned,
    {
        self.dispatcher.load::<A>(tenant_id, aggregate_id, make_aggregate).await
    }

    /// Stops the projection worker. Later commits still land in the store.
    pub fn shutdown(&self) {
        let handle = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match handle {
            Some(h) => h.shutdown(),
            None => warn!("projection worker already stopped"),
        }
    }
}

/// Build an SSE stream for a tenant (used by `/api/stream`).
pub fn tenant_sse_stream(
    services: Arc<AppServices>,
    tenant_id: TenantId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if m.tenant_id == tenant_id => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
