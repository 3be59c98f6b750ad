//! AppContext - Every component, wired once at startup.
//!
//! `in_memory` builds a single-process context where the server and the
//! worker share in-process queues and fanout. `connect` builds the
//! Redis-backed context used when servers and workers run as separate
//! processes.

use std::sync::Arc;

use axum::Router;

use crate::adapters::auth::JwtTokenService;
use crate::adapters::http::{app_router, TaskHandlers};
use crate::adapters::pubsub::{InMemoryPubSub, RedisPubSub};
use crate::adapters::task_queue::{InMemoryTaskQueue, RedisTaskQueue};
use crate::adapters::websocket::{
    Authenticator, EventDispatcher, RoomEventRouter, SessionRegistry, WebSocketState,
};
use crate::config::{AppConfig, ConfigError, ValidationError};
use crate::domain::foundation::AuthError;
use crate::ports::{JobSource, PubSub, PubSubError, QueueError, TaskQueue};

use super::completion_hook::TaskCompletionHook;
use super::jobs::JobRegistry;
use super::worker::WorkerPool;

/// Failure while building the context or starting the process.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("Task queue unavailable: {0}")]
    Queue(#[from] QueueError),

    #[error("Fanout unavailable: {0}")]
    PubSub(#[from] PubSubError),

    #[error("Token service unavailable: {0}")]
    Auth(#[from] AuthError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct AppContext {
    pub config: AppConfig,
    pub queue: Arc<dyn TaskQueue>,
    pub job_source: Arc<dyn JobSource>,
    pub pubsub: Arc<dyn PubSub>,
    pub router: Arc<RoomEventRouter>,
    pub dispatcher: Arc<EventDispatcher>,
    pub jobs: Arc<JobRegistry>,
    pub hook: TaskCompletionHook,
}

impl AppContext {
    /// Single-process context with in-memory queue and fanout.
    pub fn in_memory(config: AppConfig) -> Result<Self, StartupError> {
        let queue = Arc::new(InMemoryTaskQueue::new(
            config.worker.default_queue.clone(),
            config.result_store.result_expiry(),
        ));
        let pubsub = Arc::new(InMemoryPubSub::new(config.websocket.channel_capacity));
        let authenticator = authenticator(&config)?;
        Ok(Self::from_parts(
            config,
            queue.clone(),
            queue,
            pubsub,
            authenticator,
        ))
    }

    /// Redis-backed context for multi-process deployments.
    pub async fn connect(config: AppConfig) -> Result<Self, StartupError> {
        let queue = Arc::new(
            RedisTaskQueue::connect(
                &config.broker,
                &config.result_store,
                config.worker.default_queue.clone(),
            )
            .await?,
        );
        let pubsub = Arc::new(
            RedisPubSub::connect(&config.broker, config.websocket.channel_capacity).await?,
        );
        let authenticator = authenticator(&config)?;
        Ok(Self::from_parts(
            config,
            queue.clone(),
            queue,
            pubsub,
            authenticator,
        ))
    }

    /// Wire a context from already-built adapters.
    pub fn from_parts(
        config: AppConfig,
        queue: Arc<dyn TaskQueue>,
        job_source: Arc<dyn JobSource>,
        pubsub: Arc<dyn PubSub>,
        authenticator: Authenticator,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new(
            authenticator,
            config.websocket.outbound_capacity,
        ));
        let router = Arc::new(RoomEventRouter::new(registry, Arc::clone(&pubsub)));
        let hook = TaskCompletionHook::new(Arc::clone(&queue), Arc::clone(&pubsub));

        Self {
            config,
            queue,
            job_source,
            pubsub,
            router,
            dispatcher: Arc::new(EventDispatcher::task_namespace()),
            jobs: Arc::new(JobRegistry::builtin()),
            hook,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.router.registry()
    }

    /// HTTP and websocket routes with their middleware.
    pub fn http_router(&self) -> Router {
        let websocket = WebSocketState::new(
            Arc::clone(&self.router),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.queue),
            self.config.websocket.handshake_timeout(),
        );
        app_router(
            TaskHandlers::new(Arc::clone(&self.queue)),
            websocket,
            &self.config.server,
        )
    }

    pub fn worker_pool(&self) -> WorkerPool {
        WorkerPool::new(
            Arc::clone(&self.job_source),
            Arc::clone(&self.jobs),
            self.hook.clone(),
            &self.config.worker,
        )
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("router", &self.router)
            .field("jobs", &self.jobs)
            .finish_non_exhaustive()
    }
}

/// Token-checking when `auth.require_token` is set, anonymous otherwise.
fn authenticator(config: &AppConfig) -> Result<Authenticator, StartupError> {
    if !config.auth.require_token {
        return Ok(Authenticator::Anonymous);
    }
    let service = JwtTokenService::from_config(&config.auth)?;
    Ok(Authenticator::token(
        Arc::new(service),
        config.auth.required_scopes_list(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn anonymous_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.require_token = false;
        config
    }

    #[test]
    fn anonymous_when_token_not_required() {
        let authenticator = authenticator(&anonymous_config()).unwrap();
        assert!(!authenticator.requires_token());
    }

    #[test]
    fn token_required_builds_jwt_authenticator() {
        let mut config = AppConfig::default();
        config.auth.require_token = true;
        config.auth.jwt_secret = Secret::new("secret".into());

        assert!(authenticator(&config).unwrap().requires_token());
    }

    #[test]
    fn unsupported_algorithm_fails_startup() {
        let mut config = AppConfig::default();
        config.auth.require_token = true;
        config.auth.jwt_secret = Secret::new("secret".into());
        config.auth.jwt_algorithm = "RS256".into();

        assert!(matches!(authenticator(&config), Err(StartupError::Auth(_))));
    }

    #[tokio::test]
    async fn in_memory_context_builds_router_and_pool() {
        let context = AppContext::in_memory(anonymous_config()).unwrap();
        let _router = context.http_router();
        let _pool = context.worker_pool();
        assert_eq!(context.registry().session_count().await, 0);
    }
}
