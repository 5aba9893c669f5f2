use crate::assets::AssetUrls;
use crate::errors::ErrorResponse;
use crate::events::EventBus;
use crate::fixtures::sample_catalog;
use crate::handlers;
use crate::middleware::request_logging;
use crate::session::SessionManager;
use crate::settings::{AppSettings, SettingsError};
use crate::store::{MemorySessionStore, SessionStore, SqliteSessionStore, StoreError};
use draftwatch_core::cards::CardCatalog;
use draftwatch_core::errors::CatalogError;
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::filters::body::BodyDeserializeError;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reject::{
    InvalidHeader, MethodNotAllowed, MissingHeader, PayloadTooLarge, UnsupportedMediaType,
};
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

// Thirty card ids plus a token fit comfortably.
const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn for_tests() -> Self {
        Self::new("127.0.0.1", 0)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Shared state handed to every route.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    event_bus: Arc<EventBus>,
    sessions: Arc<SessionManager>,
}

impl AppContext {
    /// Builds the catalog, store and bus described by `settings`.
    pub fn from_settings(settings: &AppSettings) -> Result<Self, ServerError> {
        settings.validate()?;

        let catalog = match &settings.catalog_path {
            Some(path) => {
                let catalog = CardCatalog::load(path)?;
                tracing::info!(
                    path = %path.display(),
                    cards = catalog.len(),
                    "loaded card catalog"
                );
                catalog
            }
            None => {
                tracing::warn!("no catalog configured; using the built-in sample catalog");
                sample_catalog()
            }
        };

        let store: Arc<dyn SessionStore> = match &settings.database_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "using sqlite session store");
                Arc::new(SqliteSessionStore::open(path)?)
            }
            None => {
                tracing::info!("using in-memory session store");
                Arc::new(MemorySessionStore::new())
            }
        };

        let event_bus = Arc::new(EventBus::new());
        let sessions = SessionManager::new(
            store,
            Arc::new(catalog),
            event_bus.clone(),
            AssetUrls::new(settings.asset_base_url.clone()),
        )
        .with_max_id_attempts(settings.max_id_attempts);

        Ok(Self::new_with_dependencies(
            ServerConfig::new(settings.host.clone(), settings.port),
            event_bus,
            Arc::new(sessions),
        ))
    }

    pub fn new_with_dependencies(
        config: ServerConfig,
        event_bus: Arc<EventBus>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            config,
            event_bus,
            sessions,
        }
    }

    /// In-memory store, sample catalog, default asset base, ephemeral port.
    pub fn new_for_tests() -> Self {
        let event_bus = Arc::new(EventBus::new());
        let sessions = SessionManager::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(sample_catalog()),
            event_bus.clone(),
            AssetUrls::default(),
        );
        Self::new_with_dependencies(ServerConfig::for_tests(), event_bus, Arc::new(sessions))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn sessions(&self) -> Arc<SessionManager> {
        Arc::clone(&self.sessions)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("Card catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn from_settings(settings: &AppSettings) -> Result<Self, ServerError> {
        Ok(Self::from_context(AppContext::from_settings(settings)?))
    }

    pub fn from_context(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let bind_addr = Self::bind_addr(context.config())?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(Self::filter(&context))
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        tracing::info!(%addr, "draft server listening");

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });

        Ok(ServerHandle::new(addr, shutdown_tx, task, context))
    }

    /// Every route with rejection recovery and access logging applied.
    pub fn filter(
        context: &AppContext,
    ) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        Self::routes(context)
            .recover(handle_rejection)
            .with(request_logging())
    }

    fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
        let host = config.host();

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, config.port()));
        }

        let candidate = format!("{}:{}", host, config.port());
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(source) = err.source() {
            if let Some(io_err) = source.downcast_ref::<std::io::Error>() {
                let recreated = std::io::Error::new(io_err.kind(), io_err.to_string());
                return ServerError::BindError(recreated);
            }
        }

        ServerError::ConfigError(err.to_string())
    }

    fn routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        Self::health_route()
            .or(Self::session_routes(context))
            .unify()
            .or(Self::update_routes(context))
            .unify()
            .or(Self::realtime_routes(context))
            .unify()
            .boxed()
    }

    fn health_route() -> BoxedFilter<(Response,)> {
        warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .map(|| handlers::health().into_response())
            .boxed()
    }

    fn session_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let sessions = context.sessions();

        let create = warp::path!("session" / "new")
            .and(warp::get().or(warp::post()).unify())
            .and(Self::with_session_manager(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>| async move {
                Ok::<_, Infallible>(handlers::create_session(sessions).await)
            });

        let json = warp::path!("json" / String)
            .and(warp::get())
            .and(Self::with_session_manager(sessions.clone()))
            .and_then(
                |session_id: String, sessions: Arc<SessionManager>| async move {
                    Ok::<_, Infallible>(handlers::session_json(sessions, session_id).await)
                },
            );

        let viewer = warp::path!("viewer" / String)
            .and(warp::get())
            .and(Self::with_session_manager(sessions))
            .and_then(
                |session_id: String, sessions: Arc<SessionManager>| async move {
                    Ok::<_, Infallible>(handlers::viewer(sessions, session_id).await)
                },
            );

        create.or(json).unify().or(viewer).unify().boxed()
    }

    fn update_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let sessions = context.sessions();

        let cards = warp::path!("session" / "update" / "cards" / String)
            .and(warp::post())
            .and(Self::with_session_manager(sessions.clone()))
            .and(Self::json_body())
            .and_then(
                |session_id: String,
                 sessions: Arc<SessionManager>,
                 request: handlers::UpdateCardsRequest| async move {
                    Ok::<_, Infallible>(handlers::update_cards(sessions, session_id, request).await)
                },
            );

        let hero = warp::path!("session" / "update" / "hero" / String)
            .and(warp::post())
            .and(Self::with_session_manager(sessions.clone()))
            .and(Self::json_body())
            .and_then(
                |session_id: String,
                 sessions: Arc<SessionManager>,
                 request: handlers::UpdateHeroRequest| async move {
                    Ok::<_, Infallible>(handlers::update_hero(sessions, session_id, request).await)
                },
            );

        let drafted = warp::path!("session" / "update" / "drafted" / String)
            .and(warp::post())
            .and(Self::with_session_manager(sessions))
            .and(Self::json_body())
            .and_then(
                |session_id: String,
                 sessions: Arc<SessionManager>,
                 request: handlers::UpdateDraftedRequest| async move {
                    Ok::<_, Infallible>(
                        handlers::update_drafted(sessions, session_id, request).await,
                    )
                },
            );

        cards.or(hero).unify().or(drafted).unify().boxed()
    }

    fn realtime_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let sessions = context.sessions();

        let events = warp::path!("events" / String)
            .and(warp::get())
            .and(Self::with_session_manager(sessions.clone()))
            .and_then(
                |session_id: String, sessions: Arc<SessionManager>| async move {
                    Ok::<_, Infallible>(handlers::stream_events(session_id, sessions).await)
                },
            );

        let socket = warp::path("socket")
            .and(warp::path::end())
            .and(warp::ws())
            .and(Self::with_session_manager(sessions))
            .map(|ws: warp::ws::Ws, sessions: Arc<SessionManager>| {
                ws.on_upgrade(move |socket| handlers::handle_socket(socket, sessions))
                    .into_response()
            });

        events.or(socket).unify().boxed()
    }

    fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
    where
        T: serde::de::DeserializeOwned + Send,
    {
        warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
    }

    fn with_session_manager(
        sessions: Arc<SessionManager>,
    ) -> impl Filter<Extract = (Arc<SessionManager>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&sessions))
    }
}

/// Turns warp's routing rejections into the uniform error body.
async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, body) = if rejection.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            ErrorResponse::new("not_found", "No route matches this path"),
        )
    } else if let Some(err) = rejection.find::<BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("validation_error", format!("Invalid request body: {err}")),
        )
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            ErrorResponse::new("payload_too_large", "Request body is too large"),
        )
    } else if rejection.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorResponse::new("unsupported_media_type", "Expected a JSON body"),
        )
    } else if rejection.find::<MissingHeader>().is_some()
        || rejection.find::<InvalidHeader>().is_some()
    {
        (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("bad_request", "Missing or invalid request header"),
        )
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorResponse::new("method_not_allowed", "Method not allowed on this path"),
        )
    } else {
        tracing::error!(?rejection, "unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("internal_error", "Unhandled request failure"),
        )
    };

    Ok(body.into_response(status))
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    context: AppContext,
}

impl ServerHandle {
    fn new(
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
        context: AppContext,
    ) -> Self {
        Self {
            addr,
            shutdown: Some(shutdown),
            task: Some(task),
            context,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(ServerError::ConfigError(format!(
                        "server task join error: {err}"
                    )))
                }
            }
        }

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn bind_addr_accepts_ip_and_port() {
        let addr = WebServer::bind_addr(&ServerConfig::new("127.0.0.1", 8123)).expect("addr");
        assert_eq!(addr.port(), 8123);
    }

    #[test]
    fn missing_catalog_file_fails_startup() {
        let settings = AppSettings {
            catalog_path: Some(PathBuf::from("/nonexistent/cards.json")),
            ..AppSettings::default()
        };
        let err = AppContext::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ServerError::Catalog(_)));
    }

    #[test]
    fn database_path_selects_sqlite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = AppSettings {
            database_path: Some(dir.path().join("sessions.db")),
            ..AppSettings::default()
        };
        let context = AppContext::from_settings(&settings).expect("context");

        let credentials = context.sessions().create_session().expect("create");
        assert!(context
            .sessions()
            .exists(&credentials.session_id)
            .expect("exists"));
        assert!(format!("{:?}", context.sessions()).contains("SqliteSessionStore"));
    }

    #[tokio::test]
    async fn unknown_route_returns_json_404() {
        let context = AppContext::new_for_tests();
        let response = warp::test::request()
            .path("/nope")
            .reply(&WebServer::filter(&context))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_slice(response.body()).expect("json");
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let context = AppContext::new_for_tests();
        let response = warp::test::request()
            .method("POST")
            .path("/session/update/hero/abc")
            .header("content-type", "application/json")
            .body("{not json")
            .reply(&WebServer::filter(&context))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(response.body()).expect("json");
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let context = AppContext::new_for_tests();
        let response = warp::test::request()
            .method("POST")
            .path("/session/update/drafted/abc")
            .header("content-type", "application/json")
            .body(vec![b' '; (MAX_BODY_BYTES + 1) as usize])
            .reply(&WebServer::filter(&context))
            .await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
