pub mod assets;
pub mod errors;
pub mod events;
pub mod fixtures;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod session;
pub mod settings;
pub mod store;

pub use assets::{AssetUrls, DraftedDisplay};
pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use events::{DraftEvent, EventBus, EventSubscription, MessageBus, PublishError};
pub use logging::{init_logging, LogEntry, LogFormat, TestLogSubscriber};
pub use middleware::{log_response, request_logging};
pub use server::{AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
pub use session::{SessionError, SessionManager, ViewerState};
pub use settings::{AppSettings, SettingsError};
pub use store::{
    MemorySessionStore, SessionCredentials, SessionId, SessionSnapshot, SessionStore,
    SqliteSessionStore, StoreError, UpdateOutcome,
};
