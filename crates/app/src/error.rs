use thiserror::Error;

/// Startup and shutdown failures of the server binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("failed to create data directory {path}: {source}")]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("failed to build rate feed client: {0}")]
    Feed(#[from] engine::FeedError),
    #[error("failed to build engine: {0}")]
    Engine(#[from] engine::EngineError),
    #[error("failed to bind server listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server failed: {0}")]
    Serve(#[source] std::io::Error),
}
