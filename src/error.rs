use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("invalid argument: {0}")]
    UserInput(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("duplicate action name: {0}")]
    DuplicateAction(String),

    #[error("watch error: {0}")]
    Watch(String),

    #[error("collaborator unavailable: {0}")]
    MissingCollaborator(String),

    #[error("command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("action execution failed: {0}")]
    ActionExecution(String),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("input injection error: {0}")]
    Injector(String),

    #[error("control socket error: {0}")]
    Socket(String),

    #[error("single-instance lock unavailable: {0}")]
    LockUnavailable(String),

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error("service control error: {0}")]
    Service(String),

    #[error("path does not exist: {0}")]
    MissingPath(PathBuf),

    #[error("{0}")]
    Fatal(String),
}

pub type AppResult<T> = Result<T, AppError>;
