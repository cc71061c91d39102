use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown test: {0}")]
    UnknownTest(String),
    #[error("unknown parameter `{parameter}` in test `{test}`")]
    UnknownParameter { test: String, parameter: String },
    #[error("parameter `{0}` is derived by formula and cannot be edited")]
    ReadOnlyParameter(String),
    #[error("invalid patient context: {0}")]
    InvalidPatient(String),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, LabError>;
