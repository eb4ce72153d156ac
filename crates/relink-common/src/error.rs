use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelinkError {
    #[error("Unknown knowledge base: {0} (available: medic, ctd_chem, mesh_dis, mesh_chem)")]
    UnknownKb(String),

    #[error("Malformed knowledge base file: {0}")]
    MalformedKbFile(String),

    #[error("NIL oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Corpus relations required by link policy but unavailable: {0}")]
    MissingCorpusRelations(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RelinkError>;
