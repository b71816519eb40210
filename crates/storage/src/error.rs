#![forbid(unsafe_code)]

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("schema version mismatch (expected={expected}, stored={stored})")]
    SchemaMismatch { expected: String, stored: String },
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO",
            Self::Sql(_) => "SQLITE",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::SchemaMismatch { .. } => "RESET_REQUIRED",
        }
    }
}

impl From<StoreError> for pv_core::StoreFault {
    fn from(value: StoreError) -> Self {
        pv_core::StoreFault::new(value)
    }
}
