use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("failed to create store client: {0}")]
    Connection(#[from] keyline_store::StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
