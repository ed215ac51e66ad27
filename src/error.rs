use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Malformed configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Livy client error: {0}")]
    Client(#[from] livy_client::Error),

    #[error("Execution error: {0}")]
    Execution(#[from] livy_exec::Error),
}
