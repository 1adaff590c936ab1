use thiserror::Error;

pub type Result<T> = std::result::Result<T, TweetlineError>;

#[derive(Error, Debug)]
pub enum TweetlineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
