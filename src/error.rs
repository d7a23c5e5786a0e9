use reqwest::StatusCode;
use std::fmt::{Display, Formatter};
use teloxide::RequestError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    // -- Config
    ConfigMissingEnv(&'static str),
    ConfigWrongFormat(&'static str),

    // -- WordPress
    AuthFailed,
    Fetch(StatusCode, String),
    RequestFailed(reqwest::Error),
    Json(serde_json::Error),
    InvalidRecord(String),

    // -- Validation
    InvalidPrice(String),
    MissingEmail(u64),

    Sqlx(sqlx::Error),
    Request(RequestError),
    Schedule(cron::error::Error),
}

impl Error {
    /// True for failures the backend reported with an HTTP status.
    pub fn is_status(&self, status: StatusCode) -> bool {
        matches!(self, Error::Fetch(s, _) if *s == status)
    }
}

// region:    ---From

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::RequestFailed(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Json(value)
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        Error::Sqlx(value)
    }
}

impl From<RequestError> for Error {
    fn from(value: RequestError) -> Self {
        Error::Request(value)
    }
}

impl From<cron::error::Error> for Error {
    fn from(value: cron::error::Error) -> Self {
        Error::Schedule(value)
    }
}

// endregion: ---From

// region:    --- Error boilerplate
impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}
// endregion: --- Error boilerplate
