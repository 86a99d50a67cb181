use thiserror::Error;

use crate::db::DbError;

pub type Result<T> = std::result::Result<T, Error>;

/// Every way a shorten or resolve request can be turned down.
///
/// Validation variants are always returned before the store is touched.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("no URL given")]
    MissingUrl,
    #[error("the short code {0:?} contains illegal characters")]
    IllegalCharacters(String),
    #[error("the short code {0:?} is reserved")]
    Reserved(String),
    #[error("the short code is longer than {max} characters")]
    ShortTooLong { max: usize },
    #[error("unsupported redirect type {0:?}")]
    UnsupportedRedirectType(String),
    #[error("{0} is already a short URL")]
    AlreadyShortened(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("protocol {0:?} is not allowed")]
    IllegalScheme(String),
    #[error("the URL is longer than {max} characters")]
    UrlTooLong { max: usize },
    #[error("the short code {0} is already in use")]
    AlreadyInUse(String),
    #[error("{0} is not a valid short code")]
    NotFound(String),
    #[error("{0} is not a short URL of this service")]
    NotAShortenedUrl(String),
    #[error("invalid action {0:?}")]
    UnknownAction(String),
    #[error("link storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Stable token sent to clients in the `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingUrl => "missingurl",
            Error::IllegalCharacters(_) => "illegalchars",
            Error::Reserved(_) => "reserved",
            Error::ShortTooLong { .. } | Error::UrlTooLong { .. } => "toolong",
            Error::UnsupportedRedirectType(_) => "redirecttype",
            Error::AlreadyShortened(_) => "alreadyshortened",
            Error::InvalidUrl(_) => "invalidurl",
            Error::IllegalScheme(_) => "invalidprotocol",
            Error::AlreadyInUse(_) => "alreadyinuse",
            Error::NotFound(_) => "notfound",
            Error::NotAShortenedUrl(_) => "notshortened",
            Error::UnknownAction(_) => "action",
            Error::StorageUnavailable(_) | Error::Storage(_) => "internal",
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_) | Error::Storage(_))
    }
}

impl From<DbError> for Error {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Unavailable(message) => Error::StorageUnavailable(message),
            DbError::NotFound(short) => Error::NotFound(short),
            other => Error::Storage(other.to_string()),
        }
    }
}
