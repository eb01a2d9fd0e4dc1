//! Crate-wide error types.
//!
//! Individual modules return narrow, typed errors (`StoreError`,
//! `FrontierError`, `FetchError`). `AppError` wraps all of them for call
//! sites — like the HTTP handlers — that need a single error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate key in collection {collection}")]
    Duplicate { collection: String },
    #[error("document not found")]
    NotFound,
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("bson serialization error: {0}")]
    Bson(#[from] bson::ser::Error),
    #[error("bson deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),
}

#[derive(Error, Debug)]
pub enum FrontierError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("non-success status {status} fetching {url}")]
    Status { url: String, status: u16 },
    #[error("could not parse url: {0}")]
    UrlParse(#[from] url::ParseError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Frontier(#[from] FrontierError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
