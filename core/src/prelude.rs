use crate::config::MapOptions;
use crate::model::{MarkerSpec, QueryRow};
use crate::query::NrqlRequest;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Identifier handed out by a surface for every marker it places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// Errors raised while constructing a map surface.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("invalid access token: {0}")]
    InvalidCredential(String),
    #[error("unknown map style: {0}")]
    UnknownStyle(String),
    #[error("map surface unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a query source.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("undecodable response: {0}")]
    Decode(String),
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;
pub type QueryResult<T> = Result<T, QueryError>;

/// Future returned by [`QuerySource::query`].
pub type QueryFuture = Pin<Box<dyn Future<Output = QueryResult<Vec<QueryRow>>> + Send>>;

/// An activated map view markers can be attached to and detached from.
pub trait MapSurface: Send + Sync {
    fn add_marker(&self, marker: MarkerSpec) -> MarkerId;
    fn remove_marker(&self, id: MarkerId);

    /// Releases the view when the surface is replaced or the widget stops.
    fn teardown(&self) {}
}

/// Builds map surfaces. The access credential is passed on every call.
pub trait SurfaceFactory: Send + Sync {
    fn create(&self, access_token: &str, options: &MapOptions)
        -> SurfaceResult<Arc<dyn MapSurface>>;
}

/// Executes interaction queries against the metrics backend.
pub trait QuerySource: Send + Sync {
    fn query(&self, request: NrqlRequest) -> QueryFuture;
}
