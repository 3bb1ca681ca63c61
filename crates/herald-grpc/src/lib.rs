//! gRPC helpers for Herald errors
//!
//! Handlers return their own error types; the functions here turn them into
//! `tonic::Status` at the service boundary so the code, message and
//! correlation metadata reach the client.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

use std::future::Future;

use futures::stream::{BoxStream, Stream, StreamExt};
use herald_core::{ErrorCarrier, chain, normalize_carrier};
use tonic::Status;

/// Convert an error into a gRPC status
///
/// The first error in the chain that names a gRPC code is the one that gets
/// rendered; when none does, `err` itself is normalized and its HTTP status
/// mapped.
pub fn to_status(err: &dyn ErrorCarrier) -> Status {
    let source = chain(err).find(|level| level.grpc_code().is_some()).unwrap_or(err);
    normalize_carrier(source, "").grpc_status()
}

/// Run a unary handler, turning its error into a [`Status`]
pub async fn unwrap_unary<F, T, E>(handler: F) -> Result<T, Status>
where
    F: Future<Output = Result<T, E>>,
    E: ErrorCarrier,
{
    handler.await.map_err(|err| to_status(&err))
}

/// Run a streaming handler, turning its error and every item error into a
/// [`Status`]
pub async fn unwrap_stream<F, S, T, E>(handler: F) -> Result<BoxStream<'static, Result<T, Status>>, Status>
where
    F: Future<Output = Result<S, E>>,
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: ErrorCarrier,
{
    let stream = handler.await.map_err(|err| to_status(&err))?;
    Ok(stream.map(|item| item.map_err(|err| to_status(&err))).boxed())
}
