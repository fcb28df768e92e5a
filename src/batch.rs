//! Fan-out/fan-in dispatch of independent requests.

use std::future::Future;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::request::TestRequest;
use crate::response::HttpResponse;
use crate::transport::{Transport, TransportError};

/// Awaits every future concurrently and returns their outputs in input
/// order.
pub async fn join_in_order<I>(futures: I) -> Vec<<I::Item as Future>::Output>
where
    I: IntoIterator,
    I::Item: Future,
{
    join_all(futures).await
}

/// Sends every request concurrently and waits for all of them.
///
/// One result is returned per request, in input order. A failed request is
/// reported in its slot and never cancels its siblings.
pub async fn send_batch<T: Transport + ?Sized>(
    transport: &T,
    requests: &[TestRequest],
) -> Vec<Result<HttpResponse, TransportError>> {
    debug!(count = requests.len(), "dispatching request batch");
    let results = join_in_order(requests.iter().map(|request| transport.send(request))).await;
    let failed = results.iter().filter(|result| result.is_err()).count();
    if failed > 0 {
        warn!(failed, total = results.len(), "batch requests failed");
    }
    results
}

/// Splits batch results into successful responses and error messages,
/// keeping the index of each input request.
#[must_use]
pub fn partition_batch(
    results: Vec<Result<HttpResponse, TransportError>>,
) -> (Vec<(usize, HttpResponse)>, Vec<(usize, String)>) {
    let mut ok = Vec::new();
    let mut failed = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(response) => ok.push((index, response)),
            Err(err) => failed.push((index, err.to_string())),
        }
    }
    (ok, failed)
}
