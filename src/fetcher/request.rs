use super::{
    super::{cache::*, compose::*, dispatch::*, promise::*},
    configuration::*,
    transport::*,
    validate::*,
};

use {
    bytes::*,
    duration_str::HumanFormat,
    parking_lot::Mutex,
    std::{collections::*, sync::*, time::*},
    tower::*,
};

/// Pending-request table, by fetchable key.
pub(crate) type PendingRequests = Arc<Mutex<HashMap<String, PendingRequest>>>;

//
// PendingRequest
//

/// In-flight request.
pub(crate) struct PendingRequest {
    /// Distinguishes this request from later ones for the same key.
    pub id: u64,

    /// Settled by the fetch task. Callers never see it directly.
    pub deferred: Deferred<Bytes, CacheError>,

    /// Number of attached callers that have not cancelled.
    pub callers: usize,
}

impl PendingRequest {
    /// Attach a caller.
    ///
    /// The caller gets its own [Deferred] that mirrors the request's outcome. Cancelling it
    /// detaches the caller, and only the last caller to detach cancels the request.
    ///
    /// Must be called while holding the table's lock.
    pub fn attach(&mut self, pending: &PendingRequests, key: &str) -> Deferred<Bytes, CacheError> {
        self.callers += 1;

        let promise = Promise::new();
        let caller = promise.deferred();
        forward(&self.deferred, promise);

        let shared = self.deferred.clone();
        let pending = pending.clone();
        let key = key.to_owned();
        let id = self.id;
        caller.on_cancel(move || {
            if detach(&pending, &key, id) {
                shared.cancel();
            }
        });

        caller
    }
}

/// Detach a caller from the request, but only if it is still the one with this ID.
///
/// Returns true if it was the last caller, in which case the request is removed from the table.
pub(crate) fn detach(pending: &PendingRequests, key: &str, id: u64) -> bool {
    let mut pending = pending.lock();

    let last = match pending.get_mut(key) {
        Some(request) if request.id == id => {
            request.callers = request.callers.saturating_sub(1);
            request.callers == 0
        }

        _ => false,
    };

    if last {
        pending.remove(key);
    }

    last
}

/// Remove the request from the table, but only if it is still the one with this ID.
pub(crate) fn remove_pending(pending: &PendingRequests, key: &str, id: u64) -> bool {
    let mut pending = pending.lock();
    if pending.get(key).is_some_and(|request| request.id == id) {
        pending.remove(key);
        true
    } else {
        false
    }
}

//
// FetchTask
//

/// Runs a single transport call and settles its promise on the completion context.
///
/// If the completion context is no longer running then it settles on the transport's task.
pub(crate) struct FetchTask<TransportT> {
    pub key: String,
    pub id: u64,
    pub request: TransportRequest,
    pub promise: Promise<Bytes, CacheError>,
    pub transport: TransportT,
    pub configuration: FetcherConfiguration,
    pub pending: PendingRequests,
}

impl<TransportT> FetchTask<TransportT>
where
    TransportT: Transport,
{
    pub async fn run(self) {
        let Self {
            key,
            id,
            request,
            promise,
            transport,
            configuration,
            pending,
        } = self;

        let start = Instant::now();
        let call = transport.oneshot(request);

        let result = match configuration.request_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::failed(format!(
                    "timed out after {}",
                    timeout.human_format()
                ))),
            },

            None => call.await,
        };

        let outcome = validate_response(result);
        let elapsed = start.elapsed();

        dispatch_or_run(
            configuration.dispatcher.as_ref(),
            Box::new(move || {
                // Remove first, so that observers asking for the key again start a new request
                remove_pending(&pending, &key, id);

                match &outcome {
                    Outcome::Success(payload) => tracing::info!(
                        "fetched {} bytes in {}: {}",
                        payload.len(),
                        elapsed.human_format(),
                        key
                    ),

                    Outcome::Failure(error) => {
                        tracing::info!("failed fetching ({}): {}", error, key)
                    }

                    Outcome::Cancelled => tracing::debug!("cancelled by transport: {}", key),
                }

                promise.settle(outcome);
            }),
        );
    }
}
