use super::{
    super::{cache::*, dispatch::*, promise::*},
    configuration::*,
    request::*,
    transport::*,
};

use {
    bytes::*,
    http::{header::*, request::Request, uri::Uri},
    std::{
        result::Result,
        sync::{atomic::*, *},
        time::*,
    },
    tokio::runtime::Handle,
};

//
// NetworkFetcher
//

/// [CacheLevel] that fetches payloads with HTTP GET.
///
/// It only ever produces values: [set](CacheLevel::set), [clear](CacheLevel::clear), and
/// [on_memory_warning](CacheLevel::on_memory_warning) do nothing.
///
/// The fetchable key is used as is for the request URL. Concurrent requests for the same key are
/// deduplicated: while a request is in flight, asking for its key again attaches to it rather than
/// issuing another call. Every caller gets its own [Deferred], and the request is only cancelled
/// once all of them have been cancelled.
///
/// Payloads are validated before success. See [validate_response](super::validate_response).
///
/// Results are delivered on the configured [Dispatcher], regardless of which thread the transport
/// ran on.
///
/// Requests run on Tokio tasks. Calling [get](CacheLevel::get) outside of a Tokio runtime fails
/// with a [Transport](CacheError::Transport) error.
pub struct NetworkFetcher<TransportT> {
    transport: TransportT,
    configuration: FetcherConfiguration,
    pending: PendingRequests,
    next_request_id: AtomicU64,
}

impl<TransportT> NetworkFetcher<TransportT>
where
    TransportT: Transport,
{
    /// Constructor.
    pub fn new(transport: TransportT) -> Self {
        Self {
            transport,
            configuration: Default::default(),
            pending: Arc::new(Default::default()),
            next_request_id: AtomicU64::new(0),
        }
    }

    /// Completion context.
    ///
    /// The default is [InlineDispatcher], which delivers results on the transport's task.
    pub fn dispatcher<DispatcherT>(mut self, dispatcher: DispatcherT) -> Self
    where
        DispatcherT: Dispatcher,
    {
        self.configuration.dispatcher = Arc::new(dispatcher);
        self
    }

    /// Request timeout.
    ///
    /// A timed out request fails with a [Transport](CacheError::Transport) error.
    ///
    /// [None] by default.
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.configuration.request_timeout = Some(request_timeout);
        self
    }

    /// Request timeout, parsed with [duration-str](https://github.com/baoyachi/duration-str),
    /// e.g. "30s" or "1m 30s".
    pub fn parse_request_timeout(self, request_timeout: &str) -> Result<Self, ConfigurationError> {
        let duration = duration_str::parse(request_timeout).map_err(|error| {
            ConfigurationError::InvalidDuration(request_timeout.into(), error.to_string())
        })?;
        Ok(self.request_timeout(duration))
    }

    /// `User-Agent` request header.
    ///
    /// [None] by default.
    pub fn user_agent(mut self, user_agent: &str) -> Result<Self, ConfigurationError> {
        self.configuration.user_agent = Some(HeaderValue::from_str(user_agent)?);
        Ok(self)
    }

    /// Number of requests in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether a request for the key is in flight.
    pub fn is_pending<KeyT>(&self, key: &KeyT) -> bool
    where
        KeyT: Fetchable,
    {
        self.pending.lock().contains_key(key.fetchable_key())
    }

    fn new_request(&self, key: &str) -> Result<TransportRequest, CacheError> {
        let uri: Uri = key
            .parse()
            .map_err(|error| CacheError::InvalidUrl(format!("{}: {}", error, key)))?;

        if uri.scheme().is_none() || uri.host().is_none() {
            return Err(CacheError::InvalidUrl(format!("not absolute: {}", key)));
        }

        let mut request = Request::get(uri);
        if let Some(user_agent) = &self.configuration.user_agent {
            request = request.header(USER_AGENT, user_agent.clone());
        }

        request
            .body(())
            .map_err(|error| CacheError::InvalidUrl(format!("{}: {}", error, key)))
    }

    // Fails on the completion context, like a completed request would
    fn fail(&self, key: &str, error: CacheError) -> Deferred<Bytes, CacheError> {
        let promise = Promise::new();
        let deferred = promise.deferred();

        let key = key.to_owned();
        dispatch_or_run(
            self.configuration.dispatcher.as_ref(),
            Box::new(move || {
                tracing::info!("failed fetching ({}): {}", error, key);
                promise.fail(error);
            }),
        );

        deferred
    }
}

impl<KeyT, TransportT> CacheLevel<KeyT> for NetworkFetcher<TransportT>
where
    KeyT: Fetchable,
    TransportT: Transport,
{
    type Value = Bytes;

    fn get(&self, key: &KeyT) -> Deferred<Bytes, CacheError> {
        let key = key.fetchable_key();

        let mut pending = self.pending.lock();

        if let Some(request) = pending.get_mut(key) {
            tracing::debug!("joining in-flight request: {}", key);
            return request.attach(&self.pending, key);
        }

        let request = match self.new_request(key) {
            Ok(request) => request,
            Err(error) => {
                drop(pending);
                return self.fail(key, error);
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            drop(pending);
            return self.fail(key, CacheError::transport("no Tokio runtime"));
        };

        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let promise = Promise::new();
        let deferred = promise.deferred();

        tracing::debug!("fetching: {}", key);

        // The task cannot remove its entry before we insert it, because we are holding the lock
        let task = runtime.spawn(
            FetchTask {
                key: key.into(),
                id,
                request,
                promise,
                transport: self.transport.clone(),
                configuration: self.configuration.clone(),
                pending: self.pending.clone(),
            }
            .run(),
        );

        let abort_handle = task.abort_handle();
        let cancelled_key = key.to_owned();
        deferred.on_cancel(move || {
            abort_handle.abort();
            tracing::debug!("cancelled: {}", cancelled_key);
        });

        pending
            .entry(key.into())
            .or_insert(PendingRequest {
                id,
                deferred,
                callers: 0,
            })
            .attach(&self.pending, key)
    }

    fn set(&self, _value: Bytes, _key: &KeyT) {}

    fn clear(&self) {}

    fn on_memory_warning(&self) {}
}

#[cfg(test)]
mod tests {
    use super::{super::super::test::*, *};

    use {
        http::{StatusCode, response::Response},
        parking_lot::Mutex,
        tokio::{sync::Notify, time::sleep},
        tower::service_fn,
    };

    const URL: &str = "https://example.com/payload";

    // Runs jobs inline and counts them
    #[derive(Clone, Default)]
    struct CountingDispatcher {
        jobs: Arc<AtomicUsize>,
    }

    impl CountingDispatcher {
        fn jobs(&self) -> usize {
            self.jobs.load(Ordering::SeqCst)
        }
    }

    impl Dispatcher for CountingDispatcher {
        fn dispatch(&self, job: Job) -> Result<(), Job> {
            self.jobs.fetch_add(1, Ordering::SeqCst);
            job();
            Ok(())
        }
    }

    // Hands back every job, like a dispatcher whose task is gone
    struct StoppedDispatcher;

    impl Dispatcher for StoppedDispatcher {
        fn dispatch(&self, job: Job) -> Result<(), Job> {
            Err(job)
        }
    }

    fn respond(
        status: StatusCode,
        declared: Option<u64>,
        payload: Option<&'static str>,
    ) -> TransportResponse {
        let payload = payload.map(|payload| Bytes::from_static(payload.as_bytes()));
        let mut response = Response::new(payload);
        *response.status_mut() = status;
        if let Some(declared) = declared {
            response
                .headers_mut()
                .insert(CONTENT_LENGTH, declared.into());
        }
        response
    }

    fn fixed(
        status: StatusCode,
        declared: Option<u64>,
        payload: Option<&'static str>,
    ) -> impl Transport {
        service_fn(move |_request: TransportRequest| async move {
            Ok::<_, TransportError>(respond(status, declared, payload))
        })
    }

    // Completes only after being notified
    fn gated(calls: Arc<AtomicUsize>, gate: Arc<Notify>) -> impl Transport {
        service_fn(move |_request: TransportRequest| {
            calls.fetch_add(1, Ordering::SeqCst);
            let gate = gate.clone();
            async move {
                gate.notified().await;
                Ok::<_, TransportError>(respond(StatusCode::OK, None, Some("gated")))
            }
        })
    }

    fn never() -> impl Transport {
        service_fn(|_request: TransportRequest| async move {
            std::future::pending::<()>().await;
            Ok::<_, TransportError>(respond(StatusCode::OK, None, None))
        })
    }

    #[derive(Default)]
    struct Callbacks {
        successes: AtomicUsize,
        failures: Mutex<Vec<CacheError>>,
    }

    impl Callbacks {
        fn successes(&self) -> usize {
            self.successes.load(Ordering::SeqCst)
        }

        fn failures(&self) -> Vec<CacheError> {
            self.failures.lock().clone()
        }
    }

    // Get with callbacks that record what they were called with
    fn tracked_get<TransportT>(
        callbacks: &Arc<Callbacks>,
        fetcher: &NetworkFetcher<TransportT>,
        key: &'static str,
    ) -> Deferred<Bytes, CacheError>
    where
        TransportT: Transport,
    {
        let successes = callbacks.clone();
        let failures = callbacks.clone();
        fetcher.get_with(
            &key,
            move |_| {
                successes.successes.fetch_add(1, Ordering::SeqCst);
            },
            move |error| failures.failures.lock().push(error),
        )
    }

    #[tokio::test]
    async fn ok_response_succeeds() {
        setup();

        let fetcher = NetworkFetcher::new(fixed(StatusCode::OK, Some(5), Some("hello")));
        let callbacks = Arc::new(Callbacks::default());

        let outcome = tracked_get(&callbacks, &fetcher, URL).await;

        assert!(matches!(outcome, Outcome::Success(payload) if payload == "hello"));
        assert_eq!(callbacks.successes(), 1);
        assert!(callbacks.failures().is_empty());
        assert_eq!(fetcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn undeclared_length_succeeds() {
        setup();

        let fetcher = NetworkFetcher::new(fixed(StatusCode::OK, None, Some("hello")));
        let outcome = fetcher.get(&URL).await;

        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn not_found_fails() {
        setup();

        let fetcher = NetworkFetcher::new(fixed(StatusCode::NOT_FOUND, None, Some("missing")));
        let callbacks = Arc::new(Callbacks::default());

        let outcome = tracked_get(&callbacks, &fetcher, URL).await;

        assert!(outcome.is_failure());
        assert_eq!(callbacks.successes(), 0);
        let failures = callbacks.failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            CacheError::InvalidStatusCode(StatusCode::NOT_FOUND)
        ));
        assert_eq!(fetcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn truncated_payload_fails() {
        setup();

        static HALF: &str = "01234567890123456789012345678901234567890123456789";
        let fetcher = NetworkFetcher::new(fixed(StatusCode::OK, Some(100), Some(HALF)));
        let callbacks = Arc::new(Callbacks::default());

        tracked_get(&callbacks, &fetcher, URL).await;

        assert_eq!(callbacks.successes(), 0);
        assert!(matches!(
            callbacks.failures().as_slice(),
            [CacheError::InvalidPayloadLength {
                declared: 100,
                received: 50
            }]
        ));
    }

    #[tokio::test]
    async fn missing_payload_fails() {
        setup();

        let fetcher = NetworkFetcher::new(fixed(StatusCode::OK, None, None));
        let outcome = fetcher.get(&URL).await;

        assert!(matches!(outcome, Outcome::Failure(CacheError::EmptyResponse)));
    }

    #[tokio::test]
    async fn transport_failure_is_passed_through() {
        setup();

        let fetcher = NetworkFetcher::new(service_fn(|_request: TransportRequest| async move {
            Err::<TransportResponse, _>(TransportError::failed("connection refused"))
        }));
        let outcome = fetcher.get(&URL).await;

        assert!(matches!(
            outcome,
            Outcome::Failure(CacheError::Transport(error))
                if error.to_string() == "connection refused"
        ));
        assert_eq!(fetcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn transport_cancellation_is_silent() {
        setup();

        let fetcher = NetworkFetcher::new(service_fn(|_request: TransportRequest| async move {
            Err::<TransportResponse, _>(TransportError::Cancelled)
        }));
        let callbacks = Arc::new(Callbacks::default());

        let outcome = tracked_get(&callbacks, &fetcher, URL).await;

        assert!(outcome.is_cancelled());
        assert_eq!(callbacks.successes(), 0);
        assert!(callbacks.failures().is_empty());
        assert_eq!(fetcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_request_calls_nothing() {
        setup();

        let fetcher = NetworkFetcher::new(never());
        let callbacks = Arc::new(Callbacks::default());

        let deferred = tracked_get(&callbacks, &fetcher, URL);
        assert!(fetcher.is_pending(&URL));

        assert!(deferred.cancel());
        sleep(Duration::from_millis(20)).await;

        assert_eq!(callbacks.successes(), 0);
        assert!(callbacks.failures().is_empty());
        assert!(!fetcher.is_pending(&URL));
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_call() {
        setup();

        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let fetcher = NetworkFetcher::new(gated(calls.clone(), gate.clone()));
        let callbacks = Arc::new(Callbacks::default());

        let first = tracked_get(&callbacks, &fetcher, URL);
        let second = tracked_get(&callbacks, &fetcher, URL);
        assert_eq!(fetcher.pending_count(), 1);

        gate.notify_one();
        let (first, second) = (first.await, second.await);

        assert!(matches!(first, Outcome::Success(payload) if payload == "gated"));
        assert!(second.is_success());
        assert_eq!(callbacks.successes(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn settled_key_starts_a_new_request() {
        setup();

        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let fetcher = NetworkFetcher::new(gated(calls.clone(), gate.clone()));

        gate.notify_one();
        assert!(fetcher.get(&URL).await.is_success());
        assert!(!fetcher.is_pending(&URL));

        gate.notify_one();
        assert!(fetcher.get(&URL).await.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_url_fails_without_request() {
        setup();

        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = NetworkFetcher::new(gated(calls.clone(), Arc::new(Notify::new())));

        let outcome = fetcher.get(&"not a url").await;

        assert!(matches!(outcome, Outcome::Failure(CacheError::InvalidUrl(_))));
        let outcome = fetcher.get(&"/relative/path").await;
        assert!(matches!(outcome, Outcome::Failure(CacheError::InvalidUrl(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(fetcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn timeout_is_a_transport_failure() {
        setup();

        let fetcher = NetworkFetcher::new(never())
            .parse_request_timeout("20ms")
            .expect("duration");
        let outcome = fetcher.get(&URL).await;

        assert!(matches!(outcome, Outcome::Failure(CacheError::Transport(_))));
        assert_eq!(fetcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn sends_user_agent() {
        setup();

        let fetcher = NetworkFetcher::new(service_fn(|request: TransportRequest| async move {
            let user_agent = request
                .headers()
                .get(USER_AGENT)
                .and_then(|user_agent| user_agent.to_str().ok())
                .map(|user_agent| user_agent.to_owned());
            let mut response = Response::new(user_agent.map(Bytes::from));
            *response.status_mut() = StatusCode::OK;
            Ok::<_, TransportError>(response)
        }))
        .user_agent("cache-levels-test")
        .expect("user agent");

        let outcome = fetcher.get(&URL).await;

        assert!(matches!(outcome, Outcome::Success(payload) if payload == "cache-levels-test"));
    }

    #[tokio::test]
    async fn completions_run_on_dispatcher() {
        setup();

        let dispatcher = CountingDispatcher::default();
        let fetcher = NetworkFetcher::new(fixed(StatusCode::OK, None, Some("hello")))
            .dispatcher(dispatcher.clone());

        assert!(fetcher.get(&URL).await.is_success());
        assert!(fetcher.get(&URL).await.is_success());
        assert_eq!(dispatcher.jobs(), 2);
    }

    #[tokio::test]
    async fn serial_dispatcher_delivers() {
        setup();

        let fetcher = NetworkFetcher::new(fixed(StatusCode::OK, None, Some("hello")))
            .dispatcher(SerialDispatcher::spawn());

        assert!(fetcher.get(&URL).await.is_success());
    }

    #[tokio::test]
    async fn storage_operations_are_no_ops() {
        setup();

        let fetcher = NetworkFetcher::new(fixed(StatusCode::OK, None, Some("network")));

        fetcher.set(Bytes::from_static(b"local"), &URL);
        CacheLevel::<&str>::clear(&fetcher);
        CacheLevel::<&str>::on_memory_warning(&fetcher);

        let outcome = fetcher.get(&URL).await;
        assert!(matches!(outcome, Outcome::Success(payload) if payload == "network"));
    }

    #[tokio::test]
    async fn invalid_url_fails_on_dispatcher() {
        setup();

        let dispatcher = CountingDispatcher::default();
        let fetcher = NetworkFetcher::new(fixed(StatusCode::OK, None, Some("hello")))
            .dispatcher(dispatcher.clone());
        let callbacks = Arc::new(Callbacks::default());

        let outcome = tracked_get(&callbacks, &fetcher, "not a url").await;

        assert!(matches!(outcome, Outcome::Failure(CacheError::InvalidUrl(_))));
        assert!(matches!(
            callbacks.failures().as_slice(),
            [CacheError::InvalidUrl(_)]
        ));
        assert_eq!(dispatcher.jobs(), 1);
    }

    #[test]
    fn get_outside_runtime_fails() {
        setup();

        let dispatcher = CountingDispatcher::default();
        let fetcher = NetworkFetcher::new(fixed(StatusCode::OK, None, Some("hello")))
            .dispatcher(dispatcher.clone());

        let outcome = fetcher.get(&URL).outcome();

        assert!(matches!(
            outcome,
            Some(Outcome::Failure(CacheError::Transport(error)))
                if error.to_string() == "no Tokio runtime"
        ));
        assert_eq!(dispatcher.jobs(), 1);
        assert_eq!(fetcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn stopped_dispatcher_still_settles() {
        setup();

        let fetcher = NetworkFetcher::new(fixed(StatusCode::OK, None, Some("hello")))
            .dispatcher(StoppedDispatcher);

        assert!(fetcher.get(&URL).await.is_success());
        assert!(!fetcher.is_pending(&URL));

        assert!(matches!(
            fetcher.get(&"not a url").await,
            Outcome::Failure(CacheError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn panicking_observer_does_not_stall_later_requests() {
        setup();

        let fetcher = NetworkFetcher::new(fixed(StatusCode::OK, None, Some("hello")))
            .dispatcher(SerialDispatcher::spawn());

        let first = fetcher.get(&"https://example.com/a");
        first.on_success(|_| panic!("observer"));
        assert!(first.await.is_success());

        let second = fetcher.get(&"https://example.com/b").await;
        assert!(matches!(second, Outcome::Success(payload) if payload == "hello"));
        assert_eq!(fetcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn cancelling_one_caller_keeps_the_request() {
        setup();

        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let fetcher = NetworkFetcher::new(gated(calls.clone(), gate.clone()));
        let callbacks = Arc::new(Callbacks::default());

        let first = tracked_get(&callbacks, &fetcher, URL);
        let second = tracked_get(&callbacks, &fetcher, URL);

        assert!(first.cancel());
        assert!(fetcher.is_pending(&URL));

        gate.notify_one();
        assert!(matches!(second.await, Outcome::Success(payload) if payload == "gated"));

        assert!(first.outcome().is_some_and(|outcome| outcome.is_cancelled()));
        assert_eq!(callbacks.successes(), 1);
        assert!(callbacks.failures().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn cancelling_every_caller_cancels_the_request() {
        setup();

        let fetcher = NetworkFetcher::new(never());

        let first = fetcher.get(&URL);
        let second = fetcher.get(&URL);

        assert!(first.cancel());
        assert!(fetcher.is_pending(&URL));
        assert!(second.cancel());
        assert!(!fetcher.is_pending(&URL));

        let third = fetcher.get(&URL);
        assert!(fetcher.is_pending(&URL));
        assert!(third.is_pending());
        third.cancel();
    }
}
