use super::outcome::*;

use {
    parking_lot::Mutex,
    std::{
        fmt, mem,
        panic::{AssertUnwindSafe, catch_unwind},
        pin::*,
        sync::Arc,
        task::*,
    },
};

type Observer<ValueT, ErrorT> = Box<dyn FnOnce(&Outcome<ValueT, ErrorT>) + Send>;

struct DeferredState<ValueT, ErrorT> {
    outcome: Option<Outcome<ValueT, ErrorT>>,
    observers: Vec<Observer<ValueT, ErrorT>>,
    wakers: Vec<Waker>,
}

//
// Deferred
//

/// Read side of a settle-once asynchronous result.
///
/// Starts pending and settles exactly once into an [Outcome]. Any number of observers can be
/// registered, before or after settlement. An observer registered before settlement fires on the
/// settling thread, in registration order. An observer registered after settlement fires
/// immediately on the registering thread.
///
/// Clones are cheap and always refer to the same shared state.
///
/// Can also be `.await`ed.
pub struct Deferred<ValueT, ErrorT> {
    state: Arc<Mutex<DeferredState<ValueT, ErrorT>>>,
}

impl<ValueT, ErrorT> Deferred<ValueT, ErrorT> {
    /// True if not yet settled.
    pub fn is_pending(&self) -> bool {
        self.state.lock().outcome.is_none()
    }
}

impl<ValueT, ErrorT> Deferred<ValueT, ErrorT>
where
    ValueT: 'static + Clone + Send,
    ErrorT: 'static + Clone + Send,
{
    pub(crate) fn pending() -> Self {
        Self {
            state: Arc::new(Mutex::new(DeferredState {
                outcome: None,
                observers: Vec::default(),
                wakers: Vec::default(),
            })),
        }
    }

    /// Constructor for an already succeeded instance.
    pub fn succeeded(value: ValueT) -> Self {
        Self::settled(Outcome::Success(value))
    }

    /// Constructor for an already failed instance.
    pub fn failed(error: ErrorT) -> Self {
        Self::settled(Outcome::Failure(error))
    }

    /// Constructor for an already cancelled instance.
    pub fn cancelled() -> Self {
        Self::settled(Outcome::Cancelled)
    }

    /// Constructor for an already settled instance.
    pub fn settled(outcome: Outcome<ValueT, ErrorT>) -> Self {
        let deferred = Self::pending();
        deferred.settle(outcome);
        deferred
    }

    /// The outcome, if settled.
    pub fn outcome(&self) -> Option<Outcome<ValueT, ErrorT>> {
        self.state.lock().outcome.clone()
    }

    /// Request cancellation.
    ///
    /// Settles as [Cancelled](Outcome::Cancelled) if still pending, which is how producers
    /// observing [on_cancel](Self::on_cancel) learn that they should stop working.
    ///
    /// Returns false if already settled.
    pub fn cancel(&self) -> bool {
        self.settle(Outcome::Cancelled)
    }

    /// Observe success.
    pub fn on_success<ObserverT>(&self, observer: ObserverT) -> &Self
    where
        ObserverT: 'static + FnOnce(ValueT) + Send,
    {
        self.observe(Box::new(move |outcome| {
            if let Outcome::Success(value) = outcome {
                observer(value.clone());
            }
        }))
    }

    /// Observe failure.
    pub fn on_failure<ObserverT>(&self, observer: ObserverT) -> &Self
    where
        ObserverT: 'static + FnOnce(ErrorT) + Send,
    {
        self.observe(Box::new(move |outcome| {
            if let Outcome::Failure(error) = outcome {
                observer(error.clone());
            }
        }))
    }

    /// Observe cancellation.
    pub fn on_cancel<ObserverT>(&self, observer: ObserverT) -> &Self
    where
        ObserverT: 'static + FnOnce() + Send,
    {
        self.observe(Box::new(move |outcome| {
            if outcome.is_cancelled() {
                observer();
            }
        }))
    }

    /// Observe any outcome.
    pub fn on_complete<ObserverT>(&self, observer: ObserverT) -> &Self
    where
        ObserverT: 'static + FnOnce(Outcome<ValueT, ErrorT>) + Send,
    {
        self.observe(Box::new(move |outcome| observer(outcome.clone())))
    }

    // Only the first call has an effect.
    pub(crate) fn settle(&self, outcome: Outcome<ValueT, ErrorT>) -> bool {
        let (observers, wakers) = {
            let mut state = self.state.lock();
            if state.outcome.is_some() {
                return false;
            }

            state.outcome = Some(outcome.clone());
            (mem::take(&mut state.observers), mem::take(&mut state.wakers))
        };

        for waker in wakers {
            waker.wake();
        }

        // Observers may register more observers or settle other instances, so we must not be
        // holding the lock here
        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(&outcome))).is_err() {
                tracing::error!("observer panicked");
            }
        }

        true
    }

    fn observe(&self, observer: Observer<ValueT, ErrorT>) -> &Self {
        let mut state = self.state.lock();
        let outcome = state.outcome.clone();
        match outcome {
            Some(outcome) => {
                drop(state);
                observer(&outcome);
            }

            None => state.observers.push(observer),
        }
        self
    }
}

impl<ValueT, ErrorT> Clone for Deferred<ValueT, ErrorT> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<ValueT, ErrorT> Future for Deferred<ValueT, ErrorT>
where
    ValueT: Clone,
    ErrorT: Clone,
{
    type Output = Outcome<ValueT, ErrorT>;

    fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.lock();

        if let Some(outcome) = state.outcome.clone() {
            return Poll::Ready(outcome);
        }

        if !state
            .wakers
            .iter()
            .any(|waker| waker.will_wake(context.waker()))
        {
            state.wakers.push(context.waker().clone());
        }

        Poll::Pending
    }
}

impl<ValueT, ErrorT> fmt::Debug for Deferred<ValueT, ErrorT>
where
    ValueT: fmt::Debug,
    ErrorT: fmt::Debug,
{
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("Deferred")
            .field("outcome", &self.state.lock().outcome)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{super::promise::*, *};

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn settles_once() {
        let promise = Promise::<u32, String>::new();
        let deferred = promise.deferred();

        assert!(deferred.is_pending());
        assert!(promise.succeed(1));
        assert!(!promise.succeed(2));
        assert!(!promise.fail("late".into()));
        assert!(!deferred.cancel());

        assert_eq!(deferred.outcome(), Some(Outcome::Success(1)));
    }

    #[test]
    fn observers_fire_once_before_and_after_settlement() {
        let promise = Promise::<u32, String>::new();
        let deferred = promise.deferred();
        let calls = Arc::new(AtomicUsize::new(0));

        {
            let calls = calls.clone();
            deferred.on_success(move |value| {
                assert_eq!(value, 7);
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        promise.succeed(7);
        promise.succeed(8);

        {
            let calls = calls.clone();
            deferred.on_success(move |value| {
                assert_eq!(value, 7);
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn only_matching_observers_fire() {
        let deferred = Deferred::<u32, String>::failed("boom".into());
        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let cancels = Arc::new(AtomicUsize::new(0));

        {
            let successes = successes.clone();
            let failures = failures.clone();
            let cancels = cancels.clone();
            deferred
                .on_success(move |_| {
                    successes.fetch_add(1, Ordering::SeqCst);
                })
                .on_failure(move |error| {
                    assert_eq!(error, "boom");
                    failures.fetch_add(1, Ordering::SeqCst);
                })
                .on_cancel(move || {
                    cancels.fetch_add(1, Ordering::SeqCst);
                });
        }

        assert_eq!(successes.load(Ordering::SeqCst), 0);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert_eq!(cancels.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn observers_fire_in_registration_order() {
        let promise = Promise::<u32, String>::new();
        let deferred = promise.deferred();
        let order = Arc::new(Mutex::new(Vec::new()));

        for index in 0..3 {
            let order = order.clone();
            deferred.on_complete(move |_| order.lock().push(index));
        }

        promise.cancel();

        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn cancel_from_read_side_reaches_producer() {
        let promise = Promise::<u32, String>::new();
        let deferred = promise.deferred();
        let cancelled = Arc::new(AtomicUsize::new(0));

        {
            let cancelled = cancelled.clone();
            promise.on_cancel(move || {
                cancelled.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(deferred.cancel());
        assert!(promise.is_cancelled());
        assert!(!promise.succeed(1));
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn await_outcome() {
        let promise = Promise::<u32, String>::new();
        let deferred = promise.deferred();

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            promise.succeed(42);
        });

        assert_eq!(deferred.await, Outcome::Success(42));
    }

    #[tokio::test]
    async fn panicking_observer_does_not_block_the_rest() {
        let promise = Promise::<u32, String>::new();
        let deferred = promise.deferred();
        let calls = Arc::new(AtomicUsize::new(0));

        deferred.on_success(|_| panic!("observer"));
        {
            let calls = calls.clone();
            deferred.on_success(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        let waiting = tokio::spawn(deferred.clone());
        tokio::task::yield_now().await;

        assert!(promise.succeed(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(waiting.await.expect("join"), Outcome::Success(5));
    }
}
