use super::{deferred::*, outcome::*};

//
// Promise
//

/// Write side of a settle-once asynchronous result.
///
/// Paired with exactly one [Deferred], which can be retrieved any number of times via
/// [deferred](Self::deferred). Only the first settlement has an effect, subsequent attempts
/// return false.
///
/// Clones refer to the same pair, so that a settlement right can be moved into more than one
/// callback (e.g. one for each possible outcome of an upstream operation).
pub struct Promise<ValueT, ErrorT> {
    deferred: Deferred<ValueT, ErrorT>,
}

impl<ValueT, ErrorT> Promise<ValueT, ErrorT>
where
    ValueT: 'static + Clone + Send,
    ErrorT: 'static + Clone + Send,
{
    /// Constructor.
    pub fn new() -> Self {
        Self {
            deferred: Deferred::pending(),
        }
    }

    /// The paired [Deferred].
    pub fn deferred(&self) -> Deferred<ValueT, ErrorT> {
        self.deferred.clone()
    }

    /// Settle with a value.
    pub fn succeed(&self, value: ValueT) -> bool {
        self.settle(Outcome::Success(value))
    }

    /// Settle with an error.
    pub fn fail(&self, error: ErrorT) -> bool {
        self.settle(Outcome::Failure(error))
    }

    /// Settle as cancelled.
    pub fn cancel(&self) -> bool {
        self.settle(Outcome::Cancelled)
    }

    /// Settle.
    pub fn settle(&self, outcome: Outcome<ValueT, ErrorT>) -> bool {
        self.deferred.settle(outcome)
    }

    /// True if the pair was cancelled, by either side.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.deferred.outcome(), Some(Outcome::Cancelled))
    }

    /// Observe cancellation requests from the read side.
    pub fn on_cancel<ObserverT>(&self, observer: ObserverT) -> &Self
    where
        ObserverT: 'static + FnOnce() + Send,
    {
        self.deferred.on_cancel(observer);
        self
    }
}

impl<ValueT, ErrorT> Clone for Promise<ValueT, ErrorT> {
    fn clone(&self) -> Self {
        Self {
            deferred: self.deferred.clone(),
        }
    }
}

impl<ValueT, ErrorT> Default for Promise<ValueT, ErrorT>
where
    ValueT: 'static + Clone + Send,
    ErrorT: 'static + Clone + Send,
{
    fn default() -> Self {
        Self::new()
    }
}
