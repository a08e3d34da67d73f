//
// Outcome
//

/// Terminal state of a [Deferred](super::Deferred).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<ValueT, ErrorT> {
    /// Succeeded with a value.
    Success(ValueT),

    /// Failed with an error.
    Failure(ErrorT),

    /// Cancelled.
    ///
    /// Not an error: observers registered with `on_failure` will not see it.
    Cancelled,
}

impl<ValueT, ErrorT> Outcome<ValueT, ErrorT> {
    /// True if [Success](Self::Success).
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// True if [Failure](Self::Failure).
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// True if [Cancelled](Self::Cancelled).
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Into a [Result], with [None] for cancellation.
    pub fn into_result(self) -> Option<Result<ValueT, ErrorT>> {
        match self {
            Self::Success(value) => Some(Ok(value)),
            Self::Failure(error) => Some(Err(error)),
            Self::Cancelled => None,
        }
    }

    /// Map the success value.
    pub fn map<MappedT>(self, map: impl FnOnce(ValueT) -> MappedT) -> Outcome<MappedT, ErrorT> {
        match self {
            Self::Success(value) => Outcome::Success(map(value)),
            Self::Failure(error) => Outcome::Failure(error),
            Self::Cancelled => Outcome::Cancelled,
        }
    }
}

impl<ValueT, ErrorT> From<Result<ValueT, ErrorT>> for Outcome<ValueT, ErrorT> {
    fn from(result: Result<ValueT, ErrorT>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error),
        }
    }
}
