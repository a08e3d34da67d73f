use super::super::promise::*;

use std::sync::*;

/// Compose two [Deferred]-returning stages.
///
/// Every call to the composite creates a fresh [Promise] and immediately calls `first` with the
/// input:
///
/// * If `first` fails or is cancelled then the composite fails with the same error or is
///   cancelled, and `second` is not called.
/// * If `first` succeeds then `second` is called with its value, and the composite settles with
///   whatever `second` settles with.
///
/// The composite settles exactly once per call.
///
/// Cancelling the composite's [Deferred] cancels whichever stage is currently active. If the
/// composite is already settled by the time `first` succeeds, `second` is not called.
///
/// There is no timeout: if a stage never settles then neither does the composite.
pub fn compose_deferred<InputT, IntermediateT, OutputT, ErrorT, FirstT, SecondT>(
    first: FirstT,
    second: SecondT,
) -> impl Fn(InputT) -> Deferred<OutputT, ErrorT> + 'static + Send + Sync
where
    InputT: 'static,
    IntermediateT: 'static + Clone + Send,
    OutputT: 'static + Clone + Send,
    ErrorT: 'static + Clone + Send,
    FirstT: 'static + Fn(InputT) -> Deferred<IntermediateT, ErrorT> + Send + Sync,
    SecondT: 'static + Fn(IntermediateT) -> Deferred<OutputT, ErrorT> + Send + Sync,
{
    let second = Arc::new(second);

    move |input| {
        let promise = Promise::new();
        let composite = promise.deferred();

        let first_stage = first(input);
        cancel_with(&composite, &first_stage);

        let second = second.clone();
        first_stage
            .on_success({
                let promise = promise.clone();
                let composite = composite.clone();
                move |intermediate| {
                    if !composite.is_pending() {
                        tracing::debug!("not calling second stage: composite already settled");
                        return;
                    }

                    let second_stage = second(intermediate);
                    cancel_with(&composite, &second_stage);
                    forward(&second_stage, promise);
                }
            })
            .on_failure({
                let promise = promise.clone();
                move |error| {
                    promise.fail(error);
                }
            })
            .on_cancel(move || {
                promise.cancel();
            });

        composite
    }
}

/// Settle the promise with the deferred's outcome.
pub(crate) fn forward<ValueT, ErrorT>(
    deferred: &Deferred<ValueT, ErrorT>,
    promise: Promise<ValueT, ErrorT>,
) where
    ValueT: 'static + Clone + Send,
    ErrorT: 'static + Clone + Send,
{
    deferred.on_complete(move |outcome| {
        promise.settle(outcome);
    });
}

/// Cancel the stage when the composite is cancelled.
pub(crate) fn cancel_with<CompositeValueT, StageValueT, ErrorT>(
    composite: &Deferred<CompositeValueT, ErrorT>,
    stage: &Deferred<StageValueT, ErrorT>,
) where
    CompositeValueT: 'static + Clone + Send,
    StageValueT: 'static + Clone + Send,
    ErrorT: 'static + Clone + Send,
{
    let stage = stage.clone();
    composite.on_cancel(move || {
        if stage.cancel() {
            tracing::debug!("cancelled active stage");
        }
    });
}
