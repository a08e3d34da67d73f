use std::sync::*;

/// Completion callback for [compose_callback] stages.
pub type Completion<ValueT> = Box<dyn FnOnce(Option<ValueT>) + Send>;

/// Compose two callback-based stages.
///
/// The composite calls `first` with the input. If `first` completes with [None] then so does the
/// composite, and `second` is not called. Otherwise `second` is called with the value and its
/// completion is forwarded as is.
///
/// If a stage never completes then neither does the composite.
pub fn compose_callback<InputT, IntermediateT, OutputT, FirstT, SecondT>(
    first: FirstT,
    second: SecondT,
) -> impl Fn(InputT, Completion<OutputT>) + 'static + Send + Sync
where
    InputT: 'static,
    IntermediateT: 'static,
    OutputT: 'static,
    FirstT: 'static + Fn(InputT, Completion<IntermediateT>) + Send + Sync,
    SecondT: 'static + Fn(IntermediateT, Completion<OutputT>) + Send + Sync,
{
    let second = Arc::new(second);
    move |input, completion| {
        let second = second.clone();
        first(
            input,
            Box::new(move |intermediate| match intermediate {
                Some(intermediate) => second(intermediate, completion),
                None => completion(None),
            }),
        )
    }
}
