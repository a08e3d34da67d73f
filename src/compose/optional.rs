/// Compose two synchronous stages returning [Option].
///
/// The composite behaves like `g(f(x))`, except that if `f` returns [None] then so does the
/// composite, and `g` is not called.
pub fn compose_optional<InputT, IntermediateT, OutputT, FirstT, SecondT>(
    first: FirstT,
    second: SecondT,
) -> impl Fn(InputT) -> Option<OutputT>
where
    FirstT: Fn(InputT) -> Option<IntermediateT>,
    SecondT: Fn(IntermediateT) -> Option<OutputT>,
{
    move |input| first(input).and_then(&second)
}
