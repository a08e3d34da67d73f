use super::dispatcher::*;

//
// InlineDispatcher
//

/// [Dispatcher] that runs jobs immediately on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, job: Job) -> Result<(), Job> {
        job();
        Ok(())
    }
}
