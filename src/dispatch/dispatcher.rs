use std::{result::Result, sync::*};

/// Unit of work submitted to a [Dispatcher].
pub type Job = Box<dyn FnOnce() + Send>;

/// Common reference type for [Dispatcher].
pub type DispatcherRef = Arc<dyn Dispatcher>;

//
// Dispatcher
//

/// Completion context.
///
/// Completions are handed over to the dispatcher regardless of which thread produced them, so
/// that consumers observe results on a context of their choosing.
pub trait Dispatcher
where
    Self: 'static + Send + Sync,
{
    /// Run the job on this context.
    ///
    /// If the context can no longer run jobs then the job is handed back.
    fn dispatch(&self, job: Job) -> Result<(), Job>;
}

/// Run the job on the dispatcher, or on the calling thread if the dispatcher hands it back.
///
/// Either way the job runs exactly once.
pub fn dispatch_or_run(dispatcher: &dyn Dispatcher, job: Job) {
    if let Err(job) = dispatcher.dispatch(job) {
        tracing::warn!("dispatcher is not running, running job on the calling thread");
        job()
    }
}
