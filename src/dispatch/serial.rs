use super::dispatcher::*;

use {
    std::{
        panic::{AssertUnwindSafe, catch_unwind},
        result::Result,
    },
    tokio::sync::mpsc::*,
};

//
// SerialDispatcher
//

/// [Dispatcher] that runs jobs one at a time, in submission order, on a single Tokio task.
///
/// This is the equivalent of a "main thread": consumers that only ever observe completions here
/// never need their own synchronization.
///
/// A panicking job is logged and does not stop the task. The task stops when all clones are
/// dropped or when the runtime shuts down. Jobs submitted after that are handed back.
#[derive(Clone)]
pub struct SerialDispatcher {
    sender: UnboundedSender<Job>,
}

impl SerialDispatcher {
    /// Spawn the dispatcher task.
    ///
    /// Panics if not called within a Tokio runtime.
    pub fn spawn() -> Self {
        let (sender, mut receiver) = unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!("job panicked");
                }
            }
            tracing::debug!("serial dispatcher stopped");
        });

        Self { sender }
    }
}

impl Dispatcher for SerialDispatcher {
    fn dispatch(&self, job: Job) -> Result<(), Job> {
        self.sender.send(job).map_err(|error| error.0)
    }
}
