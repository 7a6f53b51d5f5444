use crate::process_thread::ProcessThreadHandle;

/// Identifies one registration of a [`Module`] with a
/// [`ProcessThread`](crate::ProcessThread).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) u64);

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

/// A unit of periodic work driven by a [`ProcessThread`](crate::ProcessThread).
///
/// `time_until_next_process` and `process` are only ever called on the
/// worker thread, one call at a time.
pub trait Module: Send + Sync {
    /// Returns the number of milliseconds until the module wants `process`
    /// to be called. Zero or a negative value asks for an immediate call.
    fn time_until_next_process(&self) -> i64;

    /// Does the periodic work.
    fn process(&self);

    /// Called with `Some` when the module starts being driven by a process
    /// thread, and with `None` when it is deregistered or the thread stops.
    ///
    /// The handle may be kept to wake the module up later. It is called with
    /// the scheduler's registration lock held; calling back into the
    /// scheduler from here is allowed.
    fn process_thread_attached(&self, _process_thread: Option<ProcessThreadHandle>) {}
}
