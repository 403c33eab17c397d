/// Opaque identifier for a launched action process.
///
/// Only the launcher that minted a handle can resolve it back to an OS
/// process; the session core just stores and returns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProcessHandle(pub u64);

/// Starts and stops the privileged external action (the browser).
///
/// `terminate` is idempotent by contract: terminating a process that has
/// already exited, or a handle the launcher no longer knows, is success.
pub trait ActionLauncher: Send {
    fn start(&mut self, url: &str) -> Result<ProcessHandle, Box<dyn std::error::Error>>;

    fn terminate(&mut self, handle: ProcessHandle) -> Result<(), Box<dyn std::error::Error>>;
}
