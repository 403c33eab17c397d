use std::collections::HashMap;
use std::process::{Child, Command, Stdio};

use thiserror::Error;

use crate::launch::domain::action_launcher::{ActionLauncher, ProcessHandle};

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("no launch command available for {0:?}")]
    NoCommand(String),
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Launches the browser as a child process this launcher can kill again.
///
/// The platform's URL-opener command table (via the `open` crate) decides
/// what to spawn unless an explicit command override is configured; the
/// override gets the URL appended as its final argument. Children are
/// retained by handle so a later `terminate` can reach them.
pub struct ProcessLauncher {
    browser_command: Option<Vec<String>>,
    children: HashMap<u64, Child>,
    next_id: u64,
}

impl ProcessLauncher {
    pub fn new() -> Self {
        Self {
            browser_command: None,
            children: HashMap::new(),
            next_id: 1,
        }
    }

    /// Uses `argv` instead of the platform opener; the URL is appended.
    pub fn with_browser_command(argv: Vec<String>) -> Self {
        let mut launcher = Self::new();
        launcher.browser_command = Some(argv);
        launcher
    }

    fn candidates(&self, target: &str) -> Vec<Command> {
        match &self.browser_command {
            Some(argv) if !argv.is_empty() => {
                let mut cmd = Command::new(&argv[0]);
                cmd.args(&argv[1..]).arg(target);
                vec![cmd]
            }
            _ => open::commands(target),
        }
    }

    fn spawn(&mut self, target: &str) -> Result<ProcessHandle, LaunchError> {
        let mut last_error = None;
        for mut cmd in self.candidates(target) {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
            let name = cmd.get_program().to_string_lossy().into_owned();
            match cmd.spawn() {
                Ok(child) => {
                    let handle = ProcessHandle(self.next_id);
                    self.next_id += 1;
                    log::debug!("launched {name} (pid {}) for {target}", child.id());
                    self.children.insert(handle.0, child);
                    return Ok(handle);
                }
                Err(e) => {
                    last_error = Some(LaunchError::Spawn {
                        command: name,
                        source: e,
                    })
                }
            }
        }
        Err(last_error.unwrap_or_else(|| LaunchError::NoCommand(target.to_string())))
    }
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionLauncher for ProcessLauncher {
    fn start(&mut self, url: &str) -> Result<ProcessHandle, Box<dyn std::error::Error>> {
        let target = normalize_url(url);
        Ok(self.spawn(&target)?)
    }

    fn terminate(&mut self, handle: ProcessHandle) -> Result<(), Box<dyn std::error::Error>> {
        // Unknown handles were reaped earlier; already-gone is success.
        let Some(mut child) = self.children.remove(&handle.0) else {
            return Ok(());
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                log::debug!("action process already exited with {status}");
            }
            _ => {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
        Ok(())
    }
}

/// Stored URLs are bare hosts; give them a scheme before handing them to
/// the opener.
fn normalize_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher(argv: &[&str]) -> ProcessLauncher {
        ProcessLauncher::with_browser_command(argv.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_normalize_adds_scheme_to_bare_host() {
        assert_eq!(normalize_url("alice.example"), "http://alice.example");
    }

    #[test]
    fn test_normalize_keeps_existing_scheme() {
        assert_eq!(normalize_url("https://alice.example"), "https://alice.example");
    }

    #[test]
    fn test_unspawnable_command_errors() {
        let mut l = launcher(&["/definitely/not/a/browser"]);
        assert!(l.start("alice.example").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_start_then_terminate_kills_child() {
        let mut l = launcher(&["sh", "-c", "exec sleep 30"]);
        let handle = l.start("alice.example").unwrap();
        l.terminate(handle).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_is_idempotent() {
        let mut l = launcher(&["sh", "-c", "exec sleep 30"]);
        let handle = l.start("alice.example").unwrap();
        l.terminate(handle).unwrap();
        l.terminate(handle).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_of_exited_process_is_success() {
        let mut l = launcher(&["true"]);
        let handle = l.start("alice.example").unwrap();
        // Let the child finish on its own before we try to stop it.
        std::thread::sleep(std::time::Duration::from_millis(50));
        l.terminate(handle).unwrap();
    }

    #[test]
    fn test_terminate_of_unknown_handle_is_success() {
        let mut l = launcher(&["true"]);
        l.terminate(ProcessHandle(999)).unwrap();
    }
}
