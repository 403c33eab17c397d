//! Face-gated session control.
//!
//! Gates an external privileged action (a browser pointed at a per-user
//! URL) behind a continuously re-evaluated face-identification signal.
//! Detection, recognition, capture, launching and storage are domain
//! interfaces; this crate owns the session state machine and the cycle
//! runner that drives it.

pub mod capture;
pub mod detection;
pub mod launch;
pub mod recognition;
pub mod session;
pub mod shared;
pub mod storage;
