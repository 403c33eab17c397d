use std::time::Duration;

/// Reserved identity label meaning "no enrolled match".
///
/// The enrollment path refuses to persist it, so it can never collide
/// with a real user name.
pub const UNRECOGNIZED_USER: &str = "<unrecognized>";

/// Default cadence of the detection cycle.
pub const DETECT_INTERVAL: Duration = Duration::from_millis(50);

/// Default cadence of the recognition cycle.
pub const RECOGNIZE_INTERVAL: Duration = Duration::from_millis(700);

/// Consecutive unrecognized recognition cycles tolerated while a session
/// is open before mandatory teardown.
pub const UNRECOGNIZED_STREAK_LIMIT: u32 = 3;
