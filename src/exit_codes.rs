//! Exit code constants for the delegator CLI.
//!
//! - 0: Success (run completed, all jobs succeeded)
//! - 1: User error (bad args, unusable environment)
//! - 2: Run finished but at least one job failed
//! - 3: Run was cancelled

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or unusable environment.
pub const USER_ERROR: i32 = 1;

/// The run finished but one or more jobs failed.
pub const RUN_FAILED: i32 = 2;

/// The run was cancelled before all jobs finished.
pub const RUN_CANCELLED: i32 = 3;
