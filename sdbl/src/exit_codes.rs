//! Stable exit codes for the `sdbl` and `doctor` binaries.

/// Command succeeded.
pub const OK: i32 = 0;
/// Required positional arguments were missing.
pub const USAGE: i32 = -1;
/// Session creation or another fatal step failed.
pub const FAILURE: i32 = 1;
/// The engine package is not installed for the selected runtime.
pub const COMPONENT_MISSING: i32 = 1;
/// The user declined to continue with a known-incompatible engine version.
pub const OPTED_OUT: i32 = 0;
