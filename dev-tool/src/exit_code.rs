/// Everything went fine.
pub const NO_ERROR: i32 = 0;
/// The command failed.
pub const FATAL_ERROR: i32 = 1;
/// The command finished, but some of its inputs were skipped.
pub const NON_FATAL_ERROR: i32 = 2;
