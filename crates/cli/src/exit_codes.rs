//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success                                        |
//! | 1    | General error (unspecified)                    |
//! | 2    | Usage error (bad args, unparsable value)       |
//! | 3    | Unknown group or setting                       |
//! | 4    | Backing store failure (read, write, flush)     |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing schema, value of the wrong kind.
pub const EXIT_USAGE: u8 = 2;

/// The named group or setting is not declared in the schema.
pub const EXIT_UNKNOWN_SETTING: u8 = 3;

/// The backing store could not be read or written.
pub const EXIT_STORE: u8 = 4;
