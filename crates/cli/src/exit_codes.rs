//! CLI Exit Code Registry
//!
//! Single source of truth for `c2t-validate` exit codes. Scripts and
//! pipelines rely on them.
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | General error (unspecified)                      |
//! | 2    | Usage error (bad args, bad argument values)      |
//! | 3    | Invalid config (TOML syntax or schema)           |
//! | 4    | Runtime error (unreadable input, bad CSV, write) |
//! | 5    | Flagged records present (`--fail-on-flagged`)    |

use c2t_validation::ValidationError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments or argument values.
pub const EXIT_USAGE: u8 = 2;

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Input could not be read or parsed, or output could not be written.
pub const EXIT_RUNTIME: u8 = 4;

/// Run completed but flagged records exist and `--fail-on-flagged` was set.
pub const EXIT_FLAGGED: u8 = 5;

/// Map an engine error to its exit code.
pub fn validation_exit_code(err: &ValidationError) -> u8 {
    match err {
        ValidationError::ConfigParse(_) | ValidationError::ConfigValidation(_) => {
            EXIT_INVALID_CONFIG
        }
        ValidationError::InvalidArgument(_) => EXIT_USAGE,
        ValidationError::MissingColumn { .. }
        | ValidationError::ValueParse { .. }
        | ValidationError::Csv(_)
        | ValidationError::Io(_) => EXIT_RUNTIME,
    }
}
