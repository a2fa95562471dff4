/// Error code registry for shipyard
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 3000-3999: Storage errors
/// - 4000-4999: Execution errors
/// - 5000-5999: Infrastructure output errors
/// - 7000-7999: Validation errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_TOML: u16 = 1002;
    pub const CONFIG_MISSING_REQUIRED: u16 = 1004;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;

    // Storage errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_PERMISSION_DENIED: u16 = 3002;
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_ARCHIVE_ERROR: u16 = 3013;

    // Execution errors (4000-4999)
    pub const EXEC_GENERIC: u16 = 4000;
    pub const EXEC_COMMAND_NOT_FOUND: u16 = 4001;
    pub const EXEC_SUBPROCESS_FAILED: u16 = 4003;
    pub const EXEC_SIGNAL_RECEIVED: u16 = 4005;
    pub const EXEC_SPAWN_FAILED: u16 = 4007;

    // Infrastructure output errors (5000-5999)
    pub const OUTPUT_NOT_DEFINED: u16 = 5001;
    pub const OUTPUT_INVALID_JSON: u16 = 5002;
    pub const OUTPUT_INVALID_TYPE: u16 = 5003;

    // Validation errors (7000-7999)
    pub const VALIDATION_PATTERN_MISMATCH: u16 = 7004;
    pub const VALIDATION_INVALID_INPUT: u16 = 7008;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Invalid TOML syntax in configuration",
        1004 => "Required configuration value is missing",
        1005 => "Invalid value in configuration",

        3000 => "Generic storage error",
        3001 => "Storage I/O error",
        3002 => "Storage permission denied",
        3004 => "Storage item not found",
        3013 => "Failed to write deployment archive",

        4000 => "Generic execution error",
        4001 => "Command not found",
        4003 => "Subprocess failed",
        4005 => "Command received signal",
        4007 => "Failed to spawn subprocess",

        5001 => "Infrastructure output is not defined",
        5002 => "Infrastructure outputs are not valid JSON",
        5003 => "Infrastructure output has an unexpected type",

        7004 => "Value doesn't match required pattern",
        7008 => "Invalid input",

        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_ranges() {
        assert!(ErrorCode::CONFIG_GENERIC >= 1000 && ErrorCode::CONFIG_GENERIC < 2000);
        assert!(ErrorCode::STORAGE_GENERIC >= 3000 && ErrorCode::STORAGE_GENERIC < 4000);
        assert!(ErrorCode::EXEC_GENERIC >= 4000 && ErrorCode::EXEC_GENERIC < 5000);
        assert!(ErrorCode::OUTPUT_NOT_DEFINED >= 5000 && ErrorCode::OUTPUT_NOT_DEFINED < 6000);
        assert!(
            ErrorCode::VALIDATION_INVALID_INPUT >= 7000 && ErrorCode::VALIDATION_INVALID_INPUT < 8000
        );
    }

    #[test]
    fn test_error_code_descriptions() {
        assert_eq!(describe_error_code(1004), "Required configuration value is missing");
        assert_eq!(describe_error_code(5001), "Infrastructure output is not defined");
        assert_eq!(describe_error_code(65535), "Unknown error code");
    }
}
