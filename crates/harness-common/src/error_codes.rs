pub const RUNTIME_INIT_FAILED: i32 = -32001;
pub const COMPILE_FAILED: i32 = -32002;
pub const DEPLOY_FAILED: i32 = -32003;

pub const NO_SUCH_FUNCTION: i32 = -32004;
pub const CALL_FAILED: i32 = -32005;

pub const ASSERTION_FAILED: i32 = -32006;
pub const STEP_TIMEOUT: i32 = -32007;

pub const GENERIC_ERROR: i32 = -32000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    InvalidInput,
    Mismatch,
    Internal,
    External,
    Timeout,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::Mismatch => "mismatch",
            ErrorCategory::Internal => "internal",
            ErrorCategory::External => "external",
            ErrorCategory::Timeout => "timeout",
        }
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_found" => Ok(ErrorCategory::NotFound),
            "invalid_input" => Ok(ErrorCategory::InvalidInput),
            "mismatch" => Ok(ErrorCategory::Mismatch),
            "internal" => Ok(ErrorCategory::Internal),
            "external" => Ok(ErrorCategory::External),
            "timeout" => Ok(ErrorCategory::Timeout),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn category_for_code(code: i32) -> ErrorCategory {
    match code {
        NO_SUCH_FUNCTION => ErrorCategory::NotFound,
        COMPILE_FAILED => ErrorCategory::InvalidInput,
        ASSERTION_FAILED => ErrorCategory::Mismatch,
        RUNTIME_INIT_FAILED | DEPLOY_FAILED | CALL_FAILED => ErrorCategory::External,
        STEP_TIMEOUT => ErrorCategory::Timeout,
        _ => ErrorCategory::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_for_code_not_found() {
        assert_eq!(
            category_for_code(NO_SUCH_FUNCTION),
            ErrorCategory::NotFound
        );
    }

    #[test]
    fn test_category_for_code_external() {
        assert_eq!(
            category_for_code(RUNTIME_INIT_FAILED),
            ErrorCategory::External
        );
        assert_eq!(category_for_code(DEPLOY_FAILED), ErrorCategory::External);
        assert_eq!(category_for_code(CALL_FAILED), ErrorCategory::External);
    }

    #[test]
    fn test_category_for_code_assertion_is_mismatch() {
        assert_eq!(
            category_for_code(ASSERTION_FAILED),
            ErrorCategory::Mismatch
        );
    }

    #[test]
    fn test_category_for_code_unknown_is_internal() {
        assert_eq!(category_for_code(GENERIC_ERROR), ErrorCategory::Internal);
        assert_eq!(category_for_code(12345), ErrorCategory::Internal);
    }

    #[test]
    fn test_category_round_trips_through_str() {
        for category in [
            ErrorCategory::NotFound,
            ErrorCategory::InvalidInput,
            ErrorCategory::Mismatch,
            ErrorCategory::Internal,
            ErrorCategory::External,
            ErrorCategory::Timeout,
        ] {
            assert_eq!(category.as_str().parse::<ErrorCategory>(), Ok(category));
        }
        assert!("bogus".parse::<ErrorCategory>().is_err());
    }
}
