use std::{fmt::Display, str::FromStr};

use thiserror::Error;

/// Errors raised while reading settings from the process environment.
#[derive(Debug, Error)]
pub enum EnvVarError {
    /// The variable is set but its value could not be parsed.
    #[error("Invalid value for environment variable {name}: {message}")]
    Invalid { name: String, message: String },
}

/// Reads an optional environment variable and parses it into `T`.
///
/// Returns `Ok(None)` when the variable is unset or blank, so callers can keep
/// their configured value.
pub fn parse_env_var<T>(name: &str) -> Result<Option<T>, EnvVarError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = match std::env::var(name) {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|e| EnvVarError::Invalid {
            name: name.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VAR: &str = "SHARED_UTILS_TEST_VAR";

    #[test]
    #[serial]
    fn parses_present_value() {
        unsafe { std::env::set_var(VAR, " 12 ") };
        let v: Option<u32> = parse_env_var(VAR).unwrap();
        assert_eq!(v, Some(12));
        unsafe { std::env::remove_var(VAR) };
    }

    #[test]
    #[serial]
    fn unset_or_blank_is_none() {
        unsafe { std::env::remove_var(VAR) };
        assert_eq!(parse_env_var::<u32>(VAR).unwrap(), None);
        unsafe { std::env::set_var(VAR, "   ") };
        assert_eq!(parse_env_var::<u32>(VAR).unwrap(), None);
        unsafe { std::env::remove_var(VAR) };
    }

    #[test]
    #[serial]
    fn invalid_value_is_an_error() {
        unsafe { std::env::set_var(VAR, "many") };
        let err = parse_env_var::<u32>(VAR).unwrap_err();
        assert!(matches!(err, EnvVarError::Invalid { .. }));
        assert!(err.to_string().contains(VAR));
        unsafe { std::env::remove_var(VAR) };
    }
}
