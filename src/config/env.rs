//! Config values read from the environment.

/// A required environment variable is unset or empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} config missing")]
pub struct ConfigVarError(pub String);

/// Read a required config value from the environment.
pub fn load_config_var(name: &str) -> Result<String, ConfigVarError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigVarError(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_var() {
        let err = load_config_var("MICRO_PIPELINE_TEST_SURELY_UNSET").unwrap_err();
        assert_eq!(err.to_string(), "MICRO_PIPELINE_TEST_SURELY_UNSET config missing");
    }

    #[test]
    fn test_present_var() {
        // PATH is set in any sane test environment.
        assert!(load_config_var("PATH").is_ok());
    }
}
