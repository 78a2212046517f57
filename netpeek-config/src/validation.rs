//! Custom validation functions for configuration.

use validator::ValidationError;

use crate::capture::ALL_DEVICES;

/// `"all"` or an interface name: 1-15 chars of `[A-Za-z0-9_.:-]`.
pub fn validate_device(name: &str) -> Result<(), ValidationError> {
    if name == ALL_DEVICES {
        return Ok(());
    }

    let re = regex::Regex::new(r"^[A-Za-z0-9_.:\-]{1,15}$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_device"))
    }
}

pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

pub fn validate_log_format(format: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^(pretty|json)$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(format) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_format"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_names() {
        assert!(validate_device("all").is_ok());
        assert!(validate_device("eth0").is_ok());
        assert!(validate_device("enp0s31f6").is_ok());
        assert!(validate_device("eth0.100").is_ok());
        assert!(validate_device("").is_err());
        assert!(validate_device("an-interface-name-too-long").is_err());
        assert!(validate_device("eth 0").is_err());
    }

    #[test]
    fn log_settings() {
        assert!(validate_log_level("INFO").is_ok());
        assert!(validate_log_level("verbose").is_err());
        assert!(validate_log_format("json").is_ok());
        assert!(validate_log_format("xml").is_err());
    }
}
