//! Configuration validation.

use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_registry(config, &mut result);
        Self::validate_soak(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_registry(config: &Config, result: &mut ValidationResult) {
        if config.registry.default_send_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "registry.default_send_timeout_ms",
                "default_send_timeout_ms must be greater than 0",
            ));
        }

        if config.registry.live_entry_warn_threshold == 0 {
            result.add_warning(ValidationWarning::new(
                "registry.live_entry_warn_threshold",
                "leak warnings are disabled, forgotten releases will go unnoticed",
            ));
        }
    }

    fn validate_soak(config: &Config, result: &mut ValidationResult) {
        let soak = &config.soak;

        if soak.callers == 0 {
            result.add_error(ValidationError::new("soak.callers", "callers must be greater than 0"));
        }

        if soak.responders == 0 {
            result.add_error(ValidationError::new(
                "soak.responders",
                "responders must be greater than 0",
            ));
        }

        if soak.send_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "soak.send_timeout_ms",
                "send_timeout_ms must be greater than 0",
            ));
        }

        if !(0.0..=1.0).contains(&soak.abandon_ratio) {
            result.add_error(ValidationError::new(
                "soak.abandon_ratio",
                "abandon_ratio must be between 0.0 and 1.0",
            ));
        }

        // Receivers that give up before responders do turn deliveries into
        // deadline failures on the responder side.
        if soak.receive_timeout_ms < soak.send_timeout_ms {
            result.add_warning(ValidationWarning::new(
                "soak.receive_timeout_ms",
                "receive_timeout_ms is shorter than send_timeout_ms",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if config.logging.level.trim().is_empty() {
            result.add_error(ValidationError::new("logging.level", "level cannot be empty"));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
