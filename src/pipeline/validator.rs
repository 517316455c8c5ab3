use crate::config::InputConfig;
use crate::error::Result;
use regex::Regex;

/// Verdict on one raw address field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Accepted(String),
    Rejected,
}

/// Checks raw address fields against the configured format rule.
///
/// With checking disabled every non-empty field is accepted as-is; empty or
/// missing fields are rejected either way since they cannot be delivered.
#[derive(Debug, Clone)]
pub struct AddressValidator {
    pattern: Option<Regex>,
}

impl AddressValidator {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Some(Regex::new(pattern)?),
        })
    }

    /// Accept any non-empty field without checking its format.
    pub fn unchecked() -> Self {
        Self { pattern: None }
    }

    pub fn from_config(input: &InputConfig) -> Result<Self> {
        if input.validate_addresses {
            Self::new(&input.address_pattern)
        } else {
            Ok(Self::unchecked())
        }
    }

    pub fn validate(&self, raw: Option<&str>) -> Validation {
        let field = match raw {
            Some(f) if !f.is_empty() => f,
            _ => return Validation::Rejected,
        };
        match &self.pattern {
            Some(re) if !re.is_match(field) => Validation::Rejected,
            _ => Validation::Accepted(field.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_ADDRESS_PATTERN;

    fn default_validator() -> AddressValidator {
        AddressValidator::new(DEFAULT_ADDRESS_PATTERN).unwrap()
    }

    #[test]
    fn accepts_plus_prefixed_digits() {
        let v = default_validator();
        assert_eq!(
            v.validate(Some("+15550001")),
            Validation::Accepted("+15550001".to_string())
        );
    }

    #[test]
    fn rejects_malformed_fields() {
        let v = default_validator();
        for raw in ["bad", "15550001", "+1555-0001", "+", "+1555 0001", " +15550001", "abc+123"] {
            assert_eq!(v.validate(Some(raw)), Validation::Rejected, "{}", raw);
        }
    }

    #[test]
    fn rejects_empty_and_missing() {
        let v = default_validator();
        assert_eq!(v.validate(Some("")), Validation::Rejected);
        assert_eq!(v.validate(None), Validation::Rejected);
    }

    #[test]
    fn validation_is_idempotent() {
        let v = default_validator();
        for raw in ["+15550001", "bad", ""] {
            let first = v.validate(Some(raw));
            let again = match &first {
                Validation::Accepted(addr) => v.validate(Some(addr)),
                Validation::Rejected => v.validate(Some(raw)),
            };
            assert_eq!(first, again);
        }
    }

    #[test]
    fn unchecked_accepts_anything_non_empty() {
        let v = AddressValidator::unchecked();
        assert_eq!(v.validate(Some("bad")), Validation::Accepted("bad".to_string()));
        assert_eq!(v.validate(Some("")), Validation::Rejected);
        assert_eq!(v.validate(None), Validation::Rejected);
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(AddressValidator::new("(").is_err());
    }

    #[test]
    fn from_config_follows_the_input_section() {
        let checked = AddressValidator::from_config(&InputConfig::default()).unwrap();
        assert_eq!(checked.validate(Some("bad")), Validation::Rejected);

        let unchecked = AddressValidator::from_config(&InputConfig {
            validate_addresses: false,
            ..InputConfig::default()
        })
        .unwrap();
        assert_eq!(unchecked.validate(Some("bad")), Validation::Accepted("bad".to_string()));

        let bad_pattern = InputConfig {
            address_pattern: "(".to_string(),
            ..InputConfig::default()
        };
        assert!(AddressValidator::from_config(&bad_pattern).is_err());
    }
}
