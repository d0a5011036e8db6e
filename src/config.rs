use std::path::Path;

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate, PERSISTED_DP};
use crate::errors::{LoanError, Result};
use crate::loan::LoanApplication;

/// loan-book configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoanConfig {
    pub defaults: LoanDefaults,
    pub rounding: RoundingConfig,
    pub policy: ValidationPolicy,
    pub limits: LoanLimits,
    pub dashboard: DashboardConfig,
}

/// values used when an application leaves a term unspecified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanDefaults {
    pub interest_rate: Rate,
    pub months: u32,
}

/// precision applied when derived amounts are persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundingConfig {
    pub decimal_places: u32,
}

/// validation rules applied at origination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ValidationPolicy {
    /// accept negative (discount) rates; rates at or below -100% are always rejected
    pub allow_negative_rate: bool,
}

/// storage limits for loan fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanLimits {
    pub max_principal: Option<Money>,
    pub max_interest_rate: Option<Rate>,
    pub max_term_months: Option<u32>,
}

/// employee dashboard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub recent_loans: usize,
}

impl Default for LoanDefaults {
    fn default() -> Self {
        Self {
            interest_rate: Rate::from_percentage(10),
            months: 10,
        }
    }
}

impl Default for RoundingConfig {
    fn default() -> Self {
        Self {
            decimal_places: PERSISTED_DP,
        }
    }
}

impl Default for LoanLimits {
    fn default() -> Self {
        // 12 digits with 2 decimals for amounts, 5 digits with 2 decimals for rates
        Self {
            max_principal: Some(Money::from_decimal(dec!(9999999999.99))),
            max_interest_rate: Some(Rate::from_percent(dec!(999.99))),
            max_term_months: None,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { recent_loans: 10 }
    }
}

impl LoanConfig {
    /// parse configuration from json, missing sections fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LoanConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// load configuration from a json file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| LoanError::InvalidConfiguration {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_json(&raw)
    }

    /// check the configuration is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.defaults.months == 0 {
            return Err(LoanError::InvalidConfiguration {
                message: "default term must be at least one month".to_string(),
            });
        }
        if self.defaults.interest_rate.is_negative() && !self.policy.allow_negative_rate {
            return Err(LoanError::InvalidConfiguration {
                message: "default interest rate is negative but negative rates are not allowed".to_string(),
            });
        }
        if self.rounding.decimal_places > 8 {
            return Err(LoanError::InvalidConfiguration {
                message: format!(
                    "{} decimal places exceeds the 8 places money is carried with",
                    self.rounding.decimal_places
                ),
            });
        }
        if self.dashboard.recent_loans == 0 {
            return Err(LoanError::InvalidConfiguration {
                message: "dashboard must show at least one recent loan".to_string(),
            });
        }
        Ok(())
    }

    /// check an application against policy and limits
    pub fn validate_application(&self, application: &LoanApplication) -> Result<()> {
        let months = application.months.unwrap_or(self.defaults.months);
        if months == 0 {
            return Err(LoanError::InvalidTerm { months });
        }
        if let Some(max) = self.limits.max_term_months {
            if months > max {
                return Err(LoanError::InvalidTerm { months });
            }
        }

        if !application.principal.is_positive() {
            return Err(LoanError::InvalidAmount { amount: application.principal });
        }
        if let Some(max) = self.limits.max_principal {
            if application.principal > max {
                return Err(LoanError::InvalidAmount { amount: application.principal });
            }
        }

        let rate = application.interest_rate.unwrap_or(self.defaults.interest_rate);
        if rate.is_negative() && (!self.policy.allow_negative_rate || rate <= Rate::from_decimal(dec!(-1))) {
            return Err(LoanError::InvalidInterestRate { rate });
        }
        if let Some(max) = self.limits.max_interest_rate {
            if rate > max {
                return Err(LoanError::InvalidInterestRate { rate });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn application(principal: i64, rate: Option<Rate>, months: Option<u32>) -> LoanApplication {
        LoanApplication {
            principal: Money::from_major(principal),
            interest_rate: rate,
            months,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 15),
        }
    }

    #[test]
    fn test_defaults() {
        let config = LoanConfig::default();
        assert_eq!(config.defaults.interest_rate, Rate::from_percentage(10));
        assert_eq!(config.defaults.months, 10);
        assert_eq!(config.rounding.decimal_places, 2);
        assert_eq!(config.dashboard.recent_loans, 10);
        assert!(!config.policy.allow_negative_rate);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = LoanConfig::from_json(r#"{ "defaults": { "months": 12 }, "policy": { "allow_negative_rate": true } }"#).unwrap();
        assert_eq!(config.defaults.months, 12);
        assert_eq!(config.defaults.interest_rate, Rate::from_percentage(10));
        assert!(config.policy.allow_negative_rate);
        assert_eq!(config.dashboard.recent_loans, 10);
    }

    #[test]
    fn test_invalid_json_config() {
        assert!(matches!(
            LoanConfig::from_json(r#"{ "defaults": { "months": 0 } }"#),
            Err(LoanError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            LoanConfig::from_json("not json"),
            Err(LoanError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        assert!(matches!(
            LoanConfig::from_file("/nonexistent/loan-config.json"),
            Err(LoanError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_application_validation() {
        let config = LoanConfig::default();

        config.validate_application(&application(10_000, None, None)).unwrap();
        config.validate_application(&application(10_000, Some(Rate::ZERO), Some(1))).unwrap();

        assert!(matches!(
            config.validate_application(&application(0, None, None)),
            Err(LoanError::InvalidAmount { .. })
        ));
        assert!(matches!(
            config.validate_application(&application(-5, None, None)),
            Err(LoanError::InvalidAmount { .. })
        ));
        assert!(matches!(
            config.validate_application(&application(10_000, None, Some(0))),
            Err(LoanError::InvalidTerm { months: 0 })
        ));
        assert!(matches!(
            config.validate_application(&application(10_000_000_000, None, None)),
            Err(LoanError::InvalidAmount { .. })
        ));
        assert!(matches!(
            config.validate_application(&application(10_000, Some(Rate::from_percentage(1000)), None)),
            Err(LoanError::InvalidInterestRate { .. })
        ));
    }

    #[test]
    fn test_negative_rate_policy() {
        let negative = Some(Rate::from_percent(dec!(-5)));

        let strict = LoanConfig::default();
        assert!(matches!(
            strict.validate_application(&application(10_000, negative, None)),
            Err(LoanError::InvalidInterestRate { .. })
        ));

        let mut lenient = LoanConfig::default();
        lenient.policy.allow_negative_rate = true;
        lenient.validate_application(&application(10_000, negative, None)).unwrap();

        // a -100% rate would wipe out the principal entirely
        assert!(matches!(
            lenient.validate_application(&application(10_000, Some(Rate::from_percent(dec!(-100))), None)),
            Err(LoanError::InvalidInterestRate { .. })
        ));
    }
}
