// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::ScoreError;

const DEFAULT_WINDOW_SIZE: usize = 5;
const DEFAULT_MOMENTUM_POSITIVE_THRESHOLD: f64 = 0.55;
const DEFAULT_MOMENTUM_NEGATIVE_THRESHOLD: f64 = 0.45;
const DEFAULT_COVERAGE_STRONG: usize = 5;
const DEFAULT_COVERAGE_CONDITIONAL: usize = 3;
const DEFAULT_THRESHOLD_IMPROVING_HIGH: f64 = 0.6;
const DEFAULT_THRESHOLD_IMPROVING_LOW: f64 = 0.3;
const DEFAULT_THRESHOLD_IMPROVING_MIN_LAYERS: usize = 3;
const DEFAULT_THRESHOLD_AT_RISK_COUNT: usize = 2;
const DEFAULT_THRESHOLD_AT_RISK_LOW: f64 = 0.3;
const DEFAULT_THRESHOLD_RISK_DRAG_SEVERE: f64 = 0.5;
const DEFAULT_RISK_DRAG_PENALTY_FLOOR: f64 = 0.5;

/// Immutable engine configuration, injected into every component.
///
/// Thresholds are explicit configuration rather than module constants so
/// sensitivity analyses can vary them per run. Validated once at pipeline
/// start; validation failure is fatal for the whole run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Reference year scored by this run; the window ends here.
    pub as_of_year: i32,
    /// Number of yearly slots in the observation window.
    pub window_size: usize,
    /// Normalized momentum at or above this counts toward improving evidence.
    pub momentum_positive_threshold: f64,
    /// Normalized momentum strictly below this counts toward at-risk evidence.
    pub momentum_negative_threshold: f64,
    /// Average coverage needed for a strong confidence label.
    pub coverage_strong: usize,
    /// Coverage floor separating conditional from fragile evidence.
    pub coverage_conditional: usize,
    /// Layer score at or above this counts as high-performing.
    pub threshold_improving_high: f64,
    /// Layer score strictly below this counts as low-performing.
    pub threshold_improving_low: f64,
    /// High-performing layers required for the improving branch.
    pub threshold_improving_min_layers: usize,
    /// Low-performing layers that alone trigger the at-risk branch.
    pub threshold_at_risk_count: usize,
    /// Low-performing cutoff used by the at-risk branch.
    pub threshold_at_risk_low: f64,
    /// Risk score at or above this makes a single low layer at-risk.
    pub threshold_risk_drag_severe: f64,
    /// Lower bound on the multiplicative risk drag factor.
    pub risk_drag_penalty_floor: f64,
}

impl EngineConfig {
    /// Configuration with default thresholds for the given reference year.
    pub fn for_year(as_of_year: i32) -> Self {
        Self {
            as_of_year,
            window_size: DEFAULT_WINDOW_SIZE,
            momentum_positive_threshold: DEFAULT_MOMENTUM_POSITIVE_THRESHOLD,
            momentum_negative_threshold: DEFAULT_MOMENTUM_NEGATIVE_THRESHOLD,
            coverage_strong: DEFAULT_COVERAGE_STRONG,
            coverage_conditional: DEFAULT_COVERAGE_CONDITIONAL,
            threshold_improving_high: DEFAULT_THRESHOLD_IMPROVING_HIGH,
            threshold_improving_low: DEFAULT_THRESHOLD_IMPROVING_LOW,
            threshold_improving_min_layers: DEFAULT_THRESHOLD_IMPROVING_MIN_LAYERS,
            threshold_at_risk_count: DEFAULT_THRESHOLD_AT_RISK_COUNT,
            threshold_at_risk_low: DEFAULT_THRESHOLD_AT_RISK_LOW,
            threshold_risk_drag_severe: DEFAULT_THRESHOLD_RISK_DRAG_SEVERE,
            risk_drag_penalty_floor: DEFAULT_RISK_DRAG_PENALTY_FLOOR,
        }
    }

    /// First year of the observation window, inclusive.
    pub fn window_start_year(&self) -> i32 {
        // window_size >= 3 is enforced by validate(); the cast is lossless for
        // any plausible window.
        self.as_of_year - (self.window_size as i32) + 1
    }

    /// Validates the configuration; called once at pipeline start.
    pub fn validate(&self) -> Result<(), ScoreError> {
        if self.window_size < 3 {
            return Err(ScoreError::invalid_config(format!(
                "EngineConfig.window_size must be >= 3; got {}",
                self.window_size
            )));
        }

        let unit_fields = [
            (
                "momentum_positive_threshold",
                self.momentum_positive_threshold,
            ),
            (
                "momentum_negative_threshold",
                self.momentum_negative_threshold,
            ),
            ("threshold_improving_high", self.threshold_improving_high),
            ("threshold_improving_low", self.threshold_improving_low),
            ("threshold_at_risk_low", self.threshold_at_risk_low),
            (
                "threshold_risk_drag_severe",
                self.threshold_risk_drag_severe,
            ),
            ("risk_drag_penalty_floor", self.risk_drag_penalty_floor),
        ];
        for (name, value) in unit_fields {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ScoreError::invalid_config(format!(
                    "EngineConfig.{name} must be within [0, 1]; got {value}"
                )));
            }
        }

        if self.momentum_negative_threshold > self.momentum_positive_threshold {
            return Err(ScoreError::invalid_config(format!(
                "EngineConfig.momentum_negative_threshold ({}) must not exceed momentum_positive_threshold ({})",
                self.momentum_negative_threshold, self.momentum_positive_threshold
            )));
        }
        if self.threshold_improving_low > self.threshold_improving_high {
            return Err(ScoreError::invalid_config(format!(
                "EngineConfig.threshold_improving_low ({}) must not exceed threshold_improving_high ({})",
                self.threshold_improving_low, self.threshold_improving_high
            )));
        }
        if self.coverage_conditional < 1 {
            return Err(ScoreError::invalid_config(
                "EngineConfig.coverage_conditional must be >= 1",
            ));
        }
        if self.coverage_strong < self.coverage_conditional {
            return Err(ScoreError::invalid_config(format!(
                "EngineConfig.coverage_strong ({}) must be >= coverage_conditional ({})",
                self.coverage_strong, self.coverage_conditional
            )));
        }
        if self.threshold_improving_min_layers < 1 {
            return Err(ScoreError::invalid_config(
                "EngineConfig.threshold_improving_min_layers must be >= 1",
            ));
        }
        if self.threshold_at_risk_count < 1 {
            return Err(ScoreError::invalid_config(
                "EngineConfig.threshold_at_risk_count must be >= 1",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;
    use crate::ScoreError;

    #[test]
    fn defaults_match_contract() {
        let config = EngineConfig::for_year(2023);
        assert_eq!(config.as_of_year, 2023);
        assert_eq!(config.window_size, 5);
        assert_eq!(config.momentum_positive_threshold, 0.55);
        assert_eq!(config.momentum_negative_threshold, 0.45);
        assert_eq!(config.coverage_strong, 5);
        assert_eq!(config.coverage_conditional, 3);
        assert_eq!(config.threshold_improving_high, 0.6);
        assert_eq!(config.threshold_improving_low, 0.3);
        assert_eq!(config.threshold_improving_min_layers, 3);
        assert_eq!(config.threshold_at_risk_count, 2);
        assert_eq!(config.threshold_at_risk_low, 0.3);
        assert_eq!(config.threshold_risk_drag_severe, 0.5);
        assert_eq!(config.risk_drag_penalty_floor, 0.5);
        config.validate().expect("defaults should validate");
    }

    #[test]
    fn window_start_year_spans_window_size_years() {
        let config = EngineConfig::for_year(2023);
        assert_eq!(config.window_start_year(), 2019);

        let mut wide = config;
        wide.window_size = 10;
        assert_eq!(wide.window_start_year(), 2014);
    }

    #[test]
    fn rejects_window_size_below_three() {
        let mut config = EngineConfig::for_year(2023);
        config.window_size = 2;
        let err = config.validate().expect_err("window_size=2 must fail");
        assert!(matches!(err, ScoreError::InvalidConfig(_)));
        assert!(err.to_string().contains("window_size must be >= 3"));
    }

    #[test]
    fn rejects_thresholds_outside_unit_interval() {
        let mut config = EngineConfig::for_year(2023);
        config.threshold_improving_high = 1.2;
        let err = config.validate().expect_err("threshold above 1 must fail");
        assert!(err.to_string().contains("threshold_improving_high"));

        let mut config = EngineConfig::for_year(2023);
        config.risk_drag_penalty_floor = -0.1;
        let err = config.validate().expect_err("negative floor must fail");
        assert!(err.to_string().contains("risk_drag_penalty_floor"));

        let mut config = EngineConfig::for_year(2023);
        config.momentum_positive_threshold = f64::NAN;
        let err = config.validate().expect_err("NaN threshold must fail");
        assert!(err.to_string().contains("momentum_positive_threshold"));
    }

    #[test]
    fn rejects_inverted_threshold_pairs() {
        let mut config = EngineConfig::for_year(2023);
        config.momentum_negative_threshold = 0.6;
        config.momentum_positive_threshold = 0.5;
        let err = config
            .validate()
            .expect_err("inverted momentum thresholds must fail");
        assert!(err.to_string().contains("momentum_negative_threshold"));

        let mut config = EngineConfig::for_year(2023);
        config.threshold_improving_low = 0.7;
        let err = config
            .validate()
            .expect_err("low above high must fail");
        assert!(err.to_string().contains("threshold_improving_low"));
    }

    #[test]
    fn rejects_degenerate_coverage_and_count_settings() {
        let mut config = EngineConfig::for_year(2023);
        config.coverage_conditional = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::for_year(2023);
        config.coverage_strong = 2;
        let err = config
            .validate()
            .expect_err("strong below conditional must fail");
        assert!(err.to_string().contains("coverage_strong"));

        let mut config = EngineConfig::for_year(2023);
        config.threshold_improving_min_layers = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::for_year(2023);
        config.threshold_at_risk_count = 0;
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_serde_round_trip() {
        let config = EngineConfig::for_year(2023);
        let encoded = serde_json::to_string(&config).expect("config should serialize");
        let decoded: EngineConfig =
            serde_json::from_str(&encoded).expect("config should deserialize");
        assert_eq!(decoded, config);
    }
}
