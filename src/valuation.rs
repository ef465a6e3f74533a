//! Trade-in valuation
//!
//! Estimates what a vehicle offered in exchange is worth, using the admin-maintained
//! rule for its engine-capacity bracket.

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use validator::Validate;

use crate::listing::ExchangeStatus;

/// Residual value never drops below this share of the bracket base price.
const MIN_RESIDUAL_RATIO: f64 = 0.10;

/// Valuations are quoted in steps of this many currency units.
const ROUNDING_STEP: f64 = 100.0;

/// Engine-capacity bracket a valuation rule is keyed by
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "engine_bracket")]
pub enum EngineBracket {
    #[serde(rename = "below-125")]
    #[sqlx(rename = "below-125")]
    Below125,
    #[serde(rename = "125-200")]
    #[sqlx(rename = "125-200")]
    From125To200,
    #[serde(rename = "200-400")]
    #[sqlx(rename = "200-400")]
    From200To400,
    #[serde(rename = "above-400")]
    #[sqlx(rename = "above-400")]
    Above400,
}

impl EngineBracket {
    pub const ALL: [EngineBracket; 4] = [
        EngineBracket::Below125,
        EngineBracket::From125To200,
        EngineBracket::From200To400,
        EngineBracket::Above400,
    ];

    /// Bucket an engine capacity (cc). NaN and negative capacities count as 0.
    pub fn for_capacity(engine_capacity: f64) -> Self {
        let cc = if engine_capacity.is_nan() || engine_capacity < 0.0 {
            0.0
        } else {
            engine_capacity
        };

        if cc < 125.0 {
            EngineBracket::Below125
        } else if cc <= 200.0 {
            EngineBracket::From125To200
        } else if cc <= 400.0 {
            EngineBracket::From200To400
        } else {
            EngineBracket::Above400
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineBracket::Below125 => "below-125",
            EngineBracket::From125To200 => "125-200",
            EngineBracket::From200To400 => "200-400",
            EngineBracket::Above400 => "above-400",
        }
    }
}

impl std::str::FromStr for EngineBracket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EngineBracket::ALL
            .into_iter()
            .find(|bracket| bracket.as_str() == s)
            .ok_or_else(|| format!("unknown engine bracket: {s}"))
    }
}

impl std::fmt::Display for EngineBracket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition of a trade-in vehicle as reported by the counterparty
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeCondition {
    Excellent,
    Good,
    Average,
    Poor,
    #[default]
    #[serde(other)]
    Other,
}

/// Depreciation rule for one engine bracket
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRule {
    pub bracket: EngineBracket,
    pub base_price: i64,
    /// Depreciation % for "Excellent"
    pub condition_a: f64,
    /// Depreciation % for "Good"
    pub condition_b: f64,
    /// Depreciation % for everything else
    pub condition_c: f64,
    pub yearly_depreciation: f64,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a valuation
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub value: i64,
    pub status: ExchangeStatus,
}

impl Valuation {
    fn pending() -> Self {
        Self {
            value: 0,
            status: ExchangeStatus::Pending,
        }
    }
}

/// Admin update of a bracket's rule
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpsertValuationRuleRequest {
    #[validate(range(min = 1))]
    pub base_price: i64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub condition_a: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub condition_b: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub condition_c: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub yearly_depreciation: f64,
}

impl UpsertValuationRuleRequest {
    pub fn into_rule(self, bracket: EngineBracket) -> ValuationRule {
        ValuationRule {
            bracket,
            base_price: self.base_price,
            condition_a: self.condition_a,
            condition_b: self.condition_b,
            condition_c: self.condition_c,
            yearly_depreciation: self.yearly_depreciation,
            updated_at: Utc::now(),
        }
    }
}

/// Trade-in quote without a listing
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EstimateValuationRequest {
    #[validate(range(min = 0.0))]
    pub engine_capacity: f64,
    #[validate(range(min = 1900, max = 2100))]
    pub year: i32,
    #[serde(default)]
    pub condition: ExchangeCondition,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValuationEstimate {
    pub bracket: EngineBracket,
    pub value: i64,
    pub status: ExchangeStatus,
}

/// Estimate the trade-in value of a vehicle.
///
/// `rule` is the rule configured for the vehicle's bracket, if any. A missing rule, a
/// rule for another bracket, or a non-positive base price means no valuation is
/// possible and the result is `Pending` with value 0.
pub fn valuate(
    engine_capacity: f64,
    model_year: i32,
    condition: ExchangeCondition,
    rule: Option<&ValuationRule>,
    current_year: i32,
) -> Valuation {
    let bracket = EngineBracket::for_capacity(engine_capacity);
    let Some(rule) = rule.filter(|rule| rule.bracket == bracket) else {
        return Valuation::pending();
    };
    if rule.base_price <= 0 {
        return Valuation::pending();
    }

    let base_price = rule.base_price as f64;
    let age = current_year.saturating_sub(model_year).max(0) as f64;
    let condition_pct = percentage(match condition {
        ExchangeCondition::Excellent => rule.condition_a,
        ExchangeCondition::Good => rule.condition_b,
        _ => rule.condition_c,
    });

    let depreciation = age * percentage(rule.yearly_depreciation) / 100.0 + condition_pct / 100.0;
    let raw_value = base_price * (1.0 - depreciation);
    let floor = base_price * MIN_RESIDUAL_RATIO;

    let value = round_to_step(raw_value.max(floor), floor);
    Valuation {
        value,
        status: if value > 0 {
            ExchangeStatus::Valuated
        } else {
            ExchangeStatus::Pending
        },
    }
}

fn percentage(pct: f64) -> f64 {
    if pct.is_finite() && pct > 0.0 {
        pct
    } else {
        0.0
    }
}

// Nearest step, but never below the residual floor.
fn round_to_step(value: f64, floor: f64) -> i64 {
    let rounded = (value / ROUNDING_STEP).round() * ROUNDING_STEP;
    let rounded = if rounded < floor {
        (floor / ROUNDING_STEP).ceil() * ROUNDING_STEP
    } else {
        rounded
    };
    rounded as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(bracket: EngineBracket, base_price: i64) -> ValuationRule {
        ValuationRule {
            bracket,
            base_price,
            condition_a: 5.0,
            condition_b: 10.0,
            condition_c: 20.0,
            yearly_depreciation: 8.0,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_bracket_boundaries() {
        assert_eq!(EngineBracket::for_capacity(0.0), EngineBracket::Below125);
        assert_eq!(EngineBracket::for_capacity(124.9), EngineBracket::Below125);
        assert_eq!(EngineBracket::for_capacity(125.0), EngineBracket::From125To200);
        assert_eq!(EngineBracket::for_capacity(200.0), EngineBracket::From125To200);
        assert_eq!(EngineBracket::for_capacity(200.5), EngineBracket::From200To400);
        assert_eq!(EngineBracket::for_capacity(400.0), EngineBracket::From200To400);
        assert_eq!(EngineBracket::for_capacity(400.1), EngineBracket::Above400);
        assert_eq!(EngineBracket::for_capacity(f64::INFINITY), EngineBracket::Above400);
    }

    #[test]
    fn test_bracket_normalizes_bad_capacity() {
        assert_eq!(EngineBracket::for_capacity(f64::NAN), EngineBracket::Below125);
        assert_eq!(EngineBracket::for_capacity(-50.0), EngineBracket::Below125);
    }

    #[test]
    fn test_bracket_assignment_is_total() {
        let mut cc = 0.0;
        while cc < 1200.0 {
            let bracket = EngineBracket::for_capacity(cc);
            let matches = EngineBracket::ALL.iter().filter(|b| **b == bracket).count();
            assert_eq!(matches, 1);
            cc += 0.5;
        }
    }

    #[test]
    fn test_bracket_parse() {
        assert_eq!("125-200".parse::<EngineBracket>(), Ok(EngineBracket::From125To200));
        assert!("150cc".parse::<EngineBracket>().is_err());
    }

    #[test]
    fn test_valuate_without_rule_is_pending() {
        let valuation = valuate(150.0, 2020, ExchangeCondition::Good, None, 2024);
        assert_eq!(valuation.value, 0);
        assert_eq!(valuation.status, ExchangeStatus::Pending);
    }

    #[test]
    fn test_valuate_applies_age_and_condition() {
        let rule = rule(EngineBracket::From125To200, 100_000);
        // 2 years * 8% + 10% = 26% off
        let valuation = valuate(150.0, 2022, ExchangeCondition::Good, Some(&rule), 2024);
        assert_eq!(valuation.value, 74_000);
        assert_eq!(valuation.status, ExchangeStatus::Valuated);

        let excellent = valuate(150.0, 2022, ExchangeCondition::Excellent, Some(&rule), 2024);
        assert_eq!(excellent.value, 79_000);

        let poor = valuate(150.0, 2022, ExchangeCondition::Poor, Some(&rule), 2024);
        let other = valuate(150.0, 2022, ExchangeCondition::Other, Some(&rule), 2024);
        assert_eq!(poor.value, 64_000);
        assert_eq!(poor, other);
    }

    #[test]
    fn test_valuate_future_model_year_has_no_age() {
        let rule = rule(EngineBracket::Below125, 50_000);
        let valuation = valuate(110.0, 2030, ExchangeCondition::Excellent, Some(&rule), 2024);
        assert_eq!(valuation.value, 47_500);
    }

    #[test]
    fn test_valuate_floors_at_ten_percent() {
        let rule = rule(EngineBracket::Above400, 300_000);
        let valuation = valuate(650.0, 1990, ExchangeCondition::Poor, Some(&rule), 2024);
        assert_eq!(valuation.value, 30_000);
        assert_eq!(valuation.status, ExchangeStatus::Valuated);
    }

    #[test]
    fn test_valuate_rounds_up_when_floor_is_not_a_step() {
        let rule = rule(EngineBracket::Below125, 1_050);
        let valuation = valuate(100.0, 1990, ExchangeCondition::Poor, Some(&rule), 2024);
        assert_eq!(valuation.value, 200);
    }

    #[test]
    fn test_valuate_floor_and_step_hold_across_inputs() {
        for base_price in [1_234, 45_678, 99_999, 250_000] {
            let rule = rule(EngineBracket::From200To400, base_price);
            for model_year in 1980..=2026 {
                for condition in [
                    ExchangeCondition::Excellent,
                    ExchangeCondition::Good,
                    ExchangeCondition::Average,
                ] {
                    let valuation = valuate(250.0, model_year, condition, Some(&rule), 2024);
                    assert!(valuation.value as f64 >= base_price as f64 * MIN_RESIDUAL_RATIO);
                    assert_eq!(valuation.value % 100, 0);
                }
            }
        }
    }

    #[test]
    fn test_valuate_ignores_nan_percentages() {
        let mut rule = rule(EngineBracket::From125To200, 80_000);
        rule.yearly_depreciation = f64::NAN;
        rule.condition_b = -15.0;
        let valuation = valuate(180.0, 2015, ExchangeCondition::Good, Some(&rule), 2024);
        assert_eq!(valuation.value, 80_000);
    }

    #[test]
    fn test_valuate_rejects_rule_for_other_bracket() {
        let rule = rule(EngineBracket::Above400, 300_000);
        let valuation = valuate(150.0, 2020, ExchangeCondition::Good, Some(&rule), 2024);
        assert_eq!(valuation.status, ExchangeStatus::Pending);
    }

    #[test]
    fn test_valuate_non_positive_base_is_pending() {
        let rule = rule(EngineBracket::Below125, 0);
        let valuation = valuate(100.0, 2020, ExchangeCondition::Good, Some(&rule), 2024);
        assert_eq!(valuation.status, ExchangeStatus::Pending);
        assert_eq!(valuation.value, 0);
    }

    #[test]
    fn test_exchange_condition_unknown_deserializes_to_other() {
        let condition: ExchangeCondition = serde_json::from_str("\"Like new\"").unwrap();
        assert_eq!(condition, ExchangeCondition::Other);
    }
}
