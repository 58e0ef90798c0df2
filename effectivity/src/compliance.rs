//! Policy compliance evaluation.
//!
//! The check is two-tier: the stated coverage end is the primary date, and
//! only when it falls short does a cushion's separately stored real
//! expiration get a say. Collapsing the two into one "effective date"
//! changes observable pass/fail outcomes, so the branches stay distinct.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Policy;

/// Why a policy failed its compliance check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum ComplianceFailure {
    /// Coverage lapsed before the reference date.
    Expired {
        coverage_end: NaiveDate,
        reference_date: NaiveDate,
    },
    /// Coverage runs out before the required end date and no cushion
    /// bridges the gap.
    CoverageShortfall {
        coverage_end: NaiveDate,
        required_end: NaiveDate,
    },
}

impl std::fmt::Display for ComplianceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceFailure::Expired {
                coverage_end,
                reference_date,
            } => write!(
                f,
                "policy expired {coverage_end}, before reference date {reference_date}"
            ),
            ComplianceFailure::CoverageShortfall {
                coverage_end,
                required_end,
            } => write!(
                f,
                "coverage ends {coverage_end}, short of required end {required_end}"
            ),
        }
    }
}

/// Outcome of a compliance check. A typed business result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Compliance {
    Pass,
    Fail(ComplianceFailure),
}

impl Compliance {
    pub fn is_pass(&self) -> bool {
        matches!(self, Compliance::Pass)
    }
}

/// Evaluate `policy` against a required end date at `reference_date`.
///
/// Pass requires the stated coverage end to reach the reference date, and
/// then either reach the required end date or, failing that, a cushion
/// whose real expiration covers it.
pub fn evaluate_policy(
    policy: &Policy,
    required_end_date: Option<NaiveDate>,
    reference_date: NaiveDate,
) -> Compliance {
    let coverage_end = policy.coverage_end;

    if coverage_end < reference_date {
        return Compliance::Fail(ComplianceFailure::Expired {
            coverage_end,
            reference_date,
        });
    }

    let Some(required_end) = required_end_date else {
        return Compliance::Pass;
    };

    if coverage_end >= required_end {
        return Compliance::Pass;
    }

    if policy.has_cushion {
        if let Some(real_expiration) = policy.real_expiration {
            if real_expiration >= required_end {
                return Compliance::Pass;
            }
        }
    }

    Compliance::Fail(ComplianceFailure::CoverageShortfall {
        coverage_end,
        required_end,
    })
}

/// True when a contract renewal pushed the contract end past a cushioned
/// policy's real expiration, so the policy must be re-issued.
pub fn needs_renewal_for(policy: &Policy, new_contract_end: NaiveDate) -> bool {
    if !policy.has_cushion {
        return false;
    }
    match policy.real_expiration {
        Some(real_expiration) => new_contract_end > real_expiration,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentOrigin, PolicyType};
    use rust_decimal::Decimal;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn policy(coverage_end: NaiveDate) -> Policy {
        Policy {
            id: "p-1".to_string(),
            contract_id: "c-1".to_string(),
            policy_type: PolicyType::CivilLiability,
            number: "POL-0001".to_string(),
            insured_value: Decimal::from(200_000),
            coverage_start: Some(d(2024, 1, 1)),
            coverage_end,
            has_cushion: false,
            cushion_months: None,
            real_expiration: None,
            origin: DocumentOrigin::Contract,
            insurer: None,
            file_url: None,
        }
    }

    #[test]
    fn test_cushion_bridges_coverage_shortfall() {
        let mut cushioned = policy(d(2024, 6, 30));
        cushioned.has_cushion = true;
        cushioned.cushion_months = Some(7);
        cushioned.real_expiration = Some(d(2025, 1, 15));

        let result = evaluate_policy(&cushioned, Some(d(2024, 12, 31)), d(2024, 3, 1));
        assert!(result.is_pass());

        // Same dates without the cushion: fail.
        let bare = policy(d(2024, 6, 30));
        let result = evaluate_policy(&bare, Some(d(2024, 12, 31)), d(2024, 3, 1));
        assert_eq!(
            result,
            Compliance::Fail(ComplianceFailure::CoverageShortfall {
                coverage_end: d(2024, 6, 30),
                required_end: d(2024, 12, 31),
            })
        );
    }

    #[test]
    fn test_expired_policy_fails_regardless_of_cushion() {
        let mut expired = policy(d(2024, 2, 1));
        expired.has_cushion = true;
        expired.real_expiration = Some(d(2026, 1, 1));

        // The cushion never rescues an already-expired coverage end.
        let result = evaluate_policy(&expired, Some(d(2024, 12, 31)), d(2024, 6, 1));
        assert_eq!(
            result,
            Compliance::Fail(ComplianceFailure::Expired {
                coverage_end: d(2024, 2, 1),
                reference_date: d(2024, 6, 1),
            })
        );
    }

    #[test]
    fn test_no_required_end_passes_on_validity_alone() {
        let result = evaluate_policy(&policy(d(2024, 6, 30)), None, d(2024, 3, 1));
        assert!(result.is_pass());
    }

    #[test]
    fn test_coverage_reaching_required_end_passes() {
        let result = evaluate_policy(&policy(d(2025, 1, 31)), Some(d(2024, 12, 31)), d(2024, 6, 1));
        assert!(result.is_pass());
    }

    #[test]
    fn test_needs_renewal_after_contract_extension() {
        let mut cushioned = policy(d(2025, 6, 30));
        cushioned.has_cushion = true;
        cushioned.real_expiration = Some(d(2024, 12, 31));

        assert!(needs_renewal_for(&cushioned, d(2025, 12, 31)));
        assert!(!needs_renewal_for(&cushioned, d(2024, 10, 31)));
        assert!(!needs_renewal_for(&policy(d(2025, 6, 30)), d(2026, 1, 1)));
    }
}
