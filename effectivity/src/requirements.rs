//! Required-policy assembly.
//!
//! For each policy type, resolves the requirement fields through the chain
//! and attributes the requirement to the document that actually modified
//! it. The required flag itself is always resolved strictly: a document
//! whose window has lapsed cannot newly introduce a requirement, though the
//! values it set while current remain attributed to it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dates::add_months;
use crate::fields::FieldKey;
use crate::resolve::{current_end_date, resolve_field, resolve_field_as_of};
use crate::types::{Contract, DocumentRef, EventDocument, PolicyType, SubLimit};

/// One assembled policy requirement at a reference date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRequirement {
    pub policy_type: PolicyType,
    /// Display name, for the free-form `Other` type.
    pub label: Option<String>,
    pub insured_value: Option<Decimal>,
    pub coverage_months: Option<u32>,
    pub coverage_start: Option<NaiveDate>,
    pub coverage_end: Option<NaiveDate>,
    /// Sub-coverage breakdown, chain-resolved per line.
    pub sub_limits: BTreeMap<SubLimit, Decimal>,
    /// Document that modified the insured value, for audit display.
    pub source: Option<DocumentRef>,
}

/// Sub-limit lines mentioned anywhere for this type: in the contract
/// baseline or in any approved overlay.
fn sub_limit_keys(
    contract: &Contract,
    documents: &[EventDocument],
    policy_type: PolicyType,
) -> BTreeSet<SubLimit> {
    let mut keys: BTreeSet<SubLimit> = contract
        .policy_terms(policy_type)
        .map(|terms| terms.sub_limits.keys().copied().collect())
        .unwrap_or_default();

    for doc in documents {
        if let Some(overlay) = doc.overlay().policy(policy_type) {
            keys.extend(overlay.sub_limits.keys().copied());
        }
    }

    keys
}

/// Build the required-policy map for `contract` at `reference_date`.
///
/// Out of force with `allow_future = false` yields an empty map, the
/// convention of the historical screens, not an error. `allow_future = true`
/// is the policy-management screen's mode: upcoming approved documents'
/// values are visible before they take effect.
pub fn build_policy_requirements(
    contract: &Contract,
    documents: &[EventDocument],
    reference_date: NaiveDate,
    allow_future: bool,
) -> BTreeMap<PolicyType, PolicyRequirement> {
    if !allow_future {
        let before_start = reference_date < contract.start_date;
        let after_end = current_end_date(contract, documents, reference_date)
            .is_some_and(|(end, _)| reference_date > end);
        if before_start || after_end {
            return BTreeMap::new();
        }
    }

    let mut requirements = BTreeMap::new();

    for policy_type in PolicyType::all() {
        // The required flag never looks at future documents and demands a
        // currently-valid source; otherwise it falls back down the chain.
        let required = resolve_field_as_of(
            contract,
            documents,
            FieldKey::PolicyRequired(policy_type),
            reference_date,
            false,
        );
        if required.value.as_ref().and_then(|v| v.as_flag()) != Some(true) {
            continue;
        }

        let value = resolve_field(
            contract,
            documents,
            FieldKey::PolicyInsuredValue(policy_type),
            reference_date,
            allow_future,
        );
        let months = resolve_field(
            contract,
            documents,
            FieldKey::PolicyCoverageMonths(policy_type),
            reference_date,
            allow_future,
        )
        .value
        .and_then(|v| v.as_integer());
        let start = resolve_field(
            contract,
            documents,
            FieldKey::PolicyCoverageStart(policy_type),
            reference_date,
            allow_future,
        )
        .value
        .and_then(|v| v.as_date());
        let mut end = resolve_field(
            contract,
            documents,
            FieldKey::PolicyCoverageEnd(policy_type),
            reference_date,
            allow_future,
        )
        .value
        .and_then(|v| v.as_date());

        // Coverage end falls back to start plus calendar months; lacking a
        // start, months count from the contract's end date.
        if end.is_none() {
            if let (Some(start), Some(months)) = (start, months) {
                end = Some(add_months(start, months));
            } else if let (None, Some(months)) = (start, months) {
                if let Some(contract_end) = contract.baseline_end_date() {
                    end = Some(add_months(contract_end, months));
                }
            }
        }

        let label = resolve_field(
            contract,
            documents,
            FieldKey::PolicyLabel(policy_type),
            reference_date,
            allow_future,
        )
        .value
        .and_then(|v| v.as_text().map(str::to_string));

        let mut sub_limits = BTreeMap::new();
        for limit in sub_limit_keys(contract, documents, policy_type) {
            let resolved = resolve_field(
                contract,
                documents,
                FieldKey::PolicySubLimit(policy_type, limit),
                reference_date,
                allow_future,
            );
            if let Some(amount) = resolved.value.and_then(|v| v.as_money()) {
                sub_limits.insert(limit, amount);
            }
        }

        requirements.insert(
            policy_type,
            PolicyRequirement {
                policy_type,
                label,
                insured_value: value.value.as_ref().and_then(|v| v.as_money()),
                coverage_months: months,
                coverage_start: start,
                coverage_end: end,
                sub_limits,
                source: value.source,
            },
        );
    }

    requirements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldOverlay, Overlay, PolicyOverlay};
    use crate::types::{
        Amendment, ApprovalState, DateWindow, PaymentModality, PolicyTerms,
    };
    use chrono::{TimeZone, Utc};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn contract_with_liability() -> Contract {
        let mut policy_terms = BTreeMap::new();
        policy_terms.insert(
            PolicyType::CivilLiability,
            PolicyTerms {
                required: true,
                insured_value: Some(Decimal::from(200_000)),
                coverage_months: Some(12),
                coverage_start: Some(d(2023, 1, 1)),
                coverage_end: None,
                label: None,
                sub_limits: BTreeMap::from([(
                    SubLimit::ThirdPartyMedical,
                    Decimal::from(20_000),
                )]),
            },
        );
        Contract {
            id: "c-1".to_string(),
            number: "CT-2023-001".to_string(),
            start_date: d(2023, 1, 1),
            initial_term_months: 24,
            initial_end_date: Some(d(2024, 12, 31)),
            updated_end_date: None,
            payment_modality: PaymentModality::Fixed,
            canon: Some(Decimal::from(1_000)),
            min_guaranteed_canon: None,
            sales_percent: None,
            index_basis: None,
            index_extra_points: None,
            index_period: None,
            index_anchor: None,
            auto_renew: false,
            renewal_count: 0,
            last_renewed_on: None,
            policy_terms,
            indexations: Vec::new(),
        }
    }

    fn policy_amendment(
        id: &str,
        sequence: u32,
        window: DateWindow,
        policy_type: PolicyType,
        overlay: PolicyOverlay,
    ) -> EventDocument {
        let mut field_overlay = FieldOverlay::default();
        field_overlay.policies.insert(policy_type, overlay);
        EventDocument::Amendment(Amendment {
            id: id.to_string(),
            contract_id: "c-1".to_string(),
            sequence,
            window,
            state: ApprovalState::Approved,
            approved_at: Some(Utc.with_ymd_and_hms(2023, 11, 1, 9, 0, 0).unwrap()),
            version: 1,
            modifies_policies: true,
            overlay: field_overlay,
        })
    }

    #[test]
    fn test_out_of_force_yields_empty_map() {
        let contract = contract_with_liability();
        let requirements = build_policy_requirements(&contract, &[], d(2022, 6, 1), false);
        assert!(requirements.is_empty());
    }

    #[test]
    fn test_out_of_force_with_allow_future_yields_requirements() {
        let contract = contract_with_liability();
        let requirements = build_policy_requirements(&contract, &[], d(2022, 6, 1), true);
        assert!(requirements.contains_key(&PolicyType::CivilLiability));
    }

    #[test]
    fn test_baseline_requirement_with_computed_end() {
        let contract = contract_with_liability();
        let requirements = build_policy_requirements(&contract, &[], d(2023, 6, 1), false);

        let liability = &requirements[&PolicyType::CivilLiability];
        assert_eq!(liability.insured_value, Some(Decimal::from(200_000)));
        // start + 12 calendar months, not 360 days
        assert_eq!(liability.coverage_end, Some(d(2024, 1, 1)));
        assert_eq!(
            liability.sub_limits[&SubLimit::ThirdPartyMedical],
            Decimal::from(20_000)
        );
        assert!(liability.source.is_none());
    }

    #[test]
    fn test_amendment_raises_insured_value_and_is_attributed() {
        let contract = contract_with_liability();
        let docs = vec![policy_amendment(
            "a-1",
            1,
            DateWindow::open(d(2024, 1, 1)),
            PolicyType::CivilLiability,
            PolicyOverlay {
                insured_value: Overlay::Set(Decimal::from(350_000)),
                ..Default::default()
            },
        )];

        let requirements = build_policy_requirements(&contract, &docs, d(2024, 6, 1), false);
        let liability = &requirements[&PolicyType::CivilLiability];

        assert_eq!(liability.insured_value, Some(Decimal::from(350_000)));
        assert_eq!(liability.source.as_ref().unwrap().label, "Amendment OS-1");
    }

    #[test]
    fn test_lapsed_document_cannot_introduce_requirement() {
        // Compliance is not required by the baseline; a lapsed amendment
        // turned it on, but its window has expired.
        let contract = contract_with_liability();
        let docs = vec![policy_amendment(
            "a-1",
            1,
            DateWindow::new(d(2023, 3, 1), Some(d(2023, 8, 31))),
            PolicyType::Compliance,
            PolicyOverlay {
                required: Overlay::Set(true),
                insured_value: Overlay::Set(Decimal::from(80_000)),
                ..Default::default()
            },
        )];

        let during = build_policy_requirements(&contract, &docs, d(2023, 6, 1), false);
        assert!(during.contains_key(&PolicyType::Compliance));

        let after = build_policy_requirements(&contract, &docs, d(2023, 10, 1), false);
        assert!(!after.contains_key(&PolicyType::Compliance));
    }

    #[test]
    fn test_policy_overlay_ignored_without_modifies_flag() {
        let contract = contract_with_liability();
        let mut doc = policy_amendment(
            "a-1",
            1,
            DateWindow::open(d(2024, 1, 1)),
            PolicyType::CivilLiability,
            PolicyOverlay {
                insured_value: Overlay::Set(Decimal::from(999_999)),
                ..Default::default()
            },
        );
        if let EventDocument::Amendment(a) = &mut doc {
            a.modifies_policies = false;
        }

        let requirements = build_policy_requirements(&contract, &[doc], d(2024, 6, 1), false);
        let liability = &requirements[&PolicyType::CivilLiability];
        assert_eq!(liability.insured_value, Some(Decimal::from(200_000)));
    }

    #[test]
    fn test_zero_insured_value_falls_back_to_baseline() {
        let contract = contract_with_liability();
        let docs = vec![policy_amendment(
            "a-1",
            1,
            DateWindow::open(d(2024, 1, 1)),
            PolicyType::CivilLiability,
            PolicyOverlay {
                insured_value: Overlay::Set(Decimal::ZERO),
                ..Default::default()
            },
        )];

        let requirements = build_policy_requirements(&contract, &docs, d(2024, 6, 1), false);
        let liability = &requirements[&PolicyType::CivilLiability];
        assert_eq!(liability.insured_value, Some(Decimal::from(200_000)));
        assert!(liability.source.is_none());
    }
}
