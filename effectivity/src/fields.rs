//! Sparse field overlays and the field-key dispatch table.
//!
//! Every contract field an amendment or renewal may override is an explicit
//! [`Overlay`], `Set(value)` or `Unset`, instead of a nullable column.
//! [`FieldKey`] names each resolvable field and knows how to read it out of
//! an overlay and out of the contract baseline, so the resolver works over
//! one closed set of keys instead of stringly-typed attribute lookups.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    AdjustmentPeriod, Contract, IndexBasis, PaymentModality, PolicyType, SubLimit,
};

/// A sparse override slot: either explicitly set by the document, or unset
/// meaning "not modified by this document".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overlay<T> {
    Set(T),
    #[default]
    Unset,
}

impl<T> Overlay<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Overlay::Set(_))
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Overlay::Set(v) => Some(v),
            Overlay::Unset => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Overlay::Set(v) => Some(v),
            Overlay::Unset => None,
        }
    }
}

impl<T> From<Option<T>> for Overlay<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Overlay::Set(v),
            None => Overlay::Unset,
        }
    }
}

/// Per-type policy overrides carried by an amendment or renewal.
///
/// Consulted only when the owning document's `modifies_policies` flag is on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyOverlay {
    pub required: Overlay<bool>,
    pub insured_value: Overlay<Decimal>,
    pub coverage_months: Overlay<u32>,
    pub coverage_start: Overlay<NaiveDate>,
    pub coverage_end: Overlay<NaiveDate>,
    pub label: Overlay<String>,
    /// Sparse sub-coverage overrides; an absent key means unset.
    pub sub_limits: BTreeMap<SubLimit, Decimal>,
}

/// The full sparse overlay an amendment or renewal may carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOverlay {
    pub canon: Overlay<Decimal>,
    pub payment_modality: Overlay<PaymentModality>,
    pub min_guaranteed_canon: Overlay<Decimal>,
    pub sales_percent: Overlay<Decimal>,
    pub end_date: Overlay<NaiveDate>,
    pub term_months: Overlay<u32>,
    pub index_basis: Overlay<IndexBasis>,
    pub index_extra_points: Overlay<Decimal>,
    pub index_period: Overlay<AdjustmentPeriod>,
    pub index_anchor: Overlay<NaiveDate>,
    /// Per-type policy override groups.
    pub policies: BTreeMap<PolicyType, PolicyOverlay>,
}

impl FieldOverlay {
    pub fn policy(&self, policy_type: PolicyType) -> Option<&PolicyOverlay> {
        self.policies.get(&policy_type)
    }
}

/// A resolved field value, tagged with enough type information for the
/// "meaningful value" test the legacy data demands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Currency amount. Zero counts as unset.
    Money(Decimal),
    /// Percentage. Zero counts as unset.
    Percent(Decimal),
    Integer(u32),
    Date(NaiveDate),
    Text(String),
    Flag(bool),
    Modality(PaymentModality),
    Basis(IndexBasis),
    Period(AdjustmentPeriod),
}

impl FieldValue {
    /// The documented set-value test: money and percentage zeros are
    /// indistinguishable from unset, and blank text does not count.
    /// Booleans, dates, and enums are meaningful whenever present.
    pub fn is_meaningful(&self) -> bool {
        match self {
            FieldValue::Money(v) | FieldValue::Percent(v) => !v.is_zero(),
            FieldValue::Text(s) => !s.trim().is_empty(),
            _ => true,
        }
    }

    pub fn as_money(&self) -> Option<Decimal> {
        match self {
            FieldValue::Money(v) | FieldValue::Percent(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<u32> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Every field the resolver can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Canon,
    PaymentModality,
    MinGuaranteedCanon,
    SalesPercent,
    EndDate,
    TermMonths,
    IndexBasis,
    IndexExtraPoints,
    IndexPeriod,
    IndexAnchor,
    PolicyRequired(PolicyType),
    PolicyInsuredValue(PolicyType),
    PolicyCoverageMonths(PolicyType),
    PolicyCoverageStart(PolicyType),
    PolicyCoverageEnd(PolicyType),
    PolicyLabel(PolicyType),
    PolicySubLimit(PolicyType, SubLimit),
}

impl FieldKey {
    /// True for the per-policy-type keys, which are gated by the owning
    /// document's `modifies_policies` flag.
    pub fn is_policy_field(&self) -> bool {
        matches!(
            self,
            FieldKey::PolicyRequired(_)
                | FieldKey::PolicyInsuredValue(_)
                | FieldKey::PolicyCoverageMonths(_)
                | FieldKey::PolicyCoverageStart(_)
                | FieldKey::PolicyCoverageEnd(_)
                | FieldKey::PolicyLabel(_)
                | FieldKey::PolicySubLimit(_, _)
        )
    }

    /// Read this field out of a document overlay. `None` means the document
    /// does not set the field at all; meaningfulness is judged separately.
    pub fn overlay_value(&self, overlay: &FieldOverlay) -> Option<FieldValue> {
        match *self {
            FieldKey::Canon => overlay.canon.as_option().map(|v| FieldValue::Money(*v)),
            FieldKey::PaymentModality => overlay
                .payment_modality
                .as_option()
                .map(|v| FieldValue::Modality(*v)),
            FieldKey::MinGuaranteedCanon => overlay
                .min_guaranteed_canon
                .as_option()
                .map(|v| FieldValue::Money(*v)),
            FieldKey::SalesPercent => overlay
                .sales_percent
                .as_option()
                .map(|v| FieldValue::Percent(*v)),
            FieldKey::EndDate => overlay.end_date.as_option().map(|v| FieldValue::Date(*v)),
            FieldKey::TermMonths => overlay
                .term_months
                .as_option()
                .map(|v| FieldValue::Integer(*v)),
            FieldKey::IndexBasis => overlay
                .index_basis
                .as_option()
                .map(|v| FieldValue::Basis(*v)),
            FieldKey::IndexExtraPoints => overlay
                .index_extra_points
                .as_option()
                .map(|v| FieldValue::Percent(*v)),
            FieldKey::IndexPeriod => overlay
                .index_period
                .as_option()
                .map(|v| FieldValue::Period(*v)),
            FieldKey::IndexAnchor => overlay
                .index_anchor
                .as_option()
                .map(|v| FieldValue::Date(*v)),
            FieldKey::PolicyRequired(t) => overlay
                .policy(t)
                .and_then(|p| p.required.as_option())
                .map(|v| FieldValue::Flag(*v)),
            FieldKey::PolicyInsuredValue(t) => overlay
                .policy(t)
                .and_then(|p| p.insured_value.as_option())
                .map(|v| FieldValue::Money(*v)),
            FieldKey::PolicyCoverageMonths(t) => overlay
                .policy(t)
                .and_then(|p| p.coverage_months.as_option())
                .map(|v| FieldValue::Integer(*v)),
            FieldKey::PolicyCoverageStart(t) => overlay
                .policy(t)
                .and_then(|p| p.coverage_start.as_option())
                .map(|v| FieldValue::Date(*v)),
            FieldKey::PolicyCoverageEnd(t) => overlay
                .policy(t)
                .and_then(|p| p.coverage_end.as_option())
                .map(|v| FieldValue::Date(*v)),
            FieldKey::PolicyLabel(t) => overlay
                .policy(t)
                .and_then(|p| p.label.as_option())
                .map(|v| FieldValue::Text(v.clone())),
            FieldKey::PolicySubLimit(t, limit) => overlay
                .policy(t)
                .and_then(|p| p.sub_limits.get(&limit))
                .map(|v| FieldValue::Money(*v)),
        }
    }

    /// Read the contract's own baseline value for this field.
    pub fn baseline_value(&self, contract: &Contract) -> Option<FieldValue> {
        match *self {
            FieldKey::Canon => contract.canon.map(FieldValue::Money),
            FieldKey::PaymentModality => Some(FieldValue::Modality(contract.payment_modality)),
            FieldKey::MinGuaranteedCanon => contract.min_guaranteed_canon.map(FieldValue::Money),
            FieldKey::SalesPercent => contract.sales_percent.map(FieldValue::Percent),
            FieldKey::EndDate => contract.baseline_end_date().map(FieldValue::Date),
            FieldKey::TermMonths => Some(FieldValue::Integer(contract.initial_term_months)),
            FieldKey::IndexBasis => contract.index_basis.map(FieldValue::Basis),
            FieldKey::IndexExtraPoints => contract.index_extra_points.map(FieldValue::Percent),
            FieldKey::IndexPeriod => contract.index_period.map(FieldValue::Period),
            FieldKey::IndexAnchor => contract.index_anchor.map(FieldValue::Date),
            FieldKey::PolicyRequired(t) => Some(FieldValue::Flag(
                contract.policy_terms(t).map(|p| p.required).unwrap_or(false),
            )),
            FieldKey::PolicyInsuredValue(t) => contract
                .policy_terms(t)
                .and_then(|p| p.insured_value)
                .map(FieldValue::Money),
            FieldKey::PolicyCoverageMonths(t) => contract
                .policy_terms(t)
                .and_then(|p| p.coverage_months)
                .map(FieldValue::Integer),
            FieldKey::PolicyCoverageStart(t) => contract
                .policy_terms(t)
                .and_then(|p| p.coverage_start)
                .map(FieldValue::Date),
            FieldKey::PolicyCoverageEnd(t) => contract
                .policy_terms(t)
                .and_then(|p| p.coverage_end)
                .map(FieldValue::Date),
            FieldKey::PolicyLabel(t) => contract
                .policy_terms(t)
                .and_then(|p| p.label.clone())
                .map(FieldValue::Text),
            FieldKey::PolicySubLimit(t, limit) => contract
                .policy_terms(t)
                .and_then(|p| p.sub_limits.get(&limit).copied())
                .map(FieldValue::Money),
        }
    }
}
