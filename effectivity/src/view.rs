//! The consolidated "effective view" of a contract at a reference date.
//!
//! Wraps the field resolver to answer, per economic field, what value is in
//! force, which document set it, and whether that document actually changed
//! it; a document that merely re-states the prior value is not flagged as a
//! modification. Applied index adjustments are layered on top of the
//! resolved canon unless a later-approved document superseded them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dates::day_before;
use crate::fields::{FieldKey, FieldValue};
use crate::resolve::{current_document, current_end_date, resolve_field_as_of};
use crate::types::{
    AdjustmentPeriod, Contract, DocumentRef, EventDocument, IndexBasis, IndexationEvent,
    PaymentModality,
};

/// Why a reference date falls outside the contract's force period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum OutOfForceReason {
    /// The date precedes the contract start.
    BeforeStart { starts: NaiveDate },
    /// The date follows the resolved end date.
    AfterEnd { ended: NaiveDate },
}

impl std::fmt::Display for OutOfForceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutOfForceReason::BeforeStart { starts } => {
                write!(f, "reference date is before the contract start ({starts})")
            }
            OutOfForceReason::AfterEnd { ended } => {
                write!(f, "reference date is after the contract end ({ended})")
            }
        }
    }
}

/// One resolved field: its value, the document that set it (None =
/// baseline), and whether that document changed the previously-in-force
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedField<T> {
    pub value: Option<T>,
    pub source: Option<DocumentRef>,
    pub modified: bool,
}

/// An index adjustment applied on top of the resolved canon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedIndexation {
    pub event_id: String,
    pub basis: IndexBasis,
    pub applied_on: NaiveDate,
    /// Canon before the adjustment was layered on.
    pub canon_before: Option<Decimal>,
}

/// The full effective view of a contract's economic terms at a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveTerms {
    pub reference_date: NaiveDate,
    /// Document currently effective at the date, if any.
    pub current_document: Option<DocumentRef>,
    pub canon: ResolvedField<Decimal>,
    pub payment_modality: ResolvedField<PaymentModality>,
    pub min_guaranteed_canon: ResolvedField<Decimal>,
    pub sales_percent: ResolvedField<Decimal>,
    pub end_date: ResolvedField<NaiveDate>,
    pub term_months: ResolvedField<u32>,
    pub index_basis: ResolvedField<IndexBasis>,
    pub index_extra_points: ResolvedField<Decimal>,
    pub index_period: ResolvedField<AdjustmentPeriod>,
    pub index_anchor: ResolvedField<NaiveDate>,
    /// The indexation event layered onto the canon, when one applied.
    pub indexation: Option<AppliedIndexation>,
}

impl EffectiveTerms {
    /// True when any field was modified by a document.
    pub fn has_modifications(&self) -> bool {
        self.canon.modified
            || self.payment_modality.modified
            || self.min_guaranteed_canon.modified
            || self.sales_percent.modified
            || self.end_date.modified
            || self.term_months.modified
            || self.index_basis.modified
            || self.index_extra_points.modified
            || self.index_period.modified
            || self.index_anchor.modified
    }
}

/// Result of an effective-view query. Callers must not proceed to
/// field-level computation on a `NotInForce` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EffectiveView {
    InForce(EffectiveTerms),
    NotInForce { reason: OutOfForceReason },
}

impl EffectiveView {
    pub fn terms(&self) -> Option<&EffectiveTerms> {
        match self {
            EffectiveView::InForce(terms) => Some(terms),
            EffectiveView::NotInForce { .. } => None,
        }
    }
}

/// Resolve one typed field with its modification flag.
///
/// The modification check probes the value in force the day before the
/// source document's window began, through the same resolver. This
/// attributes changes correctly even across chains of documents. The
/// recursion is bounded: each probe moves strictly earlier than an existing
/// document's start.
fn resolved<T: PartialEq + Clone>(
    contract: &Contract,
    documents: &[EventDocument],
    key: FieldKey,
    reference_date: NaiveDate,
    extract: fn(&FieldValue) -> Option<T>,
) -> ResolvedField<T> {
    let resolution = resolve_field_as_of(contract, documents, key, reference_date, false);
    let value = resolution.value.as_ref().and_then(extract);

    let modified = match (&resolution.source, &value) {
        (Some(source), Some(current)) => {
            let probe_date = documents
                .iter()
                .find(|doc| doc.id() == &source.id)
                .map(|doc| day_before(doc.effective_from()))
                .unwrap_or(reference_date);
            let before = resolve_field_as_of(contract, documents, key, probe_date, false);
            before.value.as_ref().and_then(extract).as_ref() != Some(current)
        }
        _ => false,
    };

    ResolvedField {
        value,
        source: resolution.source,
        modified,
    }
}

/// Latest applied indexation event at or before `reference_date`.
fn latest_indexation(contract: &Contract, reference_date: NaiveDate) -> Option<&IndexationEvent> {
    contract
        .indexations
        .iter()
        .filter(|event| event.applied_on <= reference_date)
        .max_by_key(|event| (event.applied_on, event.computed_at))
}

/// Build the effective view of `contract` at `reference_date`.
pub fn effective_view(
    contract: &Contract,
    documents: &[EventDocument],
    reference_date: NaiveDate,
) -> EffectiveView {
    if reference_date < contract.start_date {
        return EffectiveView::NotInForce {
            reason: OutOfForceReason::BeforeStart {
                starts: contract.start_date,
            },
        };
    }

    let end = current_end_date(contract, documents, reference_date);
    if let Some((ended, _)) = end {
        if reference_date > ended {
            return EffectiveView::NotInForce {
                reason: OutOfForceReason::AfterEnd { ended },
            };
        }
    }

    let mut canon = resolved(
        contract,
        documents,
        FieldKey::Canon,
        reference_date,
        FieldValue::as_money,
    );

    // End date carries its own precedence ladder; wrap it into the same
    // resolved-field shape with a day-earlier modification probe.
    let end_date = {
        let (value, source) = match end {
            Some((date, source)) => (Some(date), source),
            None => (None, None),
        };
        let modified = match (&source, value) {
            (Some(src), Some(current)) => documents
                .iter()
                .find(|doc| doc.id() == &src.id)
                .map(|doc| {
                    let probe = day_before(doc.effective_from());
                    current_end_date(contract, documents, probe).map(|(d, _)| d) != Some(current)
                })
                .unwrap_or(false),
            _ => false,
        };
        ResolvedField {
            value,
            source,
            modified,
        }
    };

    // Layer the most recent applied index adjustment on top of the resolved
    // canon, unless the document that last set the canon was approved after
    // the adjustment applied: a later amendment supersedes the indexation.
    let indexation = latest_indexation(contract, reference_date).and_then(|event| {
        let superseded = canon.source.as_ref().is_some_and(|source| {
            documents
                .iter()
                .find(|doc| doc.id() == &source.id)
                .and_then(|doc| doc.approved_at())
                .map(|approved| event.applied_on < approved.date_naive())
                .unwrap_or(false)
        });
        if superseded || event.new_canon.is_zero() {
            return None;
        }
        let applied = AppliedIndexation {
            event_id: event.id.clone(),
            basis: event.basis,
            applied_on: event.applied_on,
            canon_before: canon.value,
        };
        canon.value = Some(event.new_canon);
        Some(applied)
    });

    EffectiveView::InForce(EffectiveTerms {
        reference_date,
        current_document: current_document(documents, reference_date).map(DocumentRef::of),
        canon,
        payment_modality: resolved(
            contract,
            documents,
            FieldKey::PaymentModality,
            reference_date,
            |v| match v {
                FieldValue::Modality(m) => Some(*m),
                _ => None,
            },
        ),
        min_guaranteed_canon: resolved(
            contract,
            documents,
            FieldKey::MinGuaranteedCanon,
            reference_date,
            FieldValue::as_money,
        ),
        sales_percent: resolved(
            contract,
            documents,
            FieldKey::SalesPercent,
            reference_date,
            FieldValue::as_money,
        ),
        end_date,
        term_months: resolved(
            contract,
            documents,
            FieldKey::TermMonths,
            reference_date,
            FieldValue::as_integer,
        ),
        index_basis: resolved(
            contract,
            documents,
            FieldKey::IndexBasis,
            reference_date,
            |v| match v {
                FieldValue::Basis(b) => Some(*b),
                _ => None,
            },
        ),
        index_extra_points: resolved(
            contract,
            documents,
            FieldKey::IndexExtraPoints,
            reference_date,
            FieldValue::as_money,
        ),
        index_period: resolved(
            contract,
            documents,
            FieldKey::IndexPeriod,
            reference_date,
            |v| match v {
                FieldValue::Period(p) => Some(*p),
                _ => None,
            },
        ),
        index_anchor: resolved(
            contract,
            documents,
            FieldKey::IndexAnchor,
            reference_date,
            FieldValue::as_date,
        ),
        indexation,
    })
}
