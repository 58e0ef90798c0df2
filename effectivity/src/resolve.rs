//! The as-of field resolver.
//!
//! Given a contract, its ordered document history, a field key, and a
//! reference date, finds the document that last set that field and the value
//! it set. Falls back to the contract baseline when no approved document
//! carries a meaningful value; absence of overrides is normal control flow
//! here, never an error.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::{FieldKey, FieldValue};
use crate::types::{ApprovalState, Contract, DocumentRef, EventDocument};

/// Outcome of a single field resolution.
///
/// `source = None` means the value came from the contract baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub value: Option<FieldValue>,
    pub source: Option<DocumentRef>,
}

impl Resolution {
    pub fn baseline(value: Option<FieldValue>) -> Self {
        Self {
            value,
            source: None,
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.source.is_none()
    }
}

/// Approval timestamp used for ordering; documents without one sort as most
/// recent among documents sharing an effective-from date.
fn approval_rank(doc: &EventDocument) -> DateTime<Utc> {
    doc.approved_at().unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Approved documents eligible at `reference_date`, ordered most recent
/// first: descending by effective-from, then approval time, then version.
pub fn candidate_documents<'a>(
    documents: &'a [EventDocument],
    reference_date: NaiveDate,
    allow_future: bool,
) -> Vec<&'a EventDocument> {
    let mut candidates: Vec<&EventDocument> = documents
        .iter()
        .filter(|doc| doc.state() == ApprovalState::Approved)
        .filter(|doc| allow_future || doc.effective_from() <= reference_date)
        .collect();

    candidates.sort_by(|a, b| {
        (b.effective_from(), approval_rank(b), b.version()).cmp(&(
            a.effective_from(),
            approval_rank(a),
            a.version(),
        ))
    });

    candidates
}

fn resolve_inner(
    contract: &Contract,
    documents: &[EventDocument],
    key: FieldKey,
    reference_date: NaiveDate,
    allow_future: bool,
    strict_validity: bool,
) -> Resolution {
    for doc in candidate_documents(documents, reference_date, allow_future) {
        if strict_validity && !doc.is_current_at(reference_date) {
            continue;
        }
        // Policy field groups only apply when the document opts in.
        if key.is_policy_field() && !doc.modifies_policies() {
            continue;
        }
        if let Some(value) = key.overlay_value(doc.overlay()) {
            if value.is_meaningful() {
                return Resolution {
                    value: Some(value),
                    source: Some(DocumentRef::of(doc)),
                };
            }
        }
    }

    Resolution::baseline(key.baseline_value(contract))
}

/// Resolve a field at `reference_date` without enforcing the winning
/// document's upper validity bound: answers "who last touched this field",
/// even if that document's window has since lapsed. Used for renewal
/// prior-end-date lookups and audit attribution.
pub fn resolve_field(
    contract: &Contract,
    documents: &[EventDocument],
    key: FieldKey,
    reference_date: NaiveDate,
    allow_future: bool,
) -> Resolution {
    resolve_inner(contract, documents, key, reference_date, allow_future, false)
}

/// Strict variant: the winning document's validity window must actually
/// contain `reference_date`. Used when building "what is true today" views:
/// a document that modified the field but whose window has expired is
/// excluded, letting an earlier document or the baseline win.
pub fn resolve_field_as_of(
    contract: &Contract,
    documents: &[EventDocument],
    key: FieldKey,
    reference_date: NaiveDate,
    allow_future: bool,
) -> Resolution {
    resolve_inner(contract, documents, key, reference_date, allow_future, true)
}

/// The single document currently effective at `reference_date`, if any.
/// Amendments take priority over renewals when both claim the date, matching
/// the historical screens.
pub fn current_document<'a>(
    documents: &'a [EventDocument],
    reference_date: NaiveDate,
) -> Option<&'a EventDocument> {
    let current: Vec<&EventDocument> = candidate_documents(documents, reference_date, false)
        .into_iter()
        .filter(|doc| doc.is_current_at(reference_date))
        .collect();

    current
        .iter()
        .find(|doc| matches!(doc, EventDocument::Amendment(_)))
        .copied()
        .or_else(|| current.first().copied())
}

/// The contract's end date in force at `reference_date`, with the override
/// precedence ladder: the single currently-effective document (amendment
/// priority) answers first, its own `effective_to` outranking its end-date
/// override; a currently-effective renewal without an upper bound yields its
/// recorded new end date. Then the chain-resolved end-date field, then the
/// contract baseline.
pub fn current_end_date(
    contract: &Contract,
    documents: &[EventDocument],
    reference_date: NaiveDate,
) -> Option<(NaiveDate, Option<DocumentRef>)> {
    if let Some(doc) = current_document(documents, reference_date) {
        if let Some(until) = doc.effective_to() {
            return Some((until, Some(DocumentRef::of(doc))));
        }
        if let EventDocument::Renewal(renewal) = doc {
            return Some((renewal.new_end_date, Some(DocumentRef::of(doc))));
        }
        if let Some(end) = FieldKey::EndDate
            .overlay_value(doc.overlay())
            .and_then(|v| v.as_date())
        {
            return Some((end, Some(DocumentRef::of(doc))));
        }
    }

    let chained = resolve_field_as_of(contract, documents, FieldKey::EndDate, reference_date, false);
    if let Some(end) = chained.value.as_ref().and_then(|v| v.as_date()) {
        return Some((end, chained.source));
    }

    contract.baseline_end_date().map(|end| (end, None))
}
