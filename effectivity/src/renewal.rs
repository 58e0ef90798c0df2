//! Renewal planning.
//!
//! Computes the extension a renewal applies: the prior end date is found
//! through the chain even when the document that set it has since been
//! superseded for other fields, the new end date is prior end plus calendar
//! months, and the renewal's own window opens the day after the prior end.
//! Persistence and the contract-side counter update live with the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::fields::{FieldKey, FieldOverlay, Overlay, PolicyOverlay};
use crate::resolve::{current_end_date, resolve_field};
use crate::types::{
    ApprovalState, Contract, ContractId, DateWindow, DocumentId, EventDocument, PolicyType,
    Renewal,
};

/// Why a renewal could not be planned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenewalError {
    /// The contract has no baseline end date and no document ever set one.
    #[error("cannot determine prior end date for contract {contract_id}")]
    UnresolvableEndDate { contract_id: ContractId },

    /// Neither an explicit month count nor the initial term was usable.
    #[error("renewal length missing: no months given and initial term not used")]
    MissingMonths,
}

/// Inputs to a renewal.
#[derive(Debug, Clone, Default)]
pub struct RenewalOptions {
    /// Explicit extension length; ignored when `use_initial_term` is set.
    pub months: Option<u32>,
    /// Extend by the contract's initial term.
    pub use_initial_term: bool,
    /// Policy overrides to carry on the renewal document. These are stored
    /// solely on the renewal, never copied onto the contract.
    pub policy_overlay: Option<BTreeMap<PolicyType, PolicyOverlay>>,
}

/// The prior end date a renewal extends from: the current ladder first,
/// then the non-strict chain, so the last document to have set an end date
/// counts even if its window has lapsed.
fn prior_end_date(
    contract: &Contract,
    documents: &[EventDocument],
    today: NaiveDate,
) -> Option<NaiveDate> {
    if let Some((end, _)) = current_end_date(contract, documents, today) {
        return Some(end);
    }
    resolve_field(contract, documents, FieldKey::EndDate, today, false)
        .value
        .and_then(|v| v.as_date())
}

/// Plan a renewal of `contract` as of `today`.
///
/// Pure: returns the renewal document to persist. Apply it to the contract
/// with [`Contract::apply_renewal`] under the contract's write lock.
pub fn plan_renewal(
    contract: &Contract,
    documents: &[EventDocument],
    options: RenewalOptions,
    today: NaiveDate,
    id: DocumentId,
    approved_at: DateTime<Utc>,
) -> Result<Renewal, RenewalError> {
    let prior_end =
        prior_end_date(contract, documents, today).ok_or_else(|| {
            RenewalError::UnresolvableEndDate {
                contract_id: contract.id.clone(),
            }
        })?;

    let months = if options.use_initial_term {
        contract.initial_term_months
    } else {
        options.months.ok_or(RenewalError::MissingMonths)?
    };
    if months == 0 {
        return Err(RenewalError::MissingMonths);
    }

    let new_end_date = crate::dates::add_months(prior_end, months);
    let effective_from = prior_end
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX);

    let sequence = documents
        .iter()
        .filter_map(|doc| match doc {
            EventDocument::Renewal(r) => Some(r.sequence),
            EventDocument::Amendment(_) => None,
        })
        .max()
        .unwrap_or(0)
        + 1;

    let mut overlay = FieldOverlay {
        // The new end date participates in chain resolution like any other
        // overlay field.
        end_date: Overlay::Set(new_end_date),
        ..Default::default()
    };
    let modifies_policies = options.policy_overlay.is_some();
    if let Some(policies) = options.policy_overlay {
        overlay.policies = policies;
    }

    Ok(Renewal {
        id,
        contract_id: contract.id.clone(),
        sequence,
        window: DateWindow::open(effective_from),
        prior_end_date: prior_end,
        new_end_date,
        months_applied: months,
        used_initial_term: options.use_initial_term,
        state: ApprovalState::Approved,
        approved_at: Some(approved_at),
        approved_on: Some(today),
        version: 1,
        modifies_policies,
        overlay,
    })
}
