//! EffectivityService - boundary-facing operations over stored contracts.
//!
//! Reads snapshot a contract once and run the pure resolution calls against
//! the snapshot. Writes (amendment approval, renewal processing) run under
//! the contract's own lock so overlap validation always sees a consistent
//! document set.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use effectivity::{
    build_policy_requirements, effective_view, evaluate_policy, plan_renewal, resolve_field,
    resolve_field_as_of, validate_no_overlap, Amendment, ApprovalState, Compliance, Contract,
    ContractId, DateWindow, DocumentId, EffectiveView, EventDocument, FieldKey, OverlapConflict,
    Policy, PolicyRequirement, PolicyType, RenewalError, RenewalOptions, Resolution,
};

use crate::store::{ContractSnapshot, ContractState, ContractStore};

/// Error types for the service.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No contract registered under the given id
    #[error("contract not found: {0}")]
    ContractNotFound(ContractId),

    /// No event document with the given id on the contract
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// The document exists but is a renewal, and the operation only applies
    /// to amendments
    #[error("document is not an amendment: {0}")]
    NotAnAmendment(DocumentId),

    /// No uploaded policy with the given id
    #[error("policy not found: {0}")]
    PolicyNotFound(DocumentId),

    /// Amendment validity windows would overlap
    #[error("validity window conflict: {0}")]
    Overlap(#[from] OverlapConflict),

    /// Renewal planning failed
    #[error("renewal failed: {0}")]
    Renewal(#[from] RenewalError),
}

/// Main entry point for contract effectivity queries and writes.
pub struct EffectivityService {
    store: Arc<ContractStore>,
}

impl EffectivityService {
    pub fn new() -> Self {
        Self {
            store: Arc::new(ContractStore::new()),
        }
    }

    pub fn with_store(store: Arc<ContractStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ContractStore> {
        &self.store
    }

    /// Register a contract. Replaces any previous state under the same id.
    pub fn register_contract(&self, contract: Contract) -> ContractId {
        let id = contract.id.clone();
        info!(contract_id = %id, number = %contract.number, "Registering contract");
        self.store.insert(contract);
        id
    }

    async fn locked(
        &self,
        contract_id: &ContractId,
    ) -> Result<Arc<tokio::sync::Mutex<ContractState>>, RegistryError> {
        self.store
            .entry(contract_id)
            .ok_or_else(|| RegistryError::ContractNotFound(contract_id.clone()))
    }

    /// Immutable snapshot of a contract for multi-field resolution.
    pub async fn snapshot(
        &self,
        contract_id: &ContractId,
    ) -> Result<ContractSnapshot, RegistryError> {
        let entry = self.locked(contract_id).await?;
        let state = entry.lock().await;
        Ok(ContractSnapshot::of(&state))
    }

    /// Attach an amendment to a contract, in whatever approval state it
    /// carries. Overlap validation happens at approval time, not here.
    pub async fn submit_amendment(
        &self,
        amendment: Amendment,
    ) -> Result<DocumentId, RegistryError> {
        let entry = self.locked(&amendment.contract_id).await?;
        let mut state = entry.lock().await;

        let id = amendment.id.clone();
        debug!(
            contract_id = %amendment.contract_id,
            amendment = %amendment.label(),
            window = %amendment.window,
            "Submitting amendment"
        );
        state.documents.push(EventDocument::Amendment(amendment));
        Ok(id)
    }

    /// Approve an amendment, running overlap validation against the other
    /// approved amendments under the contract lock. Two concurrent approvals
    /// with colliding windows cannot both pass.
    pub async fn approve_amendment(
        &self,
        contract_id: &ContractId,
        amendment_id: &DocumentId,
        approved_at: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let entry = self.locked(contract_id).await?;
        let mut state = entry.lock().await;

        let window = {
            let doc = state
                .documents
                .iter()
                .find(|doc| doc.id() == amendment_id)
                .ok_or_else(|| RegistryError::DocumentNotFound(amendment_id.clone()))?;
            match doc {
                EventDocument::Amendment(a) => a.window,
                EventDocument::Renewal(_) => {
                    return Err(RegistryError::NotAnAmendment(amendment_id.clone()))
                }
            }
        };

        let approved: Vec<Amendment> = state
            .documents
            .iter()
            .filter_map(|doc| match doc {
                EventDocument::Amendment(a) if a.state == ApprovalState::Approved => {
                    Some(a.clone())
                }
                _ => None,
            })
            .collect();

        if let Err(conflict) = validate_no_overlap(&approved, window, Some(amendment_id)) {
            warn!(
                contract_id = %contract_id,
                amendment_id = %amendment_id,
                %conflict,
                "Rejecting amendment approval"
            );
            return Err(RegistryError::Overlap(conflict));
        }

        for doc in state.documents.iter_mut() {
            if let EventDocument::Amendment(a) = doc {
                if &a.id == amendment_id {
                    a.state = ApprovalState::Approved;
                    a.approved_at = Some(approved_at);
                    info!(
                        contract_id = %contract_id,
                        amendment = %a.label(),
                        window = %a.window,
                        "Approved amendment"
                    );
                }
            }
        }
        Ok(())
    }

    /// Resolve one field non-strictly: the last approved document to have
    /// meaningfully set it wins, in force on the date or not.
    pub async fn resolve_field(
        &self,
        contract_id: &ContractId,
        key: FieldKey,
        reference_date: NaiveDate,
        allow_future: bool,
    ) -> Result<Resolution, RegistryError> {
        let snapshot = self.snapshot(contract_id).await?;
        Ok(resolve_field(
            &snapshot.contract,
            &snapshot.documents,
            key,
            reference_date,
            allow_future,
        ))
    }

    /// Resolve one field strictly: the winning document's window must
    /// contain the reference date.
    pub async fn resolve_field_as_of(
        &self,
        contract_id: &ContractId,
        key: FieldKey,
        reference_date: NaiveDate,
        allow_future: bool,
    ) -> Result<Resolution, RegistryError> {
        let snapshot = self.snapshot(contract_id).await?;
        Ok(resolve_field_as_of(
            &snapshot.contract,
            &snapshot.documents,
            key,
            reference_date,
            allow_future,
        ))
    }

    /// Full as-of view of the contract's economic terms.
    pub async fn effective_view(
        &self,
        contract_id: &ContractId,
        reference_date: NaiveDate,
    ) -> Result<EffectiveView, RegistryError> {
        let snapshot = self.snapshot(contract_id).await?;
        Ok(effective_view(
            &snapshot.contract,
            &snapshot.documents,
            reference_date,
        ))
    }

    /// Effective insurance requirements per policy type.
    pub async fn policy_requirements(
        &self,
        contract_id: &ContractId,
        reference_date: NaiveDate,
        allow_future: bool,
    ) -> Result<BTreeMap<PolicyType, PolicyRequirement>, RegistryError> {
        let snapshot = self.snapshot(contract_id).await?;
        Ok(build_policy_requirements(
            &snapshot.contract,
            &snapshot.documents,
            reference_date,
            allow_future,
        ))
    }

    /// Attach an uploaded policy to its contract.
    pub async fn register_policy(&self, policy: Policy) -> Result<DocumentId, RegistryError> {
        let entry = self.locked(&policy.contract_id).await?;
        let mut state = entry.lock().await;

        let id = policy.id.clone();
        debug!(
            contract_id = %policy.contract_id,
            policy_id = %id,
            policy_type = policy.policy_type.as_str(),
            "Registering policy"
        );
        self.store
            .index_policy(id.clone(), policy.contract_id.clone());
        state.policies.push(policy);
        Ok(id)
    }

    /// Evaluate one uploaded policy against a required end date.
    pub async fn evaluate_policy(
        &self,
        policy_id: &DocumentId,
        required_end_date: Option<NaiveDate>,
        reference_date: NaiveDate,
    ) -> Result<Compliance, RegistryError> {
        let contract_id = self
            .store
            .contract_of_policy(policy_id)
            .ok_or_else(|| RegistryError::PolicyNotFound(policy_id.clone()))?;
        let snapshot = self.snapshot(&contract_id).await?;
        let policy = snapshot
            .find_policy(policy_id)
            .ok_or_else(|| RegistryError::PolicyNotFound(policy_id.clone()))?;

        Ok(evaluate_policy(policy, required_end_date, reference_date))
    }

    /// Check a prospective window against the approved amendments, without
    /// writing anything. `excluding` skips one document during correction.
    pub async fn validate_window(
        &self,
        contract_id: &ContractId,
        window: DateWindow,
        excluding: Option<&DocumentId>,
    ) -> Result<(), RegistryError> {
        let snapshot = self.snapshot(contract_id).await?;
        let approved: Vec<Amendment> = snapshot
            .documents
            .iter()
            .filter_map(|doc| match doc {
                EventDocument::Amendment(a) => Some(a.clone()),
                EventDocument::Renewal(_) => None,
            })
            .collect();
        validate_no_overlap(&approved, window, excluding)?;
        Ok(())
    }

    /// Plan and apply a renewal under the contract lock. The contract's end
    /// date and counters advance; its baseline policy fields do not.
    pub async fn process_renewal(
        &self,
        contract_id: &ContractId,
        options: RenewalOptions,
        today: NaiveDate,
    ) -> Result<DocumentId, RegistryError> {
        let entry = self.locked(contract_id).await?;
        let mut state = entry.lock().await;

        let id = uuid::Uuid::new_v4().to_string();
        let renewal = plan_renewal(
            &state.contract,
            &state.documents,
            options,
            today,
            id.clone(),
            Utc::now(),
        )?;

        info!(
            contract_id = %contract_id,
            renewal = %renewal.label(),
            prior_end = %renewal.prior_end_date,
            new_end = %renewal.new_end_date,
            months = renewal.months_applied,
            "Processing renewal"
        );

        state.contract.apply_renewal(&renewal);
        state.documents.push(EventDocument::Renewal(renewal));
        Ok(id)
    }
}

impl Default for EffectivityService {
    fn default() -> Self {
        Self::new()
    }
}
