//! In-memory contract store.
//!
//! Each contract's state sits behind its own async mutex, which is the
//! per-contract serialization boundary for writes: overlap validation and
//! renewal planning must read a set of documents no concurrent approval is
//! mutating. Reads take a [`ContractSnapshot`] once and resolve against it,
//! never holding the lock across resolution calls.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use effectivity::{Contract, ContractId, DocumentId, EventDocument, Policy};

/// Everything known about one contract: the baseline record, its event
/// documents, and the uploaded policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractState {
    pub contract: Contract,
    pub documents: Vec<EventDocument>,
    pub policies: Vec<Policy>,
}

impl ContractState {
    pub fn new(contract: Contract) -> Self {
        Self {
            contract,
            documents: Vec::new(),
            policies: Vec::new(),
        }
    }
}

/// Immutable copy of a contract's state, taken once per request.
///
/// All resolution calls run against a snapshot rather than the live state,
/// so a single request sees one consistent document set no matter how many
/// fields it resolves.
#[derive(Debug, Clone, Serialize)]
pub struct ContractSnapshot {
    pub contract: Contract,
    pub documents: Vec<EventDocument>,
    pub policies: Vec<Policy>,
    /// Content hash of the state this snapshot was taken from, for audit
    /// lines that need to name exactly what was resolved against.
    pub fingerprint: String,
}

impl ContractSnapshot {
    pub fn of(state: &ContractState) -> Self {
        Self {
            contract: state.contract.clone(),
            documents: state.documents.clone(),
            policies: state.policies.clone(),
            fingerprint: fingerprint(state),
        }
    }

    pub fn find_policy(&self, id: &DocumentId) -> Option<&Policy> {
        self.policies.iter().find(|policy| &policy.id == id)
    }
}

/// SHA-256 over the serialized state, hex-encoded.
fn fingerprint(state: &ContractState) -> String {
    let bytes = serde_json::to_vec(state).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

/// Concurrent map of contract states, keyed by contract id.
pub struct ContractStore {
    contracts: DashMap<ContractId, Arc<Mutex<ContractState>>>,
    /// Policy id to owning contract, for id-only policy lookups.
    policy_index: DashMap<DocumentId, ContractId>,
}

impl ContractStore {
    pub fn new() -> Self {
        Self {
            contracts: DashMap::new(),
            policy_index: DashMap::new(),
        }
    }

    /// Insert or replace a contract's state.
    pub fn insert(&self, contract: Contract) {
        let id = contract.id.clone();
        self.contracts
            .insert(id, Arc::new(Mutex::new(ContractState::new(contract))));
    }

    /// Handle to one contract's lock, if the contract is known.
    pub fn entry(&self, id: &ContractId) -> Option<Arc<Mutex<ContractState>>> {
        self.contracts.get(id).map(|state| Arc::clone(&state))
    }

    pub fn contains(&self, id: &ContractId) -> bool {
        self.contracts.contains_key(id)
    }

    pub fn contract_ids(&self) -> Vec<ContractId> {
        self.contracts
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Record which contract owns a policy.
    pub fn index_policy(&self, policy_id: DocumentId, contract_id: ContractId) {
        self.policy_index.insert(policy_id, contract_id);
    }

    pub fn contract_of_policy(&self, policy_id: &DocumentId) -> Option<ContractId> {
        self.policy_index.get(policy_id).map(|id| id.clone())
    }
}

impl Default for ContractStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use effectivity::PaymentModality;

    fn contract(id: &str) -> Contract {
        Contract {
            id: id.to_string(),
            number: format!("CT-{id}"),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            initial_term_months: 12,
            initial_end_date: None,
            updated_end_date: None,
            payment_modality: PaymentModality::Fixed,
            canon: None,
            min_guaranteed_canon: None,
            sales_percent: None,
            index_basis: None,
            index_extra_points: None,
            index_period: None,
            index_anchor: None,
            auto_renew: false,
            renewal_count: 0,
            last_renewed_on: None,
            policy_terms: Default::default(),
            indexations: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_snapshot_fingerprint_tracks_content() {
        let store = ContractStore::new();
        store.insert(contract("c-1"));

        let entry = store.entry(&"c-1".to_string()).unwrap();
        let before = ContractSnapshot::of(&*entry.lock().await);

        entry.lock().await.contract.renewal_count = 1;
        let after = ContractSnapshot::of(&*entry.lock().await);

        assert_ne!(before.fingerprint, after.fingerprint);
    }

    #[tokio::test]
    async fn test_policy_index_lookup() {
        let store = ContractStore::new();
        store.insert(contract("c-1"));
        store.index_policy("p-9".to_string(), "c-1".to_string());

        assert_eq!(
            store.contract_of_policy(&"p-9".to_string()),
            Some("c-1".to_string())
        );
        assert_eq!(store.contract_of_policy(&"p-0".to_string()), None);
    }
}
