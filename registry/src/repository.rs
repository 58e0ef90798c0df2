//! Read-side abstraction over contract storage.
//!
//! Export and reporting layers consume snapshots through this trait so the
//! in-memory store can later be swapped for a database-backed one without
//! touching the resolution paths.

use async_trait::async_trait;

use effectivity::ContractId;

use crate::service::RegistryError;
use crate::store::{ContractSnapshot, ContractStore};

#[async_trait]
pub trait ContractRepository: Send + Sync {
    /// Immutable snapshot of a contract and everything attached to it.
    async fn snapshot(&self, id: &ContractId) -> Result<ContractSnapshot, RegistryError>;

    /// Ids of all known contracts, in no particular order.
    async fn contract_ids(&self) -> Vec<ContractId>;
}

#[async_trait]
impl ContractRepository for ContractStore {
    async fn snapshot(&self, id: &ContractId) -> Result<ContractSnapshot, RegistryError> {
        let entry = self
            .entry(id)
            .ok_or_else(|| RegistryError::ContractNotFound(id.clone()))?;
        let state = entry.lock().await;
        Ok(ContractSnapshot::of(&state))
    }

    async fn contract_ids(&self) -> Vec<ContractId> {
        self.contract_ids()
    }
}
