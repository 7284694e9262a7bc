use async_trait::async_trait;

use crate::error::Result;
use crate::model::{SecretRef, VaultRef};

/// Remote secret store. Values are fetched separately from metadata.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Vaults visible to the ambient identity, deduplicated by id and sorted by name.
    async fn list_vaults(&self) -> Result<Vec<VaultRef>>;

    async fn list_secret_metadata(&self, vault: &VaultRef) -> Result<Vec<SecretRef>>;

    /// `Ok(None)` when the secret exists but carries no value.
    async fn get_secret_value(&self, vault: &VaultRef, name: &str) -> Result<Option<String>>;

    async fn set_secret_value(&self, vault: &VaultRef, name: &str, value: &str) -> Result<()>;

    async fn delete_secret(&self, vault: &VaultRef, name: &str) -> Result<()>;
}
