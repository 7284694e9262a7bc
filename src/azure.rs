use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use azure_core::credentials::TokenCredential;
use azure_identity::DeveloperToolsCredential;
use azure_security_keyvault_secrets::{ResourceExt, SecretClient, models::SetSecretParameters};
use futures::{TryStreamExt, future::join_all};
use reqwest::Client;
use serde_json::Value;
use tokio::task;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::model::{SecretRef, VaultRef, normalize_vaults};
use crate::store::SecretStore;

const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Azure Key Vault behind the `SecretStore` seam. Vaults are discovered through
/// ARM; secrets are read and written with one `SecretClient` per vault.
pub struct AzureStore {
    credential: Arc<DeveloperToolsCredential>,
    http: Client,
    management_url: String,
}

impl AzureStore {
    pub fn new(credential: Arc<DeveloperToolsCredential>, management_url: impl Into<String>) -> Self {
        Self {
            credential,
            http: Client::new(),
            management_url: management_url.into(),
        }
    }

    fn client(&self, vault: &VaultRef) -> Result<SecretClient> {
        Ok(SecretClient::new(&vault.uri, self.credential.clone(), None)?)
    }
}

#[async_trait]
impl SecretStore for AzureStore {
    async fn list_vaults(&self) -> Result<Vec<VaultRef>> {
        debug!("Requesting management token");
        let token = self.credential.get_token(&[MANAGEMENT_SCOPE], None).await?;
        let mut vaults =
            discover_resources(&self.http, token.token.secret(), &self.management_url).await?;

        // Fallback to az CLI executed in blocking thread if no vaults found
        if vaults.is_empty() {
            debug!("No vaults from ARM; attempting az CLI fallback");
            vaults = az_cli_vaults().await?;
        }
        Ok(normalize_vaults(vaults))
    }

    async fn list_secret_metadata(&self, vault: &VaultRef) -> Result<Vec<SecretRef>> {
        debug!("Listing secrets of '{}'", vault.name);
        let client = self.client(vault)?;
        let mut pager = client.list_secret_properties(None)?.into_stream();
        let mut secrets = Vec::new();
        while let Some(item) = pager.try_next().await? {
            let Ok(rid) = item.resource_id() else {
                continue;
            };
            let attributes = item.attributes.as_ref();
            secrets.push(SecretRef {
                name: rid.name,
                content_type: item.content_type.clone(),
                enabled: attributes.and_then(|a| a.enabled),
                created_on: attributes.and_then(|a| a.created),
                updated_on: attributes.and_then(|a| a.updated),
                expires_on: attributes.and_then(|a| a.expires),
                tags: item.tags.clone().unwrap_or_default().into_iter().collect(),
            });
        }
        secrets.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Listed {} secrets of '{}'", secrets.len(), vault.name);
        Ok(secrets)
    }

    async fn get_secret_value(&self, vault: &VaultRef, name: &str) -> Result<Option<String>> {
        let client = self.client(vault)?;
        let secret = client.get_secret(name, None).await?.into_model()?;
        Ok(secret.value)
    }

    async fn set_secret_value(&self, vault: &VaultRef, name: &str, value: &str) -> Result<()> {
        let client = self.client(vault)?;
        let params = SetSecretParameters {
            value: Some(value.to_string()),
            ..Default::default()
        };
        client.set_secret(name, params.try_into()?, None).await?;
        debug!("Set secret '{}' in '{}'", name, vault.name);
        Ok(())
    }

    async fn delete_secret(&self, vault: &VaultRef, name: &str) -> Result<()> {
        let client = self.client(vault)?;
        client.delete_secret(name, None).await?;
        debug!("Deleted secret '{}' from '{}' (soft-delete)", name, vault.name);
        Ok(())
    }
}

/// Parse one ARM / `az keyvault list` vault entry.
fn vault_from_json(item: &Value) -> Option<VaultRef> {
    let name = item["name"].as_str()?;
    let uri = item["properties"]["vaultUri"].as_str()?;
    Some(VaultRef {
        name: name.to_string(),
        uri: uri.to_string(),
        id: item["id"].as_str().unwrap_or(uri).to_string(),
        location: item["location"].as_str().map(str::to_string),
    })
}

fn vaults_from_array(data: &Value) -> Vec<VaultRef> {
    data.as_array()
        .map(|arr| arr.iter().filter_map(vault_from_json).collect())
        .unwrap_or_default()
}

async fn az_cli_vaults() -> Result<Vec<VaultRef>> {
    let output = task::spawn_blocking(|| {
        Command::new("az")
            .args(["keyvault", "list", "-o", "json"])
            .output()
    })
    .await?;
    match output {
        Ok(out) if out.status.success() => {
            let data: Value = serde_json::from_slice(&out.stdout)?;
            Ok(vaults_from_array(&data))
        }
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            debug!("az CLI returned {}: {}", out.status, stderr.trim());
            Err(AppError::Store(format!("az keyvault list failed: {}", stderr.trim())))
        }
        Err(e) => {
            debug!("az CLI fallback spawn failed: {}", e);
            Ok(Vec::new())
        }
    }
}

/// Walk subscriptions, then the vaults of each subscription in parallel,
/// following `nextLink` pages. Subscriptions whose vault listing fails are skipped.
async fn discover_resources(
    client: &Client,
    token_str: &str,
    base_url: &str,
) -> Result<Vec<VaultRef>> {
    let mut subs_url = Some(format!("{}/subscriptions?api-version=2020-01-01", base_url));
    let mut subscriptions = Vec::new();

    while let Some(url) = subs_url {
        let resp = client
            .get(&url)
            .bearer_auth(token_str)
            .send()
            .await?
            .error_for_status()?;
        let page: Value = resp.json().await?;

        if let Some(arr) = page["value"].as_array() {
            for sub in arr {
                if let Some(sub_id) = sub["subscriptionId"].as_str() {
                    subscriptions.push(sub_id.to_string());
                }
            }
        }

        subs_url = page["nextLink"].as_str().map(|s| s.to_string());
    }
    debug!("Found {} subscriptions", subscriptions.len());

    let futures = subscriptions.into_iter().map(|sub_id| {
        let client = client.clone();
        let bearer = token_str.to_string();
        let base_url = base_url.to_string();
        async move {
            let mut vaults = Vec::new();
            let mut next_link = Some(format!(
                "{}/subscriptions/{}/providers/Microsoft.KeyVault/vaults?api-version=2025-05-01",
                base_url, sub_id
            ));

            while let Some(url) = next_link {
                let resp = client.get(&url).bearer_auth(&bearer).send().await.ok()?;
                let page: Value = resp.json().await.ok()?;
                vaults.extend(vaults_from_array(&page["value"]));
                next_link = page["nextLink"].as_str().map(|s| s.to_string());
            }
            Some(vaults)
        }
    });

    Ok(join_all(futures).await.into_iter().flatten().flatten().collect())
}
