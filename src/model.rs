use std::collections::{BTreeMap, HashSet};

use crossterm::event::KeyEvent;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultRef {
    pub name: String,
    pub uri: String,
    pub id: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecretRef {
    pub name: String,
    pub content_type: Option<String>,
    pub enabled: Option<bool>,
    pub created_on: Option<OffsetDateTime>,
    pub updated_on: Option<OffsetDateTime>,
    pub expires_on: Option<OffsetDateTime>,
    pub tags: BTreeMap<String, String>,
}

impl SecretRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Drop duplicate vaults (same id, first one wins) and sort by name.
pub fn normalize_vaults(vaults: Vec<VaultRef>) -> Vec<VaultRef> {
    let mut seen = HashSet::new();
    let mut unique: Vec<VaultRef> = vaults
        .into_iter()
        .filter(|v| seen.insert(v.id.to_lowercase()))
        .collect();
    unique.sort_by(|a, b| a.name.cmp(&b.name));
    unique
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    SelectVault,
    ListSecrets { detail: bool },
    MoveSelectTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Filter,
    Command,
}

/// Contents of the detail pane.
#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    Empty,
    Notice(String),
    Vault(VaultRef),
    Preview(SecretRef),
    Full { secret: SecretRef, value: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePurpose {
    Detail,
    Edit,
}

/// Remote work requested by the state machine, executed by `runtime::Services`.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    DiscoverVaults,
    InvalidateCache,
    LoadSecrets { vault: VaultRef, select: Option<String> },
    LoadValue { vault: VaultRef, name: String, purpose: ValuePurpose },
    CopyToClipboard { vault: VaultRef, name: String },
    SaveValue { vault: VaultRef, name: String, value: String },
    CreateSecret { vault: VaultRef, name: String, value: String },
    RenameSecret { vault: VaultRef, from: String, to: String },
    CopyToVault { source: VaultRef, target: VaultRef, name: String, new_name: String },
}

/// Completed mutation, as reported back to the state machine. Never carries values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Edited { name: String },
    Created { name: String },
    Renamed { from: String, to: String },
    Moved { name: String, target: String, new_name: String },
}

impl Mutation {
    pub fn describe(&self) -> String {
        match self {
            Mutation::Edited { name } => format!("Update of '{}'", name),
            Mutation::Created { name } => format!("Creation of '{}'", name),
            Mutation::Renamed { from, to } => format!("Rename of '{}' to '{}'", from, to),
            Mutation::Moved { name, target, new_name } => {
                format!("Move of '{}' to '{}' as '{}'", name, target, new_name)
            }
        }
    }

    pub fn success_message(&self) -> String {
        match self {
            Mutation::Edited { name } => format!("Secret '{}' updated", name),
            Mutation::Created { name } => format!("Secret '{}' created", name),
            Mutation::Renamed { from, to } => format!("Secret '{}' renamed to '{}'", from, to),
            Mutation::Moved { name, target, new_name } => {
                format!("Secret '{}' copied to vault '{}' as '{}'", name, target, new_name)
            }
        }
    }
}

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    VaultsLoaded(Result<Vec<VaultRef>, String>),
    SecretsLoaded {
        vault_id: String,
        select: Option<String>,
        result: Result<Vec<SecretRef>, String>,
    },
    ValueLoaded {
        vault_id: String,
        name: String,
        purpose: ValuePurpose,
        value: Option<String>,
    },
    Copied { name: String, result: Result<(), String> },
    Mutated {
        vault_id: String,
        mutation: Mutation,
        result: Result<(), String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault(name: &str, id: &str) -> VaultRef {
        VaultRef {
            name: name.to_string(),
            uri: format!("https://{}.vault.azure.net/", name),
            id: id.to_string(),
            location: None,
        }
    }

    #[test]
    fn test_normalize_vaults_dedupes_by_id_and_sorts() {
        let vaults = vec![
            vault("zeta", "/subs/1/vaults/zeta"),
            vault("alpha", "/subs/1/vaults/alpha"),
            vault("zeta-again", "/SUBS/1/vaults/ZETA"),
            vault("mid", "/subs/2/vaults/mid"),
        ];
        let normalized = normalize_vaults(vaults);
        let names: Vec<&str> = normalized.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_mutation_messages_name_the_secret() {
        let moved = Mutation::Moved {
            name: "db".into(),
            target: "prod".into(),
            new_name: "db-copy".into(),
        };
        assert!(moved.success_message().contains("prod"));
        assert!(moved.describe().contains("db-copy"));
    }
}
