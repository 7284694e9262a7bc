use tracing::debug;

use crate::app::App;
use crate::filter;
use crate::model::{Command, Detail, Focus, ValuePurpose, VaultRef, ViewState};

/// Multi-step workflow currently owning the command prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActionMode {
    #[default]
    None,
    EditValue { secret: String },
    Rename { secret: String },
    MoveTarget { secret: String },
    MoveNewName { secret: String, target: VaultRef },
    CreateName,
    CreateValue { name: String },
}

impl ActionMode {
    pub fn is_none(&self) -> bool {
        matches!(self, ActionMode::None)
    }

    /// Modes with an earlier step that back-navigation returns to.
    pub fn can_unwind(&self) -> bool {
        matches!(self, ActionMode::MoveNewName { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActionMode::None => "",
            ActionMode::EditValue { .. } => "EDIT",
            ActionMode::Rename { .. } => "RENAME",
            ActionMode::MoveTarget { .. } | ActionMode::MoveNewName { .. } => "MOVE",
            ActionMode::CreateName | ActionMode::CreateValue { .. } => "CREATE",
        }
    }
}

impl App {
    pub fn open_prompt(&mut self, label: impl Into<String>, prefill: &str) {
        self.prompt.open(label, prefill);
        self.focus = Focus::Command;
    }

    pub fn close_prompt(&mut self) {
        self.prompt.close();
        if self.focus == Focus::Command {
            self.focus = Focus::List;
        }
    }

    /// `:` from the list. Only a mode that waits on free text may claim the prompt.
    pub fn open_command_prompt(&mut self) {
        match &self.action {
            ActionMode::None => self.open_prompt("Command", ""),
            ActionMode::MoveTarget { secret } => {
                let label = format!("Copy '{}' to vault", secret);
                self.open_prompt(label, "");
            }
            other => debug!("Prompt is owned by {:?}", other),
        }
    }

    pub fn begin_edit(&mut self) -> Vec<Command> {
        let Some((vault, secret)) = self.detail_target() else {
            return Vec::new();
        };
        self.begin_loading(&format!("Fetching '{}' for edit...", secret.name));
        vec![Command::LoadValue {
            vault,
            name: secret.name,
            purpose: ValuePurpose::Edit,
        }]
    }

    /// Second half of `begin_edit`, once the current value is known.
    pub fn open_edit(&mut self, name: String, value: Option<String>) {
        self.message = Some(match value {
            Some(_) => format!("Editing '{}' (Enter: save, Esc: cancel)", name),
            None => format!("Current value of '{}' unavailable; enter a new one", name),
        });
        let label = format!("New value for '{}'", name);
        self.open_prompt(label, value.as_deref().unwrap_or_default());
        self.action = ActionMode::EditValue { secret: name };
    }

    pub fn begin_rename(&mut self) -> Vec<Command> {
        if let Some((_, secret)) = self.detail_target() {
            self.open_prompt(format!("Rename '{}' to", secret.name), "");
            self.action = ActionMode::Rename {
                secret: secret.name,
            };
        }
        Vec::new()
    }

    pub fn begin_move(&mut self) -> Vec<Command> {
        if let Some((_, secret)) = self.detail_target() {
            self.message = Some(format!(
                "Choose a target vault for '{}' (Enter) or type its name (:)",
                secret.name
            ));
            self.action = ActionMode::MoveTarget {
                secret: secret.name,
            };
            self.show_vault_list();
        }
        Vec::new()
    }

    pub fn begin_create(&mut self) -> Vec<Command> {
        if self.current_vault.is_some() {
            self.open_prompt("New secret name", "");
            self.action = ActionMode::CreateName;
        }
        Vec::new()
    }

    /// Vault picked for a pending move, from the list or by name.
    pub fn choose_move_target(&mut self, target: VaultRef) -> Vec<Command> {
        let ActionMode::MoveTarget { secret } = std::mem::take(&mut self.action) else {
            return Vec::new();
        };
        let label = format!("Copy '{}' to '{}' as", secret, target.name);
        self.open_prompt(label, &secret);
        self.message = Some("Enter the name in the target vault (blank keeps it)".into());
        self.action = ActionMode::MoveNewName { secret, target };
        Vec::new()
    }

    /// `Esc` while the prompt is open, or back-navigation out of an unwindable step.
    pub fn cancel_action(&mut self) -> Vec<Command> {
        let mode = std::mem::take(&mut self.action);
        debug!("Cancelling {:?}", mode);
        self.close_prompt();
        match mode {
            ActionMode::None | ActionMode::CreateName | ActionMode::CreateValue { .. } => {
                Vec::new()
            }
            ActionMode::EditValue { .. } | ActionMode::Rename { .. } => {
                self.message = Some("Cancelled".into());
                Vec::new()
            }
            ActionMode::MoveTarget { secret } => {
                self.message = Some("Move cancelled".into());
                self.return_to_secrets(Some(&secret));
                self.open_selected()
            }
            ActionMode::MoveNewName { secret, .. } => {
                self.action = ActionMode::MoveTarget { secret };
                self.show_vault_list();
                Vec::new()
            }
        }
    }

    pub fn submit_edit(&mut self, secret: String, value: String) -> Vec<Command> {
        self.close_prompt();
        let Some(vault) = self.current_vault.clone() else {
            return Vec::new();
        };
        self.begin_loading(&format!("Saving '{}'...", secret));
        vec![Command::SaveValue {
            vault,
            name: secret,
            value,
        }]
    }

    pub fn submit_rename(&mut self, secret: String, text: String) -> Vec<Command> {
        self.close_prompt();
        let new_name = text.trim();
        if new_name.is_empty() || new_name == secret {
            self.message = Some("Rename skipped: name unchanged".into());
            return Vec::new();
        }
        let Some(vault) = self.current_vault.clone() else {
            return Vec::new();
        };
        self.view = ViewState::ListSecrets { detail: false };
        self.begin_loading(&format!("Renaming '{}' to '{}'...", secret, new_name));
        vec![Command::RenameSecret {
            vault,
            from: secret,
            to: new_name.to_string(),
        }]
    }

    pub fn submit_move_target(&mut self, secret: String, text: String) -> Vec<Command> {
        let query = text.trim();
        let found = self
            .all_vaults
            .iter()
            .find(|v| v.name.to_lowercase() == query.to_lowercase())
            .cloned();
        match found {
            Some(target) => {
                self.close_prompt();
                self.action = ActionMode::MoveTarget { secret };
                self.choose_move_target(target)
            }
            None => {
                let hint = filter::closest(&self.all_vaults, query)
                    .map(|v| format!(" (did you mean '{}'?)", v.name))
                    .unwrap_or_default();
                let text = format!("Vault not found: '{}'{}", query, hint);
                self.message = Some(text.clone());
                self.detail = Detail::Notice(text);
                let label = self.prompt.label.clone();
                self.open_prompt(label, query);
                self.action = ActionMode::MoveTarget { secret };
                Vec::new()
            }
        }
    }

    pub fn submit_move(&mut self, secret: String, target: VaultRef, text: String) -> Vec<Command> {
        self.close_prompt();
        let Some(source) = self.current_vault.clone() else {
            return Vec::new();
        };
        let new_name = match text.trim() {
            "" => secret.clone(),
            other => other.to_string(),
        };
        self.return_to_secrets(Some(&secret));
        self.begin_loading(&format!("Copying '{}' to '{}'...", secret, target.name));
        vec![Command::CopyToVault {
            source,
            target,
            name: secret,
            new_name,
        }]
    }

    pub fn submit_create_name(&mut self, text: String) -> Vec<Command> {
        self.close_prompt();
        let name = text.trim();
        if name.is_empty() {
            return Vec::new();
        }
        self.open_prompt(format!("Value for '{}'", name), "");
        self.action = ActionMode::CreateValue {
            name: name.to_string(),
        };
        Vec::new()
    }

    pub fn submit_create(&mut self, name: String, value: String) -> Vec<Command> {
        self.close_prompt();
        let Some(vault) = self.current_vault.clone() else {
            return Vec::new();
        };
        self.begin_loading(&format!("Creating '{}'...", name));
        vec![Command::CreateSecret { vault, name, value }]
    }
}
