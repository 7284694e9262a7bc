use tracing::debug;

use crate::action::ActionMode;
use crate::app::App;
use crate::filter;
use crate::model::{Command, Detail, Focus, SecretRef, ValuePurpose, VaultRef, ViewState};

impl App {
    pub fn list_len(&self) -> usize {
        match self.view {
            ViewState::SelectVault | ViewState::MoveSelectTarget => self.filtered_vaults.len(),
            ViewState::ListSecrets { .. } => self.filtered_secrets.len(),
        }
    }

    pub fn selected_vault(&self) -> Option<&VaultRef> {
        match self.view {
            ViewState::SelectVault | ViewState::MoveSelectTarget => {
                self.filtered_vaults.get(self.selected)
            }
            ViewState::ListSecrets { .. } => None,
        }
    }

    pub fn selected_secret(&self) -> Option<&SecretRef> {
        match self.view {
            ViewState::ListSecrets { .. } => self.filtered_secrets.get(self.selected),
            _ => None,
        }
    }

    /// The vault and secret that detail-view actions apply to.
    pub fn detail_target(&self) -> Option<(VaultRef, SecretRef)> {
        if self.view != (ViewState::ListSecrets { detail: true }) {
            return None;
        }
        let vault = self.current_vault.clone()?;
        let secret = self.selected_secret()?.clone();
        Some((vault, secret))
    }

    pub fn select(&mut self, index: usize) {
        let len = self.list_len();
        self.selected = if len == 0 { 0 } else { index.min(len - 1) };
        self.list_state.select(if len == 0 { None } else { Some(self.selected) });
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.list_len();
        if len == 0 {
            return;
        }
        let last = (len - 1) as isize;
        let target = (self.selected as isize).saturating_add(delta).clamp(0, last);
        if target as usize == self.selected {
            return;
        }
        self.select(target as usize);
        if let ViewState::ListSecrets { .. } = self.view {
            self.view = ViewState::ListSecrets { detail: false };
        }
        self.show_preview();
    }

    /// Recompute the projection for the list currently on screen from the filter text.
    pub fn apply_filter(&mut self) {
        let query = self.filter.value().to_string();
        match self.view {
            ViewState::SelectVault | ViewState::MoveSelectTarget => {
                self.filtered_vaults = filter::filter(&self.all_vaults, &query);
            }
            ViewState::ListSecrets { .. } => {
                self.filtered_secrets = filter::filter(&self.all_secrets, &query);
                self.view = ViewState::ListSecrets { detail: false };
            }
        }
        self.select(0);
        self.show_preview();
    }

    /// Clear the filter text and restore both projections to the full collections.
    pub fn reset_filter(&mut self) {
        self.filter.clear();
        self.filtered_vaults = self.all_vaults.clone();
        self.filtered_secrets = self.all_secrets.clone();
        self.select(0);
    }

    /// Detail pane for the highlighted item, without its value.
    pub fn show_preview(&mut self) {
        self.detail = match self.view {
            ViewState::SelectVault | ViewState::MoveSelectTarget => self
                .selected_vault()
                .cloned()
                .map(Detail::Vault)
                .unwrap_or(Detail::Empty),
            ViewState::ListSecrets { .. } => self
                .selected_secret()
                .cloned()
                .map(Detail::Preview)
                .unwrap_or(Detail::Empty),
        };
    }

    /// Enter on the list.
    pub fn activate(&mut self) -> Vec<Command> {
        if self.prompt.visible {
            return Vec::new();
        }
        match self.view {
            ViewState::SelectVault => match self.selected_vault().cloned() {
                Some(vault) => self.enter_vault(vault),
                None => Vec::new(),
            },
            ViewState::ListSecrets { .. } => self.open_selected(),
            ViewState::MoveSelectTarget => match self.selected_vault().cloned() {
                Some(target) => self.choose_move_target(target),
                None => Vec::new(),
            },
        }
    }

    /// Load the full detail (including value) of the highlighted secret.
    pub fn open_selected(&mut self) -> Vec<Command> {
        let (Some(vault), Some(secret)) = (self.current_vault.clone(), self.selected_secret())
        else {
            return Vec::new();
        };
        let name = secret.name.clone();
        self.begin_loading(&format!("Fetching '{}'...", name));
        vec![Command::LoadValue {
            vault,
            name,
            purpose: ValuePurpose::Detail,
        }]
    }

    pub fn enter_vault(&mut self, vault: VaultRef) -> Vec<Command> {
        debug!("Entering vault '{}' ({})", vault.name, vault.id);
        self.current_vault = Some(vault.clone());
        self.action = ActionMode::None;
        self.all_secrets.clear();
        self.view = ViewState::ListSecrets { detail: false };
        self.focus = Focus::List;
        self.reset_filter();
        self.detail = Detail::Empty;
        self.begin_loading(&format!("Loading secrets from '{}'...", vault.name));
        vec![
            Command::InvalidateCache,
            Command::LoadSecrets {
                vault,
                select: None,
            },
        ]
    }

    /// Show the secret list of the current vault again, optionally re-highlighting `name`.
    pub fn return_to_secrets(&mut self, name: Option<&str>) {
        self.view = ViewState::ListSecrets { detail: false };
        self.reset_filter();
        if let Some(index) = name.and_then(|n| self.filtered_secrets.iter().position(|s| s.name == n))
        {
            self.select(index);
        }
        self.show_preview();
    }

    pub fn show_vault_list(&mut self) {
        self.view = ViewState::MoveSelectTarget;
        self.focus = Focus::List;
        self.reset_filter();
        self.show_preview();
    }

    /// `Esc` / `b` outside the prompt.
    pub fn back(&mut self) -> Vec<Command> {
        if self.action.can_unwind() {
            return self.cancel_action();
        }
        match self.view {
            ViewState::SelectVault => Vec::new(),
            ViewState::ListSecrets { detail: true } => {
                self.view = ViewState::ListSecrets { detail: false };
                self.show_preview();
                Vec::new()
            }
            ViewState::MoveSelectTarget => {
                self.action = ActionMode::None;
                self.return_to_secrets(None);
                self.message = Some("Move cancelled".into());
                Vec::new()
            }
            ViewState::ListSecrets { detail: false } => {
                debug!("Leaving vault");
                self.current_vault = None;
                self.action = ActionMode::None;
                self.all_secrets.clear();
                self.filtered_secrets.clear();
                self.view = ViewState::SelectVault;
                self.reset_filter();
                self.show_preview();
                self.message = None;
                vec![Command::InvalidateCache]
            }
        }
    }
}
