use ratatui::widgets::ListState;
use throbber_widgets_tui::ThrobberState;
use tracing::{debug, info, warn};

use crate::action::ActionMode;
use crate::command;
use crate::keys::{self, Intent};
use crate::model::{
    AppEvent, Command, Detail, Focus, Mutation, SecretRef, ValuePurpose, VaultRef, ViewState,
};
use crate::prompt::{LineInput, Prompt};

/// The whole browser state. Mutated only by `update`, which returns the remote
/// work to run next.
pub struct App {
    pub view: ViewState,
    pub focus: Focus,
    pub action: ActionMode,
    pub prompt: Prompt,
    pub filter: LineInput,
    pub all_vaults: Vec<VaultRef>,
    pub filtered_vaults: Vec<VaultRef>,
    pub all_secrets: Vec<SecretRef>,
    pub filtered_secrets: Vec<SecretRef>,
    pub selected: usize,
    pub list_state: ListState,
    pub current_vault: Option<VaultRef>,
    pub detail: Detail,
    pub message: Option<String>,
    pub loading: bool,
    pub throbber_state: ThrobberState,
    pub should_quit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            view: ViewState::SelectVault,
            focus: Focus::List,
            action: ActionMode::None,
            prompt: Prompt::default(),
            filter: LineInput::default(),
            all_vaults: Vec::new(),
            filtered_vaults: Vec::new(),
            all_secrets: Vec::new(),
            filtered_secrets: Vec::new(),
            selected: 0,
            list_state: ListState::default(),
            current_vault: None,
            detail: Detail::Empty,
            message: None,
            loading: false,
            throbber_state: ThrobberState::default(),
            should_quit: false,
        }
    }

    /// Kick off initial vault discovery.
    pub fn start(&mut self) -> Vec<Command> {
        self.begin_loading("Discovering vaults...");
        vec![Command::DiscoverVaults]
    }

    pub fn update(&mut self, event: AppEvent) -> Vec<Command> {
        match event {
            AppEvent::Key(key) => {
                let intent = keys::route(self, key);
                self.apply(intent)
            }
            AppEvent::VaultsLoaded(result) => self.on_vaults_loaded(result),
            AppEvent::SecretsLoaded {
                vault_id,
                select,
                result,
            } => self.on_secrets_loaded(vault_id, select, result),
            AppEvent::ValueLoaded {
                vault_id,
                name,
                purpose,
                value,
            } => self.on_value_loaded(vault_id, name, purpose, value),
            AppEvent::Copied { name, result } => {
                self.loading = false;
                self.message = Some(match result {
                    Ok(()) => format!("Secret '{}' copied to clipboard", name),
                    Err(e) => format!("Copy failed: {}", e),
                });
                Vec::new()
            }
            AppEvent::Mutated {
                vault_id,
                mutation,
                result,
            } => self.on_mutated(vault_id, mutation, result),
        }
    }

    fn apply(&mut self, intent: Intent) -> Vec<Command> {
        match intent {
            Intent::Ignore => Vec::new(),
            Intent::Quit => {
                info!("Quit requested");
                self.should_quit = true;
                Vec::new()
            }
            Intent::FocusFilter => {
                self.focus = Focus::Filter;
                Vec::new()
            }
            Intent::ToggleFocus => {
                self.focus = match self.focus {
                    Focus::Filter => Focus::List,
                    _ => Focus::Filter,
                };
                Vec::new()
            }
            Intent::BlurFilter => {
                self.focus = Focus::List;
                Vec::new()
            }
            Intent::OpenPrompt => {
                self.open_command_prompt();
                Vec::new()
            }
            Intent::CancelPrompt => self.cancel_action(),
            Intent::SubmitPrompt => command::dispatch(self),
            Intent::PromptInput(edit) => {
                self.prompt.input.apply(edit);
                Vec::new()
            }
            Intent::FilterInput(edit) => {
                if self.filter.apply(edit) {
                    self.apply_filter();
                }
                Vec::new()
            }
            Intent::Back => self.back(),
            Intent::Activate => self.activate(),
            Intent::MoveSelection(delta) => {
                self.move_selection(delta);
                Vec::new()
            }
            Intent::SelectFirst => {
                self.move_selection(isize::MIN);
                Vec::new()
            }
            Intent::SelectLast => {
                self.move_selection(isize::MAX);
                Vec::new()
            }
            Intent::RefreshVaults => {
                self.begin_loading("Refreshing vaults...");
                vec![Command::DiscoverVaults]
            }
            Intent::Copy => self.copy_selected(),
            Intent::Edit => self.begin_edit(),
            Intent::Rename => self.begin_rename(),
            Intent::Move => self.begin_move(),
            Intent::Create => self.begin_create(),
        }
    }

    pub fn begin_loading(&mut self, message: &str) {
        self.loading = true;
        self.message = Some(message.to_string());
    }

    /// Report a failure inline in the detail pane and the footer.
    pub fn report(&mut self, text: String) {
        warn!("{}", text);
        self.loading = false;
        self.message = Some(text.clone());
        self.detail = Detail::Notice(text);
    }

    fn is_current_vault(&self, vault_id: &str) -> bool {
        self.current_vault.as_ref().is_some_and(|v| v.id == vault_id)
    }

    fn copy_selected(&mut self) -> Vec<Command> {
        let Some((vault, secret)) = self.detail_target() else {
            return Vec::new();
        };
        self.begin_loading("Fetching secret value...");
        vec![Command::CopyToClipboard {
            vault,
            name: secret.name,
        }]
    }

    fn on_vaults_loaded(&mut self, result: Result<Vec<VaultRef>, String>) -> Vec<Command> {
        self.loading = false;
        match result {
            Ok(vaults) => {
                debug!("VaultsLoaded: {} vaults", vaults.len());
                self.all_vaults = vaults;
                if self.all_vaults.is_empty() {
                    self.message = Some("No vaults found (press 'v' to retry)".into());
                } else {
                    self.message = Some(format!(
                        "Discovered {} vault(s). Use ↑/↓ and Enter to select.",
                        self.all_vaults.len()
                    ));
                }
                if matches!(self.view, ViewState::SelectVault | ViewState::MoveSelectTarget) {
                    self.apply_filter();
                }
            }
            Err(e) => {
                self.all_vaults.clear();
                self.filtered_vaults.clear();
                self.select(0);
                self.report(format!("Vault discovery failed: {}", e));
            }
        }
        Vec::new()
    }

    fn on_secrets_loaded(
        &mut self,
        vault_id: String,
        select: Option<String>,
        result: Result<Vec<SecretRef>, String>,
    ) -> Vec<Command> {
        if !self.is_current_vault(&vault_id) {
            debug!("Discarding stale secret listing for {}", vault_id);
            return Vec::new();
        }
        self.loading = false;
        let mut secrets = match result {
            Ok(secrets) => secrets,
            Err(e) => {
                self.report(format!("Failed to list secrets: {}", e));
                return Vec::new();
            }
        };
        secrets.sort_by(|a, b| a.name.cmp(&b.name));
        let highlighted = self.selected_secret().map(|s| s.name.clone());
        self.all_secrets = secrets;
        let vault_name = self
            .current_vault
            .as_ref()
            .map(|v| v.name.clone())
            .unwrap_or_default();
        self.message = Some(format!(
            "Loaded {} secrets (from {})",
            self.all_secrets.len(),
            vault_name
        ));
        if !matches!(self.view, ViewState::ListSecrets { .. }) {
            self.filtered_secrets = self.all_secrets.clone();
            return Vec::new();
        }

        self.view = ViewState::ListSecrets { detail: false };
        self.reset_filter();
        let Some(name) = select else {
            // a reload keeps the user's place when the secret is still there
            if let Some(index) = highlighted
                .and_then(|h| self.filtered_secrets.iter().position(|s| s.name == h))
            {
                self.select(index);
            }
            self.show_preview();
            return Vec::new();
        };
        match self.filtered_secrets.iter().position(|s| s.name == name) {
            Some(index) => {
                self.select(index);
                self.show_preview();
                self.open_selected()
            }
            None => {
                self.show_preview();
                Vec::new()
            }
        }
    }

    fn on_value_loaded(
        &mut self,
        vault_id: String,
        name: String,
        purpose: ValuePurpose,
        value: Option<String>,
    ) -> Vec<Command> {
        let still_selected = self.selected_secret().is_some_and(|s| s.name == name);
        if !self.is_current_vault(&vault_id) || !still_selected {
            debug!("Discarding stale value for '{}'", name);
            return Vec::new();
        }
        self.loading = false;
        match purpose {
            ValuePurpose::Detail => {
                if !matches!(self.view, ViewState::ListSecrets { .. }) {
                    return Vec::new();
                }
                if let Some(secret) = self.selected_secret().cloned() {
                    self.message = Some(format!("Showing '{}'", secret.name));
                    self.detail = Detail::Full { secret, value };
                    self.view = ViewState::ListSecrets { detail: true };
                }
                Vec::new()
            }
            ValuePurpose::Edit => {
                if self.view != (ViewState::ListSecrets { detail: true }) || !self.action.is_none() {
                    return Vec::new();
                }
                self.open_edit(name, value);
                Vec::new()
            }
        }
    }

    fn on_mutated(
        &mut self,
        vault_id: String,
        mutation: Mutation,
        result: Result<(), String>,
    ) -> Vec<Command> {
        self.loading = false;
        if let Err(e) = result {
            self.report(format!("{} failed: {}", mutation.describe(), e));
            return Vec::new();
        }
        info!("{}", mutation.success_message());
        self.message = Some(mutation.success_message());
        let Some(vault) = self.current_vault.clone().filter(|v| v.id == vault_id) else {
            debug!("Vault changed since mutation; not reloading");
            return Vec::new();
        };
        match mutation {
            Mutation::Edited { name } => {
                if self.selected_secret().is_some_and(|s| s.name == name) {
                    self.loading = true;
                    vec![Command::LoadValue {
                        vault,
                        name,
                        purpose: ValuePurpose::Detail,
                    }]
                } else {
                    Vec::new()
                }
            }
            Mutation::Created { name } => {
                self.loading = true;
                vec![Command::LoadSecrets {
                    vault,
                    select: Some(name),
                }]
            }
            Mutation::Renamed { .. } | Mutation::Moved { .. } => {
                self.loading = true;
                vec![Command::LoadSecrets {
                    vault,
                    select: None,
                }]
            }
        }
    }
}
