use std::collections::VecDeque;
use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CEvent};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, warn};

use crate::app::App;
use crate::cache::SecretValueCache;
use crate::clipboard::Clipboard;
use crate::error::{AppError, Result};
use crate::model::{AppEvent, Command, Mutation, VaultRef};
use crate::store::SecretStore;
use crate::ui::draw_ui;

/// Everything a `Command` may touch outside of `App`.
pub struct Services {
    pub store: Arc<dyn SecretStore>,
    pub cache: SecretValueCache,
    clipboard: Box<dyn Clipboard>,
}

impl Services {
    pub fn new(store: Arc<dyn SecretStore>, clipboard: Box<dyn Clipboard>) -> Self {
        Self {
            store,
            cache: SecretValueCache::new(),
            clipboard,
        }
    }

    /// Run one command to completion and report its outcome.
    pub async fn execute(&self, command: Command) -> Option<AppEvent> {
        match command {
            Command::DiscoverVaults => {
                debug!("Discovering vaults");
                let result = self.store.list_vaults().await.map_err(|e| e.to_string());
                Some(AppEvent::VaultsLoaded(result))
            }
            Command::InvalidateCache => {
                self.cache.invalidate_all().await;
                None
            }
            Command::LoadSecrets { vault, select } => {
                let result = self
                    .store
                    .list_secret_metadata(&vault)
                    .await
                    .map_err(|e| e.to_string());
                Some(AppEvent::SecretsLoaded {
                    vault_id: vault.id,
                    select,
                    result,
                })
            }
            Command::LoadValue {
                vault,
                name,
                purpose,
            } => {
                let value = self.cache.get(&self.store, &vault, &name).await;
                Some(AppEvent::ValueLoaded {
                    vault_id: vault.id,
                    name,
                    purpose,
                    value,
                })
            }
            Command::CopyToClipboard { vault, name } => {
                let result = self
                    .copy_to_clipboard(&vault, &name)
                    .await
                    .map_err(|e| e.to_string());
                Some(AppEvent::Copied { name, result })
            }
            Command::SaveValue { vault, name, value } => {
                let result = self.save(&vault, &name, value).await.map_err(|e| e.to_string());
                Some(AppEvent::Mutated {
                    vault_id: vault.id,
                    mutation: Mutation::Edited { name },
                    result,
                })
            }
            Command::CreateSecret { vault, name, value } => {
                let result = self.save(&vault, &name, value).await.map_err(|e| e.to_string());
                Some(AppEvent::Mutated {
                    vault_id: vault.id,
                    mutation: Mutation::Created { name },
                    result,
                })
            }
            Command::RenameSecret { vault, from, to } => {
                let result = self
                    .rename(&vault, &from, &to)
                    .await
                    .map_err(|e| e.to_string());
                Some(AppEvent::Mutated {
                    vault_id: vault.id,
                    mutation: Mutation::Renamed { from, to },
                    result,
                })
            }
            Command::CopyToVault {
                source,
                target,
                name,
                new_name,
            } => {
                let result = self
                    .copy_to_vault(&source, &target, &name, &new_name)
                    .await
                    .map_err(|e| e.to_string());
                Some(AppEvent::Mutated {
                    vault_id: source.id,
                    mutation: Mutation::Moved {
                        name,
                        target: target.name,
                        new_name,
                    },
                    result,
                })
            }
        }
    }

    async fn value_of(&self, vault: &VaultRef, name: &str) -> Result<String> {
        self.cache
            .get(&self.store, vault, name)
            .await
            .ok_or_else(|| AppError::ValueUnavailable(name.to_string()))
    }

    async fn copy_to_clipboard(&self, vault: &VaultRef, name: &str) -> Result<()> {
        let value = self.value_of(vault, name).await?;
        self.clipboard.copy(&value)
    }

    async fn save(&self, vault: &VaultRef, name: &str, value: String) -> Result<()> {
        self.store.set_secret_value(vault, name, &value).await?;
        self.cache.set(name, value).await;
        Ok(())
    }

    /// Copy under the new name, then delete the old one. The delete is best-effort.
    async fn rename(&self, vault: &VaultRef, from: &str, to: &str) -> Result<()> {
        let value = self.value_of(vault, from).await?;
        self.save(vault, to, value).await?;
        if let Err(e) = self.store.delete_secret(vault, from).await {
            warn!("Rename kept old secret '{}': delete failed: {}", from, e);
        }
        self.cache.forget(from).await;
        Ok(())
    }

    /// Write the source value into the target vault. The source is left untouched.
    async fn copy_to_vault(
        &self,
        source: &VaultRef,
        target: &VaultRef,
        name: &str,
        new_name: &str,
    ) -> Result<()> {
        let value = self.value_of(source, name).await?;
        self.store.set_secret_value(target, new_name, &value).await?;
        if target.id == source.id {
            self.cache.set(new_name, value).await;
        }
        Ok(())
    }
}

/// Execute `commands` and everything they lead to, feeding each outcome back
/// into `app` before the next command starts. `redraw` runs before each
/// command and on every tick while one is pending.
pub async fn drain<F>(
    app: &mut App,
    services: &Services,
    commands: Vec<Command>,
    tick_rate: Duration,
    mut redraw: F,
) -> Result<()>
where
    F: FnMut(&mut App) -> Result<()>,
{
    let mut queue = VecDeque::from(commands);
    let mut ticker = tokio::time::interval(tick_rate);
    while let Some(command) = queue.pop_front() {
        redraw(app)?;
        let pending = services.execute(command);
        tokio::pin!(pending);
        let outcome = loop {
            tokio::select! {
                outcome = &mut pending => break outcome,
                _ = ticker.tick() => {
                    app.throbber_state.calc_next();
                    redraw(app)?;
                }
            }
        };
        if let Some(event) = outcome {
            queue.extend(app.update(event));
        }
    }
    Ok(())
}

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Main loop: one key at a time, each fully handled before the next is read.
pub async fn run(
    terminal: &mut Tui,
    app: &mut App,
    services: &Services,
    tick_rate: Duration,
) -> Result<()> {
    let mut draw = |app: &mut App| -> Result<()> {
        terminal.draw(|f| draw_ui(f, app))?;
        Ok(())
    };

    let initial = app.start();
    drain(app, services, initial, tick_rate, &mut draw).await?;

    let mut last_tick = Instant::now();
    while !app.should_quit {
        if last_tick.elapsed() >= tick_rate {
            if app.loading {
                app.throbber_state.calc_next();
            }
            draw(app)?;
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(20))? {
            if let CEvent::Key(key) = event::read()? {
                let commands = app.update(AppEvent::Key(key));
                drain(app, services, commands, tick_rate, &mut draw).await?;
                draw(app)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionMode;
    use crate::clipboard::recording::RecordingClipboard;
    use crate::model::{Detail, Focus, ViewState};
    use crate::store::memory::MemoryStore;
    use crate::store::memory::vault;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    const TICK: Duration = Duration::from_millis(50);

    struct Harness {
        app: App,
        services: Services,
        store: Arc<MemoryStore>,
        clipboard: RecordingClipboard,
    }

    impl Harness {
        async fn new(store: MemoryStore) -> Self {
            let store = Arc::new(store);
            let clipboard = RecordingClipboard::default();
            let services = Services::new(store.clone(), Box::new(clipboard.clone()));
            let mut app = App::new();
            let initial = app.start();
            drain(&mut app, &services, initial, TICK, |_| Ok(()))
                .await
                .unwrap();
            Self {
                app,
                services,
                store,
                clipboard,
            }
        }

        async fn key(&mut self, code: KeyCode) {
            let commands = self
                .app
                .update(AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
            drain(&mut self.app, &self.services, commands, TICK, |_| Ok(()))
                .await
                .unwrap();
        }

        async fn keys(&mut self, codes: &[KeyCode]) {
            for code in codes {
                self.key(*code).await;
            }
        }

        async fn type_text(&mut self, text: &str) {
            for c in text.chars() {
                self.key(KeyCode::Char(c)).await;
            }
        }

        /// alpha -> db-password detail view
        async fn open_db_password(&mut self) {
            self.keys(&[KeyCode::Enter, KeyCode::Down, KeyCode::Enter]).await;
            assert_eq!(self.app.view, ViewState::ListSecrets { detail: true });
            assert_eq!(
                self.app.selected_secret().map(|s| s.name.as_str()),
                Some("db-password")
            );
        }

        fn secret_names(&self) -> Vec<&str> {
            self.app
                .filtered_secrets
                .iter()
                .map(|s| s.name.as_str())
                .collect()
        }
    }

    fn two_vaults() -> MemoryStore {
        MemoryStore::new(vec![vault("beta"), vault("alpha")])
            .with_secret("alpha", "api-key", Some("k-123"))
            .with_secret("alpha", "db-password", Some("hunter2"))
            .with_secret("alpha", "locked", None)
            .with_secret("beta", "unrelated", Some("x"))
    }

    #[tokio::test]
    async fn test_browse_into_secret_detail() {
        let mut h = Harness::new(two_vaults()).await;
        let names: Vec<&str> = h.app.filtered_vaults.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        h.key(KeyCode::Enter).await;
        assert_eq!(h.app.view, ViewState::ListSecrets { detail: false });
        assert_eq!(h.secret_names(), vec!["api-key", "db-password", "locked"]);

        h.keys(&[KeyCode::Down, KeyCode::Enter]).await;
        match &h.app.detail {
            Detail::Full { secret, value } => {
                assert_eq!(secret.name, "db-password");
                assert_eq!(value.as_deref(), Some("hunter2"));
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_denied_value_is_cached_and_not_refetched() {
        let mut h = Harness::new(two_vaults()).await;
        h.keys(&[KeyCode::Enter, KeyCode::End, KeyCode::Enter]).await;
        assert!(matches!(h.app.detail, Detail::Full { value: None, .. }));

        h.keys(&[KeyCode::Char('b'), KeyCode::Enter]).await;
        assert!(matches!(h.app.detail, Detail::Full { value: None, .. }));
        assert_eq!(h.store.fetches(), 1);
    }

    #[tokio::test]
    async fn test_filter_narrows_and_back_from_filter_keeps_text() {
        let mut h = Harness::new(two_vaults()).await;
        h.key(KeyCode::Enter).await;
        h.key(KeyCode::Char('/')).await;
        assert_eq!(h.app.focus, Focus::Filter);
        h.type_text("DB").await;
        assert_eq!(h.secret_names(), vec!["db-password"]);
        assert_eq!(h.app.selected, 0);

        h.key(KeyCode::Esc).await;
        assert_eq!(h.app.focus, Focus::List);
        assert_eq!(h.app.filter.value(), "DB");
        assert_eq!(h.app.all_secrets.len(), 3);
    }

    #[tokio::test]
    async fn test_colon_opens_prompt_from_filter() {
        let mut h = Harness::new(two_vaults()).await;
        h.keys(&[KeyCode::Char('/'), KeyCode::Char('/'), KeyCode::Char(':')]).await;
        assert_eq!(h.app.filter.value(), "");
        assert!(h.app.prompt.visible);
        assert_eq!(h.app.focus, Focus::Command);

        h.keys(&[KeyCode::Char('q'), KeyCode::Enter]).await;
        assert!(h.app.should_quit);
    }

    #[tokio::test]
    async fn test_copy_goes_through_cache_to_clipboard() {
        let mut h = Harness::new(two_vaults()).await;
        h.open_db_password().await;
        h.key(KeyCode::Char('c')).await;
        assert_eq!(*h.clipboard.copied.lock().unwrap(), vec!["hunter2".to_string()]);
        assert_eq!(h.store.fetches(), 1);
    }

    #[tokio::test]
    async fn test_edit_saves_and_reloads_detail_from_cache() {
        let mut h = Harness::new(two_vaults()).await;
        h.open_db_password().await;

        h.key(KeyCode::Char('e')).await;
        assert_eq!(h.app.prompt.input.value(), "hunter2");
        h.app.prompt.input.clear();
        h.type_text("correct horse").await;
        h.key(KeyCode::Enter).await;

        assert_eq!(
            h.store.value("alpha", "db-password"),
            Some(Some("correct horse".to_string()))
        );
        assert!(matches!(
            h.app.detail,
            Detail::Full { ref value, .. } if value.as_deref() == Some("correct horse")
        ));
        assert!(h.app.action.is_none());
        assert_eq!(h.app.focus, Focus::List);
        assert_eq!(h.store.fetches(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_edit_changes_nothing() {
        let mut h = Harness::new(two_vaults()).await;
        h.open_db_password().await;
        h.key(KeyCode::Char('e')).await;
        h.type_text("garbage").await;
        h.key(KeyCode::Esc).await;

        assert_eq!(h.store.value("alpha", "db-password"), Some(Some("hunter2".into())));
        assert!(h.app.action.is_none());
        assert!(!h.app.prompt.visible);
        assert_eq!(h.app.view, ViewState::ListSecrets { detail: true });
    }

    #[tokio::test]
    async fn test_rename_copies_value_and_deletes_old() {
        let mut h = Harness::new(two_vaults()).await;
        h.open_db_password().await;
        h.key(KeyCode::Char('r')).await;
        h.type_text("db-pass-2").await;
        h.key(KeyCode::Enter).await;

        assert_eq!(h.store.value("alpha", "db-pass-2"), Some(Some("hunter2".into())));
        assert_eq!(h.store.value("alpha", "db-password"), None);
        assert_eq!(h.store.deletes(), 1);
        assert_eq!(h.secret_names(), vec!["api-key", "db-pass-2", "locked"]);
        assert!(h.app.action.is_none());
    }

    #[tokio::test]
    async fn test_rename_survives_failed_delete() {
        let mut h = Harness::new(two_vaults().failing_deletes()).await;
        h.open_db_password().await;
        h.key(KeyCode::Char('r')).await;
        h.type_text("db-pass-2").await;
        h.key(KeyCode::Enter).await;

        assert_eq!(h.store.deletes(), 1);
        assert_eq!(h.store.value("alpha", "db-pass-2"), Some(Some("hunter2".into())));
        assert_eq!(h.store.value("alpha", "db-password"), Some(Some("hunter2".into())));
        assert!(h.app.action.is_none());
        assert!(!matches!(h.app.detail, Detail::Notice(_)));
    }

    #[tokio::test]
    async fn test_move_by_list_selection_copies_without_touching_source() {
        let mut h = Harness::new(two_vaults()).await;
        h.open_db_password().await;

        h.key(KeyCode::Char('m')).await;
        assert_eq!(h.app.view, ViewState::MoveSelectTarget);
        h.keys(&[KeyCode::Down, KeyCode::Enter]).await;
        assert!(matches!(h.app.action, ActionMode::MoveNewName { ref target, .. } if target.name == "beta"));
        assert_eq!(h.app.prompt.input.value(), "db-password");

        h.type_text("-copy").await;
        h.key(KeyCode::Enter).await;

        assert_eq!(h.store.value("beta", "db-password-copy"), Some(Some("hunter2".into())));
        assert_eq!(h.store.value("alpha", "db-password"), Some(Some("hunter2".into())));
        assert!(h.app.action.is_none());
        assert_eq!(h.app.view, ViewState::ListSecrets { detail: false });
        assert_eq!(h.secret_names(), vec!["api-key", "db-password", "locked"]);
        assert_eq!(
            h.app.selected_secret().map(|s| s.name.as_str()),
            Some("db-password")
        );
    }

    #[tokio::test]
    async fn test_move_by_typed_vault_name() {
        let mut h = Harness::new(two_vaults()).await;
        h.open_db_password().await;
        h.key(KeyCode::Char('m')).await;

        h.key(KeyCode::Char(':')).await;
        h.type_text("gamma").await;
        h.key(KeyCode::Enter).await;
        assert!(matches!(h.app.action, ActionMode::MoveTarget { .. }));
        assert!(matches!(h.app.detail, Detail::Notice(ref t) if t.contains("Vault not found")));

        h.app.prompt.input.clear();
        h.type_text("BETA").await;
        h.key(KeyCode::Enter).await;
        assert!(matches!(h.app.action, ActionMode::MoveNewName { .. }));

        // blank keeps the original name
        h.app.prompt.input.clear();
        h.key(KeyCode::Enter).await;
        assert_eq!(h.store.value("beta", "db-password"), Some(Some("hunter2".into())));
    }

    #[tokio::test]
    async fn test_back_navigation_unwinds_move_first() {
        let mut h = Harness::new(two_vaults()).await;
        h.open_db_password().await;
        let secrets_before = h.app.all_secrets.clone();

        h.key(KeyCode::Char('m')).await;
        h.keys(&[KeyCode::Down, KeyCode::Enter]).await;
        assert!(matches!(h.app.action, ActionMode::MoveNewName { .. }));

        h.key(KeyCode::Esc).await;
        assert!(matches!(h.app.action, ActionMode::MoveTarget { .. }));
        assert_eq!(h.app.view, ViewState::MoveSelectTarget);
        assert_eq!(h.app.filtered_vaults.len(), 2);
        assert_eq!(h.app.all_secrets, secrets_before);

        h.key(KeyCode::Esc).await;
        assert!(h.app.action.is_none());
        assert_eq!(h.app.view, ViewState::ListSecrets { detail: false });
    }

    #[tokio::test]
    async fn test_create_preseeds_cache_and_opens_new_secret() {
        let mut h = Harness::new(two_vaults()).await;
        h.key(KeyCode::Enter).await;

        h.key(KeyCode::Char('n')).await;
        h.type_text("foo").await;
        h.key(KeyCode::Enter).await;
        assert_eq!(h.app.action, ActionMode::CreateValue { name: "foo".into() });
        h.type_text("bar").await;
        h.key(KeyCode::Enter).await;

        assert!(h.secret_names().contains(&"foo"));
        assert_eq!(h.app.selected_secret().map(|s| s.name.as_str()), Some("foo"));
        assert_eq!(h.app.view, ViewState::ListSecrets { detail: true });
        assert!(matches!(
            h.app.detail,
            Detail::Full { ref value, .. } if value.as_deref() == Some("bar")
        ));
        assert_eq!(h.store.fetches(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_reports_and_resets() {
        let mut h = Harness::new(two_vaults().failing_writes()).await;
        h.key(KeyCode::Enter).await;
        h.key(KeyCode::Char('n')).await;
        h.type_text("foo").await;
        h.key(KeyCode::Enter).await;
        h.type_text("bar").await;
        h.key(KeyCode::Enter).await;

        assert!(h.app.action.is_none());
        assert_eq!(h.app.focus, Focus::List);
        assert!(matches!(h.app.detail, Detail::Notice(ref t) if t.contains("read-only")));
        assert!(!h.secret_names().contains(&"foo"));
    }

    #[tokio::test]
    async fn test_quit_command_only_without_workflow() {
        let mut h = Harness::new(two_vaults()).await;
        h.open_db_password().await;

        h.key(KeyCode::Char('r')).await;
        h.type_text("q").await;
        h.key(KeyCode::Enter).await;
        assert!(!h.app.should_quit);
        assert_eq!(h.store.value("alpha", "q"), Some(Some("hunter2".into())));

        h.keys(&[KeyCode::Char(':'), KeyCode::Char('q'), KeyCode::Enter]).await;
        assert!(h.app.should_quit);
    }

    #[tokio::test]
    async fn test_discovery_failure_leaves_app_usable() {
        let mut h = Harness::new(two_vaults().failing_discovery()).await;
        assert!(matches!(h.app.detail, Detail::Notice(ref t) if t.contains("Vault discovery failed")));
        h.keys(&[KeyCode::Enter, KeyCode::Down, KeyCode::Esc]).await;
        assert_eq!(h.app.view, ViewState::SelectVault);
        assert!(!h.app.should_quit);
    }

    #[tokio::test]
    async fn test_switching_vaults_invalidates_cache() {
        let mut h = Harness::new(two_vaults()).await;
        h.open_db_password().await;
        assert!(h.services.cache.contains("db-password").await);

        h.keys(&[KeyCode::Esc, KeyCode::Esc]).await;
        assert_eq!(h.app.view, ViewState::SelectVault);
        assert!(!h.services.cache.contains("db-password").await);
    }
}
