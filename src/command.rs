use tracing::{debug, info};

use crate::action::ActionMode;
use crate::app::App;
use crate::model::Command;

/// Commands understood by the prompt when no workflow owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevel {
    Quit,
}

impl TopLevel {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "q" | "quit" => Some(TopLevel::Quit),
            _ => None,
        }
    }
}

/// Route a prompt submission. The active mode is taken out of the state before
/// the step runs, so every path ends in `None` unless the step re-arms it.
pub fn dispatch(app: &mut App) -> Vec<Command> {
    let text = app.prompt.input.value().to_string();
    match std::mem::take(&mut app.action) {
        ActionMode::None => {
            app.close_prompt();
            match TopLevel::parse(&text) {
                Some(TopLevel::Quit) => {
                    info!("Quit via command prompt");
                    app.should_quit = true;
                }
                None => debug!("Ignoring prompt input with no active workflow"),
            }
            Vec::new()
        }
        ActionMode::EditValue { secret } => app.submit_edit(secret, text),
        ActionMode::Rename { secret } => app.submit_rename(secret, text),
        ActionMode::MoveTarget { secret } => app.submit_move_target(secret, text),
        ActionMode::MoveNewName { secret, target } => app.submit_move(secret, target, text),
        ActionMode::CreateName => app.submit_create_name(text),
        ActionMode::CreateValue { name } => app.submit_create(name, text),
    }
}
