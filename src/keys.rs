use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::App;
use crate::model::{Focus, ViewState};
use crate::prompt::TextEdit;

/// What a key press means in the current (view, focus, action mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Ignore,
    Quit,
    FocusFilter,
    ToggleFocus,
    BlurFilter,
    OpenPrompt,
    CancelPrompt,
    SubmitPrompt,
    PromptInput(TextEdit),
    FilterInput(TextEdit),
    Back,
    Activate,
    MoveSelection(isize),
    SelectFirst,
    SelectLast,
    RefreshVaults,
    Copy,
    Edit,
    Rename,
    Move,
    Create,
}

/// First matching rule wins; later rules are not consulted.
pub fn route(app: &App, key: KeyEvent) -> Intent {
    if key.kind == KeyEventKind::Release {
        return Intent::Ignore;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Intent::Quit;
    }

    match key.code {
        KeyCode::Esc => {
            return if app.prompt.visible {
                Intent::CancelPrompt
            } else if app.focus == Focus::Filter {
                Intent::BlurFilter
            } else {
                Intent::Back
            };
        }
        KeyCode::Tab => {
            return if app.focus == Focus::Command {
                Intent::Ignore
            } else {
                Intent::ToggleFocus
            };
        }
        _ => {}
    }

    // focused text inputs swallow printable keys
    match app.focus {
        Focus::Command => {
            return match key.code {
                KeyCode::Enter => Intent::SubmitPrompt,
                _ => text_edit(key).map_or(Intent::Ignore, Intent::PromptInput),
            };
        }
        Focus::Filter => {
            return match key.code {
                // names never contain these, so the filter gives them up
                KeyCode::Char('/') => Intent::FocusFilter,
                KeyCode::Char(':') => Intent::OpenPrompt,
                KeyCode::Enter => Intent::BlurFilter,
                KeyCode::Up => Intent::MoveSelection(-1),
                KeyCode::Down => Intent::MoveSelection(1),
                _ => text_edit(key).map_or(Intent::Ignore, Intent::FilterInput),
            };
        }
        Focus::List => {}
    }

    match key.code {
        KeyCode::Char('/') => return Intent::FocusFilter,
        KeyCode::Char(':') => return Intent::OpenPrompt,
        _ => {}
    }

    if app.view == (ViewState::ListSecrets { detail: true }) {
        match key.code {
            KeyCode::Char('c') => return Intent::Copy,
            KeyCode::Char('e') => return Intent::Edit,
            KeyCode::Char('r') => return Intent::Rename,
            KeyCode::Char('m') => return Intent::Move,
            _ => {}
        }
    }

    if matches!(app.view, ViewState::ListSecrets { .. }) && key.code == KeyCode::Char('n') {
        return Intent::Create;
    }

    match key.code {
        KeyCode::Char('b') => Intent::Back,
        KeyCode::Enter if !app.prompt.visible => Intent::Activate,
        KeyCode::Down | KeyCode::Char('j') => Intent::MoveSelection(1),
        KeyCode::Up | KeyCode::Char('k') => Intent::MoveSelection(-1),
        KeyCode::PageDown => Intent::MoveSelection(10),
        KeyCode::PageUp => Intent::MoveSelection(-10),
        KeyCode::Home | KeyCode::Char('g') => Intent::SelectFirst,
        KeyCode::End | KeyCode::Char('G') => Intent::SelectLast,
        KeyCode::Char('v') if app.view == ViewState::SelectVault => Intent::RefreshVaults,
        _ => Intent::Ignore,
    }
}

fn text_edit(key: KeyEvent) -> Option<TextEdit> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('u') if ctrl => Some(TextEdit::Clear),
        KeyCode::Char('a') if ctrl => Some(TextEdit::Home),
        KeyCode::Char('e') if ctrl => Some(TextEdit::End),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(c) => Some(TextEdit::Insert(c)),
        KeyCode::Backspace => Some(TextEdit::Backspace),
        KeyCode::Delete => Some(TextEdit::Delete),
        KeyCode::Left => Some(TextEdit::Left),
        KeyCode::Right => Some(TextEdit::Right),
        KeyCode::Home => Some(TextEdit::Home),
        KeyCode::End => Some(TextEdit::End),
        _ => None,
    }
}
