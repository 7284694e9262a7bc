use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use throbber_widgets_tui::{BRAILLE_SIX, Throbber, WhichUse};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::app::App;
use crate::model::{Detail, Focus, SecretRef, VaultRef, ViewState};

const UNAVAILABLE: &str = "<value unavailable>";

/// Draw the single browser screen: header, list + detail, filter, prompt, footer.
pub fn draw_ui(f: &mut Frame<'_>, app: &mut App) {
    let area = f.area();
    let outer_block = Block::default().borders(Borders::ALL).title(Span::styled(
        "Azure Key Vault Browser",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ));
    let inner = outer_block.inner(area);
    f.render_widget(outer_block, area);

    let prompt_height = if app.prompt.visible { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(3),
            Constraint::Length(prompt_height),
            Constraint::Length(3),
        ])
        .split(inner);

    draw_header(f, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);
    draw_list(f, app, body[0]);

    let detail = Paragraph::new(describe(&app.detail))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Detail"));
    f.render_widget(detail, body[1]);

    let filter_style = focused_style(app.focus == Focus::Filter);
    let filter = Paragraph::new(app.filter.value())
        .style(filter_style)
        .block(Block::default().borders(Borders::ALL).title("Filter (/)"));
    f.render_widget(filter, chunks[2]);

    if app.prompt.visible {
        let prompt = Paragraph::new(app.prompt.input.value())
            .style(focused_style(true))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("{} (Enter: submit, Esc: cancel)", app.prompt.label)),
            );
        f.render_widget(prompt, chunks[3]);
    }

    draw_footer(f, app, chunks[4]);

    match app.focus {
        Focus::Filter => place_cursor(f, chunks[2], app.filter.visual_cursor()),
        Focus::Command if app.prompt.visible => {
            place_cursor(f, chunks[3], app.prompt.input.visual_cursor())
        }
        _ => {}
    }
}

fn draw_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let location = match (&app.view, &app.current_vault) {
        (ViewState::SelectVault, _) => "Select a vault".to_string(),
        (ViewState::MoveSelectTarget, _) => "Select target vault".to_string(),
        (ViewState::ListSecrets { .. }, Some(vault)) => format!("Vault: {}", vault.name),
        (ViewState::ListSecrets { .. }, None) => "Secrets".to_string(),
    };
    let mode = match app.action.label() {
        "" => String::new(),
        label => format!(" [{}]", label),
    };
    let text = format!("{}{} | {}", location, mode, hints(app.view));
    let header = Paragraph::new(text)
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL).title("Header"));
    f.render_widget(header, area);
}

fn hints(view: ViewState) -> &'static str {
    match view {
        ViewState::SelectVault => "Enter: open  /: filter  v: refresh  :q quit",
        ViewState::ListSecrets { detail: false } => {
            "Enter: show  n: new  /: filter  Esc: vaults  :q quit"
        }
        ViewState::ListSecrets { detail: true } => {
            "c: copy  e: edit  r: rename  m: move  n: new  Esc: back"
        }
        ViewState::MoveSelectTarget => "Enter: choose  :: type name  Esc: cancel",
    }
}

fn draw_list(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let (title, names): (&str, Vec<String>) = match app.view {
        ViewState::SelectVault | ViewState::MoveSelectTarget => (
            "Vaults",
            app.filtered_vaults.iter().map(|v| v.name.clone()).collect(),
        ),
        ViewState::ListSecrets { .. } => (
            "Secrets",
            app.filtered_secrets.iter().map(|s| s.name.clone()).collect(),
        ),
    };
    let items: Vec<ListItem> = if names.is_empty() {
        let placeholder = if app.loading {
            "Loading..."
        } else if app.filter.value().is_empty() {
            "Nothing here"
        } else {
            "No matches"
        };
        vec![ListItem::new(placeholder).style(Style::default().fg(Color::DarkGray))]
    } else {
        names.into_iter().map(ListItem::new).collect()
    };
    let title = format!("{} ({})", title, app.list_len());
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focused_style(app.focus == Focus::List))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    f.render_stateful_widget(list, area, &mut app.list_state);
}

fn draw_footer(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(16)])
        .split(area);

    let footer = Paragraph::new(app.message.clone().unwrap_or_default())
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title("Message"));
    f.render_widget(footer, parts[0]);

    if app.loading {
        let throbber = Throbber::default()
            .label(" Working...")
            .style(Style::default().fg(Color::Yellow))
            .throbber_set(BRAILLE_SIX)
            .use_type(WhichUse::Spin);
        let block = Block::default().borders(Borders::ALL);
        let spinner_area = block.inner(parts[1]);
        f.render_widget(block, parts[1]);
        f.render_stateful_widget(throbber, spinner_area, &mut app.throbber_state);
    }
}

fn focused_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn place_cursor(f: &mut Frame<'_>, area: Rect, cursor: usize) {
    let max = area.width.saturating_sub(2);
    let offset = u16::try_from(cursor).unwrap_or(u16::MAX).min(max);
    f.set_cursor_position(Position::new(area.x + 1 + offset, area.y + 1));
}

/// Text of the detail pane.
pub fn describe(detail: &Detail) -> String {
    match detail {
        Detail::Empty => String::new(),
        Detail::Notice(text) => text.clone(),
        Detail::Vault(vault) => describe_vault(vault),
        Detail::Preview(secret) => {
            format!("{}\nPress Enter to show the value.", describe_secret(secret))
        }
        Detail::Full { secret, value } => format!(
            "{}\nValue:\n{}",
            describe_secret(secret),
            value.as_deref().unwrap_or(UNAVAILABLE)
        ),
    }
}

fn describe_vault(vault: &VaultRef) -> String {
    let mut lines = vec![format!("Vault: {}", vault.name), format!("URI: {}", vault.uri)];
    if let Some(location) = &vault.location {
        lines.push(format!("Location: {}", location));
    }
    lines.push(format!("Id: {}", vault.id));
    lines.join("\n")
}

fn describe_secret(secret: &SecretRef) -> String {
    let mut lines = vec![format!("Name: {}", secret.name)];
    if let Some(content_type) = &secret.content_type {
        lines.push(format!("Content type: {}", content_type));
    }
    if let Some(enabled) = secret.enabled {
        lines.push(format!("Enabled: {}", if enabled { "yes" } else { "no" }));
    }
    for (label, stamp) in [
        ("Created", secret.created_on),
        ("Updated", secret.updated_on),
        ("Expires", secret.expires_on),
    ] {
        if let Some(stamp) = stamp {
            lines.push(format!("{}: {}", label, timestamp(stamp)));
        }
    }
    if !secret.tags.is_empty() {
        lines.push("Tags:".to_string());
        for (key, value) in &secret.tags {
            lines.push(format!("  {} = {}", key, value));
        }
    }
    lines.join("\n")
}

fn timestamp(stamp: OffsetDateTime) -> String {
    stamp.format(&Rfc3339).unwrap_or_else(|_| stamp.to_string())
}
