use tui_input::{Input, InputRequest};

/// Edits accepted by a single-line input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEdit {
    Insert(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Clear,
}

impl From<TextEdit> for InputRequest {
    fn from(edit: TextEdit) -> Self {
        match edit {
            TextEdit::Insert(c) => InputRequest::InsertChar(c),
            TextEdit::Backspace => InputRequest::DeletePrevChar,
            TextEdit::Delete => InputRequest::DeleteNextChar,
            TextEdit::Left => InputRequest::GoToPrevChar,
            TextEdit::Right => InputRequest::GoToNextChar,
            TextEdit::Home => InputRequest::GoToStart,
            TextEdit::End => InputRequest::GoToEnd,
            TextEdit::Clear => InputRequest::DeleteLine,
        }
    }
}

/// Single-line text input backed by `tui_input`.
#[derive(Debug, Clone, Default)]
pub struct LineInput {
    input: Input,
}

impl LineInput {
    pub fn value(&self) -> &str {
        self.input.value()
    }

    /// Terminal column of the cursor, accounting for wide chars.
    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    /// Replace the text and put the cursor at its end.
    pub fn set(&mut self, value: &str) {
        self.input = Input::new(value.to_string());
    }

    pub fn clear(&mut self) {
        self.input.reset();
    }

    /// Returns true when the text changed.
    pub fn apply(&mut self, edit: TextEdit) -> bool {
        self.input
            .handle(edit.into())
            .is_some_and(|changed| changed.value)
    }
}

/// The shared command prompt. Whoever opens it sets the label describing
/// what the submitted text will be used for.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub input: LineInput,
    pub label: String,
    pub visible: bool,
}

impl Prompt {
    pub fn open(&mut self, label: impl Into<String>, prefill: &str) {
        self.label = label.into();
        self.input.set(prefill);
        self.visible = true;
    }

    pub fn close(&mut self) {
        self.visible = false;
        self.label.clear();
        self.input.clear();
    }
}
