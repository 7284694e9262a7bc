use ::clipboard::{ClipboardContext, ClipboardProvider};

use crate::error::{AppError, Result};

pub trait Clipboard {
    fn copy(&self, text: &str) -> Result<()>;
}

/// Platform clipboard. A fresh context per copy, since availability can change
/// under us (e.g. an X11 session going away).
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<()> {
        let mut ctx: ClipboardContext = ClipboardProvider::new()
            .map_err(|e| AppError::Clipboard(format!("init failed: {}", e)))?;
        ctx.set_contents(text.to_string())
            .map_err(|e| AppError::Clipboard(e.to_string()))
    }
}
