use crate::themes::Theme;
use ratatui::text::{Line, Span};

/// Key bindings listed in the footer.
pub const KEY_HELP: &str =
    "q quit | Tab mode | ←/→ month | ,/. start month | e export | PgUp/PgDn scroll";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// One-line message shown above the key help.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

/// Footer: the current status message (if any) and the key help.
pub struct StatusBar<'a> {
    pub status: Option<&'a StatusMessage>,
    pub theme: &'a Theme,
}

impl<'a> StatusBar<'a> {
    pub fn new(status: Option<&'a StatusMessage>, theme: &'a Theme) -> Self {
        Self { status, theme }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let status = match self.status {
            Some(msg) => {
                let style = match msg.kind {
                    StatusKind::Info => self.theme.info,
                    StatusKind::Success => self.theme.success,
                    StatusKind::Error => self.theme.error,
                };
                Line::from(Span::styled(msg.text.clone(), style))
            }
            None => Line::from(""),
        };
        vec![status, Line::from(Span::styled(KEY_HELP, self.theme.dim))]
    }
}
