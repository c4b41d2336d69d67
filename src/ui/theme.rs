use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub info: Style,
    pub dim: Style,
    pub muted: Style,
    /// Key field names and key values
    pub key: Style,
}

impl Theme {
    /// Colors only when stdout is a terminal
    pub fn detect() -> Self {
        if !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
            muted: Style::new().bright_black(),
            key: Style::new().yellow(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            muted: Style::new(),
            key: Style::new(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
