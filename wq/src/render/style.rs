//! Glyphs, palette, and text-layout helpers
//!
//! All width math is ANSI-aware: styled spans are measured after stripping
//! escape sequences, so alignment survives any color configuration.

use colored::{Color, Colorize};

use crate::stats::RunStatus;

/// Completion glyph for successful steps.
pub const GLYPH_DONE: &str = "✓";

/// Completion glyph for failed steps.
pub const GLYPH_FAILED: &str = "✖";

/// In-progress glyph for the active step.
pub const GLYPH_ACTIVE: &str = "❯";

/// Horizontal rule character.
pub const RULE_CHAR: char = '─';

/// Vertical connector character.
pub const CONNECTOR_CHAR: char = '│';

/// Minimum layout width in columns.
pub const DEFAULT_WIDTH: usize = 80;

/// Layout takes at least 4/7 of the screen width.
const MIN_RATIO_NUM: usize = 4;
const MIN_RATIO_DEN: usize = 7;

/// Effective layout width for a given screen width.
pub fn layout_width(screen_width: usize) -> usize {
    DEFAULT_WIDTH.max(screen_width * MIN_RATIO_NUM / MIN_RATIO_DEN)
}

/// Error-status color, selected from a fixed palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatusColor {
    Warning,
    Critical,
    Alert,
}

impl ErrorStatusColor {
    pub fn color(self) -> Color {
        match self {
            Self::Warning => Color::Yellow,
            Self::Critical => Color::Red,
            Self::Alert => Color::Magenta,
        }
    }
}

/// Styling for the queue title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleStyle {
    pub color: Color,
    pub bold: bool,
}

impl Default for TitleStyle {
    fn default() -> Self {
        Self {
            color: Color::Cyan,
            bold: true,
        }
    }
}

/// Columns a string occupies on screen, ignoring ANSI styling.
pub fn visible_width(text: &str) -> usize {
    strip_ansi_escapes::strip_str(text).chars().count()
}

/// Left- and right-align two spans to the full layout width.
pub fn align_ends(left: &str, right: &str, width: usize) -> String {
    let pad = width
        .saturating_sub(visible_width(left) + visible_width(right))
        .max(1);
    format!("{left}{}{right}", " ".repeat(pad))
}

/// Title line: styled title left, optional app-name badge right.
pub fn title_line(title: &str, style: TitleStyle, badge: Option<(&str, Color)>, width: usize) -> String {
    let mut styled = title.color(style.color);
    if style.bold {
        styled = styled.bold();
    }
    let left = styled.to_string();

    match badge {
        Some((name, color)) => {
            let badge = format!(" {name} ").black().on_color(color).to_string();
            align_ends(&left, &badge, width)
        }
        None => left,
    }
}

/// Prefix glyph for a completed step.
pub fn done_glyph(failed: bool, error_status: ErrorStatusColor) -> String {
    if failed {
        GLYPH_FAILED.color(error_status.color()).bold().to_string()
    } else {
        GLYPH_DONE.green().to_string()
    }
}

/// Prefix glyph for the active step.
pub fn active_glyph() -> String {
    GLYPH_ACTIVE.cyan().to_string()
}

/// Numbered prefix for a completed step, styled like its glyph would be.
pub fn numbered_final_prefix(text: &str, failed: bool, error_status: ErrorStatusColor) -> String {
    if failed {
        text.color(error_status.color()).bold().to_string()
    } else {
        text.green().to_string()
    }
}

/// Numbered prefix for the active step.
pub fn numbered_active_prefix(text: &str) -> String {
    text.cyan().to_string()
}

/// Vertical connector line emitted under the active step.
pub fn connector() -> String {
    CONNECTOR_CHAR.to_string().dimmed().to_string()
}

/// Styled status tag for the summary footer.
pub fn status_tag(status: RunStatus, error_status: ErrorStatusColor) -> String {
    match status {
        RunStatus::InProgress => status.label().cyan().to_string(),
        RunStatus::Success => status.label().green().bold().to_string(),
        RunStatus::Problem => status.label().color(error_status.color()).bold().to_string(),
    }
}
