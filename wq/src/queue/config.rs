//! Display configuration and the builder-style surface
//!
//! Every `with_*` method consumes and returns the queue so callers can chain
//! the whole configuration off the constructor.

use colored::Color;

use crate::render::numbering::{NumberFormat, Numbering};
use crate::render::style::{ErrorStatusColor, TitleStyle};

use super::core::Queue;

/// How the queue presents itself
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Header title
    pub title: String,

    /// Title color and boldness
    pub title_style: TitleStyle,

    /// Optional application-name badge, right-aligned in the header
    pub app_name: Option<String>,

    /// Badge background color
    pub app_name_color: Color,

    /// Render the summary footer when the run ends
    pub show_summary: bool,

    /// Clear the screen before the first render
    pub clear_screen: bool,

    /// Error-status color from the fixed palette
    pub error_status: ErrorStatusColor,

    /// Numbering mode for step prefixes
    pub numbering: Numbering,

    /// Draw separator rules around multi-line results
    pub result_separators: bool,

    /// Screen width in columns; updated by resize notifications
    pub screen_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            title_style: TitleStyle::default(),
            app_name: None,
            app_name_color: Color::Blue,
            show_summary: true,
            clear_screen: false,
            error_status: ErrorStatusColor::Critical,
            numbering: Numbering::default(),
            result_separators: true,
            screen_width: 0,
        }
    }
}

impl Queue {
    /// Set the title color and boldness.
    pub fn with_title_style(mut self, color: Color, bold: bool) -> Self {
        self.display.title_style = TitleStyle { color, bold };
        self
    }

    /// Show an application-name badge in the header.
    pub fn with_app_name(mut self, name: impl Into<String>, color: Color) -> Self {
        self.display.app_name = Some(name.into());
        self.display.app_name_color = color;
        self
    }

    /// Toggle the summary footer.
    pub fn with_summary(mut self, show: bool) -> Self {
        self.display.show_summary = show;
        self
    }

    /// Clear the screen before the first render.
    pub fn with_clear_screen(mut self, clear: bool) -> Self {
        self.display.clear_screen = clear;
        self
    }

    /// Pick the error-status color from the fixed palette.
    pub fn with_error_status(mut self, status: ErrorStatusColor) -> Self {
        self.display.error_status = status;
        self
    }

    /// Configure step numbering.
    pub fn with_numbering(mut self, enabled: bool, keep_first_symbol: bool, format: NumberFormat) -> Self {
        self.display.numbering = Numbering {
            enabled,
            keep_first_symbol,
            format,
        };
        self
    }

    /// Toggle separator rules around multi-line results.
    pub fn with_result_separators(mut self, draw: bool) -> Self {
        self.display.result_separators = draw;
        self
    }
}
