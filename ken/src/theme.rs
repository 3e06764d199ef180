//! Color themes for the Ken terminal client.
//!
//! A `Theme` holds named `ratatui::style::Color` fields for every surface the
//! client draws. Two built-in themes are provided:
//!
//! - `ken` - the golden Ken Analyst palette in RGB; requires truecolor.
//! - `dark` - ANSI 16 colors only, for terminals without truecolor support.

use ratatui::style::Color;

/// All color values used across the UI.
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    /// Border color for the focused panel.
    pub border_active: Color,
    /// Border color for unfocused panels.
    pub border_inactive: Color,

    // Content
    /// Primary text.
    pub text: Color,
    /// Secondary text: dates, hints, placeholders.
    pub text_muted: Color,
    /// Accent used for titles, selection and active filter tabs.
    pub accent: Color,
    /// Background of the selected row.
    pub selection_bg: Color,
    /// File type badges in the document list.
    pub badge: Color,

    // Chat
    /// Author label of user messages.
    pub chat_user: Color,
    /// Author label of assistant messages.
    pub chat_assistant: Color,
    /// Error messages in chat and error placeholders elsewhere.
    pub error: Color,

    // Activity log
    /// Status dot for successful activities.
    pub activity_ok: Color,
    /// Status dot for failed activities.
    pub activity_failed: Color,
    /// Status dot for anything else.
    pub activity_neutral: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    /// Mode indicator in NORMAL mode.
    pub status_mode_normal: Color,
    /// Mode indicator in INSERT mode.
    pub status_mode_insert: Color,

    /// Application background.
    pub background: Color,
}

impl Theme {
    /// Built-in theme using ANSI 16 colors.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Yellow,
            border_inactive: Color::DarkGray,

            text: Color::Reset,
            text_muted: Color::DarkGray,
            accent: Color::Yellow,
            selection_bg: Color::DarkGray,
            badge: Color::Cyan,

            chat_user: Color::Cyan,
            chat_assistant: Color::Yellow,
            error: Color::Red,

            activity_ok: Color::Green,
            activity_failed: Color::Red,
            activity_neutral: Color::DarkGray,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode_normal: Color::Yellow,
            status_mode_insert: Color::Green,

            background: Color::Reset,
        }
    }

    /// The Ken Analyst palette: gold accents on warm neutrals.
    pub fn ken() -> Self {
        let golden_light = Color::Rgb(245, 230, 211); // #F5E6D3
        let golden = Color::Rgb(212, 175, 55); // #D4AF37
        let golden_dark = Color::Rgb(184, 148, 31); // #B8941F
        let text = Color::Rgb(26, 26, 26); // #1A1A1A
        let muted = Color::Rgb(115, 115, 115); // #737373
        let border = Color::Rgb(229, 229, 229); // #E5E5E5
        let white = Color::Rgb(255, 255, 255);
        let green = Color::Rgb(34, 197, 94);
        let red = Color::Rgb(239, 68, 68);

        Self {
            border_active: golden,
            border_inactive: border,

            text,
            text_muted: muted,
            accent: golden_dark,
            selection_bg: golden_light,
            badge: golden_dark,

            chat_user: text,
            chat_assistant: golden_dark,
            error: red,

            activity_ok: green,
            activity_failed: red,
            activity_neutral: muted,

            status_bar_bg: golden_light,
            status_bar_fg: text,
            status_mode_normal: golden_dark,
            status_mode_insert: green,

            background: white,
        }
    }

    /// Resolves a configured theme name. Unknown names fall back to `ken`.
    ///
    /// # Arguments
    ///
    /// * `name` - theme name from config, e.g. `"dark"` or `"ken"`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "ken" | "golden" => Self::ken(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to 'ken'");
                Self::ken()
            }
        }
    }
}
