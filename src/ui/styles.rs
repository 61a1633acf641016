use std::borrow::Cow;

use ratatui::prelude::Stylize;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::view::HeatTone;

/// Accent color used for prompts, highlights, and status badges.
pub const ACCENT: Color = Color::Indexed(208);

/// Produce a dimmed line for secondary descriptions and hints.
pub fn secondary_line<'a>(text: impl Into<Cow<'a, str>>) -> Line<'a> {
    let owned = text.into().into_owned();
    Line::from(owned.dim())
}

/// Dimmed text chunk for inline usage.
pub fn secondary_span<'a>(text: impl Into<Cow<'a, str>>) -> Span<'a> {
    let owned = text.into().into_owned();
    Span::from(owned).dim()
}

/// Apply the accent and bold modifiers for list selections.
pub fn selection_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn tone_color(tone: HeatTone) -> Color {
    match tone {
        HeatTone::Up => Color::Green,
        HeatTone::Down => Color::Red,
        HeatTone::Flat => Color::DarkGray,
    }
}

/// Foreground for change figures.
pub fn tone_style(tone: HeatTone) -> Style {
    Style::default().fg(tone_color(tone))
}

/// Filled tile used by the heatmap.
pub fn tile_style(tone: HeatTone) -> Style {
    Style::default()
        .bg(tone_color(tone))
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}
