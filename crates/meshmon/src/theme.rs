use crate::layout::Tone;
use crossterm::style::Color as TermColor;
use meshmon_core::Urgency;
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const TITLE_STYLE: Style = Style::new()
    .fg(Color::Rgb(191, 219, 254))
    .add_modifier(Modifier::BOLD);
pub const BORDER_STYLE: Style = Style::new().fg(Color::Rgb(71, 85, 105));
pub const MUTED: Color = Color::Rgb(146, 131, 116);
const PURPLE: Color = Color::Rgb(128, 0, 128);

pub fn urgency_color(level: Urgency) -> Color {
    match level {
        Urgency::Fresh1 => Color::Green,
        Urgency::Fresh2 => Color::LightGreen,
        Urgency::Warm1 => Color::Yellow,
        Urgency::Warm2 => Color::LightYellow,
        Urgency::Stale1 => Color::Magenta,
        Urgency::Stale2 => Color::LightMagenta,
        Urgency::Stale3 => Color::Red,
        Urgency::Stale4 => Color::LightRed,
        Urgency::Old1 => PURPLE,
        Urgency::Old2 => Color::DarkGray,
    }
}

/// Resolves a configured color token (`"light_green"`, `"cyan"`, `"#ff8800"`).
pub fn token_color(token: &str) -> Color {
    let normalized: String = token
        .trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|ch| !matches!(*ch, '_' | '-' | ' '))
        .collect();
    match normalized.as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        "purple" => PURPLE,
        "white" => Color::White,
        hex if hex.starts_with('#') => parse_hex(hex).unwrap_or(Color::White),
        _ => Color::White,
    }
}

fn parse_hex(value: &str) -> Option<Color> {
    let digits = value.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(digits.get(range)?, 16).ok();
    Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

pub fn tone_color(tone: &Tone) -> Option<Color> {
    match tone {
        Tone::Plain => None,
        Tone::Muted => Some(MUTED),
        Tone::Node(token) => Some(token_color(token)),
        Tone::Urgency(level) => Some(urgency_color(*level)),
    }
}

pub fn tone_style(tone: &Tone) -> Style {
    match tone_color(tone) {
        Some(color) => Style::new().fg(color),
        None => Style::new(),
    }
}

/// Same palette for the plain renderer, which writes through crossterm.
pub fn term_color(color: Color) -> TermColor {
    match color {
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
        Color::Indexed(value) => TermColor::AnsiValue(value),
        Color::Reset => TermColor::Reset,
    }
}
