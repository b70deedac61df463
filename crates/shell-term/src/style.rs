//! Styled text.
//!
//! A [`StyledLine`] is an ordered list of text segments, each carrying a
//! [`Style`]. Lines are built fresh for every frame and never mutated once
//! handed to the display; the renderer only compares them with the previous
//! frame.

use std::fmt;
use std::str::FromStr;

use crossterm::style::{Attribute, SetAttribute, SetBackgroundColor, SetForegroundColor};
use unicode_width::UnicodeWidthChar;

use crate::capability::ansi_of;

/// The closed set of colors used for prompts and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    /// Black.
    Black = 0,
    /// Red.
    Red = 1,
    /// Green.
    Green = 2,
    /// Yellow.
    Yellow = 3,
    /// Blue.
    Blue = 4,
    /// Magenta.
    Magenta = 5,
    /// Cyan.
    Cyan = 6,
    /// White.
    White = 7,
    /// Bright (high intensity black).
    Bright = 8,
}

impl Color {
    /// Palette index of the color.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Upper-case name of the color.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Black => "BLACK",
            Self::Red => "RED",
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Blue => "BLUE",
            Self::Magenta => "MAGENTA",
            Self::Cyan => "CYAN",
            Self::White => "WHITE",
            Self::Bright => "BRIGHT",
        }
    }

    const fn to_crossterm(self) -> crossterm::style::Color {
        crossterm::style::Color::AnsiValue(self.code())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown color name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown color '{0}' (expected one of black, red, green, yellow, blue, magenta, cyan, white, bright)")]
pub struct UnknownColor(pub String);

impl FromStr for Color {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "black" => Ok(Self::Black),
            "red" => Ok(Self::Red),
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "blue" => Ok(Self::Blue),
            "magenta" => Ok(Self::Magenta),
            "cyan" => Ok(Self::Cyan),
            "white" => Ok(Self::White),
            "bright" => Ok(Self::Bright),
            _ => Err(UnknownColor(s.to_string())),
        }
    }
}

/// Visual style of a text segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Style {
    /// Foreground color.
    pub fg: Option<Color>,
    /// Background color.
    pub bg: Option<Color>,
    /// Bold text.
    pub bold: bool,
    /// Underlined text.
    pub underline: bool,
}

impl Style {
    /// The default (unstyled) style.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fg: None,
            bg: None,
            bold: false,
            underline: false,
        }
    }

    /// Set the foreground color.
    #[must_use]
    pub const fn fg(mut self, color: Color) -> Self {
        self.fg = Some(color);
        self
    }

    /// Set the background color.
    #[must_use]
    pub const fn bg(mut self, color: Color) -> Self {
        self.bg = Some(color);
        self
    }

    /// Enable bold.
    #[must_use]
    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Enable underline.
    #[must_use]
    pub const fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    /// Whether this style changes nothing.
    #[must_use]
    pub const fn is_plain(&self) -> bool {
        self.fg.is_none() && self.bg.is_none() && !self.bold && !self.underline
    }

    fn write_start(&self, out: &mut String) {
        if let Some(fg) = self.fg {
            out.push_str(&ansi_of(&SetForegroundColor(fg.to_crossterm())));
        }
        if let Some(bg) = self.bg {
            out.push_str(&ansi_of(&SetBackgroundColor(bg.to_crossterm())));
        }
        if self.bold {
            out.push_str(&ansi_of(&SetAttribute(Attribute::Bold)));
        }
        if self.underline {
            out.push_str(&ansi_of(&SetAttribute(Attribute::Underlined)));
        }
    }

    /// Wrap `text` in this style's escape codes.
    #[must_use]
    pub fn paint(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 16);
        self.write_start(&mut out);
        out.push_str(text);
        if !self.is_plain() {
            out.push_str(&reset());
        }
        out
    }
}

fn reset() -> String {
    ansi_of(&SetAttribute(Attribute::Reset))
}

/// A run of text with a single style.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    /// The text. Must not contain line breaks.
    pub text: String,
    /// The style applied to the text.
    pub style: Style,
}

impl Span {
    /// Create a styled span.
    #[must_use]
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// Create an unstyled span.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Style::new())
    }

    /// Display width of the span in terminal cells.
    #[must_use]
    pub fn width(&self) -> usize {
        text_width(&self.text)
    }
}

/// Display width of a string in terminal cells.
#[must_use]
pub fn text_width(text: &str) -> usize {
    text.chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// A single line of styled text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StyledLine {
    spans: Vec<Span>,
}

impl StyledLine {
    /// An empty line.
    #[must_use]
    pub const fn new() -> Self {
        Self { spans: Vec::new() }
    }

    /// A line made of one unstyled span.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::styled(text, Style::new())
    }

    /// A line made of one styled span.
    #[must_use]
    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        let mut line = Self::new();
        line.push(Span::new(text, style));
        line
    }

    /// Split multi-line text into unstyled lines.
    #[must_use]
    pub fn from_text(text: &str) -> Vec<Self> {
        text.lines().map(Self::plain).collect()
    }

    /// Append a span. Empty spans are skipped.
    pub fn push(&mut self, span: Span) {
        if !span.text.is_empty() {
            self.spans.push(span);
        }
    }

    /// Append a span, builder style.
    #[must_use]
    pub fn with(mut self, text: impl Into<String>, style: Style) -> Self {
        self.push(Span::new(text, style));
        self
    }

    /// The spans of this line.
    #[must_use]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Whether the line has no visible text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Display width in terminal cells.
    #[must_use]
    pub fn width(&self) -> usize {
        self.spans.iter().map(Span::width).sum()
    }

    /// Text without styling.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Copy of this line cut to at most `cols` cells.
    ///
    /// A wide character that would straddle the limit is dropped.
    #[must_use]
    pub fn truncate(&self, cols: usize) -> Self {
        if self.width() <= cols {
            return self.clone();
        }
        let mut remaining = cols;
        let mut out = Self::new();
        for span in &self.spans {
            if remaining == 0 {
                break;
            }
            let mut text = String::new();
            for c in span.text.chars() {
                let w = c.width().unwrap_or(0);
                if w > remaining {
                    remaining = 0;
                    break;
                }
                remaining -= w;
                text.push(c);
            }
            out.push(Span::new(text, span.style));
        }
        out
    }

    /// ANSI rendering of the line. Each styled span is followed by a reset.
    #[must_use]
    pub fn to_ansi(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            if span.style.is_plain() {
                out.push_str(&span.text);
            } else {
                out.push_str(&span.style.paint(&span.text));
            }
        }
        out
    }
}

impl From<&str> for StyledLine {
    fn from(text: &str) -> Self {
        Self::plain(text)
    }
}

impl From<String> for StyledLine {
    fn from(text: String) -> Self {
        Self::plain(text)
    }
}

impl fmt::Display for StyledLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for span in &self.spans {
            f.write_str(&span.text)?;
        }
        Ok(())
    }
}

impl FromIterator<Span> for StyledLine {
    fn from_iter<I: IntoIterator<Item = Span>>(iter: I) -> Self {
        let mut line = Self::new();
        for span in iter {
            line.push(span);
        }
        line
    }
}

/// Render `text` with a foreground color.
#[must_use]
pub fn colored(text: &str, color: Color) -> String {
    Style::new().fg(color).paint(text)
}

/// Render `text` with a background color.
#[must_use]
pub fn background_colored(text: &str, color: Color) -> String {
    Style::new().bg(color).paint(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parse_case_insensitive() {
        assert_eq!("Green".parse::<Color>().unwrap(), Color::Green);
        assert_eq!(" BRIGHT ".parse::<Color>().unwrap(), Color::Bright);
        assert!("purple".parse::<Color>().is_err());
    }

    #[test]
    fn color_codes() {
        assert_eq!(Color::Black.code(), 0);
        assert_eq!(Color::Bright.code(), 8);
        assert_eq!(Color::Cyan.to_string(), "CYAN");
    }

    #[test]
    fn colored_wraps_and_resets() {
        let s = colored("ok", Color::Green);
        assert_eq!(s, "\x1b[38;5;2mok\x1b[0m");
        let s = background_colored("x", Color::Red);
        assert!(s.starts_with("\x1b[48;5;1m"));
    }

    #[test]
    fn plain_style_has_no_codes() {
        assert_eq!(Style::new().paint("abc"), "abc");
        assert_eq!(StyledLine::plain("abc").to_ansi(), "abc");
    }

    #[test]
    fn truncate_by_width() {
        let line = StyledLine::plain("hello").with(" world", Style::new().bold());
        assert_eq!(line.width(), 11);
        let cut = line.truncate(7);
        assert_eq!(cut.plain_text(), "hello w");
        assert_eq!(cut.spans().len(), 2);
    }

    #[test]
    fn truncate_wide_chars() {
        let line = StyledLine::plain("日本語");
        assert_eq!(line.width(), 6);
        assert_eq!(line.truncate(5).plain_text(), "日本");
    }

    #[test]
    fn from_text_splits_lines() {
        let lines = StyledLine::from_text("a\nb\n\nc");
        assert_eq!(lines.len(), 4);
        assert!(lines[2].is_empty());
    }
}
