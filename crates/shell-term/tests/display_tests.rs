//! Integration tests for the display renderer driven through a terminal.

use std::io::Write;

use proptest::prelude::*;
use shell_term::{Capability, Display, StyledLine, Terminal, TerminalSize};

fn frame(texts: &[String]) -> Vec<StyledLine> {
    texts.iter().map(|t| StyledLine::plain(t.as_str())).collect()
}

#[tokio::test]
async fn display_writes_through_terminal() {
    let (mut term, mut remote) = Terminal::builder()
        .size(TerminalSize::new(20, 5))
        .build()
        .unwrap();
    let mut display = Display::new(term.capabilities(), false);
    display.resize(0, term.size().cols);
    display
        .update(&[StyledLine::plain("one"), StyledLine::plain("two")], 0, &mut term)
        .unwrap();
    term.flush().unwrap();
    let out = String::from_utf8(remote.drain_output()).unwrap();
    assert!(out.contains("one"));
    assert!(out.contains("two"));
}

#[tokio::test]
async fn capability_codes_through_terminal() {
    let (mut term, mut remote) = Terminal::builder().term_type("xterm-256color").build().unwrap();
    term.puts(Capability::EnterCaMode).unwrap();
    term.puts(Capability::KeypadXmit).unwrap();
    term.puts(Capability::CursorInvisible).unwrap();
    term.flush().unwrap();
    assert_eq!(remote.drain_output(), b"\x1b[?1049h\x1b[?1h\x1b=\x1b[?25l");
}

#[test]
fn narrower_budget_after_clear_has_no_wide_rows() {
    let mut display = Display::new(&Default::default(), false);
    display.resize(0, 40);
    let mut out = Vec::new();
    let wide = "x".repeat(40);
    display.update(&[StyledLine::plain(wide.as_str())], 0, &mut out).unwrap();

    out.clear();
    display.resize(0, 10);
    display.clear();
    display.update(&[StyledLine::plain(wide.as_str())], 0, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("\x1b[J"));
    assert!(text.contains(&"x".repeat(10)));
    assert!(!text.contains(&"x".repeat(11)));
}

proptest! {
    #[test]
    fn truncation_respects_width(text in "[a-z日本 ]{0,40}", cols in 0usize..30) {
        let line = StyledLine::plain(text.as_str());
        prop_assert!(line.truncate(cols).width() <= cols);
    }

    #[test]
    fn repeated_frame_is_silent(texts in prop::collection::vec("[a-z]{0,12}", 0..8)) {
        let mut display = Display::new(&Default::default(), false);
        display.resize(0, 80);
        let lines = frame(&texts);
        let mut first = Vec::new();
        display.update(&lines, 0, &mut first).unwrap();
        let mut second = Vec::new();
        display.update(&lines, 0, &mut second).unwrap();
        prop_assert!(second.is_empty());
        prop_assert_eq!(display.line_count(), texts.len());
    }
}
