//! Line-oriented input script for driving a composer from stdin.
//!
//! ```text
//! type hi @al          # type characters one key at a time
//! key enter            # press a key, optionally with modifiers: shift+alt+left
//! paste some text      # bracketed paste at the caret
//! select 0 5           # set the selection (byte offsets)
//! attach ./cat.png image/png
//! quote m1 p2 the quoted text
//! submit               # explicit send
//! show                 # print buffer, caret and candidate list
//! quit
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::path::PathBuf;

use anyhow::Context;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use mention_protocol::AttachmentRef;
use mention_protocol::QuoteRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    Type(String),
    Key(KeyEvent),
    Paste(String),
    Select { start: usize, end: usize },
    Attach(AttachmentRef),
    Quote(QuoteRef),
    Submit,
    Show,
    Quit,
}

/// Parse one script line. `Ok(None)` for blank lines and comments.
pub fn parse_line(line: &str) -> anyhow::Result<Option<ScriptCommand>> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = trimmed
        .split_once(' ')
        .map_or((trimmed.trim_end(), ""), |(verb, rest)| (verb, rest));
    let command = match verb {
        "type" => ScriptCommand::Type(rest.to_string()),
        "paste" => ScriptCommand::Paste(rest.to_string()),
        "key" => ScriptCommand::Key(parse_key(rest.trim())?),
        "select" => {
            let mut parts = rest.split_whitespace();
            let start = parse_offset(parts.next(), "start")?;
            let end = match parts.next() {
                Some(end) => parse_offset(Some(end), "end")?,
                None => start,
            };
            ScriptCommand::Select { start, end }
        }
        "attach" => {
            let mut parts = rest.split_whitespace();
            let Some(path) = parts.next() else {
                anyhow::bail!("attach needs a path");
            };
            ScriptCommand::Attach(AttachmentRef {
                path: PathBuf::from(path),
                content_type: parts.next().map(str::to_string),
            })
        }
        "quote" => {
            let mut parts = rest.trim().splitn(3, ' ');
            let (Some(message_id), Some(author)) = (parts.next(), parts.next()) else {
                anyhow::bail!("quote needs a message id and an author");
            };
            ScriptCommand::Quote(QuoteRef {
                message_id: message_id.to_string(),
                author: author.to_string(),
                text: parts.next().unwrap_or_default().to_string(),
            })
        }
        "submit" => ScriptCommand::Submit,
        "show" => ScriptCommand::Show,
        "quit" | "exit" => ScriptCommand::Quit,
        other => anyhow::bail!("unknown command `{other}`"),
    };
    Ok(Some(command))
}

/// Parse a key chord such as `enter`, `alt+right` or `shift+super+left`.
pub fn parse_key(chord: &str) -> anyhow::Result<KeyEvent> {
    let Some((name, modifier_names)) = chord.rsplit('+').next().map(|name| {
        let modifiers = chord[..chord.len() - name.len()].trim_end_matches('+');
        (name, modifiers)
    }) else {
        anyhow::bail!("empty key");
    };

    let mut modifiers = KeyModifiers::NONE;
    for modifier in modifier_names.split('+').filter(|m| !m.is_empty()) {
        modifiers |= match modifier.to_ascii_lowercase().as_str() {
            "shift" => KeyModifiers::SHIFT,
            "alt" | "option" => KeyModifiers::ALT,
            "ctrl" | "control" => KeyModifiers::CONTROL,
            "super" | "cmd" => KeyModifiers::SUPER,
            "meta" => KeyModifiers::META,
            other => anyhow::bail!("unknown modifier `{other}` in `{chord}`"),
        };
    }

    let code = match name.to_ascii_lowercase().as_str() {
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "esc" | "escape" => KeyCode::Esc,
        "space" => KeyCode::Char(' '),
        "" => anyhow::bail!("empty key in `{chord}`"),
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => KeyCode::Char(ch),
                _ => anyhow::bail!("unknown key `{name}`"),
            }
        }
    };
    Ok(KeyEvent::new(code, modifiers))
}

fn parse_offset(token: Option<&str>, what: &str) -> anyhow::Result<usize> {
    let Some(token) = token else {
        anyhow::bail!("select needs a {what} offset");
    };
    token
        .parse()
        .with_context(|| format!("invalid {what} offset `{token}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_line("type hi @al").expect("parse"),
            Some(ScriptCommand::Type("hi @al".to_string()))
        );
        assert_eq!(
            parse_line("type  two spaces").expect("parse"),
            Some(ScriptCommand::Type(" two spaces".to_string()))
        );
        assert_eq!(
            parse_line("select 3 9").expect("parse"),
            Some(ScriptCommand::Select { start: 3, end: 9 })
        );
        assert_eq!(
            parse_line("select 4").expect("parse"),
            Some(ScriptCommand::Select { start: 4, end: 4 })
        );
        assert_eq!(
            parse_line("attach ./cat.png image/png").expect("parse"),
            Some(ScriptCommand::Attach(AttachmentRef {
                path: PathBuf::from("./cat.png"),
                content_type: Some("image/png".to_string()),
            }))
        );
        assert_eq!(
            parse_line("quote m1 p2 said this").expect("parse"),
            Some(ScriptCommand::Quote(QuoteRef {
                message_id: "m1".to_string(),
                author: "p2".to_string(),
                text: "said this".to_string(),
            }))
        );
        assert_eq!(parse_line("submit").expect("parse"), Some(ScriptCommand::Submit));
        assert_eq!(parse_line("quit").expect("parse"), Some(ScriptCommand::Quit));
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        assert_eq!(parse_line("").expect("parse"), None);
        assert_eq!(parse_line("   ").expect("parse"), None);
        assert_eq!(parse_line("# note").expect("parse"), None);
    }

    #[test]
    fn parses_key_chords() {
        assert_eq!(
            parse_key("enter").expect("key"),
            KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)
        );
        assert_eq!(
            parse_key("shift+alt+Left").expect("key"),
            KeyEvent::new(KeyCode::Left, KeyModifiers::SHIFT | KeyModifiers::ALT)
        );
        assert_eq!(
            parse_key("super+right").expect("key"),
            KeyEvent::new(KeyCode::Right, KeyModifiers::SUPER)
        );
        assert_eq!(
            parse_key("x").expect("key"),
            KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_line("dance").is_err());
        assert!(parse_line("select x").is_err());
        assert!(parse_key("hyper+left").is_err());
        assert!(parse_key("pageup").is_err());
        assert!(parse_key("").is_err());
    }
}
