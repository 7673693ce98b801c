mod config;
mod script;
mod sink;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use mention_composer::Composer;
use mention_composer::ComposerConfig;
use mention_composer::ComposerEvent;
use mention_composer::ComposerSession;
use mention_composer::DirectorySource;
use mention_composer::InputResult;
use mention_composer::MentionPopup;
use mention_composer::MessageSink;
use mention_composer::TextBuffer;
use mention_composer::TextSurface;
use mention_directory::JsonFileRoster;
use mention_protocol::ConversationId;
use mention_protocol::Selection;
use mention_protocol::SelectionDirection;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::WidgetRef;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::ConfigStore;
use crate::script::ScriptCommand;
use crate::sink::JsonLinesSink;

const DEFAULT_LOG_FILTER: &str = "mention_composer=info,mention_directory=info,mention_compose=info";
const POPUP_WIDTH: u16 = 48;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Compose chat messages with @mention autocomplete, driven by a line script on stdin"
)]
struct Cli {
    /// JSON roster mapping conversation ids to directory entries.
    #[arg(long, env = "MENTION_ROSTER")]
    roster: PathBuf,

    /// Conversation to compose into.
    #[arg(long, default_value = "lobby")]
    conversation: String,

    /// Re-read the roster periodically (public conversations) instead of once at start.
    #[arg(long)]
    poll: bool,

    /// Override `poll_interval_secs` from the config file.
    #[arg(long)]
    poll_interval_secs: Option<u64>,

    /// Override the mention marker from the config file.
    #[arg(long)]
    marker: Option<char>,

    /// Config file path (default: `~/.mention-composer/config.toml`).
    #[arg(long, env = "MENTION_COMPOSER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Write the effective settings (config file plus flags) back to the config file.
    InitConfig,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn effective_config(cli: &Cli, store: &ConfigStore) -> anyhow::Result<ComposerConfig> {
    let mut config = store.load_composer_config()?;
    if let Some(marker) = cli.marker {
        config.marker = marker;
    }
    if let Some(secs) = cli.poll_interval_secs {
        config.poll_interval_secs = secs;
    }
    config
        .validate()
        .with_context(|| format!("invalid composer settings in {}", store.path().display()))?;
    Ok(config)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let store = match &cli.config {
        Some(path) => ConfigStore::new(path.clone()),
        None => ConfigStore::new_default()?,
    };
    let config = effective_config(&cli, &store)?;

    if let Some(CliCommand::InitConfig) = cli.command {
        store.save_composer_config(&config)?;
        tracing::info!("wrote {}", store.path().display());
        return Ok(());
    }

    let provider = Arc::new(JsonFileRoster::new(cli.roster.clone()));
    let source = if cli.poll {
        DirectorySource::Polled(provider)
    } else {
        DirectorySource::Static(provider)
    };
    let composer = Composer::new(
        config,
        ConversationId::new(cli.conversation.clone()),
        TextBuffer::new(),
        JsonLinesSink::new(std::io::stdout()),
    );
    let mut session = ComposerSession::start(composer, source);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("read stdin")? else {
                    break;
                };
                match script::parse_line(&line) {
                    Ok(Some(ScriptCommand::Quit)) => break,
                    Ok(Some(command)) => apply_command(session.composer_mut(), command),
                    Ok(None) => {}
                    Err(err) => tracing::warn!("skipping `{line}`: {err:#}"),
                }
            }
            Some(snapshot) = session.next_directory_snapshot() => {
                tracing::debug!(
                    sequence = snapshot.sequence,
                    members = snapshot.entries.len(),
                    "directory refreshed"
                );
                report(session.handle_event(ComposerEvent::Directory(snapshot)));
            }
        }
    }

    session.end();
    Ok(())
}

fn apply_command<S: TextSurface, K: MessageSink>(
    composer: &mut Composer<S, K>,
    command: ScriptCommand,
) {
    match command {
        ScriptCommand::Type(text) => {
            for ch in text.chars() {
                let key = KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE);
                report(composer.handle_event(ComposerEvent::Key(key)));
            }
        }
        ScriptCommand::Key(key) => report(composer.handle_event(ComposerEvent::Key(key))),
        ScriptCommand::Paste(text) => report(composer.handle_event(ComposerEvent::Paste(text))),
        ScriptCommand::Select { start, end } => {
            composer
                .surface_mut()
                .set_selection(Selection::new(start, end, SelectionDirection::None));
            report(composer.handle_event(ComposerEvent::SelectionChanged));
        }
        ScriptCommand::Attach(attachment) => composer.attach(attachment),
        ScriptCommand::Quote(quote) => composer.set_quote(Some(quote)),
        ScriptCommand::Submit => report(composer.handle_event(ComposerEvent::Submit)),
        ScriptCommand::Show => {
            for line in render_state(composer) {
                println!("{line}");
            }
        }
        ScriptCommand::Quit => {}
    }
}

fn report(result: Result<InputResult, mention_composer::ComposerError>) {
    match result {
        Ok(InputResult::Committed { handle }) => tracing::info!("mentioned {handle}"),
        Ok(InputResult::Sent) => tracing::info!("message sent"),
        Ok(InputResult::None) => {}
        Err(err) => tracing::warn!("{err}; draft kept for retry"),
    }
}

/// Buffer with a `|` at the caret (or `[...]` around a selection), followed by popup rows.
fn render_state<S: TextSurface, K: MessageSink>(composer: &Composer<S, K>) -> Vec<String> {
    let text = composer.text();
    let selection = composer.selection().normalized(text);
    let mut lines = vec![if selection.is_collapsed() {
        format!(
            "{}|{}",
            &text[..selection.start],
            &text[selection.start..]
        )
    } else {
        format!(
            "{}[{}]{}",
            &text[..selection.start],
            &text[selection.start..selection.end],
            &text[selection.end..]
        )
    }];

    let popup = MentionPopup::new(composer.autocomplete());
    let height = popup.desired_height();
    if height > 0 {
        let area = Rect::new(0, 0, POPUP_WIDTH, height);
        let mut buf = Buffer::empty(area);
        (&popup).render_ref(area, &mut buf);
        lines.extend((0..height).map(|y| {
            (0..POPUP_WIDTH)
                .map(|x| buf[(x, y)].symbol())
                .collect::<String>()
                .trim_end()
                .to_string()
        }));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use mention_protocol::DirectoryEntry;
    use mention_protocol::OutgoingMessage;
    use pretty_assertions::assert_eq;

    fn composer() -> Composer<TextBuffer, Vec<OutgoingMessage>> {
        let mut composer = Composer::new(
            ComposerConfig::default(),
            ConversationId::new("lobby"),
            TextBuffer::new(),
            Vec::new(),
        );
        composer.set_directory(vec![
            DirectoryEntry::new("p1", "alice"),
            DirectoryEntry::new("p2", "alfred"),
        ]);
        composer
    }

    fn run(composer: &mut Composer<TextBuffer, Vec<OutgoingMessage>>, script: &str) {
        for line in script.lines() {
            if let Some(command) = script::parse_line(line).expect("parse") {
                apply_command(composer, command);
            }
        }
    }

    #[test]
    fn render_state_shows_caret_and_candidates() {
        let mut composer = composer();
        run(&mut composer, "type hi @al");
        assert_eq!(
            render_state(&composer),
            vec![
                "hi @al|".to_string(),
                "› alice  p1".to_string(),
                "  alfred  p2".to_string(),
            ]
        );
    }

    #[test]
    fn render_state_brackets_selection() {
        let mut composer = composer();
        run(&mut composer, "type hello\nselect 1 3");
        assert_eq!(render_state(&composer), vec!["h[el]lo".to_string()]);
    }

    #[test]
    fn script_commits_and_sends_encoded_text() {
        let mut composer = composer();
        run(
            &mut composer,
            "# mention alfred\ntype ping @al\nkey down\nkey enter\ntype now\nkey enter",
        );
        let sent = composer.sink();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "ping @p2 now");
        assert_eq!(composer.text(), "");
    }

    #[test]
    fn cli_overrides_apply_on_top_of_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("config.toml"));
        let cli = Cli::parse_from([
            "mention-compose",
            "--roster",
            "roster.json",
            "--marker",
            "+",
            "--poll-interval-secs",
            "3",
        ]);
        let config = effective_config(&cli, &store).expect("config");
        assert_eq!(config.marker, '+');
        assert_eq!(config.poll_interval_secs, 3);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("config.toml"));
        let cli = Cli::parse_from([
            "mention-compose",
            "--roster",
            "roster.json",
            "--poll-interval-secs",
            "0",
        ]);
        assert!(effective_config(&cli, &store).is_err());
    }
}
