use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use mention_composer::ComposerConfig;
use tempfile::NamedTempFile;
use toml_edit::DocumentMut;
use toml_edit::Item as TomlItem;
use toml_edit::Table as TomlTable;
use toml_edit::value;

const COMPOSER_TABLE: &str = "composer";

/// Reads and writes the `[composer]` table of `~/.mention-composer/config.toml`.
///
/// Unknown keys and comments are preserved on write. A file that is not valid TOML is still read
/// line by line so a typo elsewhere does not reset every setting to its default.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn new_default() -> anyhow::Result<Self> {
        let Some(home) = dirs::home_dir() else {
            anyhow::bail!("cannot determine home directory for config path");
        };
        Ok(Self::new(default_config_path(&home)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the composer settings, falling back to defaults for anything missing.
    pub fn load_composer_config(&self) -> anyhow::Result<ComposerConfig> {
        let mut config = ComposerConfig::default();
        let Some(content) = read_document_string(&self.path)? else {
            return Ok(config);
        };

        let settings = match content.parse::<DocumentMut>() {
            Ok(doc) => read_composer_settings(&doc),
            Err(err) => {
                tracing::warn!(
                    "{} is not valid TOML ({err}); reading [composer] line by line",
                    self.path.display()
                );
                parse_composer_settings_fallback(&content)
            }
        };
        settings.apply(&mut config);
        Ok(config)
    }

    /// Write `config` into the `[composer]` table, keeping the rest of the file intact.
    pub fn save_composer_config(&self, config: &ComposerConfig) -> anyhow::Result<()> {
        let poll_interval_secs = i64::try_from(config.poll_interval_secs)
            .context("poll_interval_secs does not fit in a TOML integer")?;
        let content = read_document_string(&self.path)?.unwrap_or_default();
        let updated = match content.parse::<DocumentMut>() {
            Ok(mut doc) => {
                let table = ensure_table_for_write(&mut doc, COMPOSER_TABLE);
                table["marker"] = value(config.marker.to_string());
                table["placeholder_name"] = value(config.placeholder_name.as_str());
                table["separator"] = value(config.separator.to_string());
                table["poll_interval_secs"] = value(poll_interval_secs);
                doc.to_string()
            }
            Err(_) => append_composer_fallback(&content, config),
        };
        write_atomic_text(&self.path, &updated)
    }
}

fn default_config_path(home: &Path) -> PathBuf {
    home.join(".mention-composer").join("config.toml")
}

/// Values found in the config file; `None` keeps the default.
#[derive(Debug, Default, PartialEq, Eq)]
struct ComposerSettings {
    marker: Option<char>,
    placeholder_name: Option<String>,
    separator: Option<char>,
    poll_interval_secs: Option<u64>,
}

impl ComposerSettings {
    fn apply(self, config: &mut ComposerConfig) {
        if let Some(marker) = self.marker {
            config.marker = marker;
        }
        if let Some(placeholder_name) = self.placeholder_name {
            config.placeholder_name = placeholder_name;
        }
        if let Some(separator) = self.separator {
            config.separator = separator;
        }
        if let Some(poll_interval_secs) = self.poll_interval_secs {
            config.poll_interval_secs = poll_interval_secs;
        }
    }
}

fn read_composer_settings(doc: &DocumentMut) -> ComposerSettings {
    let Some(table) = doc.get(COMPOSER_TABLE).and_then(TomlItem::as_table) else {
        return ComposerSettings::default();
    };
    let string = |key: &str| {
        table
            .get(key)
            .and_then(TomlItem::as_str)
            .map(str::to_string)
    };
    ComposerSettings {
        marker: string("marker").and_then(|s| single_char(&s)),
        placeholder_name: string("placeholder_name"),
        separator: string("separator").and_then(|s| single_char(&s)),
        poll_interval_secs: table
            .get("poll_interval_secs")
            .and_then(TomlItem::as_integer)
            .and_then(|secs| u64::try_from(secs).ok()),
    }
}

fn parse_composer_settings_fallback(contents: &str) -> ComposerSettings {
    let mut in_composer = false;
    let mut settings = ComposerSettings::default();

    for line in contents.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            in_composer = matches!(parse_table_header_name(trimmed), Some(COMPOSER_TABLE));
            continue;
        }
        if !in_composer {
            continue;
        }

        let Some((key, raw)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let raw = raw.trim();
        match key {
            "marker" => settings.marker = parse_quoted(raw).and_then(|s| single_char(&s)),
            "placeholder_name" => settings.placeholder_name = parse_quoted(raw),
            "separator" => settings.separator = parse_quoted(raw).and_then(|s| single_char(&s)),
            "poll_interval_secs" => {
                settings.poll_interval_secs = strip_toml_comment(raw)
                    .and_then(|token| token.split_whitespace().next())
                    .and_then(|token| token.parse().ok());
            }
            _ => {}
        }
    }

    settings
}

/// Parse a basic double-quoted TOML string, ignoring anything after the closing quote.
fn parse_quoted(raw: &str) -> Option<String> {
    let rest = raw.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let ch = chars.next()?;
    chars.next().is_none().then_some(ch)
}

fn parse_table_header_name(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if !line.starts_with('[') {
        return None;
    }
    let end = line.find(']')?;
    if end <= 1 {
        return None;
    }
    let name = line[1..end].trim();
    if name.is_empty() {
        return None;
    }
    Some(name)
}

fn strip_toml_comment(line: &str) -> Option<&str> {
    let line = line.split_once('#').map_or(line, |(head, _)| head).trim();
    if line.is_empty() { None } else { Some(line) }
}

fn ensure_table_for_write<'a>(doc: &'a mut DocumentMut, key: &str) -> &'a mut TomlTable {
    if !doc.get(key).is_some_and(TomlItem::is_table) {
        let mut table = TomlTable::new();
        table.set_implicit(false);
        doc[key] = TomlItem::Table(table);
    }
    match doc[key].as_table_mut() {
        Some(table) => table,
        None => unreachable!("expected `{key}` to be a table"),
    }
}

fn append_composer_fallback(existing: &str, config: &ComposerConfig) -> String {
    let mut out = existing.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out.push_str("[composer]\n");
    out.push_str(&format!("marker = {:?}\n", config.marker.to_string()));
    out.push_str(&format!(
        "placeholder_name = {:?}\n",
        config.placeholder_name
    ));
    out.push_str(&format!("separator = {:?}\n", config.separator.to_string()));
    out.push_str(&format!(
        "poll_interval_secs = {}\n",
        config.poll_interval_secs
    ));
    out
}

fn read_document_string(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(anyhow::Error::new(err).context("read config.toml")),
    }
}

/// Replace `path` with `contents` via a sibling temp file, creating parent directories.
fn write_atomic_text(path: &Path, contents: &str) -> anyhow::Result<()> {
    use std::io::Write as _;

    let Some(parent) = path.parent() else {
        anyhow::bail!("invalid config path: {}", path.display());
    };
    std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent).context("create temp config")?;
    tmp.write_all(contents.as_bytes())
        .context("write temp config")?;
    if !contents.ends_with('\n') {
        tmp.write_all(b"\n").context("write temp config")?;
    }
    tmp.flush().context("flush temp config")?;
    tmp.persist(path).map_err(|err| {
        anyhow::Error::new(err.error).context(format!("persist config to {}", path.display()))
    })?;
    Ok(())
}
