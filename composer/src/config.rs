use std::time::Duration;

use mention_protocol::DEFAULT_MARKER;

pub const DEFAULT_PLACEHOLDER_NAME: &str = "Anonymous";
pub const DEFAULT_SEPARATOR: char = ' ';
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Tunables for a composition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerConfig {
    /// Character that starts a mention query and prefixes every handle.
    pub marker: char,
    /// Display name the directory uses for participants without a real name. Such entries are
    /// never offered as candidates.
    pub placeholder_name: String,
    /// Inserted after a committed handle unless whitespace already follows the caret.
    pub separator: char,
    /// Refresh interval for polled (public) directories.
    pub poll_interval_secs: u64,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER,
            placeholder_name: DEFAULT_PLACEHOLDER_NAME.to_string(),
            separator: DEFAULT_SEPARATOR,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl ComposerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.marker.is_whitespace() || self.marker.is_alphanumeric() || self.marker == '_' {
            return Err(ConfigError::InvalidMarker(self.marker));
        }
        if !self.separator.is_whitespace() {
            return Err(ConfigError::InvalidSeparator(self.separator));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("mention marker must be a symbol, got {0:?}")]
    InvalidMarker(char),
    #[error("mention separator must be whitespace, got {0:?}")]
    InvalidSeparator(char),
    #[error("directory poll interval must be at least one second")]
    ZeroPollInterval,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = ComposerConfig::default();
        assert_eq!(config.marker, '@');
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_unusable_values() {
        let config = ComposerConfig {
            marker: 'a',
            ..ComposerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidMarker('a')));

        let config = ComposerConfig {
            separator: ',',
            ..ComposerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSeparator(',')));

        let config = ComposerConfig {
            poll_interval_secs: 0,
            ..ComposerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroPollInterval));
    }
}
