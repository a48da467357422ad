use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagwatchError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] refinery::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Fetch failed: {0}")]
    FetchError(String),

    #[error("No tag list found on {0}")]
    TagSectionMissing(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Notification failed: {0}")]
    NotificationError(String),

    #[error("Mock server error: {0}")]
    ServerError(String),
}

impl TagwatchError {
    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            TagwatchError::HttpError(_) | TagwatchError::FetchError(_) => Some(
                "Check that the page is reachable, or try:\n  tagwatch check <URL>"
            ),
            TagwatchError::TagSectionMissing(_) => Some(
                "Make sure the URL points at a project page with a \"Tags\" list.\nIf the page needs a session, add a Cookie header to config.toml"
            ),
            TagwatchError::NotificationError(_) => Some(
                "Check the [notify] section of config.toml, or set `type = \"bell\"`"
            ),
            TagwatchError::DatabaseError(_) | TagwatchError::MigrationError(_) => Some(
                "Point TAGWATCH_DB at a writable file to use a fresh state database"
            ),
            TagwatchError::ServerError(_) => Some(
                "Another process may already be using that port, try --port"
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TagwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_for_missing_section() {
        let err = TagwatchError::TagSectionMissing("http://localhost:3000/".into());
        assert!(err.to_string().contains("localhost:3000"));
        assert!(err.hint().unwrap().contains("Cookie"));
    }

    #[test]
    fn test_no_hint_for_config_errors() {
        let err = TagwatchError::ConfigError("bad".into());
        assert!(err.hint().is_none());
    }
}
