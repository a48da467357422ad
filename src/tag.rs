use serde::Serialize;

/// Grading status of a tag, as reported by its trace symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum TagStatus {
    Idle,
    Processing,
    Succeeded,
    /// Grading failed; carries the error subtype
    Error(String),
}

impl TagStatus {
    /// Map a status token (and optional error subtype) to a status
    ///
    /// Unknown tokens are treated as still processing so a later,
    /// recognizable success is reported.
    pub fn from_token(token: &str, error_status: Option<&str>) -> Self {
        let token = token.trim().to_ascii_uppercase();
        match token.as_str() {
            "" | "IDLE" => TagStatus::Idle,
            "PROCESSING" | "PENDING" | "RUNNING" => TagStatus::Processing,
            "SUCCEEDED" => TagStatus::Succeeded,
            "ERROR" | "FAILED" => {
                let subtype = error_status
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .unwrap_or(token);
                TagStatus::Error(subtype)
            }
            _ => TagStatus::Processing,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TagStatus::Succeeded)
    }

    pub fn label(&self) -> &str {
        match self {
            TagStatus::Idle => "idle",
            TagStatus::Processing => "processing",
            TagStatus::Succeeded => "succeeded",
            TagStatus::Error(kind) => kind,
        }
    }
}

/// One entry of a project's tag list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub name: String,
    /// Success percentage as displayed, e.g. "80"
    pub percent: Option<String>,
    pub status: TagStatus,
    pub detail_link: Option<url::Url>,
}

impl Tag {
    pub fn new(name: impl Into<String>, status: TagStatus) -> Self {
        Self {
            name: name.into(),
            percent: None,
            status,
            detail_link: None,
        }
    }

    pub fn with_percent(mut self, percent: impl Into<String>) -> Self {
        self.percent = Some(percent.into());
        self
    }

    /// A perfect score ends the watch
    pub fn is_perfect(&self) -> bool {
        self.percent
            .as_deref()
            .and_then(|p| p.trim().trim_end_matches('%').parse::<f64>().ok())
            .is_some_and(|p| p == 100.0)
    }

    pub fn percent_display(&self) -> &str {
        self.percent.as_deref().unwrap_or("?")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tokens() {
        assert_eq!(TagStatus::from_token("SUCCEEDED", None), TagStatus::Succeeded);
        assert_eq!(TagStatus::from_token("succeeded", None), TagStatus::Succeeded);
        assert_eq!(TagStatus::from_token("", None), TagStatus::Idle);
        assert_eq!(TagStatus::from_token("PROCESSING", None), TagStatus::Processing);
        assert_eq!(TagStatus::from_token("SOMETHING_NEW", None), TagStatus::Processing);
    }

    #[test]
    fn test_error_subtype() {
        assert_eq!(
            TagStatus::from_token("ERROR", Some("TIMEOUT")),
            TagStatus::Error("TIMEOUT".into())
        );
        assert_eq!(
            TagStatus::from_token("FAILED", Some(" ")),
            TagStatus::Error("FAILED".into())
        );
    }

    #[test]
    fn test_is_perfect() {
        assert!(Tag::new("t", TagStatus::Succeeded).with_percent("100").is_perfect());
        assert!(Tag::new("t", TagStatus::Succeeded).with_percent("100.0").is_perfect());
        assert!(!Tag::new("t", TagStatus::Succeeded).with_percent("99").is_perfect());
        assert!(!Tag::new("t", TagStatus::Succeeded).with_percent("?").is_perfect());
        assert!(!Tag::new("t", TagStatus::Succeeded).is_perfect());
    }
}
