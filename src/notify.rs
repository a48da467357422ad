use std::io::Write;
use std::process::{Command, Stdio};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{Config, NotifyTarget};
use crate::error::{Result, TagwatchError};
use crate::tag::Tag;

/// Title of every tag notification
pub const NOTIFICATION_TITLE: &str = "Moulinette tag processed";

/// A titled text notification with an optional click target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<String>,
    pub detected_at: DateTime<Utc>,
}

impl Notification {
    /// Build the notification for a newly succeeded tag
    pub fn for_tag(project: &str, tag: &Tag, page_url: &str) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body: format!("{}: {} ({}%)", project, tag.name, tag.percent_display()),
            url: Some(
                tag.detail_link
                    .as_ref()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| page_url.to_string()),
            ),
            tag: tag.name.clone(),
            percent: tag.percent.clone(),
            detected_at: Utc::now(),
        }
    }
}

/// Delivers notifications to the user. Fire-and-forget: no delivery guarantee.
pub trait NotificationSink {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Sink backed by the configured target
pub struct TargetSink {
    target: NotifyTarget,
    chime: bool,
}

impl TargetSink {
    pub fn new(target: NotifyTarget, chime: bool) -> Self {
        Self { target, chime }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.notify.clone(), config.chime)
    }
}

impl NotificationSink for TargetSink {
    fn notify(&self, notification: &Notification) -> Result<()> {
        if self.chime && self.target != NotifyTarget::Bell {
            ring_bell()?;
        }
        send_notification(&self.target, notification)
    }
}

/// Send a notification to the specified target
pub fn send_notification(target: &NotifyTarget, notification: &Notification) -> Result<()> {
    tracing::debug!(tag = %notification.tag, ?target, "sending notification");

    match target {
        NotifyTarget::Desktop => send_desktop(notification),
        NotifyTarget::Bell => ring_bell(),
        NotifyTarget::Command { command } => send_command(command, notification),
        NotifyTarget::Ntfy { topic, server } => send_ntfy(topic, server.as_deref(), notification),
        NotifyTarget::Gotify { server, token } => send_gotify(server, token, notification),
    }
}

/// Terminal chime
fn ring_bell() -> Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(b"\x07")?;
    stdout.flush()?;
    Ok(())
}

/// Native desktop pop-up
fn send_desktop(notification: &Notification) -> Result<()> {
    let output = if cfg!(target_os = "macos") {
        let script = format!(
            "display notification {} with title {}",
            applescript_string(&notification.body),
            applescript_string(&notification.title),
        );
        Command::new("osascript").args(["-e", &script]).output()
    } else {
        Command::new("notify-send")
            .args(["--app-name", "tagwatch", &notification.title, &notification.body])
            .output()
    };

    let output = output.map_err(|e| {
        TagwatchError::NotificationError(format!("Desktop notifier unavailable: {}", e))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TagwatchError::NotificationError(format!(
            "Desktop notifier failed: {}",
            stderr.trim()
        )));
    }

    Ok(())
}

fn applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Send notification via custom command (JSON on stdin)
fn send_command(command: &str, notification: &Notification) -> Result<()> {
    let json = serde_json::to_string(notification)?;

    let mut child = Command::new("sh")
        .args(["-c", command])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(ref mut stdin) = child.stdin {
        stdin.write_all(json.as_bytes())?;
    }

    let output = child.wait_with_output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TagwatchError::NotificationError(format!(
            "Command failed: {}",
            stderr
        )));
    }

    Ok(())
}

/// Send notification via ntfy
fn send_ntfy(topic: &str, server: Option<&str>, notification: &Notification) -> Result<()> {
    let server = server.unwrap_or("https://ntfy.sh");
    let url = format!("{}/{}", server.trim_end_matches('/'), topic);

    let mut request = ureq::post(&url)
        .header("Title", &notification.title)
        .header("Tags", "white_check_mark");
    if let Some(ref click) = notification.url {
        request = request.header("Click", click);
    }
    request.send(&notification.body)?;

    Ok(())
}

/// Send notification via Gotify
fn send_gotify(server: &str, token: &str, notification: &Notification) -> Result<()> {
    let url = format!("{}/message?token={}", server.trim_end_matches('/'), token);

    let mut payload = serde_json::json!({
        "title": notification.title,
        "message": notification.body,
        "priority": 5,
    });
    if let Some(ref click) = notification.url {
        payload["extras"] = serde_json::json!({
            "client::notification": {
                "click": { "url": click }
            }
        });
    }

    ureq::post(&url)
        .header("Content-Type", "application/json")
        .send_json(&payload)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TagStatus;

    #[test]
    fn test_notification_text() {
        let tag = Tag::new("t1", TagStatus::Succeeded).with_percent("80");
        let n = Notification::for_tag("Hello World", &tag, "https://intra.example/p1/");
        assert_eq!(n.title, "Moulinette tag processed");
        assert_eq!(n.body, "Hello World: t1 (80%)");
        assert_eq!(n.url.as_deref(), Some("https://intra.example/p1/"));
    }

    #[test]
    fn test_missing_percent_and_detail_link() {
        let mut tag = Tag::new("t2", TagStatus::Succeeded);
        tag.detail_link = Some(url::Url::parse("https://intra.example/p1/t2").unwrap());
        let n = Notification::for_tag("P", &tag, "https://intra.example/p1/");
        assert_eq!(n.body, "P: t2 (?%)");
        assert_eq!(n.url.as_deref(), Some("https://intra.example/p1/t2"));
    }

    #[test]
    fn test_payload_serialization() {
        let tag = Tag::new("t1", TagStatus::Succeeded).with_percent("100");
        let n = Notification::for_tag("P", &tag, "http://localhost:3000/");
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains("\"tag\":\"t1\""));
        assert!(json.contains("\"percent\":\"100\""));
    }

    #[test]
    fn test_command_target_receives_json() {
        let tag = Tag::new("t1", TagStatus::Succeeded).with_percent("100");
        let n = Notification::for_tag("P", &tag, "http://localhost:3000/");
        let target = NotifyTarget::Command { command: "grep -q '\"tag\":\"t1\"'".into() };
        assert!(send_notification(&target, &n).is_ok());

        let failing = NotifyTarget::Command { command: "exit 3".into() };
        assert!(matches!(
            send_notification(&failing, &n),
            Err(TagwatchError::NotificationError(_))
        ));
    }

    #[test]
    fn test_applescript_escaping() {
        assert_eq!(applescript_string(r#"a "b""#), r#""a \"b\"""#);
    }
}
