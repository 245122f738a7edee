//! Notification Sink
//!
//! Bounded stack of visible notifications fed by the watchers and by manual
//! requests from the API.
//!
//! ## Behavior
//!
//! - At most `max_visible` notifications are visible, most recent first
//! - Each notification auto-dismisses after its timeout unless the user
//!   dismisses it earlier
//! - Nothing is shown while do-not-disturb (the panel screensaver) is active
//! - Every change is published as a [`SinkEvent`] for the WebSocket hub

mod sink;

pub use sink::{DismissReason, Notification, NotificationId, NotificationSink, SinkConfig, SinkEvent};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A request to show one notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub icon: IconSource,
    /// Display duration; the sink default applies when absent
    #[serde(default)]
    pub timeout: Option<Duration>,
}

impl NotificationRequest {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            icon: IconSource::default(),
            timeout: None,
        }
    }

    /// Set the avatar reference (takes precedence over any icon)
    pub fn avatar(mut self, avatar: Option<impl Into<String>>) -> Self {
        self.icon.avatar = avatar.map(Into::into);
        self
    }

    /// Set the explicit icon
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon.icon = Some(icon.into());
        self
    }

    /// Set the icon used when neither avatar nor icon is present
    pub fn fallback_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon.fallback_icon = Some(icon.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Icon references attached to a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconSource {
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub fallback_icon: Option<String>,
}

impl IconSource {
    /// Resolve the icon to display: avatar, then icon, then fallback.
    ///
    /// Empty references count as absent. Bare file names (no `/`) are joined
    /// onto `icon_base`; avatars are always used verbatim.
    pub fn resolve(&self, icon_base: &str) -> Option<String> {
        fn present(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|s| !s.trim().is_empty())
        }

        if let Some(avatar) = present(&self.avatar) {
            return Some(avatar.to_string());
        }

        present(&self.icon)
            .or_else(|| present(&self.fallback_icon))
            .map(|name| {
                if name.contains('/') {
                    name.to_string()
                } else {
                    format!("{}/{}", icon_base.trim_end_matches('/'), name)
                }
            })
    }
}

/// Externally toggled do-not-disturb switch
///
/// Set while the panel screensaver is showing. Cloning shares the switch.
#[derive(Debug, Clone, Default)]
pub struct DoNotDisturb {
    active: Arc<AtomicBool>,
}

impl DoNotDisturb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Set the switch, returning the previous value
    pub fn set(&self, active: bool) -> bool {
        self.active.swap(active, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_precedence() {
        let icon = IconSource {
            avatar: Some("https://cdn.example/a.png".into()),
            icon: Some("light.svg".into()),
            fallback_icon: Some("steam.svg".into()),
        };
        assert_eq!(icon.resolve("/static/icons").as_deref(), Some("https://cdn.example/a.png"));

        let icon = IconSource {
            avatar: None,
            icon: Some("light.svg".into()),
            fallback_icon: Some("steam.svg".into()),
        };
        assert_eq!(icon.resolve("/static/icons").as_deref(), Some("/static/icons/light.svg"));

        let icon = IconSource {
            avatar: Some(String::new()),
            icon: None,
            fallback_icon: Some("steam.svg".into()),
        };
        assert_eq!(icon.resolve("/static/icons/").as_deref(), Some("/static/icons/steam.svg"));

        assert_eq!(IconSource::default().resolve("/static/icons"), None);
    }

    #[test]
    fn test_icon_with_path_kept_verbatim() {
        let icon = IconSource {
            icon: Some("/custom/printer.svg".into()),
            ..Default::default()
        };
        assert_eq!(icon.resolve("/static/icons").as_deref(), Some("/custom/printer.svg"));
    }

    #[test]
    fn test_request_builder() {
        let req = NotificationRequest::new("Steam", "alice is now online")
            .avatar(Some("a.png"))
            .fallback_icon("steam.svg")
            .timeout(Duration::from_secs(3));

        assert_eq!(req.title, "Steam");
        assert_eq!(req.icon.avatar.as_deref(), Some("a.png"));
        assert_eq!(req.icon.fallback_icon.as_deref(), Some("steam.svg"));
        assert_eq!(req.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_do_not_disturb_shared() {
        let dnd = DoNotDisturb::new();
        let other = dnd.clone();
        assert!(!dnd.set(true));
        assert!(other.is_active());
        assert!(other.set(false));
        assert!(!dnd.is_active());
    }
}
