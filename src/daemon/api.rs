//! JSON bodies of the daemon's HTTP interface. They are shared by the server, the HTTP gateway
//! and the cli, and stay compatible with the browser extension's `/data` and `/health` calls.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    classifier::Breakdown,
    tracker::{event::TransitionEvent, site::Site, totals::Totals},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Totals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataRequest {
    pub data: Totals,
}

/// Event reported by the browser. Urls are normalized into sites on arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventRequest {
    Activate { url: Option<String> },
    UrlChange { url: Option<String> },
    FocusLost,
    FocusGained { url: Option<String> },
    Tick,
}

impl From<EventRequest> for TransitionEvent {
    fn from(value: EventRequest) -> Self {
        match value {
            EventRequest::Activate { url } => TransitionEvent::Activate(url_to_site(url)),
            EventRequest::UrlChange { url } => TransitionEvent::UrlChange(url_to_site(url)),
            EventRequest::FocusLost => TransitionEvent::FocusLost,
            EventRequest::FocusGained { url } => TransitionEvent::FocusGained(url_to_site(url)),
            EventRequest::Tick => TransitionEvent::Tick,
        }
    }
}

/// Urls that can't be tracked become `None`, which makes the tracker idle.
fn url_to_site(url: Option<String>) -> Option<Site> {
    let url = url?;
    Site::from_url(&url)
        .inspect_err(|e| warn!("Not tracking {url:?}: {e}"))
        .ok()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub sites: Totals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub success: bool,
    pub analysis: Breakdown,
}

#[cfg(test)]
mod tests {
    use crate::tracker::{event::TransitionEvent, site::Site};

    use super::EventRequest;

    #[test]
    fn parses_extension_events() {
        let event: EventRequest =
            serde_json::from_str(r#"{ "type": "urlChange", "url": "https://www.github.com/a" }"#)
                .unwrap();
        assert_eq!(
            TransitionEvent::from(event),
            TransitionEvent::UrlChange(Site::from_host("github.com"))
        );

        let event: EventRequest = serde_json::from_str(r#"{ "type": "focusLost" }"#).unwrap();
        assert_eq!(TransitionEvent::from(event), TransitionEvent::FocusLost);
    }

    #[test]
    fn untrackable_urls_become_none() {
        let event: EventRequest =
            serde_json::from_str(r#"{ "type": "activate", "url": "about:blank" }"#).unwrap();
        assert_eq!(TransitionEvent::from(event), TransitionEvent::Activate(None));

        let event: EventRequest = serde_json::from_str(r#"{ "type": "activate" }"#).unwrap();
        assert_eq!(TransitionEvent::from(event), TransitionEvent::Activate(None));
    }
}
