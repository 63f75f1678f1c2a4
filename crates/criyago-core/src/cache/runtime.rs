//! Out-of-band signals from the host and the effects the manager asks the
//! host to carry out.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Body used when a push message arrives without a payload.
pub const DEFAULT_PUSH_BODY: &str = "New games available!";

/// Tag of the only background-sync registration the app makes.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

pub const EXPLORE_ACTION: &str = "explore";
pub const CLOSE_ACTION: &str = "close";

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Sync { tag: String },
    Push { payload: Option<String> },
    NotificationClick { action: Option<String> },
}

/// Effects the host runtime performs on the manager's behalf.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RuntimeAction {
    /// Activate the freshly installed version without waiting for old pages to close
    SkipWaiting,
    /// Take control of every open page context
    ClaimClients,
    ShowNotification {
        title: String,
        notification: Notification,
    },
    CloseNotification,
    OpenWindow { url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationData {
    pub date_of_arrival: DateTime<Utc>,
    pub primary_key: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

impl Notification {
    pub fn new(body: String, icon: &str) -> Self {
        Self {
            body,
            icon: icon.to_string(),
            badge: icon.to_string(),
            vibrate: vec![100, 50, 100],
            data: NotificationData {
                date_of_arrival: Utc::now(),
                primary_key: 1,
            },
            actions: vec![
                NotificationAction {
                    action: EXPLORE_ACTION.to_string(),
                    title: "Explore Games".to_string(),
                    icon: icon.to_string(),
                },
                NotificationAction {
                    action: CLOSE_ACTION.to_string(),
                    title: "Close".to_string(),
                    icon: icon.to_string(),
                },
            ],
        }
    }
}
