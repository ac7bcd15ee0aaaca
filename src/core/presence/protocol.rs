//! Wire format of the presence relay socket.
//!
//! Every frame is a JSON object `{ "op": <u8>, "t": <event?>, "d": <payload?> }`.

use crate::domain::model::PresenceSnapshot;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const OP_EVENT: u8 = 0;
pub const OP_HELLO: u8 = 1;
pub const OP_INITIALIZE: u8 = 2;
pub const OP_HEARTBEAT: u8 = 3;

pub const EVENT_INIT_STATE: &str = "INIT_STATE";
pub const EVENT_PRESENCE_UPDATE: &str = "PRESENCE_UPDATE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub op: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Hello { heartbeat_interval: Option<Duration> },
    Presence(Box<PresenceSnapshot>),
    Other { op: u8, event: Option<String> },
}

pub fn subscribe_message(discord_id: &str) -> String {
    serde_json::json!({ "op": OP_INITIALIZE, "d": { "subscribe_to_id": discord_id } }).to_string()
}

pub fn heartbeat_message() -> String {
    format!("{{\"op\":{}}}", OP_HEARTBEAT)
}

pub fn decode(text: &str) -> Result<ServerMessage> {
    let frame: Frame = serde_json::from_str(text)?;

    match (frame.op, frame.t.as_deref()) {
        (OP_HELLO, _) => {
            let heartbeat_interval = frame
                .d
                .as_ref()
                .and_then(|d| d.get("heartbeat_interval"))
                .and_then(Value::as_u64)
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis);
            Ok(ServerMessage::Hello { heartbeat_interval })
        }
        (OP_EVENT, Some(EVENT_INIT_STATE | EVENT_PRESENCE_UPDATE)) => {
            let payload = frame.d.unwrap_or(Value::Null);
            let snapshot: PresenceSnapshot = serde_json::from_value(payload)?;
            Ok(ServerMessage::Presence(Box::new(snapshot)))
        }
        (op, event) => Ok(ServerMessage::Other {
            op,
            event: event.map(str::to_string),
        }),
    }
}

/// Rewrites activity `large_image` references into fetchable URLs.
///
/// `mp:external/<hash>/<scheme>/<host>/<path>` proxies point straight at the
/// original host; anything else is an application asset id on the CDN.
pub fn normalize_activity_assets(snapshot: &mut PresenceSnapshot, cdn_base: &str) {
    let cdn_base = cdn_base.trim_end_matches('/');
    for activity in &mut snapshot.activities {
        let app_id = activity.application_id.clone().unwrap_or_default();
        let Some(assets) = activity.assets.as_mut() else {
            continue;
        };
        let Some(image) = assets.large_image.as_deref() else {
            continue;
        };
        if image.is_empty() || image.starts_with("https://") {
            continue;
        }

        let resolved = if image.starts_with("mp:external/") {
            let rest: Vec<&str> = image.split('/').skip(3).collect();
            format!("https://{}", rest.join("/"))
        } else {
            format!("{}/app-assets/{}/{}.png", cdn_base, app_id, image)
        };
        assets.large_image = Some(resolved);
    }
}
