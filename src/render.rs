//! Message payload rendering.
//!
//! Rendering is a boundary concern: the converter hands every message's type
//! and payload to a [`PayloadRenderer`] and embeds whatever comes back in the
//! intent record. [`DialogflowRenderer`] is the default implementation and
//! produces Dialogflow response-message objects.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Error type for rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// A field required by the message type is missing or has the wrong type.
    #[error("{message_type} payload is missing field '{field}'")]
    MissingField {
        /// Message type being rendered.
        message_type: String,
        /// Missing field.
        field: String,
    },
}

/// Target platform of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// No platform-specific responses.
    Generic,
    /// Actions on Google.
    Google,
    /// Facebook Messenger.
    Facebook,
    /// Slack.
    Slack,
    /// Telegram.
    Telegram,
    /// Kik.
    Kik,
    /// Skype.
    Skype,
    /// LINE.
    Line,
    /// Viber.
    Viber,
}

impl Platform {
    /// Platforms Dialogflow can use as default response platforms.
    pub const SUPPORTED: [Platform; 8] = [
        Self::Google,
        Self::Facebook,
        Self::Slack,
        Self::Telegram,
        Self::Kik,
        Self::Skype,
        Self::Line,
        Self::Viber,
    ];

    /// Parse platform from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "generic" | "" => Some(Self::Generic),
            "google" | "actions-on-google" => Some(Self::Google),
            "facebook" | "messenger" => Some(Self::Facebook),
            "slack" => Some(Self::Slack),
            "telegram" => Some(Self::Telegram),
            "kik" => Some(Self::Kik),
            "skype" => Some(Self::Skype),
            "line" => Some(Self::Line),
            "viber" => Some(Self::Viber),
            _ => None,
        }
    }

    /// Whether this platform is in the supported set.
    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::Generic
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "generic"),
            Self::Google => write!(f, "google"),
            Self::Facebook => write!(f, "facebook"),
            Self::Slack => write!(f, "slack"),
            Self::Telegram => write!(f, "telegram"),
            Self::Kik => write!(f, "kik"),
            Self::Skype => write!(f, "skype"),
            Self::Line => write!(f, "line"),
            Self::Viber => write!(f, "viber"),
        }
    }
}

/// Renders a message payload into a platform message object.
pub trait PayloadRenderer: Send + Sync {
    /// Render one message.
    fn render(&self, message_type: &str, payload: &Value) -> Result<Value, RenderError>;

    /// Platform the rendered messages target.
    fn platform(&self) -> Platform;
}

/// Default renderer producing Dialogflow response messages.
///
/// | message type | Dialogflow type |
/// |--------------|-----------------|
/// | `text` | 0 (speech) |
/// | `card`, `generic`, `button` | 1 (card) |
/// | `quick_replies` | 2 (quick replies) |
/// | `image` | 3 (image) |
/// | anything else | 4 (custom payload) |
#[derive(Debug, Clone)]
pub struct DialogflowRenderer {
    platform: Platform,
    language: String,
}

impl DialogflowRenderer {
    /// Create a renderer.
    pub fn new(platform: Platform, language: impl Into<String>) -> Self {
        Self {
            platform,
            language: language.into(),
        }
    }

    fn render_body(&self, message_type: &str, payload: &Value) -> Result<Value, RenderError> {
        let missing = |field: &str| RenderError::MissingField {
            message_type: message_type.to_string(),
            field: field.to_string(),
        };

        let body = match message_type {
            "text" => {
                let text = str_field(payload, &["text"]).ok_or_else(|| missing("text"))?;
                json!({ "type": 0, "speech": text })
            }
            "image" => {
                let url = str_field(payload, &["image_url", "imageUrl"]).ok_or_else(|| missing("image_url"))?;
                json!({ "type": 3, "imageUrl": url })
            }
            "quick_replies" => {
                let replies = payload
                    .get("quick_replies")
                    .and_then(Value::as_array)
                    .ok_or_else(|| missing("quick_replies"))?;
                let titles: Vec<&str> = replies
                    .iter()
                    .filter_map(|r| str_field(r, &["title", "text"]))
                    .collect();
                json!({
                    "type": 2,
                    "title": str_field(payload, &["text"]).unwrap_or_default(),
                    "replies": titles,
                })
            }
            "card" | "generic" | "button" => {
                let card = payload
                    .get("elements")
                    .and_then(Value::as_array)
                    .and_then(|elements| elements.first())
                    .unwrap_or(payload);
                let title = str_field(card, &["title", "text"]).ok_or_else(|| missing("title"))?;
                let buttons: Vec<Value> = card
                    .get("buttons")
                    .and_then(Value::as_array)
                    .map(|buttons| {
                        buttons
                            .iter()
                            .map(|b| {
                                json!({
                                    "text": str_field(b, &["title", "text"]).unwrap_or_default(),
                                    "postback": str_field(b, &["payload", "url"]).unwrap_or_default(),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                let mut body = Map::new();
                body.insert("type".into(), json!(1));
                body.insert("title".into(), json!(title));
                if let Some(subtitle) = str_field(card, &["subtitle"]) {
                    body.insert("subtitle".into(), json!(subtitle));
                }
                if let Some(url) = str_field(card, &["image_url", "imageUrl"]) {
                    body.insert("imageUrl".into(), json!(url));
                }
                body.insert("buttons".into(), Value::Array(buttons));
                Value::Object(body)
            }
            _ => json!({ "type": 4, "payload": payload }),
        };
        Ok(body)
    }
}

impl Default for DialogflowRenderer {
    fn default() -> Self {
        Self::new(Platform::Generic, crate::DEFAULT_LANGUAGE)
    }
}

impl PayloadRenderer for DialogflowRenderer {
    fn render(&self, message_type: &str, payload: &Value) -> Result<Value, RenderError> {
        let mut body = self.render_body(message_type, payload)?;
        if let Value::Object(map) = &mut body {
            map.insert("lang".into(), json!(self.language));
            if self.platform.is_supported() {
                map.insert("platform".into(), json!(self.platform.to_string()));
            }
        }
        Ok(body)
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}

/// First string value among `keys`.
fn str_field<'v>(value: &'v Value, keys: &[&str]) -> Option<&'v str> {
    keys.iter().find_map(|k| value.get(*k).and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parsing() {
        assert_eq!(Platform::from_str("Facebook"), Some(Platform::Facebook));
        assert_eq!(Platform::from_str(""), Some(Platform::Generic));
        assert_eq!(Platform::from_str("myspace"), None);
        assert!(Platform::Slack.is_supported());
        assert!(!Platform::Generic.is_supported());
    }

    #[test]
    fn test_text() {
        let renderer = DialogflowRenderer::default();
        let out = renderer.render("text", &json!({ "text": "Hi there" })).unwrap();
        assert_eq!(out, json!({ "type": 0, "speech": "Hi there", "lang": "en" }));
    }

    #[test]
    fn test_text_missing_field() {
        let renderer = DialogflowRenderer::default();
        let err = renderer.render("text", &json!({})).unwrap_err();
        assert_eq!(
            err,
            RenderError::MissingField {
                message_type: "text".into(),
                field: "text".into()
            }
        );
    }

    #[test]
    fn test_platform_is_tagged_when_supported() {
        let renderer = DialogflowRenderer::new(Platform::Slack, "en");
        let out = renderer.render("image", &json!({ "image_url": "https://x/y.png" })).unwrap();
        assert_eq!(out["type"], 3);
        assert_eq!(out["platform"], "slack");
        assert_eq!(out["imageUrl"], "https://x/y.png");
    }

    #[test]
    fn test_quick_replies() {
        let renderer = DialogflowRenderer::default();
        let payload = json!({
            "text": "Pick one",
            "quick_replies": [{ "title": "Yes", "payload": "y" }, { "title": "No", "payload": "n" }]
        });
        let out = renderer.render("quick_replies", &payload).unwrap();
        assert_eq!(out["type"], 2);
        assert_eq!(out["title"], "Pick one");
        assert_eq!(out["replies"], json!(["Yes", "No"]));
    }

    #[test]
    fn test_generic_card_uses_first_element() {
        let renderer = DialogflowRenderer::default();
        let payload = json!({
            "elements": [{
                "title": "Pizza",
                "subtitle": "Cheesy",
                "image_url": "https://x/p.png",
                "buttons": [{ "title": "Order", "payload": "ORDER" }]
            }]
        });
        let out = renderer.render("generic", &payload).unwrap();
        assert_eq!(out["type"], 1);
        assert_eq!(out["title"], "Pizza");
        assert_eq!(out["subtitle"], "Cheesy");
        assert_eq!(out["buttons"], json!([{ "text": "Order", "postback": "ORDER" }]));
    }

    #[test]
    fn test_unknown_type_is_custom_payload() {
        let renderer = DialogflowRenderer::default();
        let payload = json!({ "anything": [1, 2] });
        let out = renderer.render("carousel", &payload).unwrap();
        assert_eq!(out["type"], 4);
        assert_eq!(out["payload"], payload);
    }
}
