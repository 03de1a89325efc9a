//! Discord webhook JSON.

use serde::Serialize;

pub mod colors {
    pub const GREEN: u32 = 0x00ff00;
    pub const RED: u32 = 0xff0000;
    pub const ORANGE: u32 = 0xffaa00;
    pub const GRAY: u32 = 0x808080;
}

/// Body of a webhook POST: plain text, embeds, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl WebhookPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embeds: Vec::new(),
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embeds: vec![embed],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    /// RFC 3339.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }

    pub fn inline(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            inline: true,
            ..Self::new(name, value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_payload_has_only_content() {
        let value = serde_json::to_value(WebhookPayload::text("hello")).unwrap();
        assert_eq!(value, json!({"content": "hello"}));
    }

    #[test]
    fn test_embed_payload_skips_empty_parts() {
        let payload = WebhookPayload::embed(Embed {
            title: "t".to_string(),
            color: colors::GREEN,
            fields: vec![EmbedField::inline("Stars", "3"), EmbedField::new("URL", "u")],
            ..Embed::default()
        });

        let value = serde_json::to_value(payload).unwrap();
        assert_eq!(
            value,
            json!({
                "embeds": [{
                    "title": "t",
                    "color": 0x00ff00,
                    "fields": [
                        {"name": "Stars", "value": "3", "inline": true},
                        {"name": "URL", "value": "u"}
                    ]
                }]
            })
        );
    }
}
