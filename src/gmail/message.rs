use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Deserialize;

use crate::error::Result;

/// Gmail hands out URL-safe base64 both with and without trailing padding.
pub const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn decode_url_safe(data: &str) -> Result<Vec<u8>> {
    Ok(URL_SAFE_LENIENT.decode(data.trim_end())?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyRef {
    /// URL-safe base64 data carried in the message itself.
    Inline(String),
    /// Opaque id; the bytes must be fetched separately.
    Attachment(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPart {
    pub filename: Option<String>,
    pub body: Option<BodyRef>,
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub headers: Vec<Header>,
    pub payload: ContentPart,
}

impl Message {
    /// First header with exactly this name. Names are compared as received.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.name == name)
            .map(|header| header.value.as_str())
    }
}

/// Entry of a `messages.list` response.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub name: String,
}

// Wire shapes of `messages.get?format=full`.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawMessage {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub payload: Option<RawPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPart {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub headers: Vec<RawHeader>,
    #[serde(default)]
    pub body: Option<RawBody>,
    #[serde(default)]
    pub parts: Vec<RawPart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawBody {
    #[serde(default)]
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

impl RawBody {
    fn into_body_ref(self) -> Option<BodyRef> {
        match (self.attachment_id, self.data) {
            (Some(id), _) if !id.is_empty() => Some(BodyRef::Attachment(id)),
            (_, Some(data)) if !data.is_empty() => Some(BodyRef::Inline(data)),
            _ => None,
        }
    }
}

impl From<RawPart> for ContentPart {
    fn from(raw: RawPart) -> Self {
        // Converted without recursion: the tree shape comes from the remote side.
        // Each frame holds the raw children still to convert and the converted ones so far.
        struct Frame {
            filename: Option<String>,
            body: Option<BodyRef>,
            pending: std::vec::IntoIter<RawPart>,
            done: Vec<ContentPart>,
        }

        fn open(raw: RawPart) -> Frame {
            Frame {
                filename: raw.filename.filter(|name| !name.is_empty()),
                body: raw.body.and_then(RawBody::into_body_ref),
                pending: raw.parts.into_iter(),
                done: Vec::new(),
            }
        }

        let mut stack = vec![open(raw)];
        loop {
            let Some(top) = stack.last_mut() else {
                return ContentPart::default();
            };
            if let Some(child) = top.pending.next() {
                stack.push(open(child));
                continue;
            }
            let Some(frame) = stack.pop() else {
                return ContentPart::default();
            };
            let part = ContentPart {
                filename: frame.filename,
                body: frame.body,
                parts: frame.done,
            };
            match stack.last_mut() {
                Some(parent) => parent.done.push(part),
                None => return part,
            }
        }
    }
}

impl From<RawMessage> for Message {
    fn from(raw: RawMessage) -> Self {
        let mut payload = raw.payload.unwrap_or(RawPart {
            filename: None,
            headers: Vec::new(),
            body: None,
            parts: Vec::new(),
        });
        let headers = std::mem::take(&mut payload.headers)
            .into_iter()
            .map(|header| Header {
                name: header.name,
                value: header.value,
            })
            .collect();
        Message {
            id: raw.id,
            thread_id: raw.thread_id,
            headers,
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_message_json_becomes_part_tree() {
        let json = r#"{
            "id": "m1",
            "threadId": "t1",
            "payload": {
                "filename": "",
                "headers": [
                    {"name": "From", "value": "a@x.com"},
                    {"name": "Subject", "value": "Report"}
                ],
                "body": {"size": 0},
                "parts": [
                    {"filename": "", "body": {"data": "aGVsbG8", "size": 5}},
                    {"filename": "report.xlsx", "body": {"attachmentId": "A1", "size": 10}}
                ]
            }
        }"#;

        let raw: RawMessage = serde_json::from_str(json).unwrap();
        let message = Message::from(raw);

        assert_eq!(message.id, "m1");
        assert_eq!(message.thread_id, "t1");
        assert_eq!(message.header("Subject"), Some("Report"));
        assert_eq!(message.payload.filename, None);
        assert_eq!(message.payload.body, None);
        assert_eq!(message.payload.parts.len(), 2);
        assert_eq!(
            message.payload.parts[0].body,
            Some(BodyRef::Inline("aGVsbG8".to_string()))
        );
        assert_eq!(
            message.payload.parts[1].filename.as_deref(),
            Some("report.xlsx")
        );
        assert_eq!(
            message.payload.parts[1].body,
            Some(BodyRef::Attachment("A1".to_string()))
        );
    }

    #[test]
    fn test_header_lookup_is_case_sensitive() {
        let message = Message {
            headers: vec![Header {
                name: "Message-Id".to_string(),
                value: "<m1>".to_string(),
            }],
            ..Default::default()
        };

        assert_eq!(message.header("Message-ID"), None);
        assert_eq!(message.header("Message-Id"), Some("<m1>"));
    }

    #[test]
    fn test_decode_accepts_padded_and_unpadded() {
        assert_eq!(decode_url_safe("aGVsbG8").unwrap(), b"hello");
        assert_eq!(decode_url_safe("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_url_safe("-_8").unwrap(), vec![0xfb, 0xff]);
        assert!(decode_url_safe("not base64!").is_err());
    }

    #[test]
    fn test_deep_wire_tree_keeps_every_level() {
        let mut raw = RawPart {
            filename: Some("deep.xlsx".to_string()),
            headers: Vec::new(),
            body: None,
            parts: Vec::new(),
        };
        for _ in 0..100 {
            raw = RawPart {
                filename: None,
                headers: Vec::new(),
                body: None,
                parts: vec![raw],
            };
        }

        let part = ContentPart::from(raw);

        let mut depth = 0;
        let mut node = &part;
        while let Some(child) = node.parts.first() {
            node = child;
            depth += 1;
        }
        assert_eq!(depth, 100);
        assert_eq!(node.filename.as_deref(), Some("deep.xlsx"));
    }
}
