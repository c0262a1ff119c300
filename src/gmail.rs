use async_trait::async_trait;

use crate::error::Result;

pub mod client;
pub mod message;

pub use message::{BodyRef, ContentPart, Header, Label, Message, MessageRef};

/// Reply ready for `messages.send`: the serialized message plus the thread to attach it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    /// URL-safe base64 of the full RFC 5322 text.
    pub raw: String,
    pub thread_id: String,
}

/// The remote mailbox operations the pipeline consumes.
#[async_trait]
pub trait MailService {
    async fn list_labels(&self) -> Result<Vec<Label>>;

    /// All messages currently carrying the label. May be empty.
    async fn list_messages(&self, label_id: &str) -> Result<Vec<MessageRef>>;

    async fn get_message(&self, message_id: &str) -> Result<Message>;

    /// Returns the attachment exactly as served: URL-safe base64 text.
    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String>;

    /// Returns the id of the sent message.
    async fn send_reply(&self, reply: &OutboundReply) -> Result<String>;
}
