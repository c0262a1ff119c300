use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::gmail::message::{Label, Message, MessageRef, RawMessage};
use crate::gmail::{MailService, OutboundReply};

pub struct GmailClient {
    client: Client,
    base_url: String,
    user_id: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct LabelsResponse {
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagesListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentResponse {
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    raw: &'a str,
    thread_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

impl GmailClient {
    pub fn new(base_url: &str, user_id: &str, access_token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
            access_token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/users/{}/{}",
            self.base_url,
            urlencoding::encode(&self.user_id),
            path
        )
    }

    async fn execute<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| PipelineError::transport(operation, e))?;

        let status = response.status();
        debug!("Gmail {} returned {}", operation, status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::transport(
                operation,
                format!("HTTP {} - {}", status, body),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PipelineError::transport(operation, e))
    }
}

#[async_trait]
impl MailService for GmailClient {
    async fn list_labels(&self) -> Result<Vec<Label>> {
        let request = self.client.get(self.url("labels"));
        let response: LabelsResponse = self.execute("labels.list", request).await?;
        Ok(response.labels)
    }

    async fn list_messages(&self, label_id: &str) -> Result<Vec<MessageRef>> {
        let mut messages = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("labelIds", label_id.to_string())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let request = self.client.get(self.url("messages")).query(&query);
            let page: MessagesListResponse = self.execute("messages.list", request).await?;
            messages.extend(page.messages);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(messages)
    }

    async fn get_message(&self, message_id: &str) -> Result<Message> {
        let path = format!("messages/{}", urlencoding::encode(message_id));
        let request = self.client.get(self.url(&path)).query(&[("format", "full")]);
        let raw: RawMessage = self.execute("messages.get", request).await?;
        Ok(raw.into())
    }

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<String> {
        let path = format!(
            "messages/{}/attachments/{}",
            urlencoding::encode(message_id),
            urlencoding::encode(attachment_id)
        );
        let request = self.client.get(self.url(&path));
        let response: AttachmentResponse = self.execute("attachments.get", request).await?;
        Ok(response.data)
    }

    async fn send_reply(&self, reply: &OutboundReply) -> Result<String> {
        let body = SendRequest {
            raw: &reply.raw,
            thread_id: &reply.thread_id,
        };
        let request = self.client.post(self.url("messages/send")).json(&body);
        let response: SendResponse = self.execute("messages.send", request).await?;
        Ok(response.id)
    }
}
