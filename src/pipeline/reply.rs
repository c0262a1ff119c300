use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use itertools::Itertools;
use mail_builder::headers::{address::Address, raw::Raw, text::Text, HeaderType};
use mail_builder::MessageBuilder;
use mailparse::{addrparse, MailAddr, SingleInfo};

use crate::dropbox::UploadResult;
use crate::error::{PipelineError, Result};
use crate::gmail::{Message, OutboundReply};

pub const NO_FILE_BODY: &str = "No file detected";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDraft {
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub in_reply_to: Option<String>,
    pub references: String,
    pub body: String,
    pub thread_id: String,
}

pub fn summary_text(results: &[UploadResult]) -> String {
    if results.is_empty() {
        return NO_FILE_BODY.to_string();
    }
    format!(
        "{} file(s) uploaded to dropbox! \n{}",
        results.len(),
        results.iter().map(|result| format!("- {}", result)).join("\n")
    )
}

/// Builds the reply to `original` from its headers as received.
pub fn compose_reply(original: &Message, results: &[UploadResult]) -> Result<ReplyDraft> {
    let to = original
        .header("From")
        .ok_or(PipelineError::MissingHeader("From"))?;
    let subject = original
        .header("Subject")
        .ok_or(PipelineError::MissingHeader("Subject"))?;

    // Old References first, then the old In-Reply-To, each followed by a space.
    let references: String = [original.header("References"), original.header("In-Reply-To")]
        .into_iter()
        .flatten()
        .map(|id| format!("{} ", id))
        .collect();

    Ok(ReplyDraft {
        to: to.to_string(),
        cc: original.header("Cc").map(str::to_string),
        subject: format!("Re: {}", subject),
        in_reply_to: original.header("Message-ID").map(str::to_string),
        references,
        body: summary_text(results),
        thread_id: original.thread_id.clone(),
    })
}

impl ReplyDraft {
    /// Single-part plain text message. ASCII header values go out as received,
    /// anything else is RFC 2047 encoded.
    pub fn to_rfc5322(&self) -> Result<Vec<u8>> {
        let mut builder = MessageBuilder::new().header("To", address_header(&self.to));
        if let Some(cc) = &self.cc {
            builder = builder.header("Cc", address_header(cc));
        }
        builder = builder.header("Subject", unstructured_header(&self.subject));
        if let Some(in_reply_to) = &self.in_reply_to {
            builder = builder.header("In-Reply-To", unstructured_header(in_reply_to));
        }
        builder
            .header("References", unstructured_header(&self.references))
            .text_body(self.body.as_str())
            .write_to_vec()
            .map_err(PipelineError::Compose)
    }

    pub fn encode(&self) -> Result<OutboundReply> {
        Ok(OutboundReply {
            raw: URL_SAFE.encode(self.to_rfc5322()?),
            thread_id: self.thread_id.clone(),
        })
    }
}

fn unstructured_header(value: &str) -> HeaderType<'_> {
    if value.is_ascii() {
        Raw::new(value).into()
    } else {
        Text::new(value).into()
    }
}

/// Non-ASCII address lists are re-parsed so only the display names get encoded.
fn address_header(value: &str) -> HeaderType<'_> {
    if value.is_ascii() {
        return Raw::new(value).into();
    }
    let list = match addrparse(value) {
        Ok(list) if !list.is_empty() => list,
        _ => return Text::new(value).into(),
    };
    let mut addresses = list
        .iter()
        .map(|addr| match addr {
            MailAddr::Single(info) => mailbox(info),
            MailAddr::Group(group) => Address::new_group(
                Some(group.group_name.clone()),
                group.addrs.iter().map(mailbox).collect(),
            ),
        })
        .collect::<Vec<_>>();
    if addresses.len() == 1 {
        addresses.remove(0).into()
    } else {
        Address::new_list(addresses).into()
    }
}

fn mailbox(info: &SingleInfo) -> Address<'static> {
    Address::new_address(info.display_name.clone(), info.addr.clone())
}
