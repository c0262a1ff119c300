pub mod mime_walker;
pub mod reply;
pub mod uploader;

use log::{error, info};

use crate::dropbox::StorageService;
use crate::error::Result;
use crate::gmail::{MailService, MessageRef};
use crate::processed_threads::store::KeyValueStore;
use crate::processed_threads::ProcessedThreads;

/// Everything one message needs on its way through: clients, dedup state and the filters.
/// Owned by the poll loop for the life of the process.
pub struct PipelineContext<M, S, K: KeyValueStore> {
    pub mail: M,
    pub storage: S,
    pub processed: ProcessedThreads<K>,
    pub attachment_extension: String,
    pub max_part_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    AlreadyProcessed,
    Replied { sent_id: String, uploads: usize },
    /// Reply not delivered; the thread stays unseen and is redone next cycle.
    SendFailed,
}

impl<M, S, K> PipelineContext<M, S, K>
where
    M: MailService,
    S: StorageService,
    K: KeyValueStore,
{
    pub async fn process_message(&mut self, message_ref: &MessageRef) -> Result<Outcome> {
        if self.processed.is_processed(&message_ref.thread_id) {
            return Ok(Outcome::AlreadyProcessed);
        }
        info!("new emails found");

        let message = self.mail.get_message(&message_ref.id).await?;
        let parts = mime_walker::collect_attachments(
            &message.payload,
            &self.attachment_extension,
            self.max_part_depth,
        )?;
        let results =
            uploader::upload_attachments(&self.mail, &self.storage, &message_ref.id, &parts).await?;
        let outbound = reply::compose_reply(&message, &results)?.encode()?;

        match self.mail.send_reply(&outbound).await {
            Ok(sent_id) => {
                info!("Message Id: {}", sent_id);
                info!("email replied");
                self.processed.mark_processed(&message_ref.thread_id)?;
                Ok(Outcome::Replied {
                    sent_id,
                    uploads: results.len(),
                })
            }
            Err(e) => {
                error!("An error occurred: {}", e);
                Ok(Outcome::SendFailed)
            }
        }
    }
}
