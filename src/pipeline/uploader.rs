use log::info;

use crate::dropbox::{StorageService, UploadResult};
use crate::error::{PipelineError, Result};
use crate::gmail::message::decode_url_safe;
use crate::gmail::{BodyRef, ContentPart, MailService};

/// Fetches, decodes and uploads each part in order, one at a time.
///
/// The first failure is returned as-is: later parts are not attempted and earlier
/// uploads stay where they are.
pub async fn upload_attachments<M, S>(
    mail: &M,
    storage: &S,
    message_id: &str,
    parts: &[&ContentPart],
) -> Result<Vec<UploadResult>>
where
    M: MailService + ?Sized,
    S: StorageService + ?Sized,
{
    let mut results = Vec::with_capacity(parts.len());

    for part in parts {
        let filename = part.filename.as_deref().unwrap_or_default();
        let encoded = match &part.body {
            Some(BodyRef::Attachment(attachment_id)) => {
                mail.get_attachment(message_id, attachment_id).await?
            }
            Some(BodyRef::Inline(data)) => data.clone(),
            None => {
                return Err(PipelineError::MissingAttachmentBody {
                    filename: filename.to_string(),
                })
            }
        };
        let bytes = decode_url_safe(&encoded)?;

        let destination = format!("/{}", filename);
        let result = storage.upload(bytes, &destination, true).await?;
        info!("Uploaded {} as {}", destination, result.stored_path());
        results.push(result);
    }

    Ok(results)
}
