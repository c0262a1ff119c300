use log::{debug, error, info, warn};
use serde::Deserialize;
use std::future::Future;
use tokio::time::{sleep, Duration};

use crate::dropbox::StorageService;
use crate::error::{PipelineError, Result};
use crate::gmail::MailService;
use crate::pipeline::{Outcome, PipelineContext};
use crate::processed_threads::store::KeyValueStore;

/// What a failed message does to the rest of its cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log it and go on with the next message.
    #[default]
    SkipMessage,
    /// Log it and end the cycle; remaining messages wait for the next one.
    AbortCycle,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub listed: usize,
    pub already_processed: usize,
    pub replied: usize,
    pub uploaded: usize,
    pub send_failed: usize,
    pub failed: usize,
}

pub async fn resolve_label<M: MailService + ?Sized>(mail: &M, name: &str) -> Result<String> {
    mail.list_labels()
        .await?
        .into_iter()
        .find(|label| label.name == name)
        .map(|label| label.id)
        .ok_or_else(|| PipelineError::LabelNotFound(name.to_string()))
}

/// One pass over everything under the label.
pub async fn run_cycle<M, S, K>(
    ctx: &mut PipelineContext<M, S, K>,
    label_id: &str,
    policy: FailurePolicy,
) -> CycleReport
where
    M: MailService,
    S: StorageService,
    K: KeyValueStore,
{
    let mut report = CycleReport::default();

    let message_refs = match ctx.mail.list_messages(label_id).await {
        Ok(message_refs) => message_refs,
        Err(e) => {
            error!("Cannot list messages: {}", e);
            return report;
        }
    };
    if message_refs.is_empty() {
        info!("No Messages found.");
        return report;
    }
    report.listed = message_refs.len();

    for message_ref in &message_refs {
        match ctx.process_message(message_ref).await {
            Ok(Outcome::AlreadyProcessed) => report.already_processed += 1,
            Ok(Outcome::Replied { sent_id, uploads }) => {
                debug!("Reply {} carried {} upload(s)", sent_id, uploads);
                report.replied += 1;
                report.uploaded += uploads;
            }
            Ok(Outcome::SendFailed) => report.send_failed += 1,
            Err(e) => {
                report.failed += 1;
                error!(
                    "Processing message {} of thread {} failed: {}",
                    message_ref.id, message_ref.thread_id, e
                );
                if policy == FailurePolicy::AbortCycle {
                    warn!("Abandoning the rest of this cycle");
                    break;
                }
            }
        }
    }

    report
}

/// Polls until `shutdown` resolves. Shutdown is only noticed while sleeping.
pub async fn run<M, S, K, F>(
    ctx: &mut PipelineContext<M, S, K>,
    label_id: &str,
    interval: Duration,
    policy: FailurePolicy,
    shutdown: F,
) where
    M: MailService,
    S: StorageService,
    K: KeyValueStore,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        info!("getting new emails...");
        let report = run_cycle(ctx, label_id, policy).await;
        info!("Finished processing {:?}", report);

        tokio::select! {
            _ = sleep(interval) => {}
            _ = &mut shutdown => {
                info!("Shutdown requested, leaving the poll loop");
                return;
            }
        }
    }
}
