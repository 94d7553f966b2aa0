//! Inbound event poller
//!
//! Bridges the remote queue of pending chat mentions into local tasks and,
//! optionally, Jira tickets or Confluence pages. Polls on a fixed interval
//! (plus once immediately at startup), processes each batch strictly
//! sequentially so chat-visible side effects stay ordered, and acknowledges
//! each item back to the queue after processing.
//!
//! Task creation and acknowledgement are two separate round-trips: a crash
//! between them redelivers the item next cycle and can duplicate a task or
//! ticket. Losing the item is considered worse than the rare duplicate, so
//! no dedup set is kept.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use beacon_core::{ChatNotifier, InboundQueue, IssueTracker, TaskSink, WikiPublisher};
use beacon_domain::{
    BeaconError, CreatedLink, IssueRequest, LinkKind, LinkedItem, NewTask, PageRequest,
    PendingInboundItem, Priority, Result, Task, TaskSource,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Reaction shown while an item waits in the queue; swapped out when done.
const IN_PROGRESS_REACTION: &str = "hourglass_flowing_sand";
const DONE_REACTION: &str = "white_check_mark";

/// Configuration for the inbox worker.
#[derive(Debug, Clone)]
pub struct InboxWorkerConfig {
    /// Interval between polling attempts
    pub poll_interval: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for InboxWorkerConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(10), join_timeout: Duration::from_secs(5) }
    }
}

/// Inbound event poller with explicit lifecycle management.
pub struct InboxWorker {
    processor: Arc<InboxProcessor>,
    config: InboxWorkerConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl InboxWorker {
    /// Create a worker over the injected queue, chat surface, task sink,
    /// and optional ticket/page creators.
    pub fn new(
        queue: Arc<dyn InboundQueue>,
        chat: Arc<dyn ChatNotifier>,
        tasks: Arc<dyn TaskSink>,
        issues: Option<Arc<dyn IssueTracker>>,
        wiki: Option<Arc<dyn WikiPublisher>>,
        config: InboxWorkerConfig,
    ) -> Self {
        Self {
            processor: Arc::new(InboxProcessor {
                queue,
                chat,
                tasks,
                issues,
                wiki,
                in_flight: AtomicBool::new(false),
            }),
            config,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Start the worker: one immediate poll, then the fixed interval.
    ///
    /// # Errors
    /// Returns an error if the worker is already running.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(BeaconError::Internal("inbox worker already running".to_string()));
        }

        info!("starting inbox worker");

        self.cancellation = CancellationToken::new();
        let processor = Arc::clone(&self.processor);
        let poll_interval = self.config.poll_interval;
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            log_cycle(processor.poll_once().await);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("inbox worker poll loop cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(poll_interval) => {
                        log_cycle(processor.poll_once().await);
                    }
                }
            }
        });

        self.task_handle = Some(handle);
        info!("inbox worker started");
        Ok(())
    }

    /// Stop the worker. The timer is cancelled; an in-flight cycle is
    /// allowed to finish within the join timeout.
    ///
    /// # Errors
    /// Returns an error if the worker is not running, panicked, or did not
    /// stop within the join timeout.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Err(BeaconError::Internal("inbox worker not running".to_string()));
        }

        info!("stopping inbox worker");
        self.cancellation.cancel();

        if let Some(handle) = self.task_handle.take() {
            match tokio::time::timeout(self.config.join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "inbox worker task panicked");
                    return Err(BeaconError::Internal("inbox worker task panicked".to_string()));
                }
                Err(_) => {
                    warn!("inbox worker did not stop within timeout");
                    return Err(BeaconError::Internal("inbox worker stop timeout".to_string()));
                }
            }
        }

        self.cancellation = CancellationToken::new();
        info!("inbox worker stopped");
        Ok(())
    }

    /// Returns true when the poll loop is active.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Run one poll cycle now (also used by the background loop).
    ///
    /// # Errors
    /// Returns an error when the remote fetch fails; item-level failures
    /// are handled internally and never propagate.
    pub async fn poll_once(&self) -> Result<usize> {
        self.processor.poll_once().await
    }
}

impl Drop for InboxWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("inbox worker dropped while running; cancelling poll loop");
            self.cancellation.cancel();
        }
    }
}

fn log_cycle(outcome: Result<usize>) {
    match outcome {
        Ok(0) => {}
        Ok(processed) => debug!(processed, "inbox poll cycle completed"),
        Err(err) => warn!(error = %err, "inbox poll cycle failed"),
    }
}

struct InboxProcessor {
    queue: Arc<dyn InboundQueue>,
    chat: Arc<dyn ChatNotifier>,
    tasks: Arc<dyn TaskSink>,
    issues: Option<Arc<dyn IssueTracker>>,
    wiki: Option<Arc<dyn WikiPublisher>>,
    in_flight: AtomicBool,
}

impl InboxProcessor {
    /// Fetch and process one batch. A tick that lands while a previous
    /// cycle is still running is a no-op; extra cycles are not queued up.
    async fn poll_once(&self) -> Result<usize> {
        if self.in_flight.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err()
        {
            debug!("previous poll cycle still in flight; skipping tick");
            return Ok(0);
        }

        let outcome = self.run_cycle().await;
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    async fn run_cycle(&self) -> Result<usize> {
        let items = self.queue.fetch_pending().await?;
        if items.is_empty() {
            return Ok(0);
        }

        info!(count = items.len(), "processing inbound batch");

        // Strictly sequential: keeps chat replies in a readable order and
        // keeps one item's failure from racing another's acknowledgement.
        let mut processed = 0;
        for item in items {
            match self.process_item(&item).await {
                Ok(()) => processed += 1,
                Err(err) => {
                    error!(item_id = %item.id, error = %err, "failed to process inbound item");
                }
            }
        }

        Ok(processed)
    }

    async fn process_item(&self, item: &PendingInboundItem) -> Result<()> {
        info!(item_id = %item.id, title = %item.title, "processing inbound item");

        let thread_ts = item.thread_ts.as_deref().unwrap_or(&item.message_ts);
        let mut description = item.description.clone().unwrap_or_default();

        // Page-only requests short-circuit: a successful page means chat
        // feedback plus acknowledgement, and no local task at all. A failed
        // page falls through to task creation carrying the failure, so it
        // stays visible instead of silently dropped.
        if item.should_create_confluence {
            match self.create_page(item).await {
                Ok(link) => {
                    self.reply(
                        &item.channel,
                        thread_ts,
                        &format!("Created Confluence page: {}", link.url),
                    )
                    .await;
                    self.swap_reaction(&item.channel, &item.message_ts).await;
                    self.acknowledge(&item.id).await;
                    return Ok(());
                }
                Err(err) => {
                    warn!(item_id = %item.id, error = %err, "confluence page creation failed");
                    description = format!("Confluence page creation failed: {err}\n\n{description}");
                }
            }
        }

        let mut title = item.title.clone();
        let mut jira_link: Option<CreatedLink> = None;

        if item.should_create_jira {
            match self.create_issue(item, &description).await {
                Ok(link) => {
                    // The local task becomes a review task for the ticket,
                    // not a duplicate of it.
                    title = format!("Validate Jira ticket: {}", link.key);
                    description = format!(
                        "Jira ticket {} was created for \"{}\" (requested by {}).\n\n{}",
                        link.key, item.title, item.user, description
                    );
                    jira_link = Some(link);
                }
                Err(err) => {
                    warn!(item_id = %item.id, error = %err, "jira ticket creation failed");
                    description = format!("Jira ticket creation failed: {err}\n\n{description}");
                }
            }
        }

        let mut linked_items = vec![LinkedItem {
            id: item.message_ts.clone(),
            kind: LinkKind::Slack,
            title: "Slack message".to_string(),
            url: Some(slack_permalink(&item.channel, &item.message_ts)),
        }];
        if let Some(link) = &jira_link {
            linked_items.push(LinkedItem {
                id: link.key.clone(),
                kind: LinkKind::Jira,
                title: link.key.clone(),
                url: Some(link.url.clone()),
            });
        }

        let task = Task::from_new(NewTask {
            title,
            source: TaskSource::Slack,
            source_id: Some(item.id.clone()),
            due_date: None,
            deadline: None,
            priority: Priority::Medium,
            context: Some(format!("Mentioned by {} in {}", item.user, item.channel)),
            description: (!description.is_empty()).then_some(description),
            tags: Vec::new(),
            linked_items,
        });

        // Task persistence is the one step that must succeed; without it
        // the item is left unacknowledged and retried next cycle.
        self.tasks.create_task(task.clone()).await?;

        let mut summary = format!("Created task: {}", task.title);
        if let Some(link) = &jira_link {
            summary.push_str(&format!(" ({})", link.url));
        }
        self.reply(&item.channel, thread_ts, &summary).await;
        self.swap_reaction(&item.channel, &item.message_ts).await;
        self.acknowledge(&item.id).await;

        Ok(())
    }

    async fn create_page(&self, item: &PendingInboundItem) -> Result<CreatedLink> {
        let wiki = self.wiki.as_ref().ok_or_else(|| {
            BeaconError::Config("Confluence integration is not configured".to_string())
        })?;

        wiki.create_page(PageRequest {
            title: item.title.clone(),
            body: item
                .description
                .clone()
                .unwrap_or_else(|| format!("Requested by {} in Slack", item.user)),
        })
        .await
    }

    async fn create_issue(
        &self,
        item: &PendingInboundItem,
        description: &str,
    ) -> Result<CreatedLink> {
        let issues = self.issues.as_ref().ok_or_else(|| {
            BeaconError::Config("Jira integration is not configured".to_string())
        })?;

        issues
            .create_issue(IssueRequest {
                summary: item.title.clone(),
                description: if description.is_empty() {
                    format!("Requested by {} in Slack", item.user)
                } else {
                    description.to_string()
                },
                assignee_email: item.assignee_email.clone(),
            })
            .await
    }

    // Chat feedback and queue acknowledgement are best-effort: each call is
    // independently caught and logged, and never undoes the created task.

    async fn reply(&self, channel: &str, thread_ts: &str, text: &str) {
        if let Err(err) = self.chat.post_reply(channel, thread_ts, text).await {
            warn!(channel, error = %err, "failed to post chat reply");
        }
    }

    async fn swap_reaction(&self, channel: &str, timestamp: &str) {
        if let Err(err) =
            self.chat.remove_reaction(channel, timestamp, IN_PROGRESS_REACTION).await
        {
            warn!(channel, error = %err, "failed to remove in-progress reaction");
        }
        if let Err(err) = self.chat.add_reaction(channel, timestamp, DONE_REACTION).await {
            warn!(channel, error = %err, "failed to add done reaction");
        }
    }

    async fn acknowledge(&self, item_id: &str) {
        if let Err(err) = self.queue.acknowledge(item_id).await {
            warn!(item_id, error = %err, "failed to acknowledge item; it will be reprocessed next cycle");
        }
    }
}

/// Archive-style deep link back to the originating message.
fn slack_permalink(channel: &str, message_ts: &str) -> String {
    format!("https://slack.com/archives/{channel}/p{}", message_ts.replace('.', ""))
}
