//! Background task orchestration.
//!
//! Each dispatch spawns one short-lived thread that performs only the
//! blocking collaborator call and sends the raw outcome through a channel.
//! The control path drains that channel with [`Orchestrator::deliver`]; all
//! store writes and navigator mutations happen there, never on a worker.
//!
//! Every dispatched task produces exactly one terminal callback on the
//! [`TaskObserver`]: `on_success` or `on_failure`. Worker panics are caught at
//! the thread boundary and reported as failures.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::config::AiConfig;
use crate::error::{ErrorCode, MemexError};
use crate::hypertext;
use crate::model::DocId;
use crate::nav::{LinkInsertion, Navigator, SkipReason};
use crate::service::{Completion, GeneratedImage, ImageSynthesis};
use crate::store::DocumentStore;

/// Maximum length, in characters, of titles generated for AI replies.
pub const REPLY_TITLE_MAX_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    AiQuery,
    ImageGeneration,
}

impl TaskKind {
    const fn slug(self) -> &'static str {
        match self {
            Self::AiQuery => "ai",
            Self::ImageGeneration => "image",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AiQuery => "AI",
            Self::ImageGeneration => "Image",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An in-flight task, alive from dispatch until its outcome is delivered.
#[derive(Debug, Clone)]
pub struct PendingTask {
    pub id: TaskId,
    pub kind: TaskKind,
    /// The selected snippet the task was created from.
    pub input_text: String,
    /// Full prompt sent to the collaborator.
    pub prompt: String,
    pub context: Option<DocId>,
    pub dispatched_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: TaskId,
    pub kind: TaskKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: TaskId,
    pub kind: TaskKind,
    pub message: String,
    pub code: ErrorCode,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone)]
pub enum TaskSuccess {
    /// An AI reply was stored as `new_id`.
    Document {
        task: TaskId,
        new_id: DocId,
        link: LinkInsertion,
    },
    Image {
        task: TaskId,
        image: GeneratedImage,
        /// Whether the image was attached to the current view.
        attached: bool,
    },
}

impl TaskSuccess {
    #[must_use]
    pub const fn task(&self) -> TaskId {
        match self {
            Self::Document { task, .. } | Self::Image { task, .. } => *task,
        }
    }
}

/// Receives task outcomes on the control path.
pub trait TaskObserver {
    fn on_success(&mut self, success: TaskSuccess);

    fn on_failure(&mut self, failure: TaskFailure);

    /// A document was created; listings should be refreshed.
    fn on_index_changed(&mut self) {}
}

/// Observer that just records outcomes, for scripted callers.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    pub successes: Vec<TaskSuccess>,
    pub failures: Vec<TaskFailure>,
    pub index_changes: usize,
}

impl TaskObserver for CollectingObserver {
    fn on_success(&mut self, success: TaskSuccess) {
        self.successes.push(success);
    }

    fn on_failure(&mut self, failure: TaskFailure) {
        self.failures.push(failure);
    }

    fn on_index_changed(&mut self) {
        self.index_changes += 1;
    }
}

/// How AI replies are turned into prompts and documents.
#[derive(Debug, Clone)]
pub struct TaskSettings {
    pub prompt_prefix: String,
    pub backlink: bool,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self::from(&AiConfig::default())
    }
}

impl From<&AiConfig> for TaskSettings {
    fn from(ai: &AiConfig) -> Self {
        Self {
            prompt_prefix: ai.prompt_prefix.clone(),
            backlink: ai.backlink,
        }
    }
}

#[derive(Debug)]
enum WorkerOutcome {
    Reply(String),
    Image(GeneratedImage),
    Failed { message: String, code: ErrorCode },
}

#[derive(Debug)]
struct WorkerMessage {
    id: TaskId,
    outcome: WorkerOutcome,
}

pub struct Orchestrator {
    completion: Arc<dyn Completion>,
    images: Arc<dyn ImageSynthesis>,
    settings: TaskSettings,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    pending: BTreeMap<TaskId, PendingTask>,
    next_id: u64,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        completion: Arc<dyn Completion>,
        images: Arc<dyn ImageSynthesis>,
        settings: TaskSettings,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            completion,
            images,
            settings,
            tx,
            rx,
            pending: BTreeMap::new(),
            next_id: 1,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &TaskSettings {
        &self.settings
    }

    /// Start a task using the configured prompt prefix for AI queries.
    pub fn dispatch(
        &mut self,
        kind: TaskKind,
        input_text: &str,
        context: Option<DocId>,
    ) -> TaskHandle {
        let prompt = match kind {
            TaskKind::AiQuery => format!("{}{input_text}", self.settings.prompt_prefix),
            TaskKind::ImageGeneration => input_text.trim().to_string(),
        };
        self.dispatch_with_prompt(kind, input_text, prompt, context)
    }

    /// Start a task with an explicit prompt (e.g. a user-edited prefix).
    ///
    /// Never blocks. If the worker thread cannot be spawned the failure is
    /// queued for the next [`Orchestrator::deliver`].
    pub fn dispatch_with_prompt(
        &mut self,
        kind: TaskKind,
        input_text: &str,
        prompt: String,
        context: Option<DocId>,
    ) -> TaskHandle {
        let id = TaskId(self.next_id);
        self.next_id += 1;

        self.pending.insert(
            id,
            PendingTask {
                id,
                kind,
                input_text: input_text.to_string(),
                prompt: prompt.clone(),
                context,
                dispatched_at: Instant::now(),
            },
        );

        let tx = self.tx.clone();
        let completion = Arc::clone(&self.completion);
        let images = Arc::clone(&self.images);
        let spawned = std::thread::Builder::new()
            .name(format!("memex-{}-{}", kind.slug(), id.get()))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| match kind {
                    TaskKind::AiQuery => completion.complete(&prompt).map(WorkerOutcome::Reply),
                    TaskKind::ImageGeneration => {
                        images.generate(&prompt).map(WorkerOutcome::Image)
                    }
                }))
                .unwrap_or_else(|payload| {
                    Ok(WorkerOutcome::Failed {
                        message: format!("task panicked: {}", panic_message(payload.as_ref())),
                        code: ErrorCode::InternalUnexpected,
                    })
                })
                .unwrap_or_else(|err| WorkerOutcome::Failed {
                    message: err.to_string(),
                    code: err.error_code(),
                });
                // The receiver lives as long as the orchestrator; a closed
                // channel means nobody is left to notify.
                let _ = tx.send(WorkerMessage { id, outcome });
            });

        if let Err(err) = spawned {
            tracing::error!(task = %id, error = %err, "failed to spawn task worker");
            let _ = self.tx.send(WorkerMessage {
                id,
                outcome: WorkerOutcome::Failed {
                    message: format!("could not start worker: {err}"),
                    code: ErrorCode::InternalUnexpected,
                },
            });
        } else {
            tracing::debug!(task = %id, kind = kind.slug(), context = ?context, "dispatched task");
        }

        TaskHandle { id, kind }
    }

    /// In-flight tasks in dispatch order.
    pub fn pending(&self) -> impl Iterator<Item = &PendingTask> {
        self.pending.values()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Settle every completed task without blocking. Returns how many
    /// outcomes were delivered.
    pub fn deliver<S: DocumentStore>(
        &mut self,
        nav: &mut Navigator<S>,
        observer: &mut dyn TaskObserver,
    ) -> usize {
        let mut delivered = 0;
        while let Ok(message) = self.rx.try_recv() {
            delivered += usize::from(self.settle(message, nav, observer));
        }
        delivered
    }

    /// Block up to `timeout` for at least one completion, then drain the
    /// rest. Returns immediately when nothing is pending.
    pub fn wait_and_deliver<S: DocumentStore>(
        &mut self,
        timeout: Duration,
        nav: &mut Navigator<S>,
        observer: &mut dyn TaskObserver,
    ) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let first = match self.rx.recv_timeout(timeout) {
            Ok(message) => usize::from(self.settle(message, nav, observer)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return 0,
        };
        first + self.deliver(nav, observer)
    }

    fn settle<S: DocumentStore>(
        &mut self,
        message: WorkerMessage,
        nav: &mut Navigator<S>,
        observer: &mut dyn TaskObserver,
    ) -> bool {
        let Some(task) = self.pending.remove(&message.id) else {
            tracing::warn!(task = %message.id, "dropping outcome for unknown task");
            return false;
        };
        let elapsed_ms = u64::try_from(task.dispatched_at.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match message.outcome {
            WorkerOutcome::Failed { message, code } => Err(TaskFailure {
                task: task.id,
                kind: task.kind,
                message,
                code,
            }),
            WorkerOutcome::Reply(reply) => self.store_reply(&task, &reply, nav, observer),
            WorkerOutcome::Image(mut image) => {
                image.doc_id = task.context;
                let attached = nav.attach_image(image.clone());
                Ok(TaskSuccess::Image {
                    task: task.id,
                    image,
                    attached,
                })
            }
        };

        match result {
            Ok(success) => {
                tracing::info!(task = %task.id, kind = task.kind.slug(), elapsed_ms, "task completed");
                observer.on_success(success);
            }
            Err(failure) => {
                tracing::warn!(task = %task.id, kind = task.kind.slug(), elapsed_ms, error = %failure.message, "task failed");
                observer.on_failure(failure);
            }
        }
        true
    }

    fn store_reply<S: DocumentStore>(
        &self,
        task: &PendingTask,
        reply: &str,
        nav: &mut Navigator<S>,
        observer: &mut dyn TaskObserver,
    ) -> Result<TaskSuccess, TaskFailure> {
        let persistence_failure = |err: &MemexError| TaskFailure {
            task: task.id,
            kind: task.kind,
            message: format!("could not store reply: {err}"),
            code: err.error_code(),
        };

        let backlink = match task.context.filter(|_| self.settings.backlink) {
            Some(ctx) => nav
                .store()
                .get(ctx)
                .map_err(|err| persistence_failure(&err))?
                .map(|doc| backlink_markup(&doc.title, ctx)),
            None => None,
        };
        let body = match backlink {
            Some(link) => format!("{reply}\n\n{link}"),
            None => reply.to_string(),
        };

        let new_id = nav
            .store_mut()
            .create(&reply_title(&task.input_text), &body)
            .map_err(|err| persistence_failure(&err))?;
        observer.on_index_changed();

        let link = match task.context {
            Some(ctx) => nav
                .insert_link_if_current(ctx, &task.input_text, new_id)
                .map_err(|err| persistence_failure(&err))?,
            None => LinkInsertion::Skipped(SkipReason::NoCurrentDocument),
        };

        Ok(TaskSuccess::Document {
            task: task.id,
            new_id,
            link,
        })
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("pending", &self.pending.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

/// `"Re: <snippet>"`, whitespace collapsed, at most
/// [`REPLY_TITLE_MAX_CHARS`] characters.
#[must_use]
pub fn reply_title(snippet: &str) -> String {
    let collapsed = snippet.split_whitespace().collect::<Vec<_>>().join(" ");
    let title = format!("Re: {collapsed}");
    if title.chars().count() <= REPLY_TITLE_MAX_CHARS {
        return title;
    }
    let mut truncated: String = title.chars().take(REPLY_TITLE_MAX_CHARS - 1).collect();
    truncated.push('…');
    truncated
}

fn backlink_markup(title: &str, target: DocId) -> String {
    let label: String = title.chars().filter(|c| *c != ']').collect();
    let label = label.trim();
    hypertext::link_markup(if label.is_empty() { "back" } else { label }, target)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_title_collapses_and_truncates() {
        assert_eq!(reply_title("  the\nquick   fox "), "Re: the quick fox");

        let long = "x".repeat(100);
        let title = reply_title(&long);
        assert_eq!(title.chars().count(), REPLY_TITLE_MAX_CHARS);
        assert!(title.starts_with("Re: xxx"));
        assert!(title.ends_with('…'));
    }

    #[test]
    fn backlink_strips_closing_brackets() {
        assert_eq!(backlink_markup("Intro", DocId::new(3)), "[Intro](doc:3)");
        assert_eq!(backlink_markup("a]b", DocId::new(3)), "[ab](doc:3)");
        assert_eq!(backlink_markup("]]", DocId::new(3)), "[back](doc:3)");
    }

    #[test]
    fn panic_message_handles_str_and_string() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(owned.as_ref()), "bang");
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[test]
    fn failure_display_names_kind() {
        let failure = TaskFailure {
            task: TaskId(1),
            kind: TaskKind::ImageGeneration,
            message: "timed out".into(),
            code: ErrorCode::ServiceUnavailable,
        };
        assert_eq!(failure.to_string(), "Image error: timed out");
    }
}
