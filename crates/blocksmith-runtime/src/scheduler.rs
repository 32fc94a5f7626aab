//! Debounced regeneration
//!
//! Mutation events are coalesced: every event restarts the window, and one
//! generation runs against the workspace as it stands when the window
//! finally elapses.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use blocksmith_codegen::Generator;
use blocksmith_core::Workspace;

use crate::error::Result;
use crate::events::MutationKind;
use crate::sink::GenerationSink;

/// Default debounce window
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(100);

/// Owns the debounce task's state until it is spawned
pub struct RegenerationScheduler {
    workspace: Arc<Mutex<Workspace>>,
    generator: Arc<Generator>,
    sink: Box<dyn GenerationSink>,
    window: Duration,
}

impl RegenerationScheduler {
    /// Scheduler with the default window
    pub fn new(
        workspace: Arc<Mutex<Workspace>>,
        generator: Arc<Generator>,
        sink: impl GenerationSink + 'static,
    ) -> Self {
        Self {
            workspace,
            generator,
            sink: Box::new(sink),
            window: DEFAULT_WINDOW,
        }
    }

    /// Set the debounce window
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Start the debounce task on the current tokio runtime
    pub fn spawn(self) -> SchedulerHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(events_rx, shutdown_rx));
        SchedulerHandle {
            events: events_tx,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<MutationKind>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        tracing::debug!("Regeneration scheduler started ({:?} window)", self.window);
        let deadline = tokio::time::sleep(self.window);
        tokio::pin!(deadline);
        let mut pending = 0usize;

        loop {
            tokio::select! {
                biased;

                event = events.recv() => match event {
                    Some(kind) => {
                        pending += 1;
                        deadline.as_mut().reset(Instant::now() + self.window);
                        tracing::trace!("Mutation {:?}; {} pending", kind, pending);
                    }
                    None => break,
                },
                () = &mut deadline, if pending > 0 => {
                    self.regenerate(pending).await;
                    pending = 0;
                }
                _ = &mut shutdown => break,
            }
        }

        while let Ok(kind) = events.try_recv() {
            pending += 1;
            tracing::trace!("Mutation {:?} queued at shutdown", kind);
        }
        if pending > 0 {
            self.regenerate(pending).await;
        }
        tracing::debug!("Regeneration scheduler stopped");
    }

    async fn regenerate(&mut self, coalesced: usize) {
        let result = {
            let workspace = self
                .workspace
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.generator.generate(&workspace)
        };
        tracing::debug!(
            "Regenerated after {} mutations (success: {})",
            coalesced,
            result.is_success()
        );
        if let Err(e) = self.sink.deliver(&result).await {
            tracing::warn!("Failed to deliver generated code: {:#}", e);
        }
    }
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    events: mpsc::UnboundedSender<MutationKind>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Report a mutation; returns immediately. Returns `false` once the
    /// scheduler has stopped.
    pub fn notify(&self, kind: MutationKind) -> bool {
        self.events.send(kind).is_ok()
    }

    /// Stop the scheduler, running any pending generation first
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.task.await?;
        Ok(())
    }
}
