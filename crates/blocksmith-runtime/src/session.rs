//! Editing session
//!
//! A [`Session`] is what an editing surface talks to: it owns the workspace,
//! the component selection and the scheduler, and keeps the three in step.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Context;

use blocksmith_codegen::{Generator, GeneratorOptions};
use blocksmith_core::{
    Block, BlockRegistry, CapabilityGate, ComponentInstance, ComponentSelection, Config, Document,
    PaletteCategory, PaletteRefresh, PaletteTracker, Placement, Violation, Workspace,
    new_block_id,
};

use crate::error::Result;
use crate::events::{Edit, MutationKind};
use crate::scheduler::{RegenerationScheduler, SchedulerHandle};
use crate::sink::GenerationSink;

/// Workspace, components and regeneration for one editor
pub struct Session {
    registry: Arc<BlockRegistry>,
    gate: CapabilityGate,
    selection: ComponentSelection,
    tracker: PaletteTracker,
    workspace: Arc<Mutex<Workspace>>,
    scheduler: SchedulerHandle,
}

impl Session {
    /// Start a session with a fresh workspace. Must be called inside a tokio
    /// runtime.
    pub fn new(
        registry: Arc<BlockRegistry>,
        generator: Generator,
        selection: ComponentSelection,
        sink: impl GenerationSink + 'static,
        window: Duration,
    ) -> Result<Self> {
        let workspace = Workspace::with_entry_point(&registry)?;
        let workspace = Arc::new(Mutex::new(workspace));
        let scheduler =
            RegenerationScheduler::new(workspace.clone(), Arc::new(generator), sink)
                .with_window(window)
                .spawn();

        let gate = CapabilityGate::new(registry.clone());
        let mut tracker = PaletteTracker::new();
        tracker.update(gate.allowed_types(&selection));

        tracing::info!(
            "Session started with {} components",
            selection.len()
        );
        Ok(Self {
            registry,
            gate,
            selection,
            tracker,
            workspace,
            scheduler,
        })
    }

    /// Start a session for a project, loading its sketch when present
    pub fn from_config(config: &Config, sink: impl GenerationSink + 'static) -> Result<Self> {
        let registry = Arc::new(BlockRegistry::builtin());
        let generator = Generator::with_options(
            registry.clone(),
            GeneratorOptions {
                indent: config.project.codegen.indent.clone(),
            },
        );
        let selection = config.selection()?;
        let mut session = Self::new(
            registry,
            generator,
            selection,
            sink,
            Duration::from_millis(config.project.codegen.debounce_ms),
        )?;

        if config.sketch_path().exists() {
            let document = config
                .load_document()
                .with_context(|| format!("Failed to read {}", config.sketch_path().display()))?;
            session.load(&document)?;
        }
        Ok(session)
    }

    fn workspace(&self) -> MutexGuard<'_, Workspace> {
        self.workspace.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current allowed block types
    pub fn allowed_types(&self) -> BTreeSet<String> {
        match self.tracker.current() {
            Some(allowed) => allowed.clone(),
            None => self.gate.allowed_types(&self.selection),
        }
    }

    /// Palette for the current selection
    pub fn palette(&self) -> Vec<PaletteCategory> {
        self.gate.palette(&self.selection)
    }

    /// Selected components
    pub fn selection(&self) -> &ComponentSelection {
        &self.selection
    }

    /// Copy of the current workspace
    pub fn snapshot(&self) -> Workspace {
        self.workspace().clone()
    }

    /// Placed blocks that the current selection does not allow
    pub fn violations(&self) -> Vec<Violation> {
        let allowed = self.allowed_types();
        self.gate.violations(&self.workspace(), &allowed)
    }

    fn check_allowed(&self, block: &Block) -> Result<()> {
        let allowed = self.allowed_types();
        let mut types = BTreeSet::new();
        block.walk(&mut |b| {
            types.insert(b.block_type.clone());
        });
        for block_type in types {
            self.gate.check(&allowed, &block_type)?;
        }
        Ok(())
    }

    fn place(&self, block: Block, placement: Placement) -> Result<()> {
        self.check_allowed(&block)?;
        self.workspace().insert(&self.registry, block, placement)?;
        Ok(())
    }

    /// Apply an edit and schedule regeneration. Rejected edits leave the
    /// workspace unchanged and schedule nothing.
    pub fn apply(&mut self, edit: Edit) -> Result<()> {
        let kind = edit.kind();
        match edit {
            Edit::Create {
                block_type,
                id,
                placement,
            } => {
                let id = id.unwrap_or_else(new_block_id);
                let block = self.registry.instantiate(&block_type, id)?;
                self.place(block, placement)?;
            }
            Edit::Paste { block, placement } => self.place(block, placement)?,
            Edit::Move { id, placement } => {
                self.workspace().move_block(&self.registry, &id, placement)?;
            }
            Edit::Delete { id } => {
                self.workspace().delete(&id)?;
            }
            Edit::Change { id, field, value } => {
                self.workspace()
                    .set_field(&self.registry, &id, &field, value)?;
            }
            Edit::CreateVariable { name } => {
                if !self.workspace().create_variable(&name)? {
                    return Ok(());
                }
            }
            Edit::DeleteVariable { name } => {
                let removed = self.workspace().delete_variable(&self.registry, &name);
                tracing::debug!("Deleted variable {} with {} blocks", name, removed);
            }
            Edit::Clear => self.workspace().clear(&self.registry)?,
            Edit::Load { document } => return self.load(&document),
        }
        self.notify(kind);
        Ok(())
    }

    fn notify(&self, kind: MutationKind) {
        if !self.scheduler.notify(kind) {
            tracing::warn!("Regeneration scheduler is not running");
        }
    }

    /// Replace the workspace with a document; all or nothing
    pub fn load(&mut self, document: &Document) -> Result<()> {
        self.workspace()
            .load(&self.registry, document)
            .context("Failed to load workspace document")?;
        let violations = self.violations();
        tracing::debug!("Loaded workspace with {} disallowed blocks", violations.len());
        self.notify(MutationKind::WorkspaceLoaded);
        Ok(())
    }

    /// Capture the workspace as a document
    pub fn save(&self) -> Document {
        self.workspace().save()
    }

    /// Select another component; returns a refresh when the palette changed
    pub fn add_component(&mut self, instance: ComponentInstance) -> Result<Option<PaletteRefresh>> {
        if !self.selection.add(instance)? {
            return Ok(None);
        }
        Ok(self.refresh())
    }

    /// Deselect a component; placed blocks are kept
    pub fn remove_component(&mut self, id: &str) -> Option<PaletteRefresh> {
        self.selection.remove(id)?;
        self.refresh()
    }

    fn refresh(&mut self) -> Option<PaletteRefresh> {
        let refresh = self.tracker.update(self.gate.allowed_types(&self.selection))?;
        if !refresh.removed.is_empty() {
            let violations = self.violations();
            tracing::debug!(
                "{} types removed from palette, {} placed blocks affected",
                refresh.removed.len(),
                violations.len()
            );
        }
        Some(refresh)
    }

    /// Stop regeneration, flushing a pending run
    pub async fn shutdown(self) -> Result<()> {
        tracing::info!("Session shutting down");
        self.scheduler.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksmith_codegen::GenerationResult;
    use blocksmith_core::{ComponentKind, FieldValue};
    use tokio::sync::mpsc;

    fn session() -> (Session, mpsc::UnboundedReceiver<GenerationResult>) {
        let registry = Arc::new(BlockRegistry::builtin());
        let generator = Generator::new(registry.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(
            registry,
            generator,
            ComponentSelection::new(),
            tx,
            Duration::from_millis(100),
        )
        .unwrap();
        (session, rx)
    }

    fn entry(session: &Session) -> String {
        session.snapshot().entry_point().unwrap().id.clone()
    }

    fn into_loop(session: &Session) -> Placement {
        Placement::Socket {
            parent: entry(session),
            socket: "LOOP".to_string(),
        }
    }

    fn led() -> ComponentInstance {
        ComponentInstance::new("led1", ComponentKind::Led, "Status LED")
    }

    #[tokio::test(start_paused = true)]
    async fn test_gated_block_rejected_until_component_selected() {
        let (mut session, _rx) = session();
        let create = Edit::Create {
            block_type: "component_led".to_string(),
            id: Some("led".to_string()),
            placement: into_loop(&session),
        };

        let err = session.apply(create.clone()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<blocksmith_core::Error>(),
            Some(blocksmith_core::Error::CapabilityViolation { .. })
        ));
        assert!(!session.snapshot().contains("led"));

        let refresh = session.add_component(led()).unwrap().unwrap();
        assert!(refresh.added.contains("component_led"));
        assert!(refresh.removed.is_empty());

        session.apply(create).unwrap();
        assert!(session.snapshot().contains("led"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_paste_checks_every_block_in_subtree() {
        let (mut session, _rx) = session();
        let print = Block::new("print", "arduino_serial_print")
            .with_input("TEXT", Block::new("hum", "arduino_humidity_read"));
        let err = session
            .apply(Edit::Paste {
                block: print,
                placement: Placement::TopLevel,
            })
            .unwrap_err();
        assert!(err.to_string().contains("arduino_humidity_read"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_component_does_not_refresh() {
        let (mut session, _rx) = session();
        assert!(session.add_component(led()).unwrap().is_some());
        assert!(session.add_component(led()).unwrap().is_none());
        let second = ComponentInstance::new("led2", ComponentKind::Led, "Other LED");
        assert!(session.add_component(second).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_removing_component_keeps_blocks() {
        let (mut session, _rx) = session();
        session.add_component(led()).unwrap();
        session
            .apply(Edit::Create {
                block_type: "component_led".to_string(),
                id: Some("led".to_string()),
                placement: into_loop(&session),
            })
            .unwrap();

        let refresh = session.remove_component("led1").unwrap();
        assert!(refresh.removed.contains("component_led"));
        assert!(session.snapshot().contains("led"));
        assert_eq!(session.violations().len(), 1);
        assert!(session.remove_component("led1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_keeps_disallowed_blocks() {
        let (mut session, _rx) = session();
        session.add_component(led()).unwrap();
        session
            .apply(Edit::Create {
                block_type: "component_led".to_string(),
                id: Some("led".to_string()),
                placement: into_loop(&session),
            })
            .unwrap();
        let document = session.save();

        session.remove_component("led1").unwrap();
        session.apply(Edit::Clear).unwrap();
        session.load(&document).unwrap();
        assert!(session.snapshot().contains("led"));
        assert_eq!(session.violations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_regenerate_once_per_burst() {
        let (mut session, mut rx) = session();
        session
            .apply(Edit::Create {
                block_type: "arduino_delay".to_string(),
                id: Some("wait".to_string()),
                placement: into_loop(&session),
            })
            .unwrap();
        session
            .apply(Edit::Change {
                id: "wait".to_string(),
                field: "TIME".to_string(),
                value: FieldValue::Number(250.0),
            })
            .unwrap();

        let result = rx.recv().await.unwrap();
        assert!(result.output().contains("  delay(250);\n"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_edit_schedules_nothing() {
        let (mut session, mut rx) = session();
        assert!(session.apply(Edit::Delete { id: entry(&session) }).is_err());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_keeps_workspace() {
        let (mut session, _rx) = session();
        let before = session.snapshot();
        let mut document = session.save();
        document.format = "something-else".to_string();
        assert!(session.apply(Edit::Load { document }).is_err());
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes() {
        let (mut session, mut rx) = session();
        session
            .apply(Edit::CreateVariable {
                name: "level".to_string(),
            })
            .unwrap();
        session.shutdown().await.unwrap();
        let result = rx.recv().await.unwrap();
        assert!(result.output().contains("float level = 0;"));
    }
}
