//! Block graph → Arduino C++ generator
//!
//! A [`Generator`] holds the registry and the resolved dispatch table. Each
//! call to [`Generator::generate`] runs against a fresh [`Context`], so no
//! definition ever survives from one run to the next.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use blocksmith_core::{Block, BlockRegistry, ENTRY_POINT, Workspace};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::handlers::{ExpressionHandler, HandlerTable, StatementHandler};

/// Output for a workspace without an entry point
pub const EMPTY_PROGRAM: &str = "// No blocks to generate code\n";

/// Options for the generator
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Indentation unit for nested statements
    pub indent: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
        }
    }
}

/// Category of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A block type without registry entry or handler
    UnknownType,
    /// A handler returned an error or panicked
    HandlerFailure,
}

/// Why a run produced no code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Failure category
    pub kind: DiagnosticKind,
    /// Block that caused the failure, when known
    pub block_id: Option<String>,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    fn from_error(error: Error) -> Self {
        match error {
            Error::UnknownType { ref block_id, .. } => Self {
                kind: DiagnosticKind::UnknownType,
                block_id: Some(block_id.clone()),
                message: error.to_string(),
            },
            Error::HandlerFailure { ref block_id, .. } => Self {
                kind: DiagnosticKind::HandlerFailure,
                block_id: Some(block_id.clone()),
                message: error.to_string(),
            },
            Error::Core(blocksmith_core::Error::UnknownType { .. }) => Self {
                kind: DiagnosticKind::UnknownType,
                block_id: None,
                message: error.to_string(),
            },
            other => Self {
                kind: DiagnosticKind::HandlerFailure,
                block_id: None,
                message: other.to_string(),
            },
        }
    }

    /// The one-line comment shown in place of code
    pub fn placeholder(&self) -> String {
        let message = self.message.split_whitespace().collect::<Vec<_>>().join(" ");
        format!("// Error generating code: {}\n", message)
    }
}

/// Outcome of one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    /// The complete program
    Success {
        /// Generated source
        text: String,
    },
    /// No code; the run was aborted
    Failed {
        /// What went wrong
        diagnostic: Diagnostic,
    },
}

impl GenerationResult {
    /// Generated text, if the run succeeded
    pub fn text(&self) -> Option<&str> {
        match self {
            GenerationResult::Success { text } => Some(text),
            GenerationResult::Failed { .. } => None,
        }
    }

    /// Whether the run succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success { .. })
    }

    /// What to show the user: the program or the diagnostic placeholder
    pub fn output(&self) -> String {
        match self {
            GenerationResult::Success { text } => text.clone(),
            GenerationResult::Failed { diagnostic } => diagnostic.placeholder(),
        }
    }
}

/// Code generator
#[derive(Debug, Clone)]
pub struct Generator {
    registry: Arc<BlockRegistry>,
    handlers: HandlerTable,
    options: GeneratorOptions,
}

impl Generator {
    /// Generator with the built-in handlers
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self::with_options(registry, GeneratorOptions::default())
    }

    /// Generator with the built-in handlers and custom options
    pub fn with_options(registry: Arc<BlockRegistry>, options: GeneratorOptions) -> Self {
        let handlers = HandlerTable::builtin();
        let unbound = registry
            .types()
            .filter(|t| !handlers.contains(&t.id))
            .count();
        if unbound > 0 {
            tracing::debug!("{} registered types have no handler", unbound);
        }
        Self {
            registry,
            handlers,
            options,
        }
    }

    /// Registry the generator resolves types against
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    /// Bind a statement handler
    pub fn register_statement(
        &mut self,
        block_type: &str,
        handler: impl StatementHandler + 'static,
    ) {
        self.handlers.statement(block_type, handler);
    }

    /// Bind an expression handler
    pub fn register_expression(
        &mut self,
        block_type: &str,
        handler: impl ExpressionHandler + 'static,
    ) {
        self.handlers.expression(block_type, handler);
    }

    /// Generate the program for a workspace.
    ///
    /// Never fails: errors and panics inside handlers abort the whole run and
    /// come back as [`GenerationResult::Failed`].
    pub fn generate(&self, workspace: &Workspace) -> GenerationResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(workspace)));
        let result = match outcome {
            Ok(Ok(text)) => GenerationResult::Success { text },
            Ok(Err(error)) => GenerationResult::Failed {
                diagnostic: Diagnostic::from_error(error),
            },
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked".to_string());
                GenerationResult::Failed {
                    diagnostic: Diagnostic {
                        kind: DiagnosticKind::HandlerFailure,
                        block_id: None,
                        message,
                    },
                }
            }
        };
        if let GenerationResult::Failed { diagnostic } = &result {
            tracing::warn!("Generation failed: {}", diagnostic.message);
        }
        result
    }

    fn run(&self, workspace: &Workspace) -> Result<String> {
        let mut ctx = Context::new(&self.registry, &self.handlers, &self.options.indent);
        for name in workspace.variables() {
            ctx.declare_variable(name);
        }

        let (entries, orphans): (Vec<&Block>, Vec<&Block>) = workspace
            .roots()
            .iter()
            .partition(|root| root.block_type == ENTRY_POINT);

        let mut program = None;
        for entry in entries {
            let code = ctx.root_to_code(entry)?;
            program.get_or_insert(code);
        }
        for orphan in orphans {
            ctx.root_to_code(orphan)?;
            tracing::debug!("Discarded output of orphan block {}", orphan.id);
        }

        let text = program.unwrap_or_else(|| EMPTY_PROGRAM.to_string());
        tracing::debug!(
            "Generated {} bytes with {} definitions",
            text.len(),
            ctx.definitions().len()
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Order;
    use blocksmith_core::{BlockType, FieldValue, Placement};

    fn registry() -> Arc<BlockRegistry> {
        Arc::new(BlockRegistry::builtin())
    }

    fn program(registry: &BlockRegistry) -> (Workspace, String) {
        let workspace = Workspace::with_entry_point(registry).unwrap();
        let entry = workspace.entry_point().unwrap().id.clone();
        (workspace, entry)
    }

    fn place(
        workspace: &mut Workspace,
        registry: &BlockRegistry,
        block: Block,
        parent: &str,
        socket: &str,
    ) {
        workspace
            .insert(
                registry,
                block,
                Placement::Socket {
                    parent: parent.to_string(),
                    socket: socket.to_string(),
                },
            )
            .unwrap();
    }

    fn led(registry: &BlockRegistry, id: &str, pin: f64, state: &str) -> Block {
        registry
            .instantiate("component_led", id)
            .unwrap()
            .with_field("PIN", pin)
            .with_field("STATE", state)
    }

    #[test]
    fn test_empty_program() {
        let registry = registry();
        let (workspace, _) = program(&registry);
        let result = Generator::new(registry).generate(&workspace);
        assert_eq!(result.text(), Some("void setup() {\n}\n\nvoid loop() {\n}\n"));
    }

    #[test]
    fn test_no_entry_point() {
        let registry = registry();
        let result = Generator::new(registry).generate(&Workspace::new());
        assert_eq!(result.text(), Some(EMPTY_PROGRAM));
    }

    #[test]
    fn test_led_in_setup() {
        let registry = registry();
        let (mut workspace, entry) = program(&registry);
        place(
            &mut workspace,
            &registry,
            led(&registry, "led", 13.0, "HIGH"),
            &entry,
            "SETUP",
        );

        let result = Generator::new(registry).generate(&workspace);
        assert_eq!(
            result.text(),
            Some("void setup() {\n  pinMode(13, OUTPUT);\n  digitalWrite(13, HIGH);\n}\n\nvoid loop() {\n}\n")
        );
    }

    #[test]
    fn test_shared_definition_emitted_once() {
        let registry = registry();
        let (mut workspace, entry) = program(&registry);
        place(
            &mut workspace,
            &registry,
            led(&registry, "on", 13.0, "HIGH").with_next(led(&registry, "off", 13.0, "LOW")),
            &entry,
            "LOOP",
        );

        let text = Generator::new(registry).generate(&workspace).output();
        assert_eq!(text.matches("pinMode(13, OUTPUT);").count(), 1);
        assert!(text.contains("  digitalWrite(13, HIGH);\n  digitalWrite(13, LOW);\n"));
    }

    #[test]
    fn test_definitions_do_not_leak_between_runs() {
        let registry = registry();
        let (mut workspace, entry) = program(&registry);
        place(
            &mut workspace,
            &registry,
            led(&registry, "led", 7.0, "HIGH"),
            &entry,
            "LOOP",
        );
        let generator = Generator::new(registry);
        assert!(generator.generate(&workspace).output().contains("pinMode(7, OUTPUT);"));

        workspace.delete("led").unwrap();
        assert!(!generator.generate(&workspace).output().contains("pinMode"));
    }

    #[test]
    fn test_nested_blocks_and_precedence() {
        let registry = registry();
        let (mut workspace, entry) = program(&registry);
        let sum = registry
            .instantiate("math_arithmetic", "sum")
            .unwrap()
            .with_field("OP", "ADD")
            .with_input("A", Block::new("one", "math_number").with_field("NUM", 1.0))
            .with_input("B", Block::new("two", "math_number").with_field("NUM", 2.0));
        let product = registry
            .instantiate("math_arithmetic", "product")
            .unwrap()
            .with_field("OP", "MULTIPLY")
            .with_input("A", sum)
            .with_input("B", Block::new("three", "math_number").with_field("NUM", 3.0));
        let assign = registry
            .instantiate("variables_set", "set")
            .unwrap()
            .with_field("VAR", "level")
            .with_input("VALUE", product);
        place(&mut workspace, &registry, assign, &entry, "LOOP");

        let text = Generator::new(registry).generate(&workspace).output();
        assert_eq!(
            text,
            "float level = 0;\n\nvoid setup() {\n}\n\nvoid loop() {\n  level = (1 + 2) * 3;\n}\n"
        );
    }

    #[test]
    fn test_repeat_with_if_else() {
        let registry = registry();
        let (mut workspace, entry) = program(&registry);
        let condition = Block::new("cond", "logic_boolean").with_field("BOOL", "TRUE");
        let branch = registry
            .instantiate("controls_if", "if")
            .unwrap()
            .with_input("IF0", condition)
            .with_input("DO0", led(&registry, "on", 13.0, "HIGH"))
            .with_input("ELSE", led(&registry, "off", 13.0, "LOW"));
        let repeat = registry
            .instantiate("controls_repeat_ext", "repeat")
            .unwrap()
            .with_input("DO", branch);
        place(&mut workspace, &registry, repeat, &entry, "LOOP");

        let text = Generator::new(registry).generate(&workspace).output();
        assert!(text.contains(
            "  for (int count = 0; count < 10; count++) {\n    if (true) {\n      digitalWrite(13, HIGH);\n    } else {\n      digitalWrite(13, LOW);\n    }\n  }\n"
        ));
    }

    #[test]
    fn test_empty_value_socket_uses_default() {
        let registry = registry();
        let (mut workspace, entry) = program(&registry);
        let print = Block::new("print", "arduino_serial_print");
        place(&mut workspace, &registry, print, &entry, "LOOP");

        let text = Generator::new(registry).generate(&workspace).output();
        assert!(text.contains("  Serial.println(\"\");\n"));
    }

    #[test]
    fn test_handler_error_aborts_whole_run() {
        fn broken(block: &Block, _: &mut Context<'_>) -> Result<String> {
            Err(Error::handler(block, "pin is on fire"))
        }

        let registry = registry();
        let (mut workspace, entry) = program(&registry);
        place(
            &mut workspace,
            &registry,
            led(&registry, "led", 13.0, "HIGH")
                .with_next(Block::new("wait", "arduino_delay").with_field("TIME", 10.0)),
            &entry,
            "LOOP",
        );
        let mut generator = Generator::new(registry);
        generator.register_statement("arduino_delay", broken);

        let result = generator.generate(&workspace);
        let GenerationResult::Failed { diagnostic } = &result else {
            panic!("expected failure, got {:?}", result);
        };
        assert_eq!(diagnostic.kind, DiagnosticKind::HandlerFailure);
        assert_eq!(diagnostic.block_id.as_deref(), Some("wait"));
        let output = result.output();
        assert!(output.starts_with("// Error generating code:"));
        assert!(!output.contains("digitalWrite"));
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_handler_panic_is_caught() {
        fn explode(_: &Block, _: &mut Context<'_>) -> Result<(String, Order)> {
            panic!("sensor exploded");
        }

        let registry = registry();
        let (mut workspace, entry) = program(&registry);
        let print = Block::new("print", "arduino_serial_print")
            .with_input("TEXT", Block::new("t", "text").with_field("TEXT", "hi"));
        place(&mut workspace, &registry, print, &entry, "LOOP");
        let mut generator = Generator::new(registry);
        generator.register_expression("text", explode);

        let result = generator.generate(&workspace);
        assert!(!result.is_success());
        assert!(result.output().contains("sensor exploded"));
    }

    #[test]
    fn test_orphan_failure_aborts_and_orphan_text_is_discarded() {
        fn broken(block: &Block, _: &mut Context<'_>) -> Result<String> {
            Err(Error::handler(block, "broken"))
        }

        let registry = registry();
        let (mut workspace, _) = program(&registry);
        let orphan = Block::new("orphan", "arduino_delay").with_field("TIME", 5.0);
        workspace
            .insert(&registry, orphan, Placement::TopLevel)
            .unwrap();

        let mut generator = Generator::new(registry);
        assert!(!generator.generate(&workspace).output().contains("delay(5)"));

        generator.register_statement("arduino_delay", broken);
        assert!(!generator.generate(&workspace).is_success());
    }

    #[test]
    fn test_type_without_handler_is_unknown() {
        let mut registry = BlockRegistry::builtin();
        registry.register(BlockType::statement("custom_beep", "Arduino"));
        let registry = Arc::new(registry);
        let (mut workspace, entry) = program(&registry);
        place(
            &mut workspace,
            &registry,
            Block::new("beep", "custom_beep"),
            &entry,
            "LOOP",
        );

        let result = Generator::new(registry).generate(&workspace);
        let GenerationResult::Failed { diagnostic } = result else {
            panic!("expected failure");
        };
        assert_eq!(diagnostic.kind, DiagnosticKind::UnknownType);
        assert_eq!(diagnostic.block_id.as_deref(), Some("beep"));
    }

    #[test]
    fn test_gated_blocks_still_generate() {
        // A loaded document may contain blocks the current selection no
        // longer allows; they are generated regardless.
        let registry = registry();
        let (mut workspace, entry) = program(&registry);
        let humidity = Block::new("hum", "arduino_humidity_read");
        let print = Block::new("print", "arduino_serial_print").with_input("TEXT", humidity);
        place(&mut workspace, &registry, print, &entry, "LOOP");

        let text = Generator::new(registry).generate(&workspace).output();
        assert!(text.starts_with("#include <Arduino_HTS221.h>\n\n"));
        assert!(text.contains("  if (!HTS.begin()) { while (1); }\n"));
        assert!(text.contains("  Serial.println(HTS.readHumidity());\n"));
    }

    #[test]
    fn test_imu_helpers_are_defined_once() {
        let registry = registry();
        let (mut workspace, entry) = program(&registry);
        let first = Block::new("p1", "arduino_serial_print").with_input(
            "TEXT",
            Block::new("x1", "arduino_imu_read").with_field("AXIS", "X"),
        );
        let second = Block::new("p2", "arduino_serial_print").with_input(
            "TEXT",
            Block::new("x2", "component_imu").with_field("SENSOR_TYPE", "ACC_X"),
        );
        place(
            &mut workspace,
            &registry,
            first.with_next(second),
            &entry,
            "LOOP",
        );

        let text = Generator::new(registry).generate(&workspace).output();
        assert_eq!(text.matches("float readAccelerationX() {").count(), 1);
        assert_eq!(text.matches("#include <Arduino_LSM6DS3.h>").count(), 1);
        assert_eq!(text.matches("Serial.println(readAccelerationX());").count(), 2);
    }

    #[test]
    fn test_custom_indent() {
        let registry = registry();
        let (mut workspace, entry) = program(&registry);
        place(
            &mut workspace,
            &registry,
            Block::new("wait", "arduino_delay").with_field("TIME", FieldValue::Number(250.0)),
            &entry,
            "LOOP",
        );
        let generator = Generator::with_options(
            registry,
            GeneratorOptions {
                indent: "\t".to_string(),
            },
        );
        assert!(generator.generate(&workspace).output().contains("\tdelay(250);\n"));
    }

    #[test]
    fn test_long_loop_body() {
        let registry = registry();
        let (mut workspace, entry) = program(&registry);
        let waits = (0..10_000).map(|i| {
            Block::new(format!("wait{}", i), "arduino_delay").with_field("TIME", 5.0)
        });
        let body = Block::from_chain(waits).unwrap();
        place(&mut workspace, &registry, body, &entry, "LOOP");

        let result = Generator::new(registry).generate(&workspace);
        let text = result.text().unwrap();
        assert_eq!(text.matches("  delay(5);\n").count(), 10_000);
    }

    #[test]
    fn test_result_serializes_with_status_tag() {
        let result = GenerationResult::Success {
            text: "x".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["text"], "x");
    }
}
