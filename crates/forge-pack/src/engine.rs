//! The seam between a compiled pipeline and the engine that runs it.
//!
//! Compilation never touches an engine. Only `PipelineDescriptor::apply`
//! calls into this trait, in a fixed order:
//!
//! 1. `configure` with the build context, output and records paths
//! 2. every pipeline step, first to last
//! 3. `after_plugins`
//! 4. `install_resolver` for the normal, context and loader tables
//! 5. `after_resolvers`

use crate::config::EntrySpec;
use crate::extension::ExtensionDescriptor;
use crate::resolve::{ResolutionTable, ResolverKind};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Direct field assignments on the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    pub context: Option<PathBuf>,
    pub output_path: PathBuf,
    pub records_input_path: Option<PathBuf>,
    pub records_output_path: Option<PathBuf>,
    /// Human-readable compilation name
    pub name: Option<String>,
}

/// A build engine that accepts extension registrations.
///
/// Errors returned from any method abort the apply step and reach the caller
/// unchanged.
pub trait Engine {
    fn configure(&mut self, settings: &EngineSettings);

    /// Takes ownership of the descriptor
    fn register(&mut self, extension: ExtensionDescriptor) -> anyhow::Result<()>;

    /// Fired right after the entry-option extension is registered
    fn declare_entry(
        &mut self,
        _context: Option<&Path>,
        _entry: Option<&EntrySpec>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_plugins(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// A table the engine already holds; it becomes the base layer
    fn resolver(&self, _kind: ResolverKind) -> Option<&ResolutionTable> {
        None
    }

    fn install_resolver(&mut self, table: ResolutionTable);

    fn after_resolvers(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
