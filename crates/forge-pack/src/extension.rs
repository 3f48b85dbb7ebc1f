//! Extension descriptors - the units of behavior a pipeline registers
//!
//! This module provides:
//! - `ExtensionKind`: every extension this stage knows how to emit, carrying
//!   its own typed options
//! - `Stage`: the pipeline phase a descriptor belongs to
//! - `ExtensionDescriptor`: a kind tagged with its stage
//!
//! Descriptors are opaque to this crate beyond their identity and options;
//! the engine decides what each one does once registered.

use crate::config::{
    ExternalsSpec, LibraryName, LibraryTarget, ModuleOptions, NodeShims, OutputOptions,
    PluginSpec,
};
use crate::devtool::SourceMapOptions;
use serde::Serialize;
use serde_json::{Map, Value};

// ============================================================================
// Core Types
// ============================================================================

/// Pipeline phase, in registration order.
///
/// Later stages may rely on identifiers or flags assigned by earlier ones, so
/// a well-formed pipeline never moves backwards through this list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// User-supplied extensions
    Plugins,
    /// Runtime template, module wrapper, builtins handling, loader target
    Target,
    /// Library export wrapping
    Library,
    /// Configured externals
    Externals,
    /// Debug-mapping strategy
    Devtool,
    /// Entry handling and the entry-declared notification
    Entry,
    /// Language shims and dependency dialects
    Dependencies,
    /// Structural cleanup passes
    Optimize,
    /// Deterministic module/chunk id ordering
    Ordering,
    /// Dead-export usage flags (needs stable ids from `Ordering`)
    Usage,
    /// Output path templating
    Output,
    /// Build-record identity continuity
    Records,
    /// Case-sensitivity warnings
    Diagnostics,
    /// Result caching
    Cache,
}

/// An extension together with the options it is constructed from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "options", rename_all = "kebab-case")]
pub enum ExtensionKind {
    /// Pre-supplied by the configuration
    User(PluginSpec),

    // Target templates and wrappers
    JsonpTemplate(OutputOptions),
    WebWorkerTemplate(OutputOptions),
    NodeTemplate {
        async_chunk_loading: bool,
    },
    FunctionModule(OutputOptions),
    /// Polyfills server builtins for browser-like targets
    NodeSource(NodeShims),
    /// Leaves server builtins to the host runtime
    NodeTarget,
    Externals {
        library_target: LibraryTarget,
        externals: ExternalsSpec,
    },
    /// Announces the resolved target name to loaders
    LoaderTarget(String),

    LibraryTemplate {
        name: Option<LibraryName>,
        target: LibraryTarget,
        umd_named_define: bool,
    },

    // Debug mapping
    SourceMapDevTool(SourceMapOptions),
    EvalSourceMapDevTool(SourceMapOptions),
    EvalDevToolModule {
        source_url_comment: Option<String>,
        module_filename_template: Option<String>,
    },

    EntryOption,

    // Shims and dependency dialects
    Compatibility,
    Loader,
    NodeStuff(NodeShims),
    RequireJsStuff,
    Api,
    Const,
    RequireInclude,
    RequireEnsure,
    RequireContext {
        modules: Vec<String>,
        extensions: Vec<String>,
    },
    Amd {
        module: ModuleOptions,
        amd: Map<String, Value>,
    },
    CommonJs(ModuleOptions),
    HarmonyModules(ModuleOptions),
    System(ModuleOptions),

    // Optimization
    RemoveParentModules,
    RemoveEmptyChunks,
    MergeDuplicateChunks,
    FlagIncludedChunks,
    OccurrenceOrder {
        prefer_entry: bool,
    },
    FlagDependencyUsage,

    TemplatedPath,
    RecordIds,
    WarnCaseSensitiveModules,
    /// Object cache configuration, or `None` for defaults
    Cache(Option<Map<String, Value>>),
}

impl ExtensionKind {
    /// Stable extension name (the user-given name for `User`)
    pub fn name(&self) -> &str {
        match self {
            Self::User(plugin) => &plugin.name,
            Self::JsonpTemplate(_) => "jsonp-template",
            Self::WebWorkerTemplate(_) => "web-worker-template",
            Self::NodeTemplate { .. } => "node-template",
            Self::FunctionModule(_) => "function-module",
            Self::NodeSource(_) => "node-source",
            Self::NodeTarget => "node-target",
            Self::Externals { .. } => "externals",
            Self::LoaderTarget(_) => "loader-target",
            Self::LibraryTemplate { .. } => "library-template",
            Self::SourceMapDevTool(_) => "source-map-dev-tool",
            Self::EvalSourceMapDevTool(_) => "eval-source-map-dev-tool",
            Self::EvalDevToolModule { .. } => "eval-dev-tool-module",
            Self::EntryOption => "entry-option",
            Self::Compatibility => "compatibility",
            Self::Loader => "loader",
            Self::NodeStuff(_) => "node-stuff",
            Self::RequireJsStuff => "require-js-stuff",
            Self::Api => "api",
            Self::Const => "const",
            Self::RequireInclude => "require-include",
            Self::RequireEnsure => "require-ensure",
            Self::RequireContext { .. } => "require-context",
            Self::Amd { .. } => "amd",
            Self::CommonJs(_) => "common-js",
            Self::HarmonyModules(_) => "harmony-modules",
            Self::System(_) => "system",
            Self::RemoveParentModules => "remove-parent-modules",
            Self::RemoveEmptyChunks => "remove-empty-chunks",
            Self::MergeDuplicateChunks => "merge-duplicate-chunks",
            Self::FlagIncludedChunks => "flag-included-chunks",
            Self::OccurrenceOrder { .. } => "occurrence-order",
            Self::FlagDependencyUsage => "flag-dependency-usage",
            Self::TemplatedPath => "templated-path",
            Self::RecordIds => "record-ids",
            Self::WarnCaseSensitiveModules => "warn-case-sensitive-modules",
            Self::Cache(_) => "cache",
        }
    }
}

/// A single orderable unit handed to the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionDescriptor {
    pub stage: Stage,
    #[serde(flatten)]
    pub kind: ExtensionKind,
}

impl ExtensionDescriptor {
    pub fn new(stage: Stage, kind: ExtensionKind) -> Self {
        Self { stage, kind }
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }
}
