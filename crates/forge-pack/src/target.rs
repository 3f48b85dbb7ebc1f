//! Target resolution - which runtime extensions an execution environment needs
//!
//! Every recognized target is a row in `TARGET_PROFILES`. A row fixes the
//! chunk template, how server builtins are handled, the host-provided modules
//! excluded from bundling, and the name announced to loaders. Adding a target
//! means adding a row.

use crate::config::{BuildConfiguration, ExternalsSpec, LibraryTarget};
use crate::engine::Engine;
use crate::error::PipelineError;
use crate::extension::{ExtensionDescriptor, ExtensionKind, Stage};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Target Specifier
// ============================================================================

type ConfigureFn = dyn Fn(&mut dyn Engine) -> anyhow::Result<()> + Send + Sync;

/// Escape hatch: a caller-provided function that wires the target itself
#[derive(Clone)]
pub struct TargetConfigurator {
    callback: Arc<ConfigureFn>,
}

impl TargetConfigurator {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut dyn Engine) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    pub fn invoke(&self, engine: &mut dyn Engine) -> anyhow::Result<()> {
        (self.callback)(engine)
    }
}

impl fmt::Debug for TargetConfigurator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TargetConfigurator(..)")
    }
}

impl PartialEq for TargetConfigurator {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl Serialize for TargetConfigurator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("custom")
    }
}

/// The `target` setting
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawTarget")]
pub enum Target {
    Named(String),
    /// `false` (or `true`); never a valid target
    Flag(bool),
    Custom(TargetConfigurator),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Name(String),
    Flag(bool),
}

impl From<RawTarget> for Target {
    fn from(raw: RawTarget) -> Self {
        match raw {
            RawTarget::Name(name) => Self::Named(name),
            RawTarget::Flag(flag) => Self::Flag(flag),
        }
    }
}

impl Target {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn custom<F>(callback: F) -> Self
    where
        F: Fn(&mut dyn Engine) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Custom(TargetConfigurator::new(callback))
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::named("web")
    }
}

// ============================================================================
// Profile Table
// ============================================================================

/// How the bundle wraps and loads its chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkTemplate {
    Jsonp,
    WebWorker,
    Node { async_chunk_loading: bool },
}

/// What happens to server builtins such as `fs` or `Buffer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinHandling {
    /// Browser-like: polyfill according to the `node` options
    Polyfill,
    /// Server or shell: the host provides them
    HostProvided,
}

/// Name announced to loaders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderTargetName {
    Fixed(&'static str),
    /// The identifier the row was selected by
    Identifier,
}

#[derive(Debug)]
pub struct TargetProfile {
    pub identifiers: &'static [&'static str],
    pub template: ChunkTemplate,
    pub builtins: BuiltinHandling,
    /// Host-provided modules left out of the bundle
    pub externals: &'static [&'static str],
    pub loader_target: LoaderTargetName,
}

const NW_MODULES: &[&str] = &["nw.gui"];

const ELECTRON_MAIN_MODULES: &[&str] = &[
    "app",
    "auto-updater",
    "browser-window",
    "content-tracing",
    "dialog",
    "electron",
    "global-shortcut",
    "ipc",
    "ipc-main",
    "menu",
    "menu-item",
    "power-monitor",
    "protocol",
    "tray",
    "remote",
    "web-view",
    "web-frame",
    "clipboard",
    "crash-reporter",
    "screen",
    "shell",
    "native-image",
];

const ELECTRON_RENDERER_MODULES: &[&str] = &[
    "app",
    "auto-updater",
    "browser-window",
    "content-tracing",
    "dialog",
    "electron",
    "global-shortcut",
    "ipc",
    "ipc-renderer",
    "menu",
    "menu-item",
    "power-monitor",
    "protocol",
    "tray",
    "remote",
    "web-view",
    "clipboard",
    "crash-reporter",
    "screen",
    "shell",
];

pub static TARGET_PROFILES: &[TargetProfile] = &[
    TargetProfile {
        identifiers: &["web"],
        template: ChunkTemplate::Jsonp,
        builtins: BuiltinHandling::Polyfill,
        externals: &[],
        loader_target: LoaderTargetName::Fixed("web"),
    },
    TargetProfile {
        identifiers: &["webworker"],
        template: ChunkTemplate::WebWorker,
        builtins: BuiltinHandling::Polyfill,
        externals: &[],
        loader_target: LoaderTargetName::Fixed("webworker"),
    },
    TargetProfile {
        identifiers: &["node"],
        template: ChunkTemplate::Node {
            async_chunk_loading: false,
        },
        builtins: BuiltinHandling::HostProvided,
        externals: &[],
        loader_target: LoaderTargetName::Fixed("node"),
    },
    TargetProfile {
        identifiers: &["async-node"],
        template: ChunkTemplate::Node {
            async_chunk_loading: true,
        },
        builtins: BuiltinHandling::HostProvided,
        externals: &[],
        loader_target: LoaderTargetName::Fixed("node"),
    },
    TargetProfile {
        identifiers: &["node-webkit"],
        template: ChunkTemplate::Jsonp,
        builtins: BuiltinHandling::HostProvided,
        externals: NW_MODULES,
        loader_target: LoaderTargetName::Fixed("node-webkit"),
    },
    TargetProfile {
        identifiers: &["atom", "electron", "electron-main"],
        template: ChunkTemplate::Node {
            async_chunk_loading: true,
        },
        builtins: BuiltinHandling::HostProvided,
        externals: ELECTRON_MAIN_MODULES,
        loader_target: LoaderTargetName::Identifier,
    },
    TargetProfile {
        identifiers: &["electron-renderer"],
        template: ChunkTemplate::Jsonp,
        builtins: BuiltinHandling::HostProvided,
        externals: ELECTRON_RENDERER_MODULES,
        loader_target: LoaderTargetName::Fixed("electron-renderer"),
    },
];

impl TargetProfile {
    pub fn lookup(identifier: &str) -> Option<&'static TargetProfile> {
        TARGET_PROFILES
            .iter()
            .find(|profile| profile.identifiers.contains(&identifier))
    }

    /// Every identifier with a row, in table order
    pub fn identifiers() -> impl Iterator<Item = &'static str> {
        TARGET_PROFILES
            .iter()
            .flat_map(|profile| profile.identifiers.iter().copied())
    }

    /// Extensions for this row, in registration order
    pub fn extensions(&self, identifier: &str, config: &BuildConfiguration) -> Vec<ExtensionKind> {
        let mut extensions = Vec::with_capacity(5);

        extensions.push(match self.template {
            ChunkTemplate::Jsonp => ExtensionKind::JsonpTemplate(config.output.clone()),
            ChunkTemplate::WebWorker => ExtensionKind::WebWorkerTemplate(config.output.clone()),
            ChunkTemplate::Node {
                async_chunk_loading,
            } => ExtensionKind::NodeTemplate {
                async_chunk_loading,
            },
        });

        extensions.push(ExtensionKind::FunctionModule(config.output.clone()));

        extensions.push(match self.builtins {
            BuiltinHandling::Polyfill => ExtensionKind::NodeSource(config.node.clone()),
            BuiltinHandling::HostProvided => ExtensionKind::NodeTarget,
        });

        if !self.externals.is_empty() {
            extensions.push(ExtensionKind::Externals {
                library_target: LibraryTarget::CommonJs,
                externals: ExternalsSpec::requests(self.externals.iter().copied()),
            });
        }

        let loader_target = match self.loader_target {
            LoaderTargetName::Fixed(name) => name,
            LoaderTargetName::Identifier => identifier,
        };
        extensions.push(ExtensionKind::LoaderTarget(loader_target.to_string()));

        extensions
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// What the target contributes to the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSetup {
    Builtin(Vec<ExtensionDescriptor>),
    Custom(TargetConfigurator),
}

/// Resolve the configured target, failing on anything outside the table
pub fn resolve_target(
    target: &Target,
    config: &BuildConfiguration,
) -> Result<TargetSetup, PipelineError> {
    match target {
        Target::Named(identifier) => {
            let profile = TargetProfile::lookup(identifier)
                .ok_or_else(|| PipelineError::unsupported_target(identifier.as_str()))?;

            debug!(target = %identifier, "pack.target");

            Ok(TargetSetup::Builtin(
                profile
                    .extensions(identifier, config)
                    .into_iter()
                    .map(|kind| ExtensionDescriptor::new(Stage::Target, kind))
                    .collect(),
            ))
        }
        Target::Custom(configurator) => {
            debug!(target = "custom", "pack.target");
            Ok(TargetSetup::Custom(configurator.clone()))
        }
        Target::Flag(flag) => Err(PipelineError::unsupported_target(flag.to_string())),
    }
}
