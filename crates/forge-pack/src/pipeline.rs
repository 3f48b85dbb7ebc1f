//! Pipeline assembly
//!
//! `compile` turns a configuration into a `PipelineDescriptor` without
//! touching any engine. The descriptor is an ordered list of steps plus the
//! three resolution tables; `apply` hands it to an engine in one pass.
//!
//! Registration order:
//!
//! ```text
//! plugins → target → library → externals → devtool → entry
//!   → language shims + dependency dialects
//!   → cleanup passes → id ordering → usage flags
//!   → path templates → record ids → case warnings → cache
//! ```
//!
//! Later extensions may assume ids and flags assigned by earlier ones, so the
//! stage of each step never decreases along the list.

use crate::config::{BuildConfiguration, EntrySpec};
use crate::devtool::select_devtool;
use crate::engine::{Engine, EngineSettings};
use crate::error::PipelineError;
use crate::extension::{ExtensionDescriptor, ExtensionKind, Stage};
use crate::library::library_extensions;
use crate::resolve::{ResolutionTable, ResolverSet};
use crate::target::{resolve_target, TargetConfigurator, TargetSetup};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, trace};

// ============================================================================
// Descriptor
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum PipelineStep {
    Register(ExtensionDescriptor),
    /// Custom target; invoked with the engine in the target position
    ConfigureTarget { configurator: TargetConfigurator },
    /// Entry-declared notification
    DeclareEntry {
        context: Option<PathBuf>,
        entry: Option<EntrySpec>,
    },
}

impl PipelineStep {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Register(extension) => extension.stage,
            Self::ConfigureTarget { .. } => Stage::Target,
            Self::DeclareEntry { .. } => Stage::Entry,
        }
    }
}

/// A wired, ready-to-apply pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineDescriptor {
    settings: EngineSettings,
    steps: Vec<PipelineStep>,
    resolvers: ResolverSet,
}

impl PipelineDescriptor {
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn resolvers(&self) -> &ResolverSet {
        &self.resolvers
    }

    /// Registered extensions, in order
    pub fn extensions(&self) -> impl Iterator<Item = &ExtensionDescriptor> {
        self.steps.iter().filter_map(|step| match step {
            PipelineStep::Register(extension) => Some(extension),
            _ => None,
        })
    }

    /// Extension names, in order
    pub fn kinds(&self) -> Vec<&str> {
        self.extensions().map(|e| e.name()).collect()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Register every step with the engine, then install the resolvers.
    ///
    /// The first error aborts; steps already registered stay registered.
    pub fn apply(self, engine: &mut dyn Engine) -> Result<(), PipelineError> {
        debug!(steps = self.steps.len(), "pack.apply");

        engine.configure(&self.settings);

        for step in self.steps {
            match step {
                PipelineStep::Register(extension) => {
                    trace!(extension = %extension.name(), stage = ?extension.stage, "pack.register");
                    engine.register(extension)?;
                }
                PipelineStep::ConfigureTarget { configurator } => {
                    trace!("pack.configure_target");
                    configurator.invoke(engine)?;
                }
                PipelineStep::DeclareEntry { context, entry } => {
                    engine.declare_entry(context.as_deref(), entry.as_ref())?;
                }
            }
        }

        engine.after_plugins()?;

        for table in self.resolvers.into_tables() {
            let table = table.rebase(engine.resolver(table.kind()));
            engine.install_resolver(table);
        }

        engine.after_resolvers()?;
        Ok(())
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Default)]
struct StepList {
    steps: Vec<PipelineStep>,
}

impl StepList {
    fn push(&mut self, step: PipelineStep) {
        debug_assert!(
            self.steps
                .last()
                .map_or(true, |last| last.stage() <= step.stage()),
            "pipeline stage moved backwards at {:?}",
            step.stage()
        );
        self.steps.push(step);
    }

    fn register(&mut self, stage: Stage, kind: ExtensionKind) {
        self.push(PipelineStep::Register(ExtensionDescriptor::new(stage, kind)));
    }

    fn register_all(&mut self, stage: Stage, kinds: impl IntoIterator<Item = ExtensionKind>) {
        for kind in kinds {
            self.register(stage, kind);
        }
    }

    fn extend(&mut self, extensions: impl IntoIterator<Item = ExtensionDescriptor>) {
        for extension in extensions {
            self.push(PipelineStep::Register(extension));
        }
    }
}

/// Core language shims and one extension per dependency dialect
fn dependency_extensions(config: &BuildConfiguration) -> Vec<ExtensionKind> {
    let resolve = ResolutionTable::normal(&config.resolve);

    vec![
        ExtensionKind::Compatibility,
        ExtensionKind::Loader,
        ExtensionKind::NodeStuff(config.node.clone()),
        ExtensionKind::RequireJsStuff,
        ExtensionKind::Api,
        ExtensionKind::Const,
        ExtensionKind::RequireInclude,
        ExtensionKind::RequireEnsure,
        ExtensionKind::RequireContext {
            modules: resolve.modules().to_vec(),
            extensions: resolve.extensions().to_vec(),
        },
        ExtensionKind::Amd {
            module: config.module.clone(),
            amd: config.amd_options(),
        },
        ExtensionKind::CommonJs(config.module.clone()),
        ExtensionKind::HarmonyModules(config.module.clone()),
        ExtensionKind::System(config.module.clone()),
    ]
}

const CLEANUP_PASSES: [ExtensionKind; 4] = [
    ExtensionKind::RemoveParentModules,
    ExtensionKind::RemoveEmptyChunks,
    ExtensionKind::MergeDuplicateChunks,
    ExtensionKind::FlagIncludedChunks,
];

/// Compile a configuration into a pipeline descriptor.
///
/// The target is resolved first, so an unsupported target fails before any
/// step exists. The configuration is only read.
pub fn compile(config: &BuildConfiguration) -> Result<PipelineDescriptor, PipelineError> {
    let target = resolve_target(&config.target, config)?;

    let mut steps = StepList::default();

    steps.register_all(
        Stage::Plugins,
        config.plugins.iter().cloned().map(ExtensionKind::User),
    );

    match target {
        TargetSetup::Builtin(extensions) => steps.extend(extensions),
        TargetSetup::Custom(configurator) => {
            steps.push(PipelineStep::ConfigureTarget { configurator })
        }
    }

    steps.extend(library_extensions(config));

    if let Some(devtool) = select_devtool(config.devtool.as_deref(), &config.output) {
        steps.register(Stage::Devtool, devtool);
    }

    steps.register(Stage::Entry, ExtensionKind::EntryOption);
    steps.push(PipelineStep::DeclareEntry {
        context: config.context.clone(),
        entry: config.entry.clone(),
    });

    steps.register_all(Stage::Dependencies, dependency_extensions(config));
    steps.register_all(Stage::Optimize, CLEANUP_PASSES);
    steps.register(
        Stage::Ordering,
        ExtensionKind::OccurrenceOrder { prefer_entry: true },
    );
    steps.register(Stage::Usage, ExtensionKind::FlagDependencyUsage);
    steps.register(Stage::Output, ExtensionKind::TemplatedPath);
    steps.register(Stage::Records, ExtensionKind::RecordIds);
    steps.register(Stage::Diagnostics, ExtensionKind::WarnCaseSensitiveModules);

    if config.cache_enabled() {
        steps.register(Stage::Cache, ExtensionKind::Cache(config.cache_store()));
    }

    let settings = EngineSettings {
        context: config.context.clone(),
        output_path: config.output.path.clone(),
        records_input_path: config.records_input_path().map(PathBuf::from),
        records_output_path: config.records_output_path().map(PathBuf::from),
        name: config.name.clone(),
    };

    debug!(
        name = ?settings.name,
        steps = steps.steps.len(),
        "pack.compile"
    );

    Ok(PipelineDescriptor {
        settings,
        steps: steps.steps,
        resolvers: ResolverSet::build(config),
    })
}

/// Compile and apply in one go
pub fn compile_into(
    config: &BuildConfiguration,
    engine: &mut dyn Engine,
) -> Result<(), PipelineError> {
    compile(config)?.apply(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheOption, PluginSpec};
    use crate::engine::testing::{EngineCall, RecordingEngine};
    use crate::resolve::{ResolveOptions, ResolverKind};
    use crate::target::Target;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CATALOGUE: &[&str] = &[
        "entry-option",
        "compatibility",
        "loader",
        "node-stuff",
        "require-js-stuff",
        "api",
        "const",
        "require-include",
        "require-ensure",
        "require-context",
        "amd",
        "common-js",
        "harmony-modules",
        "system",
        "remove-parent-modules",
        "remove-empty-chunks",
        "merge-duplicate-chunks",
        "flag-included-chunks",
        "occurrence-order",
        "flag-dependency-usage",
        "templated-path",
        "record-ids",
        "warn-case-sensitive-modules",
    ];

    fn position(kinds: &[&str], name: &str) -> usize {
        kinds
            .iter()
            .position(|k| *k == name)
            .unwrap_or_else(|| panic!("{name} missing from {kinds:?}"))
    }

    #[test]
    fn test_default_pipeline() {
        let descriptor = compile(&BuildConfiguration::default()).unwrap();

        let mut expected = vec![
            "jsonp-template",
            "function-module",
            "node-source",
            "loader-target",
        ];
        expected.extend_from_slice(CATALOGUE);

        assert_eq!(descriptor.kinds(), expected);
        assert!(matches!(
            descriptor.steps()[5],
            PipelineStep::DeclareEntry { .. }
        ));
    }

    #[test]
    fn test_stages_never_decrease() {
        let config = BuildConfiguration {
            target: Target::named("electron-renderer"),
            devtool: Some("cheap-module-eval-source-map".to_string()),
            plugins: vec![PluginSpec::new("banner")],
            watch: true,
            externals: Some(crate::config::ExternalsSpec::requests(["react"])),
            ..Default::default()
        };
        let descriptor = compile(&config).unwrap();

        let stages: Vec<Stage> = descriptor.steps().iter().map(|s| s.stage()).collect();
        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted);

        let kinds = descriptor.kinds();
        assert!(position(&kinds, "occurrence-order") < position(&kinds, "flag-dependency-usage"));
        assert_eq!(kinds.first(), Some(&"banner"));
        assert_eq!(kinds.last(), Some(&"cache"));
    }

    #[test]
    fn test_devtool_sits_between_externals_and_entry() {
        let config = BuildConfiguration {
            devtool: Some("source-map".to_string()),
            externals: Some(crate::config::ExternalsSpec::requests(["jquery"])),
            ..Default::default()
        };
        let kinds = compile(&config).unwrap().kinds().join(",");
        assert!(kinds.contains("loader-target,externals,source-map-dev-tool,entry-option"));
    }

    #[test]
    fn test_require_context_uses_resolve_defaults() {
        let descriptor = compile(&BuildConfiguration::default()).unwrap();
        let context = descriptor
            .extensions()
            .find(|e| e.name() == "require-context")
            .unwrap();
        assert_eq!(
            context.kind,
            ExtensionKind::RequireContext {
                modules: vec!["node_modules".to_string()],
                extensions: vec![".js".to_string(), ".json".to_string()],
            }
        );
    }

    #[test]
    fn test_cache_configuration() {
        let cache_of = |config: BuildConfiguration| {
            compile(&config)
                .unwrap()
                .extensions()
                .find_map(|e| match &e.kind {
                    ExtensionKind::Cache(store) => Some(store.clone()),
                    _ => None,
                })
        };

        assert_eq!(cache_of(BuildConfiguration::default()), None);
        assert_eq!(
            cache_of(BuildConfiguration {
                watch: true,
                ..Default::default()
            }),
            Some(None)
        );
        assert_eq!(
            cache_of(BuildConfiguration {
                watch: true,
                cache: Some(CacheOption::Enabled(false)),
                ..Default::default()
            }),
            None
        );

        let store = json!({ "maxAge": 30 }).as_object().cloned().unwrap();
        assert_eq!(
            cache_of(BuildConfiguration {
                cache: Some(CacheOption::Store(store.clone())),
                ..Default::default()
            }),
            Some(Some(store))
        );
    }

    #[test]
    fn test_unsupported_target_registers_nothing() {
        let config = BuildConfiguration {
            target: Target::named("bogus"),
            plugins: vec![PluginSpec::new("banner")],
            ..Default::default()
        };
        let mut engine = RecordingEngine::new();

        let err = compile_into(&config, &mut engine).unwrap_err();
        assert!(err.to_string().contains("'bogus'"));
        assert!(engine.calls.is_empty());
    }

    #[test]
    fn test_false_target() {
        let config = BuildConfiguration {
            target: Target::Flag(false),
            ..Default::default()
        };
        assert!(matches!(
            compile(&config),
            Err(PipelineError::UnsupportedTarget { .. })
        ));
    }

    #[test]
    fn test_apply_call_order() {
        let config = BuildConfiguration {
            target: Target::named("node"),
            ..Default::default()
        };
        let mut engine = RecordingEngine::new();
        compile_into(&config, &mut engine).unwrap();

        assert_eq!(engine.calls.first(), Some(&EngineCall::Configure));
        assert_eq!(
            engine.calls[engine.calls.len() - 5..],
            [
                EngineCall::AfterPlugins,
                EngineCall::InstallResolver(ResolverKind::Normal),
                EngineCall::InstallResolver(ResolverKind::Context),
                EngineCall::InstallResolver(ResolverKind::Loader),
                EngineCall::AfterResolvers,
            ]
        );

        let entry_option = engine
            .calls
            .iter()
            .position(|c| *c == EngineCall::Register("entry-option".to_string()))
            .unwrap();
        assert_eq!(engine.calls[entry_option + 1], EngineCall::DeclareEntry);
        assert_eq!(engine.registered_names(), compile(&config).unwrap().kinds());
    }

    #[test]
    fn test_apply_rebases_existing_resolvers() {
        let existing = ResolutionTable::loader(&ResolveOptions {
            modules: Some(vec!["shared_loaders".to_string()]),
            ..Default::default()
        });
        let mut engine = RecordingEngine::new().with_resolver(existing);

        compile_into(&BuildConfiguration::default(), &mut engine).unwrap();

        assert_eq!(
            engine.resolvers[&ResolverKind::Loader].modules(),
            ["shared_loaders"]
        );
        assert_eq!(
            engine.resolvers[&ResolverKind::Normal].modules(),
            ["node_modules"]
        );
        assert!(engine.resolvers[&ResolverKind::Context].resolves_to_context());
    }

    #[test]
    fn test_collaborator_error_propagates_unchanged() {
        let mut engine = RecordingEngine::new().rejecting("amd");
        let err = compile_into(&BuildConfiguration::default(), &mut engine).unwrap_err();

        assert_eq!(err.to_string(), "amd rejected its options");
        assert_eq!(engine.registered_names().last(), Some(&"require-context"));
        assert!(!engine.calls.contains(&EngineCall::AfterPlugins));
    }

    #[test]
    fn test_settings() {
        let config = BuildConfiguration {
            context: Some(PathBuf::from("/app")),
            name: Some("client".to_string()),
            records_path: Some(PathBuf::from("/app/records.json")),
            output: crate::config::OutputOptions {
                path: PathBuf::from("/app/dist"),
                ..Default::default()
            },
            ..Default::default()
        };
        let descriptor = compile(&config).unwrap();

        assert_eq!(
            descriptor.settings(),
            &EngineSettings {
                context: Some(PathBuf::from("/app")),
                output_path: PathBuf::from("/app/dist"),
                records_input_path: Some(PathBuf::from("/app/records.json")),
                records_output_path: Some(PathBuf::from("/app/records.json")),
                name: Some("client".to_string()),
            }
        );
    }

    #[test]
    fn test_json_rendering() {
        let descriptor = compile(&BuildConfiguration::default()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&descriptor.to_json_pretty().unwrap()).unwrap();

        assert_eq!(value["steps"][0]["step"], "register");
        assert_eq!(value["steps"][0]["kind"], "jsonp-template");
        assert_eq!(value["steps"][0]["stage"], "target");
        assert_eq!(value["steps"][5]["step"], "declare-entry");
        assert_eq!(value["resolvers"]["context"]["resolveToContext"], true);
    }
}
