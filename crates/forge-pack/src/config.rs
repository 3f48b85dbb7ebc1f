//! Build configuration consumed by the pipeline compiler.
//!
//! The configuration is read once (from TOML, JSON, or built in code) and is
//! treated as immutable afterwards. Field names follow the conventional
//! camelCase spelling so existing configuration files load unchanged.

use crate::resolve::ResolveOptions;
use crate::target::Target;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while loading a configuration document
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(PathBuf),
}

// ============================================================================
// Root Configuration
// ============================================================================

/// The complete build configuration for one compilation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildConfiguration {
    /// Base directory for entries and loaders
    pub context: Option<PathBuf>,
    /// Human-readable compilation name
    pub name: Option<String>,
    pub entry: Option<EntrySpec>,
    /// Execution environment of the emitted bundle (default: "web")
    pub target: Target,
    pub output: OutputOptions,
    /// Debug-mapping flag string, e.g. "cheap-module-eval-source-map"
    #[serde(deserialize_with = "devtool_from_raw")]
    pub devtool: Option<String>,
    pub module: ModuleOptions,
    pub resolve: ResolveOptions,
    pub resolve_loader: ResolveOptions,
    pub externals: Option<ExternalsSpec>,
    /// Extensions supplied by the user, registered ahead of everything else
    pub plugins: Vec<PluginSpec>,
    pub cache: Option<CacheOption>,
    pub watch: bool,
    pub node: NodeShims,
    pub amd: Option<Map<String, Value>>,
    pub records_path: Option<PathBuf>,
    pub records_input_path: Option<PathBuf>,
    pub records_output_path: Option<PathBuf>,
}

impl Default for BuildConfiguration {
    fn default() -> Self {
        Self {
            context: None,
            name: None,
            entry: None,
            target: Target::default(),
            output: OutputOptions::default(),
            devtool: None,
            module: ModuleOptions::default(),
            resolve: ResolveOptions::default(),
            resolve_loader: ResolveOptions::default(),
            externals: None,
            plugins: Vec::new(),
            cache: None,
            watch: false,
            node: NodeShims::default(),
            amd: None,
            records_path: None,
            records_input_path: None,
            records_output_path: None,
        }
    }
}

impl BuildConfiguration {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a configuration from JSON text
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a configuration file, picking the parser from its extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "pack.config_load");

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Records file read at the start of a build
    pub fn records_input_path(&self) -> Option<&Path> {
        self.records_input_path
            .as_deref()
            .or(self.records_path.as_deref())
    }

    /// Records file written at the end of a build
    pub fn records_output_path(&self) -> Option<&Path> {
        self.records_output_path
            .as_deref()
            .or(self.records_path.as_deref())
    }

    /// Whether the result cache is installed.
    ///
    /// An explicit `cache` wins; otherwise caching follows watch mode.
    pub fn cache_enabled(&self) -> bool {
        match &self.cache {
            None => self.watch,
            Some(CacheOption::Enabled(enabled)) => *enabled,
            Some(CacheOption::Store(_)) => true,
        }
    }

    /// Cache configuration handed to the cache extension, if it is an object
    pub fn cache_store(&self) -> Option<Map<String, Value>> {
        match &self.cache {
            Some(CacheOption::Store(store)) => Some(store.clone()),
            _ => None,
        }
    }

    /// AMD options, `{}` when unset
    pub fn amd_options(&self) -> Map<String, Value> {
        self.amd.clone().unwrap_or_default()
    }
}

fn devtool_from_raw<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDevtool {
        Name(String),
        Flag(bool),
    }

    Ok(match Option::<RawDevtool>::deserialize(deserializer)? {
        Some(RawDevtool::Name(name)) if !name.is_empty() => Some(name),
        _ => None,
    })
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputOptions {
    /// Output directory
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsonp_function: Option<String>,
    /// Emit path comments in the function wrapper
    pub pathinfo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<LibraryName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_target: Option<LibraryTarget>,
    pub umd_named_define: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devtool_module_filename_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devtool_fallback_module_filename_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devtool_line_to_line: Option<bool>,
}

impl OutputOptions {
    /// Library target with the `var` default applied
    pub fn effective_library_target(&self) -> LibraryTarget {
        self.library_target.clone().unwrap_or_default()
    }
}

/// Exported library name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LibraryName {
    Single(String),
    /// Nested assignment, e.g. `["MyOrg", "widgets"]`
    Path(Vec<String>),
    /// Per-loader names for UMD output
    Umd(UmdNames),
}

impl LibraryName {
    pub fn is_set(&self) -> bool {
        match self {
            Self::Single(name) => !name.is_empty(),
            Self::Path(_) | Self::Umd(_) => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UmdNames {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commonjs: Option<String>,
}

/// How the bundle exposes its exports
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LibraryTarget {
    /// `var Library = ...`
    #[default]
    Var,
    Assign,
    This,
    Window,
    Global,
    CommonJs,
    CommonJs2,
    Amd,
    Umd,
    Umd2,
    Jsonp,
    /// Left for the library extension to validate
    Other(String),
}

impl LibraryTarget {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Var => "var",
            Self::Assign => "assign",
            Self::This => "this",
            Self::Window => "window",
            Self::Global => "global",
            Self::CommonJs => "commonjs",
            Self::CommonJs2 => "commonjs2",
            Self::Amd => "amd",
            Self::Umd => "umd",
            Self::Umd2 => "umd2",
            Self::Jsonp => "jsonp",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for LibraryTarget {
    fn from(value: String) -> Self {
        match value.as_str() {
            "var" => Self::Var,
            "assign" => Self::Assign,
            "this" => Self::This,
            "window" => Self::Window,
            "global" => Self::Global,
            "commonjs" => Self::CommonJs,
            "commonjs2" => Self::CommonJs2,
            "amd" => Self::Amd,
            "umd" => Self::Umd,
            "umd2" => Self::Umd2,
            "jsonp" => Self::Jsonp,
            _ => Self::Other(value),
        }
    }
}

impl From<LibraryTarget> for String {
    fn from(value: LibraryTarget) -> Self {
        value.as_str().to_string()
    }
}

// ============================================================================
// Entry, Externals, Plugins, Cache
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntrySpec {
    Single(String),
    Multi(Vec<String>),
    Named(IndexMap<String, EntryPoint>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryPoint {
    Single(String),
    Multi(Vec<String>),
}

/// Requests excluded from bundling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalsSpec {
    Request(String),
    List(Vec<ExternalsSpec>),
    Map(IndexMap<String, ExternalValue>),
}

impl ExternalsSpec {
    /// Fixed list of host-provided module names
    pub fn requests<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(
            names
                .into_iter()
                .map(|n| Self::Request(n.into()))
                .collect(),
        )
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Request(request) if request.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalValue {
    /// `true` keeps the request name, `false` bundles it
    Flag(bool),
    Request(String),
    Path(Vec<String>),
    ByTarget(IndexMap<String, String>),
}

/// A pre-supplied extension named by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl PluginSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Value::Null,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheOption {
    Enabled(bool),
    /// Shared cache store configuration
    Store(Map<String, Value>),
}

// ============================================================================
// Module and Node Options
// ============================================================================

/// Options shared by every dependency-dialect extension
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expr_context_request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expr_context_recursive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expr_context_critical: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown_context_request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown_context_recursive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown_context_critical: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrapped_context_recursive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrapped_context_critical: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_export_presence: Option<bool>,
    /// Everything else (rules, noParse, ...) is passed through untouched
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Per-runtime globals shims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeShims {
    /// `false` turns every shim off
    Toggle(bool),
    Table(IndexMap<String, NodeShim>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeShim {
    Enabled(bool),
    /// "mock" or "empty"
    Mode(String),
}

impl Default for NodeShims {
    fn default() -> Self {
        let mut table = IndexMap::new();
        table.insert("console".to_string(), NodeShim::Enabled(false));
        table.insert("global".to_string(), NodeShim::Enabled(true));
        table.insert("process".to_string(), NodeShim::Enabled(true));
        table.insert("Buffer".to_string(), NodeShim::Enabled(true));
        table.insert("__filename".to_string(), NodeShim::Mode("mock".to_string()));
        table.insert("__dirname".to_string(), NodeShim::Mode("mock".to_string()));
        table.insert("setImmediate".to_string(), NodeShim::Enabled(true));
        Self::Table(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BuildConfiguration::default();
        assert_eq!(config.target, Target::named("web"));
        assert_eq!(config.output.effective_library_target(), LibraryTarget::Var);
        assert!(!config.cache_enabled());
        assert!(config.amd_options().is_empty());
        assert!(matches!(config.node, NodeShims::Table(ref t) if t.len() == 7));
    }

    #[test]
    fn test_parse_json() {
        let json = r##"{
            "context": "/app",
            "entry": { "main": "./src/index.js", "vendor": ["react", "react-dom"] },
            "target": "electron-renderer",
            "devtool": "#cheap-module-source-map",
            "output": {
                "path": "/app/dist",
                "library": "Widgets",
                "libraryTarget": "umd",
                "umdNamedDefine": true
            },
            "externals": ["jquery", { "lodash": "_" }],
            "plugins": [{ "name": "banner", "options": { "text": "hi" } }],
            "cache": { "maxAge": 60 },
            "recordsPath": "/app/records.json"
        }"##;

        let config = BuildConfiguration::from_json_str(json).expect("should parse");

        assert_eq!(config.context, Some(PathBuf::from("/app")));
        assert_eq!(config.target, Target::named("electron-renderer"));
        assert_eq!(config.devtool.as_deref(), Some("#cheap-module-source-map"));
        assert_eq!(
            config.output.library,
            Some(LibraryName::Single("Widgets".to_string()))
        );
        assert_eq!(config.output.effective_library_target(), LibraryTarget::Umd);
        assert!(config.output.umd_named_define);
        assert!(matches!(config.entry, Some(EntrySpec::Named(ref m)) if m.len() == 2));
        assert!(matches!(config.externals, Some(ExternalsSpec::List(ref l)) if l.len() == 2));
        assert_eq!(config.plugins[0].name, "banner");
        assert!(config.cache_enabled());
        assert!(config.cache_store().is_some());
        assert_eq!(
            config.records_input_path(),
            Some(Path::new("/app/records.json"))
        );
        assert_eq!(
            config.records_output_path(),
            Some(Path::new("/app/records.json"))
        );
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            target = "node"
            devtool = "source-map"
            watch = true

            [output]
            path = "dist"
            libraryTarget = "commonjs2"

            [resolveLoader]
            modules = ["web_loaders", "node_modules"]
        "#;

        let config = BuildConfiguration::from_toml_str(toml).expect("should parse");

        assert_eq!(config.target, Target::named("node"));
        assert_eq!(
            config.output.effective_library_target(),
            LibraryTarget::CommonJs2
        );
        assert!(config.cache_enabled(), "watch mode enables the cache");
        assert_eq!(config.cache_store(), None);
        assert_eq!(
            config.resolve_loader.modules,
            Some(vec!["web_loaders".to_string(), "node_modules".to_string()])
        );
    }

    #[test]
    fn test_false_target_and_devtool() {
        let config =
            BuildConfiguration::from_json_str(r#"{ "target": false, "devtool": false }"#).unwrap();
        assert_eq!(config.target, Target::Flag(false));
        assert_eq!(config.devtool, None);
    }

    #[test]
    fn test_explicit_cache_overrides_watch() {
        let config = BuildConfiguration {
            watch: true,
            cache: Some(CacheOption::Enabled(false)),
            ..Default::default()
        };
        assert!(!config.cache_enabled());
    }

    #[test]
    fn test_records_paths_prefer_specific() {
        let config = BuildConfiguration {
            records_path: Some(PathBuf::from("records.json")),
            records_output_path: Some(PathBuf::from("out.json")),
            ..Default::default()
        };
        assert_eq!(config.records_input_path(), Some(Path::new("records.json")));
        assert_eq!(config.records_output_path(), Some(Path::new("out.json")));
    }

    #[test]
    fn test_unknown_library_target_is_preserved() {
        let target = LibraryTarget::from("system".to_string());
        assert_eq!(target, LibraryTarget::Other("system".to_string()));
        assert_eq!(String::from(target), "system");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "target = \"webworker\"\nname = \"worker\"").unwrap();

        let config = BuildConfiguration::load(file.path()).unwrap();
        assert_eq!(config.target, Target::named("webworker"));
        assert_eq!(config.name.as_deref(), Some("worker"));
    }

    #[test]
    fn test_load_rejects_unknown_format() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = BuildConfiguration::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = BuildConfiguration::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
