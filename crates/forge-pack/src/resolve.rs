//! Resolution tables
//!
//! Three independent tables are produced for every compilation:
//! - `normal`: regular module requests, from `resolve`
//! - `context`: the same options, resolving to directories only
//! - `loader`: loader requests, from `resolveLoader`
//!
//! Each table layers the configured options over whatever table the engine
//! already holds, then over conventional defaults.

use crate::config::BuildConfiguration;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Module lookup options; unset fields fall through to the next layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolveOptions {
    /// Directories searched for bare module requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    /// Package description fields consulted for the entry file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_files: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforce_extension: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symlinks: Option<bool>,
}

fn strings(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|v| v.to_string()).collect())
}

impl ResolveOptions {
    pub fn normal_defaults() -> Self {
        Self {
            modules: strings(&["node_modules"]),
            extensions: strings(&[".js", ".json"]),
            main_fields: strings(&["browser", "module", "main"]),
            description_files: strings(&["package.json"]),
            alias: Some(IndexMap::new()),
            enforce_extension: Some(false),
            symlinks: Some(true),
        }
    }

    pub fn loader_defaults() -> Self {
        Self {
            main_fields: strings(&["loader", "main"]),
            ..Self::normal_defaults()
        }
    }

    /// Fields set here win; unset fields are taken from `base`
    pub fn merged_over(&self, base: Option<&ResolveOptions>) -> ResolveOptions {
        let Some(base) = base else {
            return self.clone();
        };

        ResolveOptions {
            modules: self.modules.clone().or_else(|| base.modules.clone()),
            extensions: self.extensions.clone().or_else(|| base.extensions.clone()),
            main_fields: self.main_fields.clone().or_else(|| base.main_fields.clone()),
            description_files: self
                .description_files
                .clone()
                .or_else(|| base.description_files.clone()),
            alias: self.alias.clone().or_else(|| base.alias.clone()),
            enforce_extension: self.enforce_extension.or(base.enforce_extension),
            symlinks: self.symlinks.or(base.symlinks),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolverKind {
    Normal,
    Context,
    Loader,
}

impl ResolverKind {
    pub const ALL: [ResolverKind; 3] = [Self::Normal, Self::Context, Self::Loader];

    fn defaults(self) -> ResolveOptions {
        match self {
            Self::Normal | Self::Context => ResolveOptions::normal_defaults(),
            Self::Loader => ResolveOptions::loader_defaults(),
        }
    }
}

/// One configured lookup procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionTable {
    kind: ResolverKind,
    /// Directory-only resolution
    resolve_to_context: bool,
    #[serde(skip)]
    configured: ResolveOptions,
    options: ResolveOptions,
}

impl ResolutionTable {
    fn build(kind: ResolverKind, configured: &ResolveOptions, base: Option<&ResolveOptions>) -> Self {
        let options = configured
            .merged_over(base)
            .merged_over(Some(&kind.defaults()));

        Self {
            kind,
            resolve_to_context: kind == ResolverKind::Context,
            configured: configured.clone(),
            options,
        }
    }

    pub fn normal(resolve: &ResolveOptions) -> Self {
        Self::build(ResolverKind::Normal, resolve, None)
    }

    pub fn context(resolve: &ResolveOptions) -> Self {
        Self::build(ResolverKind::Context, resolve, None)
    }

    pub fn loader(resolve_loader: &ResolveOptions) -> Self {
        Self::build(ResolverKind::Loader, resolve_loader, None)
    }

    /// Rebuild on top of a table the engine already holds
    pub fn rebase(&self, base: Option<&ResolutionTable>) -> Self {
        Self::build(self.kind, &self.configured, base.map(|b| &b.options))
    }

    pub fn kind(&self) -> ResolverKind {
        self.kind
    }

    pub fn resolves_to_context(&self) -> bool {
        self.resolve_to_context
    }

    /// Effective options with every layer applied
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn modules(&self) -> &[String] {
        self.options.modules.as_deref().unwrap_or_default()
    }

    pub fn extensions(&self) -> &[String] {
        self.options.extensions.as_deref().unwrap_or_default()
    }

    pub fn main_fields(&self) -> &[String] {
        self.options.main_fields.as_deref().unwrap_or_default()
    }
}

/// The three tables of one compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverSet {
    pub normal: ResolutionTable,
    pub context: ResolutionTable,
    pub loader: ResolutionTable,
}

impl ResolverSet {
    pub fn build(config: &BuildConfiguration) -> Self {
        Self {
            normal: ResolutionTable::normal(&config.resolve),
            context: ResolutionTable::context(&config.resolve),
            loader: ResolutionTable::loader(&config.resolve_loader),
        }
    }

    pub fn get(&self, kind: ResolverKind) -> &ResolutionTable {
        match kind {
            ResolverKind::Normal => &self.normal,
            ResolverKind::Context => &self.context,
            ResolverKind::Loader => &self.loader,
        }
    }

    /// Tables in installation order: normal, context, loader
    pub fn into_tables(self) -> [ResolutionTable; 3] {
        [self.normal, self.context, self.loader]
    }
}
