//! Forge Pack - the option-application stage of a module bundler
//!
//! Given a build configuration, this crate works out which extensions the
//! bundling engine needs, in which order, and with which options. It also
//! prepares the three module resolution tables.
//!
//! The work is split in two:
//! - [`compile`] is pure. It reads the configuration and returns a
//!   [`PipelineDescriptor`], or fails on an unsupported target.
//! - [`PipelineDescriptor::apply`] hands the descriptor to an [`Engine`].
//!
//! ```ignore
//! let config = BuildConfiguration::load("pack.toml")?;
//! let pipeline = forge_pack::compile(&config)?;
//! pipeline.apply(&mut engine)?;
//! ```

pub mod config;
pub mod devtool;
pub mod engine;
pub mod error;
pub mod extension;
pub mod library;
pub mod logging;
pub mod pipeline;
pub mod resolve;
pub mod target;

pub use config::{BuildConfiguration, ConfigError};
pub use devtool::{select_devtool, DevtoolFlags, DevtoolSpec};
pub use engine::{Engine, EngineSettings};
pub use error::{PipelineError, PipelineErrorCode};
pub use extension::{ExtensionDescriptor, ExtensionKind, Stage};
pub use logging::init_logging;
pub use pipeline::{compile, compile_into, PipelineDescriptor, PipelineStep};
pub use resolve::{ResolutionTable, ResolveOptions, ResolverKind, ResolverSet};
pub use target::{Target, TargetConfigurator, TargetProfile};
