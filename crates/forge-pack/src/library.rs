//! Library export wrapping and configured externals.

use crate::config::{BuildConfiguration, LibraryTarget};
use crate::extension::{ExtensionDescriptor, ExtensionKind, Stage};
use tracing::debug;

/// Library-template and externals extensions required by the configuration.
///
/// Configured externals are added on top of any a target row already
/// excluded; neither replaces the other.
pub fn library_extensions(config: &BuildConfiguration) -> Vec<ExtensionDescriptor> {
    let output = &config.output;
    let library_target = output.effective_library_target();
    let mut extensions = Vec::new();

    let has_name = output.library.as_ref().is_some_and(|name| name.is_set());
    if has_name || library_target != LibraryTarget::Var {
        debug!(library_target = %library_target.as_str(), "pack.library");
        extensions.push(ExtensionDescriptor::new(
            Stage::Library,
            ExtensionKind::LibraryTemplate {
                name: output.library.clone(),
                target: library_target.clone(),
                umd_named_define: output.umd_named_define,
            },
        ));
    }

    if let Some(externals) = config.externals.as_ref().filter(|e| e.is_set()) {
        extensions.push(ExtensionDescriptor::new(
            Stage::Externals,
            ExtensionKind::Externals {
                library_target,
                externals: externals.clone(),
            },
        ));
    }

    extensions
}
