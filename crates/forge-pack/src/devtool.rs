//! Debug-mapping strategy selection.
//!
//! A devtool string such as `"#cheap-module-eval-source-map"` is parsed once
//! into `DevtoolFlags`; every decision after that is a pure function of the
//! flags. Keywords are detected by containment anywhere in the string, so
//! their position and separators carry no meaning.

use crate::config::OutputOptions;
use crate::extension::ExtensionKind;
use serde::{Serialize, Serializer};
use tracing::debug;

const MAP_COMMENT_BOTH: &str = "\n/*\n//@ sourceMappingURL=[url]\n//# sourceMappingURL=[url]\n*/";
const MAP_COMMENT_LEGACY: &str = "\n/*\n//@ sourceMappingURL=[url]\n*/";
const MAP_COMMENT_MODERN: &str = "\n//# sourceMappingURL=[url]";

const URL_COMMENT_BOTH: &str = "\n//@ sourceURL=[url]\n//# sourceURL=[url]";
const URL_COMMENT_LEGACY: &str = "\n//@ sourceURL=[url]";
const URL_COMMENT_MODERN: &str = "\n//# sourceURL=[url]";

#[derive(Debug, Clone, Copy)]
enum Keyword {
    SourceMap,
    Hidden,
    Inline,
    Eval,
    Cheap,
    Module,
    Legacy,
    Modern,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("sourcemap", Keyword::SourceMap),
    ("source-map", Keyword::SourceMap),
    ("hidden", Keyword::Hidden),
    ("inline", Keyword::Inline),
    ("eval", Keyword::Eval),
    ("cheap", Keyword::Cheap),
    ("module", Keyword::Module),
    ("@", Keyword::Legacy),
    ("#", Keyword::Modern),
];

// ============================================================================
// Flags
// ============================================================================

/// Named flags found in a devtool string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DevtoolFlags {
    /// `sourcemap` or `source-map`
    pub source_map: bool,
    pub hidden: bool,
    pub inline: bool,
    pub eval_wrapped: bool,
    pub cheap: bool,
    pub module_maps: bool,
    /// `@` comment dialect
    pub legacy: bool,
    /// `#` comment dialect
    pub modern: bool,
}

impl DevtoolFlags {
    pub fn parse(devtool: &str) -> Self {
        let mut flags = Self::default();
        for (keyword, flag) in KEYWORDS {
            if devtool.contains(keyword) {
                flags.set(*flag);
            }
        }
        flags
    }

    fn set(&mut self, keyword: Keyword) {
        match keyword {
            Keyword::SourceMap => self.source_map = true,
            Keyword::Hidden => self.hidden = true,
            Keyword::Inline => self.inline = true,
            Keyword::Eval => self.eval_wrapped = true,
            Keyword::Cheap => self.cheap = true,
            Keyword::Module => self.module_maps = true,
            Keyword::Legacy => self.legacy = true,
            Keyword::Modern => self.modern = true,
        }
    }

    /// Map mode outranks eval mode
    pub fn mode(&self) -> DevtoolMode {
        if self.source_map {
            DevtoolMode::SourceMap
        } else if self.eval_wrapped {
            DevtoolMode::Eval
        } else {
            DevtoolMode::None
        }
    }

    /// Per-module detail: `module` forces it on, otherwise `cheap` turns it off
    pub fn module_detail(&self) -> bool {
        self.module_maps || !self.cheap
    }

    /// Per-column detail
    pub fn column_detail(&self) -> bool {
        !self.cheap
    }

    /// Comment template for the given comment body, by dialect
    pub fn comment(&self, style: CommentStyle) -> Option<&'static str> {
        let (both, legacy, modern) = match style {
            CommentStyle::SourceMappingUrl => {
                (MAP_COMMENT_BOTH, MAP_COMMENT_LEGACY, MAP_COMMENT_MODERN)
            }
            CommentStyle::SourceUrl => (URL_COMMENT_BOTH, URL_COMMENT_LEGACY, URL_COMMENT_MODERN),
        };

        match (self.legacy, self.modern) {
            (true, true) => Some(both),
            (true, false) => Some(legacy),
            (false, true) => Some(modern),
            (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DevtoolMode {
    /// A map is produced, in a file, inline, or eval-wrapped
    SourceMap,
    /// Modules are only tagged with a source URL
    Eval,
    /// Unrecognized string; nothing is installed
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `sourceMappingURL` reference to a map
    SourceMappingUrl,
    /// `sourceURL` naming the module source
    SourceUrl,
}

// ============================================================================
// Resolved Strategy
// ============================================================================

/// Trailing comment behavior of a source-map extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentAppend {
    Comment(String),
    /// No dialect requested; the extension falls back to its own default
    Unspecified,
    /// `hidden`: never append, whatever the dialect flags say
    Suppressed,
}

impl Serialize for CommentAppend {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Comment(comment) => serializer.serialize_str(comment),
            Self::Unspecified => serializer.serialize_none(),
            Self::Suppressed => serializer.serialize_bool(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapOptions {
    /// `None` when the map is inlined
    pub filename: Option<String>,
    pub module_filename_template: Option<String>,
    pub fallback_module_filename_template: Option<String>,
    pub append: CommentAppend,
    pub module: bool,
    pub columns: bool,
    pub line_to_line: Option<bool>,
}

/// Fully resolved debug-mapping strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevtoolSpec {
    pub flags: DevtoolFlags,
    pub mode: DevtoolMode,
    /// Resolved comment template, `None` when no dialect was requested
    pub comment: Option<&'static str>,
    pub module: bool,
    pub columns: bool,
}

impl DevtoolSpec {
    /// `None` when the string names neither a map nor eval mode
    pub fn parse(devtool: &str) -> Option<Self> {
        Self::from_flags(DevtoolFlags::parse(devtool))
    }

    pub fn from_flags(flags: DevtoolFlags) -> Option<Self> {
        let comment = match flags.mode() {
            DevtoolMode::SourceMap => flags.comment(CommentStyle::SourceMappingUrl),
            DevtoolMode::Eval => flags.comment(CommentStyle::SourceUrl),
            DevtoolMode::None => return None,
        };

        Some(Self {
            flags,
            mode: flags.mode(),
            comment,
            module: flags.module_detail(),
            columns: flags.column_detail(),
        })
    }

    /// The extension implementing this strategy
    pub fn extension(&self, output: &OutputOptions) -> ExtensionKind {
        match self.mode {
            DevtoolMode::Eval | DevtoolMode::None => ExtensionKind::EvalDevToolModule {
                source_url_comment: self.comment.map(str::to_string),
                module_filename_template: output.devtool_module_filename_template.clone(),
            },
            DevtoolMode::SourceMap => {
                let append = if self.flags.hidden {
                    CommentAppend::Suppressed
                } else {
                    match self.comment {
                        Some(comment) => CommentAppend::Comment(comment.to_string()),
                        None => CommentAppend::Unspecified,
                    }
                };

                let options = SourceMapOptions {
                    filename: if self.flags.inline {
                        None
                    } else {
                        output.source_map_filename.clone()
                    },
                    module_filename_template: output.devtool_module_filename_template.clone(),
                    fallback_module_filename_template: output
                        .devtool_fallback_module_filename_template
                        .clone(),
                    append,
                    module: self.module,
                    columns: self.columns,
                    line_to_line: output.devtool_line_to_line,
                };

                if self.flags.eval_wrapped {
                    ExtensionKind::EvalSourceMapDevTool(options)
                } else {
                    ExtensionKind::SourceMapDevTool(options)
                }
            }
        }
    }
}

/// Pick the debug-mapping extension for a devtool setting, if any.
///
/// Strings that match neither mode are accepted without complaint.
pub fn select_devtool(devtool: Option<&str>, output: &OutputOptions) -> Option<ExtensionKind> {
    let devtool = devtool?;
    let spec = DevtoolSpec::parse(devtool);

    debug!(devtool = %devtool, mode = ?spec.as_ref().map(|s| s.mode), "pack.devtool");

    spec.map(|spec| spec.extension(output))
}
