//! Output splitter
//!
//! One compiled unit backs three build-graph modules, selected by the `type`
//! query on the import path:
//!
//! ```text
//! App.svelte              → entry: imports ?type=css (if any) and ?type=js
//! App.svelte?type=js      → generated script
//! App.svelte?type=css     → generated stylesheet
//! ```
//!
//! Splitting is a pure function of the unit and the request.

use crate::paths::escape_specifier;
use crate::sourcemap::SourceMapping;
use crate::unit::CompiledUnit;
use std::fmt;
use std::str::FromStr;

/// Query parameter carrying the discriminator.
pub const TYPE_PARAM: &str = "type";

/// Acceptance stub appended to the entry in non-optimized builds.
pub const HOT_ACCEPT_STUB: &str =
    "if (import.meta.hot) { import.meta.hot.dispose(() => {}); import.meta.hot.accept(() => {}); }";

/// Which face of a compiled unit to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputRequest {
    /// Virtual entry that stitches style and script together
    #[default]
    Entry,
    Script,
    Style,
}

impl OutputRequest {
    pub const ALL: [OutputRequest; 3] = [Self::Entry, Self::Script, Self::Style];

    /// Value used in the `type` query parameter.
    pub fn as_query_value(&self) -> &'static str {
        match self {
            Self::Entry => "main",
            Self::Script => "js",
            Self::Style => "css",
        }
    }

    /// Read the discriminator out of a query string such as `type=css&v=2`.
    ///
    /// A missing query or a query without `type` selects the entry.
    pub fn from_query(query: Option<&str>) -> Result<Self, UnknownOutputType> {
        let Some(query) = query else {
            return Ok(Self::Entry);
        };

        query
            .split('&')
            .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
            .find(|(key, _)| *key == TYPE_PARAM)
            .map(|(_, value)| value.parse())
            .unwrap_or(Ok(Self::Entry))
    }
}

impl FromStr for OutputRequest {
    type Err = UnknownOutputType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "main" => Ok(Self::Entry),
            "js" => Ok(Self::Script),
            "css" => Ok(Self::Style),
            other => Err(UnknownOutputType(other.to_string())),
        }
    }
}

impl fmt::Display for OutputRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_value())
    }
}

/// Rejected `type` query value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown output type '{0}'")]
pub struct UnknownOutputType(pub String);

/// Language of a materialized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Js,
    Css,
}

/// Edge policy for a dependency declared by the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleBehavior {
    /// Never merged with sibling modules
    Isolated,
}

/// What an entry dependency points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// The component's own `?type=css` module
    Stylesheet,
    /// A file read during preprocessing
    File,
}

/// A dependency the entry registers with the build graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDependency {
    pub kind: DependencyKind,
    pub specifier: String,
    pub resolve_from: String,
    pub behavior: BundleBehavior,
}

/// One materialized face of a compiled unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub request: OutputRequest,
    pub kind: OutputKind,
    pub code: String,
    pub map: Option<SourceMapping>,
    pub dependencies: Vec<VirtualDependency>,
}

/// Import specifier for one face of `filename`.
pub fn virtual_path(filename: &str, request: OutputRequest) -> String {
    format!(
        "/{}?{}={}",
        escape_specifier(filename),
        TYPE_PARAM,
        request.as_query_value()
    )
}

/// Materialize `request` from `unit`.
pub fn split(unit: &CompiledUnit, request: OutputRequest) -> OutputArtifact {
    match request {
        OutputRequest::Entry => entry(unit),
        OutputRequest::Script => OutputArtifact {
            request,
            kind: OutputKind::Js,
            code: unit.js.code.clone(),
            map: sanitized(unit.js.map.as_ref(), &unit.filename),
            dependencies: Vec::new(),
        },
        OutputRequest::Style => {
            let css = unit.css.as_ref();
            OutputArtifact {
                request,
                kind: OutputKind::Css,
                code: css.map(|css| css.code.clone()).unwrap_or_default(),
                map: sanitized(css.and_then(|css| css.map.as_ref()), &unit.filename),
                dependencies: Vec::new(),
            }
        }
    }
}

fn entry(unit: &CompiledUnit) -> OutputArtifact {
    let mut lines = Vec::with_capacity(4);
    let mut dependencies = Vec::with_capacity(unit.dependencies.len() + 1);

    if unit.has_styles() {
        let stylesheet = virtual_path(&unit.filename, OutputRequest::Style);
        lines.push(format!("import \"{}\";", stylesheet));
        dependencies.push(VirtualDependency {
            kind: DependencyKind::Stylesheet,
            resolve_from: stylesheet.clone(),
            specifier: stylesheet,
            behavior: BundleBehavior::Isolated,
        });
    }
    lines.push(format!(
        "import Component from \"{}\";",
        virtual_path(&unit.filename, OutputRequest::Script)
    ));
    lines.push("export default Component;".to_string());
    if !unit.optimized {
        lines.push(HOT_ACCEPT_STUB.to_string());
    }

    dependencies.extend(unit.dependencies.iter().map(|dependency| {
        let specifier = format!("/{}", dependency);
        VirtualDependency {
            kind: DependencyKind::File,
            resolve_from: specifier.clone(),
            specifier,
            behavior: BundleBehavior::Isolated,
        }
    }));

    OutputArtifact {
        request: OutputRequest::Entry,
        kind: OutputKind::Js,
        code: lines.join("\n"),
        map: None,
        dependencies,
    }
}

fn sanitized(map: Option<&SourceMapping>, filename: &str) -> Option<SourceMapping> {
    map.map(|map| map.clone().sanitized(filename))
}
