//! Include locations.
//!
//! A [`Location`] names one external fragment. It is built from a raw include
//! directive ([`RawInclude`]) and normalized on construction so that two
//! references to the same fragment compare equal.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::context::{Context, Scope};
use crate::error::IncludeError;
use crate::variables::Variables;

/// Property names that select the kind of a structured include.
const KIND_KEYS: [&str; 5] = ["local", "project", "remote", "template", "component"];

/// The five ways a fragment can be referenced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    #[display("local")]
    Local,
    #[display("project")]
    Project,
    #[display("remote")]
    Remote,
    #[display("template")]
    Template,
    #[display("component")]
    Component,
}

/// An include directive as written, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInclude {
    /// `include "ci/build.kdl"`: a local path or a remote URL.
    Path(String),
    /// `include project="group/app" file="ci.kdl"`: named properties.
    /// A property may carry several values (`file "a.kdl" "b.kdl"`).
    Properties(BTreeMap<String, Vec<String>>),
    /// A directive whose shape could not be read at all.
    Invalid { text: String, reason: String },
}

impl RawInclude {
    /// Expand variable references in every value.
    pub fn expand(&self, variables: &Variables) -> RawInclude {
        match self {
            RawInclude::Path(path) => RawInclude::Path(variables.expand(path)),
            RawInclude::Properties(props) => RawInclude::Properties(
                props
                    .iter()
                    .map(|(k, values)| {
                        (
                            k.clone(),
                            values.iter().map(|v| variables.expand(v)).collect(),
                        )
                    })
                    .collect(),
            ),
            RawInclude::Invalid { .. } => self.clone(),
        }
    }

    /// Best-effort display of the directive, used when it cannot become a Location.
    pub fn display(&self) -> String {
        match self {
            RawInclude::Path(path) => path.clone(),
            RawInclude::Properties(props) => {
                if let Some(values) = KIND_KEYS.iter().find_map(|k| props.get(*k)) {
                    return values.join(", ");
                }
                props
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v.join(",")))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            RawInclude::Invalid { text, .. } => text.clone(),
        }
    }

    /// Address of each location the directive names, before normalization,
    /// in the order [`Location::parse`] yields them.
    pub fn written(&self) -> Vec<String> {
        let RawInclude::Properties(props) = self else {
            return vec![self.display().trim().to_string()];
        };
        let (Some(project), Some(files)) = (props.get("project"), props.get("file")) else {
            return vec![self.display().trim().to_string()];
        };

        let project = project.join(",");
        let reference = props
            .get("ref")
            .map(|r| r.join(","))
            .filter(|r| !r.trim().is_empty());
        files
            .iter()
            .map(|file| match &reference {
                Some(reference) => {
                    format!("{}:{}@{}", project.trim(), file.trim(), reference.trim())
                }
                None => format!("{}:{}", project.trim(), file.trim()),
            })
            .collect()
    }
}

/// Registry address of a component: `host/path@version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentAddress {
    pub registry_host: String,
    pub path: String,
    pub version: String,
}

impl ComponentAddress {
    pub fn parse(address: &str) -> Result<Self, IncludeError> {
        let malformed = || {
            IncludeError::MalformedLocation(
                "Component address must have the form `host/path@version`".to_string(),
            )
        };

        let (name, version) = address.trim().rsplit_once('@').ok_or_else(malformed)?;
        let version = version.trim();
        let (host, path) = name.split_once('/').ok_or_else(malformed)?;
        let host = host.trim().to_lowercase();
        let path = path.trim().trim_matches('/').to_lowercase();

        if host.is_empty() || path.is_empty() || version.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            registry_host: host,
            path,
            version: version.to_string(),
        })
    }

    /// Split the path into the owning project and the component name.
    pub fn project_and_name(&self) -> Option<(&str, &str)> {
        self.path
            .rsplit_once('/')
            .filter(|(project, name)| !project.is_empty() && !name.is_empty())
    }
}

impl std::fmt::Display for ComponentAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.registry_host, self.path, self.version)
    }
}

/// A normalized reference to one external fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// A file in the project and commit being resolved.
    Local { path: String },
    /// A file in another project, at an optional ref.
    Project {
        project: String,
        file: String,
        reference: Option<String>,
    },
    /// An arbitrary http(s) URL.
    Remote { url: String },
    /// A built-in template.
    Template { name: String },
    /// A versioned component from a registry.
    Component(ComponentAddress),
}

impl Location {
    /// Build the locations named by a raw directive.
    ///
    /// A project include listing several files yields one location per file.
    pub fn parse(raw: &RawInclude) -> Result<Vec<Location>, IncludeError> {
        match raw {
            RawInclude::Path(path) => {
                let trimmed = path.trim();
                if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
                    Ok(vec![Location::remote(trimmed)?])
                } else {
                    Ok(vec![Location::local(trimmed)?])
                }
            }
            RawInclude::Properties(props) => Self::parse_properties(props),
            RawInclude::Invalid { reason, .. } => {
                Err(IncludeError::MalformedLocation(reason.clone()))
            }
        }
    }

    fn parse_properties(props: &BTreeMap<String, Vec<String>>) -> Result<Vec<Location>, IncludeError> {
        let kinds: Vec<&str> = KIND_KEYS
            .iter()
            .copied()
            .filter(|k| props.contains_key(*k))
            .collect();

        let kind = match kinds.as_slice() {
            [kind] => *kind,
            [] => {
                return Err(IncludeError::MalformedLocation(
                    "Include must name one of `local`, `project`, `remote`, `template` or `component`"
                        .to_string(),
                ));
            }
            _ => {
                return Err(IncludeError::MalformedLocation(format!(
                    "Include names more than one source: {}",
                    kinds.join(", ")
                )));
            }
        };

        for key in props.keys() {
            let allowed = key == kind || (kind == "project" && (key == "file" || key == "ref"));
            if !allowed {
                return Err(IncludeError::MalformedLocation(format!(
                    "Unknown property `{}` for a {} include",
                    key, kind
                )));
            }
        }

        let address = single_value(props, kind)?;
        match kind {
            "local" => Ok(vec![Location::local(address)?]),
            "remote" => Ok(vec![Location::remote(address)?]),
            "template" => Ok(vec![Location::template(address)?]),
            "component" => Ok(vec![Location::Component(ComponentAddress::parse(address)?)]),
            _ => {
                let files = props.get("file").filter(|f| !f.is_empty()).ok_or_else(|| {
                    IncludeError::MalformedLocation(
                        "Project include requires at least one `file`".to_string(),
                    )
                })?;
                let reference = match props.get("ref") {
                    Some(_) => Some(single_value(props, "ref")?),
                    None => None,
                };
                files
                    .iter()
                    .map(|file| Location::project(address, file, reference))
                    .collect()
            }
        }
    }

    pub fn local(path: &str) -> Result<Location, IncludeError> {
        Ok(Location::Local {
            path: normalize_path(path, "Local file path")?,
        })
    }

    pub fn project(
        project: &str,
        file: &str,
        reference: Option<&str>,
    ) -> Result<Location, IncludeError> {
        let project_path = project.trim().trim_matches('/').to_lowercase();
        if project_path.is_empty() {
            return Err(IncludeError::MalformedLocation(
                "Project path must not be empty".to_string(),
            ));
        }
        Ok(Location::Project {
            project: project_path,
            file: normalize_path(file, "Project file path")?,
            reference: reference
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
        })
    }

    pub fn remote(url: &str) -> Result<Location, IncludeError> {
        let malformed = || {
            IncludeError::MalformedLocation(
                "Remote include must be an absolute http or https URL".to_string(),
            )
        };
        let parsed = url::Url::parse(url.trim()).map_err(|_| malformed())?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(malformed());
        }
        Ok(Location::Remote {
            url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn template(name: &str) -> Result<Location, IncludeError> {
        Ok(Location::Template {
            name: normalize_path(name, "Template name")?,
        })
    }

    pub fn kind(&self) -> LocationKind {
        match self {
            Location::Local { .. } => LocationKind::Local,
            Location::Project { .. } => LocationKind::Project,
            Location::Remote { .. } => LocationKind::Remote,
            Location::Template { .. } => LocationKind::Template,
            Location::Component(_) => LocationKind::Component,
        }
    }

    /// Primary address: path, project, URL, template name or component address.
    pub fn address(&self) -> String {
        match self {
            Location::Local { path } => path.clone(),
            Location::Project { project, .. } => project.clone(),
            Location::Remote { url } => url.clone(),
            Location::Template { name } => name.clone(),
            Location::Component(address) => address.to_string(),
        }
    }

    pub fn sub_path(&self) -> Option<&str> {
        match self {
            Location::Project { file, .. } => Some(file),
            _ => None,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Location::Project { reference, .. } => reference.as_deref(),
            Location::Component(address) => Some(&address.version),
            _ => None,
        }
    }

    /// Identity of this location for caching and cycle detection.
    ///
    /// Local paths are only meaningful relative to the project and commit they
    /// are read from, so their key carries the context scope.
    pub fn key(&self, ctx: &Context) -> IncludeKey {
        let scope = match self {
            Location::Local { .. } => Some(ctx.scope().clone()),
            _ => None,
        };
        IncludeKey {
            location: self.clone(),
            scope,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Project {
                project,
                file,
                reference,
            } => {
                write!(f, "{}:{}", project, file)?;
                if let Some(reference) = reference {
                    write!(f, "@{}", reference)?;
                }
                Ok(())
            }
            other => write!(f, "{}", other.address()),
        }
    }
}

/// Cache and cycle-detection identity of an include.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IncludeKey {
    pub location: Location,
    pub scope: Option<Scope>,
}

fn single_value<'a>(
    props: &'a BTreeMap<String, Vec<String>>,
    key: &str,
) -> Result<&'a str, IncludeError> {
    match props.get(key).map(|v| v.as_slice()) {
        Some([value]) => Ok(value.as_str()),
        _ => Err(IncludeError::MalformedLocation(format!(
            "`{}` must be a single string",
            key
        ))),
    }
}

fn normalize_path(path: &str, what: &str) -> Result<String, IncludeError> {
    let normalized = path.trim().trim_matches('/');
    if normalized.is_empty() {
        return Err(IncludeError::MalformedLocation(format!(
            "{} must not be empty",
            what
        )));
    }
    Ok(normalized.to_string())
}
