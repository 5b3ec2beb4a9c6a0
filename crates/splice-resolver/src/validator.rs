//! Include validation.
//!
//! Checks run in order: location shape, context sufficiency, content. Every
//! failing check is reported, but content is only checked once the location
//! and context checks pass.

use splice_config::Document;
use splice_core::{Context, IncludeError, Location};

use crate::fetcher::FetchResult;

/// Location and context checks, run before anything is fetched.
pub fn validate_reference(location: &Location, ctx: &Context) -> Vec<IncludeError> {
    validate_location(location)
        .into_iter()
        .chain(validate_context(location, ctx))
        .collect()
}

pub fn validate_location(location: &Location) -> Option<IncludeError> {
    let malformed = |message: &str| Some(IncludeError::MalformedLocation(message.to_string()));
    match location {
        Location::Local { path } if escapes(path) => {
            malformed("Local file path must stay inside the project")
        }
        Location::Project { file, .. } if escapes(file) => {
            malformed("Project file path must stay inside the project")
        }
        Location::Template { name } if escapes(name) => {
            malformed("Template name must not contain `..` segments")
        }
        Location::Component(address) if address.project_and_name().is_none() => {
            malformed("Component path must name a project and a component")
        }
        _ => None,
    }
}

pub fn validate_context(location: &Location, ctx: &Context) -> Option<IncludeError> {
    match location {
        Location::Local { .. } if ctx.project().is_none() || ctx.sha().is_none() => Some(
            IncludeError::ContextRequired("Local file does not have a project context".to_string()),
        ),
        Location::Component(_) if ctx.project().is_none() => {
            Some(IncludeError::ContextRequired(
                "Unable to use components outside of a project context".to_string(),
            ))
        }
        _ => None,
    }
}

/// Check fetched content and parse it into a document.
pub fn validate_content(result: &FetchResult, ctx: &Context) -> Result<Document, IncludeError> {
    if let Some(error) = &result.error {
        return Err(error.clone());
    }

    let content = result.content.as_deref().unwrap_or_default();
    if content.trim().is_empty() {
        return Err(IncludeError::EmptyContent(
            "Included file is empty or does not exist".to_string(),
        ));
    }

    Document::parse(content).map_err(|e| {
        IncludeError::InvalidContent(format!(
            "Included file is not valid KDL: {}",
            ctx.mask(&e.to_string())
        ))
    })
}

fn escapes(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}
