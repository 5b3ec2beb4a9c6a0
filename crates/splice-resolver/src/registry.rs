//! Component registry backed by project repositories.
//!
//! A component address `host/group/project/name@version` resolves to the
//! project `group/project` at `version`, reading either
//! `templates/name.kdl` or `templates/name/template.kdl`.

use async_trait::async_trait;
use splice_core::capability::{
    AccessControl, CapabilityError, ComponentPayload, ComponentRegistry, RepositoryReader,
};
use splice_core::{ComponentAddress, User};
use std::sync::Arc;
use tracing::debug;

pub struct RepositoryComponentRegistry {
    host: String,
    repository: Arc<dyn RepositoryReader>,
    access: Arc<dyn AccessControl>,
}

impl RepositoryComponentRegistry {
    pub fn new(
        host: impl Into<String>,
        repository: Arc<dyn RepositoryReader>,
        access: Arc<dyn AccessControl>,
    ) -> Self {
        Self {
            host: host.into().to_lowercase(),
            repository,
            access,
        }
    }

    fn candidate_paths(name: &str) -> [String; 2] {
        [
            format!("templates/{}.kdl", name),
            format!("templates/{}/template.kdl", name),
        ]
    }
}

#[async_trait]
impl ComponentRegistry for RepositoryComponentRegistry {
    async fn resolve(
        &self,
        address: &ComponentAddress,
        user: Option<&User>,
    ) -> Result<ComponentPayload, CapabilityError> {
        if address.registry_host != self.host {
            return Err(CapabilityError::NotFound(format!(
                "Component host `{}` is not served by this instance",
                address.registry_host
            )));
        }

        let (project, name) = address.project_and_name().ok_or_else(|| {
            CapabilityError::NotFound(
                "Component path must name a project and a component".to_string(),
            )
        })?;

        if !self.access.can_read(user, project).await? {
            return Err(CapabilityError::Denied(format!(
                "Component project `{}` not found or access denied",
                project
            )));
        }

        let sha = self
            .repository
            .resolve_revision(project, &address.version)
            .await?
            .ok_or_else(|| {
                CapabilityError::NotFound(format!(
                    "Component version `{}` does not exist",
                    address.version
                ))
            })?;

        for path in Self::candidate_paths(name) {
            if let Some(content) = self.repository.read_blob(project, &sha, &path).await? {
                debug!(project = %project, sha = %sha, path = %path, "Resolved component");
                return Ok(ComponentPayload {
                    project: project.to_string(),
                    sha,
                    path,
                    content,
                });
            }
        }

        Err(CapabilityError::NotFound(format!(
            "Component `{}` does not exist in project `{}`",
            name, project
        )))
    }
}
