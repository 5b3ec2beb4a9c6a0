//! Repository reader over local git checkouts.

use async_trait::async_trait;
use splice_core::capability::{CapabilityError, RepositoryReader};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Reads project files from `<root>/<project>` with the git CLI.
pub struct GitRepositoryReader {
    root: PathBuf,
}

impl GitRepositoryReader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Checkout directory of `project`, if it exists.
    fn project_dir(&self, project: &str) -> Option<PathBuf> {
        if !is_safe_relative(project) {
            return None;
        }
        let dir = self.root.join(project);
        dir.is_dir().then_some(dir)
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<std::process::Output, CapabilityError> {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CapabilityError::Unexpected(format!("failed to run git: {}", e)))
    }
}

#[async_trait]
impl RepositoryReader for GitRepositoryReader {
    async fn read_blob(
        &self,
        project: &str,
        revision: &str,
        path: &str,
    ) -> Result<Option<String>, CapabilityError> {
        let Some(dir) = self.project_dir(project) else {
            return Ok(None);
        };
        if !is_safe_relative(path) || revision.starts_with('-') {
            return Ok(None);
        }

        let object = format!("{}:{}", revision, path);
        let exists = self.git(&dir, &["cat-file", "-e", &object]).await?;
        if !exists.status.success() {
            debug!(project, revision, path, "File not found in repository");
            return Ok(None);
        }

        let output = self.git(&dir, &["show", &object]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CapabilityError::Unexpected(format!(
                "git show failed: {}",
                stderr.trim()
            )));
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    async fn resolve_revision(
        &self,
        project: &str,
        revision: &str,
    ) -> Result<Option<String>, CapabilityError> {
        let Some(dir) = self.project_dir(project) else {
            return Ok(None);
        };
        if revision.is_empty() || revision.starts_with('-') {
            return Ok(None);
        }

        let commitish = format!("{}^{{commit}}", revision);
        let output = self
            .git(&dir, &["rev-parse", "--verify", "--quiet", &commitish])
            .await?;
        if !output.status.success() {
            return Ok(None);
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!sha.is_empty()).then_some(sha))
    }
}

fn is_safe_relative(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.starts_with('-')
        && path.split('/').all(|segment| !segment.is_empty() && segment != "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_escaping_paths() {
        assert!(is_safe_relative("group/app"));
        assert!(is_safe_relative("ci/build.kdl"));
        assert!(!is_safe_relative("../etc"));
        assert!(!is_safe_relative("group/../../etc"));
        assert!(!is_safe_relative("/etc/passwd"));
        assert!(!is_safe_relative("--output=x"));
        assert!(!is_safe_relative(""));
    }

    #[tokio::test]
    async fn test_missing_project_reads_nothing() {
        let reader = GitRepositoryReader::new(std::env::temp_dir().join("splice-no-such-root"));
        assert_eq!(reader.read_blob("group/app", "HEAD", "ci.kdl").await, Ok(None));
        assert_eq!(reader.resolve_revision("group/app", "HEAD").await, Ok(None));
    }
}
