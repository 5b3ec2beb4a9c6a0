//! URLs for repository files.

use splice_core::capability::BlobRoutes;

/// Builds `<instance>/<project>/-/blob/<sha>/<path>` style URLs.
#[derive(Debug, Clone)]
pub struct InstanceRoutes {
    base_url: String,
}

impl InstanceRoutes {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn file_url(&self, action: &str, project: &str, sha: &str, path: &str) -> String {
        let encoded_path = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/{}/-/{}/{}/{}",
            self.base_url, project, action, sha, encoded_path
        )
    }
}

impl BlobRoutes for InstanceRoutes {
    fn blob_url(&self, project: &str, sha: &str, path: &str) -> String {
        self.file_url("blob", project, sha, path)
    }

    fn raw_url(&self, project: &str, sha: &str, path: &str) -> String {
        self.file_url("raw", project, sha, path)
    }
}
