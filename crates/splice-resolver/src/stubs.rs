//! In-memory collaborators for tests.

use async_trait::async_trait;
use splice_config::ResolverSettings;
use splice_core::User;
use splice_core::capability::{
    AccessControl, CapabilityError, HttpClient, RepositoryReader, UsageSink,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::fetcher::{Collaborators, Fetchers};
use crate::registry::RepositoryComponentRegistry;
use crate::routes::InstanceRoutes;
use crate::templates::TemplateCatalog;

pub const INSTANCE_URL: &str = "https://gitlab.example.com";
pub const INSTANCE_HOST: &str = "gitlab.example.com";

/// Repository contents keyed by `(project, sha, path)`, with call counters.
#[derive(Default)]
pub struct MemoryRepository {
    files: HashMap<(String, String, String), String>,
    refs: HashMap<(String, String), String>,
    failures: HashMap<String, CapabilityError>,
    reads: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, project: &str, sha: &str, path: &str, content: &str) -> Self {
        self.files.insert(
            (project.to_string(), sha.to_string(), path.to_string()),
            content.to_string(),
        );
        self
    }

    pub fn with_ref(mut self, project: &str, reference: &str, sha: &str) -> Self {
        self.refs
            .insert((project.to_string(), reference.to_string()), sha.to_string());
        self
    }

    /// Make every read of `path` fail with `error`.
    pub fn with_failure(mut self, path: &str, error: CapabilityError) -> Self {
        self.failures.insert(path.to_string(), error);
        self
    }

    /// Number of `read_blob` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepositoryReader for MemoryRepository {
    async fn read_blob(
        &self,
        project: &str,
        revision: &str,
        path: &str,
    ) -> Result<Option<String>, CapabilityError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if let Some(error) = self.failures.get(path) {
            return Err(error.clone());
        }
        Ok(self
            .files
            .get(&(project.to_string(), revision.to_string(), path.to_string()))
            .cloned())
    }

    async fn resolve_revision(
        &self,
        project: &str,
        revision: &str,
    ) -> Result<Option<String>, CapabilityError> {
        if let Some(sha) = self.refs.get(&(project.to_string(), revision.to_string())) {
            return Ok(Some(sha.clone()));
        }
        let known_sha = self
            .files
            .keys()
            .any(|(p, sha, _)| p == project && sha == revision);
        Ok(known_sha.then(|| revision.to_string()))
    }
}

/// HTTP responses scripted per URL. Unknown URLs answer 404.
#[derive(Default)]
pub struct ScriptedHttp {
    responses: HashMap<String, Result<String, CapabilityError>>,
    calls: AtomicUsize,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: &str, response: Result<String, CapabilityError>) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn get_url(
        &self,
        url: &str,
        _timeout: Duration,
        max_size: usize,
    ) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match self.responses.get(url).cloned() {
            Some(Ok(body)) if body.len() > max_size => Err(CapabilityError::TooLarge(max_size)),
            Some(response) => response,
            None => Err(CapabilityError::Status(404)),
        }
    }
}

pub struct AllowAll;

#[async_trait]
impl AccessControl for AllowAll {
    async fn can_read(&self, _user: Option<&User>, _project: &str) -> Result<bool, CapabilityError> {
        Ok(true)
    }
}

/// Denies the listed projects and allows every other one.
pub struct DenyProjects {
    denied: HashSet<String>,
}

impl DenyProjects {
    pub fn new<'a>(projects: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            denied: projects.into_iter().map(str::to_string).collect(),
        }
    }
}

#[async_trait]
impl AccessControl for DenyProjects {
    async fn can_read(&self, _user: Option<&User>, project: &str) -> Result<bool, CapabilityError> {
        Ok(!self.denied.contains(project))
    }
}

/// Records usage events, or fails every call.
#[derive(Default)]
pub struct RecordingUsage {
    events: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingUsage {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<(String, String)> {
        self.events.lock().unwrap().clone()
    }
}

impl UsageSink for RecordingUsage {
    fn record(&self, event: &str, user_id: &str) -> Result<(), CapabilityError> {
        if self.fail {
            return Err(CapabilityError::Transport("usage sink offline".to_string()));
        }
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), user_id.to_string()));
        Ok(())
    }
}

/// Collaborators wired to in-memory stubs.
pub fn collaborators(
    repository: Arc<MemoryRepository>,
    http: Arc<ScriptedHttp>,
    usage: Arc<RecordingUsage>,
) -> Collaborators {
    let access: Arc<dyn AccessControl> = Arc::new(AllowAll);
    Collaborators {
        components: Arc::new(RepositoryComponentRegistry::new(
            INSTANCE_HOST,
            repository.clone(),
            access.clone(),
        )),
        repository,
        http,
        access,
        usage,
        routes: Arc::new(InstanceRoutes::new(INSTANCE_URL)),
    }
}

fn build(collaborators: Collaborators, settings: ResolverSettings) -> Fetchers {
    Fetchers::new(collaborators, TemplateCatalog::builtin(), Arc::new(settings))
}

pub fn fetchers(repository: Arc<MemoryRepository>) -> Fetchers {
    build(
        collaborators(
            repository,
            Arc::new(ScriptedHttp::new()),
            Arc::new(RecordingUsage::default()),
        ),
        ResolverSettings::default(),
    )
}

pub fn fetchers_with_access(repository: Arc<MemoryRepository>, access: DenyProjects) -> Fetchers {
    let mut collaborators = collaborators(
        repository,
        Arc::new(ScriptedHttp::new()),
        Arc::new(RecordingUsage::default()),
    );
    collaborators.access = Arc::new(access);
    build(collaborators, ResolverSettings::default())
}

pub fn fetchers_with_http(http: Arc<ScriptedHttp>, settings: ResolverSettings) -> Fetchers {
    build(
        collaborators(
            Arc::new(MemoryRepository::new()),
            http,
            Arc::new(RecordingUsage::default()),
        ),
        settings,
    )
}

pub fn fetchers_with_usage(
    repository: Arc<MemoryRepository>,
    usage: Arc<RecordingUsage>,
) -> Fetchers {
    build(
        collaborators(repository, Arc::new(ScriptedHttp::new()), usage),
        ResolverSettings::default(),
    )
}
