//! Resolve and validate commands.

use anyhow::{Context as _, Result};
use clap::Args;
use splice_config::{Document, ResolverSettings, load_settings};
use splice_core::capability::RepositoryReader;
use splice_core::{Context, ResolutionError, User};
use splice_resolver::{
    Collaborators, InstanceRoutes, RepositoryComponentRegistry, ResolvedDocument, Resolver,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::{AllowAllAccess, GitRepositoryReader, ReqwestClient, TracingUsageSink};

#[derive(Args)]
pub struct ResolveArgs {
    /// Path to the pipeline configuration
    path: PathBuf,

    /// Project the configuration belongs to
    #[arg(long)]
    project: Option<String>,

    /// Commit to read local includes at (defaults to the project's HEAD)
    #[arg(long)]
    sha: Option<String>,

    /// User resolving the configuration
    #[arg(long)]
    user: Option<String>,

    /// Variable binding, as KEY=VALUE
    #[arg(long = "var", value_parser = parse_key_value)]
    vars: Vec<(String, String)>,

    /// Secret variable binding, as KEY=VALUE. Masked in all output
    #[arg(long = "masked-var", value_parser = parse_key_value)]
    masked_vars: Vec<(String, String)>,

    /// Directory holding one git checkout per project, at `<repos>/<project>`
    #[arg(long, default_value = ".")]
    repos: PathBuf,
}

/// Resolve a configuration and print the merged document.
pub async fn resolve(config: Option<&Path>, args: &ResolveArgs, provenance: bool) -> Result<()> {
    let resolved = run(config, args).await?;
    if provenance {
        println!("{}", serde_json::to_string_pretty(&resolved.provenance)?);
    } else {
        print!("{}", resolved.document.render());
    }
    Ok(())
}

/// Resolve a configuration and print only whether it succeeded.
pub async fn validate(config: Option<&Path>, args: &ResolveArgs) -> Result<()> {
    let resolved = run(config, args).await?;
    println!(
        "Configuration is valid ({} fragment(s) included)",
        resolved.provenance.len()
    );
    Ok(())
}

async fn run(config: Option<&Path>, args: &ResolveArgs) -> Result<ResolvedDocument> {
    let settings = match config {
        Some(path) => load_settings(path)
            .with_context(|| format!("Failed to load settings: {}", path.display()))?,
        None => ResolverSettings::default(),
    };

    let content = std::fs::read_to_string(&args.path)
        .with_context(|| format!("Failed to read config file: {}", args.path.display()))?;
    let document = Document::parse(&content)
        .with_context(|| format!("Failed to parse config file: {}", args.path.display()))?;

    let repository = Arc::new(GitRepositoryReader::new(&args.repos));
    let ctx = build_context(args, repository.as_ref()).await?;
    let resolver = Resolver::new(settings.clone(), collaborators(&settings, repository)?);

    match resolver.resolve(document, ctx).await {
        Ok(resolved) => Ok(resolved),
        Err(ResolutionError::Includes(failures)) => {
            eprintln!("Configuration error:");
            for message in failures.messages() {
                eprintln!("  {}", message);
            }
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn collaborators(
    settings: &ResolverSettings,
    repository: Arc<GitRepositoryReader>,
) -> Result<Collaborators> {
    let host = settings
        .instance_host()
        .context("Instance URL has no host")?;
    let access = Arc::new(AllowAllAccess);

    Ok(Collaborators {
        components: Arc::new(RepositoryComponentRegistry::new(
            host,
            repository.clone(),
            access.clone(),
        )),
        repository,
        http: Arc::new(ReqwestClient::new()?),
        access,
        usage: Arc::new(TracingUsageSink),
        routes: Arc::new(InstanceRoutes::new(settings.instance_url.clone())),
    })
}

async fn build_context(args: &ResolveArgs, repository: &dyn RepositoryReader) -> Result<Context> {
    let mut builder = Context::builder();

    if let Some(project) = &args.project {
        builder = builder.project(project);
        let sha = match &args.sha {
            Some(sha) => Some(sha.clone()),
            None => repository
                .resolve_revision(project, "HEAD")
                .await
                .with_context(|| format!("Failed to resolve HEAD of {}", project))?,
        };
        if let Some(sha) = sha {
            builder = builder.sha(sha);
        }
    } else if let Some(sha) = &args.sha {
        builder = builder.sha(sha);
    }

    if let Some(username) = &args.user {
        builder = builder.user(User::new(username, username));
    }
    for (key, value) in &args.vars {
        builder = builder.variable(key, value);
    }
    for (key, value) in &args.masked_vars {
        builder = builder.masked_variable(key, value);
    }

    Ok(builder.build())
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", s))?;
    if key.is_empty() {
        return Err(format!("empty variable name in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}
