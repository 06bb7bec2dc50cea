use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use tracing_subscriber::EnvFilter;

use relaystack_aws::config::{DeployConfig, HttpsMode};
use relaystack_aws::engine::HandoffEngine;
use relaystack_aws::manifest;
use relaystack_aws::topology::build_topology;
use relaystack_core::differ::{create_plan, destroy_plan};
use relaystack_core::effect::Effect;
use relaystack_core::graph::ResourceGraph;
use relaystack_core::interpreter::{ApplyResult, EffectOutcome, Interpreter};
use relaystack_core::plan::Plan;
use relaystack_core::resource::RemovalPolicy;
use relaystack_state::{
    BackendConfig, GrantState, ResourceState, StateBackend, StateFile, create_backend,
};

#[derive(Parser)]
#[command(name = "relaystack")]
#[command(about = "Declarative deployment topology for a feature-flag relay proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the deployment configuration and topology
    Validate {
        #[command(flatten)]
        deploy: DeployArgs,
    },
    /// Show the dependency graph and build order
    Graph {
        #[command(flatten)]
        deploy: DeployArgs,
    },
    /// Render the deployment manifest handed to the provisioning engine
    Synth {
        #[command(flatten)]
        deploy: DeployArgs,

        /// Write the manifest to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show the reconciliation plan against recorded state
    Plan {
        #[command(flatten)]
        deploy: DeployArgs,

        #[command(flatten)]
        backend: BackendArgs,

        /// Show a line diff against the last written manifest
        #[arg(long)]
        diff: bool,
    },
    /// Apply the plan: record state and write the handoff manifest
    Apply {
        #[command(flatten)]
        deploy: DeployArgs,

        #[command(flatten)]
        backend: BackendArgs,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,

        /// Path of the manifest written for the provisioning engine
        #[arg(long, short, default_value = "relaystack.manifest.json")]
        output: PathBuf,
    },
    /// Tear down recorded resources, honoring removal policies
    Destroy {
        #[command(flatten)]
        deploy: DeployArgs,

        #[command(flatten)]
        backend: BackendArgs,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Force-release a state lock by its ID
    ForceUnlock {
        #[command(flatten)]
        backend: BackendArgs,

        /// Lock ID to release
        lock_id: String,
    },
}

#[derive(Args, Clone)]
struct DeployArgs {
    /// Stack name, used as the prefix for generated physical names
    #[arg(long, default_value = "ld-relay")]
    stack_name: String,

    /// Target AWS region
    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// Upper bound on the availability zones the network spans
    #[arg(long, default_value_t = 3)]
    max_azs: u32,

    /// Number of concurrently running service replicas
    #[arg(long, default_value_t = 3)]
    desired_count: u32,

    /// Build an HTTP-only topology even if CERT_ARN is set
    #[arg(long)]
    no_https: bool,

    /// Retain the flag table on destroy instead of deleting it
    #[arg(long)]
    retain_table: bool,
}

impl DeployArgs {
    /// Overlay command-line overrides on a base configuration
    fn apply_overrides(&self, mut config: DeployConfig) -> DeployConfig {
        config.stack_name = self.stack_name.clone();
        config.region = self.region.clone();
        config.max_availability_zones = self.max_azs;
        config.desired_count = self.desired_count;
        if self.no_https {
            config.https = HttpsMode::Disabled;
        }
        if self.retain_table {
            config.table_removal = RemovalPolicy::Retain;
        }
        config
    }

    /// Process configuration plus command-line overrides
    fn to_config(&self) -> DeployConfig {
        self.apply_overrides(DeployConfig::from_env())
    }
}

#[derive(Args, Clone)]
struct BackendArgs {
    /// State backend to use
    #[arg(long = "backend", default_value = "local", value_parser = ["local", "s3"])]
    backend_type: String,

    /// State file path (local backend)
    #[arg(long, default_value = "relaystack.state.json")]
    state: PathBuf,

    /// State bucket (s3 backend)
    #[arg(long)]
    bucket: Option<String>,

    /// State object key (s3 backend)
    #[arg(long, default_value = "relaystack.state.json")]
    key: String,
}

impl BackendArgs {
    fn to_backend_config(&self, region: &str) -> BackendConfig {
        let mut attributes = HashMap::new();
        attributes.insert("path".to_string(), self.state.display().to_string());
        if let Some(bucket) = &self.bucket {
            attributes.insert("bucket".to_string(), bucket.clone());
        }
        attributes.insert("key".to_string(), self.key.clone());
        attributes.insert("region".to_string(), region.to_string());

        BackendConfig {
            backend_type: self.backend_type.clone(),
            attributes,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { deploy } => run_validate(&deploy),
        Commands::Graph { deploy } => run_graph(&deploy),
        Commands::Synth { deploy, output } => run_synth(&deploy, output.as_deref()),
        Commands::Plan {
            deploy,
            backend,
            diff,
        } => run_plan(&deploy, &backend, diff).await,
        Commands::Apply {
            deploy,
            backend,
            auto_approve,
            output,
        } => run_apply(&deploy, &backend, auto_approve, &output).await,
        Commands::Destroy {
            deploy,
            backend,
            auto_approve,
        } => run_destroy(&deploy, &backend, auto_approve).await,
        Commands::ForceUnlock { backend, lock_id } => run_force_unlock(&backend, &lock_id).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn build_graph(deploy: &DeployArgs) -> anyhow::Result<(DeployConfig, ResourceGraph)> {
    let config = deploy.to_config();
    for warning in config.validate().context("invalid configuration")? {
        println!("{} {}", "Warning:".yellow().bold(), warning);
    }
    let graph = build_topology(&config).context("failed to build topology")?;
    Ok((config, graph))
}

fn run_validate(deploy: &DeployArgs) -> anyhow::Result<()> {
    let (config, graph) = build_graph(deploy)?;

    println!(
        "{} stack '{}': {} resources, {} grants",
        "Valid.".green().bold(),
        config.stack_name,
        graph.resources().len(),
        graph.grants().len()
    );
    Ok(())
}

fn run_graph(deploy: &DeployArgs) -> anyhow::Result<()> {
    let (_, graph) = build_graph(deploy)?;

    println!("{}", "Build order:".bold());
    for (index, resource) in graph.build_order().iter().enumerate() {
        let deps: Vec<&str> = graph
            .dependency_graph()
            .dependencies_of(&resource.id.name)
            .iter()
            .map(|d| d.target.as_str())
            .collect();
        if deps.is_empty() {
            println!("  {}. {}", index + 1, resource.id);
        } else {
            println!(
                "  {}. {} {} {}",
                index + 1,
                resource.id,
                "after".dimmed(),
                deps.join(", ")
            );
        }
    }

    if !graph.grants().is_empty() {
        println!("{}", "Grants:".bold());
        for grant in graph.grants() {
            println!("  {}", grant);
        }
    }
    Ok(())
}

fn run_synth(deploy: &DeployArgs, output: Option<&std::path::Path>) -> anyhow::Result<()> {
    let (config, graph) = build_graph(deploy)?;
    let document = manifest::render(&graph, &config)?
        .to_json_pretty()
        .context("failed to serialize manifest")?;

    match output {
        Some(path) => {
            std::fs::write(path, &document)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Manifest written to {}", path.display());
        }
        None => println!("{}", document),
    }
    Ok(())
}

fn print_plan(plan: &Plan) {
    for effect in plan.effects() {
        let line = effect.describe();
        let colored_line = match effect {
            Effect::Create(_) | Effect::Grant(_) => line.green(),
            Effect::Update { .. } => line.yellow(),
            Effect::Delete(_) | Effect::Revoke(_) => line.red(),
            Effect::Read(_) => line.dimmed(),
        };
        println!("  {}", colored_line);
    }
    println!("\n{}", plan.summary());
}

async fn load_state(
    backend: &dyn StateBackend,
) -> anyhow::Result<StateFile> {
    Ok(backend
        .read_state()
        .await
        .context("failed to read state")?
        .unwrap_or_default())
}

async fn run_plan(deploy: &DeployArgs, backend_args: &BackendArgs, diff: bool) -> anyhow::Result<()> {
    let (config, graph) = build_graph(deploy)?;
    let backend = create_backend(&backend_args.to_backend_config(&config.region)).await?;
    let state = load_state(backend.as_ref()).await?;

    let plan = create_plan(&graph, &state.states_by_id(), &state.recorded_grants())?;

    if plan.is_empty() {
        println!("{}", "No changes. Topology matches recorded state.".green());
        return Ok(());
    }

    print_plan(&plan);

    if diff {
        let rendered = manifest::render(&graph, &config)?
            .to_json_pretty()
            .context("failed to serialize manifest")?;
        let previous = std::fs::read_to_string("relaystack.manifest.json").unwrap_or_default();
        print_manifest_diff(&previous, &rendered);
    }

    Ok(())
}

fn print_manifest_diff(previous: &str, rendered: &str) {
    let text_diff = TextDiff::from_lines(previous, rendered);
    for change in text_diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => print!("{}", format!("-{}", change).red()),
            ChangeTag::Insert => print!("{}", format!("+{}", change).green()),
            ChangeTag::Equal => print!(" {}", change),
        }
    }
}

fn confirm(prompt: &str, auto_approve: bool) -> anyhow::Result<bool> {
    if auto_approve {
        return Ok(true);
    }
    print!("{} Only 'yes' will be accepted: ", prompt);
    std::io::stdout().flush().context("failed to flush stdout")?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(answer.trim() == "yes")
}

/// Fold apply outcomes back into the recorded state, pairing each outcome
/// with the effect that produced it.
fn record_outcomes(
    state: &mut StateFile,
    graph: &ResourceGraph,
    plan: &Plan,
    result: &ApplyResult,
) {
    for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
        let Ok(outcome) = outcome else { continue };

        match (effect, outcome) {
            (
                Effect::Create(resource) | Effect::Update { to: resource, .. },
                EffectOutcome::Created { state: new_state }
                | EffectOutcome::Updated { state: new_state },
            ) => {
                let removal = graph
                    .get(&resource.id.name)
                    .map(|r| r.removal)
                    .unwrap_or_default();
                let mut recorded = ResourceState::new(&resource.id.kind, &resource.id.name)
                    .with_removal_policy(removal.as_str());
                for (key, value) in &new_state.attributes {
                    recorded = recorded.with_attribute(key.clone(), value.to_json());
                }
                if let Some(identifier) = &new_state.identifier {
                    recorded = recorded.with_identifier(identifier.clone());
                }
                state.upsert_resource(recorded);
            }
            (Effect::Read(resource), EffectOutcome::Read { state: read_state }) => {
                let mut recorded = ResourceState::new(&resource.id.kind, &resource.id.name);
                for (key, value) in &resource.attributes {
                    recorded = recorded.with_attribute(key.clone(), value.to_json());
                }
                if let Some(identifier) = &read_state.identifier {
                    recorded = recorded.with_identifier(identifier.clone());
                }
                state.upsert_resource(recorded);
            }
            (Effect::Delete(id), EffectOutcome::Deleted) => {
                state.remove_resource(&id.kind, &id.name);
            }
            (Effect::Grant(grant), EffectOutcome::Granted) => {
                state.upsert_grant(GrantState::from_grant(grant));
            }
            (Effect::Revoke(grant), EffectOutcome::Revoked) => {
                state.remove_grant(&grant.principal, &grant.target);
            }
            _ => {}
        }
    }
}

async fn run_apply(
    deploy: &DeployArgs,
    backend_args: &BackendArgs,
    auto_approve: bool,
    output: &std::path::Path,
) -> anyhow::Result<()> {
    let (config, graph) = build_graph(deploy)?;
    let backend = create_backend(&backend_args.to_backend_config(&config.region)).await?;
    backend.init().await.context("failed to initialize backend")?;

    let lock = backend.acquire_lock("apply").await?;
    let result = apply_inner(&config, &graph, backend.as_ref(), auto_approve, output).await;
    backend.release_lock(&lock).await?;
    result
}

async fn apply_inner(
    config: &DeployConfig,
    graph: &ResourceGraph,
    backend: &dyn StateBackend,
    auto_approve: bool,
    output: &std::path::Path,
) -> anyhow::Result<()> {
    let mut state = load_state(backend).await?;
    let plan = create_plan(graph, &state.states_by_id(), &state.recorded_grants())?;

    if plan.is_empty() {
        println!("{}", "No changes. Topology matches recorded state.".green());
        return Ok(());
    }

    print_plan(&plan);
    if !confirm("\nDo you want to perform these actions?", auto_approve)? {
        println!("Apply cancelled.");
        return Ok(());
    }

    let interpreter = Interpreter::new(HandoffEngine::new());
    let result = interpreter.apply(&plan).await;

    record_outcomes(&mut state, graph, &plan, &result);
    state.increment_serial();
    backend.write_state(&state).await.context("failed to write state")?;

    if !result.is_success() {
        for outcome in &result.outcomes {
            if let Err(e) = outcome {
                eprintln!("{} {}", "Failed:".red().bold(), e);
            }
        }
        bail!(
            "{} of {} effects failed; successful effects were recorded",
            result.failure_count,
            plan.effects().len()
        );
    }

    let document = manifest::render(graph, config)?
        .to_json_pretty()
        .context("failed to serialize manifest")?;
    std::fs::write(output, &document)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "\n{} {} effects applied, manifest handed off at {}",
        "Done.".green().bold(),
        result.success_count,
        output.display()
    );
    Ok(())
}

async fn run_destroy(
    deploy: &DeployArgs,
    backend_args: &BackendArgs,
    auto_approve: bool,
) -> anyhow::Result<()> {
    let (config, graph) = build_graph(deploy)?;
    let backend = create_backend(&backend_args.to_backend_config(&config.region)).await?;

    let lock = backend.acquire_lock("destroy").await?;
    let result = destroy_inner(&graph, backend.as_ref(), auto_approve).await;
    backend.release_lock(&lock).await?;
    result
}

async fn destroy_inner(
    graph: &ResourceGraph,
    backend: &dyn StateBackend,
    auto_approve: bool,
) -> anyhow::Result<()> {
    let mut state = load_state(backend).await?;
    let plan = destroy_plan(graph, &state.states_by_id(), &state.recorded_grants());

    if plan.is_empty() {
        println!("{}", "Nothing to destroy.".green());
        return Ok(());
    }

    print_plan(&plan);
    if !confirm(
        "\nThis will destroy recorded resources. Continue?",
        auto_approve,
    )? {
        println!("Destroy cancelled.");
        return Ok(());
    }

    let interpreter = Interpreter::new(HandoffEngine::new());
    let result = interpreter.apply(&plan).await;

    record_outcomes(&mut state, graph, &plan, &result);
    state.increment_serial();
    backend.write_state(&state).await.context("failed to write state")?;

    if !result.is_success() {
        bail!("{} of {} effects failed", result.failure_count, plan.effects().len());
    }

    println!("\n{} {} effects applied", "Destroyed.".green().bold(), result.success_count);
    Ok(())
}

async fn run_force_unlock(backend_args: &BackendArgs, lock_id: &str) -> anyhow::Result<()> {
    // Region only matters for the s3 backend; the flag set carries no
    // deploy configuration here.
    let backend = create_backend(&backend_args.to_backend_config("us-east-1")).await?;
    backend.force_unlock(lock_id).await?;
    println!("Lock {} released.", lock_id);
    Ok(())
}
