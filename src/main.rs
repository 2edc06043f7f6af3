//! Syndesis configuration resolver entry point
//!
//! Runs one configuration resolution against the cluster (or offline) and
//! prints the redacted result together with the database upgrade decision.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use kube::CustomResourceExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use syndesis_config::configuration::{
    self, env::POD_NAME, EnvSource, KubeSecretStore, ProcessEnv,
};
use syndesis_config::controller::{self, Resolution, ResolveContext};
use syndesis_config::crd::{Syndesis, SyndesisSpec};
use syndesis_config::database::ClusterDatabaseProbe;
use syndesis_config::telemetry::{init_logging, LogFormat};
use syndesis_config::Error;

/// Exit status of a failure that may clear when the resolution is retried (EX_TEMPFAIL)
const EXIT_RETRIABLE: u8 = 75;

#[derive(Parser, Debug)]
#[command(name = "syndesis-config", version, about)]
struct Cli {
    /// Log output format (text or json)
    #[arg(long, global = true, default_value = "text", env = "LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the effective configuration and the database upgrade decision
    Resolve(ResolveArgs),
    /// List add-ons and whether the resolved configuration enables them
    Addons(ResolveArgs),
    /// Print the Syndesis CustomResourceDefinition
    Crd,
}

#[derive(clap::Args, Debug)]
struct ResolveArgs {
    /// Default configuration document (YAML or JSON)
    #[arg(long, env = "SYNDESIS_CONFIG_TEMPLATE", default_value = "config/config.yaml")]
    config: PathBuf,

    /// Namespace of the installation
    #[arg(long, env = "POD_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Name of the Syndesis custom resource
    #[arg(long, default_value = "app")]
    name: String,

    /// Resolve without cluster access
    #[arg(long)]
    offline: bool,

    /// Custom resource spec (YAML or JSON) used in offline mode
    #[arg(long, requires = "offline")]
    spec_file: Option<PathBuf>,

    /// Timeout for each database version probe
    #[arg(long, default_value_t = 10)]
    probe_timeout_secs: u64,

    /// Record the outcome on the custom resource status
    #[arg(long, conflicts_with = "offline")]
    report_status: bool,

    /// Output format of the resolved configuration
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match execute(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Resolution failed: {:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

/// `EXIT_RETRIABLE` for transient cluster or probe failures, 1 otherwise
fn exit_status(err: &anyhow::Error) -> u8 {
    let retriable = match err.downcast_ref::<Error>() {
        Some(e) => e.is_retriable(),
        None => err.downcast_ref::<kube::Error>().is_some(),
    };
    if retriable {
        EXIT_RETRIABLE
    } else {
        1
    }
}

async fn execute(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Crd => {
            print!("{}", serde_yaml::to_string(&Syndesis::crd())?);
            Ok(())
        }
        Command::Resolve(args) => {
            let resolution = run(&args).await?;
            print_resolution(&resolution, args.output)
        }
        Command::Addons(args) => {
            let resolution = run(&args).await?;
            for addon in resolution.config.addons() {
                println!("{:<10} {}", addon.name, addon.enabled);
            }
            Ok(())
        }
    }
}

async fn run(args: &ResolveArgs) -> anyhow::Result<Resolution> {
    info!(
        "Starting syndesis-config v{} for namespace {}",
        env!("CARGO_PKG_VERSION"),
        args.namespace
    );
    let env = ProcessEnv;
    let mut rng = StdRng::from_entropy();

    if args.offline {
        let spec = match &args.spec_file {
            Some(path) => read_spec_file(path)?,
            None => SyndesisSpec::default(),
        };
        let ctx = ResolveContext {
            secret_store: None,
            database_probe: None,
            env: &env,
        };
        let resolution =
            controller::resolve(&args.config, &args.namespace, &spec, &ctx, &mut rng).await?;
        return Ok(resolution);
    }

    let client = kube::Client::try_default()
        .await
        .context("connecting to Kubernetes cluster")?;
    info!("Connected to Kubernetes cluster");

    let store = KubeSecretStore::new(client.clone());
    let probe = ClusterDatabaseProbe::new(client.clone(), env.get(POD_NAME).unwrap_or_default())
        .with_timeout(Duration::from_secs(args.probe_timeout_secs));
    let ctx = ResolveContext {
        secret_store: Some(&store),
        database_probe: Some(&probe),
        env: &env,
    };

    let outcome = match controller::fetch_syndesis_spec(&client, &args.namespace, &args.name).await
    {
        Ok(spec) => controller::resolve(&args.config, &args.namespace, &spec, &ctx, &mut rng).await,
        Err(e) => Err(e),
    };
    let outcome = match outcome {
        Ok(mut resolution) => {
            controller::set_route(&mut resolution.config, &client, &args.namespace, &env)
                .await
                .map(|_| resolution)
        }
        Err(e) => Err(e),
    };

    if args.report_status {
        if let Err(e) =
            controller::report_resolution(&client, &args.namespace, &args.name, &outcome).await
        {
            error!("Failed to report resolution status: {}", e);
        }
    }

    Ok(outcome?)
}

fn read_spec_file(path: &PathBuf) -> anyhow::Result<SyndesisSpec> {
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let document: serde_json::Value = serde_yaml::from_slice(&raw)
        .with_context(|| format!("parsing {}", path.display()))?;
    let overrides = configuration::overrides_from_value(document)?;
    Ok(SyndesisSpec { overrides })
}

fn print_resolution(resolution: &Resolution, output: OutputFormat) -> anyhow::Result<()> {
    let redacted = resolution.config.redacted();
    let document = serde_json::json!({
        "upgradeDecision": resolution.upgrade.to_string(),
        "configuration": redacted,
    });

    match output {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&document)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&document)?),
    }
    Ok(())
}
