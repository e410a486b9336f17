use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use k8s_openapi::api::core::v1::Pod;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nfs_workload::{
    CallbackPodRequest, ConfigLoader, KubeControlPlane, WorkloadController, WorkloadOptions,
    WorkloadSnapshot, WorkloadSpec,
};

#[derive(Parser)]
#[command(
    name = "nfs-workload",
    about = "Run pods and jobs with NFS-backed volumes on Kubernetes"
)]
struct Cli {
    /// Config file (YAML or JSON); defaults to $NFS_WORKLOAD_CONFIG
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the analysis job over a directory of the export and wait for it
    Job {
        #[arg(long)]
        rel_path: String,
    },
    /// Run a pod from a YAML manifest, wait for it and delete it
    SpecPod {
        #[arg(long)]
        file: String,
    },
    /// Start a callback pod and wait for it to finish
    Pod {
        #[arg(long)]
        name: String,
        /// KEY=VALUE, repeatable
        #[arg(long = "env")]
        env: Vec<String>,
        #[arg(long)]
        memory: Option<String>,
        /// HOST_PATH CONTAINER_PATH, repeatable
        #[arg(long = "volume", num_args = 2, value_names = ["HOST", "CONTAINER"])]
        volumes: Vec<String>,
        #[arg(last = true)]
        command: Vec<String>,
    },
    /// Run a command in a pod and print its output
    Exec {
        #[arg(long)]
        name: String,
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Stop every process in a pod
    Pause {
        #[arg(long)]
        name: String,
    },
    /// Continue every process in a pod
    Resume {
        #[arg(long)]
        name: String,
    },
    /// Check whether a process is running in a pod
    Ps {
        #[arg(long)]
        name: String,
        #[arg(long)]
        process: String,
    },
    /// Print a pod's current state as JSON
    Inspect {
        #[arg(long)]
        name: String,
    },
    /// Print a pod's IP address
    Ip {
        #[arg(long)]
        name: String,
    },
    /// Delete a pod
    Delete {
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let loader = match cli.config {
        Some(path) => ConfigLoader::with_file(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().await.context("Failed to load configuration")?;

    let client = KubeControlPlane::connect(&config)
        .await
        .context("Failed to connect to Kubernetes")?;
    let controller = WorkloadController::new(Arc::new(client), config);
    controller
        .check_connectivity()
        .await
        .context("Kubernetes cluster is not reachable")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping wait");
            on_signal.cancel();
        }
    });

    run(cli.command, &controller, &cancel).await
}

async fn run(command: Command, controller: &WorkloadController, cancel: &CancellationToken) -> Result<()> {
    match command {
        Command::Job { rel_path } => {
            let spec = controller.builder().analysis_job(&rel_path);
            let status = controller.run_job(spec, cancel).await?;
            println!("{}", status);
        }
        Command::SpecPod { file } => {
            let contents = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file))?;
            let pod: Pod = serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse pod manifest {}", file))?;
            let outcome = controller
                .run_spec_pod(WorkloadSpec::Pod(Box::new(pod)), cancel)
                .await?;
            if let Some(err) = &outcome.suppressed {
                tracing::warn!(error = %err, "pod finished but cleanup failed");
            }
            println!("{}", outcome.value);
        }
        Command::Pod {
            name,
            env,
            memory,
            volumes,
            command,
        } => {
            let options = WorkloadOptions {
                env,
                memory,
                ..Default::default()
            };
            let request = CallbackPodRequest {
                name,
                command,
                options,
                bind_paths: volumes,
            };
            let started = controller.start_callback_pod(request, cancel, None).await?;
            let report = started.watcher.await.context("Pod watcher panicked")?;
            println!("{}", report.into_result()?);
        }
        Command::Exec { name, command } => {
            let output = controller
                .exec_channel()
                .exec(&controller.pod_ref(&name), command)
                .await?;
            println!("{}", output);
        }
        Command::Pause { name } => {
            controller
                .exec_channel()
                .pause(&controller.pod_ref(&name))
                .await
                .into_result()?;
        }
        Command::Resume { name } => {
            controller
                .exec_channel()
                .resume(&controller.pod_ref(&name))
                .await
                .into_result()?;
        }
        Command::Ps { name, process } => {
            let probe = controller
                .exec_channel()
                .process_present(&controller.pod_ref(&name), &process)
                .await;
            if let Some(err) = &probe.suppressed {
                tracing::warn!(error = %err, "process probe failed");
            }
            println!("{}", probe.value);
        }
        Command::Inspect { name } => {
            let snapshot = controller.inspect(&controller.pod_ref(&name)).await?;
            let json = match snapshot {
                WorkloadSnapshot::Pod(pod) => serde_json::to_string_pretty(&pod)?,
                WorkloadSnapshot::Job(job) => serde_json::to_string_pretty(&job)?,
            };
            println!("{}", json);
        }
        Command::Ip { name } => {
            let address = controller.inspect_address(&controller.pod_ref(&name)).await?;
            println!("{}", address);
        }
        Command::Delete { name } => {
            controller.delete(&controller.pod_ref(&name)).await?;
        }
    }

    Ok(())
}
