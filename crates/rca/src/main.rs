//! AI-assisted root cause analysis for failing Kubernetes workloads.
//!
//! Collects pod status, events, logs, Prometheus metrics and JFR
//! profiling data into one diagnostic context, then drives a three-stage
//! reasoning pipeline (detect, analyze, validate) to produce a structured
//! report. Runs one-shot from the CLI or as a long-lived service with an
//! on-demand REST endpoint and a scheduled fleet scanner.

mod ai;
mod collector;
mod config;
mod cryostat;
mod error;
mod k8s;
mod metrics;
mod pipeline;
mod prometheus;
mod report;
mod scanner;
mod server;
#[cfg(test)]
mod testutil;
mod token;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::ai::client::LlmClient;
use crate::ai::{LlmAnomalyDetector, LlmReportValidator, LlmRootCauseAnalyst};
use crate::collector::DataCollector;
use crate::config::RcaConfig;
use crate::cryostat::CryostatClient;
use crate::k8s::{ClusterInfo, KubeClusterInfo};
use crate::metrics::MetricSummarizer;
use crate::pipeline::RcaPipeline;
use crate::prometheus::PrometheusClient;
use crate::scanner::WorkloadScanner;
use crate::server::AppState;
use crate::token::TokenProvider;

/// Root cause analysis agent for Kubernetes workloads
#[derive(Parser)]
#[command(name = "rca")]
#[command(about = "AI-assisted root cause analysis for failing Kubernetes workloads")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single pod and print the report
    Analyze {
        /// Kubernetes namespace of the pod
        #[arg(long, default_value = "default")]
        namespace: String,

        /// Name of the pod to analyze
        #[arg(long)]
        pod: String,

        /// Print the report as JSON instead of the rendered box
        #[arg(long)]
        json: bool,
    },
    /// Run one scan pass over labeled workloads
    Scan,
    /// Run the REST API and the scheduled workload scanner
    Serve {
        /// Bind address for the HTTP server
        #[arg(long, env = "RCA_BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind: String,
    },
}

/// Wired-up service components shared by all commands.
struct Runtime {
    cluster: Arc<dyn ClusterInfo>,
    prometheus: Arc<PrometheusClient>,
    pipeline: Arc<RcaPipeline>,
}

async fn build_runtime(config: &RcaConfig) -> Result<Runtime> {
    let kube_client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let cluster: Arc<dyn ClusterInfo> = Arc::new(KubeClusterInfo::new(kube_client));

    let token = Arc::new(TokenProvider::new());
    let prometheus = Arc::new(PrometheusClient::new(config.prometheus.clone(), token.clone())?);
    let cryostat = Arc::new(CryostatClient::new(config.cryostat.clone(), token)?);
    let llm = Arc::new(LlmClient::new(config.llm.clone())?);

    let summarizer = MetricSummarizer::new(cluster.clone(), prometheus.clone());
    let collector = DataCollector::new(
        cluster.clone(),
        summarizer,
        cryostat,
        config.cryostat.enabled,
        config.log_tail_lines,
    );

    let pipeline = Arc::new(RcaPipeline::new(
        collector,
        Arc::new(LlmAnomalyDetector::new(llm.clone(), config.detector_model.clone())),
        Arc::new(LlmRootCauseAnalyst::new(llm.clone(), config.analyst_model.clone())),
        Arc::new(LlmReportValidator::new(llm, config.validator_model.clone())),
    ));

    Ok(Runtime {
        cluster,
        prometheus,
        pipeline,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "rca=debug" } else { "rca=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    let config = RcaConfig::default();
    let runtime = build_runtime(&config).await?;

    match cli.command {
        Commands::Analyze {
            namespace,
            pod,
            json,
        } => {
            let report = runtime
                .pipeline
                .run_analysis(&namespace, &pod)
                .await
                .with_context(|| format!("Analysis failed for {namespace}/{pod}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report::render(&report));
            }
        }
        Commands::Scan => {
            let scanner =
                WorkloadScanner::new(runtime.cluster, runtime.pipeline, &config.scan_label);
            let summary = scanner.scan().await.context("Workload scan failed")?;
            println!(
                "Scanned {} pods: {} analyzed, {} failed",
                summary.pods_found, summary.analyzed, summary.failed
            );
        }
        Commands::Serve { bind } => {
            let scanner = Arc::new(WorkloadScanner::new(
                runtime.cluster,
                runtime.pipeline.clone(),
                &config.scan_label,
            ));
            let state = Arc::new(AppState {
                pipeline: runtime.pipeline,
                prometheus: runtime.prometheus,
            });
            server::serve(state, scanner, &bind, config.scan_interval_secs).await?;
        }
    }

    Ok(())
}
