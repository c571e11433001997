//! Pipeline worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use laddr_queue::{JobQueue, Stream};
use laddr_worker::{JobExecutor, WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("laddr=info".parse().unwrap())
        .add_directive("aws_config=warn".parse().unwrap())
        .add_directive("aws_smithy_runtime=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting laddr-worker");

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid worker configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Worker config: {:?}", config);

    let ctx = match WorkerContext::new(config.clone()).await {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            error!("Failed to build worker context: {}", e);
            std::process::exit(1);
        }
    };

    let mut executors = Vec::new();
    if config.role.consumes_pipeline() {
        executors.push(build_executor(&config, Stream::Pipeline));
    }
    if config.role.consumes_transcode() {
        executors.push(build_executor(&config, Stream::Transcode));
    }

    let mut handles = Vec::with_capacity(executors.len());
    for executor in &executors {
        let executor = Arc::clone(executor);
        let ctx = Arc::clone(&ctx);
        handles.push(tokio::spawn(async move { executor.run(ctx).await }));
    }

    // Signal all executors on ctrl-c.
    let shutdown_targets: Vec<Arc<JobExecutor>> = executors.iter().map(Arc::clone).collect();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        for executor in &shutdown_targets {
            executor.shutdown();
        }
    });

    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Executor error: {}", e);
                std::process::exit(1);
            }
            Err(e) => {
                error!("Executor task panicked: {}", e);
                std::process::exit(1);
            }
        }
    }

    info!("Worker shutdown complete");
}

fn build_executor(config: &WorkerConfig, stream: Stream) -> Arc<JobExecutor> {
    let queue = match JobQueue::from_env(stream) {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create job queue for {}: {}", stream.name(), e);
            std::process::exit(1);
        }
    };
    Arc::new(JobExecutor::new(config.clone(), queue))
}
