// src/bin/limiter_bench.rs

use indicatif::{ProgressBar, ProgressStyle};
use prettytable::{row, Table};
use rand::Rng;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio::sync::{Barrier, Semaphore};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gatekeeper::{
    MemoryLogStore, RateLimitConfig, RateLimiter, RedisConfig, RedisLogStore, RequestLogStore,
    Strategy,
};

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "limiter_bench",
    about = "A benchmarking tool for the admission-control strategies"
)]
struct Opt {
    /// Strategy to benchmark
    #[structopt(short, long, possible_values = &["sliding_window", "fixed_window", "token_bucket", "leaky_bucket", "all"], default_value = "all")]
    strategy: String,

    /// Request log store backing the sliding window
    #[structopt(long, possible_values = &["memory", "redis"], default_value = "memory")]
    store: String,

    /// Redis URL (when using the Redis store)
    #[structopt(long, default_value = "redis://localhost:6379")]
    redis_url: String,

    /// Maximum number of requests allowed
    #[structopt(short, long, default_value = "1000")]
    max_requests: u64,

    /// Window duration in seconds
    #[structopt(short, long, default_value = "60")]
    window_seconds: u64,

    /// Number of concurrent users to simulate
    #[structopt(short = "u", long, default_value = "10")]
    num_users: usize,

    /// Number of requests per user
    #[structopt(short = "r", long, default_value = "100")]
    requests_per_user: usize,

    /// Number of iterations to run
    #[structopt(short, long, default_value = "3")]
    iterations: usize,

    /// Maximum concurrency level
    #[structopt(short = "c", long, default_value = "100")]
    concurrency: usize,

    /// Disable logs
    #[structopt(long)]
    disable_logs: bool,
}

#[derive(Debug, Clone, Copy)]
struct BenchResult {
    allowed: usize,
    denied: usize,
    avg_duration: Duration,
    throughput: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let log_level = if opt.disable_logs { "error" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!(
            "limiter_bench={},gatekeeper={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let strategies: Vec<Strategy> = if opt.strategy == "all" {
        vec![
            Strategy::SlidingWindow,
            Strategy::FixedWindow,
            Strategy::TokenBucket,
            Strategy::LeakyBucket,
        ]
    } else {
        vec![Strategy::from_str(&opt.strategy)?]
    };

    let config = RateLimitConfig::new(Duration::from_secs(opt.window_seconds), opt.max_requests)?;

    let mut table = Table::new();
    table.add_row(row![
        "Strategy",
        "Allowed",
        "Denied",
        "Avg Duration",
        "Throughput (req/s)"
    ]);

    for strategy in strategies {
        let result = match opt.store.as_str() {
            "memory" => {
                let limiter = Arc::new(RateLimiter::new(MemoryLogStore::new()));
                run_benchmark(limiter, strategy, &config, &opt).await?
            }
            "redis" => {
                let store = RedisLogStore::connect(RedisConfig {
                    url: opt.redis_url.clone(),
                    namespace: "bench".to_string(),
                    connection_timeout: Duration::from_secs(2),
                })
                .await?;
                store.ping().await?;
                let limiter = Arc::new(RateLimiter::new(store));
                run_benchmark(limiter, strategy, &config, &opt).await?
            }
            other => {
                return Err(format!("Unknown store backend: {}", other).into());
            }
        };

        table.add_row(row![
            strategy.to_string(),
            result.allowed,
            result.denied,
            format!("{:?}", result.avg_duration),
            format!("{:.2}", result.throughput)
        ]);
    }

    println!();
    table.printstd();
    Ok(())
}

async fn run_benchmark<S>(
    limiter: Arc<RateLimiter<S>>,
    strategy: Strategy,
    config: &RateLimitConfig,
    opt: &Opt,
) -> Result<BenchResult, Box<dyn std::error::Error>>
where
    S: RequestLogStore + 'static,
{
    if !opt.disable_logs {
        info!(strategy = %strategy, users = opt.num_users, "Starting benchmark");
    }

    let total_per_iteration = opt.num_users * opt.requests_per_user;
    let mut total_duration = Duration::from_secs(0);
    let mut total_allowed = 0usize;
    let mut total_denied = 0usize;

    for iteration in 0..opt.iterations {
        // Fresh identifiers per iteration so state never carries over
        let run_tag: u32 = rand::rng().random_range(0..u32::MAX);

        let progress = ProgressBar::new(total_per_iteration as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                .expect("valid progress template"),
        );
        progress.set_message(format!("{} iter {}", strategy, iteration + 1));

        let start_time = Instant::now();
        let barrier = Arc::new(Barrier::new(opt.num_users));
        let semaphore = Arc::new(Semaphore::new(opt.concurrency));
        let mut handles = Vec::with_capacity(opt.num_users);

        for user_id in 0..opt.num_users {
            let limiter = Arc::clone(&limiter);
            let barrier = Arc::clone(&barrier);
            let semaphore = Arc::clone(&semaphore);
            let progress = progress.clone();
            let config = config.clone();
            let identifier = format!("bench_{}_{}", run_tag, user_id);
            let requests_per_user = opt.requests_per_user;
            let disable_logs = opt.disable_logs;

            handles.push(tokio::spawn(async move {
                barrier.wait().await;

                let mut allowed = 0usize;
                let mut denied = 0usize;

                for _ in 0..requests_per_user {
                    let _permit = semaphore.acquire().await.expect("semaphore open");

                    match limiter.check_limit(&identifier, &config, strategy).await {
                        Ok(decision) => {
                            if decision.allowed {
                                allowed += 1;
                            } else {
                                denied += 1;
                            }
                        }
                        Err(e) => {
                            if !disable_logs {
                                warn!("Error in rate limiting: {}", e);
                            }
                        }
                    }
                    progress.inc(1);
                }

                (allowed, denied)
            }));
        }

        let results = futures::future::join_all(handles).await;
        progress.finish_and_clear();

        let mut iteration_allowed = 0usize;
        let mut iteration_denied = 0usize;
        for result in results {
            if let Ok((allowed, denied)) = result {
                iteration_allowed += allowed;
                iteration_denied += denied;
            }
        }

        let elapsed = start_time.elapsed();
        total_duration += elapsed;
        total_allowed += iteration_allowed;
        total_denied += iteration_denied;

        println!(
            "Iteration {}: {:?}, {} allowed, {} denied, {:.2} req/sec",
            iteration + 1,
            elapsed,
            iteration_allowed,
            iteration_denied,
            (iteration_allowed + iteration_denied) as f64 / elapsed.as_secs_f64()
        );
    }

    let total_requests = total_allowed + total_denied;
    Ok(BenchResult {
        allowed: total_allowed,
        denied: total_denied,
        avg_duration: total_duration / opt.iterations.max(1) as u32,
        throughput: total_requests as f64 / total_duration.as_secs_f64(),
    })
}
