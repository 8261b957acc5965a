// src/bin/limiter_cli.rs

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio::time;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gatekeeper::{policies, MemoryLogStore, RateLimitConfig, RateLimiter, Strategy};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "limiter_cli",
    about = "A CLI for exercising the admission-control strategies"
)]
struct Opt {
    /// Admission strategy to use
    #[structopt(short, long, possible_values = &["sliding_window", "fixed_window", "token_bucket", "leaky_bucket"], default_value = "sliding_window")]
    strategy: String,

    /// Named policy from the registry (overrides max-requests/window)
    #[structopt(short, long)]
    policy: Option<String>,

    /// Identifier to rate limit
    #[structopt(short, long, default_value = "default_user")]
    key: String,

    /// Maximum number of requests allowed
    #[structopt(short, long, default_value = "10")]
    max_requests: u64,

    /// Window duration in seconds
    #[structopt(short, long, default_value = "60")]
    window_seconds: u64,

    /// Simulation mode
    #[structopt(long, possible_values = &["burst", "steady", "sine_wave", "interactive"], default_value = "burst")]
    simulation: String,

    /// Number of requests to simulate
    #[structopt(short = "n", long, default_value = "20")]
    num_requests: usize,

    /// Time between requests in milliseconds (steady and sine_wave modes)
    #[structopt(short = "t", long, default_value = "100")]
    request_interval_ms: u64,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Disable logs
    #[structopt(long)]
    disable_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let log_level = if opt.disable_logs {
        "error"
    } else {
        match opt.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!(
            "limiter_cli={},gatekeeper={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    // Fail fast on unknown strategy names, no silent default
    let strategy = Strategy::from_str(&opt.strategy)?;

    let config = match &opt.policy {
        Some(name) => policies::by_name(name).ok_or_else(|| {
            format!(
                "Unknown policy: {} (known: {})",
                name,
                policies::NAMES.join(", ")
            )
        })?,
        None => RateLimitConfig::new(Duration::from_secs(opt.window_seconds), opt.max_requests)?,
    };

    if !opt.disable_logs {
        info!(
            strategy = %strategy,
            max_requests = config.max_requests,
            window = ?config.window,
            "Starting limiter CLI"
        );
    }

    let limiter = RateLimiter::new(MemoryLogStore::new());
    limiter.start();

    let result = match opt.simulation.as_str() {
        "burst" => simulate_burst(&opt, &limiter, &config, strategy).await,
        "steady" => simulate_steady(&opt, &limiter, &config, strategy, false).await,
        "sine_wave" => simulate_steady(&opt, &limiter, &config, strategy, true).await,
        "interactive" => simulate_interactive(&opt, &limiter, &config, strategy).await,
        other => Err(format!("Unknown simulation mode: {}", other).into()),
    };

    limiter.stop();
    result
}

// Fire all requests back to back
async fn simulate_burst(
    opt: &Opt,
    limiter: &RateLimiter<MemoryLogStore>,
    config: &RateLimitConfig,
    strategy: Strategy,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut allowed_count = 0;
    let mut denied_count = 0;
    let start_time = Instant::now();

    for i in 0..opt.num_requests {
        let decision = limiter.check_limit(&opt.key, config, strategy).await?;

        if decision.allowed {
            allowed_count += 1;
            if !opt.disable_logs {
                info!(
                    "Request {}: ALLOWED (remaining: {})",
                    i + 1,
                    decision.remaining
                );
            }
        } else {
            denied_count += 1;
            if !opt.disable_logs {
                warn!(
                    "Request {}: DENIED (retry after: {}s)",
                    i + 1,
                    decision.retry_after.unwrap_or(0)
                );
            }
        }
    }

    print_summary("Burst", opt.num_requests, allowed_count, denied_count, start_time.elapsed());
    Ok(())
}

// Paced requests, optionally with a sine-wave interval to vary the load
async fn simulate_steady(
    opt: &Opt,
    limiter: &RateLimiter<MemoryLogStore>,
    config: &RateLimitConfig,
    strategy: Strategy,
    sine_wave: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut allowed_count = 0;
    let mut denied_count = 0;
    let base_interval = Duration::from_millis(opt.request_interval_ms);
    let start_time = Instant::now();

    for i in 0..opt.num_requests {
        let request_time = Instant::now();

        let decision = limiter.check_limit(&opt.key, config, strategy).await?;
        if decision.allowed {
            allowed_count += 1;
            if !opt.disable_logs {
                info!(
                    "Request {}: ALLOWED (remaining: {})",
                    i + 1,
                    decision.remaining
                );
            }
        } else {
            denied_count += 1;
            if !opt.disable_logs {
                warn!(
                    "Request {}: DENIED (retry after: {}s)",
                    i + 1,
                    decision.retry_after.unwrap_or(0)
                );
            }
        }

        let this_interval = if sine_wave {
            // One full cycle over the run, interval varying 0.5x..1.5x
            let phase = (i as f64 * std::f64::consts::PI * 2.0) / (opt.num_requests as f64);
            let factor = 1.0 + 0.5 * phase.sin();
            base_interval.mul_f64(factor)
        } else {
            base_interval
        };

        let elapsed = request_time.elapsed();
        if elapsed < this_interval {
            time::sleep(this_interval - elapsed).await;
        }
    }

    let name = if sine_wave { "Sine Wave" } else { "Steady" };
    print_summary(name, opt.num_requests, allowed_count, denied_count, start_time.elapsed());
    Ok(())
}

// Interactive mode: Enter fires a request, Ctrl-C or "quit" exits
async fn simulate_interactive(
    opt: &Opt,
    limiter: &RateLimiter<MemoryLogStore>,
    config: &RateLimitConfig,
    strategy: Strategy,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\nInteractive Mode");
    println!("----------------");
    println!("Press Enter to make a request, type 'quit' or hit Ctrl-C to exit");

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_handler.store(false, Ordering::SeqCst);
    })?;

    let mut allowed_count = 0;
    let mut denied_count = 0;
    let start_time = Instant::now();
    let mut input_buffer = String::new();

    while running.load(Ordering::SeqCst) {
        input_buffer.clear();
        if std::io::stdin().read_line(&mut input_buffer)? == 0 {
            break; // EOF
        }

        let trimmed = input_buffer.trim();
        if trimmed == "quit" || trimmed == "exit" || trimmed == "q" {
            break;
        }

        let decision = limiter.check_limit(&opt.key, config, strategy).await?;
        if decision.allowed {
            allowed_count += 1;
            println!("ALLOWED (remaining: {})", decision.remaining);
        } else {
            denied_count += 1;
            println!(
                "DENIED (retry after: {}s, resets at {})",
                decision.retry_after.unwrap_or(0),
                decision.reset_time.to_rfc3339()
            );
        }
    }

    print_summary(
        "Interactive",
        allowed_count + denied_count,
        allowed_count,
        denied_count,
        start_time.elapsed(),
    );
    Ok(())
}

fn print_summary(name: &str, total: usize, allowed: usize, denied: usize, elapsed: Duration) {
    println!("\n{} Simulation Results:", name);
    println!("-------------------------");
    println!("Total requests: {}", total);
    println!("Allowed: {}", allowed);
    println!("Denied: {}", denied);
    println!("Time elapsed: {:?}", elapsed);
}
