use dotenv::dotenv;
use gatekeeper::{init_logging, policies, MemoryLogStore, RateLimiter, Strategy};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> gatekeeper::Result<()> {
    dotenv().ok();
    init_logging();
    info!("Admission control engine starting up");

    let limiter = RateLimiter::new(MemoryLogStore::new());
    limiter.start();

    // Walk the login policy through a short burst to show the decision shape
    let config = policies::login_attempts();
    for attempt in 1..=7 {
        let decision = limiter
            .check_limit("203.0.113.7", &config, Strategy::SlidingWindow)
            .await?;

        if decision.allowed {
            info!(attempt, remaining = decision.remaining, "attempt admitted");
        } else {
            warn!(
                attempt,
                retry_after = decision.retry_after,
                "attempt denied"
            );
            let mut headers: Vec<_> = limiter
                .get_rate_limit_headers(&decision, &config)
                .into_iter()
                .collect();
            headers.sort();
            for (name, value) in headers {
                println!("{}: {}", name, value);
            }
        }
    }

    limiter.stop();
    info!("Shut down cleanly");
    Ok(())
}
