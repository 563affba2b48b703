use runkeeper_client::{RunkeeperClient, config::Config, http_client::ReqwestRunkeeperClient};

fn init_logging() {
    // `RUNKEEPER_LOG_LEVEL` wins over `RUST_LOG`; default `info`.
    let log_env = std::env::var("RUNKEEPER_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&log_env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cfg = Config::from_env()?;
    let month = std::env::var("RUNKEEPER_MONTH").unwrap_or_else(|_| "Jan".to_string());
    let year = std::env::var("RUNKEEPER_YEAR").ok();

    let client = ReqwestRunkeeperClient::from_config(&cfg).await?;
    let mut activities = client
        .get_activities_month(&month, year.as_deref())
        .await
        .map_err(|e| format!("failed to fetch activities: {}", e))?;

    println!("{} activities in {}:", activities.len(), month);
    for a in activities.iter_mut() {
        let id = a.activity_id().unwrap_or("?").to_string();
        let kind = a.activity_type().unwrap_or("activity").to_string();
        let distance = format!(
            "{} {}",
            a.distance().unwrap_or("-"),
            a.distance_units().unwrap_or("")
        );
        match a.details(&client).await {
            Ok(d) => {
                let show = |v: &Option<serde_json::Value>| {
                    v.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".into())
                };
                println!(
                    "- {} {} {} | {} | pace {} | speed {} | elevation {} | calories {}",
                    d.datetime,
                    kind,
                    id,
                    distance.trim(),
                    show(&d.stats.pace),
                    show(&d.stats.speed),
                    show(&d.stats.elevation),
                    show(&d.stats.calories),
                );
            }
            Err(e) => println!("- {} {} | {} | details unavailable: {}", kind, id, distance.trim(), e),
        }
    }

    Ok(())
}
