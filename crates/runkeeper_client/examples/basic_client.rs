use runkeeper_client::{RunkeeperClient, config::Config, http_client::ReqwestRunkeeperClient};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example: expects RUNKEEPER_EMAIL and RUNKEEPER_PASSWORD in env
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {}", e);
            return Ok(());
        }
    };
    let client = ReqwestRunkeeperClient::from_config(&cfg).await?;
    let profile = client.profile_username().await?;
    println!("Logged in as {} (profile {})", client.email(), profile);
    Ok(())
}
