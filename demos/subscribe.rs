//! Submit a job and wait for its result, printing queue updates.
//!
//! ```text
//! SUNRA_KEY=... cargo run --example subscribe -- "a watercolor fox"
//! ```

use serde_json::json;
use sunra_client::{AsyncClient, Status, SubscribeOptions};
use tracing_subscriber::EnvFilter;

const APPLICATION: &str = "black-forest-labs/flux-kontext-pro/text-to-image";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "a cat wearing a space helmet".to_string());

    let client = AsyncClient::new();
    let options = SubscribeOptions::new()
        .on_enqueue(|id| println!("enqueued: {}", id))
        .on_queue_update(|status| match status {
            Status::Queued { position } => println!("queued at position {}", position),
            Status::InProgress { logs } => {
                println!("running{}", logs.as_deref().map(|l| format!(": {}", l)).unwrap_or_default())
            }
            Status::Completed { success, .. } => println!("completed (success: {})", success),
        })
        .on_error(|e| eprintln!("request failed: {}", e));

    if let Some(result) = client
        .subscribe(APPLICATION, json!({"prompt": prompt}), options)
        .await?
    {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}
