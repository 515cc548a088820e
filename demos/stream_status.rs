//! Submit a job with a local image and follow the status stream.
//!
//! ```text
//! SUNRA_KEY=... cargo run --example stream_status -- ./photo.png
//! ```

use futures::StreamExt;
use serde_json::json;
use sunra_client::{ClientBuilder, Input, StreamOptions};
use tracing_subscriber::EnvFilter;

const APPLICATION: &str = "sunra/upscaler";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let image = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: stream_status <image-path>"))?;

    let client = ClientBuilder::new().build();
    let arguments = Input::map([
        ("image", Input::path(image)),
        ("scale", Input::from(json!(2))),
    ]);

    let mut events = client
        .stream(APPLICATION, arguments, StreamOptions::new())
        .await?;
    while let Some(event) = events.next().await {
        println!("{}", event?);
    }

    Ok(())
}
