//! Runs one image sync and prints a summary of the report.
//!
//! Reads `FALCON_CLIENT_ID`, `FALCON_CLIENT_SECRET` and optionally
//! `FALCON_CLOUD` from the environment.
//!
//! Run with: cargo run --example basic_usage

use libimgsync::{Config, ImageSync};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env(None)?;
    println!("Syncing images for {}\n", config.falcon.cloud);

    let sync = ImageSync::builder().config(config).build()?;
    let report = sync.run(None).await?;

    for image in &report.images {
        println!("{}", image.name);
        println!("  repository: {}", image.repository);
        println!("  latest:     {} {}", image.latest, image.digest);
        println!("  tags:       {}", image.tags.len());
    }

    println!(
        "\n{} images, {} tags in {} ms",
        report.images.len(),
        report.tag_count(),
        report.duration
    );
    Ok(())
}
