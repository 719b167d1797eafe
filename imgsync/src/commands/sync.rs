use crate::context::AppContext;
use crate::format::{OutputFormat, format_output};
use anyhow::anyhow;
use libimgsync::ImageSync;

/// Runs one sync and prints the report.
///
/// A non-empty `bearer` also uploads the report, the same as a request to
/// the HTTP endpoint would.
pub async fn handle_sync(
    ctx: &AppContext,
    bearer: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let sync = ImageSync::builder().config(ctx.config.clone()).build()?;
    let report = sync.run(bearer).await?;

    let output = format_output(&report, format).map_err(|e| anyhow!(e))?;
    println!("{}", output);
    Ok(())
}
