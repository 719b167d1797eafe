use crate::context::AppContext;
use crate::server;
use libimgsync::ImageSync;

/// Starts the HTTP endpoint.
pub async fn handle_serve(ctx: &AppContext) -> anyhow::Result<()> {
    let sync = ImageSync::builder().config(ctx.config.clone()).build()?;
    server::serve(sync).await
}
