use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    human_panic::setup_panic!();
    motif::app::run().await
}
