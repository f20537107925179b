mod host;
mod simulator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
