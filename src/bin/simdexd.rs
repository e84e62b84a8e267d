//! simdexd: the similarity service daemon.

use simdex::server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    start_server(config).await
}
