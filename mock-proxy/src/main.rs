use mock_proxy::MockConfig;
use std::net::SocketAddr;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("mock_proxy=debug,tower_http=debug")
        .init();

    let addr: SocketAddr = "127.0.0.1:8080".parse()?;
    println!("Mock proxy listening on {addr}");
    mock_proxy::run(addr, MockConfig::default()).await?;

    Ok(())
}
