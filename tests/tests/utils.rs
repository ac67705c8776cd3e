use std::sync::OnceLock;
use std::time::Duration;
use tachyon_check_core::HarnessConfig;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
            std::process::exit(1);
        }));

        FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_env_filter("tachyon_check=debug,mock_proxy=debug")
            .init();
    });
}

/// Harness config aimed at a local stub, with short pauses
#[allow(unused)]
pub fn local_config(port: u16) -> HarnessConfig {
    HarnessConfig::default()
        .with_proxy("127.0.0.1", port)
        .with_scenario_pause(Duration::from_millis(100))
}

#[allow(unused)]
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    listener
        .local_addr()
        .expect("listener address")
        .port()
}
