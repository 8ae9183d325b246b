//! Shared utilities for integration and load testing.

use std::time::Duration;

use gateway_sdk::GatewayClient;
use quota_gateway::config::GatewayConfig;
use quota_gateway::http::AppState;
use quota_gateway::{GatewayServer, Shutdown};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A gateway running on an ephemeral port. Stops when dropped.
pub struct TestGateway {
    pub base_url: String,
    pub state: AppState,
    config_tx: mpsc::UnboundedSender<GatewayConfig>,
    shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestGateway {
    /// Client presenting the loopback address.
    pub fn client(&self) -> GatewayClient {
        GatewayClient::new(&self.base_url)
    }

    /// Client presenting `ip` through `X-Forwarded-For`.
    pub fn client_from(&self, ip: &str) -> GatewayClient {
        GatewayClient::new(&self.base_url).as_client(ip)
    }

    /// Push a reloaded config and wait until the quota policy reflects it.
    pub async fn reload(&self, config: GatewayConfig) {
        let expected = config.quota.clone();
        self.config_tx.send(config).unwrap();
        for _ in 0..100 {
            if **self.state.quota_policy.load() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("quota policy was not reloaded");
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config used by most tests: client addresses come from `X-Forwarded-For`.
#[allow(dead_code)]
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.security.trust_forwarded_for = true;
    config
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = GatewayServer::new(config);
    let state = server.state().clone();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (config_tx, config_updates) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestGateway {
        base_url: format!("http://{addr}"),
        state,
        config_tx,
        shutdown,
    }
}
