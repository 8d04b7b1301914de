//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use edge_adapter::config::AdapterConfig;
use edge_adapter::handler::{default_registry, HandlerGroup, HandlerRegistry};
use edge_adapter::http::{Dispatcher, EnvSnapshot, HttpServer};
use edge_adapter::lifecycle::Shutdown;
use edge_adapter::net::Listener;
use edge_adapter::routing::RouteTable;
use tokio::net::TcpListener;

/// A running adapter on an ephemeral port.
pub struct TestAdapter {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestAdapter {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestAdapter {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the adapter with the default routes and built-in groups.
pub async fn start_default() -> TestAdapter {
    start_adapter(AdapterConfig::default(), default_registry()).await
}

/// Start the adapter with the given config and handler groups.
pub async fn start_adapter(config: AdapterConfig, groups: HandlerRegistry) -> TestAdapter {
    let routes = RouteTable::from_config(&config.routes, &groups).unwrap();
    let env = EnvSnapshot::from_vars(
        vec![
            ("APP_MODE".to_string(), "test".to_string()),
            ("TENCENTCLOUD_UIN".to_string(), "secret".to_string()),
        ],
        &config.env.excluded,
    );
    let dispatcher = Dispatcher::new(&config, routes, env);

    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener = Listener::from_tcp(tcp, config.listener.max_connections);
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(dispatcher, config.relay.channel_capacity);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestAdapter { addr, shutdown }
}

/// Registry with a single named group.
pub fn registry_with(name: &str, group: Arc<dyn HandlerGroup>) -> HandlerRegistry {
    let mut groups: HandlerRegistry = HashMap::new();
    groups.insert(name.to_string(), group);
    groups
}
