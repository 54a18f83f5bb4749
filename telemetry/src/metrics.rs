use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Installs the global Prometheus recorder with an HTTP listener on `[::]:{port}/metrics`.
///
/// Every metric carries the `app` label so that several migrators can share a scrape target.
/// Must be called from within a Tokio runtime because the listener runs as a task.
pub fn init_metrics(app_name: &str, port: u16) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port))
        .add_global_label("app", app_name)
        .install()
}
