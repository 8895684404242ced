use anyhow::Result;
use snmp_counters::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let explicit_ports = app_config.explicit_ports()?;
    let oids = app_config.oids();

    // One walker (session) for the process lifetime, shared by resolver and poller.
    let walker: Arc<dyn snmp_repo::TableWalker> =
        Arc::new(snmp_repo::NetSnmpWalker::new(&app_config.device));

    let resolve_columns = port_table::ResolveColumns {
        index_oid: app_config.polling.index_oid.clone(),
        name_oid: app_config.polling.name_oid.clone(),
    };
    let table = {
        let walker = walker.clone();
        tokio::task::spawn_blocking(move || {
            port_table::resolve(walker.as_ref(), explicit_ports, &resolve_columns)
        })
        .await?
    };
    let table = Arc::new(table);
    tracing::info!(
        device = %app_config.device.address,
        ports = table.len(),
        "port table resolved"
    );

    let store = Arc::new(store::CounterStore::new(
        table.clone(),
        app_config.sampling_interval(),
    ));
    let fetcher =
        fetcher::CounterFetcher::new(walker, table, oids, app_config.fetch_timeout());
    let poller = poller::Poller::start(store.clone(), fetcher);

    let app = routes::app(store);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let served = tokio::select! {
        result = axum::serve(listener, app) => result,
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            Ok(())
        }
    };

    poller.cleanup().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
