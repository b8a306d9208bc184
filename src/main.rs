use anyhow::{Context, Result};
use tokio::net::TcpListener;

use yelp_dashboard::config::Config;
use yelp_dashboard::gateway;
use yelp_dashboard::logging::{self, obj, v_str, Domain};
use yelp_dashboard::server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let gateway = gateway::from_config(&cfg);

    logging::info(
        Domain::System,
        "startup",
        obj(&[
            ("backend", v_str(cfg.backend.as_str())),
            ("db_host", v_str(&cfg.db.host)),
            ("db_name", v_str(&cfg.db.name)),
            ("addr", v_str(&cfg.bind_addr)),
        ]),
    );

    let listener = TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;
    server::serve(listener, gateway.as_ref()).await
}
