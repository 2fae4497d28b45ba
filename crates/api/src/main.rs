use std::net::SocketAddr;

use strym_api::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    strym_observability::init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr.clone();

    let app = strym_api::build_app(config).await?;
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!(%bind_addr, "strym listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
