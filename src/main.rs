use api::App;
use core::{convert::Infallible, pin::pin, time::Duration};
use db::{Config, Database, NoTls};
use hyper::{server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use tokio::{net::TcpListener, runtime::Runtime, task::JoinSet};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parse environment variables
    let port: u16 = env::var("PORT")?.parse()?;
    let user = env::var("PG_USERNAME")?;
    let pass = env::var("PG_PASSWORD")?;
    let host = env::var("PG_HOSTNAME")?;
    let data = env::var("PG_DATABASE")?;
    let pg_port = match env::var("PG_PORT") {
        Ok(pg_port) => pg_port.parse()?,
        _ => 5432,
    };
    let uploads = env::var("UPLOAD_DIR").map_or_else(|_| PathBuf::from("files"), PathBuf::from);

    let mut config = Config::new();
    config.user(&user).password(&pass).host(&host).dbname(&data).port(pg_port);

    let runtime = Runtime::new()?;
    runtime.block_on(serve(port, config, uploads))
}

async fn serve(port: u16, config: Config, uploads: PathBuf) -> anyhow::Result<()> {
    // Connect to the database
    let (client, conn) = config.connect(NoTls).await?;
    let conn = tokio::spawn(async move {
        if let Err(err) = conn.await {
            log::error!("database connection closed: {err}");
        }
    });

    tokio::fs::create_dir_all(&uploads).await?;
    log::info!("storing uploads in {}", uploads.display());
    let app = Arc::new(App::new(Database::from(client), uploads));

    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, port).into();
    let listener = TcpListener::bind(addr).await?;
    log::info!("listening on {addr}");

    let mut stop = pin!(tokio::signal::ctrl_c());
    let mut connections = JoinSet::new();
    loop {
        let (stream, peer) = tokio::select! {
            biased;
            signal = &mut stop => {
                signal?;
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    log::warn!("cannot accept connection: {err}");
                    continue;
                }
            },
        };

        let outer = app.clone();
        let service = service_fn(move |req| {
            let inner = outer.clone();
            async move { Ok::<_, Infallible>(inner.try_respond(req).await) }
        });
        connections.spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                log::debug!("connection with {peer} ended: {err}");
            }
        });
    }

    // Let in-flight requests finish before closing the database
    log::info!("shutting down with {} open connections", connections.len());
    drop(listener);
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async { while connections.join_next().await.is_some() {} }).await;
    if drained.is_err() {
        log::warn!("dropping connections still open after {DRAIN_TIMEOUT:?}");
        connections.shutdown().await;
    }

    drop(app);
    conn.await?;
    Ok(())
}
