use collections_httpd::application::ServerData;
use collections_httpd::infrastructure::server_impl::server::Server;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const HOST: &str = "127.0.0.1";
const PORT: u16 = 7777;
const MOVIE_DB: &str = "film.csv";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collections_httpd=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let listener = match TcpListener::bind((HOST, PORT)).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("could not bind {HOST}:{PORT}: {err}");
            std::process::exit(1);
        }
    };
    info!("listening on {HOST}:{PORT}");

    let server = Server::new(ServerData::new(HOST, PORT, MOVIE_DB));
    if let Err(err) = server.run(listener).await {
        error!("server stopped: {err:#}");
        std::process::exit(1);
    }
}
