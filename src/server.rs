//! TCP front end: one command per line in, one framed response out.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::executor::{Session, Store};
use crate::format::{ERROR, format_response};
use crate::persistence::JsonDirectory;

/// Written on its own line after every response.
pub const END_OF_TRANSMISSION: char = '\u{4}';

/// Longest command line accepted, in bytes.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Storage folder for databases; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8888".to_string(),
            data_dir: Some(PathBuf::from("databases")),
        }
    }
}

impl ServerConfig {
    pub fn build_store(&self) -> Result<Store> {
        match &self.data_dir {
            Some(dir) => {
                info!(data_dir = %dir.display(), "using json storage");
                Ok(Store::new(Box::new(JsonDirectory::open(dir)?)))
            }
            None => {
                info!("using in-memory storage");
                Ok(Store::in_memory())
            }
        }
    }
}

pub struct Server {
    listener: TcpListener,
    store: Arc<Mutex<Store>>,
}

impl Server {
    /// Opens the store described by `config` and binds the listener.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let store = config.build_store()?;
        let listener = TcpListener::bind(&config.listen_addr).await?;
        Ok(Self::with_store(listener, store))
    }

    pub fn with_store(listener: TcpListener, store: Store) -> Self {
        Self {
            listener,
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the listener fails.
    pub async fn serve(self) -> Result<()> {
        self.serve_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` completes. Connections already
    /// accepted keep running on their own tasks.
    pub async fn serve_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let listen_addr = self.local_addr()?;
        info!(%listen_addr, "listening");

        tokio::pin!(shutdown);
        loop {
            let (socket, remote) = tokio::select! {
                accepted = self.listener.accept() => accepted?,
                _ = &mut shutdown => {
                    info!("shutting down");
                    return Ok(());
                }
            };

            info!(%remote, "accepted connection");
            let store = self.store.clone();
            tokio::spawn(async move {
                match handle_connection(store, socket).await {
                    Ok(()) => info!(%remote, "client disconnected"),
                    Err(e) => error!(%remote, %e, "failed to handle connection"),
                }
            });
        }
    }
}

/// Serves one client until it closes the connection.
pub async fn handle_connection(store: Arc<Mutex<Store>>, socket: TcpStream) -> Result<()> {
    let mut framed = Framed::new(socket, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let mut session = Session::new();

    while let Some(line) = framed.next().await {
        let response = match line {
            Ok(line) => {
                // The lock and any save block, so keep them off the runtime workers
                let store = store.clone();
                let (returned, response) = tokio::task::spawn_blocking(move || {
                    let response = handle_line(&store, &mut session, &line);
                    (session, response)
                })
                .await
                .map_err(io::Error::other)?;
                session = returned;
                response
            }
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!("command line too long");
                format!("{ERROR}: command longer than {MAX_LINE_LENGTH} bytes")
            }
            Err(LinesCodecError::Io(e)) => return Err(e.into()),
        };
        framed
            .send(format!("{response}\n{END_OF_TRANSMISSION}"))
            .await
            .map_err(codec_error)?;
    }
    Ok(())
}

fn codec_error(e: LinesCodecError) -> io::Error {
    match e {
        LinesCodecError::Io(e) => e,
        other => io::Error::other(other),
    }
}

/// Runs one command line and formats its response.
///
/// Blocks on the store lock, which is held for the whole command. A panic
/// while executing is reported as a generic failure and does not take the
/// connection down.
pub fn handle_line(store: &Mutex<Store>, session: &mut Session, line: &str) -> String {
    debug!(line, "received command");
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut store = store.lock();
        session.run(&mut store, line)
    }));

    match outcome {
        Ok(outcome) => {
            if let Err(e) = &outcome {
                debug!(%e, "command failed");
            }
            format_response(&outcome)
        }
        Err(_) => {
            error!(line, "command panicked");
            format!("{ERROR}: Query Failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn request(framed: &mut Framed<TcpStream, LinesCodec>, line: &str) -> String {
        framed.send(line).await.unwrap();
        let mut lines = Vec::new();
        loop {
            let line = framed.next().await.unwrap().unwrap();
            if line == END_OF_TRANSMISSION.to_string() {
                break;
            }
            lines.push(line);
        }
        lines.join("\n")
    }

    #[test]
    fn test_handle_line() {
        let store = Mutex::new(Store::in_memory());
        let mut session = Session::new();
        assert_eq!(handle_line(&store, &mut session, "CREATE DATABASE d;"), "[OK]");
        assert_eq!(handle_line(&store, &mut session, "USE d;"), "[OK]");
        assert!(handle_line(&store, &mut session, "SELECT * FROM t;").starts_with("[ERROR]: "));
        assert!(handle_line(&store, &mut session, "SELEC * FROM t;").starts_with("[ERROR]: "));
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = Server::with_store(listener, Store::in_memory());
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.serve());

        let socket = TcpStream::connect(addr).await.unwrap();
        let mut client = Framed::new(socket, LinesCodec::new());

        assert_eq!(request(&mut client, "CREATE DATABASE school;").await, "[OK]");
        assert_eq!(request(&mut client, "use SCHOOL;").await, "[OK]");
        assert_eq!(
            request(&mut client, "CREATE TABLE people (name, age);").await,
            "[OK]"
        );
        assert_eq!(
            request(&mut client, "INSERT INTO people VALUES ('Alice', '30');").await,
            "[OK]"
        );
        assert_eq!(
            request(&mut client, "SELECT * FROM people WHERE age > 20;").await,
            "[OK]\nid\tname\tage\n1\tAlice\t30"
        );
        assert_eq!(
            request(&mut client, "SELECT * FROM nobody;").await,
            "[ERROR]: unknown table 'nobody'"
        );
        assert!(request(&mut client, "DELETE FROM people").await.starts_with("[ERROR]: "));

        // a second connection has no current database
        let socket = TcpStream::connect(addr).await.unwrap();
        let mut other = Framed::new(socket, LinesCodec::new());
        assert!(
            request(&mut other, "SELECT * FROM people;")
                .await
                .starts_with("[ERROR]: no database selected")
        );
        assert_eq!(request(&mut other, "USE school;").await, "[OK]");
        assert_eq!(
            request(&mut other, "SELECT name FROM people;").await,
            "[OK]\nname\nAlice"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_clients() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = Server::with_store(listener, Store::in_memory());
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.serve());

        let socket = TcpStream::connect(addr).await.unwrap();
        let mut admin = Framed::new(socket, LinesCodec::new());
        request(&mut admin, "CREATE DATABASE d;").await;
        request(&mut admin, "USE d;").await;
        request(&mut admin, "CREATE TABLE t (client);").await;

        let mut clients = Vec::new();
        for c in 0..4 {
            clients.push(tokio::spawn(async move {
                let socket = TcpStream::connect(addr).await.unwrap();
                let mut client = Framed::new(socket, LinesCodec::new());
                assert_eq!(request(&mut client, "USE d;").await, "[OK]");
                for _ in 0..5 {
                    let line = format!("INSERT INTO t VALUES ({c});");
                    assert_eq!(request(&mut client, &line).await, "[OK]");
                }
            }));
        }
        for client in clients {
            client.await.unwrap();
        }

        let response = request(&mut admin, "SELECT id FROM t;").await;
        let ids: Vec<&str> = response.lines().skip(2).collect();
        let expected: Vec<String> = (1..=20).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = Server::with_store(listener, Store::in_memory());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_until(async {
            let _ = rx.await;
        }));
        tx.send(()).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }
}
