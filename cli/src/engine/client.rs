use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bollard::errors::Error as BollardError;
use bollard::{ClientVersion, Docker};
use tokio::runtime::{Builder, Runtime};

use crate::engine::factory::ClientConstructor;
use crate::engine::ApiVersion;

const UNIX_SCHEME: &str = "unix://";

#[derive(Debug, thiserror::Error)]
pub enum ConstructionError {
    #[error("Unsupported API version: {0}")]
    UnsupportedVersion(ApiVersion),

    #[error("Invalid engine endpoint: {0:?}")]
    InvalidEndpoint(String),

    #[error("Engine endpoint {endpoint} unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start engine client runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("Failed to connect to engine at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: BollardError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Engine rejected ping with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Ping timed out after {0:?}")]
    Timeout(Duration),

    #[error("Ping failed: {0}")]
    Engine(#[from] BollardError),
}

/// A handle to the engine API pinned to one version.
pub trait EngineClient: Send + Sync {
    fn api_version(&self) -> ApiVersion;

    /// Checks that the engine is reachable and accepts this API version.
    fn ping(&self) -> Result<(), ProbeError>;
}

/// Strips an optional `unix://` scheme from an endpoint.
pub fn socket_path_from_endpoint(endpoint: &str) -> Option<PathBuf> {
    let path = endpoint.strip_prefix(UNIX_SCHEME).unwrap_or(endpoint).trim();
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Builds bollard-backed `SocketClient`s for engines on a local Unix socket.
#[derive(Debug, Clone)]
pub struct SocketConstructor {
    timeout: Duration,
}

impl SocketConstructor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ClientConstructor for SocketConstructor {
    type Client = SocketClient;

    fn construct(
        &self,
        endpoint: &str,
        version: ApiVersion,
    ) -> Result<SocketClient, ConstructionError> {
        if !version.is_known() {
            return Err(ConstructionError::UnsupportedVersion(version));
        }

        let path = socket_path_from_endpoint(endpoint)
            .ok_or_else(|| ConstructionError::InvalidEndpoint(endpoint.to_string()))?;

        if !path.exists() {
            return Err(ConstructionError::Unreachable {
                endpoint: endpoint.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "socket does not exist"),
            });
        }

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ConstructionError::Runtime)?;

        let socket = path
            .to_str()
            .ok_or_else(|| ConstructionError::InvalidEndpoint(endpoint.to_string()))?;

        // bollard's connect timeout is whole seconds; sub-second probes are
        // bounded again in `ping`.
        let docker = {
            let _enter = runtime.enter();
            Docker::connect_with_unix(
                socket,
                self.timeout.as_secs().max(1),
                &ClientVersion {
                    major_version: usize::from(version.major()),
                    minor_version: usize::from(version.minor()),
                },
            )
        }
        .map_err(|source| ConstructionError::Connect {
            endpoint: endpoint.to_string(),
            source,
        })?;

        Ok(SocketClient {
            path,
            version,
            timeout: self.timeout,
            docker,
            runtime,
        })
    }
}

/// Engine client pinned to one API version, driven from its own
/// current-thread runtime so callers stay synchronous.
pub struct SocketClient {
    path: PathBuf,
    version: ApiVersion,
    timeout: Duration,
    docker: Docker,
    runtime: Runtime,
}

impl std::fmt::Debug for SocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketClient")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SocketClient {
    pub fn socket_path(&self) -> &Path {
        &self.path
    }
}

impl EngineClient for SocketClient {
    fn api_version(&self) -> ApiVersion {
        self.version
    }

    fn ping(&self) -> Result<(), ProbeError> {
        let reply = self
            .runtime
            .block_on(async { tokio::time::timeout(self.timeout, self.docker.ping()).await })
            .map_err(|_| ProbeError::Timeout(self.timeout))?;

        match reply {
            Ok(body) => {
                tracing::trace!(version = %self.version, %body, "engine answered ping");
                Ok(())
            }
            Err(BollardError::DockerResponseServerError {
                status_code,
                message,
            }) => Err(ProbeError::Rejected {
                status: status_code,
                body: message,
            }),
            Err(e) => Err(ProbeError::Engine(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::os::unix::net::UnixListener;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread::{self, JoinHandle};

    use super::*;
    use crate::engine::{ApiVersion, VERSION_1_18, VERSION_1_20};

    static SOCKET_SEQ: AtomicU32 = AtomicU32::new(0);

    fn temp_socket_path() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "berth-test-{}-{}",
            std::process::id(),
            SOCKET_SEQ.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("engine.sock")
    }

    fn http_response(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nApi-Version: 1.24\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        )
    }

    /// Answers one request with `response`, then keeps the connection open
    /// until the client hangs up. Returns the request line it saw.
    fn serve_once(path: &Path, response: String) -> JoinHandle<String> {
        let listener = UnixListener::bind(path).unwrap();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            reader.get_mut().write_all(response.as_bytes()).unwrap();
            let _ = reader.read_to_end(&mut Vec::new());
            request_line.trim().to_string()
        })
    }

    fn constructor() -> SocketConstructor {
        SocketConstructor::new(Duration::from_secs(2))
    }

    #[test]
    fn test_socket_path_from_endpoint() {
        assert_eq!(
            socket_path_from_endpoint("unix:///var/run/docker.sock"),
            Some(PathBuf::from("/var/run/docker.sock"))
        );
        assert_eq!(
            socket_path_from_endpoint("/run/engine.sock"),
            Some(PathBuf::from("/run/engine.sock"))
        );
        assert_eq!(
            socket_path_from_endpoint(crate::engine::DEFAULT_ENDPOINT),
            Some(PathBuf::from("/var/run/docker.sock"))
        );
        assert_eq!(socket_path_from_endpoint("unix://"), None);
        assert_eq!(socket_path_from_endpoint(""), None);
    }

    #[test]
    fn test_construct_rejects_unknown_version() {
        let result = constructor().construct("/var/run/docker.sock", ApiVersion::new(1, 5));
        assert!(matches!(
            result,
            Err(ConstructionError::UnsupportedVersion(v)) if v == ApiVersion::new(1, 5)
        ));
    }

    #[test]
    fn test_construct_rejects_empty_endpoint() {
        let result = constructor().construct("", VERSION_1_18);
        assert!(matches!(result, Err(ConstructionError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_construct_missing_socket_is_unreachable() {
        let path = temp_socket_path();
        let result = constructor().construct(path.to_str().unwrap(), VERSION_1_18);
        assert!(matches!(result, Err(ConstructionError::Unreachable { .. })));
    }

    #[test]
    fn test_ping_success_on_kept_alive_connection() {
        let path = temp_socket_path();
        let server = serve_once(&path, http_response("200 OK", "text/plain", "OK"));

        let endpoint = format!("unix://{}", path.display());
        let client = constructor().construct(&endpoint, VERSION_1_18).unwrap();
        assert_eq!(client.socket_path(), path.as_path());

        client.ping().unwrap();
        drop(client);

        let request_line = server.join().unwrap();
        assert!(request_line.starts_with("GET "), "{}", request_line);
        assert!(request_line.contains("/v1.18/_ping"), "{}", request_line);
    }

    #[test]
    fn test_ping_rejected_version() {
        let path = temp_socket_path();
        let server = serve_once(
            &path,
            http_response(
                "400 Bad Request",
                "application/json",
                r#"{"message":"client version 1.20 is too new"}"#,
            ),
        );

        let client = constructor()
            .construct(path.to_str().unwrap(), VERSION_1_20)
            .unwrap();
        let err = client.ping().unwrap_err();
        drop(client);
        server.join().unwrap();

        match err {
            ProbeError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("too new"));
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_ping_fails_when_listener_gone() {
        let path = temp_socket_path();
        drop(UnixListener::bind(&path).unwrap());

        let client = constructor()
            .construct(path.to_str().unwrap(), VERSION_1_18)
            .unwrap();
        assert!(matches!(client.ping(), Err(ProbeError::Engine(_))));
    }

    #[test]
    fn test_ping_times_out_on_silent_engine() {
        let path = temp_socket_path();
        let listener = UnixListener::bind(&path).unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();
            let _ = stream.read_to_end(&mut Vec::new());
        });

        let client = SocketConstructor::new(Duration::from_millis(200))
            .construct(path.to_str().unwrap(), VERSION_1_18)
            .unwrap();
        assert!(matches!(client.ping(), Err(ProbeError::Timeout(_))));
        drop(client);
        server.join().unwrap();
    }
}
