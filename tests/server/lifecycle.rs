use std::io::Write;
use std::sync::{Arc, Mutex};

use thumb_server::application::{Server, ServerConfig, ServerError};
use tracing_subscriber::fmt::MakeWriter;

use crate::helpers::content_type;

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer poisoned")).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .expect("log buffer poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn config_on_free_port() -> ServerConfig {
    let port = portpicker::pick_unused_port().expect("no free port");
    ServerConfig::for_port(&port.to_string()).expect("valid port")
}

#[test]
fn rejects_an_invalid_port() {
    let Err(err) = ServerConfig::for_port("Hey there!") else {
        panic!("expected an invalid port error");
    };
    assert!(matches!(err, ServerError::InvalidPort(_)));
    assert!(err.to_string().contains("Port"), "{err}");
}

#[tokio::test]
async fn starts_and_stops_the_http_server() {
    let mut server = Server::new(config_on_free_port()).expect("failed to build server");
    assert!(!server.is_running());

    let address = server.start().await.expect("failed to start server");
    assert!(server.is_running());
    assert_eq!(server.local_addr(), Some(address));

    let response = reqwest::get(format!("http://{address}/"))
        .await
        .expect("failed to reach running server");
    assert_eq!(response.status(), 200);
    assert_eq!(content_type(&response), Some("image/png"));

    server.stop().await;
    assert!(!server.is_running());
    assert_eq!(server.local_addr(), None);
}

#[tokio::test]
async fn refuses_to_start_twice() {
    let mut server = Server::new(config_on_free_port()).expect("failed to build server");
    let address = server.start().await.expect("failed to start server");

    let err = server.start().await.expect_err("second start should fail");
    assert!(matches!(err, ServerError::AlreadyRunning(a) if a == address));
    assert!(server.is_running());

    server.shutdown().await;
}

#[tokio::test]
async fn can_restart_after_shutdown_releases_the_port() {
    let config = config_on_free_port();
    let address = config.address();

    let mut server = Server::new(config).expect("failed to build server");
    server.start().await.expect("failed to start server");
    server.shutdown().await;

    let config = ServerConfig::for_port(&address.port().to_string()).expect("valid port");
    let mut server = Server::new(config).expect("failed to build server");
    server
        .start()
        .await
        .expect("port should be free after shutdown");
    assert!(server.is_running());
}

#[tokio::test]
async fn can_restart_after_stop_releases_the_port() {
    let config = config_on_free_port();
    let address = config.address();

    let mut server = Server::new(config).expect("failed to build server");
    server.start().await.expect("failed to start server");
    server.stop().await;

    let config = ServerConfig::for_port(&address.port().to_string()).expect("valid port");
    let mut replacement = Server::new(config).expect("failed to build server");
    replacement
        .start()
        .await
        .expect("port should be free after stop");

    assert!(!server.is_running());
    assert!(replacement.is_running());

    replacement.shutdown().await;
}

#[tokio::test]
async fn logs_startup_errors_once_and_returns_them() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let config = config_on_free_port();
    let _occupied =
        std::net::TcpListener::bind(config.address()).expect("failed to occupy port");

    let mut server = Server::new(config).expect("failed to build server");
    let err = server.start().await.expect_err("bind should fail");

    assert!(matches!(err, ServerError::Bind { .. }));
    assert!(!server.is_running());

    let output = logs.contents();
    assert_eq!(output.matches(&err.to_string()).count(), 1, "{output}");
}
