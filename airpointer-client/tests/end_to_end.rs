//! Controller against a real server on localhost.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use airpointer_client::config::MotionConfig;
use airpointer_client::{ClientEndpoint, ControlInput, Controller};
use airpointer_core::signal::{Point, TouchEvent};
use airpointer_core::{AirPointerError, ClientSnapshot, ConnectionInfo, LogActuator};
use airpointer_server::{ServerConfig, ServerEvent, ServerHandle};

const SECRET: &str = "admin@1234";
const TIMEOUT: Duration = Duration::from_secs(5);

// ── Helpers ──────────────────────────────────────────────────────

struct Server {
    handle: ServerHandle,
    task: JoinHandle<()>,
    info: ConnectionInfo,
    cursor: Arc<LogActuator>,
    _ui: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    async fn start() -> Self {
        let mut config = ServerConfig::default();
        config.network.host = "127.0.0.1".into();
        config.network.port = 0;

        let cursor = Arc::new(LogActuator::default());
        let (ui_tx, ui) = mpsc::unbounded_channel();
        let (handle, task) = airpointer_server::start(&config, cursor.clone(), ui_tx)
            .await
            .unwrap();
        let info = handle.server_info().await.unwrap().connection_info();

        Self {
            handle,
            task,
            info,
            cursor,
            _ui: ui,
        }
    }

    async fn endpoint(&self) -> ClientEndpoint {
        ClientEndpoint::connect(self.info.clone(), SECRET, TIMEOUT)
            .await
            .unwrap()
    }

    async fn wait_for_client(&self, mut wanted: impl FnMut(&ClientSnapshot) -> bool) {
        within(async {
            loop {
                if let Some(client) = self.handle.active_client().await.unwrap()
                    && wanted(&client)
                {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
    }

    async fn wait_for_cursor(&self, x: f64, y: f64) {
        within(async {
            while self.cursor.position() != (x, y) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
    }

    async fn stop(self) {
        self.handle.shutdown().await.unwrap();
        within(self.task).await.unwrap();
    }
}

async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(TIMEOUT, fut)
        .await
        .expect("timed out")
}

fn unsmoothed() -> MotionConfig {
    MotionConfig {
        smoothing: 1.0,
        ..MotionConfig::default()
    }
}

fn touch(event: TouchEvent) -> ControlInput {
    ControlInput::Touch(event)
}

// ── Tests ────────────────────────────────────────────────────────

#[tokio::test]
async fn announcement_reaches_the_server() {
    let server = Server::start().await;
    let endpoint = server.endpoint().await;

    let controller = Controller::new(&MotionConfig::default(), true, false);
    endpoint
        .send_all(&controller.announcement("Pixel 8"))
        .await
        .unwrap();

    server
        .wait_for_client(|c| {
            c.authenticated
                && c.device_model.as_deref() == Some("Pixel 8")
                && c.control_enabled
                && !c.air_mouse_enabled
        })
        .await;

    endpoint.close().await;
    server.stop().await;
}

#[tokio::test]
async fn drag_and_recenter_move_the_cursor() {
    let server = Server::start().await;
    let endpoint = server.endpoint().await;
    let mut controller = Controller::new(&unsmoothed(), true, false);

    let inputs = [
        touch(TouchEvent::Start {
            position: Point::new(100.0, 100.0),
            timestamp_ms: 0,
        }),
        touch(TouchEvent::Move {
            position: Point::new(130.0, 80.0),
            timestamp_ms: 16,
        }),
        touch(TouchEvent::End {
            position: Point::new(130.0, 80.0),
            timestamp_ms: 300,
        }),
    ];
    for input in inputs {
        endpoint.send_all(&controller.handle(input)).await.unwrap();
    }
    server.wait_for_cursor(990.0, 520.0).await;

    endpoint
        .send_all(&controller.handle(ControlInput::Recenter))
        .await
        .unwrap();
    server.wait_for_cursor(960.0, 540.0).await;

    endpoint.close().await;
    server.stop().await;
}

#[tokio::test]
async fn wrong_password_is_an_error() {
    let server = Server::start().await;

    let result = ClientEndpoint::connect(server.info.clone(), "guess", TIMEOUT).await;
    assert!(matches!(result, Err(AirPointerError::AuthFailed)));

    // the slot is free again
    let endpoint = server.endpoint().await;
    endpoint.close().await;
    server.stop().await;
}

#[tokio::test]
async fn second_controller_is_rejected() {
    let server = Server::start().await;
    let first = server.endpoint().await;
    server.wait_for_client(|c| c.authenticated).await;

    let second = ClientEndpoint::connect(server.info.clone(), SECRET, TIMEOUT).await;
    assert!(matches!(second, Err(AirPointerError::ConnectionRejected)));
    assert!(!first.is_closed());

    first.close().await;
    server.stop().await;
}

#[tokio::test]
async fn server_disconnect_ends_the_session() {
    let server = Server::start().await;
    let mut endpoint = server.endpoint().await;
    server.wait_for_client(|c| c.authenticated).await;

    assert!(server.handle.disconnect_client().await.unwrap());
    within(endpoint.closed()).await;

    server.stop().await;
}

#[tokio::test]
async fn nothing_listening_is_a_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result = ClientEndpoint::connect(
        ConnectionInfo::new("127.0.0.1", port),
        SECRET,
        Duration::from_secs(2),
    )
    .await;
    assert!(result.is_err());
}
