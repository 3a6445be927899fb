//! End-to-end tests: framed requests over a real Unix socket.

use std::path::PathBuf;

use is_core::StackError;
use is_proto::{read_response, write_request, Request, Response};
use is_server::{Server, ServerConfig, ServerError};
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    path: PathBuf,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
    _dir: tempfile::TempDir,
}

impl Running {
    async fn shutdown(self) -> PathBuf {
        self.stop.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
        self.path
    }
}

fn start(config: ServerConfig) -> Running {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("int_stack.sock");
    let server = Server::from_config(config.with_socket_path(&path)).unwrap();
    let listener = server.bind().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(listener, async move {
        let _ = stopped.await;
    }));
    Running {
        path,
        stop,
        handle,
        _dir: dir,
    }
}

async fn call(stream: &mut UnixStream, request: Request) -> Response {
    write_request(stream, &request).await.unwrap();
    read_response(stream).await.unwrap()
}

#[tokio::test]
async fn test_scenario_over_socket() {
    let running = start(ServerConfig::default());
    let mut stream = UnixStream::connect(&running.path).await.unwrap();

    assert_eq!(
        call(&mut stream, Request::push(1)).await,
        Response::Failed(StackError::Uninitialized)
    );
    assert_eq!(call(&mut stream, Request::set_size(3)).await, Response::empty());
    for v in 1..=3 {
        assert_eq!(call(&mut stream, Request::push(v)).await, Response::empty());
    }
    assert_eq!(
        call(&mut stream, Request::push(4)).await,
        Response::Failed(StackError::Full)
    );
    assert_eq!(call(&mut stream, Request::pop()).await, Response::value(3));
    assert_eq!(call(&mut stream, Request::set_size(1)).await, Response::empty());
    assert_eq!(call(&mut stream, Request::pop()).await, Response::value(1));
    assert_eq!(call(&mut stream, Request::pop()).await, Response::empty());

    drop(stream);
    let path = running.shutdown().await;
    assert!(!path.exists(), "socket file must be removed on shutdown");
}

#[tokio::test]
async fn test_state_shared_across_connections() {
    let running = start(ServerConfig::default().with_initial_capacity(4));

    let mut first = UnixStream::connect(&running.path).await.unwrap();
    let mut second = UnixStream::connect(&running.path).await.unwrap();

    call(&mut first, Request::push(10)).await;
    call(&mut second, Request::push(20)).await;
    assert_eq!(call(&mut first, Request::pop()).await, Response::value(20));
    assert_eq!(call(&mut second, Request::pop()).await, Response::value(10));

    drop((first, second));
    running.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_lose_nothing() {
    let running = start(ServerConfig::default().with_initial_capacity(1024));

    let mut tasks = Vec::new();
    for t in 0..4 {
        let path = running.path.clone();
        tasks.push(tokio::spawn(async move {
            let mut stream = UnixStream::connect(&path).await.unwrap();
            for j in 0..100 {
                let response = call(&mut stream, Request::push(t * 1000 + j)).await;
                assert_eq!(response, Response::empty());
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut stream = UnixStream::connect(&running.path).await.unwrap();
    let mut values = Vec::new();
    while let Ok(Some(v)) = call(&mut stream, Request::pop()).await.into_value() {
        values.push(v);
    }
    values.sort_unstable();
    let mut expected: Vec<i32> = (0..4).flat_map(|t| (0..100).map(move |j| t * 1000 + j)).collect();
    expected.sort_unstable();
    assert_eq!(values, expected);

    drop(stream);
    running.shutdown().await;
}

#[tokio::test]
async fn test_budget_surfaces_resource_exhausted() {
    let running = start(ServerConfig::default().with_max_buffer_bytes(40));
    let mut stream = UnixStream::connect(&running.path).await.unwrap();

    assert_eq!(
        call(&mut stream, Request::set_size(11)).await,
        Response::Failed(StackError::ResourceExhausted)
    );
    assert_eq!(call(&mut stream, Request::set_size(10)).await, Response::empty());

    drop(stream);
    running.shutdown().await;
}

#[tokio::test]
async fn test_malformed_frame_closes_connection_only() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let running = start(ServerConfig::default().with_initial_capacity(2));

    let mut bad = UnixStream::connect(&running.path).await.unwrap();
    bad.write_all(&[b'X', 1, 0, 0, 0, 0]).await.unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(bad.read(&mut buf).await.unwrap(), 0, "server should hang up");

    let mut good = UnixStream::connect(&running.path).await.unwrap();
    assert_eq!(call(&mut good, Request::push(5)).await, Response::empty());

    drop((bad, good));
    running.shutdown().await;
}

#[test]
fn test_invalid_initial_capacity_is_fatal() {
    let config = ServerConfig::default()
        .with_initial_capacity(100)
        .with_max_buffer_bytes(16);
    assert!(matches!(
        Server::from_config(config),
        Err(ServerError::InitialCapacity(StackError::ResourceExhausted))
    ));
}

#[tokio::test]
async fn test_oversized_write_rejected_connection_kept() {
    let running = start(ServerConfig::default().with_initial_capacity(2));
    let mut stream = UnixStream::connect(&running.path).await.unwrap();

    let oversized = Request::Write {
        payload: vec![0; is_proto::PAYLOAD_SIZE_MAX + 1],
    };
    assert_eq!(
        call(&mut stream, oversized).await,
        Response::Failed(StackError::InvalidArgument)
    );
    assert_eq!(call(&mut stream, Request::push(5)).await, Response::empty());
    assert_eq!(call(&mut stream, Request::pop()).await, Response::value(5));

    drop(stream);
    running.shutdown().await;
}

#[tokio::test]
async fn test_second_server_cannot_steal_live_socket() {
    let running = start(ServerConfig::default().with_initial_capacity(2));
    let mut stream = UnixStream::connect(&running.path).await.unwrap();
    assert_eq!(call(&mut stream, Request::push(42)).await, Response::empty());

    let rival = Server::from_config(ServerConfig::default().with_socket_path(&running.path)).unwrap();
    assert!(matches!(
        rival.bind(),
        Err(ServerError::Bind { ref source, .. }) if source.kind() == std::io::ErrorKind::AddrInUse
    ));

    let mut late = UnixStream::connect(&running.path).await.unwrap();
    assert_eq!(call(&mut late, Request::pop()).await, Response::value(42));

    drop((stream, late));
    running.shutdown().await;
}
