//! Drives `int-stack` commands against an in-process server.

use std::path::{Path, PathBuf};

use is_cli::exit::{EXIT_SUCCESS, EXIT_USAGE};
use is_cli::{run, Cli, Command};
use is_server::{Server, ServerConfig, ServerError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    path: PathBuf,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
    _dir: tempfile::TempDir,
}

impl Running {
    async fn shutdown(self) {
        self.stop.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
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

/// Returns (exit code, stdout, stderr).
async fn invoke(socket: &Path, command: Command) -> (i32, String, String) {
    let cli = Cli {
        socket: socket.to_path_buf(),
        command,
    };
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let code = run(&cli, &mut out, &mut err).await;
    (
        code,
        String::from_utf8(out).unwrap(),
        String::from_utf8(err).unwrap(),
    )
}

#[tokio::test]
async fn test_session() {
    let running = start(ServerConfig::default());
    let sock = running.path.clone();

    let (code, _, err) = invoke(&sock, Command::Push { value: 1 }).await;
    assert_eq!(code, 61);
    assert!(!err.is_empty());

    assert_eq!(invoke(&sock, Command::SetSize { size: 2 }).await.0, EXIT_SUCCESS);
    assert_eq!(invoke(&sock, Command::Push { value: 10 }).await.0, EXIT_SUCCESS);
    assert_eq!(invoke(&sock, Command::Push { value: -20 }).await.0, EXIT_SUCCESS);

    let (code, out, _) = invoke(&sock, Command::Push { value: 30 }).await;
    assert_eq!(code, 34);
    assert_eq!(out, "ERROR: stack is full\n");

    assert_eq!(invoke(&sock, Command::Pop).await, (EXIT_SUCCESS, "-20\n".into(), String::new()));
    assert_eq!(invoke(&sock, Command::Pop).await, (EXIT_SUCCESS, "10\n".into(), String::new()));
    assert_eq!(invoke(&sock, Command::Pop).await, (EXIT_SUCCESS, "NULL\n".into(), String::new()));

    running.shutdown().await;
}

#[tokio::test]
async fn test_unwind_prints_newest_first() {
    let running = start(ServerConfig::default().with_initial_capacity(4));
    let sock = running.path.clone();

    for v in [1, 2, 3] {
        assert_eq!(invoke(&sock, Command::Push { value: v }).await.0, EXIT_SUCCESS);
    }
    assert_eq!(
        invoke(&sock, Command::Unwind).await,
        (EXIT_SUCCESS, "3\n2\n1\n".into(), String::new())
    );
    assert_eq!(invoke(&sock, Command::Unwind).await, (EXIT_SUCCESS, String::new(), String::new()));

    running.shutdown().await;
}

#[tokio::test]
async fn test_shrink_through_cli() {
    let running = start(ServerConfig::default().with_initial_capacity(3));
    let sock = running.path.clone();

    for v in [1, 2, 3] {
        invoke(&sock, Command::Push { value: v }).await;
    }
    assert_eq!(invoke(&sock, Command::SetSize { size: 1 }).await.0, EXIT_SUCCESS);
    assert_eq!(invoke(&sock, Command::Unwind).await.1, "1\n");

    running.shutdown().await;
}

#[tokio::test]
async fn test_non_positive_size_never_reaches_server() {
    let running = start(ServerConfig::default().with_initial_capacity(1));
    let sock = running.path.clone();

    invoke(&sock, Command::Push { value: 5 }).await;
    let (code, out, _) = invoke(&sock, Command::SetSize { size: -3 }).await;
    assert_eq!(code, EXIT_USAGE);
    assert_eq!(out, "ERROR: size should be > 0\n");
    assert_eq!(invoke(&sock, Command::Pop).await.1, "5\n");

    running.shutdown().await;
}

#[tokio::test]
async fn test_budget_exhaustion_exit_code() {
    let running = start(ServerConfig::default().with_max_buffer_bytes(16));
    let (code, out, err) = invoke(&running.path, Command::SetSize { size: 5 }).await;
    assert_eq!(code, 12);
    assert!(out.is_empty());
    assert!(!err.is_empty());

    running.shutdown().await;
}
