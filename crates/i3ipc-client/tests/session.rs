//! End-to-end tests against a mock i3 listening on a Unix socket

use std::path::Path;
use std::sync::Arc;

use i3ipc_client::codec::{read_frame, write_frame};
use i3ipc_client::{IpcError, MessageType, Session, DEFAULT_MAX_PAYLOAD_SIZE};
use tempfile::TempDir;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;

const TREE: &str = r#"{
    "id": 1, "type": "root", "name": "root", "focus": [2],
    "nodes": [{
        "id": 2, "type": "output", "name": "eDP-1", "focus": [3],
        "nodes": [{
            "id": 3, "type": "workspace", "name": "1", "num": 1, "focus": [5, 4],
            "nodes": [
                {"id": 4, "window": 100, "percent": 0.5, "name": "term"},
                {"id": 5, "window": 101, "percent": "half", "name": "editor", "focused": true}
            ]
        }]
    }]
}"#;

/// Answer requests on one connection until the client hangs up
///
/// `RUN_COMMAND` replies echo the command back in the error field so callers
/// can check that they received their own reply.
async fn serve_connection(mut stream: UnixStream) {
    while let Ok(frame) = read_frame(&mut stream, DEFAULT_MAX_PAYLOAD_SIZE).await {
        let body = match MessageType::from_code(frame.message_type) {
            Some(MessageType::RunCommand) => {
                let command = String::from_utf8(frame.payload).unwrap();
                if command == "exec /bin/true" {
                    r#"[{"success":true}]"#.to_string()
                } else {
                    format!(
                        r#"[{{"success":false,"error":{}}}]"#,
                        serde_json::to_string(&command).unwrap()
                    )
                }
            }
            Some(MessageType::GetWorkspaces) => r#"[{"num":1,"name":"1","visible":true,"focused":true,"urgent":false,"rect":{"x":0,"y":0,"width":1920,"height":1080},"output":"eDP-1"}]"#.to_string(),
            Some(MessageType::GetTree) => TREE.to_string(),
            _ => "[]".to_string(),
        };
        if write_frame(&mut stream, frame.message_type, body.as_bytes())
            .await
            .is_err()
        {
            break;
        }
    }
}

/// Bind a mock i3 socket inside `dir` and serve every connection
fn spawn_mock_i3(dir: &Path) -> std::path::PathBuf {
    let socket_path = dir.join("ipc.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _addr)) = listener.accept().await {
            tokio::spawn(serve_connection(stream));
        }
    });
    socket_path
}

#[tokio::test]
async fn test_connect_and_query() {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = spawn_mock_i3(temp_dir.path());

    let mut session = Session::connect(&socket_path).await.unwrap();

    session.run_command("exec /bin/true").await.unwrap();

    let workspaces = session.get_workspaces().await.unwrap();
    assert_eq!(workspaces.len(), 1);
    assert_eq!(workspaces[0].output, "eDP-1");
    assert_eq!(workspaces[0].rect.width, 1920);

    // One node carries a string percent; the rest of the tree still decodes
    let tree = session.get_tree().await.unwrap();
    assert_eq!(tree.len(), 5);
    let editor = tree.find_by_id(5).unwrap();
    assert_eq!(tree.node(editor).unwrap().percent, None);
    assert_eq!(tree.node(editor).unwrap().name.as_deref(), Some("editor"));
    assert_eq!(tree.parent(editor).unwrap().id, 3);

    let workspace = tree.find_by_id(3).unwrap();
    let focus: Vec<i64> = tree.focus_order(workspace).map(|n| n.id).collect();
    assert_eq!(focus, vec![5, 4]);

    session.close().await.unwrap();
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_invalid_command_reports_failure() {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = spawn_mock_i3(temp_dir.path());

    let mut session = Session::connect(&socket_path).await.unwrap();
    match session.run_command("not a real command").await {
        Err(IpcError::CommandFailed { message }) => assert_eq!(message, "not a real command"),
        other => panic!("Expected CommandFailed, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_serialized_concurrent_use_via_mutex() {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = spawn_mock_i3(temp_dir.path());

    let session = Arc::new(Mutex::new(Session::connect(&socket_path).await.unwrap()));

    let mut handles = Vec::new();
    for task in 0..8 {
        let session = Arc::clone(&session);
        handles.push(tokio::spawn(async move {
            for round in 0..25 {
                let command = format!("mark task-{}-{}", task, round);
                // The guard spans one full write-then-read exchange
                let outcomes = session.lock().await.run_commands(&command).await.unwrap();
                assert_eq!(outcomes.len(), 1);
                assert_eq!(outcomes[0].error.as_deref(), Some(command.as_str()));
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_independent_sessions_on_one_daemon() {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = spawn_mock_i3(temp_dir.path());

    let mut first = Session::connect(&socket_path).await.unwrap();
    let mut second = Session::connect(&socket_path).await.unwrap();

    let (a, b) = tokio::join!(first.get_tree(), second.get_workspaces());
    assert_eq!(a.unwrap().root().id, 1);
    assert_eq!(b.unwrap()[0].num, 1);
}

#[tokio::test]
async fn test_connect_to_missing_socket() {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = temp_dir.path().join("missing.sock");

    match Session::connect(&socket_path).await {
        Err(IpcError::ConnectionFailed { path, source }) => {
            assert_eq!(path, socket_path);
            assert!(!source.to_string().is_empty());
        }
        other => panic!("Expected ConnectionFailed error, got: {:?}", other),
    }
}
