//! End-to-end PUT then GET through the public `kvd_transcript` API,
//! against a tiny in-process stand-in for `kvdrived` that just frames back
//! whatever it's sent — enough to exercise `echo_roundtrip` over a real
//! socket plus the transcript append/parse cycle it drives.

use kvd_protocol::{read_frame, write_frame};
use kvd_transcript::{get, put, ToolConfig, TRANSCRIPT_FILE};
use tempfile::tempdir;
use tokio::net::TcpListener;

/// A stand-in for `kvdrived`: every GET/PUT/RUN/QUOTE body the real tools
/// send ends with the `\n~~~(` opener, so this mock just force-closes it
/// the way the generation engine would, rather than echoing the request
/// verbatim (which would never produce a parseable fence).
async fn spawn_fence_closing_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            if read_frame(&mut socket, 1024 * 1024).await.is_ok() {
                let _ = write_frame(&mut socket, b"end)~~~\n\n").await;
            }
        }
    });
    port
}

#[tokio::test]
async fn a_put_then_get_round_trips_the_file_content_through_disk() {
    let port = spawn_fence_closing_server().await;
    let dir = tempdir().unwrap();
    let cfg = ToolConfig {
        host: "127.0.0.1".into(),
        port,
        frame_ceiling: 1024 * 1024,
        verbose: false,
    };

    let in_path = dir.path().join("in.txt");
    std::fs::write(&in_path, "hello from disk").unwrap();

    put(&in_path, dir.path(), &cfg).await;

    let transcript = std::fs::read_to_string(dir.path().join(TRANSCRIPT_FILE)).unwrap();
    assert!(transcript.contains("(Turn 1) [FILE]: hello from disk"));
    assert!(transcript.contains("~~~(end)~~~"));

    let out_path = dir.path().join("out.txt");
    get(None, &out_path, dir.path()).await;
    assert_eq!(
        std::fs::read_to_string(&out_path).unwrap(),
        "hello from disk\n"
    );
}

#[tokio::test]
async fn two_puts_mint_consecutive_turn_ids_and_get_returns_the_latest() {
    let port = spawn_fence_closing_server().await;
    let dir = tempdir().unwrap();
    let cfg = ToolConfig {
        host: "127.0.0.1".into(),
        port,
        frame_ceiling: 1024 * 1024,
        verbose: false,
    };

    for (name, content) in [("a.txt", "first"), ("b.txt", "second")] {
        let in_path = dir.path().join(name);
        std::fs::write(&in_path, content).unwrap();
        put(&in_path, dir.path(), &cfg).await;
    }

    let transcript = std::fs::read_to_string(dir.path().join(TRANSCRIPT_FILE)).unwrap();
    assert!(transcript.contains("(Turn 1) [FILE]: first"));
    assert!(transcript.contains("(Turn 2) [FILE]: second"));

    let out_path = dir.path().join("out.txt");
    get(None, &out_path, dir.path()).await;
    assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "second\n");
}
