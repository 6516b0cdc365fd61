//! Frame codec over a real socket. The unit tests in `frame.rs` exercise
//! `read_frame`/`write_frame` against in-memory buffers; this drives the
//! same pair across an actual `TcpListener`/`TcpStream`, plus the
//! bang-header and command parsers against payloads as they'd arrive off
//! the wire.

use kvd_protocol::{parse_command, read_frame, split_bang_header, write_frame, Command};
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn a_frame_written_by_one_socket_is_read_whole_by_the_other() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_frame(&mut socket, 1024).await.unwrap();
        let mut reply = b"echo: ".to_vec();
        reply.extend_from_slice(&request);
        write_frame(&mut socket, &reply).await.unwrap();
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    write_frame(&mut client, b"/t 0.5").await.unwrap();
    let reply = read_frame(&mut client, 1024).await.unwrap();

    server.await.unwrap();
    assert_eq!(reply, b"echo: /t 0.5");
}

#[tokio::test]
async fn back_to_back_frames_on_the_same_connection_stay_separate() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        for _ in 0..3 {
            let request = read_frame(&mut socket, 1024).await.unwrap();
            write_frame(&mut socket, &request).await.unwrap();
        }
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    for payload in [&b"one"[..], &b"two"[..], &b"three"[..]] {
        write_frame(&mut client, payload).await.unwrap();
        let reply = read_frame(&mut client, 1024).await.unwrap();
        assert_eq!(reply, payload);
    }

    server.await.unwrap();
}

#[tokio::test]
async fn a_bang_header_and_command_survive_the_wire_intact() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let bytes = read_frame(&mut socket, 1024).await.unwrap();
        let payload = String::from_utf8(bytes).unwrap();
        let (header, body) = split_bang_header(&payload);
        let command = parse_command(body);
        let reply = format!(
            "header={} command={:?}",
            header.is_some(),
            command
        );
        write_frame(&mut socket, reply.as_bytes()).await.unwrap();
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    write_frame(&mut client, b"!kv.pkl\n/save out.pkl").await.unwrap();
    let reply = read_frame(&mut client, 1024).await.unwrap();
    let reply = String::from_utf8(reply).unwrap();

    server.await.unwrap();
    assert!(reply.starts_with("header=true"));
    assert!(reply.contains("Save(Some(\"out.pkl\"))"));
    let _: Command = Command::Save(Some("out.pkl".into()));
}
