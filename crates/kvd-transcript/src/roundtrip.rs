//! One request/response exchange against a running `kvdrived` (spec.md
//! §4.8's `_echo_roundtrip`). Best-effort: any failure — connect timeout,
//! write error, malformed reply — yields an empty string rather than
//! propagating, matching the tool's silent-on-error policy.

use std::time::Duration;

use kvd_protocol::{read_frame, write_frame};
use tokio::net::TcpStream;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

pub async fn echo_roundtrip(host: &str, port: u16, payload: &str, frame_ceiling: usize) -> String {
    let addr = format!("{host}:{port}");

    let mut stream = match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => stream,
        _ => return String::new(),
    };

    if write_frame(&mut stream, payload.as_bytes()).await.is_err() {
        return String::new();
    }

    match read_frame(&mut stream, frame_ceiling).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}
