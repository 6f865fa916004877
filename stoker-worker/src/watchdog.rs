use std::io::Write;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use stoker_http::Output;
use tracing::error;

use crate::framing::encode_payload_header;
use crate::shared::WorkerShared;

const TICK: Duration = Duration::from_secs(1);

/// Background monitor for the in-flight request. Once the deadline passes
/// it must win the send guard; on success it emits a 504 on its clone of
/// the control socket and ends the process without running shutdown hooks.
/// Losing the guard means the request loop already answered.
pub fn spawn(
    shared: Arc<WorkerShared>,
    mut socket: UnixStream,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("stoker-watchdog".to_string())
        .spawn(move || loop {
            std::thread::sleep(TICK);
            if !shared.deadline_exceeded() {
                continue;
            }
            if !shared.try_claim_send() {
                continue;
            }

            error!(
                max_request_ms = shared.max_request_ms(),
                "request exceeded its deadline, answering 504"
            );
            if let Err(err) = send_timeout_response(&mut socket) {
                error!(%err, "cannot deliver the 504");
            }
            let _ = socket.shutdown(std::net::Shutdown::Both);
            std::process::exit(0);
        })
}

fn send_timeout_response(socket: &mut UnixStream) -> std::io::Result<()> {
    let mut output = Output::new();
    output.set_status(504);
    output.keep_alive = false;
    output.send_body = false;
    output.build_headers();

    let header = encode_payload_header(false, output.headers_bytes().len() as u64);
    socket.write_all(&header)?;
    socket.write_all(output.headers_bytes())?;
    Ok(())
}
