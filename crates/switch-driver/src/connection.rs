//! Raw SSH shell plumbing (§4.1 Connection lifecycle).
//!
//! Grounded on the teacher's `ssh2` usage in
//! `workflows::resource_management::external_server` and
//! `workflows::inspect_host` — `ssh2::Session` over a `TcpStream`, driven
//! synchronously. Unlike those call sites, a switch CLI session is
//! stateful across several commands (disable paging, enter enable mode,
//! issue a block of config lines, save) rather than one-shot execs, so this
//! holds a single `channel.shell()` open for the lifetime of the driver
//! instead of opening a fresh channel per command.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use common::prelude::*;
use models::Credential;

/// A live interactive shell on one switch. Closed on drop; any command
/// already sent to the switch by the time a deadline trips may still run to
/// completion on the device (§5 Cancellation & timeouts).
pub(crate) struct RawShell {
    // Kept alive for the lifetime of `channel` even though nothing reads it
    // directly after the handshake.
    _session: ssh2::Session,
    channel: ssh2::Channel,
}

fn prompt_seen(buf: &str) -> bool {
    buf.trim_end()
        .lines()
        .last()
        .map(|line| {
            let line = line.trim_end();
            line.ends_with('#') || line.ends_with('>') || line.ends_with("):")
        })
        .unwrap_or(false)
}

impl RawShell {
    pub(crate) fn connect(
        address: &str,
        port: u16,
        credential: &Credential,
        handshake_timeout: Duration,
    ) -> Result<Self, CoreError> {
        let tcp = TcpStream::connect((address, port))
            .map_err(|e| CoreError::Unreachable(format!("{address}:{port}: {e}")))?;
        tcp.set_read_timeout(Some(handshake_timeout)).ok();
        tcp.set_write_timeout(Some(handshake_timeout)).ok();

        let mut session = ssh2::Session::new().map_err(|e| CoreError::Internal(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(handshake_timeout.as_millis().min(u32::MAX as u128) as u32);
        session
            .handshake()
            .map_err(|e| CoreError::Unreachable(format!("handshake with {address}: {e}")))?;

        session
            .userauth_password(&credential.username, credential.secret())
            .map_err(|_| CoreError::AuthRejected)?;
        if !session.authenticated() {
            return Err(CoreError::AuthRejected);
        }

        let mut channel = session
            .channel_session()
            .map_err(|e| CoreError::Unreachable(format!("channel open on {address}: {e}")))?;
        channel
            .shell()
            .map_err(|e| CoreError::Unreachable(format!("shell request on {address}: {e}")))?;

        Ok(Self { _session: session, channel })
    }

    /// Writes one command, then reads until the channel shows a shell
    /// prompt again or `timeout` elapses. Per-command deadline (§4.1).
    pub(crate) fn run(&mut self, command: &str, timeout: Duration) -> Result<String, CoreError> {
        self.channel
            .write_all(format!("{command}\n").as_bytes())
            .map_err(|e| CoreError::Timeout(format!("writing {command:?}: {e}")))?;
        self.channel.flush().ok();

        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 4096];
        let mut out = String::new();

        loop {
            if Instant::now() >= deadline {
                return Err(CoreError::Timeout(format!("no prompt after {command:?}")));
            }
            match self.channel.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    out.push_str(&String::from_utf8_lossy(&buf[..n]));
                    if prompt_seen(&out) {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(20));
                }
                Err(e) => return Err(CoreError::Timeout(format!("reading reply to {command:?}: {e}"))),
            }
        }

        Ok(strip_echo(&out, command))
    }

    pub(crate) fn close(mut self) {
        let _ = self.channel.close();
        let _ = self.channel.wait_close();
    }
}

/// Devices echo the command back as the first line; drop it so parsers
/// only see output.
fn strip_echo(raw: &str, command: &str) -> String {
    let mut lines = raw.lines();
    if let Some(first) = lines.clone().next() {
        if first.trim() == command.trim() {
            lines.next();
        }
    }
    lines.collect::<Vec<_>>().join("\n")
}
