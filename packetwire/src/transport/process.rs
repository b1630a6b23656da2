//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Transport to a spawned peer process.
//!
//! The child is expected to run in library mode: it listens on a socket,
//! announces the address on its standard output and serves exactly one
//! connection. The announcement is three lines:
//!
//! ```text
//! AGNOS
//! <host>
//! <port>
//! ```

use crate::transport::{SocketTransport, TransportError, TransportWrapper};
use parking_lot::Mutex;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use tracing::{debug, info, instrument, warn};

/// First line a library-mode peer prints once it is ready.
pub const STARTUP_MARKER: &str = "AGNOS";

/// Arguments that start a peer program in library mode.
pub const LIBRARY_MODE_ARGS: [&str; 2] = ["-m", "lib"];

/// A transport connected to a child process it spawned.
///
/// Closing the transport closes the socket and the child's standard input;
/// a library-mode peer exits once its connection is gone.
///
/// # Examples
///
/// ```rust,no_run
/// use packetwire::transport::{ProcTransport, Transport};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = ProcTransport::spawn_library("./calc_server")?;
/// transport.begin_write(1)?;
/// transport.write(b"\x00\x01")?;
/// transport.end_write()?;
/// transport.close()?;
/// println!("peer exited with {}", transport.wait()?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ProcTransport {
    inner: SocketTransport,
    child: Mutex<Child>,
    // Held so late writes by the child to stdout do not fail.
    _stdout: BufReader<ChildStdout>,
}

impl ProcTransport {
    /// Spawns `program` in library mode (`-m lib`) and connects to it.
    ///
    /// # Errors
    ///
    /// As for [`spawn`](Self::spawn).
    pub fn spawn_library(program: impl AsRef<OsStr>) -> Result<Self, TransportError> {
        Self::spawn(library_command(program))
    }

    /// Spawns `command` and connects to the address it announces.
    ///
    /// Standard input and output of the child are piped; standard error is
    /// inherited.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::StartupFailed`] if the process cannot be
    /// started or its announcement is malformed, and
    /// [`TransportError::ConnectionFailed`] if the announced address does not
    /// accept the connection. The child is killed in both cases.
    #[instrument(skip(command), fields(program = ?command.get_program()))]
    pub fn spawn(mut command: Command) -> Result<Self, TransportError> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| TransportError::StartupFailed {
                reason: "failed to spawn process".to_string(),
                source: Some(source),
            })?;
        debug!(pid = child.id(), "spawned peer process");

        let connected = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::StartupFailed {
                reason: "process stdout is not piped".to_string(),
                source: None,
            })
            .and_then(|stdout| {
                let mut stdout = BufReader::new(stdout);
                let (host, port) = read_announcement(&mut stdout)?;
                let transport = SocketTransport::connect(socket_address(&host, port))?;
                Ok((transport, stdout))
            });

        match connected {
            Ok((inner, stdout)) => {
                info!(pid = child.id(), peer_addr = %inner.peer_addr(), "connected to peer process");
                Ok(Self {
                    inner,
                    child: Mutex::new(child),
                    _stdout: stdout,
                })
            }
            Err(error) => {
                warn!(%error, "peer process failed to start, killing it");
                let _ = child.kill();
                let _ = child.wait();
                Err(error)
            }
        }
    }

    /// Returns the OS-assigned process identifier of the child.
    pub fn id(&self) -> u32 {
        self.child.lock().id()
    }

    /// Returns the child's exit status if it has exited.
    pub fn try_wait(&self) -> io::Result<Option<ExitStatus>> {
        self.child.lock().try_wait()
    }

    /// Blocks until the child exits.
    pub fn wait(&self) -> io::Result<ExitStatus> {
        self.child.lock().wait()
    }

    /// Kills the child.
    pub fn kill(&self) -> io::Result<()> {
        self.child.lock().kill()
    }
}

impl TransportWrapper for ProcTransport {
    type Inner = SocketTransport;

    fn inner(&self) -> &SocketTransport {
        &self.inner
    }

    fn on_close(&self) -> Result<(), TransportError> {
        let mut child = self.child.lock();
        drop(child.stdin.take());
        match child.try_wait()? {
            Some(status) => debug!(pid = child.id(), %status, "peer process exited"),
            None => debug!(pid = child.id(), "peer process still running"),
        }
        Ok(())
    }
}

fn library_command(program: impl AsRef<OsStr>) -> Command {
    let mut command = Command::new(program);
    command.args(LIBRARY_MODE_ARGS);
    command
}

/// Reads the three-line startup announcement.
fn read_announcement<R: BufRead>(reader: &mut R) -> Result<(String, u16), TransportError> {
    let marker = read_line(reader, "startup marker")?;
    if marker != STARTUP_MARKER {
        return Err(TransportError::StartupFailed {
            reason: format!("expected startup marker {STARTUP_MARKER:?}, got {marker:?}"),
            source: None,
        });
    }
    let host = read_line(reader, "host")?;
    let port = read_line(reader, "port")?;
    let port = port.parse().map_err(|_| TransportError::StartupFailed {
        reason: format!("invalid port {port:?}"),
        source: None,
    })?;
    Ok((host, port))
}

fn read_line<R: BufRead>(reader: &mut R, what: &str) -> Result<String, TransportError> {
    let mut line = String::new();
    let n = reader
        .read_line(&mut line)
        .map_err(|source| TransportError::StartupFailed {
            reason: format!("failed to read {what}"),
            source: Some(source),
        })?;
    if n == 0 {
        return Err(TransportError::StartupFailed {
            reason: format!("process exited before announcing its {what}"),
            source: None,
        });
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn socket_address(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn announce(text: &str) -> Result<(String, u16), TransportError> {
        read_announcement(&mut Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_announcement() {
        let (host, port) = announce("AGNOS\nlocalhost\n17100\n").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 17100);
    }

    #[test]
    fn test_announcement_with_crlf() {
        let (host, port) = announce("AGNOS\r\n127.0.0.1\r\n80\r\n").unwrap();
        assert_eq!(host, "127.0.0.1");
        assert_eq!(port, 80);
    }

    #[test]
    fn test_wrong_marker() {
        assert!(matches!(
            announce("HELLO\nlocalhost\n1\n"),
            Err(TransportError::StartupFailed { .. })
        ));
    }

    #[test]
    fn test_truncated_announcement() {
        match announce("AGNOS\nlocalhost\n") {
            Err(TransportError::StartupFailed { reason, .. }) => assert!(reason.contains("port")),
            other => panic!("expected startup failure, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_port() {
        assert!(matches!(
            announce("AGNOS\nlocalhost\n99999\n"),
            Err(TransportError::StartupFailed { .. })
        ));
    }

    #[test]
    fn test_socket_address() {
        assert_eq!(socket_address("localhost", 5), "localhost:5");
        assert_eq!(socket_address("::1", 5), "[::1]:5");
    }

    #[test]
    fn test_library_command_arguments() {
        let command = library_command("./calc_server");
        assert_eq!(command.get_program(), "./calc_server");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, ["-m", "lib"]);
    }

    #[test]
    fn test_spawn_library_missing_program() {
        assert!(matches!(
            ProcTransport::spawn_library("/nonexistent/packetwire-peer"),
            Err(TransportError::StartupFailed {
                source: Some(_),
                ..
            })
        ));
    }

    #[test]
    fn test_spawn_missing_program() {
        let command = Command::new("/nonexistent/packetwire-peer");
        assert!(matches!(
            ProcTransport::spawn(command),
            Err(TransportError::StartupFailed {
                source: Some(_),
                ..
            })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_bad_announcement() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("echo READY");
        assert!(matches!(
            ProcTransport::spawn(command),
            Err(TransportError::StartupFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_and_connect() {
        use crate::transport::Transport;
        use std::thread;

        let listener = SocketTransport::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (server, _) = SocketTransport::accept(&listener).unwrap();
            let seq = server.begin_read().unwrap();
            let mut buf = [0u8; 5];
            server.read(&mut buf).unwrap();
            server.end_read().unwrap();
            (seq, buf)
        });

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(format!("echo AGNOS; echo 127.0.0.1; echo {port}; exec cat > /dev/null"));
        let transport = ProcTransport::spawn(command).unwrap();

        transport.begin_write(3).unwrap();
        transport.write(b"hello").unwrap();
        transport.end_write().unwrap();

        let (seq, buf) = server.join().unwrap();
        assert_eq!(seq, 3);
        assert_eq!(&buf, b"hello");

        transport.close().unwrap();
        assert!(transport.wait().unwrap().success());
    }
}
