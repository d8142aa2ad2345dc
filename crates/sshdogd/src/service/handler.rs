//! Connection handling for accepted sockets.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use tracing::{debug, warn};

use super::SERVICE_TARGET;
use crate::credentials::CredentialSet;

/// Identification string sent to every client, without the trailing CRLF.
pub const SERVER_IDENTIFICATION: &str = concat!("SSH-2.0-sshdog_", env!("CARGO_PKG_VERSION"));

// RFC 4253 caps the identification line at 255 bytes including CRLF.
const MAX_IDENTIFICATION_BYTES: usize = 255;
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Handles accepted connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: TcpStream, credentials: &CredentialSet);
}

/// Default handler: performs the protocol version exchange and closes.
#[derive(Debug, Default)]
pub struct IdentificationHandler;

impl ConnectionHandler for IdentificationHandler {
    fn handle(&self, mut stream: TcpStream, credentials: &CredentialSet) {
        let peer = stream
            .peer_addr()
            .map_or_else(|_| "unknown".to_owned(), |addr| addr.to_string());
        match exchange_identification(&mut stream) {
            Ok(Some(client)) => debug!(
                target: SERVICE_TARGET,
                peer = %peer,
                client = %client,
                host_keys = credentials.host_keys().len(),
                authorized_keys = credentials.authorized_keys().len(),
                "identification exchanged"
            ),
            Ok(None) => debug!(
                target: SERVICE_TARGET,
                peer = %peer,
                "client closed before identification"
            ),
            Err(error) => warn!(
                target: SERVICE_TARGET,
                peer = %peer,
                error = %error,
                "connection handler error"
            ),
        }
    }
}

fn exchange_identification(stream: &mut TcpStream) -> io::Result<Option<String>> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    stream.write_all(SERVER_IDENTIFICATION.as_bytes())?;
    stream.write_all(b"\r\n")?;
    stream.flush()?;
    read_identification_line(stream)
}

fn read_identification_line(stream: &mut impl Read) -> io::Result<Option<String>> {
    let mut buffer = Vec::new();
    let mut byte = [0_u8; 1];
    loop {
        match stream.read(&mut byte) {
            Ok(0) if buffer.is_empty() => return Ok(None),
            Ok(0) => break,
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => {
                buffer.push(byte[0]);
                if buffer.len() > MAX_IDENTIFICATION_BYTES {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "identification line exceeds maximum size",
                    ));
                }
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    if buffer.last() == Some(&b'\r') {
        buffer.pop();
    }
    String::from_utf8(buffer)
        .map(Some)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use rstest::rstest;

    #[rstest]
    #[case(b"SSH-2.0-OpenSSH_9.6\r\n".as_slice(), Some("SSH-2.0-OpenSSH_9.6"))]
    #[case(b"SSH-2.0-client\n".as_slice(), Some("SSH-2.0-client"))]
    #[case(b"SSH-2.0-truncated".as_slice(), Some("SSH-2.0-truncated"))]
    #[case(b"".as_slice(), None)]
    fn reads_identification_lines(#[case] input: &[u8], #[case] expected: Option<&str>) {
        let line = read_identification_line(&mut Cursor::new(input)).expect("read line");
        assert_eq!(line.as_deref(), expected);
    }

    #[test]
    fn rejects_oversized_identification() {
        let input = vec![b'a'; MAX_IDENTIFICATION_BYTES + 10];
        let error = read_identification_line(&mut Cursor::new(input)).expect_err("too long");
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }
}
