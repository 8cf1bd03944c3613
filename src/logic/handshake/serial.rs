//! Serial-port probe channel (modem AT port)

use serialport::{ClearBuffer, SerialPort};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use super::channel::{HandshakeError, ProbeChannel, ProbeSession};

/// Opens `path` at `baudrate` for every probe attempt
#[derive(Debug, Clone)]
pub struct SerialChannel {
    path: String,
    baudrate: u32,
}

impl SerialChannel {
    pub fn new(path: impl Into<String>, baudrate: u32) -> Self {
        Self {
            path: path.into(),
            baudrate,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

pub struct SerialSession {
    port: Box<dyn SerialPort>,
}

impl ProbeChannel for SerialChannel {
    type Session = SerialSession;

    fn open(&mut self, timeout: Duration) -> Result<SerialSession, HandshakeError> {
        let port = serialport::new(&self.path, self.baudrate)
            .timeout(timeout)
            .open()
            .map_err(|e| HandshakeError::Open {
                port: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(SerialSession { port })
    }
}

impl ProbeSession for SerialSession {
    fn clear_input(&mut self) -> Result<(), HandshakeError> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| HandshakeError::Io(e.into()))
    }

    fn send(&mut self, message: &[u8]) -> Result<(), HandshakeError> {
        self.port.write_all(message)?;
        self.port.flush()?;
        Ok(())
    }

    fn receive(&mut self, max_len: usize) -> Result<Vec<u8>, HandshakeError> {
        let mut buf = vec![0u8; max_len];
        let mut filled = 0;

        while filled < max_len {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                // Short answers ("OK\r") end with a timeout once data arrived
                Err(e) if e.kind() == ErrorKind::TimedOut && filled > 0 => break,
                Err(e) if e.kind() == ErrorKind::TimedOut => return Err(HandshakeError::Timeout),
                Err(e) => return Err(e.into()),
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }
}
