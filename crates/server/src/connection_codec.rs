// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Line codec for client connections: inbound CR-LF (or bare LF) delimited UTF-8 records,
//! outbound lines always terminated CR-LF.

use bytes::{Buf, BytesMut};
use std::fmt;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug)]
pub enum ConnectionCodecError {
    /// Line exceeded the configured maximum length.
    MaxLineLengthExceeded,
    Io(io::Error),
    /// The received chunk did not decode as UTF-8.
    Utf8(std::str::Utf8Error),
}

impl fmt::Display for ConnectionCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionCodecError::MaxLineLengthExceeded => {
                write!(f, "maximum line length exceeded")
            }
            ConnectionCodecError::Io(e) => write!(f, "IO error: {e}"),
            ConnectionCodecError::Utf8(e) => write!(f, "UTF-8 error: {e}"),
        }
    }
}

impl std::error::Error for ConnectionCodecError {}

impl From<io::Error> for ConnectionCodecError {
    fn from(e: io::Error) -> Self {
        ConnectionCodecError::Io(e)
    }
}

impl From<std::str::Utf8Error> for ConnectionCodecError {
    fn from(e: std::str::Utf8Error) -> Self {
        ConnectionCodecError::Utf8(e)
    }
}

pub struct ConnectionCodec {
    next_index: usize,
    max_length: Option<usize>,
    is_discarding: bool,
}

impl ConnectionCodec {
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_length: None,
            is_discarding: false,
        }
    }

    pub fn new_with_max_length(max_length: usize) -> Self {
        Self {
            max_length: Some(max_length),
            ..Self::new()
        }
    }

    fn handle_no_newline_found(
        &mut self,
        buf: &mut BytesMut,
        read_to: usize,
    ) -> Result<Option<String>, ConnectionCodecError> {
        let Some(max_length) = self.max_length else {
            self.next_index = read_to;
            return Ok(None);
        };

        if read_to <= max_length {
            self.next_index = read_to;
            return Ok(None);
        }

        if self.is_discarding {
            // Keep throwing bytes away until the offending line finally ends.
            let Some(newline_offset) = buf.iter().position(|b| *b == b'\n') else {
                buf.advance(read_to);
                return Ok(None);
            };
            buf.advance(newline_offset + 1);
            self.is_discarding = false;
            self.next_index = 0;
            return Ok(None);
        }

        self.is_discarding = true;
        Err(ConnectionCodecError::MaxLineLengthExceeded)
    }
}

impl Default for ConnectionCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ConnectionCodec {
    type Item = String;
    type Error = ConnectionCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, ConnectionCodecError> {
        if buf.is_empty() {
            return Ok(None);
        }
        let read_to = buf.len();

        let Some(newline_offset) = buf[self.next_index..read_to]
            .iter()
            .position(|b| *b == b'\n')
        else {
            return self.handle_no_newline_found(buf, read_to);
        };

        let newline_index = newline_offset + self.next_index;
        if let Some(max_length) = self.max_length
            && newline_index > max_length
        {
            // Drop the oversized line wholesale; the next record parses cleanly.
            buf.advance(newline_index + 1);
            self.next_index = 0;
            return Err(ConnectionCodecError::MaxLineLengthExceeded);
        }

        let mut line = buf.split_to(newline_index + 1);
        line.truncate(newline_index);
        if line.ends_with(b"\r") {
            line.truncate(line.len() - 1);
        }

        self.next_index = 0;
        self.is_discarding = false;

        Ok(Some(std::str::from_utf8(&line)?.to_string()))
    }
}

impl Encoder<String> for ConnectionCodec {
    type Error = ConnectionCodecError;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> Result<(), ConnectionCodecError> {
        buf.extend_from_slice(line.as_bytes());
        buf.extend_from_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_parsing() {
        let mut codec = ConnectionCodec::new();
        let mut buf = BytesMut::from("hello\nworld\r\n");

        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("hello"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("world"));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_partial_line_waits() {
        let mut codec = ConnectionCodec::new();
        let mut buf = BytesMut::from("CONNECT go");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"d god\r\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some("CONNECT god god")
        );
    }

    #[test]
    fn test_encoding_appends_crlf() {
        let mut codec = ConnectionCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("GOODBYE!".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"GOODBYE!\r\n");
    }

    #[test]
    fn test_max_line_length() {
        let mut codec = ConnectionCodec::new_with_max_length(5);
        let mut buf = BytesMut::from("toolong\n");
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ConnectionCodecError::MaxLineLengthExceeded)
        ));
        // The oversized line is discarded wholesale; the next line survives.
        buf.extend_from_slice(b"ok\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut codec = ConnectionCodec::new();
        let mut buf = BytesMut::from(&b"\xff\xfe\n"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ConnectionCodecError::Utf8(_))
        ));
    }
}
