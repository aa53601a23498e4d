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

use crate::runtime::ScriptError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// The memory-backed sink program writes land in. The bridge periodically drains complete
/// lines; a partial trailing write is held back until its newline arrives (or the final drain).
#[derive(Clone, Default)]
pub struct OutputSink {
    inner: Arc<Mutex<SinkInner>>,
}

#[derive(Default)]
struct SinkInner {
    lines: VecDeque<String>,
    partial: String,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a complete output line.
    pub fn write_line(&self, line: &str) {
        let mut inner = self.inner.lock().unwrap();
        let partial = std::mem::take(&mut inner.partial);
        inner.lines.push_back(partial + line);
    }

    /// Write raw text; embedded newlines delimit lines.
    pub fn write(&self, text: &str) {
        let mut inner = self.inner.lock().unwrap();
        for c in text.chars() {
            if c == '\n' {
                let line = std::mem::take(&mut inner.partial);
                inner.lines.push_back(line);
            } else if c != '\r' {
                inner.partial.push(c);
            }
        }
    }

    /// Take all complete lines.
    pub fn drain(&self) -> Vec<String> {
        self.inner.lock().unwrap().lines.drain(..).collect()
    }

    /// Take everything, including an unterminated trailing write. Used once, after the program
    /// terminated and the bridge is gone.
    pub fn drain_final(&self) -> Vec<String> {
        let mut inner = self.inner.lock().unwrap();
        let mut lines: Vec<String> = inner.lines.drain(..).collect();
        if !inner.partial.is_empty() {
            lines.push(std::mem::take(&mut inner.partial));
        }
        lines
    }
}

/// The read side of an interactive program. `read_line` blocks the script thread until the
/// owning session routes a full line here.
pub struct InputSource {
    rx: flume::Receiver<String>,
}

impl InputSource {
    pub fn new(rx: flume::Receiver<String>) -> Self {
        Self { rx }
    }

    pub fn read_line(&self) -> Result<String, ScriptError> {
        self.rx.recv().map_err(|_| ScriptError::InputClosed)
    }
}

/// The I/O bundle handed to a running program: the player-output sink, and for interactive
/// programs the player-input source.
pub struct ScriptIo {
    pub output: OutputSink,
    pub input: Option<InputSource>,
}

impl ScriptIo {
    pub fn read_line(&self) -> Result<String, ScriptError> {
        match &self.input {
            Some(input) => input.read_line(),
            None => Err(ScriptError::Runtime(
                "program is not interactive".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_line_drains_in_order() {
        let sink = OutputSink::new();
        sink.write_line("one");
        sink.write_line("two");
        assert_eq!(sink.drain(), vec!["one", "two"]);
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn test_partial_writes_held_until_newline() {
        let sink = OutputSink::new();
        sink.write("hel");
        assert!(sink.drain().is_empty());
        sink.write("lo\nwor");
        assert_eq!(sink.drain(), vec!["hello"]);
        assert_eq!(sink.drain_final(), vec!["wor"]);
    }

    #[test]
    fn test_crlf_normalised() {
        let sink = OutputSink::new();
        sink.write("a\r\nb\r\n");
        assert_eq!(sink.drain(), vec!["a", "b"]);
    }

    #[test]
    fn test_input_closed_maps_to_script_error() {
        let (tx, rx) = flume::unbounded::<String>();
        let input = InputSource::new(rx);
        tx.send("hello".to_string()).unwrap();
        assert_eq!(input.read_line().unwrap(), "hello");
        drop(tx);
        assert_eq!(input.read_line(), Err(ScriptError::InputClosed));
    }
}
