//! Incremental `text/event-stream` decoder
//!
//! Fed raw body chunks as they arrive; chunk boundaries may fall anywhere,
//! including inside a UTF-8 sequence or between the CR and LF of a line end.
//!
//! Field handling:
//! - `data`  appended to the data buffer (multiple lines joined with `\n`)
//! - `event` sets the event type for the next dispatch
//! - `id`    sets the pending event id (ignored if it contains NUL)
//! - `retry` reconnection delay in milliseconds (digits only)
//! - lines starting with `:` are comments
//!
//! A blank line dispatches the pending event and commits the pending id as
//! the last event id; an empty data buffer dispatches nothing. A single
//! leading byte order mark is skipped.

use thiserror::Error;

/// Default event type when no `event:` field is given
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// Upper bound for one line and for one event's data
pub const MAX_BUFFER_BYTES: usize = 1024 * 1024;

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    pub event: String,
    pub data: String,
    /// Last event id in effect when this event was dispatched
    pub id: Option<String>,
}

impl SseMessage {
    /// True for unnamed events (delivered to `onmessage` in browsers)
    pub fn is_default_event(&self) -> bool {
        self.event == DEFAULT_EVENT_TYPE
    }
}

/// A line or event grew past the decoder's limit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event stream buffer exceeded {limit} bytes")]
pub struct BufferOverflow {
    pub limit: usize,
}

#[derive(Debug)]
pub struct SseDecoder {
    line: Vec<u8>,
    skip_lf: bool,
    started: bool,
    event_type: String,
    data: String,
    pending_id: Option<String>,
    last_event_id: Option<String>,
    retry_ms: Option<u64>,
    limit: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_BUFFER_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            line: Vec::new(),
            skip_lf: false,
            started: false,
            event_type: String::new(),
            data: String::new(),
            pending_id: None,
            last_event_id: None,
            retry_ms: None,
            limit,
        }
    }

    /// Consume a chunk, returning every event completed by it
    ///
    /// Fails once a single line or the data of one event exceeds the limit;
    /// the stream cannot be resynchronized after that.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseMessage>, BufferOverflow> {
        let mut dispatched = Vec::new();

        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => self.end_line(&mut dispatched)?,
                b'\r' => {
                    self.end_line(&mut dispatched)?;
                    self.skip_lf = true;
                }
                _ => {
                    if self.line.len() >= self.limit {
                        return Err(self.overflow());
                    }
                    self.line.push(byte);
                }
            }
        }

        Ok(dispatched)
    }

    /// Id of the most recently dispatched event block
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Most recent valid `retry:` value seen on this stream
    pub fn retry_ms(&self) -> Option<u64> {
        self.retry_ms
    }

    fn overflow(&self) -> BufferOverflow {
        BufferOverflow { limit: self.limit }
    }

    fn end_line(&mut self, dispatched: &mut Vec<SseMessage>) -> Result<(), BufferOverflow> {
        let raw = std::mem::take(&mut self.line);
        let decoded = String::from_utf8_lossy(&raw);

        let mut line: &str = &decoded;
        if !self.started {
            self.started = true;
            line = line.strip_prefix('\u{FEFF}').unwrap_or(line);
        }

        if line.is_empty() {
            if let Some(message) = self.dispatch() {
                dispatched.push(message);
            }
            return Ok(());
        }

        if line.starts_with(':') {
            return Ok(());
        }

        let (field, value) = match line.find(':') {
            Some(i) => {
                let value = &line[i + 1..];
                (&line[..i], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "data" => {
                if self.data.len() + value.len() + 1 > self.limit {
                    return Err(self.overflow());
                }
                self.data.push_str(value);
                self.data.push('\n');
            }
            "event" => self.event_type = value.to_string(),
            "id" => {
                if !value.contains('\0') {
                    self.pending_id = Some(value.to_string());
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(ms) = value.parse() {
                        self.retry_ms = Some(ms);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        self.last_event_id = self.pending_id.clone();

        let event_type = std::mem::take(&mut self.event_type);
        if self.data.is_empty() {
            return None;
        }

        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }

        Some(SseMessage {
            event: if event_type.is_empty() {
                DEFAULT_EVENT_TYPE.to_string()
            } else {
                event_type
            },
            data,
            id: self.last_event_id.clone(),
        })
    }
}
