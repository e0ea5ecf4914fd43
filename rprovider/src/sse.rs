//! Incremental Server-Sent-Events line decoder.
//!
//! Bytes are buffered until a full line is available, so multi-byte characters
//! split across network chunks decode correctly. Every `data:` line becomes one
//! event; an `event:` line names the data lines that follow it until the next
//! blank line.
//!
//! ```rust
//! use rprovider::SseDecoder;
//!
//! let mut decoder = SseDecoder::new();
//! let events = decoder.push(b"event: ping\ndata: {}\n\ndata: [DO").expect("valid utf-8");
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].event.as_deref(), Some("ping"));
//!
//! let events = decoder.push(b"NE]\n").expect("valid utf-8");
//! assert!(events[0].is_done());
//! ```

use crate::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>, ProviderError> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.drain(..=newline).collect::<Vec<_>>();
            if let Some(event) = self.decode_line(&line)? {
                events.push(event);
            }
        }

        Ok(events)
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Result<Option<SseEvent>, ProviderError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line)
    }

    fn decode_line(&mut self, raw: &[u8]) -> Result<Option<SseEvent>, ProviderError> {
        let line = std::str::from_utf8(raw).map_err(|err| {
            ProviderError::protocol(format!("stream line is not valid utf-8: {err}"))
        })?;
        let line = line.trim_end_matches(['\n', '\r']);

        if line.is_empty() {
            self.event = None;
            return Ok(None);
        }

        if line.starts_with(':') {
            return Ok(None);
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => {
                self.event = Some(value.to_string());
                Ok(None)
            }
            "data" => Ok(Some(SseEvent {
                event: self.event.clone(),
                data: value.to_string(),
            })),
            _ => Ok(None),
        }
    }
}
