use std::io::Write;

use mention_composer::MessageSink;
use mention_protocol::OutgoingMessage;
use mention_protocol::SendError;

/// Writes every outgoing message as one JSON line.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MessageSink for JsonLinesSink<W> {
    fn send(&mut self, message: OutgoingMessage) -> Result<(), SendError> {
        let line = serde_json::to_string(&message).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}
