/// Framing discipline for a job's streamed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    /// Units end with a literal delimiter, e.g. `</message>`. The buffer is
    /// a raw concatenation; a trailing partial unit waits for more data.
    Delimited { end: String },
    /// The transport already frames units (one WebSocket frame per unit);
    /// every appended chunk is consumed whole as a single unit.
    FramePerChunk,
}

/// Extracts complete message units from a monotonically growing buffer.
///
/// The extractor owns the read cursor: an offset into the buffer marking the
/// start of unprocessed data. The cursor only moves forward, and only past
/// bytes that were emitted as part of a complete unit, so feeding the same
/// buffer twice emits nothing the second time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentExtractor {
    framing: Framing,
    cursor: usize,
}

impl FragmentExtractor {
    pub fn new(framing: Framing) -> Self {
        Self { framing, cursor: 0 }
    }

    /// Byte offset of the first unprocessed data in the buffer.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Emits every complete unit now available past the cursor, in document
    /// order, and advances the cursor exactly past the last byte consumed.
    ///
    /// `buffer` must be the same text as on the previous call with any amount
    /// of new data appended; the caller never passes a delta.
    pub fn drain(&mut self, buffer: &str) -> Vec<String> {
        if self.cursor >= buffer.len() {
            return Vec::new();
        }
        match &self.framing {
            Framing::Delimited { end } => {
                let mut units = Vec::new();
                // Several complete units can land in a single tick; keep
                // consuming until only a partial tail (or nothing) remains.
                while let Some(hit) = buffer[self.cursor..].find(end.as_str()) {
                    let consumed = hit + end.len();
                    units.push(buffer[self.cursor..self.cursor + consumed].to_string());
                    self.cursor += consumed;
                }
                units
            }
            Framing::FramePerChunk => {
                let unit = buffer[self.cursor..].to_string();
                self.cursor = buffer.len();
                vec![unit]
            }
        }
    }
}
