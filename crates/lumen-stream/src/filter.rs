//! Coach-notes marker elision across arbitrary chunk boundaries.
//!
//! Model output may contain one or more paired marker regions
//! (`<coach-notes> … </coach-notes>`) holding internal notes that must never
//! reach the client. Deltas arrive split at arbitrary byte positions —
//! including splits inside the markers themselves — so a regex-per-chunk
//! approach cannot work. [`MarkerFilter`] is an explicit state machine
//! (`{outside, inside}` × buffered suffix) with a push/flush interface:
//! feed a fragment, get zero or more clean fragments back.
//!
//! Invariants:
//! - concatenating every emitted fragment (including [`MarkerFilter::finish`])
//!   equals the raw stream with the marker regions removed, for **any**
//!   chunking of the same logical stream;
//! - no byte of a marker, or of an unterminated marker region, is ever
//!   emitted;
//! - [`MarkerFilter::delivered`] equals exactly the concatenation of all
//!   emitted fragments.

use lumen_core::constants::{COACH_NOTES_CLOSE, COACH_NOTES_OPEN};

/// Stateful filter that strips paired marker regions from a fragment stream.
///
/// One instance per active stream; holds only per-stream state and requires
/// no cross-stream synchronization.
#[derive(Debug)]
pub struct MarkerFilter {
    open: String,
    close: String,
    buffer: String,
    inside_marker: bool,
    delivered: String,
}

impl Default for MarkerFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerFilter {
    /// Create a filter for the default coach-notes markers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_markers(COACH_NOTES_OPEN, COACH_NOTES_CLOSE)
    }

    /// Create a filter for a custom marker pair.
    #[must_use]
    pub fn with_markers(open: &str, close: &str) -> Self {
        Self {
            open: open.to_owned(),
            close: close.to_owned(),
            buffer: String::new(),
            inside_marker: false,
            delivered: String::new(),
        }
    }

    /// Feed one raw fragment, returning zero or more clean fragments.
    pub fn feed(&mut self, fragment: &str) -> Vec<String> {
        self.buffer.push_str(fragment);
        let mut out = Vec::new();

        loop {
            if self.inside_marker {
                if let Some(pos) = self.buffer.find(&self.close) {
                    // Drop the elided region and the closing marker itself.
                    let _ = self.buffer.drain(..pos + self.close.len());
                    self.inside_marker = false;
                } else {
                    // Elided content is dropped eagerly; keep only enough
                    // trailing bytes to recognize a closing marker that
                    // spans into the next fragment.
                    self.trim_buffer_to_suffix(self.close.len().saturating_sub(1));
                    break;
                }
            } else if let Some(pos) = self.buffer.find(&self.open) {
                if pos > 0 {
                    let clean: String = self.buffer[..pos].to_owned();
                    self.emit(clean, &mut out);
                }
                let _ = self.buffer.drain(..pos + self.open.len());
                self.inside_marker = true;
            } else {
                // Hold back the last open.len()-1 bytes so a partial opening
                // marker is never emitted, flush the rest.
                let keep = self.open.len().saturating_sub(1);
                if self.buffer.len() > keep {
                    let cut = floor_char_boundary(&self.buffer, self.buffer.len() - keep);
                    if cut > 0 {
                        let clean: String = self.buffer.drain(..cut).collect();
                        self.emit(clean, &mut out);
                    }
                }
                break;
            }
        }

        out
    }

    /// Signal end of stream, returning any final clean fragment.
    ///
    /// If the stream ended inside a marker region, the region never closed:
    /// everything after the opening marker is silently dropped rather than
    /// leaked.
    pub fn finish(&mut self) -> Option<String> {
        let remainder = std::mem::take(&mut self.buffer);
        if self.inside_marker || remainder.is_empty() {
            return None;
        }
        self.delivered.push_str(&remainder);
        Some(remainder)
    }

    /// Running total of all clean text emitted so far.
    ///
    /// This is the authoritative record of what the client received, used
    /// for ledger deduction.
    #[must_use]
    pub fn delivered(&self) -> &str {
        &self.delivered
    }

    /// Whether the filter is currently inside an unclosed marker region.
    #[must_use]
    pub fn inside_marker(&self) -> bool {
        self.inside_marker
    }

    fn emit(&mut self, clean: String, out: &mut Vec<String>) {
        if clean.is_empty() {
            return;
        }
        self.delivered.push_str(&clean);
        out.push(clean);
    }

    /// Drop all but the trailing `keep` bytes of the buffer (char-clamped).
    fn trim_buffer_to_suffix(&mut self, keep: usize) {
        if self.buffer.len() > keep {
            let cut = floor_char_boundary(&self.buffer, self.buffer.len() - keep);
            let _ = self.buffer.drain(..cut);
        }
    }
}

/// Largest index `<= i` that is a char boundary of `s`.
fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
