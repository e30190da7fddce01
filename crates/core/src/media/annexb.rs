//! Annex B NAL unit scanner.
//!
//! H.264 elementary streams in byte-stream format (ITU-T H.264 Annex B)
//! delimit NAL units with start codes:
//!
//! - 4-byte: `00 00 00 01`
//! - 3-byte: `00 00 01`
//!
//! [`NalScanner`] accumulates arbitrarily chunked input and emits the bytes
//! strictly between consecutive start codes, one complete unit at a time.
//! A unit is only emitted once its trailing start code is fully visible, so
//! the emitted boundaries are identical no matter how the source bytes are
//! split across reads — including a start code split across two reads.
//!
//! End-of-stream is handled by [`NalScanner::finish`]: whatever follows the
//! final start code is the final unit, even without a trailing start code.

use crate::error::Result;

/// Read size used by [`scan`] when draining a source.
const READ_CHUNK: usize = 4096;

/// Locate the first start code at or after `from`.
///
/// Returns `(position, length)` of the start code. At any position the
/// 4-byte form is checked first, so `00 00 00 01` is never misread as a
/// 3-byte code with a stray leading zero.
fn find_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 3 <= data.len() {
        if i + 4 <= data.len() && data[i..i + 4] == [0, 0, 0, 1] {
            return Some((i, 4));
        }
        if data[i..i + 3] == [0, 0, 1] {
            return Some((i, 3));
        }
        i += 1;
    }
    None
}

/// Incremental NAL unit scanner over an Annex B byte stream.
///
/// Feed bytes with [`push`](Self::push) as they arrive; each complete unit
/// is handed to the callback and removed from the buffer. Bytes that might
/// still grow into a unit (or into a split start code) are retained.
/// Call [`finish`](Self::finish) at end-of-stream to flush the final unit.
///
/// Unit boundaries are immutable once emitted — a unit handed to the
/// callback is never re-split or re-emitted.
#[derive(Debug, Default)]
pub struct NalScanner {
    buf: Vec<u8>,
}

impl NalScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `data` and emit every unit that is now complete.
    ///
    /// Bytes before the first start code are discarded as garbage. A
    /// callback error aborts scanning and propagates; already-buffered
    /// bytes stay consumable by a later call.
    pub fn push<F>(&mut self, data: &[u8], on_unit: &mut F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        self.buf.extend_from_slice(data);

        loop {
            let Some((sc_pos, sc_len)) = find_start_code(&self.buf, 0) else {
                return Ok(());
            };
            let unit_start = sc_pos + sc_len;

            let Some((next_pos, _)) = find_start_code(&self.buf, unit_start) else {
                // Unit still growing. Drop any garbage ahead of the current
                // start code but keep everything from it onward.
                if sc_pos > 0 {
                    self.buf.drain(..sc_pos);
                }
                return Ok(());
            };

            // Zero-length units (adjacent start codes) carry no NAL header
            // and are skipped.
            if unit_start < next_pos {
                on_unit(&self.buf[unit_start..next_pos])?;
            }
            // Retain the next start code; it delimits the following unit.
            self.buf.drain(..next_pos);
        }
    }

    /// Flush the final unit at end-of-stream.
    ///
    /// The bytes after the last seen start code form the final unit even
    /// though no trailing start code follows. A buffer with no start code
    /// at all emits nothing. The scanner is left empty either way.
    pub fn finish<F>(&mut self, on_unit: &mut F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        // Drain any still-complete units first.
        self.push(&[], on_unit)?;

        if let Some((sc_pos, sc_len)) = find_start_code(&self.buf, 0) {
            let unit_start = sc_pos + sc_len;
            if unit_start < self.buf.len() {
                on_unit(&self.buf[unit_start..])?;
            }
        }
        self.buf.clear();
        Ok(())
    }
}

/// Scan a media source to exhaustion, emitting each NAL unit via `on_unit`.
///
/// Reads in [`READ_CHUNK`]-sized chunks. A read error aborts the scan and
/// propagates; end-of-stream is not an error and triggers the final-unit
/// flush. A callback error likewise aborts and propagates.
pub fn scan<R, F>(mut source: R, mut on_unit: F) -> Result<()>
where
    R: std::io::Read,
    F: FnMut(&[u8]) -> Result<()>,
{
    let mut scanner = NalScanner::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        scanner.push(&chunk[..n], &mut on_unit)?;
    }

    tracing::trace!("media source reached end of stream");
    scanner.finish(&mut on_unit)
}
