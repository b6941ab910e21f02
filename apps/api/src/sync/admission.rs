//! Size admission control for saves.

use std::io;

use crate::cv::CvDocument;

/// Default upper bound on the serialized document, in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 7500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted { size: usize },
    TooLarge { size: usize, limit: usize },
}

/// Checks the canonical serialization of `doc` against `limit`.
/// Only the byte count is kept; the store serializes the document itself.
pub fn admit(doc: &CvDocument, limit: usize) -> Result<Admission, serde_json::Error> {
    let size = canonical_size(doc)?;
    if size > limit {
        return Ok(Admission::TooLarge { size, limit });
    }
    Ok(Admission::Admitted { size })
}

/// Byte length of the canonical JSON, counted without buffering it.
fn canonical_size(doc: &CvDocument) -> Result<usize, serde_json::Error> {
    let mut counter = ByteCounter(0);
    serde_json::to_writer(&mut counter, doc)?;
    Ok(counter.0)
}

struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
