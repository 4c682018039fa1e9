//! Length-prefixed derivation transcripts.
//!
//! Every CARROT hash input starts with the one-byte length of the ASCII
//! domain separator, then the separator itself, then the concatenated
//! arguments in their canonical little-endian encodings.

/// Incremental transcript builder.
pub(crate) struct Transcript {
    bytes: Vec<u8>,
}

impl Transcript {
    /// Start a transcript with a domain separator.
    pub fn new(domain: &str) -> Self {
        debug_assert!(domain.is_ascii());
        debug_assert!(domain.len() < 256);
        let mut bytes = Vec::with_capacity(1 + domain.len() + 96);
        bytes.push(domain.len() as u8);
        bytes.extend_from_slice(domain.as_bytes());
        Transcript { bytes }
    }

    /// Append raw bytes.
    pub fn push(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    /// Append a little-endian u32 (subaddress indices).
    pub fn push_u32(self, v: u32) -> Self {
        let bytes = v.to_le_bytes();
        let mut t = self;
        t.bytes.extend_from_slice(&bytes);
        t
    }

    /// Append a little-endian u64 (amounts).
    pub fn push_u64(self, v: u64) -> Self {
        let bytes = v.to_le_bytes();
        let mut t = self;
        t.bytes.extend_from_slice(&bytes);
        t
    }

    /// Finish and take the transcript bytes.
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}
