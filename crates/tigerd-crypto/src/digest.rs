/// SHA-2 output size selected by a JOSE algorithm suffix (`256`, `384`, `512`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashSize {
    Sha256,
    Sha384,
    Sha512,
}

impl HashSize {
    /// Digest length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            HashSize::Sha256 => 32,
            HashSize::Sha384 => 48,
            HashSize::Sha512 => 64,
        }
    }
}
