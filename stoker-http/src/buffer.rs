/// Append-only byte buffer. `clear` keeps the allocation so steady-state
/// serving does not reallocate between iterations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn reserve(&mut self, additional: usize) {
        self.data.reserve(additional);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn shrink(&mut self) {
        self.data.shrink_to_fit();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::ByteBuffer;

    #[test]
    fn appends_and_clears() {
        let mut buffer = ByteBuffer::new();
        buffer.append(b"hello ");
        buffer.append(b"world");
        assert_eq!(buffer.as_slice(), b"hello world");
        assert_eq!(buffer.len(), 11);

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn clear_retains_capacity() {
        let mut buffer = ByteBuffer::with_capacity(64);
        buffer.append(&[0u8; 64]);
        buffer.clear();
        assert!(buffer.data.capacity() >= 64);
    }

    #[test]
    fn reserve_grows_capacity() {
        let mut buffer = ByteBuffer::new();
        buffer.reserve(128);
        assert!(buffer.data.capacity() >= 128);
    }
}
