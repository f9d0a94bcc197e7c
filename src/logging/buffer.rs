/// Sizing knobs shared by both halves of a double buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Initial capacity in bytes.
    pub buffer_size: usize,
    /// Below this capacity the buffer triples, at or above it grows linearly.
    pub threshold: usize,
    pub linear_growth: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024 * 1024,
            threshold: 8 * 1024 * 1024,
            linear_growth: 1024 * 1024,
        }
    }
}

/// Growable byte region with a read and a write cursor.
///
/// Bytes are appended at the write cursor and handed out from the read cursor.
/// `0 <= read <= write <= capacity` holds at all times. Storage never shrinks;
/// `reset` rewinds both cursors and keeps the allocation for the next cycle.
#[derive(Debug)]
pub struct Buffer {
    data: Vec<u8>,
    read: usize,
    write: usize,
    config: BufferConfig,
}

impl Buffer {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            data: vec![0; config.buffer_size],
            read: 0,
            write: 0,
            config,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());

        let end = self.write + bytes.len();
        self.data[self.write..end].copy_from_slice(bytes);
        self.write = end;
    }

    /// Bytes between the read and write cursors.
    pub fn readable(&self) -> &[u8] {
        &self.data[self.read..self.write]
    }

    pub fn readable_len(&self) -> usize {
        self.write - self.read
    }

    pub fn writable_len(&self) -> usize {
        self.data.len() - self.write
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    /// Marks `len` readable bytes as handed out.
    ///
    /// Panics when `len` exceeds what is readable.
    pub fn consume(&mut self, len: usize) {
        assert!(
            len <= self.readable_len(),
            "consume of {} bytes with only {} readable",
            len,
            self.readable_len()
        );
        self.read += len;
    }

    /// Exchanges storage and cursors with `other` without copying any bytes.
    pub fn swap(&mut self, other: &mut Buffer) {
        std::mem::swap(&mut self.data, &mut other.data);
        std::mem::swap(&mut self.read, &mut other.read);
        std::mem::swap(&mut self.write, &mut other.write);
    }

    pub fn reset(&mut self) {
        self.read = 0;
        self.write = 0;
    }

    fn reserve(&mut self, len: usize) {
        let mut capacity = self.data.len();
        while capacity - self.write < len {
            capacity = if capacity == 0 {
                // an empty region can't triple its way out
                self.config.linear_growth.max(1)
            } else if capacity < self.config.threshold {
                capacity * 3
            } else {
                capacity + self.config.linear_growth.max(1)
            };
        }

        if capacity != self.data.len() {
            self.data.resize(capacity, 0);
        }
    }

    #[cfg(test)]
    fn storage_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(buffer_size: usize, threshold: usize, linear_growth: usize) -> BufferConfig {
        BufferConfig {
            buffer_size,
            threshold,
            linear_growth,
        }
    }

    #[test]
    fn grows_threefold_below_threshold() {
        let mut buffer = Buffer::new(config(16, 64, 32));
        buffer.push(&[b'a'; 10]);
        assert_eq!(buffer.capacity(), 16);

        buffer.push(&[b'b'; 10]);
        assert_eq!(buffer.capacity(), 48);
        assert_eq!(buffer.readable_len(), 20);
        assert_eq!(&buffer.readable()[..10], &[b'a'; 10]);
        assert_eq!(&buffer.readable()[10..], &[b'b'; 10]);
    }

    #[test]
    fn grows_linearly_at_threshold() {
        let mut buffer = Buffer::new(config(64, 64, 32));
        buffer.push(&[0; 60]);
        buffer.push(&[1; 10]);
        assert_eq!(buffer.capacity(), 96);

        let mut buffer = Buffer::new(config(100, 64, 32));
        buffer.push(&[0; 101]);
        assert_eq!(buffer.capacity(), 132);
    }

    #[test]
    fn exact_fit_does_not_grow() {
        let mut buffer = Buffer::new(config(16, 64, 32));
        buffer.push(&[7; 16]);
        assert_eq!(buffer.capacity(), 16);
        assert_eq!(buffer.writable_len(), 0);
    }

    #[test]
    fn keeps_growing_until_record_fits() {
        let mut buffer = Buffer::new(config(4, 64, 32));
        buffer.push(&[1; 100]);
        // 4 -> 12 -> 36 -> 108
        assert_eq!(buffer.capacity(), 108);
        assert_eq!(buffer.readable_len(), 100);
    }

    #[test]
    fn swap_hands_over_storage_without_copy() {
        let mut producer = Buffer::new(config(32, 64, 32));
        let mut consumer = Buffer::new(config(32, 64, 32));
        producer.push(b"hello");

        let producer_storage = producer.storage_ptr();
        let consumer_storage = consumer.storage_ptr();
        producer.swap(&mut consumer);

        assert_eq!(consumer.storage_ptr(), producer_storage);
        assert_eq!(producer.storage_ptr(), consumer_storage);
        assert_eq!(consumer.readable(), b"hello");
        assert!(producer.is_empty());
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut buffer = Buffer::new(config(8, 64, 32));
        buffer.push(&[1; 20]);
        let grown = buffer.capacity();

        buffer.consume(5);
        assert_eq!(buffer.readable_len(), 15);

        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), grown);
        assert_eq!(buffer.writable_len(), grown);
    }

    #[test]
    #[should_panic(expected = "consume of 4 bytes")]
    fn consume_past_readable_panics() {
        let mut buffer = Buffer::new(config(8, 64, 32));
        buffer.push(b"abc");
        buffer.consume(4);
    }

    proptest! {
        #[test]
        fn pushes_within_capacity_keep_order(chunks in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 0..32), 0..16)
        ) {
            let total: usize = chunks.iter().map(Vec::len).sum();
            let mut buffer = Buffer::new(config(total.max(1), 1024, 64));

            for chunk in &chunks {
                buffer.push(chunk);
            }

            let expected = chunks.concat();
            prop_assert_eq!(buffer.capacity(), total.max(1));
            prop_assert_eq!(buffer.readable(), expected.as_slice());
        }
    }
}
