use crate::error::SmallError;

pub struct SmallWriter {
    buf: Vec<u8>,
}

impl SmallWriter {
    /// Create a new `SmallWriter` with an empty buffer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Create a new `SmallWriter` with a buffer of the given capacity.
    pub fn new_reserved(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn write<T: Serializeable>(&mut self, obj: &T, reference: &T::Reference) {
        obj.encode(self, reference);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Pad the buffer with zeros to the given size. Note that the
    /// writer is cleared after this operation.
    pub fn to_padded_bytes(&mut self, size: usize) -> Result<Vec<u8>, SmallError> {
        if self.buf.len() > size {
            return Err(SmallError::new(&format!(
                "buffer size is larger than the given size: {} > {}",
                self.buf.len(),
                size
            )));
        }

        self.buf.resize(size, 0);
        Ok(std::mem::take(&mut self.buf))
    }
}

pub struct SmallReader<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> SmallReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    pub fn read_exact(&mut self, bytes_count: usize) -> Result<&'a [u8], SmallError> {
        let start = self.cursor;
        let end = self.cursor + bytes_count;

        // boundary check
        if end > self.buf.len() {
            return Err(SmallError::new(&format!(
                "read out of boundary: {}..{} of {}",
                start,
                end,
                self.buf.len()
            )));
        }

        self.cursor = end;
        Ok(&self.buf[start..end])
    }

    pub fn skip(&mut self, bytes_count: usize) -> Result<(), SmallError> {
        self.read_exact(bytes_count).map(|_| ())
    }
}

/// Encoding and decoding both need some outside knowledge (e.g. a
/// cell needs its type, a tuple needs its schema), which is passed as
/// `Reference`.
pub trait Serializeable: Sized {
    type Reference;

    fn encode(&self, writer: &mut SmallWriter, reference: &Self::Reference);

    fn decode(reader: &mut SmallReader, reference: &Self::Reference) -> Result<Self, SmallError>;

    fn to_bytes(&self, reference: &Self::Reference) -> Vec<u8> {
        let mut writer = SmallWriter::new();
        self.encode(&mut writer, reference);
        writer.into_bytes()
    }
}
