/// Read/write pair for passes that cannot read and write the same buffer.
///
/// A pass samples `read()` and renders into `write()`; `swap()` then makes the
/// freshly written buffer the one the next pass reads.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    read: T,
    write: T,
}

impl<T> PingPong<T> {
    pub fn new(read: T, write: T) -> Self {
        Self { read, write }
    }

    pub fn read(&self) -> &T {
        &self.read
    }

    pub fn write(&self) -> &T {
        &self.write
    }

    pub fn read_mut(&mut self) -> &mut T {
        &mut self.read
    }

    pub fn write_mut(&mut self) -> &mut T {
        &mut self.write
    }

    /// Both halves at once: the source to sample and the target to fill
    pub fn split_mut(&mut self) -> (&T, &mut T) {
        (&self.read, &mut self.write)
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
    }
}
