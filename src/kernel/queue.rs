// Scan requests and the fixed-capacity FIFO they wait in
// NOTE: No dynamic allocation, capacity is a const generic

use core::fmt;

use crate::radio::{ChannelMask, ScanDuration, ScanKind};

/// One scan someone asked for, plus where its results go.
#[derive(Debug, Clone)]
pub struct ScanRequest<H> {
    pub kind: ScanKind,
    pub channels: ChannelMask,
    pub duration: ScanDuration,
    pub handler: H,
}

impl<H> ScanRequest<H> {
    pub const fn new(
        kind: ScanKind,
        channels: ChannelMask,
        duration: ScanDuration,
        handler: H,
    ) -> Self {
        Self {
            kind,
            channels,
            duration,
            handler,
        }
    }

    pub const fn energy(channels: ChannelMask, duration: ScanDuration, handler: H) -> Self {
        Self::new(ScanKind::Energy, channels, duration, handler)
    }

    pub const fn active(channels: ChannelMask, duration: ScanDuration, handler: H) -> Self {
        Self::new(ScanKind::Active, channels, duration, handler)
    }
}

/// Queue was full, contains the rejected request
pub struct QueueFull<H>(pub ScanRequest<H>);

impl<H> QueueFull<H> {
    pub fn into_request(self) -> ScanRequest<H> {
        self.0
    }
}

// hand-written so H doesn't need Debug
impl<H> fmt::Debug for QueueFull<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueFull")
            .field("kind", &self.0.kind)
            .field("channels", &self.0.channels)
            .finish_non_exhaustive()
    }
}

impl<H> fmt::Display for QueueFull<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan queue full, rejected {} scan", self.0.kind)
    }
}

impl<H> core::error::Error for QueueFull<H> {}

// ring buffer, the only place that does index arithmetic
pub struct RequestQueue<T, const N: usize> {
    buf: [Option<T>; N],
    head: usize, // next to read
    len: usize,
}

impl<T, const N: usize> RequestQueue<T, N> {
    pub const fn new() -> Self {
        Self {
            buf: [const { None }; N],
            head: 0,
            len: 0,
        }
    }

    // slot `offset` places behind the head
    const fn slot(&self, offset: usize) -> usize {
        (self.head + offset) % N
    }

    /// Append at the tail, handing the item back when full.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.len >= N {
            return Err(item);
        }
        let tail = self.slot(self.len);
        self.buf[tail] = Some(item);
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.buf[self.head].take();
        self.head = self.slot(1);
        self.len -= 1;
        item
    }

    pub fn peek(&self) -> Option<&T> {
        self.iter().next()
    }

    pub fn peek_mut(&mut self) -> Option<&mut T> {
        if self.len == 0 {
            None
        } else {
            self.buf[self.head].as_mut()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn clear(&mut self) {
        while self.pop().is_some() {}
        self.head = 0;
    }

    /// Head first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).filter_map(move |i| self.buf[self.slot(i)].as_ref())
    }
}

impl<T, const N: usize> Default for RequestQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
