/// Fixed-capacity FIFO used by the pixel pipeline.
///
/// Pushes onto a full queue are refused rather than overwriting; callers
/// check [`PixelFifo::is_empty`] / [`PixelFifo::is_full`] first.
#[derive(Clone, Debug)]
pub struct PixelFifo<T: Copy + Default, const N: usize = 8> {
    buf: [T; N],
    head: usize,
    len: usize,
}

impl<T: Copy + Default, const N: usize> PixelFifo<T, N> {
    pub fn new() -> Self {
        Self {
            buf: [T::default(); N],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    fn slot(&self, i: usize) -> usize {
        let idx = self.head + i;
        if idx >= N { idx - N } else { idx }
    }

    #[inline]
    pub fn push(&mut self, value: T) -> bool {
        if self.len == N {
            return false;
        }
        let idx = self.slot(self.len);
        self.buf[idx] = value;
        self.len += 1;
        true
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.buf[self.head];
        self.head = self.slot(1);
        self.len -= 1;
        Some(value)
    }

    /// Entry `i` positions behind the head, for in-place merging.
    pub fn get_mut(&mut self, i: usize) -> Option<&mut T> {
        if i >= self.len {
            return None;
        }
        let idx = self.slot(i);
        Some(&mut self.buf[idx])
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T: Copy + Default, const N: usize> Default for PixelFifo<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Background or window pixel as queued by the fetcher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BgPixel {
    /// 2-bit color index.
    pub color: u8,
    /// CGB palette number (0-7).
    pub palette: u8,
    /// CGB tile attribute bit 7: BG-to-OAM priority.
    pub priority: bool,
}

/// Sprite pixel as merged during an overlay fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpritePixel {
    pub color: u8,
    /// DMG: OBP0/OBP1 selector. CGB: palette 0-7.
    pub palette: u8,
    pub behind_bg: bool,
    pub oam_index: u8,
}

impl SpritePixel {
    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.color == 0
    }
}

impl Default for SpritePixel {
    fn default() -> Self {
        Self {
            color: 0,
            palette: 0,
            behind_bg: false,
            oam_index: 0xFF,
        }
    }
}
