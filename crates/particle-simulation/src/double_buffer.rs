//! Two equally-sized regions and the parity bit that says which one is current.
//!
//! The compute stage reads the current region and writes the other one; after
//! the frame the parity flips, so the region just written becomes current for
//! both the next dispatch and the renderer. Reads and writes never share a
//! region within one dispatch, so no locking is needed.

/// 0/1 flag selecting the region that is "current" this frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Parity(u8);

impl Parity {
    pub const EVEN: Self = Self(0);
    pub const ODD: Self = Self(1);

    /// Parity after `frame` completed frames
    pub fn from_frame(frame: u64) -> Self {
        Self((frame % 2) as u8)
    }

    /// Region read by the compute stage
    pub fn read_index(self) -> usize {
        self.0 as usize
    }

    /// Region written by the compute stage (and drawn afterwards)
    pub fn write_index(self) -> usize {
        (self.0 as usize + 1) % 2
    }

    pub fn flipped(self) -> Self {
        Self(1 - self.0)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

#[derive(Debug)]
pub struct DoubleBuffer<T> {
    regions: [T; 2],
    parity: Parity,
}

impl<T> DoubleBuffer<T> {
    pub fn new(first: T, second: T) -> Self {
        Self {
            regions: [first, second],
            parity: Parity::EVEN,
        }
    }

    /// Build both regions with `make(index)`
    pub fn from_fn(make: impl FnMut(usize) -> T) -> Self {
        Self {
            regions: std::array::from_fn(make),
            parity: Parity::EVEN,
        }
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    pub fn current(&self) -> &T {
        &self.regions[self.parity.read_index()]
    }

    pub fn next(&self) -> &T {
        &self.regions[self.parity.write_index()]
    }

    /// Current region (read-only) and next region (writable) at the same time
    pub fn split(&mut self) -> (&T, &mut T) {
        let (first, second) = self.regions.split_at_mut(1);
        if self.parity == Parity::EVEN {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    pub fn region(&self, index: usize) -> &T {
        &self.regions[index]
    }

    pub fn regions(&self) -> &[T; 2] {
        &self.regions
    }

    /// Flip parity; the region just written becomes current
    pub fn advance(&mut self) -> Parity {
        self.parity = self.parity.flipped();
        self.parity
    }
}
