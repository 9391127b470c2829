//! Lock-free sample cells
//!
//! A [`SampleBuffer`] is a fixed array of 16-bit cells that a single
//! writer (a DMA stream or a software poller) updates continuously while
//! any number of readers sample it. Readers never block and never see a
//! torn value; each read observes the most recent complete write.
//!
//! Write access is exclusive. [`SampleBuffer::claim`] hands out one
//! [`SampleWriter`] at a time and the claim is released when the writer
//! is dropped. For DMA writers the buffer also carries the one-word
//! reload buffer that a control channel reads to re-arm the sample
//! channel, so that word lives exactly as long as the cells it points at.

use portable_atomic::{AtomicBool, AtomicI16, AtomicU32, Ordering};

/// Sample cell errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CellError {
    /// Another writer already owns this buffer
    AlreadyClaimed,
    /// Buffer has no cells
    Empty,
    /// Cell index past the end of the buffer
    OutOfRange,
}

/// Fixed array of atomically updated 16-bit samples
pub struct SampleBuffer<const N: usize> {
    cells: [AtomicI16; N],
    claimed: AtomicBool,
    reload: AtomicU32,
}

/// Single-sample buffer, the common case for "latest reading" sensors
pub type SampleCell = SampleBuffer<1>;

impl<const N: usize> Default for SampleBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SampleBuffer<N> {
    /// Create a zeroed, unclaimed buffer
    pub const fn new() -> Self {
        Self {
            cells: [const { AtomicI16::new(0) }; N],
            claimed: AtomicBool::new(false),
            reload: AtomicU32::new(0),
        }
    }

    /// Number of cells
    pub const fn len(&self) -> usize {
        N
    }

    /// True for a zero-length buffer
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Latest value of one cell
    pub fn get(&self, index: usize) -> Option<i16> {
        self.cells.get(index).map(|c| c.load(Ordering::Acquire))
    }

    /// Copy of every cell
    ///
    /// Each cell is read atomically; the snapshot as a whole is not.
    pub fn snapshot(&self) -> [i16; N] {
        core::array::from_fn(|i| self.cells[i].load(Ordering::Acquire))
    }

    /// Whether a writer currently owns the buffer
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Take exclusive write access
    pub fn claim(&self) -> Result<SampleWriter<'_>, CellError> {
        if N == 0 {
            return Err(CellError::Empty);
        }
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CellError::AlreadyClaimed)?;

        Ok(SampleWriter {
            cells: &self.cells,
            claimed: &self.claimed,
            reload: &self.reload,
        })
    }
}

impl SampleBuffer<1> {
    /// Latest sample
    pub fn read(&self) -> i16 {
        self.cells[0].load(Ordering::Acquire)
    }
}

/// Addresses a DMA engine needs to stream into a claimed buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaTarget {
    /// Address of the first cell
    pub write_address: u32,
    /// Address of the word holding `write_address`, for control-channel reloads
    pub reload_word_address: u32,
    /// Halfword transfers per pass over the buffer
    pub transfers: u32,
}

/// Exclusive write handle for a [`SampleBuffer`]
///
/// Dropping the writer releases the claim.
pub struct SampleWriter<'a> {
    cells: &'a [AtomicI16],
    claimed: &'a AtomicBool,
    reload: &'a AtomicU32,
}

impl<'a> SampleWriter<'a> {
    /// Number of cells behind this writer
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; claiming an empty buffer fails
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Store a value in the first cell
    pub fn publish(&self, value: i16) {
        self.cells[0].store(value, Ordering::Release);
    }

    /// Store a value in a specific cell
    pub fn publish_at(&self, index: usize, value: i16) -> Result<(), CellError> {
        let cell = self.cells.get(index).ok_or(CellError::OutOfRange)?;
        cell.store(value, Ordering::Release);
        Ok(())
    }

    /// Prepare the buffer for a DMA writer
    ///
    /// Stores the first cell's address in the reload word and returns
    /// both addresses. The cells share `i16`'s in-memory layout, so a
    /// halfword DMA write into them is a plain store.
    pub fn dma_target(&self) -> DmaTarget {
        let write_address = self.cells.as_ptr() as usize as u32;
        self.reload.store(write_address, Ordering::Release);

        DmaTarget {
            write_address,
            reload_word_address: self.reload.as_ptr() as usize as u32,
            transfers: self.cells.len() as u32,
        }
    }
}

impl Drop for SampleWriter<'_> {
    fn drop(&mut self) {
        self.claimed.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_cell_reads_zero() {
        let cell = SampleCell::new();
        assert_eq!(cell.read(), 0);
        assert!(!cell.is_claimed());
    }

    #[test]
    fn test_claim_is_exclusive() {
        let cell = SampleCell::new();
        let writer = cell.claim().unwrap();
        assert!(cell.is_claimed());
        assert_eq!(cell.claim().err(), Some(CellError::AlreadyClaimed));
        drop(writer);
        assert!(!cell.is_claimed());
        assert!(cell.claim().is_ok());
    }

    #[test]
    fn test_publish_visible_to_reader() {
        let cell = SampleCell::new();
        let writer = cell.claim().unwrap();
        writer.publish(-1234);
        assert_eq!(cell.read(), -1234);
        writer.publish(2047);
        assert_eq!(cell.read(), 2047);
    }

    #[test]
    fn test_value_survives_release() {
        let cell = SampleCell::new();
        cell.claim().unwrap().publish(77);
        assert_eq!(cell.read(), 77);
    }

    #[test]
    fn test_ring_publish_and_snapshot() {
        let ring: SampleBuffer<4> = SampleBuffer::new();
        let writer = ring.claim().unwrap();
        for (i, v) in [10, 20, 30, 40].into_iter().enumerate() {
            writer.publish_at(i, v).unwrap();
        }
        assert_eq!(writer.publish_at(4, 50), Err(CellError::OutOfRange));
        assert_eq!(ring.snapshot(), [10, 20, 30, 40]);
        assert_eq!(ring.get(2), Some(30));
        assert_eq!(ring.get(4), None);
    }

    #[test]
    fn test_empty_buffer_cannot_be_claimed() {
        let empty: SampleBuffer<0> = SampleBuffer::new();
        assert!(empty.is_empty());
        assert_eq!(empty.claim().err(), Some(CellError::Empty));
    }

    #[test]
    fn test_dma_target_fills_reload_word() {
        let ring: SampleBuffer<8> = SampleBuffer::new();
        let writer = ring.claim().unwrap();
        let target = writer.dma_target();
        assert_eq!(target.transfers, 8);
        assert_eq!(target.write_address, ring.cells.as_ptr() as usize as u32);
        assert_eq!(ring.reload.load(Ordering::Acquire), target.write_address);
        assert_ne!(target.reload_word_address, target.write_address);
    }

    proptest! {
        #[test]
        fn prop_reader_sees_last_publish(values in proptest::collection::vec(any::<i16>(), 1..32)) {
            let cell = SampleCell::new();
            let writer = cell.claim().unwrap();
            for v in &values {
                writer.publish(*v);
            }
            prop_assert_eq!(cell.read(), *values.last().unwrap());
        }
    }
}
