//! Allocation, touching and retention of memory blocks.

use log::{debug, warn};
use std::alloc::{self, Layout};
use std::ops::Deref;
use std::ptr::NonNull;

/// Value written in the first byte of every block before it's retained.
pub const TOUCH_BYTE: u8 = 0x01;

/// Result of asking a [`BlockSource`] for a new block.
pub enum Allocation {
    /// The allocator returned a zeroed block which hasn't been touched yet.
    Allocated(FreshBlock),
    /// The allocator refused the request.
    Exhausted,
}

/// Something able to hand out zeroed memory blocks.
///
/// The stress loop asks its source for one block per iteration. The default source is
/// [`SystemAllocator`], other implementations can wrap it to simulate exhaustion.
pub trait BlockSource {
    /// Try to allocate a zero-initialized block of exactly `size` bytes.
    fn allocate(&mut self, size: usize) -> Allocation;
}

impl<S: BlockSource + ?Sized> BlockSource for &mut S {
    fn allocate(&mut self, size: usize) -> Allocation {
        BlockSource::allocate(*self, size)
    }
}

/// [`BlockSource`] backed by the global allocator.
///
/// Unlike `vec![0; size]`, a refused allocation is reported as [`Allocation::Exhausted`]
/// instead of aborting the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl BlockSource for SystemAllocator {
    fn allocate(&mut self, size: usize) -> Allocation {
        if size == 0 {
            warn!("refusing to allocate an empty block");
            return Allocation::Exhausted;
        }
        let layout = match Layout::array::<u8>(size) {
            Ok(layout) => layout,
            Err(err) => {
                debug!("no valid layout for a block of {size} bytes: {err}");
                return Allocation::Exhausted;
            }
        };

        // SAFETY: the layout has a non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => Allocation::Allocated(FreshBlock(RawBlock { ptr, layout })),
            None => {
                debug!("the global allocator refused a block of {size} bytes");
                Allocation::Exhausted
            }
        }
    }
}

struct RawBlock {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl RawBlock {
    fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` points to `layout.size()` zero-initialized bytes owned by this block.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: same as `as_slice`, and `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for RawBlock {
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `alloc_zeroed` with this exact layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// Block returned by the allocator, not backed by physical memory yet.
///
/// The only way to turn it into a [`Block`] that can be retained is [`FreshBlock::touch`].
pub struct FreshBlock(RawBlock);

impl FreshBlock {
    /// Write [`TOUCH_BYTE`] in the first byte of the block, forcing the kernel to commit a
    /// physical page for it.
    pub fn touch(mut self) -> Block {
        let bytes = self.0.as_mut_slice();
        // A plain store to memory nobody reads yet could be elided, leaving the page unbacked.
        // SAFETY: the reference is valid for writes of one byte.
        unsafe { std::ptr::write_volatile(&mut bytes[0], TOUCH_BYTE) };
        Block(self.0)
    }
}

/// Touched block, ready to be retained.
pub struct Block(RawBlock);

impl Deref for Block {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

/// Append-only list of the blocks allocated during a run.
///
/// Blocks are never removed: they are released only when the list itself is dropped, at the
/// end of the process.
#[derive(Default)]
pub struct RetainedBlocks {
    blocks: Vec<Block>,
}

impl RetainedBlocks {
    /// Create an empty list.
    pub fn new() -> Self {
        RetainedBlocks { blocks: Vec::new() }
    }

    /// Keep `block` alive until the list is dropped.
    ///
    /// If the list itself can't grow the block is handed back, and the caller should treat the
    /// situation as memory exhaustion.
    pub fn retain(&mut self, block: Block) -> Result<(), Block> {
        if self.blocks.try_reserve(1).is_err() {
            return Err(block);
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Number of retained blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no block was retained yet.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate over the retained blocks, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocate(size: usize) -> FreshBlock {
        match SystemAllocator.allocate(size) {
            Allocation::Allocated(block) => block,
            Allocation::Exhausted => panic!("failed to allocate {size} bytes"),
        }
    }

    #[test]
    fn test_allocated_blocks_are_zeroed() {
        let block = allocate(4096);
        assert_eq!(block.0.layout.size(), 4096);
        assert!(block.0.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_touch_writes_the_first_byte() {
        let block = allocate(8192).touch();
        assert_eq!(block.len(), 8192);
        assert_eq!(block[0], TOUCH_BYTE);
        assert!(block[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_single_byte_block() {
        let block = allocate(1).touch();
        assert_eq!(&block[..], &[TOUCH_BYTE]);
    }

    #[test]
    fn test_impossible_allocations_are_exhaustion() {
        assert!(matches!(SystemAllocator.allocate(0), Allocation::Exhausted));
        assert!(matches!(
            SystemAllocator.allocate(usize::MAX),
            Allocation::Exhausted
        ));
        // A valid layout that no machine can satisfy.
        assert!(matches!(
            SystemAllocator.allocate(isize::MAX as usize),
            Allocation::Exhausted
        ));
    }

    #[test]
    fn test_retained_blocks_grow() {
        let mut retained = RetainedBlocks::new();
        assert!(retained.is_empty());

        for expected in 1..=5 {
            assert!(retained.retain(allocate(1024).touch()).is_ok());
            assert_eq!(retained.len(), expected);
        }
        assert!(retained.iter().all(|block| block[0] == TOUCH_BYTE));
    }

    #[test]
    fn test_source_by_reference() {
        fn first_block<S: BlockSource>(mut source: S) -> Allocation {
            source.allocate(16)
        }

        let mut source = SystemAllocator;
        assert!(matches!(first_block(&mut source), Allocation::Allocated(_)));
    }
}
