use std::{collections::HashSet, ptr::NonNull};

use proptest::prelude::*;
use slabloc::{Heap, Pool, PoolConfig, Router, SizeClass};

fn pool(size: usize, blocks_per_buffer: usize) -> Pool<Heap> {
    Pool::with_config(PoolConfig::new(SizeClass::new(size, blocks_per_buffer)).detect_double_free(true))
}

/// Fills the block with a byte derived from its index so later checks can
/// detect two live blocks overlapping.
unsafe fn stamp(block: NonNull<[u8]>, tag: u8) {
    block.cast::<u8>().as_ptr().write_bytes(tag, block.len());
}

unsafe fn verify(block: NonNull<[u8]>, tag: u8) -> bool {
    std::slice::from_raw_parts(block.cast::<u8>().as_ptr(), block.len())
        .iter()
        .all(|byte| *byte == tag)
}

#[test]
fn reference_classes_grow_once_past_a_full_buffer() {
    for class in SizeClass::DEFAULT_CLASSES {
        let mut router = Router::with_default_config();
        let k = class.blocks_per_buffer;
        let mut addresses = HashSet::new();

        for _ in 0..k {
            addresses.insert(router.allocate(class.size).unwrap().cast::<u8>());
        }
        assert_eq!(router.pool_for(class.size).unwrap().num_buffers(), 1);

        addresses.insert(router.allocate(class.size).unwrap().cast::<u8>());
        assert_eq!(router.pool_for(class.size).unwrap().num_buffers(), 2);
        assert_eq!(addresses.len(), k + 1);
    }
}

#[test]
fn thousand_small_blocks() {
    let mut router = Router::with_default_config();
    let blocks: Vec<NonNull<[u8]>> = (0..1000).map(|_| router.allocate(15).unwrap()).collect();

    for (i, block) in blocks.iter().enumerate() {
        unsafe { stamp(*block, i as u8) };
    }
    for (i, block) in blocks.iter().enumerate() {
        assert!(unsafe { verify(*block, i as u8) });
    }

    assert_eq!(router.pool_for(15).unwrap().num_buffers(), 250);

    for block in blocks {
        router.release(Some(block.cast()));
    }
    assert_eq!(router.pool_for(15).unwrap().blocks_in_use(), 0);
}

#[test]
fn mixed_release_order() {
    let mut router = Router::with_default_config();
    let a = router.allocate(15).unwrap();
    let b = router.allocate(180).unwrap();
    let c = router.allocate(15).unwrap();
    let d = router.allocate(180).unwrap();

    for block in [c, b, a, d] {
        router.release(Some(block.cast()));
    }

    for pool in router.pools() {
        assert_eq!(pool.blocks_in_use(), 0);
    }
}

#[derive(Debug, Clone)]
enum Op {
    Allocate,
    /// Release the live block at this position, modulo the number of live
    /// blocks.
    Release(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Allocate),
        2 => any::<usize>().prop_map(Op::Release),
    ]
}

proptest! {
    #[test]
    fn growth_count_is_ceil_of_allocations(
        size in 1usize..512,
        blocks_per_buffer in 1usize..16,
        n in 0usize..200,
    ) {
        let mut pool = pool(size, blocks_per_buffer);
        let mut addresses = HashSet::new();

        for _ in 0..n {
            let block = pool.allocate(size).unwrap();
            prop_assert!(addresses.insert(block.cast::<u8>()));
        }

        prop_assert_eq!(pool.num_buffers(), n.div_ceil(blocks_per_buffer));
        prop_assert_eq!(pool.blocks_in_use(), n);
    }

    #[test]
    fn live_blocks_never_overlap(
        blocks_per_buffer in 1usize..8,
        ops in prop::collection::vec(arb_op(), 1..200),
    ) {
        let mut pool = pool(24, blocks_per_buffer);
        let mut live: Vec<(NonNull<[u8]>, u8)> = Vec::new();
        let mut tag = 0u8;

        for op in ops {
            match op {
                Op::Allocate => {
                    let block = pool.allocate(24).unwrap();
                    prop_assert!(live.iter().all(|(other, _)| other.cast::<u8>() != block.cast::<u8>()));
                    tag = tag.wrapping_add(1);
                    unsafe { stamp(block, tag) };
                    live.push((block, tag));
                }
                Op::Release(index) if !live.is_empty() => {
                    let (block, _) = live.swap_remove(index % live.len());
                    prop_assert!(pool.try_release(Some(block.cast())).is_ok());
                }
                Op::Release(_) => {}
            }

            for (block, tag) in &live {
                let intact = unsafe { verify(*block, *tag) };
                prop_assert!(intact, "block {:?} was overwritten", block);
            }
            prop_assert_eq!(pool.blocks_in_use(), live.len());
            prop_assert_eq!(
                pool.num_free_blocks() + live.len(),
                pool.num_buffers() * blocks_per_buffer
            );
        }
    }

    #[test]
    fn release_then_allocate_returns_same_block(
        blocks_per_buffer in 1usize..8,
        before in 1usize..20,
        pick in any::<usize>(),
    ) {
        let mut pool = pool(15, blocks_per_buffer);
        let blocks: Vec<NonNull<[u8]>> = (0..before).map(|_| pool.allocate(15).unwrap()).collect();
        let released = blocks[pick % blocks.len()];
        let buffers = pool.num_buffers();

        pool.release(Some(released.cast())).unwrap();
        let reused = pool.allocate(15).unwrap();

        prop_assert_eq!(reused.cast::<u8>(), released.cast::<u8>());
        prop_assert_eq!(pool.num_buffers(), buffers);
    }

    #[test]
    fn teardown_behaves_like_fresh_pool(
        blocks_per_buffer in 1usize..8,
        n in 1usize..40,
    ) {
        let mut pool = pool(180, blocks_per_buffer);
        for _ in 0..n {
            pool.allocate(180).unwrap();
        }

        pool.teardown();
        prop_assert_eq!(pool.num_buffers(), 0);
        prop_assert_eq!(pool.num_free_blocks(), 0);

        pool.allocate(180).unwrap();
        prop_assert_eq!(pool.num_buffers(), 1);
        prop_assert_eq!(pool.num_free_blocks(), blocks_per_buffer - 1);
    }
}
