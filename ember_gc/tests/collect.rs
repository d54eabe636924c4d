//! End-to-end collector scenarios: both collectors against the same heap,
//! exercising the behaviors that distinguish them.

use ember_gc::{GarbageCollector, GcError};
use ember_heap::{Heap, HEADER_SIZE, NODE_SIZE, REGION_SIZE, WORD_SIZE};

use std::ptr::NonNull;

const INITIAL: usize = REGION_SIZE - NODE_SIZE;

fn fixture() -> (Heap, GarbageCollector) {
    (Heap::new().expect("map failed"), GarbageCollector::new())
}

#[test]
fn fresh_region_reports_initial_capacity() {
    let (heap, _gc) = fixture();
    assert_eq!(heap.available(), INITIAL);
    assert_eq!(heap.format_free_list(), format!("Free({})->\n", INITIAL));
}

#[test]
fn cyclic_pair_survives_rc_and_falls_to_ms() {
    let (mut heap, mut gc) = fixture();

    let p1 = gc.alloc(&mut heap, 100).expect("alloc failed");
    let p2 = gc.alloc(&mut heap, 100).expect("alloc failed");
    gc.add_nested(p1, p2).expect("nested failed");
    gc.add_nested(p2, p1).expect("nested failed");

    let after_allocs = INITIAL - 2 * (100 + HEADER_SIZE);
    assert_eq!(heap.available(), after_allocs);

    gc.delete_root(p1);
    gc.delete_root(p2);

    // The mutual nested references hold both counts above zero: reference
    // counting provably cannot reclaim the cycle.
    let reclaimed = gc.rc_collect(&mut heap);
    assert!(reclaimed.is_empty());
    assert_eq!(heap.available(), after_allocs);
    assert!(gc.is_tracked(p1));
    assert!(gc.is_tracked(p2));

    // Neither block is reachable from a root: the tracer reclaims both.
    let reclaimed = gc.ms_collect(&mut heap);
    assert_eq!(reclaimed.len(), 2);
    assert_eq!(heap.available(), INITIAL);
    assert_eq!(gc.live_count(), 0);
}

#[test]
fn fill_and_drop_roots_rc_reclaims_all() {
    let (mut heap, mut gc) = fixture();

    let mut blocks = Vec::new();
    while let Some(p) = gc.alloc(&mut heap, 32) {
        blocks.push(p);
    }
    assert!(heap.available() < 32 + HEADER_SIZE);

    for &p in &blocks {
        gc.delete_root(p);
    }

    // No cycles anywhere: every count is zero and one pass drains the
    // heap back to a single free block.
    let reclaimed = gc.rc_collect(&mut heap);
    assert_eq!(reclaimed.len(), blocks.len());
    assert_eq!(heap.available(), INITIAL);
    assert_eq!(heap.format_free_list(), format!("Free({})->\n", INITIAL));
}

#[test]
fn fill_chain_and_drop_roots_ms_reclaims_all() {
    let (mut heap, mut gc) = fixture();

    let mut blocks = Vec::new();
    while let Some(p) = gc.alloc(&mut heap, 32) {
        blocks.push(p);
    }
    for window in blocks.windows(2) {
        gc.add_nested(window[0], window[1]).expect("nested failed");
    }
    for &p in &blocks {
        gc.delete_root(p);
    }

    // The whole chain is garbage once the roots are gone, links or not.
    let reclaimed = gc.ms_collect(&mut heap);
    assert_eq!(reclaimed.len(), blocks.len());
    assert_eq!(heap.available(), INITIAL);
    assert_eq!(heap.format_free_list(), format!("Free({})->\n", INITIAL));
}

#[test]
fn reclaim_lists_are_exact() {
    let (mut heap, mut gc) = fixture();

    let a = gc.alloc(&mut heap, 48).expect("alloc failed");
    let b = gc.alloc(&mut heap, 48).expect("alloc failed");
    let c = gc.alloc(&mut heap, 48).expect("alloc failed");
    let live_before = gc.live_count();

    gc.delete_root(a);
    gc.delete_root(b);

    let reclaimed = gc.rc_collect(&mut heap);
    assert_eq!(reclaimed.len(), live_before - gc.live_count());
    for &p in &reclaimed {
        assert!(!gc.is_tracked(p));
        assert!([a, b].contains(&p));
    }
    assert!(gc.is_tracked(c));

    gc.delete_root(c);
    let reclaimed = gc.ms_collect(&mut heap);
    assert_eq!(reclaimed, vec![c]);
}

#[test]
fn nested_reference_rejected_when_payload_too_small() {
    let (mut heap, mut gc) = fixture();

    let src = gc.alloc(&mut heap, 4).expect("alloc failed");
    let dst = gc.alloc(&mut heap, 64).expect("alloc failed");
    assert!(4 < WORD_SIZE);

    assert_eq!(
        gc.add_nested(src, dst),
        Err(GcError::NestedTooSmall { size: 4 })
    );
    assert_eq!(gc.ref_count(dst), Some(1));
}

#[test]
fn delete_root_on_unknown_address_is_noop() {
    let (mut heap, mut gc) = fixture();

    let p = gc.alloc(&mut heap, 64).expect("alloc failed");
    let before = heap.available();
    let unknown = NonNull::new(0xDEAD0 as *mut u8).unwrap();

    gc.delete_root(unknown);
    assert_eq!(heap.available(), before);
    assert_eq!(gc.ref_count(p), Some(1));
    assert_eq!(gc.live_count(), 1);
    assert_eq!(gc.ref_count(unknown), None);
}

#[test]
fn collectors_interleave_cleanly() {
    let (mut heap, mut gc) = fixture();

    // A rooted survivor, a dropped singleton, and a dropped cycle.
    let keep = gc.alloc(&mut heap, 64).expect("alloc failed");
    let lone = gc.alloc(&mut heap, 64).expect("alloc failed");
    let c1 = gc.alloc(&mut heap, 64).expect("alloc failed");
    let c2 = gc.alloc(&mut heap, 64).expect("alloc failed");
    gc.add_nested(c1, c2).expect("nested failed");
    gc.add_nested(c2, c1).expect("nested failed");
    gc.delete_root(lone);
    gc.delete_root(c1);
    gc.delete_root(c2);

    // RC takes the singleton, leaves the cycle.
    let reclaimed = gc.rc_collect(&mut heap);
    assert_eq!(reclaimed, vec![lone]);
    assert_eq!(gc.live_count(), 3);

    // MS takes the cycle, leaves the rooted block.
    let reclaimed = gc.ms_collect(&mut heap);
    assert_eq!(reclaimed.len(), 2);
    assert_eq!(gc.live_count(), 1);
    assert!(gc.is_tracked(keep));

    // Footprint check: one live 64-byte block, the rest free.
    assert_eq!(
        heap.available() + heap.free_block_count() * NODE_SIZE + 64 + HEADER_SIZE,
        REGION_SIZE
    );
}

#[test]
fn stats_track_allocation_and_reclamation() {
    let (mut heap, mut gc) = fixture();

    let a = gc.alloc(&mut heap, 100).expect("alloc failed");
    let _b = gc.alloc(&mut heap, 50).expect("alloc failed");
    gc.delete_root(a);
    gc.rc_collect(&mut heap);
    gc.ms_collect(&mut heap);

    let stats = gc.stats();
    assert_eq!(stats.live_objects(), 1);
    assert_eq!(
        stats
            .rc_collections
            .load(std::sync::atomic::Ordering::Relaxed),
        1
    );
    assert_eq!(
        stats
            .ms_collections
            .load(std::sync::atomic::Ordering::Relaxed),
        1
    );
    assert_eq!(
        stats
            .bytes_reclaimed
            .load(std::sync::atomic::Ordering::Relaxed),
        100
    );
}

#[test]
fn maximal_block_fits_after_full_sweep() {
    let (mut heap, mut gc) = fixture();

    let mut blocks = Vec::new();
    while let Some(p) = gc.alloc(&mut heap, 32) {
        blocks.push(p);
    }
    for &p in &blocks {
        gc.delete_root(p);
    }
    gc.ms_collect(&mut heap);
    assert_eq!(heap.available(), INITIAL);

    // One allocation spanning the whole region: the remainder is exactly
    // one zero-capacity node.
    let big = gc.alloc(&mut heap, INITIAL - HEADER_SIZE).expect("alloc failed");
    assert_eq!(heap.available(), 0);

    gc.delete_root(big);
    let reclaimed = gc.ms_collect(&mut heap);
    assert_eq!(reclaimed, vec![big]);
    assert_eq!(heap.available(), INITIAL);
}

#[test]
fn teardown_wipes_collector_and_heap() {
    let (mut heap, mut gc) = fixture();

    let p = gc.alloc(&mut heap, 64).expect("alloc failed");
    gc.add_root(p);
    gc.reset(&mut heap).expect("teardown failed");

    assert_eq!(gc.live_count(), 0);
    assert_eq!(gc.root_multiplicity(p), 0);
    assert_eq!(heap.available(), INITIAL);
}
