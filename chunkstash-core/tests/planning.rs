use chunkstash_core::planner::{plan, ChunkRange};
use proptest::prelude::*;

#[test]
fn single_chunk_when_file_fits() {
    let r = plan(100, 250).unwrap();
    assert_eq!(r, vec![ChunkRange { start: 0, end: 99 }]);
}

#[test]
fn exact_multiple_has_no_tail() {
    let r = plan(512, 256).unwrap();
    assert_eq!(r.len(), 2);
    assert_eq!(r[0], ChunkRange { start: 0, end: 255 });
    assert_eq!(r[1], ChunkRange { start: 256, end: 511 });
}

#[test]
fn six_hundred_mib_at_250_mib_chunks() {
    // 600 MiB file, 250 MiB chunks: two full chunks and a 100 MiB tail.
    let r = plan(629_145_600, 262_144_000).unwrap();
    assert_eq!(
        r,
        vec![
            ChunkRange { start: 0, end: 262_143_999 },
            ChunkRange { start: 262_144_000, end: 524_287_999 },
            ChunkRange { start: 524_288_000, end: 629_145_599 },
        ]
    );
}

#[test]
fn zero_inputs_rejected() {
    assert!(plan(0, 256).is_err());
    assert!(plan(256, 0).is_err());
}

proptest! {
    // plan() must produce an exact partition of [0, total) for any inputs.
    #[test]
    fn plan_partitions_the_file(total in 1u64..2_000_000, chunk in 1u64..100_000) {
        let ranges = plan(total, chunk).unwrap();
        prop_assert_eq!(ranges[0].start, 0);
        prop_assert_eq!(ranges.last().unwrap().end, total - 1);
        for w in ranges.windows(2) {
            prop_assert_eq!(w[1].start, w[0].end + 1);
        }
        for r in &ranges {
            prop_assert!(r.len() <= chunk);
        }
        let covered: u64 = ranges.iter().map(|r| r.len()).sum();
        prop_assert_eq!(covered, total);
    }

    #[test]
    fn only_the_tail_may_be_short(total in 1u64..2_000_000, chunk in 1u64..100_000) {
        let ranges = plan(total, chunk).unwrap();
        for r in &ranges[..ranges.len() - 1] {
            prop_assert_eq!(r.len(), chunk);
        }
    }
}
