//! Tests for the vertex cache and primitive assembly.

use n64gl_core::assembly::{Primitive, PrimitiveAssembler};
use n64gl_core::cache::{VertexCache, VERTEX_CACHE_SIZE};
use n64gl_core::PrimitiveMode;

/// Feed slots `0..count` and collect the emitted primitives.
fn assemble(mode: PrimitiveMode, count: u8) -> (PrimitiveAssembler, Vec<Vec<u8>>) {
    let mut assembler = PrimitiveAssembler::new(mode);
    let mut prims = Vec::new();
    for slot in 0..count {
        if assembler.take_lock_request() {
            assembler.set_locked_vertex(slot);
        }
        if let Some(prim) = assembler.submit(slot) {
            prims.push(prim.indices().to_vec());
        }
    }
    (assembler, prims)
}

// ============================================================================
// Vertex cache
// ============================================================================

mod cache_tests {
    use super::*;

    /// Deterministic identity stream with plenty of reuse.
    fn identities(n: usize) -> Vec<u32> {
        let mut seed = 0x1234_5678u32;
        (0..n)
            .map(|_| {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (seed >> 16) % 48
            })
            .collect()
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = VertexCache::default();
        // Most recently used last.
        let mut oracle: Vec<u32> = Vec::new();

        for id in identities(2000) {
            let before: Vec<Option<u32>> = (0..VERTEX_CACHE_SIZE).map(|s| cache.identity(s)).collect();
            let (slot, hit) = cache.get_cache_slot(id);

            let expected_hit = oracle.contains(&id);
            assert_eq!(hit, expected_hit, "hit mismatch for id {id}");

            if expected_hit {
                oracle.retain(|&x| x != id);
            } else {
                let evicted = if oracle.len() == VERTEX_CACHE_SIZE {
                    Some(oracle.remove(0))
                } else {
                    None
                };
                assert_eq!(
                    before[slot], evicted,
                    "miss on {id} evicted {:?}, expected {evicted:?}",
                    before[slot]
                );
            }
            oracle.push(id);

            assert_eq!(cache.identity(slot), Some(id));
            assert!(cache.resident() <= VERTEX_CACHE_SIZE);
        }
    }

    #[test]
    fn hit_returns_same_slot() {
        let mut cache = VertexCache::default();
        let (slot, hit) = cache.get_cache_slot(7);
        assert!(!hit);
        let (again, hit) = cache.get_cache_slot(7);
        assert!(hit);
        assert_eq!(slot, again);
    }

    #[test]
    fn locked_slot_survives_eviction() {
        let mut cache = VertexCache::default();
        let (locked, _) = cache.get_locked_cache_slot(1000);
        for id in 0..(VERTEX_CACHE_SIZE as u32 * 3) {
            let (slot, _) = cache.get_cache_slot(id);
            assert_ne!(slot, locked, "locked slot reused for {id}");
        }
        assert_eq!(cache.identity(locked), Some(1000));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut cache = VertexCache::default();
        cache.get_locked_cache_slot(1);
        cache.get_cache_slot(2);
        cache.reset();
        assert_eq!(cache.resident(), 0);
        let (_, hit) = cache.get_cache_slot(1);
        assert!(!hit);
    }
}

// ============================================================================
// Primitive assembly
// ============================================================================

mod assembler_tests {
    use super::*;

    fn area(p: [(f32, f32); 3]) -> f32 {
        let [a, b, c] = p;
        a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1)
    }

    #[test]
    fn triangle_fan() {
        let (_, prims) = assemble(PrimitiveMode::TriangleFan, 5);
        assert_eq!(prims, vec![vec![0, 1, 2], vec![0, 2, 3], vec![0, 3, 4]]);
    }

    #[test]
    fn polygon_is_a_fan() {
        let (_, prims) = assemble(PrimitiveMode::Polygon, 4);
        assert_eq!(prims, vec![vec![0, 1, 2], vec![0, 2, 3]]);
    }

    #[test]
    fn triangles_are_independent() {
        let (_, prims) = assemble(PrimitiveMode::Triangles, 7);
        assert_eq!(prims, vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn triangle_strip_keeps_winding() {
        let (_, prims) = assemble(PrimitiveMode::TriangleStrip, 5);
        assert_eq!(prims, vec![vec![0, 1, 2], vec![2, 1, 3], vec![2, 3, 4]]);
    }

    #[test]
    fn quads_split_into_two_triangles() {
        let (_, prims) = assemble(PrimitiveMode::Quads, 8);
        assert_eq!(
            prims,
            vec![vec![0, 1, 2], vec![0, 2, 3], vec![4, 5, 6], vec![4, 6, 7]]
        );
    }

    #[test]
    fn quad_strip_triangles_share_orientation() {
        // Bottom row on even vertices, top row on odd ones.
        let positions = [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0), (2.0, 0.0), (2.0, 1.0)];
        let (_, prims) = assemble(PrimitiveMode::QuadStrip, 6);
        assert_eq!(prims.len(), 4, "two quads make four triangles");

        let areas: Vec<f32> = prims
            .iter()
            .map(|p| area([positions[p[0] as usize], positions[p[1] as usize], positions[p[2] as usize]]))
            .collect();
        assert!(areas.iter().all(|&a| a != 0.0));
        assert!(
            areas.iter().all(|&a| a.signum() == areas[0].signum()),
            "mixed winding: {areas:?}"
        );
    }

    #[test]
    fn line_strip_and_loop() {
        let (_, strip) = assemble(PrimitiveMode::LineStrip, 4);
        assert_eq!(strip, vec![vec![0, 1], vec![1, 2], vec![2, 3]]);

        let (mut assembler, lines) = assemble(PrimitiveMode::LineLoop, 3);
        assert_eq!(lines, vec![vec![0, 1], vec![1, 2]]);
        let closing = assembler.closing_edge().expect("loop must close");
        assert_eq!(closing.indices(), &[2, 0]);
    }

    #[test]
    fn line_loop_with_one_vertex_does_not_close() {
        let (mut assembler, lines) = assemble(PrimitiveMode::LineLoop, 1);
        assert!(lines.is_empty());
        assert_eq!(assembler.closing_edge(), None);
    }

    #[test]
    fn closing_edge_only_for_line_loop() {
        let (mut assembler, _) = assemble(PrimitiveMode::LineStrip, 3);
        assert_eq!(assembler.closing_edge(), None);
    }

    #[test]
    fn points_emit_every_vertex() {
        let (_, prims) = assemble(PrimitiveMode::Points, 3);
        assert_eq!(prims, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn lock_requested_only_for_loops_and_fans() {
        for mode in [PrimitiveMode::LineLoop, PrimitiveMode::TriangleFan, PrimitiveMode::Polygon] {
            let mut assembler = PrimitiveAssembler::new(mode);
            assert!(assembler.take_lock_request(), "{mode:?}");
            assert!(!assembler.take_lock_request(), "{mode:?} lock is consumed");
        }
        let mut assembler = PrimitiveAssembler::new(PrimitiveMode::Triangles);
        assert!(!assembler.take_lock_request());
    }

    #[test]
    fn immediate_ids_restart_per_block() {
        let mut assembler = PrimitiveAssembler::new(PrimitiveMode::Triangles);
        let first = assembler.next_id();
        assert_eq!(assembler.next_id(), first + 1);
        assembler.init(PrimitiveMode::Triangles);
        assert_eq!(assembler.next_id(), first);
    }

    #[test]
    fn primitive_mode_from_gl() {
        assert_eq!(PrimitiveMode::from_gl(0x0007), Ok(PrimitiveMode::Quads));
        assert!(PrimitiveMode::from_gl(0x000A).is_err());
        assert_eq!(Primitive::new(&[4, 5]).len(), 2);
    }
}
