use strata_chunk::{ChunkContainer, OverlapMode, overlap_copy};
use strata_geom::{Box3, IVec3};

fn filled(min: IVec3, size: IVec3, margin: u32, value: u16) -> ChunkContainer {
    let mut c = ChunkContainer::new(Box3::new(min, min + size), margin);
    c.fill(value);
    c
}

#[test]
fn disjoint_boxes_are_a_no_op() {
    let src = filled(IVec3::ZERO, IVec3::splat(4), 0, 5);
    let mut dst = filled(IVec3::new(10, 0, 0), IVec3::splat(4), 0, 0);
    let before = dst.clone();
    assert_eq!(overlap_copy(&src, &mut dst, OverlapMode::Copy), 0);
    assert_eq!(dst, before);
}

#[test]
fn margins_make_touching_boxes_overlap() {
    let src = filled(IVec3::ZERO, IVec3::splat(4), 1, 5);
    let mut dst = filled(IVec3::new(4, 0, 0), IVec3::splat(4), 1, 0);
    // x in [3, 5), y and z in [-1, 5)
    assert_eq!(overlap_copy(&src, &mut dst, OverlapMode::Copy), 2 * 6 * 6);
    assert_eq!(dst.get_world(IVec3::new(3, 0, 0)), Some(5));
    assert_eq!(dst.get_world(IVec3::new(4, 2, 2)), Some(5));
    assert_eq!(dst.get_world(IVec3::new(5, 2, 2)), Some(0));
}

#[test]
fn identical_boxes_copy_everything() {
    let src = filled(IVec3::new(-3, 2, 7), IVec3::splat(3), 0, 9);
    let mut dst = filled(IVec3::new(-3, 2, 7), IVec3::splat(3), 0, 1);
    assert_eq!(overlap_copy(&src, &mut dst, OverlapMode::Copy), 27);
    assert!(dst.voxels().iter().all(|v| *v == 9));
}

#[test]
fn partial_overlap_touches_only_the_intersection() {
    let mut src = ChunkContainer::new(Box3::new(IVec3::ZERO, IVec3::splat(8)), 0);
    for x in 0..8 {
        for y in 0..8 {
            for z in 0..8 {
                src.set_world(IVec3::new(x, y, z), (1 + x + 10 * y + 100 * z) as u16);
            }
        }
    }
    let min = IVec3::new(5, -2, 3);
    let mut dst = ChunkContainer::new(Box3::new(min, min + IVec3::new(6, 4, 6)), 0);
    let n = overlap_copy(&src, &mut dst, OverlapMode::Copy);
    assert_eq!(n, 3 * 2 * 5);
    for x in 5..11 {
        for y in -2..2 {
            for z in 3..9 {
                let w = IVec3::new(x, y, z);
                let expect = if x < 8 && y >= 0 && z < 8 { src.get_world(w) } else { Some(0) };
                assert_eq!(dst.get_world(w), expect, "{w}");
            }
        }
    }
}

#[test]
fn smaller_margin_bounds_the_shared_region() {
    let src = filled(IVec3::ZERO, IVec3::splat(4), 2, 6);
    let mut dst = filled(IVec3::ZERO, IVec3::splat(4), 1, 0);
    assert_eq!(overlap_copy(&src, &mut dst, OverlapMode::Copy), 6 * 6 * 6);
    assert_eq!(dst.count_non_empty(), 216);

    let mut wide = filled(IVec3::ZERO, IVec3::splat(4), 2, 0);
    let narrow = filled(IVec3::ZERO, IVec3::splat(4), 1, 6);
    overlap_copy(&narrow, &mut wide, OverlapMode::Copy);
    assert_eq!(wide.get_world(IVec3::splat(-2)), Some(0));
    assert_eq!(wide.get_world(IVec3::splat(-1)), Some(6));
}

#[test]
fn mask_gates_target_by_source() {
    let mut mask = filled(IVec3::ZERO, IVec3::splat(2), 0, 1);
    mask.set_world(IVec3::new(0, 1, 0), 0);
    let mut dst = filled(IVec3::new(-1, 0, 0), IVec3::splat(3), 0, 4);
    overlap_copy(&mask, &mut dst, OverlapMode::Mask);
    assert_eq!(dst.get_world(IVec3::new(0, 1, 0)), Some(0));
    assert_eq!(dst.get_world(IVec3::new(-1, 1, 0)), Some(4));
    assert_eq!(dst.count_non_empty(), 26);
}
