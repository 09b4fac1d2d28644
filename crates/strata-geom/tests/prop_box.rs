use proptest::prelude::*;
use strata_geom::{Box2, Box3, IVec2, IVec3};

fn coord() -> impl Strategy<Value = i32> {
    -10_000i32..=10_000
}

fn arb_ivec3() -> impl Strategy<Value = IVec3> {
    (coord(), coord(), coord()).prop_map(|(x, y, z)| IVec3::new(x, y, z))
}

fn arb_box3() -> impl Strategy<Value = Box3> {
    (arb_ivec3(), 1i32..=64, 1i32..=64, 1i32..=64)
        .prop_map(|(min, sx, sy, sz)| Box3::new(min, min + IVec3::new(sx, sy, sz)))
}

fn arb_box2() -> impl Strategy<Value = Box2> {
    (coord(), coord(), 1i32..=64, 1i32..=64).prop_map(|(x, z, sx, sz)| {
        let min = IVec2::new(x, z);
        Box2::new(min, min + IVec2::new(sx, sz))
    })
}

proptest! {
    // Intersection is contained in both operands
    #[test]
    fn intersection_within_both(a in arb_box3(), b in arb_box3()) {
        if let Some(i) = a.intersection(&b) {
            prop_assert!(a.contains(i.min) && b.contains(i.min));
            let last = i.max - IVec3::splat(1);
            prop_assert!(a.contains(last) && b.contains(last));
        }
    }

    // A box intersected with itself is itself
    #[test]
    fn self_intersection_identity(a in arb_box3()) {
        prop_assert_eq!(a.intersection(&a), Some(a));
    }

    // Expanding then measuring adds 2*margin per axis
    #[test]
    fn expanded_size(a in arb_box2(), m in 0i32..=8) {
        prop_assert_eq!(a.expanded(m).size(), a.size() + IVec2::splat(2 * m));
    }
}
