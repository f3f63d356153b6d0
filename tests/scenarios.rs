//! End-to-end scenarios exercising the whole builder on small, hand-built
//! maps.

use ddbsp::initial::build_initial_mesh;
use ddbsp::mapdata::{LineDef, LinedefFlags, MapDescription, Sector, SideDef, Vertex};
use ddbsp::output::Tree;
use ddbsp::NodeBuilder;

fn vertex(x: f64, y: f64) -> Vertex {
    Vertex { x, y }
}

fn one_sided(v1: usize, v2: usize, sidedef: usize) -> LineDef {
    LineDef { v1, v2, flags: LinedefFlags::IMPASSABLE, special: 0, tag: 0, front_sidedef: Some(sidedef), back_sidedef: None }
}

fn two_sided(v1: usize, v2: usize, front: usize, back: usize) -> LineDef {
    LineDef { v1, v2, flags: LinedefFlags::TWO_SIDED, special: 0, tag: 0, front_sidedef: Some(front), back_sidedef: Some(back) }
}

fn sidedef(sector: usize) -> SideDef {
    SideDef { sector, x_offset: 0, y_offset: 0, upper_texture: String::new(), lower_texture: String::new(), middle_texture: String::new() }
}

fn sector(tag: i32) -> Sector {
    Sector { floor_height: 0, ceiling_height: 128, floor_texture: String::new(), ceiling_texture: String::new(), light_level: 192, special: 0, tag }
}

fn count_tree(tree: &Tree, nodes: &mut u32, leaves: &mut u32) {
    match tree {
        Tree::Leaf(_) => *leaves += 1,
        Tree::Node(n) => {
            *nodes += 1;
            count_tree(&n.right, nodes, leaves);
            count_tree(&n.left, nodes, leaves);
        }
    }
}

/// S1 — a single closed square room needs no partitioning at all.
#[test]
fn s1_single_square_room_builds_a_single_leaf() {
    let map = MapDescription {
        vertices: vec![vertex(0.0, 0.0), vertex(256.0, 0.0), vertex(256.0, 256.0), vertex(0.0, 256.0)],
        linedefs: (0..4).map(|i| one_sided(i, (i + 1) % 4, i)).collect(),
        sidedefs: (0..4).map(|_| sidedef(0)).collect(),
        sectors: vec![sector(0)],
    };

    let built = NodeBuilder::new(7).unwrap().build(&map).unwrap();
    assert!(matches!(built.tree, Tree::Leaf(_)));
    assert_eq!(built.faces.len(), 1);
    assert_eq!(built.faces[0].sector, Some(0));
    assert!(built.diagnostics.unclosed.is_empty());
    assert!(built.diagnostics.mismatches.is_empty());
}

/// S2 — two rooms sharing one two-sided linedef (a "door") split cleanly
/// along that linedef's line into exactly two convex leaves, one per
/// sector, with no mini-edges needed.
#[test]
fn s2_two_rooms_joined_by_a_door_split_into_two_leaves() {
    // Room A: (0,0)-(256,0)-(256,96)-(256,160)-(256,256)-(0,256), a
    // rectangle whose right edge is split into wall/door/wall.
    // Room B: (256,96)-(512,96)-(512,160)-(256,160), sharing the door edge.
    let vertices = vec![
        vertex(0.0, 0.0),     // 0 = A0
        vertex(256.0, 0.0),   // 1 = A1
        vertex(256.0, 96.0),  // 2 = A2 = B0
        vertex(256.0, 160.0), // 3 = A3 = B3
        vertex(256.0, 256.0), // 4 = A4
        vertex(0.0, 256.0),   // 5 = A5
        vertex(512.0, 96.0),  // 6 = B1
        vertex(512.0, 160.0), // 7 = B2
    ];
    let linedefs = vec![
        one_sided(0, 1, 0),  // A0->A1
        one_sided(1, 2, 1),  // A1->A2
        two_sided(2, 3, 2, 3), // A2->A3, the door: front=sector A, back=sector B
        one_sided(3, 4, 4),  // A3->A4
        one_sided(4, 5, 5),  // A4->A5
        one_sided(5, 0, 6),  // A5->A0
        one_sided(2, 6, 7),  // A2->B1
        one_sided(6, 7, 8),  // B1->B2
        one_sided(7, 3, 9),  // B2->A3
    ];
    let sidedefs = vec![
        sidedef(0), // 0 front of A0-A1
        sidedef(0), // 1 front of A1-A2
        sidedef(0), // 2 front of door, sector A
        sidedef(1), // 3 back of door, sector B
        sidedef(0), // 4 front of A3-A4
        sidedef(0), // 5 front of A4-A5
        sidedef(0), // 6 front of A5-A0
        sidedef(1), // 7 front of A2-B1
        sidedef(1), // 8 front of B1-B2
        sidedef(1), // 9 front of B2-A3
    ];
    let map = MapDescription { vertices, linedefs, sidedefs, sectors: vec![sector(0), sector(1)] };

    let built = NodeBuilder::new(7).unwrap().build(&map).unwrap();

    let (mut nodes, mut leaves) = (0, 0);
    count_tree(&built.tree, &mut nodes, &mut leaves);
    assert_eq!(nodes, 1, "two disjoint convex rooms should need exactly one partition");
    assert_eq!(leaves, 2);
    assert_eq!(built.faces.len(), 2);

    let sectors: std::collections::HashSet<_> = built.faces.iter().filter_map(|f| f.sector).collect();
    assert_eq!(sectors, std::collections::HashSet::from([0, 1]));
    assert!(built.diagnostics.unclosed.is_empty());
    assert!(built.diagnostics.mismatches.is_empty());
}

/// S3 — a concave L-shaped room must be split; the split introduces a
/// mini-edge pair bordering the same sector on both sides.
#[test]
fn s3_concave_l_shape_splits_with_a_same_sector_mini_edge() {
    let vertices = vec![
        vertex(0.0, 0.0),
        vertex(256.0, 0.0),
        vertex(256.0, 128.0),
        vertex(128.0, 128.0),
        vertex(128.0, 256.0),
        vertex(0.0, 256.0),
    ];
    let linedefs: Vec<LineDef> = (0..6).map(|i| one_sided(i, (i + 1) % 6, i)).collect();
    let sidedefs = (0..6).map(|_| sidedef(0)).collect();
    let map = MapDescription { vertices, linedefs, sidedefs, sectors: vec![sector(0)] };

    let built = NodeBuilder::new(7).unwrap().build(&map).unwrap();

    assert!(matches!(built.tree, Tree::Node(_)), "a concave boundary cannot stay a single leaf");
    let real_count = built.hedges.iter().filter(|h| h.sidedef.is_some()).count();
    assert_eq!(real_count, 6, "every original linedef keeps exactly one real half-edge");

    for face in &built.faces {
        assert_eq!(face.sector, Some(0));
    }
    assert!(built.diagnostics.unclosed.is_empty());
    assert!(built.diagnostics.mismatches.is_empty());
}

/// S4 — a one-sided linedef touching an odd number of one-sided neighbours
/// at a vertex gets its missing back sector synthesized from an
/// axis-aligned probe (the "window effect").
#[test]
fn s4_window_effect_synthesizes_a_back_sector() {
    let vertices = vec![
        vertex(0.0, 0.0),   // 0 bottom-left of the room
        vertex(50.0, 0.0),  // 1 the odd vertex
        vertex(100.0, 0.0), // 2 bottom-right of the room
        vertex(50.0, 50.0), // 3 top of the window spur
        vertex(20.0, -10.0),// 4 probe target, negative side
        vertex(20.0, 10.0), // 5
        vertex(80.0, -10.0),// 6 probe target, positive side
        vertex(80.0, 10.0), // 7
    ];
    let linedefs = vec![
        one_sided(0, 1, 0), // bottom-left wall, sector A
        one_sided(1, 2, 1), // bottom-right wall, sector A
        one_sided(1, 3, 2), // the window spur itself, sector A front, no back
        one_sided(4, 5, 3), // negative-side probe target, sector D
        one_sided(6, 7, 4), // positive-side probe target, sector C
    ];
    let sidedefs = vec![sidedef(0), sidedef(0), sidedef(0), sidedef(3), sidedef(2)];
    let sectors = vec![sector(0), sector(1), sector(2), sector(3)];
    let map = MapDescription { vertices, linedefs, sidedefs, sectors };

    let mesh = build_initial_mesh(&map);
    let window = mesh.per_linedef[2];
    let back_info = mesh.info.get(window.back);
    assert_eq!(back_info.sector, Some(2), "the back side should pick up the positive-probe's sector");
}

/// S5 — a self-referencing linedef (front and back sidedef name the same
/// sector) must not be flagged as a mismatch when the gap connector walks
/// across it.
#[test]
fn s5_self_referencing_sector_reports_no_mismatch() {
    // A single room split by an internal two-sided linedef whose front and
    // back both face sector 0.
    let vertices = vec![vertex(0.0, 0.0), vertex(256.0, 0.0), vertex(256.0, 256.0), vertex(0.0, 256.0), vertex(128.0, 0.0), vertex(128.0, 256.0)];
    let linedefs = vec![
        one_sided(0, 4, 0),     // bottom-left
        one_sided(4, 1, 1),     // bottom-right
        one_sided(1, 2, 2),     // right
        one_sided(2, 5, 3),     // top-right
        one_sided(5, 3, 4),     // top-left
        one_sided(3, 0, 5),     // left
        two_sided(4, 5, 6, 7),  // self-referencing internal divider
    ];
    let sidedefs = (0..6).map(|_| sidedef(0)).chain([sidedef(0), sidedef(0)]).collect();
    let map = MapDescription { vertices, linedefs, sidedefs, sectors: vec![sector(0)] };

    let built = NodeBuilder::new(7).unwrap().build(&map).unwrap();
    assert!(built.diagnostics.mismatches.is_empty());
    for face in &built.faces {
        assert_eq!(face.sector, Some(0));
    }
}

/// S6 — a sector whose boundary never closes (three walls of a square, the
/// fourth missing) must not fail the build; at worst it is a diagnostics-
/// level concern, never fatal.
#[test]
fn s6_unclosed_sector_does_not_fail_the_build() {
    let vertices = vec![vertex(0.0, 0.0), vertex(256.0, 0.0), vertex(256.0, 256.0), vertex(0.0, 256.0)];
    let linedefs = vec![one_sided(0, 1, 0), one_sided(1, 2, 1), one_sided(2, 3, 2)];
    let sidedefs = vec![sidedef(0), sidedef(0), sidedef(0)];
    let map = MapDescription { vertices, linedefs, sidedefs, sectors: vec![sector(0)] };

    let result = NodeBuilder::new(7).unwrap().build(&map);
    assert!(result.is_ok());
}
