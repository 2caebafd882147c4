//! Structural invariants that must hold after any sequence of top-level
//! operations: pin balance on the buffer pool, and rect coverage / parent
//! linkage / fill / level consistency on the tree itself.

use geo_rtreed::{Engine, Point, RtreeConfig, SpatialData};

fn open(dir: &std::path::Path, min: usize, max: usize) -> Engine {
    let config = RtreeConfig::new(dir, min, max, 64);
    Engine::open(&config).unwrap()
}

#[test]
fn pins_are_balanced_after_every_operation() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path(), 2, 4);

    let mut objects = Vec::new();
    for i in 0..40 {
        let obj = SpatialData::new(Point::new(i as f64 * 0.3, i as f64 * 0.2), format!("p{i}").into_bytes());
        engine.insert(obj.clone()).unwrap();
        objects.push(obj);
        assert!(engine.all_frames_unpinned(), "leaked pin after insert {i}");
    }

    engine.nearest_neighbors(5, Point::new(3.0, 2.0)).unwrap();
    assert!(engine.all_frames_unpinned(), "leaked pin after nearest_neighbors");

    engine.search_within_radius(Point::new(3.0, 2.0), 500.0).unwrap();
    assert!(engine.all_frames_unpinned(), "leaked pin after search_within_radius");

    for obj in objects.iter().take(20) {
        engine.delete(obj).unwrap();
        assert!(engine.all_frames_unpinned(), "leaked pin after delete");
    }

    let replacement = SpatialData::new(Point::new(9.0, 9.0), b"moved".to_vec());
    engine.update(&objects[25], replacement).unwrap();
    assert!(engine.all_frames_unpinned(), "leaked pin after update");
}

#[test]
fn tree_stays_structurally_sound_across_inserts_and_deletes() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path(), 2, 4);
    let mut objects = Vec::new();

    for i in 0..60 {
        let obj =
            SpatialData::new(Point::new((i as f64 * 1.7) % 80.0 - 40.0, (i as f64 * 2.3) % 80.0 - 40.0), format!("p{i}").into_bytes());
        engine.insert(obj.clone()).unwrap();
        objects.push(obj);
    }
    engine.check_invariants().unwrap();

    for obj in objects.iter().step_by(3) {
        engine.delete(obj).unwrap();
    }
    engine.check_invariants().unwrap();
}

#[test]
fn invariants_hold_on_an_empty_tree() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(dir.path(), 2, 4);
    engine.check_invariants().unwrap();
}
