//! Closing and reopening an index must preserve its contents and shape.

use geo_rtreed::{Engine, Point, RtreeConfig, SpatialData};

fn config(dir: &std::path::Path) -> RtreeConfig {
    RtreeConfig::new(dir, 2, 4, 64)
}

#[test]
fn reopen_after_close_preserves_size_and_height() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());

    {
        let mut engine = Engine::open(&cfg).unwrap();
        for i in 0..30 {
            engine
                .insert(SpatialData::new(Point::new(i as f64 * 0.1, i as f64 * 0.1), format!("p{i}").into_bytes()))
                .unwrap();
        }
        engine.close().unwrap();
    }

    let reopened = Engine::open(&cfg).unwrap();
    assert_eq!(reopened.len(), 30);
    assert!(reopened.height() >= 2);
}

#[test]
fn reopen_after_deletes_reflects_reduced_count() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let mut inserted = Vec::new();

    {
        let mut engine = Engine::open(&cfg).unwrap();
        for i in 0..10 {
            let obj = SpatialData::new(Point::new(i as f64, i as f64), format!("p{i}").into_bytes());
            engine.insert(obj.clone()).unwrap();
            inserted.push(obj);
        }
        for obj in inserted.iter().take(4) {
            assert!(engine.delete(obj).unwrap());
        }
        engine.close().unwrap();
    }

    let reopened = Engine::open(&cfg).unwrap();
    assert_eq!(reopened.len(), 6);
}

#[test]
fn queries_survive_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());

    {
        let mut engine = Engine::open(&cfg).unwrap();
        engine.insert(SpatialData::new(Point::new(-6.2, 106.8), b"jakarta".to_vec())).unwrap();
        engine.insert(SpatialData::new(Point::new(-6.9, 107.6), b"bandung".to_vec())).unwrap();
        engine.close().unwrap();
    }

    let reopened = Engine::open(&cfg).unwrap();
    let nearest = reopened.nearest_neighbors(1, Point::new(-6.2, 106.8)).unwrap();
    assert_eq!(nearest[0].data, b"jakarta");
}
