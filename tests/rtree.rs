//! End-to-end engine behavior: insert/delete/update, k-NN, and radius
//! search against a freshly opened index.

use geo_rtreed::{Engine, Point, RtreeConfig, SpatialData};

fn open(dir: &std::path::Path) -> Engine {
    let config = RtreeConfig::new(dir, 2, 4, 64);
    Engine::open(&config).unwrap()
}

#[test]
fn empty_index_returns_no_results() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(dir.path());
    assert!(engine.is_empty());
    assert!(engine.nearest_neighbors(5, Point::new(0.0, 0.0)).unwrap().is_empty());
    assert!(engine.search_within_radius(Point::new(0.0, 0.0), 10.0).unwrap().is_empty());
}

#[test]
fn single_insert_is_its_own_nearest_neighbor() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path());
    let obj = SpatialData::new(Point::new(-7.78, 110.37), b"yogyakarta".to_vec());
    engine.insert(obj.clone()).unwrap();

    let nearest = engine.nearest_neighbors(3, Point::new(-7.78, 110.37)).unwrap();
    assert_eq!(nearest.len(), 1);
    assert_eq!(nearest[0].data, obj.data);
}

#[test]
fn overflow_insert_splits_root_into_height_two_tree() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path());
    // max_entries = 4, so a 5th insert forces the root to split.
    for i in 0..5 {
        let coord = i as f64;
        engine.insert(SpatialData::new(Point::new(coord, coord), format!("p{i}").into_bytes())).unwrap();
    }
    assert_eq!(engine.len(), 5);
    assert_eq!(engine.height(), 2);
}

#[test]
fn nearest_neighbors_orders_by_distance() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path());
    engine.insert(SpatialData::new(Point::new(0.0, 0.0), b"origin".to_vec())).unwrap();
    engine.insert(SpatialData::new(Point::new(1.0, 1.0), b"near".to_vec())).unwrap();
    engine.insert(SpatialData::new(Point::new(10.0, 10.0), b"far".to_vec())).unwrap();

    let nearest = engine.nearest_neighbors(3, Point::new(0.0, 0.0)).unwrap();
    let order: Vec<_> = nearest.iter().map(|o| o.data.clone()).collect();
    assert_eq!(order, vec![b"origin".to_vec(), b"near".to_vec(), b"far".to_vec()]);
}

#[test]
fn nearest_neighbors_caps_at_k_even_with_more_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path());
    for i in 0..20 {
        engine.insert(SpatialData::new(Point::new(i as f64, 0.0), format!("p{i}").into_bytes())).unwrap();
    }
    let nearest = engine.nearest_neighbors(3, Point::new(0.0, 0.0)).unwrap();
    assert_eq!(nearest.len(), 3);
    assert_eq!(nearest[0].data, b"p0");
    assert_eq!(nearest[1].data, b"p1");
    assert_eq!(nearest[2].data, b"p2");
}

#[test]
fn delete_then_reinsert_keeps_count_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path());
    let mut inserted = Vec::new();
    for i in 0..12 {
        let obj = SpatialData::new(Point::new(i as f64, i as f64), format!("p{i}").into_bytes());
        engine.insert(obj.clone()).unwrap();
        inserted.push(obj);
    }
    assert_eq!(engine.len(), 12);

    for obj in inserted.iter().take(6) {
        assert!(engine.delete(obj).unwrap());
    }
    assert_eq!(engine.len(), 6);

    for obj in inserted.iter().take(6) {
        engine.insert(obj.clone()).unwrap();
    }
    assert_eq!(engine.len(), 12);
}

#[test]
fn update_moves_point_to_new_location() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path());
    let old = SpatialData::new(Point::new(1.0, 1.0), b"mobile".to_vec());
    engine.insert(old.clone()).unwrap();

    let new = SpatialData::new(Point::new(50.0, 50.0), b"mobile".to_vec());
    engine.update(&old, new).unwrap();
    assert_eq!(engine.len(), 1);

    let near_old = engine.nearest_neighbors(1, Point::new(1.0, 1.0)).unwrap();
    let dist = geo_rtreed::geo::haversine(near_old[0].location.lat, near_old[0].location.lon, 1.0, 1.0);
    assert!(dist > 1000.0, "updated point should have moved far from its old location, got {dist}km");
}

#[test]
fn update_of_missing_object_errors_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path());
    let missing = SpatialData::new(Point::new(9.0, 9.0), b"ghost".to_vec());
    let replacement = SpatialData::new(Point::new(1.0, 1.0), b"replacement".to_vec());
    assert!(matches!(engine.update(&missing, replacement), Err(geo_rtreed::RtreeError::NotFound)));
    assert!(engine.is_empty());
}

#[test]
fn delete_reports_found_as_a_bool_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path());
    let obj = SpatialData::new(Point::new(1.0, 1.0), b"a".to_vec());
    engine.insert(obj.clone()).unwrap();
    assert!(engine.delete(&obj).unwrap());
    assert!(!engine.delete(&obj).unwrap());
}

#[test]
fn search_within_radius_excludes_points_outside_the_box() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path());
    let center = Point::new(-7.797, 110.370);
    engine.insert(SpatialData::new(center, b"center".to_vec())).unwrap();
    let (near_lat, near_lon) = geo_rtreed::geo::destination_point(center.lat, center.lon, 90.0, 2.0);
    engine.insert(SpatialData::new(Point::new(near_lat, near_lon), b"near".to_vec())).unwrap();
    let (far_lat, far_lon) = geo_rtreed::geo::destination_point(center.lat, center.lon, 90.0, 500.0);
    engine.insert(SpatialData::new(Point::new(far_lat, far_lon), b"far".to_vec())).unwrap();

    let results = engine.search_within_radius(center, 10.0).unwrap();
    let payloads: Vec<_> = results.iter().map(|o| o.data.clone()).collect();
    assert!(payloads.contains(&b"center".to_vec()));
    assert!(payloads.contains(&b"near".to_vec()));
    assert!(!payloads.contains(&b"far".to_vec()));
}
