use geodex_geodesy::{
    Adaptive, Bounds, Coordinate, DistanceStrategy, DistanceUnit, GeodesicLibrary, Haversine,
    Planar, Vincenty,
};
use proptest::prelude::*;

/// Longest geodesic on the WGS84 ellipsoid is under half the equator
const MAX_DISTANCE_KM: f64 = 20_038.0;

fn coordinate() -> impl Strategy<Value = Coordinate> {
    (-180.0f64..=180.0, -90.0f64..=90.0)
        .prop_map(|(lon, lat)| Coordinate::new(lon, lat).expect("generated in range"))
}

fn strategies() -> Vec<Box<dyn DistanceStrategy>> {
    vec![
        Box::new(Haversine::new()),
        Box::new(Vincenty::new()),
        Box::new(Planar::new()),
        Box::new(Adaptive::new(false)),
        Box::new(Adaptive::new(true)),
    ]
}

proptest! {
    #[test]
    fn prop_distance_to_self_is_zero(a in coordinate()) {
        for strategy in strategies() {
            let d = strategy.between(&a, &a).unwrap();
            prop_assert!(d.abs() < 1e-9, "{} gave {}", strategy.name(), d);
        }
    }

    #[test]
    fn prop_distance_is_bounded(a in coordinate(), b in coordinate()) {
        for strategy in strategies() {
            let d = strategy.between(&a, &b).unwrap();
            prop_assert!(d >= 0.0, "{} gave {}", strategy.name(), d);
            prop_assert!(d <= MAX_DISTANCE_KM, "{} gave {}", strategy.name(), d);
        }
    }

    #[test]
    fn prop_closed_form_distance_is_symmetric(a in coordinate(), b in coordinate()) {
        let closed_form: Vec<Box<dyn DistanceStrategy>> = vec![
            Box::new(Haversine::new()),
            Box::new(Planar::new()),
            Box::new(Adaptive::new(false)),
        ];
        for strategy in closed_form {
            let ab = strategy.between(&a, &b).unwrap();
            let ba = strategy.between(&b, &a).unwrap();
            prop_assert!((ab - ba).abs() <= 1e-9 * ab.max(1.0), "{}: {} vs {}", strategy.name(), ab, ba);
        }
    }

    #[test]
    fn prop_vincenty_symmetric_away_from_antipodes(
        lon in -180.0f64..=180.0,
        lat in -60.0f64..=60.0,
        dlon in -90.0f64..=90.0,
        dlat in -25.0f64..=25.0,
    ) {
        let a = Coordinate::new(lon, lat).unwrap();
        let b = Coordinate::new((lon + dlon + 180.0).rem_euclid(360.0) - 180.0, lat + dlat).unwrap();
        let v = Vincenty::new();
        let ab = v.between(&a, &b).unwrap();
        let ba = v.between(&b, &a).unwrap();
        prop_assert!((ab - ba).abs() < 1e-6, "{} vs {}", ab, ba);
    }

    #[test]
    fn prop_bearing_in_range(a in coordinate(), b in coordinate()) {
        let bearing = GeodesicLibrary::new().bearing(&a, &b).unwrap();
        prop_assert!((0.0..360.0).contains(&bearing), "got {}", bearing);
    }

    #[test]
    fn prop_interpolation_endpoints(a in coordinate(), b in coordinate()) {
        let lib = GeodesicLibrary::new();
        prop_assert_eq!(lib.interpolate(&a, &b, 0.0).unwrap(), Some(a));
        prop_assert_eq!(lib.interpolate(&a, &b, 1.0).unwrap(), Some(b));
        prop_assert_eq!(lib.interpolate(&a, &b, 0.5).unwrap(), lib.midpoint(&a, &b));
    }

    #[test]
    fn prop_unit_conversion_scales(a in coordinate(), b in coordinate()) {
        let lib = GeodesicLibrary::new();
        let km = lib.distance(&a, &b, DistanceUnit::Kilometers).unwrap().unwrap();
        let miles = lib.distance(&a, &b, DistanceUnit::Miles).unwrap().unwrap();
        prop_assert!((miles - km * 0.621_371).abs() < 1e-6);
    }

    #[test]
    fn prop_bounding_box_contains_inputs(points in proptest::collection::vec(coordinate(), 1..20)) {
        let bbox = GeodesicLibrary::new().bounding_box(&points).unwrap();
        for p in &points {
            prop_assert!(bbox.contains(p));
        }
    }
}

#[test]
fn test_antimeridian_band() {
    let band = Bounds::new(10.0, -10.0, -170.0, 170.0).unwrap();
    assert!(band.contains(&Coordinate::new(179.0, 0.0).unwrap()));
    assert!(band.contains(&Coordinate::new(-179.0, 0.0).unwrap()));
    assert!(!band.contains(&Coordinate::new(0.0, 0.0).unwrap()));
}
