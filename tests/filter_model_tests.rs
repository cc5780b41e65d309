use crosschart::chart::compile_filters;
use crosschart::core::{Filter, Key, RangedTwoDimensionalBounds, ranges_equal};
use proptest::prelude::*;

#[test]
fn single_filter_matches_equal_keys_only() {
    let filter = Filter::single("Tue");
    assert!(filter.is_filtered(&Key::text("Tue")));
    assert!(!filter.is_filtered(&Key::text("Mon")));
    assert!(!filter.is_filtered(&Key::number(1.0)));
}

#[test]
fn ranged_filter_includes_low_and_excludes_high() {
    let filter = Filter::ranged(10, 20);
    assert!(filter.is_filtered(&Key::number(10.0)));
    assert!(filter.is_filtered(&Key::number(19.999)));
    assert!(!filter.is_filtered(&Key::number(20.0)));
    assert!(!filter.is_filtered(&Key::number(9.999)));
}

#[test]
fn ranged_filter_over_mixed_key_kinds_never_matches() {
    let filter = Filter::ranged(10, 20);
    assert!(!filter.is_filtered(&Key::text("15")));
    assert!(!filter.is_filtered(&Key::pair(15, 15)));
}

#[test]
fn nan_bounds_never_match() {
    let open_high = Filter::ranged(0.0, f64::NAN);
    assert!(!open_high.is_filtered(&Key::number(5.0)));
    assert!(!open_high.is_filtered(&Key::number(1e300)));
    assert!(!Filter::ranged(f64::NAN, 10.0).is_filtered(&Key::number(5.0)));
    assert!(!Filter::ranged(0.0, 10.0).is_filtered(&Key::number(f64::NAN)));

    assert!(!compile_filters(&[open_high]).matches(&Key::number(5.0)));
    assert!(!Filter::single(f64::NAN).is_filtered(&Key::number(f64::NAN)));
    assert!(!compile_filters(&[Filter::single(f64::NAN)]).matches(&Key::number(f64::NAN)));
    assert!(!Filter::point(f64::NAN, 1.0).is_filtered(&Key::pair(f64::NAN, 1.0)));
}

#[test]
fn point_filter_matches_exact_tuple() {
    let filter = Filter::point(1, 2);
    assert!(filter.is_filtered(&Key::pair(1, 2)));
    assert!(!filter.is_filtered(&Key::pair(2, 1)));
    assert!(!filter.is_filtered(&Key::number(1.0)));
    assert!(!filter.is_filtered(&Key::Tuple(vec![Key::number(1.0)])));
}

#[test]
fn ranged_two_dimensional_filter_is_half_open_on_both_axes() {
    let filter = Filter::ranged_two_dimensional(Some(RangedTwoDimensionalBounds::Corners(
        [5.0, 5.0],
        [1.0, 1.0],
    )))
    .expect("filter");
    assert!(filter.is_filtered(&Key::pair(1.0, 1.0)));
    assert!(filter.is_filtered(&Key::pair(1.0, 4.9)));
    assert!(!filter.is_filtered(&Key::pair(5.0, 5.0)));
    assert!(!filter.is_filtered(&Key::pair(3.0, 5.0)));
    assert!(!filter.is_filtered(&Key::pair(0.5, 3.0)));
}

#[test]
fn x_band_leaves_y_unbounded() {
    let filter =
        Filter::ranged_two_dimensional(Some(RangedTwoDimensionalBounds::XBand(1.0, 5.0)))
            .expect("filter");
    assert!(filter.is_filtered(&Key::pair(3.0, 1e9)));
    assert!(filter.is_filtered(&Key::pair(3.0, -1e9)));
    assert!(filter.is_filtered(&Key::number(3.0)));
    assert!(!filter.is_filtered(&Key::number(5.0)));
}

#[test]
fn missing_bounds_build_no_filter() {
    assert_eq!(Filter::ranged_two_dimensional(None), None);
}

#[test]
fn filters_print_like_dashboard_labels() {
    assert_eq!(Filter::single("Tue").to_string(), "Tue");
    assert_eq!(Filter::ranged(1, 5).to_string(), "[1 -> 5]");
}

#[test]
fn ranges_compare_by_numeric_bounds() {
    let a = Filter::ranged(1.0, 5.0);
    let b = Filter::ranged(1, 5);
    assert!(ranges_equal(Some(&a), Some(&b)));
    assert!(ranges_equal(None, None));
    assert!(!ranges_equal(Some(&a), None));
    assert!(!ranges_equal(Some(&a), Some(&Filter::ranged(1.0, 6.0))));
}

#[test]
fn filter_set_survives_json() {
    let filters = vec![
        Filter::single("Tue"),
        Filter::ranged(1.5, 3.0),
        Filter::point("a", 2),
    ];
    let json = serde_json::to_string(&filters).expect("serialize");
    let restored: Vec<Filter> = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(restored, filters);
}

proptest! {
    #[test]
    fn corner_order_does_not_change_the_rectangle(
        ax in -100.0f64..100.0,
        ay in -100.0f64..100.0,
        bx in -100.0f64..100.0,
        by in -100.0f64..100.0,
        px in -120.0f64..120.0,
        py in -120.0f64..120.0,
    ) {
        let build = |a: [f64; 2], b: [f64; 2]| {
            Filter::ranged_two_dimensional(Some(RangedTwoDimensionalBounds::Corners(a, b)))
                .expect("filter")
        };
        let point = Key::pair(px, py);
        let forward = build([ax, ay], [bx, by]).is_filtered(&point);
        prop_assert_eq!(forward, build([bx, by], [ax, ay]).is_filtered(&point));
        prop_assert_eq!(forward, build([ax, by], [bx, ay]).is_filtered(&point));
    }

    #[test]
    fn ranged_filter_bounds_are_half_open(
        low in -1e6f64..1e6,
        width in 1e-3f64..1e6,
        below in 1e-3f64..1e3,
    ) {
        let filter = Filter::ranged(low, low + width);
        prop_assert!(filter.is_filtered(&Key::number(low)));
        prop_assert!(!filter.is_filtered(&Key::number(low + width)));
        prop_assert!(!filter.is_filtered(&Key::number(low - below)));
    }
}
