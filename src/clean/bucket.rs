/// Room-count classes: `[0, 1]`, `(1, 2]`, `(2, 3]`, `(3, 4]`, `(4, 100]`.
const ROOM_CLASSES: [(i16, &str); 5] = [(1, "T1"), (2, "T2"), (3, "T3"), (4, "T4"), (100, "T5+")];

/// Built-area classes, all left-closed. 10 000 m² and above is unclassified.
const SURFACE_CLASSES: [(f64, &str); 6] = [
    (25.0, "<25"),
    (40.0, "25–40"),
    (60.0, "40–60"),
    (80.0, "60–80"),
    (120.0, "80–120"),
    (10_000.0, "120+"),
];

/// Round half to even, as a small integer. Out-of-range values are dropped.
pub fn round_rooms(v: f64) -> Option<i16> {
    let r = v.round_ties_even();
    if r.is_finite() && r >= i16::MIN as f64 && r <= i16::MAX as f64 {
        Some(r as i16)
    } else {
        None
    }
}

pub fn room_class(rooms: i16) -> Option<&'static str> {
    if rooms < 0 {
        return None;
    }
    ROOM_CLASSES
        .iter()
        .find(|(upper, _)| rooms <= *upper)
        .map(|(_, label)| *label)
}

pub fn surface_class(area: f64) -> Option<&'static str> {
    if !(0.0..10_000.0).contains(&area) {
        return None;
    }
    SURFACE_CLASSES
        .iter()
        .find(|(upper, _)| area < *upper)
        .map(|(_, label)| *label)
}
