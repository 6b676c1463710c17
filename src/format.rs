//! Human-readable formatting of camera values.
//!
//! Pure functions, no I/O. Numbers go through the *compact* rule everywhere:
//! integral values print without decimals, everything else with one.
//!
//! | Value | Example |
//! |---|---|
//! | f-number | `f/2.8`, `f/8` |
//! | exposure | `2s`, `10ms`, `200µs` |
//! | focal length | `50mm`, `24mm (≙ 38mm)` |
//! | ISO | `200` / `ISO200` |
//! | subject distance | `3.5m`, `∞` |

/// Tolerance below which a value counts as integral. Guards against
/// products like `0.0002 * 1e6` landing a few ulps off a whole number.
const INTEGRAL_EPSILON: f64 = 1e-9;

/// Subject distances at or above this many meters are shown as infinity.
const INFINITE_DISTANCE_M: f64 = 10_000.0;

const INFINITY_SYMBOL: &str = "∞";

fn is_integral(value: f64) -> bool {
    (value - value.round()).abs() < INTEGRAL_EPSILON
}

/// Compact decimal with one decimal place for non-integral values.
///
/// ```
/// # use exif_gal::format::compact;
/// assert_eq!(compact(3.0), "3");
/// assert_eq!(compact(3.14159), "3.1");
/// ```
pub fn compact(value: f64) -> String {
    compact_with(value, 1)
}

/// Compact decimal with a caller-chosen precision for non-integral values.
pub fn compact_with(value: f64, precision: usize) -> String {
    if is_integral(value) {
        format!("{:.0}", value.round())
    } else {
        format!("{:.*}", precision, value)
    }
}

pub fn f_number(value: f64) -> String {
    format!("f/{}", compact(value))
}

/// Exposure time in seconds, scaled to s, ms or µs.
pub fn exposure_time(seconds: f64) -> String {
    if seconds >= 1.0 {
        format!("{}s", compact(seconds))
    } else if seconds >= 0.001 {
        format!("{}ms", compact(seconds * 1000.0))
    } else {
        format!("{}µs", compact(seconds * 1_000_000.0))
    }
}

/// Focal length, with the 35mm equivalent when it says something new.
///
/// A known 35mm value wins over a crop factor; the crop factor is only used
/// when the camera did not record an equivalent focal length at all.
pub fn focal_length(mm: f64, equivalent_35mm: Option<f64>, crop_factor: Option<f64>) -> String {
    let base = format!("{}mm", compact(mm));
    match (equivalent_35mm, crop_factor) {
        (Some(eq), _) if (eq - mm).abs() >= INTEGRAL_EPSILON => {
            format!("{} (≙ {}mm)", base, compact(eq))
        }
        (Some(_), _) => base,
        (None, Some(crop)) => format!("{} (≙ {:.0}mm)", base, mm * crop),
        (None, None) => base,
    }
}

pub fn iso(value: u32) -> String {
    value.to_string()
}

pub fn iso_label(value: u32) -> String {
    format!("ISO{}", value)
}

/// Join the present exposure fragments in fixed order: aperture, time,
/// focal length, ISO.
pub fn focus_summary(
    f_number: Option<&str>,
    exposure: Option<&str>,
    focal_length: Option<&str>,
    iso: Option<&str>,
) -> Option<String> {
    let parts: Vec<&str> = [f_number, exposure, focal_length, iso]
        .into_iter()
        .flatten()
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// A measured distance that may be unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    Meters(f64),
    Infinite,
}

impl Distance {
    fn render(self) -> String {
        match self {
            Distance::Meters(m) => format!("{}m", compact(m)),
            Distance::Infinite => INFINITY_SYMBOL.to_string(),
        }
    }
}

/// Measured subject distance in meters.
pub fn subject_distance(meters: f64) -> String {
    if meters < INFINITE_DISTANCE_M {
        Distance::Meters(meters).render()
    } else {
        INFINITY_SYMBOL.to_string()
    }
}

/// Near/far depth-of-field bracket, e.g. `1.2m – ∞`.
pub fn focus_range(near: Distance, far: Distance) -> String {
    format!("{} – {}", near.render(), far.render())
}

pub fn exposure_value(ev: f64) -> String {
    format!("EV {}", compact(ev))
}

pub fn light_value(lv: f64) -> String {
    format!("LV {}", compact(lv))
}
