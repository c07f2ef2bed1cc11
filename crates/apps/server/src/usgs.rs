//! Recent seismic events from the USGS FDSN event service.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use foundation::BoundingBox;

pub const EVENT_LIMIT: u32 = 2000;

/// Start of the lookback window, or `None` if `hours` is not finite or out of
/// range. Fractional hours are honored to the second.
pub fn start_time(now: DateTime<Utc>, hours: f64) -> Option<DateTime<Utc>> {
    let seconds = hours * 3600.0;
    if !seconds.is_finite() || seconds.abs() >= i64::MAX as f64 {
        return None;
    }
    TimeDelta::try_seconds(seconds.round() as i64).and_then(|d| now.checked_sub_signed(d))
}

/// Query parameters for the USGS GeoJSON endpoint.
pub fn query_params(
    start: DateTime<Utc>,
    min_magnitude: f64,
    bbox: BoundingBox,
) -> Vec<(&'static str, String)> {
    vec![
        ("format", "geojson".to_string()),
        (
            "starttime",
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
        ("minmagnitude", min_magnitude.to_string()),
        ("minlatitude", bbox.south.to_string()),
        ("minlongitude", bbox.west.to_string()),
        ("maxlatitude", bbox.north.to_string()),
        ("maxlongitude", bbox.east.to_string()),
        ("orderby", "time".to_string()),
        ("limit", EVENT_LIMIT.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::{query_params, start_time};
    use chrono::{TimeZone, Utc};
    use foundation::BoundingBox;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookback_window() {
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
        let start = start_time(now, 36.0).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(
            start_time(now, 12.5).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap()
        );
        assert!(start_time(now, f64::MAX).is_none());
        assert!(start_time(now, f64::NAN).is_none());
        assert!(start_time(now, 1e15).is_none());
    }

    #[test]
    fn params_use_bbox_edges() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let params = query_params(start, 2.5, BoundingBox::new(32.5, -124.4, 42.0, -114.1));
        let get = |k: &str| {
            params
                .iter()
                .find(|(name, _)| *name == k)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("format"), "geojson");
        assert_eq!(get("starttime"), "2024-01-01T00:00:00Z");
        assert_eq!(get("minmagnitude"), "2.5");
        assert_eq!(get("minlatitude"), "32.5");
        assert_eq!(get("minlongitude"), "-124.4");
        assert_eq!(get("maxlatitude"), "42");
        assert_eq!(get("maxlongitude"), "-114.1");
        assert_eq!(get("limit"), "2000");
    }
}
