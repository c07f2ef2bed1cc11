//! Feature to renderable point conversion, per dataset.

use chrono::{DateTime, Utc};
use foundation::DatasetKey;
use sources::Feature;

use crate::layer::VisualPoint;
use crate::symbology::PointStyle;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_MAGNITUDE: &str = "?";

/// Builds the point for `feature`, or `None` when it has no point geometry.
pub fn to_visual_point(feature: &Feature, key: DatasetKey) -> Option<VisualPoint> {
    let position = feature.point_position()?;
    let props = &feature.properties;

    let (style, popup) = if key.is_brand() {
        let name = props.name.as_deref().unwrap_or(UNKNOWN_NAME);
        let id = props.id.as_deref().unwrap_or("");
        (
            PointStyle::Marker,
            format!("<b>{}</b><br/>{}", escape(name), escape(id)),
        )
    } else {
        let mag = props
            .mag
            .map(|m| m.to_string())
            .unwrap_or_else(|| UNKNOWN_MAGNITUDE.to_string());
        let place = props.place.as_deref().unwrap_or("");
        (
            PointStyle::seismic(props.mag),
            format!(
                "<b>M {mag}</b><br/>{}<br/>{}",
                escape(place),
                format_timestamp(props.time)
            ),
        )
    };

    Some(VisualPoint {
        position,
        style,
        popup,
    })
}

/// Renders epoch milliseconds for a popup; empty when absent or out of range.
pub fn format_timestamp(ms: Option<i64>) -> String {
    ms.and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default()
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
