//! Brand-location lookups through the Overpass API.

use foundation::BoundingBox;
use serde::Deserialize;
use serde_json::{Map, Value, json};

pub const QUERY_TIMEOUT_SECS: u32 = 45;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Brand {
    #[default]
    McDonalds,
    Starbucks,
    DollarGeneral,
}

impl Brand {
    pub fn id(self) -> &'static str {
        match self {
            Brand::McDonalds => "mcdonalds",
            Brand::Starbucks => "starbucks",
            Brand::DollarGeneral => "dollargeneral",
        }
    }

    /// Case-insensitive regex matched against `brand`, `name` and `operator` tags.
    pub fn pattern(self) -> &'static str {
        match self {
            Brand::McDonalds => "McDonald",
            Brand::Starbucks => "Starbucks",
            Brand::DollarGeneral => "Dollar General",
        }
    }
}

/// Overpass QL selecting every node/way/relation of `brand` inside `bbox`.
pub fn build_query(brand: Brand, bbox: BoundingBox) -> String {
    let area = format!("{},{},{},{}", bbox.south, bbox.west, bbox.north, bbox.east);
    let pat = brand.pattern();
    let mut body = String::new();
    for tag in ["brand", "name", "operator"] {
        body.push_str(&format!("nwr({area})[\"{tag}\"~\"{pat}\",i];\n"));
    }
    format!("[out:json][timeout:{QUERY_TIMEOUT_SECS}];\n(\n{body});\nout center;\n")
}

#[derive(Debug, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Value,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub center: Option<Center>,
    #[serde(default)]
    pub tags: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Center {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl OverpassElement {
    /// Nodes carry their own coordinate; ways and relations use `out center`.
    fn coordinate(&self) -> Option<(f64, f64)> {
        let (lat, lon) = if self.kind == "node" {
            (self.lat, self.lon)
        } else {
            let c = self.center.as_ref()?;
            (c.lat, c.lon)
        };
        Some((lat?, lon?))
    }

    fn display_name(&self) -> String {
        ["name", "brand", "operator"]
            .iter()
            .filter_map(|k| self.tags.get(*k).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or("Unknown")
            .to_string()
    }

    fn element_id(&self) -> String {
        let id = match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        format!("{}/{}", self.kind, id)
    }
}

/// Converts an Overpass response into a point FeatureCollection.
///
/// Elements without a usable coordinate are dropped.
pub fn to_feature_collection(resp: &OverpassResponse) -> Value {
    let features: Vec<Value> = resp
        .elements
        .iter()
        .filter_map(|el| {
            let (lat, lon) = el.coordinate()?;
            Some(json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [lon, lat]},
                "properties": {
                    "id": el.element_id(),
                    "name": el.display_name(),
                    "tags": el.tags,
                }
            }))
        })
        .collect();
    json!({"type": "FeatureCollection", "features": features})
}

#[cfg(test)]
mod tests {
    use super::{Brand, OverpassResponse, build_query, to_feature_collection};
    use foundation::BoundingBox;
    use pretty_assertions::assert_eq;

    #[test]
    fn query_matches_all_three_tags() {
        let q = build_query(Brand::DollarGeneral, BoundingBox::new(35.1, -90.1, 35.2, -89.9));
        assert!(q.starts_with("[out:json][timeout:45];"));
        assert!(q.contains(r#"nwr(35.1,-90.1,35.2,-89.9)["brand"~"Dollar General",i];"#));
        assert!(q.contains(r#"nwr(35.1,-90.1,35.2,-89.9)["name"~"Dollar General",i];"#));
        assert!(q.contains(r#"nwr(35.1,-90.1,35.2,-89.9)["operator"~"Dollar General",i];"#));
        assert!(q.trim_end().ends_with("out center;"));
    }

    #[test]
    fn brand_ids_deserialize() {
        let b: Brand = serde_json::from_str(r#""starbucks""#).unwrap();
        assert_eq!(b, Brand::Starbucks);
        assert_eq!(b.id(), "starbucks");
        assert!(serde_json::from_str::<Brand>(r#""wendys""#).is_err());
        assert_eq!(Brand::default(), Brand::McDonalds);
    }

    #[test]
    fn converts_nodes_and_centers() {
        let resp: OverpassResponse = serde_json::from_value(serde_json::json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 40.0, "lon": -74.0,
                 "tags": {"brand": "McDonald's"}},
                {"type": "way", "id": 2, "center": {"lat": 41.0, "lon": -75.0},
                 "tags": {"name": "McDonald's Downtown", "brand": "McDonald's"}},
                {"type": "relation", "id": 3, "tags": {"operator": "McD"}},
                {"type": "node", "id": 4, "lat": 42.0, "lon": -76.0}
            ]
        }))
        .unwrap();

        let fc = to_feature_collection(&resp);
        let features = fc["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);

        assert_eq!(features[0]["geometry"]["coordinates"], serde_json::json!([-74.0, 40.0]));
        assert_eq!(features[0]["properties"]["id"], "node/1");
        assert_eq!(features[0]["properties"]["name"], "McDonald's");

        assert_eq!(features[1]["properties"]["id"], "way/2");
        assert_eq!(features[1]["properties"]["name"], "McDonald's Downtown");

        assert_eq!(features[2]["properties"]["name"], "Unknown");
        assert_eq!(fc["type"], "FeatureCollection");
    }

    #[test]
    fn empty_response_is_empty_collection() {
        let fc = to_feature_collection(&OverpassResponse::default());
        assert_eq!(fc["features"], serde_json::json!([]));
    }
}
