use serde::{Deserialize, Serialize};

/// The fixed set of datasets the viewer can overlay.
///
/// Each key selects both the query endpoint and the layer group it feeds.
/// Declaration order is the load order used by a refresh.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKey {
    McDonalds,
    Starbucks,
    DollarGeneral,
    Seismic,
}

impl DatasetKey {
    pub const ALL: [DatasetKey; 4] = [
        DatasetKey::McDonalds,
        DatasetKey::Starbucks,
        DatasetKey::DollarGeneral,
        DatasetKey::Seismic,
    ];

    /// Provider identifier for brand datasets; `None` for the seismic feed.
    pub fn brand_id(self) -> Option<&'static str> {
        match self {
            DatasetKey::McDonalds => Some("mcdonalds"),
            DatasetKey::Starbucks => Some("starbucks"),
            DatasetKey::DollarGeneral => Some("dollargeneral"),
            DatasetKey::Seismic => None,
        }
    }

    pub fn is_brand(self) -> bool {
        self.brand_id().is_some()
    }

    /// Human-readable name used in status lines.
    pub fn label(self) -> &'static str {
        match self {
            DatasetKey::McDonalds => "McDonald's",
            DatasetKey::Starbucks => "Starbucks",
            DatasetKey::DollarGeneral => "Dollar General",
            DatasetKey::Seismic => "Earthquakes",
        }
    }
}

impl std::fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::DatasetKey;

    #[test]
    fn load_order_matches_declaration_order() {
        let mut sorted = DatasetKey::ALL;
        sorted.sort();
        assert_eq!(sorted, DatasetKey::ALL);
        assert_eq!(DatasetKey::ALL[3], DatasetKey::Seismic);
    }

    #[test]
    fn only_brands_have_provider_ids() {
        let brands: Vec<_> = DatasetKey::ALL.iter().filter_map(|k| k.brand_id()).collect();
        assert_eq!(brands, ["mcdonalds", "starbucks", "dollargeneral"]);
        assert!(!DatasetKey::Seismic.is_brand());
    }
}
