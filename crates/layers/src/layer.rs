use std::collections::BTreeMap;

use foundation::{DatasetKey, LatLng};
use serde::{Deserialize, Serialize};

use crate::symbology::PointStyle;

/// A renderable point with its popup content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualPoint {
    pub position: LatLng,
    pub style: PointStyle,
    pub popup: String,
}

/// Points of one dataset, shown or hidden as a single overlay.
///
/// Membership and attachment are independent: a group can hold points while
/// detached, which happens during a refresh before it is made visible.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGroup {
    key: DatasetKey,
    points: Vec<VisualPoint>,
    attached: bool,
}

impl LayerGroup {
    pub fn new(key: DatasetKey) -> Self {
        Self {
            key,
            points: Vec::new(),
            attached: false,
        }
    }

    pub fn points(&self) -> &[VisualPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

/// Summary of one group for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub key: DatasetKey,
    pub points: usize,
    pub visible: bool,
}

/// One layer group per dataset, allocated up front.
///
/// Owned by whoever drives refreshes; there is no global instance.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRegistry {
    groups: BTreeMap<DatasetKey, LayerGroup>,
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self {
            groups: DatasetKey::ALL
                .into_iter()
                .map(|k| (k, LayerGroup::new(k)))
                .collect(),
        }
    }

    pub fn group(&self, key: DatasetKey) -> &LayerGroup {
        &self.groups[&key]
    }

    fn group_mut(&mut self, key: DatasetKey) -> &mut LayerGroup {
        self.groups.entry(key).or_insert_with(|| LayerGroup::new(key))
    }

    /// Removes every point and detaches the group. Idempotent.
    pub fn clear(&mut self, key: DatasetKey) {
        let g = self.group_mut(key);
        g.points.clear();
        g.attached = false;
    }

    /// Appends a point without touching visibility.
    pub fn add_point(&mut self, key: DatasetKey, point: VisualPoint) {
        self.group_mut(key).points.push(point);
    }

    /// Attaches the group to the map if it is not already. Idempotent.
    pub fn ensure_visible(&mut self, key: DatasetKey) {
        self.group_mut(key).attached = true;
    }

    pub fn is_visible(&self, key: DatasetKey) -> bool {
        self.group(key).attached
    }

    pub fn summary(&self) -> Vec<LayerSummary> {
        self.groups
            .values()
            .map(|g| LayerSummary {
                key: g.key,
                points: g.len(),
                visible: g.attached,
            })
            .collect()
    }
}
