use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maps one (layer, datatype) pair to a 3D extrusion range plus
/// passthrough material metadata for the downstream exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRule {
    pub layer: u16,
    pub datatype: u16,
    pub enabled: bool,
    pub z_bottom: f64,
    pub z_top: f64,
    pub name: String,
    pub material: String,
    pub color: String,
}

impl LayerRule {
    pub fn new(layer: u16, datatype: u16, z_bottom: f64, z_top: f64) -> Self {
        Self {
            layer,
            datatype,
            enabled: true,
            z_bottom,
            z_top,
            name: String::new(),
            material: String::new(),
            color: String::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_material(mut self, material: &str) -> Self {
        self.material = material.to_string();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn thickness(&self) -> f64 {
        self.z_top - self.z_bottom
    }
}

const TABLE_DIM: usize = 256;

/// Dense (layer, datatype) → rule lookup over the [0,255]×[0,255] key
/// space. Slot value 0 means unmapped; any other value is a 1-based index
/// into the retained rule list. Built once from an ordered rule list and
/// reused read-only across extraction calls.
#[derive(Debug, Clone)]
pub struct LayerTable {
    slots: Vec<u16>,
    rules: Vec<LayerRule>,
}

impl LayerTable {
    /// Build the table. Later rules for the same key override earlier
    /// ones. Fails on a key outside the table range or an empty z-range.
    pub fn build(rules: Vec<LayerRule>) -> Result<Self, ConfigError> {
        let mut table = Self {
            slots: vec![0; TABLE_DIM * TABLE_DIM],
            rules: Vec::with_capacity(rules.len()),
        };

        for rule in rules {
            if usize::from(rule.layer) >= TABLE_DIM || usize::from(rule.datatype) >= TABLE_DIM {
                return Err(ConfigError::InvalidLayerRule {
                    layer: i64::from(rule.layer),
                    datatype: i64::from(rule.datatype),
                    message: "key outside [0,255]".into(),
                });
            }
            if rule.z_top <= rule.z_bottom {
                return Err(ConfigError::InvalidLayerRule {
                    layer: i64::from(rule.layer),
                    datatype: i64::from(rule.datatype),
                    message: format!("empty z-range [{}, {}]", rule.z_bottom, rule.z_top),
                });
            }
            let slot = usize::from(rule.layer) * TABLE_DIM + usize::from(rule.datatype);
            table.rules.push(rule);
            table.slots[slot] = table.rules.len() as u16;
        }

        debug!("layer table built: {} rules", table.rules.len());
        Ok(table)
    }

    /// O(1) lookup. Keys outside [0,255] or absent from the rule list are
    /// unmapped regardless of any rule's enabled flag; enabled-only
    /// filtering is the caller's separate check.
    pub fn lookup(&self, layer: i64, datatype: i64) -> Option<&LayerRule> {
        if !(0..TABLE_DIM as i64).contains(&layer) || !(0..TABLE_DIM as i64).contains(&datatype) {
            return None;
        }
        let slot = layer as usize * TABLE_DIM + datatype as usize;
        match self.slots[slot] {
            0 => None,
            idx => Some(&self.rules[usize::from(idx) - 1]),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[LayerRule] {
        &self.rules
    }
}
