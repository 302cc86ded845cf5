//! Per-extraction feature table.

use std::collections::HashMap;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::schema::{FeatureName, FeatureValue, FEATURE_COUNT};

/// A complete feature row.
///
/// Always holds exactly one value per schema column. A fresh vector starts
/// with every feature at [`FeatureValue::Legitimate`]; stages only lower
/// values. Never shared between extractions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureVector {
    values: [FeatureValue; FEATURE_COUNT],
}

impl FeatureVector {
    /// The all-default vector.
    pub fn new() -> Self {
        Self {
            values: [FeatureValue::Legitimate; FEATURE_COUNT],
        }
    }

    pub fn get(&self, name: FeatureName) -> FeatureValue {
        self.values[name.index()]
    }

    pub fn set(&mut self, name: FeatureName, value: FeatureValue) {
        self.values[name.index()] = value;
    }

    /// Mark a feature suspicious.
    pub fn flag(&mut self, name: FeatureName) {
        self.set(name, FeatureValue::Suspicious);
    }

    /// The classifier row in column order.
    pub fn row(&self) -> [i8; FEATURE_COUNT] {
        self.values.map(FeatureValue::as_i8)
    }

    pub fn values(&self) -> &[FeatureValue; FEATURE_COUNT] {
        &self.values
    }

    /// `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureName, FeatureValue)> + '_ {
        FeatureName::ALL
            .iter()
            .map(move |name| (*name, self.values[name.index()]))
    }

    /// Name-keyed view of the same values.
    pub fn to_map(&self) -> HashMap<FeatureName, FeatureValue> {
        self.iter().collect()
    }

    /// Names currently at -1, in column order.
    pub fn suspicious(&self) -> Vec<FeatureName> {
        self.iter()
            .filter(|(_, value)| *value == FeatureValue::Suspicious)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes the named features as a map in column order.
struct NamedFeatures<'a>(&'a FeatureVector);

impl Serialize for NamedFeatures<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (name, value) in self.0.iter() {
            map.serialize_entry(name.as_str(), &value)?;
        }
        map.end()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FeatureVector", 2)?;
        state.serialize_field("row", &self.row())?;
        state.serialize_field("features", &NamedFeatures(self))?;
        state.end()
    }
}

/// Output of one extraction: the URL as analysed plus its vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureReport {
    pub url: String,
    #[serde(flatten)]
    pub vector: FeatureVector,
}

impl FeatureReport {
    /// Names at -1, the reasons a handler shows for an unsafe verdict.
    pub fn suspicious(&self) -> Vec<FeatureName> {
        self.vector.suspicious()
    }

    pub fn row(&self) -> [i8; FEATURE_COUNT] {
        self.vector.row()
    }
}
