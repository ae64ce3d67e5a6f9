//!
//! Declared properties of an editable HMM
//!
use crate::alphabet::AlphabetPreset;
use crate::error::Result;
use crate::model_type::{EmissionFamily, ModelDescriptor, ModelKind, TransitionKind};
use crate::state::features::FeatureTag;
use serde::{Deserialize, Serialize};

///
/// Properties set in the editor. The model type bitmask is derived from
/// them by `model_type::compute_bitmask`.
///
/// ```json
/// { "name": "cpg", "kind": 0, "alphabet": "dna", "max_order": 0,
///   "switching": 1, "tied": false, "silent": true,
///   "background": false, "labels": false }
/// ```
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmmProperties {
    pub name: String,
    /// type selector: `0` discrete, `1` continuous, `2` discrete pair
    pub kind: i64,
    /// alphabet of new discrete models
    pub alphabet: AlphabetPreset,
    /// highest emission order; `0` disables higher-order emissions
    pub max_order: u32,
    /// number of transition classes
    pub switching: usize,
    pub tied: bool,
    pub silent: bool,
    pub background: bool,
    pub labels: bool,
}

impl Default for HmmProperties {
    fn default() -> Self {
        HmmProperties {
            name: String::new(),
            kind: 0,
            alphabet: AlphabetPreset::default(),
            max_order: 0,
            switching: 1,
            tied: false,
            silent: false,
            background: false,
            labels: false,
        }
    }
}

impl HmmProperties {
    /// number of transition classes, at least one
    pub fn class_count(&self) -> usize {
        self.switching.max(1)
    }
    ///
    /// Properties declaring a model of `descriptor`, used for loaded models.
    ///
    /// `max_order` is the highest emission order found in the model; it is
    /// kept only for higher-order families.
    ///
    pub fn describe(
        name: &str,
        descriptor: &ModelDescriptor,
        class_count: usize,
        max_order: u32,
    ) -> HmmProperties {
        let (kind, max_order) = match descriptor.family {
            EmissionFamily::Discrete => (ModelKind::Discrete, 0),
            EmissionFamily::DiscreteHigherOrder => (ModelKind::Discrete, max_order.max(1)),
            EmissionFamily::Continuous => (ModelKind::Continuous, 0),
            EmissionFamily::DiscretePair => (ModelKind::DiscretePair, 0),
        };
        let switching = match descriptor.transitions {
            TransitionKind::Simple => 1,
            TransitionKind::Switched => class_count,
        };
        let features = descriptor.features;
        HmmProperties {
            name: name.to_owned(),
            kind: kind.selector(),
            max_order,
            switching,
            tied: features.contains(FeatureTag::Tied),
            silent: features.contains(FeatureTag::Silent),
            background: features.contains(FeatureTag::Background),
            labels: features.contains(FeatureTag::Labeled),
            ..HmmProperties::default()
        }
    }
    pub fn from_json_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
    pub fn to_json_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

impl std::fmt::Display for HmmProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "name: {}", self.name)?;
        writeln!(f, "kind: {}", self.kind)?;
        writeln!(f, "alphabet: {}", self.alphabet)?;
        writeln!(f, "max_order: {}", self.max_order)?;
        writeln!(f, "switching: {}", self.switching)?;
        writeln!(f, "tied: {}", self.tied)?;
        writeln!(f, "silent: {}", self.silent)?;
        writeln!(f, "background: {}", self.background)?;
        writeln!(f, "labels: {}", self.labels)
    }
}

//
// tests
//
