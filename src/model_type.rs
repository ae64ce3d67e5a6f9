//!
//! Model type bitmask and its resolution into variant descriptors
//!
//! The bitmask is the persisted form of the model type. It is computed once
//! from the declared editor properties (`compute_bitmask`) and resolved once
//! into a `ModelDescriptor` (`resolve`). The rest of the crate works on the
//! descriptor and never inspects raw bits.
//!
//! ```text
//! bit        value  meaning
//! LEFT_RIGHT     1  left-right model (not editable)
//! SILENT         4  silent states
//! TIED           8  tied emissions
//! HIGHER_ORDER  16  higher-order discrete emissions
//! BACKGROUND    32  background distributions
//! LABELED       64  labeled states
//! CLASSES      128  transition classes (switching)
//! DISCRETE     256  discrete emissions
//! CONTINUOUS   512  continuous mixture emissions
//! PAIR        1024  pair emissions (with DISCRETE)
//! ```
//!
use crate::alphabet::{Alphabet, AlphabetPreset};
use crate::error::{HmmError, Result};
use crate::hmm::properties::HmmProperties;
use crate::state::features::FeatureSet;
use log::debug;

pub const LEFT_RIGHT: u32 = 1;
pub const SILENT_STATES: u32 = 1 << 2;
pub const TIED_EMISSIONS: u32 = 1 << 3;
pub const HIGHER_ORDER_EMISSIONS: u32 = 1 << 4;
pub const BACKGROUND_DISTRIBUTIONS: u32 = 1 << 5;
pub const LABELED_STATES: u32 = 1 << 6;
pub const TRANSITION_CLASSES: u32 = 1 << 7;
pub const DISCRETE: u32 = 1 << 8;
pub const CONTINUOUS: u32 = 1 << 9;
pub const PAIR: u32 = 1 << 10;

/// bits selecting emission family and order
const FAMILY_MASK: u32 = DISCRETE | CONTINUOUS | PAIR | HIGHER_ORDER_EMISSIONS;

/// bits of the optional state features
pub const FEATURE_MASK: u32 =
    SILENT_STATES | TIED_EMISSIONS | BACKGROUND_DISTRIBUTIONS | LABELED_STATES;

///
/// Model kind chosen in the editor (the type selector)
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Discrete,
    Continuous,
    DiscretePair,
}

impl ModelKind {
    ///
    /// `0` discrete, `1` continuous, `2` discrete pair
    ///
    pub fn from_selector(selector: i64) -> Result<ModelKind> {
        match selector {
            0 => Ok(ModelKind::Discrete),
            1 => Ok(ModelKind::Continuous),
            2 => Ok(ModelKind::DiscretePair),
            _ => Err(HmmError::InvalidFamily(selector)),
        }
    }
    pub fn selector(self) -> i64 {
        match self {
            ModelKind::Discrete => 0,
            ModelKind::Continuous => 1,
            ModelKind::DiscretePair => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionFamily {
    Discrete,
    DiscreteHigherOrder,
    Continuous,
    DiscretePair,
}

impl EmissionFamily {
    /// emissions of this family are defined over an alphabet
    pub fn has_alphabet(self) -> bool {
        match self {
            EmissionFamily::Discrete | EmissionFamily::DiscreteHigherOrder => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// one weight per transition
    Simple,
    /// one weight per transition class
    Switched,
}

///
/// Variant set selected by a model type bitmask
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub family: EmissionFamily,
    pub transitions: TransitionKind,
    pub features: FeatureSet,
}

impl ModelDescriptor {
    ///
    /// Bitmask of this descriptor (inverse of `resolve`)
    ///
    pub fn bits(&self) -> u32 {
        let family = match self.family {
            EmissionFamily::Discrete => DISCRETE,
            EmissionFamily::DiscreteHigherOrder => DISCRETE | HIGHER_ORDER_EMISSIONS,
            EmissionFamily::Continuous => CONTINUOUS,
            EmissionFamily::DiscretePair => DISCRETE | PAIR,
        };
        let classes = match self.transitions {
            TransitionKind::Simple => 0,
            TransitionKind::Switched => TRANSITION_CLASSES,
        };
        family | classes | self.features.bits()
    }
    ///
    /// Alphabet factory: a new alphabet of `preset` for discrete families.
    /// Continuous models have no alphabet, and pair models are not
    /// supported yet so they get none either.
    ///
    pub fn new_alphabet(&self, preset: AlphabetPreset) -> Option<Alphabet> {
        if self.family.has_alphabet() {
            Some(preset.build())
        } else {
            None
        }
    }
}

impl std::fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{:?} emissions, {:?} transitions, states {}",
            self.family, self.transitions, self.features
        )
    }
}

///
/// Compute the model type bitmask from the declared properties.
///
/// Higher-order emissions are a property of discrete models only, so
/// `max_order` is ignored for continuous and pair models.
///
pub fn compute_bitmask(properties: &HmmProperties) -> Result<u32> {
    let kind = ModelKind::from_selector(properties.kind)?;
    let mut bits = match kind {
        ModelKind::Discrete => {
            if properties.max_order > 0 {
                DISCRETE | HIGHER_ORDER_EMISSIONS
            } else {
                DISCRETE
            }
        }
        ModelKind::Continuous => CONTINUOUS,
        ModelKind::DiscretePair => DISCRETE | PAIR,
    };
    if properties.switching > 1 {
        bits |= TRANSITION_CLASSES;
    }
    if properties.tied {
        bits |= TIED_EMISSIONS;
    }
    if properties.silent {
        bits |= SILENT_STATES;
    }
    if properties.background {
        bits |= BACKGROUND_DISTRIBUTIONS;
    }
    if properties.labels {
        bits |= LABELED_STATES;
    }
    debug!("model type of {:?} = {:#x}", properties, bits);
    Ok(bits)
}

///
/// Resolve a bitmask into the emission family, the transition kind and the
/// state feature set.
///
/// Fails with `UnsupportedModelType` when family bits conflict or when bits
/// outside of family/order/classes/features are set.
///
pub fn resolve(bits: u32) -> Result<ModelDescriptor> {
    let discrete = bits & DISCRETE != 0;
    let continuous = bits & CONTINUOUS != 0;
    let pair = bits & PAIR != 0;
    let higher_order = bits & HIGHER_ORDER_EMISSIONS != 0;

    let family = match (discrete, continuous, pair, higher_order) {
        (true, false, false, false) => EmissionFamily::Discrete,
        (true, false, false, true) => EmissionFamily::DiscreteHigherOrder,
        (true, false, true, false) => EmissionFamily::DiscretePair,
        (false, true, false, false) => EmissionFamily::Continuous,
        (true, true, _, _) => {
            return Err(HmmError::unsupported(bits, "both discrete and continuous"))
        }
        (false, true, true, _) => {
            return Err(HmmError::unsupported(bits, "pair emissions are discrete"))
        }
        (_, _, true, true) => {
            return Err(HmmError::unsupported(bits, "higher-order pair emissions"))
        }
        (false, true, _, true) => {
            return Err(HmmError::unsupported(bits, "higher-order continuous emissions"))
        }
        (false, false, _, _) => return Err(HmmError::unsupported(bits, "no emission family")),
    };

    let transitions = if bits & TRANSITION_CLASSES != 0 {
        TransitionKind::Switched
    } else {
        TransitionKind::Simple
    };

    let features = select_variant(bits & !(FAMILY_MASK | TRANSITION_CLASSES))?;
    Ok(ModelDescriptor {
        family,
        transitions,
        features,
    })
}

///
/// Select the state variant (one of the 16 feature combinations) from the
/// residual bits of a model type.
///
pub fn select_variant(residual: u32) -> Result<FeatureSet> {
    if residual & !FEATURE_MASK != 0 {
        return Err(HmmError::unsupported(
            residual,
            format!("unsupported bits {:#x}", residual & !FEATURE_MASK),
        ));
    }
    Ok(FeatureSet::from_bits(residual))
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::features::FeatureTag;
    use test_case::test_case;

    #[test]
    fn bitmask_of_plain_discrete() {
        let p = HmmProperties::default();
        assert_eq!(compute_bitmask(&p).unwrap(), DISCRETE);
    }
    #[test]
    fn bitmask_of_all_properties() {
        let p = HmmProperties {
            kind: 0,
            max_order: 2,
            switching: 3,
            tied: true,
            silent: true,
            background: true,
            labels: true,
            ..HmmProperties::default()
        };
        assert_eq!(
            compute_bitmask(&p).unwrap(),
            DISCRETE
                | HIGHER_ORDER_EMISSIONS
                | TRANSITION_CLASSES
                | TIED_EMISSIONS
                | SILENT_STATES
                | BACKGROUND_DISTRIBUTIONS
                | LABELED_STATES
        );
    }
    #[test]
    fn bitmask_ignores_order_of_continuous() {
        let p = HmmProperties {
            kind: 1,
            max_order: 2,
            ..HmmProperties::default()
        };
        assert_eq!(compute_bitmask(&p).unwrap(), CONTINUOUS);
        let p = HmmProperties {
            kind: 2,
            ..HmmProperties::default()
        };
        assert_eq!(compute_bitmask(&p).unwrap(), DISCRETE | PAIR);
    }
    #[test_case(3)]
    #[test_case(-1)]
    fn invalid_family_selector(selector: i64) {
        let p = HmmProperties {
            kind: selector,
            ..HmmProperties::default()
        };
        assert!(matches!(
            compute_bitmask(&p),
            Err(HmmError::InvalidFamily(s)) if s == selector
        ));
    }
    #[test_case(DISCRETE => EmissionFamily::Discrete)]
    #[test_case(DISCRETE | HIGHER_ORDER_EMISSIONS => EmissionFamily::DiscreteHigherOrder)]
    #[test_case(DISCRETE | PAIR => EmissionFamily::DiscretePair)]
    #[test_case(CONTINUOUS | TRANSITION_CLASSES => EmissionFamily::Continuous)]
    fn resolve_family(bits: u32) -> EmissionFamily {
        resolve(bits).unwrap().family
    }
    #[test_case(CONTINUOUS | PAIR)]
    #[test_case(DISCRETE | CONTINUOUS)]
    #[test_case(CONTINUOUS | HIGHER_ORDER_EMISSIONS)]
    #[test_case(DISCRETE | PAIR | HIGHER_ORDER_EMISSIONS)]
    #[test_case(SILENT_STATES)]
    #[test_case(DISCRETE | LEFT_RIGHT)]
    #[test_case(DISCRETE | (1 << 11))]
    fn resolve_rejects(bits: u32) {
        assert!(matches!(
            resolve(bits),
            Err(HmmError::UnsupportedModelType { .. })
        ));
    }
    #[test]
    fn resolve_transition_kind() {
        assert_eq!(resolve(DISCRETE).unwrap().transitions, TransitionKind::Simple);
        assert_eq!(
            resolve(DISCRETE | TRANSITION_CLASSES).unwrap().transitions,
            TransitionKind::Switched
        );
    }
    #[test]
    fn resolve_is_total_over_feature_combinations() {
        for family in [DISCRETE, CONTINUOUS] {
            for residual in 0..16u32 {
                let tags: Vec<FeatureTag> = FeatureTag::CANONICAL_ORDER
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| residual & (1 << k) != 0)
                    .map(|(_, t)| *t)
                    .collect();
                let bits = family | tags.iter().fold(0, |acc, t| acc | t.bit());
                let descriptor = resolve(bits).unwrap();
                for tag in FeatureTag::CANONICAL_ORDER.iter() {
                    assert_eq!(descriptor.features.contains(*tag), tags.contains(tag));
                }
                assert_eq!(descriptor.bits(), bits);
            }
        }
    }
    #[test]
    fn alphabet_factory() {
        let d = resolve(DISCRETE).unwrap();
        assert_eq!(d.new_alphabet(AlphabetPreset::Dna).unwrap().size(), 4);
        assert!(resolve(CONTINUOUS)
            .unwrap()
            .new_alphabet(AlphabetPreset::Dna)
            .is_none());
        assert!(resolve(DISCRETE | PAIR)
            .unwrap()
            .new_alphabet(AlphabetPreset::Dna)
            .is_none());
    }
}
