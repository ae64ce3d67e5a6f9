//!
//! Per-state emission parameterization
//!
//! * `Discrete`: weights over the alphabet
//! * `HigherOrder`: weights over `M^order` symbol tuples
//! * `Continuous`: mixture of normal/truncated normal/uniform densities
//! * `Pair`: discrete pair emissions, not supported by the converter
//!
pub mod discrete;
pub mod mixture;

pub use discrete::DiscreteEmission;
pub use mixture::{Density, DensityKind, MixtureComponent, MixtureEmission};

use crate::error::{HmmError, Result};
use crate::flat::EmissionRecord;
use crate::model_type::{self, EmissionFamily};

#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Discrete(DiscreteEmission),
    HigherOrder(DiscreteEmission),
    Continuous(MixtureEmission),
    Pair,
}

impl Emission {
    ///
    /// Default emission of a new state of `family` over an alphabet of
    /// `alphabet_size` symbols (uniform discrete, order 1 for higher-order
    /// tables, a standard normal for continuous).
    ///
    pub fn new(family: EmissionFamily, alphabet_size: usize) -> Emission {
        match family {
            EmissionFamily::Discrete => {
                Emission::Discrete(DiscreteEmission::uniform(alphabet_size))
            }
            EmissionFamily::DiscreteHigherOrder => {
                Emission::HigherOrder(DiscreteEmission::uniform(alphabet_size))
            }
            EmissionFamily::Continuous => Emission::Continuous(MixtureEmission::standard_normal()),
            EmissionFamily::DiscretePair => Emission::Pair,
        }
    }
    pub fn family(&self) -> EmissionFamily {
        match self {
            Emission::Discrete(_) => EmissionFamily::Discrete,
            Emission::HigherOrder(_) => EmissionFamily::DiscreteHigherOrder,
            Emission::Continuous(_) => EmissionFamily::Continuous,
            Emission::Pair => EmissionFamily::DiscretePair,
        }
    }
    /// discrete table if the emission has one
    pub fn discrete(&self) -> Option<&DiscreteEmission> {
        match self {
            Emission::Discrete(e) | Emission::HigherOrder(e) => Some(e),
            _ => None,
        }
    }
    pub fn discrete_mut(&mut self) -> Option<&mut DiscreteEmission> {
        match self {
            Emission::Discrete(e) | Emission::HigherOrder(e) => Some(e),
            _ => None,
        }
    }
    /// order of the table of a higher-order emission
    pub fn order(&self) -> Option<u32> {
        match self {
            Emission::HigherOrder(e) => Some(e.order()),
            _ => None,
        }
    }
    ///
    /// This emission can follow an alphabet change from `old_size` to
    /// `new_size` symbols. Continuous emissions are not bound to an alphabet.
    ///
    pub fn check_resize(&self, old_size: usize, new_size: usize, owner: &str) -> Result<()> {
        match self.discrete() {
            Some(e) => e.check_resize(old_size, new_size, owner),
            None => Ok(()),
        }
    }
    ///
    /// A symbol was appended to the alphabet (now `new_size` symbols).
    ///
    pub fn grow(&mut self, new_size: usize, owner: &str) -> Result<()> {
        match self.discrete_mut() {
            Some(e) => e.grow(new_size, owner),
            None => Ok(()),
        }
    }
    ///
    /// The symbol of code `index` was removed (alphabet now has `new_size` symbols).
    ///
    pub fn shrink(&mut self, index: usize, new_size: usize, owner: &str) -> Result<()> {
        match self.discrete_mut() {
            Some(e) => e.shrink(index, new_size, owner),
            None => Ok(()),
        }
    }
    ///
    /// This emission in a model of `family` with orders up to `max_order`.
    ///
    /// Tables move between the discrete and the higher-order family as long
    /// as their order is 1; a higher-order table above `max_order` is reset
    /// to a uniform one of `max_order`. Other family changes give the
    /// default emission of `family`.
    ///
    pub fn retyped(
        &self,
        family: EmissionFamily,
        alphabet_size: usize,
        max_order: u32,
    ) -> Emission {
        let max_order = max_order.max(1);
        match (self, family) {
            (Emission::Discrete(e), EmissionFamily::Discrete)
            | (Emission::HigherOrder(e), EmissionFamily::Discrete)
                if e.order() == 1 =>
            {
                Emission::Discrete(e.clone())
            }
            (Emission::Discrete(e), EmissionFamily::DiscreteHigherOrder)
            | (Emission::HigherOrder(e), EmissionFamily::DiscreteHigherOrder) => {
                if e.order() <= max_order {
                    Emission::HigherOrder(e.clone())
                } else {
                    DiscreteEmission::uniform_of_order(alphabet_size, max_order)
                        .map(Emission::HigherOrder)
                        .unwrap_or_else(|_| Emission::new(family, alphabet_size))
                }
            }
            (Emission::Continuous(e), EmissionFamily::Continuous) => {
                Emission::Continuous(e.clone())
            }
            _ => Emission::new(family, alphabet_size),
        }
    }
    /// `retyped` keeps the kind of emission between the two families
    pub fn carries_over(from: EmissionFamily, to: EmissionFamily) -> bool {
        from == to || (from.has_alphabet() && to.has_alphabet())
    }
    ///
    /// Emission parameters for the flat record.
    ///
    /// Discrete tables must have exactly `M^order` weights over a non-empty
    /// alphabet; `owner` names the state or background in errors.
    ///
    pub fn write_flat(&self, alphabet_size: usize, owner: &str) -> Result<EmissionRecord> {
        match self {
            Emission::Discrete(e) | Emission::HigherOrder(e) => {
                e.check_len(e.weights().len(), alphabet_size, owner)?;
                Ok(EmissionRecord::Discrete {
                    b: e.weights().to_vec(),
                })
            }
            Emission::Continuous(e) => Ok(EmissionRecord::Continuous {
                components: e.write_flat(owner)?,
            }),
            Emission::Pair => Err(pair_unsupported()),
        }
    }
    ///
    /// Emission of `family` from its flat record.
    ///
    /// `size_hint` is the alphabet size and `order` the table order
    /// (1 unless the family is higher-order).
    ///
    pub fn read_flat(
        family: EmissionFamily,
        record: &EmissionRecord,
        size_hint: usize,
        order: u32,
        owner: &str,
    ) -> Result<Emission> {
        match (family, record) {
            (EmissionFamily::Discrete, EmissionRecord::Discrete { b }) => {
                Ok(Emission::Discrete(read_table(b, size_hint, 1, owner)?))
            }
            (EmissionFamily::DiscreteHigherOrder, EmissionRecord::Discrete { b }) => {
                if order == 0 {
                    return Err(HmmError::corrupt(format!("{} has emission order 0", owner)));
                }
                Ok(Emission::HigherOrder(read_table(b, size_hint, order, owner)?))
            }
            (EmissionFamily::Continuous, EmissionRecord::Continuous { components }) => Ok(
                Emission::Continuous(MixtureEmission::read_flat(components)?),
            ),
            (EmissionFamily::DiscretePair, _) => Err(pair_unsupported()),
            (family, _) => Err(HmmError::corrupt(format!(
                "{} emission record does not match the {:?} family",
                owner, family
            ))),
        }
    }
}

fn read_table(b: &[f64], size_hint: usize, order: u32, owner: &str) -> Result<DiscreteEmission> {
    if discrete::table_len(size_hint, order).is_none() {
        return Err(HmmError::corrupt(format!(
            "{} has no table of order {} over {} symbols",
            owner, order, size_hint
        )));
    }
    let e = DiscreteEmission::with_order(b.to_vec(), order)?;
    e.check_len(b.len(), size_hint, owner)?;
    Ok(e)
}

fn pair_unsupported() -> HmmError {
    HmmError::unsupported(
        model_type::DISCRETE | model_type::PAIR,
        "pair emissions are not supported",
    )
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_emissions() {
        assert_eq!(
            Emission::new(EmissionFamily::Discrete, 4),
            Emission::Discrete(DiscreteEmission::uniform(4))
        );
        assert_eq!(Emission::new(EmissionFamily::DiscreteHigherOrder, 2).order(), Some(1));
        assert_eq!(
            Emission::new(EmissionFamily::Continuous, 0).family(),
            EmissionFamily::Continuous
        );
    }
    #[test]
    fn discrete_flat_roundtrip() {
        let e = Emission::Discrete(DiscreteEmission::from_weights(vec![0.1, 0.2, 0.3, 0.4]));
        let record = e.write_flat(4, "s0").unwrap();
        let f = Emission::read_flat(EmissionFamily::Discrete, &record, 4, 1, "s0").unwrap();
        assert_eq!(e, f);
    }
    #[test]
    fn discrete_shape_mismatch_is_not_fixed() {
        let e = Emission::Discrete(DiscreteEmission::from_weights(vec![0.5, 0.5]));
        assert!(matches!(
            e.write_flat(4, "s0"),
            Err(HmmError::EmissionShapeMismatch { .. })
        ));
        let record = EmissionRecord::Discrete { b: vec![0.5; 5] };
        assert!(matches!(
            Emission::read_flat(EmissionFamily::Discrete, &record, 4, 1, "s0"),
            Err(HmmError::EmissionShapeMismatch {
                expected: 4,
                found: 5,
                ..
            })
        ));
    }
    #[test]
    fn empty_alphabet_emission_can_not_be_written() {
        let e = Emission::new(EmissionFamily::Discrete, 0);
        assert!(e.discrete().unwrap().weights().is_empty());
        assert!(matches!(
            e.write_flat(0, "s0"),
            Err(HmmError::EmissionShapeMismatch { .. })
        ));
    }
    #[test]
    fn higher_order_reads_size_power_order() {
        let record = EmissionRecord::Discrete { b: vec![0.5; 8] };
        let e =
            Emission::read_flat(EmissionFamily::DiscreteHigherOrder, &record, 2, 3, "s2").unwrap();
        assert_eq!(e.order(), Some(3));
        assert!(Emission::read_flat(EmissionFamily::DiscreteHigherOrder, &record, 2, 2, "s2")
            .is_err());
    }
    #[test]
    fn pair_fails_fast() {
        assert!(matches!(
            Emission::Pair.write_flat(4, "s0"),
            Err(HmmError::UnsupportedModelType { .. })
        ));
        let record = EmissionRecord::Discrete { b: vec![] };
        assert!(matches!(
            Emission::read_flat(EmissionFamily::DiscretePair, &record, 0, 1, "s0"),
            Err(HmmError::UnsupportedModelType { .. })
        ));
    }
    #[test]
    fn family_mismatch_is_corrupt() {
        let record = EmissionRecord::Discrete { b: vec![1.0] };
        assert!(matches!(
            Emission::read_flat(EmissionFamily::Continuous, &record, 1, 1, "s0"),
            Err(HmmError::CorruptRecord(_))
        ));
    }
    #[test]
    fn retyped_carries_discrete_tables() {
        let e = Emission::Discrete(DiscreteEmission::from_weights(vec![0.1, 0.2, 0.3, 0.4]));
        let h = e.retyped(EmissionFamily::DiscreteHigherOrder, 4, 3);
        assert_eq!(h.order(), Some(1));
        assert_eq!(h.discrete().unwrap().weights(), &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(h.retyped(EmissionFamily::Discrete, 4, 0), e);

        let high = Emission::HigherOrder(DiscreteEmission::uniform_of_order(2, 3).unwrap());
        // order above the new maximum is clamped
        assert_eq!(high.retyped(EmissionFamily::DiscreteHigherOrder, 2, 2).order(), Some(2));
        assert_eq!(high.retyped(EmissionFamily::DiscreteHigherOrder, 2, 3), high);
        assert_eq!(
            high.retyped(EmissionFamily::Discrete, 2, 0),
            Emission::new(EmissionFamily::Discrete, 2)
        );
        assert_eq!(
            e.retyped(EmissionFamily::Continuous, 0, 0).family(),
            EmissionFamily::Continuous
        );
        assert!(Emission::carries_over(
            EmissionFamily::Discrete,
            EmissionFamily::DiscreteHigherOrder
        ));
        assert!(!Emission::carries_over(
            EmissionFamily::Discrete,
            EmissionFamily::Continuous
        ));
    }
    #[test]
    fn unrepresentable_order_is_corrupt() {
        let record = EmissionRecord::Discrete { b: vec![0.25; 4] };
        assert!(matches!(
            Emission::read_flat(EmissionFamily::DiscreteHigherOrder, &record, 4, 64, "s0"),
            Err(HmmError::CorruptRecord(_))
        ));
    }
    #[test]
    fn continuous_ignores_alphabet_changes() {
        let mut e = Emission::new(EmissionFamily::Continuous, 0);
        e.check_resize(7, 8, "s0").unwrap();
        e.grow(8, "s0").unwrap();
        e.shrink(0, 7, "s0").unwrap();
        assert_eq!(e, Emission::new(EmissionFamily::Continuous, 0));
    }
}
