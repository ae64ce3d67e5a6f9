//!
//! Continuous mixture emission
//!
use crate::error::{HmmError, Result};
use crate::flat::ComponentRecord;
use derive_new::new;

///
/// Kind of a mixture component density.
///
/// Codes are the density codes of the flat record. Code 2 (approximated
/// normal) exists in the numeric engine but is not editable here.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityKind {
    Normal,
    NormalTruncRight,
    NormalTruncLeft,
    Uniform,
}

impl DensityKind {
    pub fn code(self) -> i32 {
        match self {
            DensityKind::Normal => 0,
            DensityKind::NormalTruncRight => 1,
            DensityKind::NormalTruncLeft => 3,
            DensityKind::Uniform => 4,
        }
    }
    pub fn from_code(code: i32) -> Result<DensityKind> {
        match code {
            0 => Ok(DensityKind::Normal),
            1 => Ok(DensityKind::NormalTruncRight),
            3 => Ok(DensityKind::NormalTruncLeft),
            4 => Ok(DensityKind::Uniform),
            _ => Err(HmmError::corrupt(format!("unknown density code {}", code))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Density {
    Normal { mean: f64, variance: f64 },
    /// normal density truncated at `tail`, keeping the right side
    NormalTruncRight { mean: f64, variance: f64, tail: f64 },
    /// normal density truncated at `tail`, keeping the left side
    NormalTruncLeft { mean: f64, variance: f64, tail: f64 },
    Uniform { min: f64, max: f64 },
}

impl Density {
    pub fn kind(&self) -> DensityKind {
        match self {
            Density::Normal { .. } => DensityKind::Normal,
            Density::NormalTruncRight { .. } => DensityKind::NormalTruncRight,
            Density::NormalTruncLeft { .. } => DensityKind::NormalTruncLeft,
            Density::Uniform { .. } => DensityKind::Uniform,
        }
    }
    ///
    /// (location, scale, truncation) triple of the flat record.
    /// A uniform density is stored as `(max, min, 0)`.
    ///
    pub fn parameters(&self) -> (f64, f64, f64) {
        match *self {
            Density::Normal { mean, variance } => (mean, variance, 0.0),
            Density::NormalTruncRight {
                mean,
                variance,
                tail,
            } => (mean, variance, tail),
            Density::NormalTruncLeft {
                mean,
                variance,
                tail,
            } => (mean, variance, tail),
            Density::Uniform { min, max } => (max, min, 0.0),
        }
    }
    pub fn from_parameters(kind: DensityKind, mue: f64, u: f64, a: f64) -> Density {
        match kind {
            DensityKind::Normal => Density::Normal {
                mean: mue,
                variance: u,
            },
            DensityKind::NormalTruncRight => Density::NormalTruncRight {
                mean: mue,
                variance: u,
                tail: a,
            },
            DensityKind::NormalTruncLeft => Density::NormalTruncLeft {
                mean: mue,
                variance: u,
                tail: a,
            },
            DensityKind::Uniform => Density::Uniform { min: u, max: mue },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, new)]
pub struct MixtureComponent {
    pub density: Density,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixtureEmission {
    pub components: Vec<MixtureComponent>,
}

impl MixtureEmission {
    /// single standard normal component
    pub fn standard_normal() -> MixtureEmission {
        MixtureEmission {
            components: vec![MixtureComponent::new(
                Density::Normal {
                    mean: 0.0,
                    variance: 1.0,
                },
                1.0,
            )],
        }
    }
    pub fn write_flat(&self, owner: &str) -> Result<Vec<ComponentRecord>> {
        if self.components.is_empty() {
            return Err(HmmError::EmissionShapeMismatch {
                owner: owner.to_owned(),
                expected: 1,
                found: 0,
            });
        }
        Ok(self
            .components
            .iter()
            .map(|c| {
                let (mue, u, a) = c.density.parameters();
                ComponentRecord {
                    density: c.density.kind().code(),
                    mue,
                    u,
                    a,
                    c: c.weight,
                }
            })
            .collect())
    }
    pub fn read_flat(records: &[ComponentRecord]) -> Result<MixtureEmission> {
        let components = records
            .iter()
            .map(|r| {
                let kind = DensityKind::from_code(r.density)?;
                Ok(MixtureComponent {
                    density: Density::from_parameters(kind, r.mue, r.u, r.a),
                    weight: r.c,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MixtureEmission { components })
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_codes() {
        for kind in [
            DensityKind::Normal,
            DensityKind::NormalTruncRight,
            DensityKind::NormalTruncLeft,
            DensityKind::Uniform,
        ] {
            assert_eq!(DensityKind::from_code(kind.code()).unwrap(), kind);
        }
        assert!(matches!(
            DensityKind::from_code(2),
            Err(HmmError::CorruptRecord(_))
        ));
    }
    #[test]
    fn uniform_is_written_max_first() {
        let e = MixtureEmission {
            components: vec![
                MixtureComponent {
                    density: Density::Uniform { min: -1.0, max: 3.0 },
                    weight: 0.25,
                },
                MixtureComponent {
                    density: Density::NormalTruncLeft {
                        mean: 1.0,
                        variance: 2.0,
                        tail: 0.5,
                    },
                    weight: 0.75,
                },
            ],
        };
        let records = e.write_flat("s0").unwrap();
        assert_eq!(records[0].density, 4);
        assert_eq!((records[0].mue, records[0].u, records[0].a), (3.0, -1.0, 0.0));
        assert_eq!(records[1].density, 3);
        assert_eq!(records[1].c, 0.75);
        assert_eq!(MixtureEmission::read_flat(&records).unwrap(), e);
    }
    #[test]
    fn empty_mixture_is_rejected() {
        let e = MixtureEmission { components: vec![] };
        assert!(matches!(
            e.write_flat("s1"),
            Err(HmmError::EmissionShapeMismatch { .. })
        ));
    }
}
