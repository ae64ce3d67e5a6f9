//!
//! Transition weights
//!
//! Endpoints of a transition are the endpoints of its edge in the graph of
//! `Hmm`; this type only holds the weight(s).
//!
use crate::common::is_valid_weight;
use crate::error::{HmmError, Result};
use crate::flat::FlatState;
use crate::model_type::TransitionKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// single class
    Simple(f64),
    /// one weight per transition class; the class count is fixed at creation
    Switched(Vec<f64>),
}

impl Transition {
    ///
    /// Zero-weighted transition of `kind`; `class_count` is used by `Switched` only.
    ///
    pub fn new(kind: TransitionKind, class_count: usize) -> Transition {
        match kind {
            TransitionKind::Simple => Transition::Simple(0.0),
            TransitionKind::Switched => Transition::Switched(vec![0.0; class_count]),
        }
    }
    pub fn kind(&self) -> TransitionKind {
        match self {
            Transition::Simple(_) => TransitionKind::Simple,
            Transition::Switched(_) => TransitionKind::Switched,
        }
    }
    pub fn class_count(&self) -> usize {
        match self {
            Transition::Simple(_) => 1,
            Transition::Switched(w) => w.len(),
        }
    }
    /// weight of class `class`
    pub fn weight(&self, class: usize) -> Option<f64> {
        match self {
            Transition::Simple(w) if class == 0 => Some(*w),
            Transition::Simple(_) => None,
            Transition::Switched(w) => w.get(class).copied(),
        }
    }
    pub fn set_weight(&mut self, class: usize, value: f64) -> Result<()> {
        if !is_valid_weight(value) {
            return Err(HmmError::InvalidWeight(value));
        }
        let n = self.class_count();
        match self {
            Transition::Simple(w) if class == 0 => *w = value,
            Transition::Switched(w) if class < n => w[class] = value,
            _ => {
                return Err(HmmError::IndexOutOfRange {
                    index: class,
                    size: n,
                })
            }
        }
        Ok(())
    }
    ///
    /// Scale the weight of class `class` by `factor`
    ///
    pub(crate) fn scale(&mut self, class: usize, factor: f64) {
        match self {
            Transition::Simple(w) if class == 0 => *w *= factor,
            Transition::Switched(w) if class < w.len() => w[class] *= factor,
            _ => {}
        }
    }
    ///
    /// Recreate this transition for a model of `kind` with `class_count` classes.
    ///
    /// Shared classes keep their weights; new classes get the weight of class 0.
    ///
    pub fn recreate(&self, kind: TransitionKind, class_count: usize) -> Transition {
        let first = self.weight(0).unwrap_or(0.0);
        match kind {
            TransitionKind::Simple => Transition::Simple(first),
            TransitionKind::Switched => Transition::Switched(
                (0..class_count)
                    .map(|c| self.weight(c).unwrap_or(first))
                    .collect(),
            ),
        }
    }
    ///
    /// Read the weight(s) of the `position`-th outgoing transition of `state`
    /// in a flat record of `class_count` transition classes. Weights outside
    /// of `[0, 1]` are a corrupt record.
    ///
    pub fn read_from_flat(
        &mut self,
        state: &FlatState,
        class_count: usize,
        position: usize,
    ) -> Result<()> {
        let read = |class: usize| -> Result<f64> {
            let w = state.out_prob(class, position).ok_or_else(|| {
                HmmError::corrupt(format!(
                    "no weight for outgoing transition {} in a {}-class record",
                    position, class_count
                ))
            })?;
            if is_valid_weight(w) {
                Ok(w)
            } else {
                Err(HmmError::corrupt(format!(
                    "weight {} of outgoing transition {} is not in [0, 1]",
                    w, position
                )))
            }
        };
        match self {
            Transition::Simple(w) => {
                if class_count != 1 {
                    return Err(HmmError::InvalidClassCount {
                        expected: 1,
                        found: class_count,
                    });
                }
                *w = read(0)?;
            }
            Transition::Switched(w) => {
                if class_count != w.len() {
                    return Err(HmmError::InvalidClassCount {
                        expected: w.len(),
                        found: class_count,
                    });
                }
                for (class, weight) in w.iter_mut().enumerate() {
                    *weight = read(class)?;
                }
            }
        }
        Ok(())
    }
    ///
    /// Weights of the flat record, one per class.
    /// `Simple` writes a single scalar, `Switched` a `class_count` vector.
    ///
    pub fn write_to_flat(&self, class_count: usize) -> Result<Vec<f64>> {
        if self.class_count() != class_count {
            return Err(HmmError::InvalidClassCount {
                expected: class_count,
                found: self.class_count(),
            });
        }
        Ok(match self {
            Transition::Simple(w) => vec![*w],
            Transition::Switched(w) => w.clone(),
        })
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Transition::Simple(w) => write!(f, "p={}", w),
            Transition::Switched(w) => write!(f, "p={:?}", w),
        }
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::EmissionRecord;

    fn flat_state_with_out(out_a: Vec<Vec<f64>>) -> FlatState {
        let degree = out_a[0].len();
        FlatState {
            pi: 0.0,
            fix: false,
            desc: String::new(),
            x_position: 0,
            y_position: 0,
            in_id: vec![],
            in_a: vec![vec![]; out_a.len()],
            out_id: (0..degree).collect(),
            out_a,
            emission: EmissionRecord::Discrete { b: vec![1.0] },
        }
    }

    #[test]
    fn simple_weight() {
        let mut t = Transition::new(TransitionKind::Simple, 1);
        t.set_weight(0, 0.6).unwrap();
        assert_eq!(t.weight(0), Some(0.6));
        assert_eq!(t.weight(1), None);
        assert!(matches!(t.set_weight(0, 1.2), Err(HmmError::InvalidWeight(_))));
        assert!(matches!(
            t.set_weight(1, 0.2),
            Err(HmmError::IndexOutOfRange { .. })
        ));
        assert_eq!(t.write_to_flat(1).unwrap(), vec![0.6]);
    }
    #[test]
    fn switched_reads_one_weight_per_class() {
        let state = flat_state_with_out(vec![vec![0.1, 0.2], vec![0.3, 0.4], vec![0.5, 0.6]]);
        let mut t = Transition::new(TransitionKind::Switched, 3);
        t.read_from_flat(&state, 3, 1).unwrap();
        assert_eq!(t, Transition::Switched(vec![0.2, 0.4, 0.6]));
        assert_eq!(t.write_to_flat(3).unwrap(), vec![0.2, 0.4, 0.6]);
    }
    #[test]
    fn simple_rejects_multiple_classes() {
        let state = flat_state_with_out(vec![vec![0.1], vec![0.3], vec![0.5]]);
        let mut t = Transition::new(TransitionKind::Simple, 1);
        assert!(matches!(
            t.read_from_flat(&state, 3, 0),
            Err(HmmError::InvalidClassCount {
                expected: 1,
                found: 3
            })
        ));
    }
    #[test]
    fn switched_rejects_other_class_count() {
        let state = flat_state_with_out(vec![vec![0.1], vec![0.3]]);
        let mut t = Transition::new(TransitionKind::Switched, 3);
        assert!(matches!(
            t.read_from_flat(&state, 2, 0),
            Err(HmmError::InvalidClassCount { .. })
        ));
        assert!(t.write_to_flat(2).is_err());
    }
    #[test]
    fn recreate_for_other_class_count() {
        let t = Transition::Simple(0.7);
        assert_eq!(
            t.recreate(TransitionKind::Switched, 3),
            Transition::Switched(vec![0.7, 0.7, 0.7])
        );
        let t = Transition::Switched(vec![0.1, 0.2, 0.3]);
        assert_eq!(
            t.recreate(TransitionKind::Switched, 2),
            Transition::Switched(vec![0.1, 0.2])
        );
        assert_eq!(
            t.recreate(TransitionKind::Switched, 4),
            Transition::Switched(vec![0.1, 0.2, 0.3, 0.1])
        );
        assert_eq!(t.recreate(TransitionKind::Simple, 1), Transition::Simple(0.1));
    }
    #[test]
    fn weights_out_of_range_are_rejected_on_read() {
        let mut t = Transition::new(TransitionKind::Simple, 1);
        for w in [7.5, -0.5, f64::NAN].iter() {
            let state = flat_state_with_out(vec![vec![*w]]);
            assert!(matches!(
                t.read_from_flat(&state, 1, 0),
                Err(HmmError::CorruptRecord(_))
            ));
        }
        let state = flat_state_with_out(vec![vec![0.2, 0.3], vec![0.4, 1.5]]);
        let mut t = Transition::new(TransitionKind::Switched, 2);
        assert!(t.read_from_flat(&state, 2, 0).is_ok());
        assert!(matches!(
            t.read_from_flat(&state, 2, 1),
            Err(HmmError::CorruptRecord(_))
        ));
    }
}
