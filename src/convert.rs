//!
//! Conversion between the editable graph (`Hmm`) and the flat record
//!
//! ```text
//! Idle -> Resolving -> Converting -> Done
//!              |            |
//!              +------------+------> Failed
//! ```
//!
//! Save assigns flat indices in ascending state id order. Load creates the
//! states in flat index order, so a loaded model has ids `0..n`.
//!
//! A failed conversion returns the error and nothing else: a load builds a
//! fresh `Hmm` that is dropped on failure, and a save builds a fresh record.
//!
use crate::alphabet::Alphabet;
use crate::common::{StateId, UNTIED};
use crate::error::{HmmError, Result};
use crate::flat::{FlatFile, FlatModel};
use crate::hmm::background::BackgroundSet;
use crate::hmm::properties::HmmProperties;
use crate::hmm::{Hmm, LABEL_ALPHABET_ID};
use crate::model_type::{resolve, EmissionFamily, ModelDescriptor, TransitionKind};
use crate::state::features::{FeatureColumns, FeatureTag, ReadContext, Tie, WriteContext};
use crate::state::Adjacency;
use crate::transition::Transition;
use fnv::FnvHashMap;
use log::{debug, info};
use petgraph::unionfind::UnionFind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Resolving,
    Converting,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Converter {
    phase: Phase,
}

impl Default for Converter {
    fn default() -> Self {
        Converter { phase: Phase::Idle }
    }
}

impl Converter {
    pub fn new() -> Converter {
        Converter::default()
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    fn enter(&mut self, phase: Phase) {
        debug!("converter: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.enter(Phase::Done),
            Err(e) => {
                debug!("conversion failed: {}", e);
                self.enter(Phase::Failed)
            }
        }
        result
    }
    ///
    /// Build the flat record of `hmm`
    ///
    pub fn graph_to_flat(&mut self, hmm: &Hmm) -> Result<FlatModel> {
        self.enter(Phase::Resolving);
        let result = self.save(hmm);
        self.finish(result)
    }
    ///
    /// Build a fresh `Hmm` from the single model of `file`
    ///
    pub fn flat_to_graph(&mut self, file: &FlatFile) -> Result<Hmm> {
        self.enter(Phase::Resolving);
        let result = self.load(file);
        self.finish(result)
    }

    fn save(&mut self, hmm: &Hmm) -> Result<FlatModel> {
        let descriptor = resolve(hmm.model_type())?;
        reject_pair(&descriptor)?;
        self.enter(Phase::Converting);

        let features = descriptor.features;
        let cos = hmm.class_count();
        let alphabet_size = hmm.alphabet_size();
        let ids = hmm.state_ids();
        let index_of: FnvHashMap<StateId, usize> =
            ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let tied_to = if features.contains(FeatureTag::Tied) {
            canonical_ties(hmm, &ids, &index_of)?
        } else {
            Vec::new()
        };
        let (backgrounds, background_index) = match hmm.backgrounds() {
            Some(set) => {
                let (records, index) = set.write_flat(alphabet_size)?;
                (Some(records), index)
            }
            None => (None, FnvHashMap::default()),
        };
        let ctx = WriteContext {
            tied_to: &tied_to,
            label_count: hmm.label_alphabet().map_or(0, |a| a.size()),
            background_index: &background_index,
        };

        let mut columns = FeatureColumns::new(features, ids.len());
        let mut states = Vec::with_capacity(ids.len());
        for (i, &id) in ids.iter().enumerate() {
            let adjacency = adjacency_of(hmm, id, &index_of, cos)?;
            let state = hmm.state(id)?;
            states.push(state.write_flat(i, adjacency, features, alphabet_size, &ctx, &mut columns)?);
        }
        let order = if descriptor.family == EmissionFamily::DiscreteHigherOrder {
            Some(
                hmm.states()
                    .map(|s| s.emission.order().unwrap_or(1))
                    .collect(),
            )
        } else {
            None
        };

        let model = FlatModel {
            name: hmm.name().to_owned(),
            model_type: descriptor.bits(),
            cos,
            states,
            silent: columns.silent,
            tied_to: columns.tied_to,
            label: columns.label,
            background_id: columns.background_id,
            order,
            alphabet: hmm.alphabet().map(|a| a.write_flat()),
            label_alphabet: hmm.label_alphabet().map(|a| a.write_flat()),
            backgrounds,
        };
        info!(
            "saved `{}`: type={:#x} states={} transitions={}",
            model.name,
            model.model_type,
            model.n(),
            hmm.n_transitions()
        );
        Ok(model)
    }

    fn load(&mut self, file: &FlatFile) -> Result<Hmm> {
        let model = match file.models.len() {
            0 => return Err(HmmError::corrupt("file contains no model")),
            1 => &file.models[0],
            n => return Err(HmmError::MultiModelUnsupported(n)),
        };
        model.validate()?;
        let descriptor = resolve(model.model_type)?;
        reject_pair(&descriptor)?;
        if descriptor.transitions == TransitionKind::Simple && model.cos != 1 {
            return Err(HmmError::InvalidClassCount {
                expected: 1,
                found: model.cos,
            });
        }
        if descriptor.transitions == TransitionKind::Switched && model.cos < 2 {
            return Err(HmmError::InvalidClassCount {
                expected: 2,
                found: model.cos,
            });
        }
        self.enter(Phase::Converting);

        let family = descriptor.family;
        let features = descriptor.features;
        let alphabet = match (&model.alphabet, family.has_alphabet()) {
            (Some(record), true) => Some(Alphabet::read_flat(record)?),
            (None, true) => return Err(HmmError::corrupt("alphabet is missing")),
            (Some(_), false) => {
                return Err(HmmError::corrupt(format!(
                    "{:?} emissions have no alphabet",
                    family
                )))
            }
            (None, false) => None,
        };
        let alphabet_size = alphabet.as_ref().map_or(0, |a| a.size());
        // presence of both collections follows the feature bits (`validate`)
        let label_alphabet = match &model.label_alphabet {
            Some(record) => Some(Alphabet::read_flat(record)?),
            None => None,
        };
        let label_count = label_alphabet.as_ref().map_or(0, |a| a.size());
        let backgrounds = match &model.backgrounds {
            Some(records) => Some(BackgroundSet::read_flat(records, family, alphabet_size)?),
            None => None,
        };
        let background_count = backgrounds.as_ref().map_or(0, |b| b.len());
        let max_order = model
            .order
            .as_ref()
            .and_then(|o| o.iter().copied().max())
            .unwrap_or(0);

        let properties = HmmProperties::describe(&model.name, &descriptor, model.cos, max_order);
        let mut hmm = Hmm::from_parts(
            properties,
            descriptor,
            model.cos,
            alphabet,
            label_alphabet.map(relabel),
            backgrounds,
        );

        // flat index -> state id
        let ids: Vec<StateId> = (0..model.n()).map(|_| hmm.add_state()).collect();

        for (i, flat) in model.states.iter().enumerate() {
            for (position, &j) in flat.out_id.iter().enumerate() {
                hmm.add_transition(ids[i], ids[j]).map_err(|_| {
                    HmmError::corrupt(format!("transition {} -> {} is repeated", i, j))
                })?;
                hmm.transition_mut(ids[i], ids[j])?
                    .read_from_flat(flat, model.cos, position)?;
            }
        }

        let ctx = ReadContext {
            state_ids: &ids,
            label_count,
            background_count,
        };
        for (i, &id) in ids.iter().enumerate() {
            hmm.state_mut(id)?
                .read_flat(model, i, family, alphabet_size, &ctx, features)?;
        }
        info!(
            "loaded `{}`: type={:#x} states={} transitions={}",
            hmm.name(),
            model.model_type,
            hmm.n_states(),
            hmm.n_transitions()
        );
        Ok(hmm)
    }
}

fn reject_pair(descriptor: &ModelDescriptor) -> Result<()> {
    if descriptor.family == EmissionFamily::DiscretePair {
        Err(HmmError::unsupported(
            descriptor.bits(),
            "pair emissions are not supported",
        ))
    } else {
        Ok(())
    }
}

/// label alphabets are always stored under the same id
fn relabel(alphabet: Alphabet) -> Alphabet {
    if alphabet.id() == LABEL_ALPHABET_ID {
        alphabet
    } else {
        Alphabet::new(LABEL_ALPHABET_ID, alphabet.symbols()).unwrap_or(alphabet)
    }
}

///
/// Flat `tied_to` value of every flat index.
///
/// States connected by ties form a group. Every member of a group gets the
/// smallest flat index of the group (the representative points to itself);
/// states without any tie keep `UNTIED`.
///
fn canonical_ties(
    hmm: &Hmm,
    ids: &[StateId],
    index_of: &FnvHashMap<StateId, usize>,
) -> Result<Vec<i64>> {
    let n = ids.len();
    let mut groups = UnionFind::new(n);
    let mut tied = vec![false; n];
    for (i, &id) in ids.iter().enumerate() {
        if let Some(Tie::To(target)) = hmm.state(id)?.tied_to() {
            let j = *index_of.get(&target).ok_or_else(|| {
                HmmError::corrupt(format!("{} is tied to unknown state {}", id, target))
            })?;
            groups.union(i, j);
            tied[i] = true;
            tied[j] = true;
        }
    }
    let mut minimum: FnvHashMap<usize, usize> = FnvHashMap::default();
    for i in (0..n).filter(|&i| tied[i]) {
        let root = groups.find_mut(i);
        let m = minimum.entry(root).or_insert(i);
        *m = (*m).min(i);
    }
    let mut tied_to = vec![UNTIED; n];
    for i in (0..n).filter(|&i| tied[i]) {
        tied_to[i] = minimum[&groups.find_mut(i)] as i64;
    }
    Ok(tied_to)
}

///
/// Adjacency of `id` in flat indices with `cos × degree` weight matrices
///
fn adjacency_of(
    hmm: &Hmm,
    id: StateId,
    index_of: &FnvHashMap<StateId, usize>,
    cos: usize,
) -> Result<Adjacency> {
    let (in_id, in_a) = weight_matrix(&hmm.in_transitions(id)?, index_of, cos)?;
    let (out_id, out_a) = weight_matrix(&hmm.out_transitions(id)?, index_of, cos)?;
    Ok(Adjacency {
        in_id,
        in_a,
        out_id,
        out_a,
    })
}

fn weight_matrix(
    neighbors: &[(StateId, &Transition)],
    index_of: &FnvHashMap<StateId, usize>,
    cos: usize,
) -> Result<(Vec<usize>, Vec<Vec<f64>>)> {
    let mut ids = Vec::with_capacity(neighbors.len());
    let mut rows = vec![Vec::with_capacity(neighbors.len()); cos];
    for (other, t) in neighbors.iter() {
        ids.push(index_of[other]);
        for (class, w) in t.write_to_flat(cos)?.into_iter().enumerate() {
            rows[class].push(w);
        }
    }
    Ok((ids, rows))
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{sid, NO_BACKGROUND};
    use crate::flat::EmissionRecord;
    use crate::hmm::mocks::*;
    use crate::model_type::{
        compute_bitmask, BACKGROUND_DISTRIBUTIONS, CONTINUOUS, DISCRETE, HIGHER_ORDER_EMISSIONS, LABELED_STATES,
        PAIR, SILENT_STATES, TIED_EMISSIONS, TRANSITION_CLASSES,
    };

    fn reload(hmm: &Hmm) -> Hmm {
        let flat = hmm.to_flat().unwrap();
        Hmm::from_flat(&FlatFile::single(flat)).unwrap()
    }

    #[test]
    fn dna_two_state_scenario() {
        let hmm = mock_dna_two_state();
        let flat = hmm.to_flat().unwrap();
        assert_eq!(flat.model_type, DISCRETE);
        assert_eq!(flat.n(), 2);
        assert_eq!(flat.cos, 1);
        for s in flat.states.iter() {
            assert_eq!(s.in_states(), 1);
            assert_eq!(s.out_states(), 1);
        }
        assert_eq!(flat.states[0].out_id, vec![1]);
        assert_eq!(flat.states[0].out_a, vec![vec![0.6]]);
        assert_eq!(flat.states[1].in_a, vec![vec![0.6]]);
        assert_eq!(flat.states[1].out_a, vec![vec![0.4]]);
        assert_eq!(flat.states[1].x_position, 120);
        assert_eq!(flat.states[0].pi, 1.0);
        assert_eq!(flat.states[1].pi, 0.0);
        assert_eq!(
            flat.states[0].emission,
            EmissionRecord::Discrete { b: vec![0.25; 4] }
        );
        assert_eq!(flat.alphabet.as_ref().unwrap().size(), 4);
        assert!(flat.silent.is_none());
        assert!(flat.tied_to.is_none());

        let loaded = reload(&hmm);
        assert_eq!(loaded.to_flat().unwrap(), flat);
        assert_eq!(loaded.name(), "dna");
        assert_abs_diff_eq!(loaded.state(sid(0)).unwrap().initial, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            loaded.transition(sid(1), sid(0)).unwrap().weight(0).unwrap(),
            0.4,
            epsilon = 1e-9
        );
    }
    #[test]
    fn tie_group_is_canonical() {
        // 5 -> 2 and 9 -> 2 are tied in a chain through 5
        let mut hmm = mock_tied(&[5, 2], 10);
        hmm.set_tied_to(sid(9), Some(sid(5))).unwrap();
        let flat = hmm.to_flat().unwrap();
        let tied_to = flat.tied_to.unwrap();
        assert_eq!(tied_to[2], 2);
        assert_eq!(tied_to[5], 2);
        assert_eq!(tied_to[9], 2);
        for i in [0, 1, 3, 4, 6, 7, 8].iter() {
            assert_eq!(tied_to[*i], UNTIED);
        }
    }
    #[test]
    fn tie_indices_follow_sorted_ids() {
        let mut hmm = mock_tied(&[2, 5, 9], 10);
        // flat indices shift after deleting s0
        hmm.delete_state(sid(0)).unwrap();
        let flat = hmm.to_flat().unwrap();
        let tied_to = flat.tied_to.clone().unwrap();
        assert_eq!(tied_to[1], 1);
        assert_eq!(tied_to[4], 1);
        assert_eq!(tied_to[8], 1);
        let loaded = Hmm::from_flat(&FlatFile::single(flat)).unwrap();
        assert_eq!(loaded.state(sid(8)).unwrap().tied_to(), Some(Tie::To(sid(1))));
        assert_eq!(loaded.state(sid(1)).unwrap().tied_to(), Some(Tie::To(sid(1))));
        assert_eq!(loaded.state(sid(0)).unwrap().tied_to(), Some(Tie::Untied));
    }
    #[test]
    fn switched_transitions_roundtrip() {
        let hmm = mock_switched(3);
        let flat = hmm.to_flat().unwrap();
        assert_eq!(flat.cos, 3);
        assert_eq!(flat.model_type, CONTINUOUS | TRANSITION_CLASSES);
        assert_eq!(flat.states[0].out_a.len(), 3);
        let loaded = Hmm::from_flat(&FlatFile::single(flat.clone())).unwrap();
        let t = loaded.transition(sid(0), sid(1)).unwrap();
        assert_eq!(t.class_count(), 3);
        for c in 0..3 {
            assert_abs_diff_eq!(t.weight(c).unwrap(), 0.1 * (c + 1) as f64, epsilon = 1e-9);
        }
        // the same weights read as single-class transitions
        let mut simple = flat;
        simple.model_type = CONTINUOUS;
        assert!(matches!(
            Hmm::from_flat(&FlatFile::single(simple)),
            Err(HmmError::InvalidClassCount {
                expected: 1,
                found: 3
            })
        ));
    }
    #[test]
    fn missing_background_attribute() {
        let mut hmm = mock_full_featured();
        hmm.state_mut(sid(2)).unwrap().attrs.background = None;
        assert!(matches!(
            hmm.to_flat(),
            Err(HmmError::InconsistentModelType {
                attribute: "background_id",
                ..
            })
        ));
    }
    #[test]
    fn full_featured_roundtrip() {
        let hmm = mock_full_featured();
        let flat = hmm.to_flat().unwrap();
        assert_eq!(
            flat.model_type,
            DISCRETE | SILENT_STATES | TIED_EMISSIONS | BACKGROUND_DISTRIBUTIONS | LABELED_STATES
        );
        assert_eq!(flat.background_id, Some(vec![NO_BACKGROUND, 0, NO_BACKGROUND]));
        assert_eq!(flat.tied_to, Some(vec![0, UNTIED, 0]));
        assert_eq!(flat.label, Some(vec![0, 0, 2]));
        assert_eq!(flat.label_alphabet.as_ref().unwrap().size(), 3);
        assert_eq!(flat.backgrounds.as_ref().unwrap().len(), 2);

        let loaded = reload(&hmm);
        assert_eq!(loaded.to_flat().unwrap(), flat);
        assert_eq!(loaded.state(sid(1)).unwrap().desc, "gc island");
        assert_eq!(loaded.backgrounds().unwrap().key_of("at-rich"), Some(1));
    }
    #[test]
    fn removed_background_keys_are_densified() {
        let mut hmm = mock_full_featured();
        hmm.add_background("cpg").unwrap();
        hmm.set_background(sid(0), Some("cpg")).unwrap();
        hmm.remove_background("gc-rich").unwrap();
        let flat = hmm.to_flat().unwrap();
        // at-rich -> 0, cpg -> 1
        assert_eq!(flat.background_id, Some(vec![1, NO_BACKGROUND, NO_BACKGROUND]));
        let loaded = Hmm::from_flat(&FlatFile::single(flat)).unwrap();
        assert_eq!(loaded.backgrounds().unwrap().key_of("cpg"), Some(1));
    }
    #[test]
    fn higher_order_roundtrip() {
        let mut hmm = Hmm::new(HmmProperties {
            max_order: 2,
            alphabet: crate::alphabet::AlphabetPreset::Binary,
            ..HmmProperties::default()
        })
        .unwrap();
        let a = hmm.add_state();
        let b = hmm.add_state();
        hmm.set_order(b, 2).unwrap();
        let flat = hmm.to_flat().unwrap();
        assert_eq!(flat.model_type, DISCRETE | HIGHER_ORDER_EMISSIONS);
        assert_eq!(flat.order, Some(vec![1, 2]));
        let loaded = Hmm::from_flat(&FlatFile::single(flat)).unwrap();
        assert_eq!(loaded.state(a).unwrap().emission.order(), Some(1));
        assert_eq!(
            loaded.state(b).unwrap().emission.discrete().unwrap().weights().len(),
            4
        );
        assert_eq!(loaded.properties().max_order, 2);
    }
    #[test]
    fn pair_models_fail_fast() {
        let hmm = Hmm::new(HmmProperties {
            kind: 2,
            ..HmmProperties::default()
        })
        .unwrap();
        let mut converter = Converter::new();
        assert!(matches!(
            converter.graph_to_flat(&hmm),
            Err(HmmError::UnsupportedModelType { bits, .. }) if bits == DISCRETE | PAIR
        ));
        assert_eq!(converter.phase(), Phase::Failed);
    }
    #[test]
    fn file_must_hold_one_model() {
        let flat = mock_dna_two_state().to_flat().unwrap();
        let two = FlatFile {
            models: vec![flat.clone(), flat],
        };
        assert!(matches!(
            Hmm::from_flat(&two),
            Err(HmmError::MultiModelUnsupported(2))
        ));
        assert!(matches!(
            Hmm::from_flat(&FlatFile::default()),
            Err(HmmError::CorruptRecord(_))
        ));
    }
    #[test]
    fn dangling_references_are_corrupt() {
        let mut flat = mock_full_featured().to_flat().unwrap();
        flat.background_id = Some(vec![5, NO_BACKGROUND, NO_BACKGROUND]);
        assert!(matches!(
            Hmm::from_flat(&FlatFile::single(flat.clone())),
            Err(HmmError::CorruptRecord(_))
        ));
        flat.background_id = Some(vec![NO_BACKGROUND; 3]);
        flat.tied_to = Some(vec![UNTIED, 3, UNTIED]);
        assert!(matches!(
            Hmm::from_flat(&FlatFile::single(flat.clone())),
            Err(HmmError::CorruptRecord(_))
        ));
        flat.tied_to = Some(vec![UNTIED; 3]);
        flat.label = Some(vec![0, 3, 0]);
        assert!(matches!(
            Hmm::from_flat(&FlatFile::single(flat)),
            Err(HmmError::CorruptRecord(_))
        ));
    }
    #[test]
    fn emission_shape_is_not_fixed_up() {
        let mut flat = mock_dna_two_state().to_flat().unwrap();
        flat.alphabet.as_mut().unwrap().symbols.push("N".to_owned());
        assert!(matches!(
            Hmm::from_flat(&FlatFile::single(flat)),
            Err(HmmError::EmissionShapeMismatch {
                expected: 5,
                found: 4,
                ..
            })
        ));
    }
    #[test]
    fn reload_keeps_model_on_failure() {
        let mut hmm = mock_dna_two_state();
        let mut bad = hmm.to_flat().unwrap();
        bad.model_type |= PAIR;
        assert!(hmm.reload(&FlatFile::single(bad)).is_err());
        assert_eq!(hmm.n_states(), 2);

        let other = FlatFile::single(mock_switched(2).to_flat().unwrap());
        hmm.reload(&other).unwrap();
        assert_eq!(hmm.n_states(), 3);
        assert_eq!(hmm.class_count(), 2);
    }
    #[test]
    fn phases() {
        let mut converter = Converter::new();
        assert_eq!(converter.phase(), Phase::Idle);
        converter.graph_to_flat(&mock_dna_two_state()).unwrap();
        assert_eq!(converter.phase(), Phase::Done);
    }
    #[test]
    fn switched_record_needs_two_classes() {
        let mut flat = mock_switched(2).to_flat().unwrap();
        flat.cos = 1;
        for state in flat.states.iter_mut() {
            state.in_a.truncate(1);
            state.out_a.truncate(1);
        }
        assert!(matches!(
            Hmm::from_flat(&FlatFile::single(flat)),
            Err(HmmError::InvalidClassCount {
                expected: 2,
                found: 1
            })
        ));
    }
    #[test]
    fn loaded_properties_describe_the_model() {
        for hmm in [mock_dna_two_state(), mock_switched(3), mock_full_featured()].iter() {
            let loaded = reload(hmm);
            let bits = compute_bitmask(loaded.properties()).unwrap();
            assert_eq!(bits, loaded.model_type());
            assert_eq!(&resolve(bits).unwrap(), loaded.descriptor());
        }
    }
    #[test]
    fn out_of_range_weights_are_corrupt() {
        let mut flat = mock_dna_two_state().to_flat().unwrap();
        flat.states[0].out_a = vec![vec![7.5]];
        flat.states[1].in_a = vec![vec![7.5]];
        assert!(matches!(
            Hmm::from_flat(&FlatFile::single(flat)),
            Err(HmmError::CorruptRecord(_))
        ));
    }
    #[test]
    fn undeclared_collections_are_corrupt() {
        let labels = mock_full_featured().to_flat().unwrap();
        let mut flat = mock_dna_two_state().to_flat().unwrap();
        flat.label_alphabet = labels.label_alphabet.clone();
        assert!(matches!(
            Hmm::from_flat(&FlatFile::single(flat.clone())),
            Err(HmmError::CorruptRecord(_))
        ));
        flat.label_alphabet = None;
        flat.backgrounds = labels.backgrounds;
        assert!(matches!(
            Hmm::from_flat(&FlatFile::single(flat)),
            Err(HmmError::CorruptRecord(_))
        ));
    }
}
