//!
//! Flat (columnar) model record
//!
//! This is the interchange form of a HMM used for persistence and by the
//! numerical algorithms. Every per-state array is indexed by the flat state
//! index `0..n`, which is the position of the state id in ascending id order
//! at save time.
//!
//! ```text
//! FlatFile
//!  └ models: [FlatModel]         (exactly one is supported)
//!     ├ model_type, cos
//!     ├ states: [FlatState; N]   pi, fix, desc, position, emission,
//!     │                          in_id/in_a, out_id/out_a
//!     ├ silent[N], tied_to[N], label[N], background_id[N], order[N]
//!     ├ alphabet
//!     └ label_alphabet, backgrounds
//! ```
//!
//! Transition weights are stored as a `cos × degree` matrix: row `c` holds
//! the weights of class `c`, column `j` belongs to `in_id[j]`/`out_id[j]`.
//! Single-class models have exactly one row.
//!
use crate::emission::discrete::table_len;
use crate::error::{HmmError, Result};
use crate::model_type;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

///
/// Parsed content of a model file
///
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlatFile {
    pub models: Vec<FlatModel>,
}

impl FlatFile {
    pub fn single(model: FlatModel) -> FlatFile {
        FlatFile {
            models: vec![model],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphabetRecord {
    pub description: String,
    pub symbols: Vec<String>,
}

impl AlphabetRecord {
    pub fn size(&self) -> usize {
        self.symbols.len()
    }
}

///
/// One mixture component of a continuous emission.
///
/// `density` is the density kind code, `mue`/`u`/`a` are location, scale
/// and truncation point (zero when not truncated), `c` is the mixture weight.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub density: i32,
    pub mue: f64,
    pub u: f64,
    pub a: f64,
    pub c: f64,
}

///
/// Emission parameters of a state
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmissionRecord {
    /// discrete weights `b`, of length `M^order` (order is 1 for plain discrete)
    Discrete { b: Vec<f64> },
    /// mixture components
    Continuous { components: Vec<ComponentRecord> },
}

///
/// Named background distribution
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundRecord {
    pub name: String,
    /// emission order, `1` unless the model has higher-order emissions
    #[serde(default = "first_order")]
    pub order: u32,
    pub emission: EmissionRecord,
}

fn first_order() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatState {
    /// initial probability
    pub pi: f64,
    /// emissions are fixed during training
    pub fix: bool,
    /// state description
    pub desc: String,
    pub x_position: i32,
    pub y_position: i32,
    /// flat indices of the predecessors
    pub in_id: Vec<usize>,
    /// `cos × in_id.len()` weights of the incoming transitions
    pub in_a: Vec<Vec<f64>>,
    /// flat indices of the successors
    pub out_id: Vec<usize>,
    /// `cos × out_id.len()` weights of the outgoing transitions
    pub out_a: Vec<Vec<f64>>,
    pub emission: EmissionRecord,
}

impl FlatState {
    pub fn in_states(&self) -> usize {
        self.in_id.len()
    }
    pub fn out_states(&self) -> usize {
        self.out_id.len()
    }
    ///
    /// Weight of class `class` of the `position`-th outgoing transition
    ///
    pub fn out_prob(&self, class: usize, position: usize) -> Option<f64> {
        self.out_a.get(class).and_then(|row| row.get(position)).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatModel {
    pub name: String,
    /// model type bitmask
    pub model_type: u32,
    /// number of transition classes
    pub cos: usize,
    pub states: Vec<FlatState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silent: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tied_to: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_id: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alphabet: Option<AlphabetRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_alphabet: Option<AlphabetRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backgrounds: Option<Vec<BackgroundRecord>>,
}

impl FlatModel {
    /// the number of states `N`
    pub fn n(&self) -> usize {
        self.states.len()
    }
    ///
    /// Check the array shapes and index conventions of the record.
    ///
    /// * every optional per-state array whose feature bit is set has length N,
    ///   and arrays of unset features are absent
    /// * the label alphabet and the background distributions are present
    ///   exactly when their feature bits are set
    /// * every emission order has a table over the alphabet
    /// * in/out ids are in `0..N`, unique per state, and their weight
    ///   matrices are `cos × degree`
    /// * an outgoing transition `i -> j` is mirrored by an incoming one at
    ///   `j` with the same weights, and vice versa
    ///
    pub fn validate(&self) -> Result<()> {
        let n = self.n();
        if self.cos == 0 {
            return Err(HmmError::corrupt("transition class count is zero"));
        }
        let bits = self.model_type;
        check_column("silent", &self.silent, n, bits & model_type::SILENT_STATES != 0)?;
        check_column("tied_to", &self.tied_to, n, bits & model_type::TIED_EMISSIONS != 0)?;
        check_column("label", &self.label, n, bits & model_type::LABELED_STATES != 0)?;
        check_column(
            "background_id",
            &self.background_id,
            n,
            bits & model_type::BACKGROUND_DISTRIBUTIONS != 0,
        )?;
        check_column(
            "order",
            &self.order,
            n,
            bits & model_type::HIGHER_ORDER_EMISSIONS != 0,
        )?;
        check_collection(
            "label_alphabet",
            self.label_alphabet.is_some(),
            bits & model_type::LABELED_STATES != 0,
        )?;
        check_collection(
            "backgrounds",
            self.backgrounds.is_some(),
            bits & model_type::BACKGROUND_DISTRIBUTIONS != 0,
        )?;
        self.check_orders()?;

        for (i, state) in self.states.iter().enumerate() {
            check_adjacency(i, "in", &state.in_id, &state.in_a, n, self.cos)?;
            check_adjacency(i, "out", &state.out_id, &state.out_a, n, self.cos)?;
        }
        for (i, state) in self.states.iter().enumerate() {
            for (p, &j) in state.out_id.iter().enumerate() {
                self.check_mirrored(i, p, j, Direction::Out)?;
            }
            for (p, &j) in state.in_id.iter().enumerate() {
                self.check_mirrored(i, p, j, Direction::In)?;
            }
        }
        Ok(())
    }
    /// emission orders are at least 1 and `M^order` does not overflow
    fn check_orders(&self) -> Result<()> {
        let size = self.alphabet.as_ref().map_or(0, |a| a.size());
        let states = self.order.iter().flatten().copied();
        let backgrounds = self.backgrounds.iter().flatten().map(|b| b.order);
        for order in states.chain(backgrounds) {
            if table_len(size, order).is_none() {
                return Err(HmmError::corrupt(format!(
                    "no emission table of order {} over {} symbols",
                    order, size
                )));
            }
        }
        Ok(())
    }
    ///
    /// The `p`-th `direction` transition of state `i`, whose other end is
    /// `j`, is listed by `j` in the opposite direction with equal weights.
    ///
    fn check_mirrored(&self, i: usize, p: usize, j: usize, direction: Direction) -> Result<()> {
        let (here, there_ids, there_a, tail, head) = match direction {
            Direction::Out => (
                &self.states[i].out_a,
                &self.states[j].in_id,
                &self.states[j].in_a,
                i,
                j,
            ),
            Direction::In => (
                &self.states[i].in_a,
                &self.states[j].out_id,
                &self.states[j].out_a,
                j,
                i,
            ),
        };
        let q = there_ids.iter().position(|&k| k == i).ok_or_else(|| {
            HmmError::corrupt(format!(
                "transition {} -> {} is listed by {} only",
                tail, head, i
            ))
        })?;
        for (class, (row, mirror)) in here.iter().zip(there_a.iter()).enumerate() {
            if (row[p] - mirror[q]).abs() > WEIGHT_TOLERANCE {
                return Err(HmmError::corrupt(format!(
                    "transition {} -> {} class {} has weights {} and {}",
                    tail, head, class, row[p], mirror[q]
                )));
            }
        }
        Ok(())
    }
}

/// largest difference between the in- and out-copy of a transition weight
const WEIGHT_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
enum Direction {
    In,
    Out,
}

fn check_collection(name: &str, present: bool, required: bool) -> Result<()> {
    match (present, required) {
        (true, false) => Err(HmmError::corrupt(format!(
            "`{}` given but the model type does not declare it",
            name
        ))),
        (false, true) => Err(HmmError::corrupt(format!("`{}` is missing", name))),
        _ => Ok(()),
    }
}

fn check_column<T>(name: &str, column: &Option<Vec<T>>, n: usize, required: bool) -> Result<()> {
    match (column, required) {
        (Some(values), true) if values.len() == n => Ok(()),
        (Some(values), true) => Err(HmmError::corrupt(format!(
            "`{}` has length {}, expected {}",
            name,
            values.len(),
            n
        ))),
        (None, true) => Err(HmmError::corrupt(format!("`{}` array is missing", name))),
        (Some(_), false) => Err(HmmError::corrupt(format!(
            "`{}` array given but the model type does not declare it",
            name
        ))),
        (None, false) => Ok(()),
    }
}

fn check_adjacency(
    state: usize,
    direction: &str,
    ids: &[usize],
    weights: &[Vec<f64>],
    n: usize,
    cos: usize,
) -> Result<()> {
    if let Some(&id) = ids.iter().find(|&&id| id >= n) {
        return Err(HmmError::corrupt(format!(
            "state {} {}-transition refers to state {} (N={})",
            state, direction, id, n
        )));
    }
    if let Some(&id) = ids.iter().duplicates().next() {
        return Err(HmmError::corrupt(format!(
            "state {} lists {}-transition with state {} twice",
            state, direction, id
        )));
    }
    if weights.len() != cos || weights.iter().any(|row| row.len() != ids.len()) {
        return Err(HmmError::corrupt(format!(
            "state {} {}-weights are not a {}x{} matrix",
            state,
            direction,
            cos,
            ids.len()
        )));
    }
    Ok(())
}

//
// tests
//
