//!
//! Common types shared between the editable graph and the flat record
//!
use derive_new::new;
use serde::{Deserialize, Serialize};

///
/// Stable identifier of a state in the editable HMM.
///
/// Ids are assigned by the id allocator of `Hmm` at creation and never
/// reused while the state is alive. They are not flat array indices.
///
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StateId(pub usize);

impl StateId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

///
/// short-hand of `StateId`
///
pub fn sid(id: usize) -> StateId {
    StateId(id)
}

/// `tied_to` value of a state whose emission is not tied
pub const UNTIED: i64 = -1;

/// `background_id` value of a state without background distribution
pub const NO_BACKGROUND: i64 = -1;

///
/// Position of a state in the editor layout
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

///
/// Check that a probability-like weight is in `[0, 1]`
///
pub fn is_valid_weight(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

//
// tests
//
