//!
//! globally-available parts
//!
pub use crate::common::{sid, Position, StateId};
pub use crate::error::{HmmError, Result};
pub use crate::flat::{FlatFile, FlatModel};
pub use crate::hmm::properties::HmmProperties;
pub use crate::hmm::Hmm;
pub use crate::io::{FileLayer, JsonFileLayer};
pub use crate::model_type::{compute_bitmask, resolve, ModelDescriptor};
