pub mod alphabet;
pub mod common;
pub mod convert;
pub mod emission;
pub mod error;
pub mod flat;
pub mod hmm;
pub mod io;
pub mod model_type;
pub mod prelude;
pub mod state;
pub mod transition;

#[cfg(test)]
#[macro_use]
extern crate approx;
