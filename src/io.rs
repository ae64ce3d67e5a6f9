//!
//! File layer of flat records
//!
pub mod json;

pub use json::JsonFileLayer;

use crate::error::Result;
use crate::flat::FlatFile;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

///
/// Parser and serializer of model files
///
pub trait FileLayer {
    ///
    /// Parse the file at `path`.
    /// Fails with `UnknownFileType` if the file is not of this layer's format.
    ///
    fn parse(&self, path: &Path) -> Result<FlatFile>;
    ///
    /// Write `file` to `path`
    ///
    fn serialize(&self, file: &FlatFile, path: &Path) -> Result<()>;
}

///
/// write string into a file
///
pub fn write_string<P: AsRef<Path>>(path: P, string: &str) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(string.as_bytes())?;
    Ok(())
}
