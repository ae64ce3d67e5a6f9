//!
//! JSON files of flat records
//!
use super::FileLayer;
use crate::error::{HmmError, Result};
use crate::flat::FlatFile;
use log::debug;
use std::path::Path;

///
/// `FileLayer` of `.json` files holding a serialized `FlatFile`
///
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileLayer;

impl JsonFileLayer {
    pub fn new() -> JsonFileLayer {
        JsonFileLayer
    }
    fn check_extension(path: &Path) -> Result<()> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(e) if e.eq_ignore_ascii_case("json") => Ok(()),
            _ => Err(HmmError::UnknownFileType(path.to_owned())),
        }
    }
}

impl FileLayer for JsonFileLayer {
    fn parse(&self, path: &Path) -> Result<FlatFile> {
        JsonFileLayer::check_extension(path)?;
        let file = std::fs::File::open(path)?;
        let flat: FlatFile = serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| {
            debug!("{} is not a model file: {}", path.display(), e);
            HmmError::UnknownFileType(path.to_owned())
        })?;
        debug!("parsed {} ({} models)", path.display(), flat.models.len());
        Ok(flat)
    }
    fn serialize(&self, file: &FlatFile, path: &Path) -> Result<()> {
        JsonFileLayer::check_extension(path)?;
        let writer = std::io::BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer_pretty(writer, file)?;
        debug!("wrote {}", path.display());
        Ok(())
    }
}

//
// tests
//
