//!
//! Named background distributions of a model
//!
//! Distributions are identified by a key that is never reused, so states
//! keep referring to the right distribution after another one is removed.
//! On save the keys are densified to `0..n` in key order.
//!
use crate::emission::Emission;
use crate::error::{HmmError, Result};
use crate::flat::BackgroundRecord;
use crate::model_type::EmissionFamily;
use fnv::FnvHashMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    pub name: String,
    pub emission: Emission,
}

impl Background {
    /// name of this distribution in errors
    pub fn owner(&self) -> String {
        format!("background `{}`", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BackgroundSet {
    next_key: usize,
    entries: BTreeMap<usize, Background>,
}

impl BackgroundSet {
    pub fn new() -> BackgroundSet {
        BackgroundSet::default()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn get(&self, key: usize) -> Option<&Background> {
        self.entries.get(&key)
    }
    pub fn get_mut(&mut self, key: usize) -> Option<&mut Background> {
        self.entries.get_mut(&key)
    }
    /// key of the distribution named `name`
    pub fn key_of(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(_, b)| b.name == name)
            .map(|(&k, _)| k)
    }
    /// `(key, background)` in key order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Background)> + '_ {
        self.entries.iter().map(|(&k, b)| (k, b))
    }
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Background)> + '_ {
        self.entries.iter_mut().map(|(&k, b)| (k, b))
    }
    ///
    /// Add a distribution and return its key
    ///
    pub fn add(&mut self, name: &str, emission: Emission) -> Result<usize> {
        if self.key_of(name).is_some() {
            return Err(HmmError::DuplicateSymbol(name.to_owned()));
        }
        let key = self.next_key;
        self.next_key += 1;
        self.entries.insert(
            key,
            Background {
                name: name.to_owned(),
                emission,
            },
        );
        Ok(key)
    }
    ///
    /// Remove the distribution named `name` and return its key
    ///
    pub fn remove(&mut self, name: &str) -> Result<usize> {
        let key = self
            .key_of(name)
            .ok_or_else(|| HmmError::UnknownSymbol(name.to_owned()))?;
        self.entries.remove(&key);
        Ok(key)
    }
    ///
    /// Records in key order, and the map from key to dense flat index
    ///
    pub fn write_flat(
        &self,
        alphabet_size: usize,
    ) -> Result<(Vec<BackgroundRecord>, FnvHashMap<usize, usize>)> {
        let mut records = Vec::with_capacity(self.len());
        let mut index = FnvHashMap::default();
        for (i, (key, b)) in self.iter().enumerate() {
            records.push(BackgroundRecord {
                name: b.name.clone(),
                order: b.emission.order().unwrap_or(1),
                emission: b.emission.write_flat(alphabet_size, &b.owner())?,
            });
            index.insert(key, i);
        }
        Ok((records, index))
    }
    ///
    /// Rebuild the set from records; the key of each distribution is its index.
    ///
    pub fn read_flat(
        records: &[BackgroundRecord],
        family: EmissionFamily,
        alphabet_size: usize,
    ) -> Result<BackgroundSet> {
        let mut set = BackgroundSet::new();
        for r in records {
            let owner = format!("background `{}`", r.name);
            let emission = Emission::read_flat(family, &r.emission, alphabet_size, r.order, &owner)?;
            set.add(&r.name, emission).map_err(|_| {
                HmmError::corrupt(format!("background distribution `{}` repeated", r.name))
            })?;
        }
        Ok(set)
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform() -> Emission {
        Emission::new(EmissionFamily::Discrete, 4)
    }

    #[test]
    fn keys_are_not_reused() {
        let mut set = BackgroundSet::new();
        assert_eq!(set.add("a", uniform()).unwrap(), 0);
        assert_eq!(set.add("b", uniform()).unwrap(), 1);
        assert!(matches!(
            set.add("a", uniform()),
            Err(HmmError::DuplicateSymbol(_))
        ));
        assert_eq!(set.remove("a").unwrap(), 0);
        assert_eq!(set.add("c", uniform()).unwrap(), 2);
        assert!(matches!(set.remove("a"), Err(HmmError::UnknownSymbol(_))));
        assert_eq!(set.key_of("c"), Some(2));
    }
    #[test]
    fn flat_keys_are_dense() {
        let mut set = BackgroundSet::new();
        set.add("a", uniform()).unwrap();
        set.add("b", uniform()).unwrap();
        set.add("c", uniform()).unwrap();
        set.remove("b").unwrap();
        let (records, index) = set.write_flat(4).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "c");
        assert_eq!(index[&0], 0);
        assert_eq!(index[&2], 1);
        let loaded = BackgroundSet::read_flat(&records, EmissionFamily::Discrete, 4).unwrap();
        assert_eq!(loaded.key_of("c"), Some(1));
        assert_eq!(loaded.get(1).unwrap().emission, uniform());
    }
}
