//!
//! Discrete emission over an alphabet
//!
//! A table of order `k` holds `M^k` weights (M = alphabet size). It is laid
//! out row-major: the last symbol (the emitted one) is the fastest varying
//! digit, so the table is `M^(k-1)` rows of `M` weights, one row per context
//! of `k-1` preceding symbols. A plain discrete emission is the `k = 1` case.
//!
//! Alphabet resizes are applied row by row:
//!
//! ```text
//! grow:   w'[x] = w[x] (M-1) / Z, w'[new] = 1 / Z,   Z = (M-1) sum(w) + 1
//! shrink: w'[x] = w[x] / (sum(w) - w[removed])
//!         (uniform if no mass remains, empty if the alphabet is empty)
//! ```
//!
//! Rows whose context contains a new symbol start uniform, rows whose
//! context contains a removed symbol are dropped.
//!
use crate::error::{HmmError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteEmission {
    weights: Vec<f64>,
    order: u32,
}

///
/// Number of weights of a table of `order` over `size` symbols, if such a
/// table exists.
///
pub fn table_len(size: usize, order: u32) -> Option<usize> {
    if order == 0 {
        None
    } else {
        size.checked_pow(order)
    }
}

fn invalid_order(size: usize, order: u32) -> HmmError {
    HmmError::InvalidOrder { order, size }
}

impl DiscreteEmission {
    ///
    /// Uniform first-order table over an alphabet of `size` symbols.
    /// An empty alphabet gives an empty table.
    ///
    pub fn uniform(size: usize) -> DiscreteEmission {
        DiscreteEmission {
            weights: vec![1.0 / size as f64; size],
            order: 1,
        }
    }
    ///
    /// Uniform table of order `order`
    ///
    pub fn uniform_of_order(size: usize, order: u32) -> Result<DiscreteEmission> {
        let n = table_len(size, order).ok_or_else(|| invalid_order(size, order))?;
        Ok(DiscreteEmission {
            weights: vec![1.0 / size as f64; n],
            order,
        })
    }
    ///
    /// First-order table with the given weights. The length is checked on write.
    ///
    pub fn from_weights(weights: Vec<f64>) -> DiscreteEmission {
        DiscreteEmission { weights, order: 1 }
    }
    ///
    /// Table of order `order` with the given weights.
    ///
    pub fn with_order(weights: Vec<f64>, order: u32) -> Result<DiscreteEmission> {
        if order == 0 {
            return Err(invalid_order(weights.len(), order));
        }
        Ok(DiscreteEmission { weights, order })
    }
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
    pub fn order(&self) -> u32 {
        self.order
    }
    /// number of weights a table of this order has over `size` symbols
    pub fn expected_len(&self, size: usize) -> Option<usize> {
        table_len(size, self.order)
    }
    ///
    /// Replace the weights. Fails if `weights` does not have `M^order` entries.
    ///
    pub fn set_weights(&mut self, weights: Vec<f64>, size: usize, owner: &str) -> Result<()> {
        self.check_len(weights.len(), size, owner)?;
        self.weights = weights;
        Ok(())
    }
    ///
    /// Change the order and reset the table to uniform.
    ///
    pub fn set_order(&mut self, order: u32, size: usize) -> Result<()> {
        *self = DiscreteEmission::uniform_of_order(size, order)?;
        Ok(())
    }
    ///
    /// `len` weights are a writable table over `size` symbols.
    /// Empty alphabets can not be written.
    ///
    pub fn check_len(&self, len: usize, size: usize, owner: &str) -> Result<()> {
        let expected = self
            .expected_len(size)
            .ok_or_else(|| invalid_order(size, self.order))?;
        if len != expected || size == 0 {
            Err(HmmError::EmissionShapeMismatch {
                owner: owner.to_owned(),
                expected,
                found: len,
            })
        } else {
            Ok(())
        }
    }
    ///
    /// The table can be resized from an alphabet of `old_size` symbols to
    /// one of `new_size`: it has `old_size^order` weights and the resized
    /// table has a length.
    ///
    pub fn check_resize(&self, old_size: usize, new_size: usize, owner: &str) -> Result<()> {
        let expected = self
            .expected_len(old_size)
            .ok_or_else(|| invalid_order(old_size, self.order))?;
        if self.weights.len() != expected {
            return Err(HmmError::EmissionShapeMismatch {
                owner: owner.to_owned(),
                expected,
                found: self.weights.len(),
            });
        }
        self.expected_len(new_size)
            .map(|_| ())
            .ok_or_else(|| invalid_order(new_size, self.order))
    }
    ///
    /// A symbol was appended to the alphabet, which now has `new_size` symbols.
    ///
    pub fn grow(&mut self, new_size: usize, owner: &str) -> Result<()> {
        let old_size = new_size
            .checked_sub(1)
            .ok_or(HmmError::IndexOutOfRange { index: 0, size: 0 })?;
        self.check_resize(old_size, new_size, owner)?;
        self.resize(
            old_size,
            new_size,
            |d| if d < old_size { Some(d) } else { None },
            |row| grow_row(row, new_size),
        );
        Ok(())
    }
    ///
    /// The symbol of code `index` was removed; the alphabet now has `new_size` symbols.
    ///
    pub fn shrink(&mut self, index: usize, new_size: usize, owner: &str) -> Result<()> {
        let old_size = new_size + 1;
        self.check_resize(old_size, new_size, owner)?;
        if index >= old_size {
            return Err(HmmError::IndexOutOfRange {
                index,
                size: old_size,
            });
        }
        self.resize(
            old_size,
            new_size,
            |d| if d >= index { Some(d + 1) } else { Some(d) },
            |row| shrink_row(row, index, new_size),
        );
        Ok(())
    }
    ///
    /// Build the table over the new alphabet. For each new context row,
    /// `map_digit` gives the old code of every context symbol (None for a
    /// symbol that did not exist), and `map_row` converts the old row.
    /// The shape is checked by the callers.
    ///
    fn resize<D, R>(&mut self, old_size: usize, new_size: usize, map_digit: D, map_row: R)
    where
        D: Fn(usize) -> Option<usize>,
        R: Fn(&[f64]) -> Vec<f64>,
    {
        let context_len = self.order - 1;
        let n_rows = new_size.pow(context_len);
        let mut weights = Vec::with_capacity(n_rows * new_size);
        for row in 0..n_rows {
            let old_row = decode(row, new_size, context_len)
                .into_iter()
                .map(|d| map_digit(d))
                .collect::<Option<Vec<usize>>>()
                .map(|digits| encode(&digits, old_size));
            match old_row {
                Some(r) => {
                    let begin = r * old_size;
                    weights.extend(map_row(&self.weights[begin..begin + old_size]));
                }
                None => weights.extend(vec![1.0 / new_size as f64; new_size]),
            }
        }
        self.weights = weights;
    }
}

fn grow_row(row: &[f64], new_size: usize) -> Vec<f64> {
    let s = (new_size - 1) as f64;
    let mut w: Vec<f64> = row.iter().map(|x| x * s).collect();
    w.push(1.0);
    let total: f64 = w.iter().sum();
    w.iter().map(|x| x / total).collect()
}

fn shrink_row(row: &[f64], index: usize, new_size: usize) -> Vec<f64> {
    let s: f64 = row.iter().sum::<f64>() - row[index];
    let rest = row
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != index)
        .map(|(_, &x)| x);
    if s > 0.0 {
        rest.map(|x| x / s).collect()
    } else {
        vec![1.0 / new_size as f64; new_size]
    }
}

/// digits (most significant first) of `value` in base `base`
fn decode(mut value: usize, base: usize, len: u32) -> Vec<usize> {
    let mut digits = vec![0; len as usize];
    for d in digits.iter_mut().rev() {
        *d = value % base;
        value /= base;
    }
    digits
}

fn encode(digits: &[usize], base: usize) -> usize {
    digits.iter().fold(0, |acc, &d| acc * base + d)
}

//
// tests
//
