//!
//! Optional state features and their flat read/write steps
//!
//! A state variant is a subset of {Silent, Labeled, Tied, Background}, so
//! there are 16 variants. Instead of one type per variant, a state holds a
//! `FeatureAttrs` record and the model holds a `FeatureSet`. Reading and
//! writing a variant is the composition of the per-feature steps of
//! `STEPS`, applied in `FeatureTag::CANONICAL_ORDER`.
//!
//! Every step touches only its own flat column.
//!
use crate::common::{StateId, NO_BACKGROUND, UNTIED};
use crate::error::{HmmError, Result};
use crate::flat::FlatModel;
use crate::model_type;
use fnv::FnvHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureTag {
    Silent,
    Labeled,
    Tied,
    Background,
}

impl FeatureTag {
    /// order in which the per-feature steps are applied
    pub const CANONICAL_ORDER: [FeatureTag; 4] = [
        FeatureTag::Silent,
        FeatureTag::Labeled,
        FeatureTag::Tied,
        FeatureTag::Background,
    ];
    /// model type bit of the feature
    pub fn bit(self) -> u32 {
        match self {
            FeatureTag::Silent => model_type::SILENT_STATES,
            FeatureTag::Labeled => model_type::LABELED_STATES,
            FeatureTag::Tied => model_type::TIED_EMISSIONS,
            FeatureTag::Background => model_type::BACKGROUND_DISTRIBUTIONS,
        }
    }
    /// name of the state attribute the feature adds
    pub fn attribute(self) -> &'static str {
        match self {
            FeatureTag::Silent => "silent",
            FeatureTag::Labeled => "label",
            FeatureTag::Tied => "tied_to",
            FeatureTag::Background => "background_id",
        }
    }
}

///
/// Set of optional features, i.e. one of the 16 state variants
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FeatureSet(u32);

impl FeatureSet {
    pub fn empty() -> FeatureSet {
        FeatureSet(0)
    }
    ///
    /// Feature set from model type bits.
    /// Bits other than feature bits are ignored.
    ///
    pub fn from_bits(bits: u32) -> FeatureSet {
        FeatureSet(bits & model_type::FEATURE_MASK)
    }
    pub fn from_tags(tags: &[FeatureTag]) -> FeatureSet {
        FeatureSet(tags.iter().fold(0, |acc, t| acc | t.bit()))
    }
    pub fn bits(&self) -> u32 {
        self.0
    }
    pub fn contains(&self, tag: FeatureTag) -> bool {
        self.0 & tag.bit() != 0
    }
    pub fn insert(&mut self, tag: FeatureTag) {
        self.0 |= tag.bit();
    }
    pub fn remove(&mut self, tag: FeatureTag) {
        self.0 &= !tag.bit();
    }
    /// features of the set in canonical order
    pub fn iter(&self) -> impl Iterator<Item = FeatureTag> + '_ {
        FeatureTag::CANONICAL_ORDER
            .iter()
            .copied()
            .filter(move |t| self.contains(*t))
    }
    pub fn len(&self) -> usize {
        self.iter().count()
    }
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
    /// all 16 state variants
    pub fn all_variants() -> Vec<FeatureSet> {
        (0..16u32)
            .map(|i| {
                let tags: Vec<FeatureTag> = FeatureTag::CANONICAL_ORDER
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| i & (1 << k) != 0)
                    .map(|(_, t)| *t)
                    .collect();
                FeatureSet::from_tags(&tags)
            })
            .collect()
    }
}

impl std::fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "plain");
        }
        let names: Vec<String> = self.iter().map(|t| format!("{:?}", t)).collect();
        write!(f, "{}", names.join("+"))
    }
}

///
/// Emission tie of a state
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tie {
    Untied,
    To(StateId),
}

///
/// Background distribution used by a state
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundRef {
    NoBackground,
    /// key of the distribution in the model's background set
    Distribution(usize),
}

///
/// Feature attributes of a state. An attribute is `None` when the state
/// does not carry it.
///
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureAttrs {
    pub silent: Option<bool>,
    pub label: Option<usize>,
    pub tied_to: Option<Tie>,
    pub background: Option<BackgroundRef>,
}

impl FeatureAttrs {
    ///
    /// Default attributes of a new state of the variant `features`
    ///
    pub fn defaults(features: FeatureSet) -> FeatureAttrs {
        let mut attrs = FeatureAttrs::default();
        for tag in features.iter() {
            attrs.set_default(tag);
        }
        attrs
    }
    /// give `tag` its default value if the attribute is missing
    pub fn set_default(&mut self, tag: FeatureTag) {
        match tag {
            FeatureTag::Silent => {
                self.silent.get_or_insert(false);
            }
            FeatureTag::Labeled => {
                self.label.get_or_insert(0);
            }
            FeatureTag::Tied => {
                self.tied_to.get_or_insert(Tie::Untied);
            }
            FeatureTag::Background => {
                self.background.get_or_insert(BackgroundRef::NoBackground);
            }
        }
    }
    pub fn has(&self, tag: FeatureTag) -> bool {
        match tag {
            FeatureTag::Silent => self.silent.is_some(),
            FeatureTag::Labeled => self.label.is_some(),
            FeatureTag::Tied => self.tied_to.is_some(),
            FeatureTag::Background => self.background.is_some(),
        }
    }
    /// drop the attributes of features outside of `features`
    pub fn restrict(&mut self, features: FeatureSet) {
        for tag in FeatureTag::CANONICAL_ORDER.iter() {
            if !features.contains(*tag) {
                match tag {
                    FeatureTag::Silent => self.silent = None,
                    FeatureTag::Labeled => self.label = None,
                    FeatureTag::Tied => self.tied_to = None,
                    FeatureTag::Background => self.background = None,
                }
            }
        }
    }
}

///
/// Feature columns of the flat record being written.
/// Only the columns of the model's features are allocated.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureColumns {
    pub silent: Option<Vec<bool>>,
    pub label: Option<Vec<i64>>,
    pub tied_to: Option<Vec<i64>>,
    pub background_id: Option<Vec<i64>>,
}

impl FeatureColumns {
    pub fn new(features: FeatureSet, n: usize) -> FeatureColumns {
        FeatureColumns {
            silent: when(features.contains(FeatureTag::Silent), || vec![false; n]),
            label: when(features.contains(FeatureTag::Labeled), || vec![0; n]),
            tied_to: when(features.contains(FeatureTag::Tied), || vec![UNTIED; n]),
            background_id: when(features.contains(FeatureTag::Background), || {
                vec![NO_BACKGROUND; n]
            }),
        }
    }
}

fn when<T, F: FnOnce() -> T>(cond: bool, f: F) -> Option<T> {
    if cond {
        Some(f())
    } else {
        None
    }
}

///
/// Model-wide data the write steps need
///
pub struct WriteContext<'a> {
    /// canonical flat `tied_to` value of every flat index
    pub tied_to: &'a [i64],
    /// size of the label alphabet (0 leaves labels unconstrained)
    pub label_count: usize,
    /// background key -> dense flat index
    pub background_index: &'a FnvHashMap<usize, usize>,
}

///
/// Model-wide data the read steps need
///
pub struct ReadContext<'a> {
    /// flat index -> state id of the graph being built
    pub state_ids: &'a [StateId],
    /// size of the label alphabet (0 leaves labels unconstrained)
    pub label_count: usize,
    /// number of background distributions
    pub background_count: usize,
}

pub type ReadStep = fn(&mut FeatureAttrs, &FlatModel, usize, &ReadContext) -> Result<()>;
pub type WriteStep =
    fn(&FeatureAttrs, StateId, usize, &WriteContext, &mut FeatureColumns) -> Result<()>;

/// per-feature steps in canonical order
pub const STEPS: [(FeatureTag, ReadStep, WriteStep); 4] = [
    (FeatureTag::Silent, read_silent, write_silent),
    (FeatureTag::Labeled, read_label, write_label),
    (FeatureTag::Tied, read_tied, write_tied),
    (FeatureTag::Background, read_background, write_background),
];

///
/// Apply the read steps of `features` for flat index `index`
///
pub fn read_features(
    attrs: &mut FeatureAttrs,
    features: FeatureSet,
    model: &FlatModel,
    index: usize,
    ctx: &ReadContext,
) -> Result<()> {
    for (tag, read, _) in STEPS.iter() {
        if features.contains(*tag) {
            read(attrs, model, index, ctx)?;
        }
    }
    Ok(())
}

///
/// Apply the write steps of `features` for the state `id` at flat index `index`
///
pub fn write_features(
    attrs: &FeatureAttrs,
    features: FeatureSet,
    id: StateId,
    index: usize,
    ctx: &WriteContext,
    columns: &mut FeatureColumns,
) -> Result<()> {
    for (tag, _, write) in STEPS.iter() {
        if features.contains(*tag) {
            write(attrs, id, index, ctx, columns)?;
        }
    }
    Ok(())
}

//
// read steps
//

fn column<'a, T>(column: &'a Option<Vec<T>>, tag: FeatureTag, index: usize) -> Result<&'a T> {
    column
        .as_ref()
        .and_then(|c| c.get(index))
        .ok_or_else(|| {
            HmmError::corrupt(format!("no `{}` value for state {}", tag.attribute(), index))
        })
}

fn read_silent(attrs: &mut FeatureAttrs, m: &FlatModel, i: usize, _: &ReadContext) -> Result<()> {
    attrs.silent = Some(*column(&m.silent, FeatureTag::Silent, i)?);
    Ok(())
}

fn read_label(attrs: &mut FeatureAttrs, m: &FlatModel, i: usize, ctx: &ReadContext) -> Result<()> {
    let v = *column(&m.label, FeatureTag::Labeled, i)?;
    if v < 0 || (ctx.label_count > 0 && v as usize >= ctx.label_count) {
        return Err(HmmError::corrupt(format!(
            "state {} has label {} outside of the label alphabet",
            i, v
        )));
    }
    attrs.label = Some(v as usize);
    Ok(())
}

fn read_tied(attrs: &mut FeatureAttrs, m: &FlatModel, i: usize, ctx: &ReadContext) -> Result<()> {
    let v = *column(&m.tied_to, FeatureTag::Tied, i)?;
    let tie = if v == UNTIED {
        Tie::Untied
    } else if v >= 0 && (v as usize) < ctx.state_ids.len() {
        Tie::To(ctx.state_ids[v as usize])
    } else {
        return Err(HmmError::corrupt(format!(
            "state {} is tied to unknown state {}",
            i, v
        )));
    };
    attrs.tied_to = Some(tie);
    Ok(())
}

fn read_background(
    attrs: &mut FeatureAttrs,
    m: &FlatModel,
    i: usize,
    ctx: &ReadContext,
) -> Result<()> {
    let v = *column(&m.background_id, FeatureTag::Background, i)?;
    let background = if v == NO_BACKGROUND {
        BackgroundRef::NoBackground
    } else if v >= 0 && (v as usize) < ctx.background_count {
        BackgroundRef::Distribution(v as usize)
    } else {
        return Err(HmmError::corrupt(format!(
            "state {} refers to unknown background distribution {}",
            i, v
        )));
    };
    attrs.background = Some(background);
    Ok(())
}

//
// write steps
//

fn missing(id: StateId, tag: FeatureTag) -> HmmError {
    HmmError::InconsistentModelType {
        state: id,
        attribute: tag.attribute(),
    }
}

fn slot<T>(column: &mut Option<Vec<T>>, index: usize) -> Result<&mut T> {
    column
        .as_mut()
        .and_then(|c| c.get_mut(index))
        .ok_or_else(|| HmmError::corrupt(format!("no column slot for flat index {}", index)))
}

fn write_silent(
    attrs: &FeatureAttrs,
    id: StateId,
    i: usize,
    _: &WriteContext,
    c: &mut FeatureColumns,
) -> Result<()> {
    let silent = attrs.silent.ok_or_else(|| missing(id, FeatureTag::Silent))?;
    *slot(&mut c.silent, i)? = silent;
    Ok(())
}

fn write_label(
    attrs: &FeatureAttrs,
    id: StateId,
    i: usize,
    ctx: &WriteContext,
    c: &mut FeatureColumns,
) -> Result<()> {
    let label = attrs.label.ok_or_else(|| missing(id, FeatureTag::Labeled))?;
    if ctx.label_count > 0 && label >= ctx.label_count {
        return Err(HmmError::corrupt(format!(
            "state {} has label {} outside of the label alphabet",
            id, label
        )));
    }
    *slot(&mut c.label, i)? = label as i64;
    Ok(())
}

fn write_tied(
    attrs: &FeatureAttrs,
    id: StateId,
    i: usize,
    ctx: &WriteContext,
    c: &mut FeatureColumns,
) -> Result<()> {
    attrs.tied_to.ok_or_else(|| missing(id, FeatureTag::Tied))?;
    *slot(&mut c.tied_to, i)? = ctx.tied_to[i];
    Ok(())
}

fn write_background(
    attrs: &FeatureAttrs,
    id: StateId,
    i: usize,
    ctx: &WriteContext,
    c: &mut FeatureColumns,
) -> Result<()> {
    let background = attrs
        .background
        .ok_or_else(|| missing(id, FeatureTag::Background))?;
    let v = match background {
        BackgroundRef::NoBackground => NO_BACKGROUND,
        BackgroundRef::Distribution(key) => match ctx.background_index.get(&key) {
            Some(&index) => index as i64,
            None => {
                return Err(HmmError::corrupt(format!(
                    "state {} refers to removed background distribution {}",
                    id, key
                )))
            }
        },
    };
    *slot(&mut c.background_id, i)? = v;
    Ok(())
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::sid;

    #[test]
    fn sixteen_distinct_variants() {
        let variants = FeatureSet::all_variants();
        assert_eq!(variants.len(), 16);
        for (i, a) in variants.iter().enumerate() {
            for b in variants.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        assert!(variants.contains(&FeatureSet::empty()));
    }
    #[test]
    fn iteration_is_canonical() {
        let f = FeatureSet::from_tags(&[
            FeatureTag::Background,
            FeatureTag::Tied,
            FeatureTag::Silent,
            FeatureTag::Labeled,
        ]);
        let tags: Vec<FeatureTag> = f.iter().collect();
        assert_eq!(tags, FeatureTag::CANONICAL_ORDER.to_vec());
        assert_eq!(f.to_string(), "Silent+Labeled+Tied+Background");
        assert_eq!(FeatureSet::empty().to_string(), "plain");
    }
    #[test]
    fn defaults_match_variant() {
        for features in FeatureSet::all_variants() {
            let attrs = FeatureAttrs::defaults(features);
            for tag in FeatureTag::CANONICAL_ORDER.iter() {
                assert_eq!(attrs.has(*tag), features.contains(*tag));
            }
        }
    }
    #[test]
    fn restrict_drops_attributes() {
        let mut attrs = FeatureAttrs::defaults(FeatureSet::from_bits(model_type::FEATURE_MASK));
        attrs.restrict(FeatureSet::from_tags(&[FeatureTag::Tied]));
        assert_eq!(
            attrs,
            FeatureAttrs {
                tied_to: Some(Tie::Untied),
                ..FeatureAttrs::default()
            }
        );
    }
    #[test]
    fn missing_attribute_is_inconsistent() {
        let features = FeatureSet::from_tags(&[FeatureTag::Background]);
        let attrs = FeatureAttrs::default();
        let index = FnvHashMap::default();
        let ctx = WriteContext {
            tied_to: &[UNTIED],
            label_count: 0,
            background_index: &index,
        };
        let mut columns = FeatureColumns::new(features, 1);
        let r = write_features(&attrs, features, sid(7), 0, &ctx, &mut columns);
        assert!(matches!(
            r,
            Err(HmmError::InconsistentModelType {
                attribute: "background_id",
                ..
            })
        ));
    }
    #[test]
    fn write_columns() {
        let features = FeatureSet::from_tags(&[FeatureTag::Silent, FeatureTag::Background]);
        let attrs = FeatureAttrs {
            silent: Some(true),
            background: Some(BackgroundRef::Distribution(4)),
            ..FeatureAttrs::default()
        };
        let mut index = FnvHashMap::default();
        index.insert(4, 0);
        let ctx = WriteContext {
            tied_to: &[UNTIED, UNTIED],
            label_count: 0,
            background_index: &index,
        };
        let mut columns = FeatureColumns::new(features, 2);
        write_features(&attrs, features, sid(0), 1, &ctx, &mut columns).unwrap();
        assert_eq!(columns.silent, Some(vec![false, true]));
        assert_eq!(columns.background_id, Some(vec![NO_BACKGROUND, 0]));
        assert_eq!(columns.label, None);
        assert_eq!(columns.tied_to, None);
    }
}
