//!
//! State of the editable HMM
//!
//! A state has the common attributes (initial probability, fixed flag,
//! description, layout position, emission) and the optional feature
//! attributes of `features::FeatureAttrs`.
//!
pub mod features;

use crate::common::{Position, StateId};
use crate::emission::Emission;
use crate::error::Result;
use crate::flat::{FlatModel, FlatState};
use crate::model_type::{EmissionFamily, ModelDescriptor};
use features::{
    read_features, write_features, BackgroundRef, FeatureAttrs, FeatureColumns, FeatureSet,
    ReadContext, Tie, WriteContext,
};

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    id: StateId,
    /// initial probability
    pub initial: f64,
    /// emissions are not changed by training
    pub fixed: bool,
    /// description shown in the editor
    pub desc: String,
    pub position: Position,
    pub emission: Emission,
    pub attrs: FeatureAttrs,
}

///
/// Adjacency of a state in flat indices, `cos × degree` weights
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Adjacency {
    pub in_id: Vec<usize>,
    pub in_a: Vec<Vec<f64>>,
    pub out_id: Vec<usize>,
    pub out_a: Vec<Vec<f64>>,
}

impl State {
    ///
    /// New state of the variant `features` with default attributes
    ///
    pub fn new(id: StateId, emission: Emission, features: FeatureSet) -> State {
        State {
            id,
            initial: 0.0,
            fixed: false,
            desc: id.index().to_string(),
            position: Position::default(),
            emission,
            attrs: FeatureAttrs::defaults(features),
        }
    }
    pub fn id(&self) -> StateId {
        self.id
    }
    /// name of this state in errors
    pub fn owner(&self) -> String {
        format!("state {}", self.id)
    }
    //
    // feature attributes
    //
    pub fn silent(&self) -> Option<bool> {
        self.attrs.silent
    }
    pub fn set_silent(&mut self, silent: bool) {
        self.attrs.silent = Some(silent);
    }
    pub fn tied_to(&self) -> Option<Tie> {
        self.attrs.tied_to
    }
    ///
    /// Tie the emission of this state to `target`, or untie it with `None`.
    ///
    pub fn set_tied_to(&mut self, target: Option<StateId>) {
        self.attrs.tied_to = Some(match target {
            Some(id) => Tie::To(id),
            None => Tie::Untied,
        });
    }
    pub fn label(&self) -> Option<usize> {
        self.attrs.label
    }
    pub fn set_label(&mut self, label: usize) {
        self.attrs.label = Some(label);
    }
    pub fn background(&self) -> Option<BackgroundRef> {
        self.attrs.background
    }
    ///
    /// Use the background distribution of `key`, or none with `None`.
    ///
    pub fn set_background(&mut self, key: Option<usize>) {
        self.attrs.background = Some(match key {
            Some(key) => BackgroundRef::Distribution(key),
            None => BackgroundRef::NoBackground,
        });
    }
    ///
    /// Copy of this state for a model of `descriptor`.
    ///
    /// Attributes of features kept by the descriptor are preserved, new ones
    /// get their defaults and dropped ones are removed. The emission follows
    /// `Emission::retyped`.
    ///
    pub fn retyped(
        &self,
        descriptor: &ModelDescriptor,
        alphabet_size: usize,
        max_order: u32,
    ) -> State {
        let mut state = self.clone();
        state.attrs.restrict(descriptor.features);
        for tag in descriptor.features.iter() {
            state.attrs.set_default(tag);
        }
        state.emission = self
            .emission
            .retyped(descriptor.family, alphabet_size, max_order);
        state
    }
    //
    // flat record
    //
    ///
    /// Write this state at flat index `index`: the common fields, the
    /// adjacency, the emission parameters and the feature columns.
    ///
    pub fn write_flat(
        &self,
        index: usize,
        adjacency: Adjacency,
        features: FeatureSet,
        alphabet_size: usize,
        ctx: &WriteContext,
        columns: &mut FeatureColumns,
    ) -> Result<FlatState> {
        let emission = self.emission.write_flat(alphabet_size, &self.owner())?;
        write_features(&self.attrs, features, self.id, index, ctx, columns)?;
        Ok(FlatState {
            pi: self.initial,
            fix: self.fixed,
            desc: self.desc.clone(),
            x_position: self.position.x,
            y_position: self.position.y,
            in_id: adjacency.in_id,
            in_a: adjacency.in_a,
            out_id: adjacency.out_id,
            out_a: adjacency.out_a,
            emission,
        })
    }
    ///
    /// Populate this state from flat index `index` of `model`: the common
    /// fields, the feature attributes and the emission parameters.
    ///
    pub fn read_flat(
        &mut self,
        model: &FlatModel,
        index: usize,
        family: EmissionFamily,
        alphabet_size: usize,
        ctx: &ReadContext,
        features: FeatureSet,
    ) -> Result<()> {
        let flat = &model.states[index];
        self.initial = flat.pi;
        self.fixed = flat.fix;
        self.desc = flat.desc.clone();
        self.position = Position::new(flat.x_position, flat.y_position);

        read_features(&mut self.attrs, features, model, index, ctx)?;

        let order = match &model.order {
            Some(order) => order[index],
            None => 1,
        };
        self.emission =
            Emission::read_flat(family, &flat.emission, alphabet_size, order, &self.owner())?;
        Ok(())
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} `{}` (pi={})", self.id, self.desc, self.initial)?;
        if let Some(true) = self.attrs.silent {
            write!(f, " silent")?;
        }
        if let Some(Tie::To(id)) = self.attrs.tied_to {
            write!(f, " tied_to={}", id)?;
        }
        if let Some(label) = self.attrs.label {
            write!(f, " label={}", label)?;
        }
        if let Some(BackgroundRef::Distribution(key)) = self.attrs.background {
            write!(f, " background={}", key)?;
        }
        Ok(())
    }
}

//
// tests
//
