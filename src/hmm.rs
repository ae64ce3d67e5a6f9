//!
//! Editable HMM graph
//!
//! States are nodes and transitions are edges of a `StableDiGraph`, so node
//! indices of surviving states are kept across deletions. States are
//! addressed by their `StateId`, which is never reused within a model.
//!
//! The type of the model (`ModelDescriptor`) is fixed for the lifetime of a
//! `Hmm`. Use `Hmm::retype` to get a copy of the model under other properties.
//!
pub mod background;
pub mod mocks;
pub mod properties;

use crate::alphabet::Alphabet;
use crate::common::{is_valid_weight, StateId};
use crate::convert::Converter;
use crate::emission::Emission;
use crate::error::{HmmError, Result};
use crate::flat::{FlatFile, FlatModel};
use crate::io::FileLayer;
use crate::model_type::{compute_bitmask, resolve, EmissionFamily, ModelDescriptor, TransitionKind};
use crate::state::features::{BackgroundRef, FeatureSet, FeatureTag, Tie};
use crate::state::State;
use crate::transition::Transition;
use background::BackgroundSet;
use fnv::FnvHashMap;
use itertools::Itertools;
use log::{debug, info, warn};
use petgraph::dot::Dot;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use properties::HmmProperties;
use std::path::Path;

/// id of the label alphabet of labeled models
pub const LABEL_ALPHABET_ID: &str = "state labels";

#[derive(Debug, Clone)]
pub struct Hmm {
    properties: HmmProperties,
    descriptor: ModelDescriptor,
    class_count: usize,
    graph: StableDiGraph<State, Transition>,
    nodes: FnvHashMap<StateId, NodeIndex>,
    next_id: usize,
    alphabet: Option<Alphabet>,
    label_alphabet: Option<Alphabet>,
    backgrounds: Option<BackgroundSet>,
}

impl Hmm {
    ///
    /// Empty model of the declared `properties`
    ///
    pub fn new(properties: HmmProperties) -> Result<Hmm> {
        let bits = compute_bitmask(&properties)?;
        let descriptor = resolve(bits)?;
        let class_count = match descriptor.transitions {
            TransitionKind::Simple => 1,
            TransitionKind::Switched => properties.class_count(),
        };
        let alphabet = descriptor.new_alphabet(properties.alphabet);
        info!("new model `{}`: {}", properties.name, descriptor);
        Ok(Hmm::from_parts(
            properties,
            descriptor,
            class_count,
            alphabet,
            None,
            None,
        ))
    }
    ///
    /// Empty model with the given parts. The label alphabet and the
    /// background set default to empty ones when the features need them.
    ///
    pub(crate) fn from_parts(
        properties: HmmProperties,
        descriptor: ModelDescriptor,
        class_count: usize,
        alphabet: Option<Alphabet>,
        label_alphabet: Option<Alphabet>,
        backgrounds: Option<BackgroundSet>,
    ) -> Hmm {
        let label_alphabet = if descriptor.features.contains(FeatureTag::Labeled) {
            Some(label_alphabet.unwrap_or_else(|| Alphabet::empty(LABEL_ALPHABET_ID)))
        } else {
            None
        };
        let backgrounds = if descriptor.features.contains(FeatureTag::Background) {
            Some(backgrounds.unwrap_or_default())
        } else {
            None
        };
        Hmm {
            properties,
            descriptor,
            class_count,
            graph: StableDiGraph::default(),
            nodes: FnvHashMap::default(),
            next_id: 0,
            alphabet,
            label_alphabet,
            backgrounds,
        }
    }
    //
    // model-wide attributes
    //
    pub fn properties(&self) -> &HmmProperties {
        &self.properties
    }
    pub fn name(&self) -> &str {
        &self.properties.name
    }
    pub fn set_name(&mut self, name: &str) {
        self.properties.name = name.to_owned();
    }
    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }
    pub fn features(&self) -> FeatureSet {
        self.descriptor.features
    }
    /// model type bitmask
    pub fn model_type(&self) -> u32 {
        self.descriptor.bits()
    }
    /// number of transition classes (1 unless transitions are switched)
    pub fn class_count(&self) -> usize {
        self.class_count
    }
    pub fn alphabet(&self) -> Option<&Alphabet> {
        self.alphabet.as_ref()
    }
    /// number of symbols, 0 for models without alphabet
    pub fn alphabet_size(&self) -> usize {
        self.alphabet.as_ref().map_or(0, |a| a.size())
    }
    pub fn label_alphabet(&self) -> Option<&Alphabet> {
        self.label_alphabet.as_ref()
    }
    pub fn backgrounds(&self) -> Option<&BackgroundSet> {
        self.backgrounds.as_ref()
    }
    pub fn backgrounds_mut(&mut self) -> Option<&mut BackgroundSet> {
        self.backgrounds.as_mut()
    }
    fn unsupported(&self, reason: &str) -> HmmError {
        HmmError::unsupported(self.model_type(), reason)
    }
    //
    // states
    //
    pub fn n_states(&self) -> usize {
        self.graph.node_count()
    }
    pub fn n_transitions(&self) -> usize {
        self.graph.edge_count()
    }
    fn node(&self, id: StateId) -> Result<NodeIndex> {
        self.nodes
            .get(&id)
            .copied()
            .ok_or(HmmError::UnknownState(id))
    }
    pub fn contains_state(&self, id: StateId) -> bool {
        self.nodes.contains_key(&id)
    }
    pub fn state(&self, id: StateId) -> Result<&State> {
        let node = self.node(id)?;
        Ok(&self.graph[node])
    }
    pub fn state_mut(&mut self, id: StateId) -> Result<&mut State> {
        let node = self.node(id)?;
        Ok(&mut self.graph[node])
    }
    /// ids of all states in ascending order
    pub fn state_ids(&self) -> Vec<StateId> {
        self.nodes.keys().copied().sorted().collect()
    }
    /// all states in ascending id order
    pub fn states(&self) -> impl Iterator<Item = &State> + '_ {
        self.state_ids()
            .into_iter()
            .map(move |id| &self.graph[self.nodes[&id]])
    }
    ///
    /// Add a state with the default attributes of the model variant and the
    /// default emission of the model family.
    ///
    pub fn add_state(&mut self) -> StateId {
        let id = StateId(self.next_id);
        let emission = Emission::new(self.descriptor.family, self.alphabet_size());
        self.insert_state(State::new(id, emission, self.descriptor.features));
        id
    }
    fn for_each_state<F: FnMut(&mut State)>(&mut self, mut f: F) {
        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        for node in nodes {
            f(&mut self.graph[node]);
        }
    }
    /// insert a state keeping its id
    fn insert_state(&mut self, state: State) {
        let id = state.id();
        self.next_id = self.next_id.max(id.index() + 1);
        let node = self.graph.add_node(state);
        self.nodes.insert(id, node);
    }
    ///
    /// Remove a state and its transitions. States tied to it become untied.
    ///
    pub fn delete_state(&mut self, id: StateId) -> Result<State> {
        let node = self.node(id)?;
        self.nodes.remove(&id);
        let state = self
            .graph
            .remove_node(node)
            .ok_or(HmmError::UnknownState(id))?;
        self.for_each_state(|other| {
            if other.tied_to() == Some(Tie::To(id)) {
                debug!("{} untied from deleted {}", other.id(), id);
                other.set_tied_to(None);
            }
        });
        Ok(state)
    }
    //
    // transitions
    //
    ///
    /// Add a zero-weighted transition `tail -> head`
    ///
    pub fn add_transition(&mut self, tail: StateId, head: StateId) -> Result<()> {
        let (a, b) = (self.node(tail)?, self.node(head)?);
        if self.graph.find_edge(a, b).is_some() {
            return Err(HmmError::DuplicateTransition(tail, head));
        }
        self.graph.add_edge(
            a,
            b,
            Transition::new(self.descriptor.transitions, self.class_count),
        );
        Ok(())
    }
    pub fn delete_transition(&mut self, tail: StateId, head: StateId) -> Result<Transition> {
        let (a, b) = (self.node(tail)?, self.node(head)?);
        self.graph
            .find_edge(a, b)
            .and_then(|e| self.graph.remove_edge(e))
            .ok_or(HmmError::UnknownTransition(tail, head))
    }
    pub fn transition(&self, tail: StateId, head: StateId) -> Result<&Transition> {
        let (a, b) = (self.node(tail)?, self.node(head)?);
        self.graph
            .find_edge(a, b)
            .map(|e| &self.graph[e])
            .ok_or(HmmError::UnknownTransition(tail, head))
    }
    pub(crate) fn transition_mut(&mut self, tail: StateId, head: StateId) -> Result<&mut Transition> {
        let (a, b) = (self.node(tail)?, self.node(head)?);
        match self.graph.find_edge(a, b) {
            Some(e) => Ok(&mut self.graph[e]),
            None => Err(HmmError::UnknownTransition(tail, head)),
        }
    }
    ///
    /// Set the weight of class `class` of `tail -> head` to `value` in `[0, 1]`
    ///
    pub fn set_transition_weight(
        &mut self,
        tail: StateId,
        head: StateId,
        class: usize,
        value: f64,
    ) -> Result<()> {
        if !is_valid_weight(value) {
            return Err(HmmError::InvalidWeight(value));
        }
        let (a, b) = (self.node(tail)?, self.node(head)?);
        let e = self
            .graph
            .find_edge(a, b)
            .ok_or(HmmError::UnknownTransition(tail, head))?;
        self.graph[e].set_weight(class, value)
    }
    ///
    /// All transitions as `(tail, head, &Transition)` sorted by `(tail, head)`
    ///
    pub fn transitions(&self) -> Vec<(StateId, StateId, &Transition)> {
        self.graph
            .edge_references()
            .map(|e| {
                (
                    self.graph[e.source()].id(),
                    self.graph[e.target()].id(),
                    e.weight(),
                )
            })
            .sorted_by_key(|(tail, head, _)| (*tail, *head))
            .collect()
    }
    fn adjacent(&self, id: StateId, dir: Direction) -> Result<Vec<(StateId, &Transition)>> {
        let node = self.node(id)?;
        Ok(self
            .graph
            .edges_directed(node, dir)
            .map(|e| {
                let other = match dir {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (self.graph[other].id(), e.weight())
            })
            .sorted_by_key(|(other, _)| *other)
            .collect())
    }
    /// successors of `id` with the transition to each, in ascending id order
    pub fn out_transitions(&self, id: StateId) -> Result<Vec<(StateId, &Transition)>> {
        self.adjacent(id, Direction::Outgoing)
    }
    /// predecessors of `id` with the transition from each, in ascending id order
    pub fn in_transitions(&self, id: StateId) -> Result<Vec<(StateId, &Transition)>> {
        self.adjacent(id, Direction::Incoming)
    }
    ///
    /// Rescale the outgoing weights of every state so that each class sums
    /// to 1. Classes whose weights sum to zero are left as they are.
    ///
    pub fn normalize_transitions(&mut self) {
        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        for node in nodes {
            let edges: Vec<_> = self.graph.edges(node).map(|e| e.id()).collect();
            for class in 0..self.class_count {
                let total: f64 = edges
                    .iter()
                    .filter_map(|&e| self.graph[e].weight(class))
                    .sum();
                if total > 0.0 {
                    for &e in edges.iter() {
                        self.graph[e].scale(class, 1.0 / total);
                    }
                }
            }
        }
    }
    //
    // feature attributes
    //
    fn require(&self, tag: FeatureTag) -> Result<()> {
        if self.descriptor.features.contains(tag) {
            Ok(())
        } else {
            Err(self.unsupported(&format!("model has no `{}` attribute", tag.attribute())))
        }
    }
    pub fn set_silent(&mut self, id: StateId, silent: bool) -> Result<()> {
        self.require(FeatureTag::Silent)?;
        self.state_mut(id)?.set_silent(silent);
        Ok(())
    }
    ///
    /// Tie the emission of `id` to the state `target`, or untie it with `None`.
    ///
    pub fn set_tied_to(&mut self, id: StateId, target: Option<StateId>) -> Result<()> {
        self.require(FeatureTag::Tied)?;
        if let Some(target) = target {
            self.node(target)?;
        }
        self.state_mut(id)?.set_tied_to(target);
        Ok(())
    }
    ///
    /// Set the label code of `id`. When the label alphabet is not empty the
    /// code must index it.
    ///
    pub fn set_label(&mut self, id: StateId, label: usize) -> Result<()> {
        self.require(FeatureTag::Labeled)?;
        let count = self.label_alphabet.as_ref().map_or(0, |a| a.size());
        if count > 0 && label >= count {
            return Err(HmmError::IndexOutOfRange {
                index: label,
                size: count,
            });
        }
        self.state_mut(id)?.set_label(label);
        Ok(())
    }
    ///
    /// Use the background distribution named `name`, or none with `None`.
    ///
    pub fn set_background(&mut self, id: StateId, name: Option<&str>) -> Result<()> {
        self.require(FeatureTag::Background)?;
        let key = match name {
            Some(name) => Some(
                self.backgrounds
                    .as_ref()
                    .and_then(|b| b.key_of(name))
                    .ok_or_else(|| HmmError::UnknownSymbol(name.to_owned()))?,
            ),
            None => None,
        };
        self.state_mut(id)?.set_background(key);
        Ok(())
    }
    ///
    /// Reshape the emission table of `id` to a uniform table of `order`.
    /// Only for higher-order models; `order` must be in `1..=max_order`.
    ///
    pub fn set_order(&mut self, id: StateId, order: u32) -> Result<()> {
        if self.descriptor.family != EmissionFamily::DiscreteHigherOrder {
            return Err(self.unsupported("emission order of a model without higher-order emissions"));
        }
        let max_order = self.properties.max_order.max(1);
        if order == 0 || order > max_order {
            return Err(HmmError::IndexOutOfRange {
                index: order as usize,
                size: max_order as usize + 1,
            });
        }
        let size = self.alphabet_size();
        match self.state_mut(id)?.emission.discrete_mut() {
            Some(e) => e.set_order(order, size),
            None => Ok(()),
        }
    }
    //
    // alphabet
    //
    fn alphabet_or_err(&self) -> Result<&Alphabet> {
        self.alphabet
            .as_ref()
            .ok_or_else(|| self.unsupported("model has no alphabet"))
    }
    ///
    /// Every discrete emission (states and background distributions) can
    /// follow the alphabet from `old_size` to `new_size` symbols.
    ///
    fn check_alphabet_change(&self, old_size: usize, new_size: usize) -> Result<()> {
        for state in self.states() {
            state
                .emission
                .check_resize(old_size, new_size, &state.owner())?;
        }
        if let Some(backgrounds) = &self.backgrounds {
            for (_, b) in backgrounds.iter() {
                b.emission.check_resize(old_size, new_size, &b.owner())?;
            }
        }
        Ok(())
    }
    fn for_each_emission<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Emission, &str) -> Result<()>,
    {
        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        for node in nodes {
            let state = &mut self.graph[node];
            let owner = state.owner();
            f(&mut state.emission, &owner)?;
        }
        if let Some(backgrounds) = self.backgrounds.as_mut() {
            for (_, b) in backgrounds.iter_mut() {
                let owner = b.owner();
                f(&mut b.emission, &owner)?;
            }
        }
        Ok(())
    }
    ///
    /// Append `symbol` to the alphabet. Every discrete emission (states and
    /// background distributions) grows by one symbol.
    ///
    /// Fails with `EmissionShapeMismatch` if an emission does not match the
    /// current alphabet; the model is then left untouched.
    ///
    pub fn insert_symbol(&mut self, symbol: &str) -> Result<usize> {
        let alphabet = self.alphabet_or_err()?;
        if alphabet.contains(symbol) {
            return Err(HmmError::DuplicateSymbol(symbol.to_owned()));
        }
        let old_size = alphabet.size();
        self.check_alphabet_change(old_size, old_size + 1)?;

        let code = match self.alphabet.as_mut() {
            Some(a) => a.insert(symbol)?,
            None => {
                return Err(HmmError::unsupported(
                    self.descriptor.bits(),
                    "model has no alphabet",
                ))
            }
        };
        let size = old_size + 1;
        self.for_each_emission(|emission, owner| emission.grow(size, owner))?;
        debug!("symbol `{}` inserted at {}", symbol, code);
        Ok(code)
    }
    ///
    /// Remove `symbol` from the alphabet and renormalize every discrete emission.
    ///
    /// Fails like `insert_symbol`, leaving the model untouched.
    ///
    pub fn remove_symbol(&mut self, symbol: &str) -> Result<usize> {
        let alphabet = self.alphabet_or_err()?;
        let code = alphabet.code_of(symbol)?;
        let old_size = alphabet.size();
        self.check_alphabet_change(old_size, old_size - 1)?;

        match self.alphabet.as_mut() {
            Some(a) => a.remove(symbol)?,
            None => {
                return Err(HmmError::unsupported(
                    self.descriptor.bits(),
                    "model has no alphabet",
                ))
            }
        };
        let size = old_size - 1;
        self.for_each_emission(|emission, owner| emission.shrink(code, size, owner))?;
        debug!("symbol `{}` removed from {}", symbol, code);
        Ok(code)
    }
    //
    // labels
    //
    pub fn insert_label(&mut self, label: &str) -> Result<usize> {
        self.require(FeatureTag::Labeled)?;
        match self.label_alphabet.as_mut() {
            Some(a) => a.insert(label),
            None => Err(HmmError::unsupported(self.descriptor.bits(), "model has no label alphabet")),
        }
    }
    ///
    /// Remove a label. States carrying it get label 0 and the codes after it
    /// move down by one.
    ///
    pub fn remove_label(&mut self, label: &str) -> Result<usize> {
        self.require(FeatureTag::Labeled)?;
        let code = match self.label_alphabet.as_mut() {
            Some(a) => a.remove(label)?,
            None => {
                return Err(HmmError::unsupported(self.descriptor.bits(), "model has no label alphabet"))
            }
        };
        self.for_each_state(|state| match state.label() {
            Some(l) if l == code => {
                warn!("{} lost its label `{}`", state.id(), label);
                state.set_label(0);
            }
            Some(l) if l > code => state.set_label(l - 1),
            _ => {}
        });
        Ok(code)
    }
    //
    // background distributions
    //
    ///
    /// Add a background distribution with the default emission of the model
    /// family and return its key.
    ///
    pub fn add_background(&mut self, name: &str) -> Result<usize> {
        self.require(FeatureTag::Background)?;
        let emission = Emission::new(self.descriptor.family, self.alphabet_size());
        match self.backgrounds.as_mut() {
            Some(b) => b.add(name, emission),
            None => Err(HmmError::unsupported(
                self.descriptor.bits(),
                "model has no background distributions",
            )),
        }
    }
    ///
    /// Remove a background distribution. States that used it fall back to
    /// no background.
    ///
    pub fn remove_background(&mut self, name: &str) -> Result<usize> {
        self.require(FeatureTag::Background)?;
        let key = match self.backgrounds.as_mut() {
            Some(b) => b.remove(name)?,
            None => {
                return Err(HmmError::unsupported(
                    self.descriptor.bits(),
                    "model has no background distributions",
                ))
            }
        };
        self.for_each_state(|state| {
            if state.background() == Some(BackgroundRef::Distribution(key)) {
                warn!("{} lost its background distribution `{}`", state.id(), name);
                state.set_background(None);
            }
        });
        Ok(key)
    }
    //
    // retyping
    //
    ///
    /// Copy of this model under new `properties`.
    ///
    /// States keep their ids and shared attributes, and attributes of new
    /// features get defaults. Emissions follow `Emission::retyped`: discrete
    /// tables survive a move to or from higher-order emissions, other family
    /// changes reset them. Transitions are recreated for the new class count.
    ///
    pub fn retype(&self, properties: HmmProperties) -> Result<Hmm> {
        let bits = compute_bitmask(&properties)?;
        let descriptor = resolve(bits)?;
        let class_count = match descriptor.transitions {
            TransitionKind::Simple => 1,
            TransitionKind::Switched => properties.class_count(),
        };
        let carries_over = Emission::carries_over(self.descriptor.family, descriptor.family);
        let max_order = properties.max_order;
        let alphabet = match (&self.alphabet, descriptor.family.has_alphabet()) {
            (Some(a), true) => Some(a.clone()),
            _ => descriptor.new_alphabet(properties.alphabet),
        };
        let alphabet_size = alphabet.as_ref().map_or(0, |a| a.size());
        let backgrounds = self.backgrounds.clone().map(|mut set| {
            for (_, b) in set.iter_mut() {
                b.emission = b
                    .emission
                    .retyped(descriptor.family, alphabet_size, max_order);
            }
            set
        });

        let mut hmm = Hmm::from_parts(
            properties,
            descriptor,
            class_count,
            alphabet,
            self.label_alphabet.clone(),
            backgrounds,
        );
        for state in self.states() {
            let mut state = state.retyped(&descriptor, alphabet_size, max_order);
            if !carries_over {
                if let Some(BackgroundRef::Distribution(_)) = state.background() {
                    state.set_background(None);
                }
            }
            hmm.insert_state(state);
        }
        hmm.next_id = self.next_id;
        for (tail, head, t) in self.transitions() {
            let (a, b) = (hmm.node(tail)?, hmm.node(head)?);
            hmm.graph
                .add_edge(a, b, t.recreate(descriptor.transitions, class_count));
        }
        info!(
            "retyped `{}`: {} -> {}",
            hmm.name(),
            self.descriptor,
            hmm.descriptor
        );
        Ok(hmm)
    }
    //
    // flat record
    //
    pub fn to_flat(&self) -> Result<FlatModel> {
        Converter::new().graph_to_flat(self)
    }
    pub fn from_flat(file: &FlatFile) -> Result<Hmm> {
        Converter::new().flat_to_graph(file)
    }
    ///
    /// Replace this model by the one of `file`.
    /// On failure this model is left untouched.
    ///
    pub fn reload(&mut self, file: &FlatFile) -> Result<()> {
        let hmm = Hmm::from_flat(file)?;
        *self = hmm;
        Ok(())
    }
    pub fn open<P: AsRef<Path>, L: FileLayer>(path: P, layer: &L) -> Result<Hmm> {
        let file = layer.parse(path.as_ref())?;
        Hmm::from_flat(&file)
    }
    pub fn save<P: AsRef<Path>, L: FileLayer>(&self, path: P, layer: &L) -> Result<()> {
        let file = FlatFile::single(self.to_flat()?);
        layer.serialize(&file, path.as_ref())
    }
    ///
    /// Graphviz dot of the states and transitions
    ///
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::with_config(&self.graph, &[]))
    }
}

impl std::fmt::Display for Hmm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(
            f,
            "`{}` type={:#x} ({}) classes={}",
            self.name(),
            self.model_type(),
            self.descriptor,
            self.class_count
        )?;
        if let Some(alphabet) = &self.alphabet {
            writeln!(f, "alphabet: {}", alphabet.symbols().join(" "))?;
        }
        if let Some(labels) = &self.label_alphabet {
            writeln!(f, "labels: {}", labels.symbols().join(" "))?;
        }
        if let Some(backgrounds) = &self.backgrounds {
            writeln!(
                f,
                "backgrounds: {}",
                backgrounds.iter().map(|(_, b)| b.name.as_str()).join(" ")
            )?;
        }
        for state in self.states() {
            writeln!(f, "{}", state)?;
        }
        for (tail, head, t) in self.transitions() {
            writeln!(f, "{} -> {} {}", tail, head, t)?;
        }
        Ok(())
    }
}

//
// tests
//
