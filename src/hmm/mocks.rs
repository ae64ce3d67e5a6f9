//!
//! Mock HMMs for testing
//!
use super::properties::HmmProperties;
use super::Hmm;
use crate::common::{sid, Position};

///
/// Two-state DNA model with discrete emissions only. `s0` is the initial
/// state and both emissions are uniform over ACGT.
///
/// ```text
///        0.6
///   s0 ------> s1
///      <------
///        0.4
/// ```
///
pub fn mock_dna_two_state() -> Hmm {
    let mut hmm = Hmm::new(HmmProperties {
        name: "dna".to_owned(),
        ..HmmProperties::default()
    })
    .unwrap();
    let a = hmm.add_state();
    let b = hmm.add_state();
    hmm.state_mut(a).unwrap().initial = 1.0;
    hmm.state_mut(b).unwrap().position = Position::new(120, 40);
    hmm.add_transition(a, b).unwrap();
    hmm.add_transition(b, a).unwrap();
    hmm.set_transition_weight(a, b, 0, 0.6).unwrap();
    hmm.set_transition_weight(b, a, 0, 0.4).unwrap();
    hmm
}

///
/// `n` states in a cycle with tied emissions.
/// The states of `members[1..]` are tied to `members[0]`.
///
pub fn mock_tied(members: &[usize], n: usize) -> Hmm {
    let mut hmm = Hmm::new(HmmProperties {
        name: "tied".to_owned(),
        tied: true,
        ..HmmProperties::default()
    })
    .unwrap();
    for _ in 0..n {
        hmm.add_state();
    }
    for i in 0..n {
        hmm.add_transition(sid(i), sid((i + 1) % n)).unwrap();
        hmm.set_transition_weight(sid(i), sid((i + 1) % n), 0, 1.0)
            .unwrap();
    }
    if let Some((&first, rest)) = members.split_first() {
        for &m in rest {
            hmm.set_tied_to(sid(m), Some(sid(first))).unwrap();
        }
    }
    hmm
}

///
/// Three-state continuous cycle with `classes` transition classes.
/// Class `c` of every transition has weight `0.1 * (c + 1)`.
///
pub fn mock_switched(classes: usize) -> Hmm {
    let mut hmm = Hmm::new(HmmProperties {
        name: "switched".to_owned(),
        kind: 1,
        switching: classes,
        ..HmmProperties::default()
    })
    .unwrap();
    for _ in 0..3 {
        hmm.add_state();
    }
    for i in 0..3 {
        let (tail, head) = (sid(i), sid((i + 1) % 3));
        hmm.add_transition(tail, head).unwrap();
        for c in 0..classes {
            hmm.set_transition_weight(tail, head, c, 0.1 * (c + 1) as f64)
                .unwrap();
        }
    }
    hmm
}

///
/// Discrete model with every state feature
///
/// * labels `intron exon utr`
/// * backgrounds `gc-rich at-rich`; s1 uses `gc-rich`
/// * s2 is tied to s0
///
pub fn mock_full_featured() -> Hmm {
    let mut hmm = Hmm::new(HmmProperties {
        name: "full".to_owned(),
        tied: true,
        silent: true,
        background: true,
        labels: true,
        ..HmmProperties::default()
    })
    .unwrap();
    for label in ["intron", "exon", "utr"].iter() {
        hmm.insert_label(label).unwrap();
    }
    hmm.add_background("gc-rich").unwrap();
    hmm.add_background("at-rich").unwrap();
    let s0 = hmm.add_state();
    let s1 = hmm.add_state();
    let s2 = hmm.add_state();
    hmm.state_mut(s0).unwrap().initial = 1.0;
    hmm.state_mut(s1).unwrap().desc = "gc island".to_owned();
    hmm.set_background(s1, Some("gc-rich")).unwrap();
    hmm.set_tied_to(s2, Some(s0)).unwrap();
    hmm.set_label(s2, 2).unwrap();
    for &(tail, head, p) in [(s0, s1, 0.3), (s0, s2, 0.7), (s1, s2, 1.0), (s2, s0, 1.0)].iter() {
        hmm.add_transition(tail, head).unwrap();
        hmm.set_transition_weight(tail, head, 0, p).unwrap();
    }
    hmm
}
