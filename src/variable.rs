//! Definition of the variable module
//!
//! A `Variable` represents a discrete random variable in a graphical model. Variables are
//! identified by a dense integer index and carry their cardinality, so they are cheap to
//! copy and compare. A `VarSet` is the canonical scope type: an ordered, duplicate-free
//! set of variables sorted by index. Factor tables always lay out their axes in `VarSet`
//! order, which makes scope arithmetic (union, intersection, difference) line up with
//! table axis arithmetic.

use indexmap::IndexMap;
use itertools::Itertools;

use std::fmt;

/// A discrete random variable: an index into the model plus a finite cardinality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    id: usize,
    states: usize
}

impl Variable {

    /// Construct a new `Variable` with the given index and number of states.
    pub fn new(id: usize, states: usize) -> Variable {
        Variable { id: id, states: states }
    }

    /// Construct a new binary `Variable`.
    pub fn binary(id: usize) -> Variable {
        Variable::new(id, 2)
    }

    /// The index of the `Variable` within its model.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The number of states of the `Variable`.
    pub fn states(&self) -> usize {
        self.states
    }

}

impl fmt::Display for Variable {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "x{}", self.id)
    }

}


/// An ordered set of `Variable`s, sorted ascending by index.
///
/// This is the scope type used throughout the crate. All set operations preserve the
/// sorted order, so the result of `union`/`intersection`/`difference` is directly usable
/// as a factor scope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VarSet {
    vars: Vec<Variable>
}

impl VarSet {

    /// The empty set.
    pub fn new() -> VarSet {
        VarSet { vars: Vec::new() }
    }

    /// Build a `VarSet` from the given variables, sorting and removing duplicates.
    pub fn from_vec(mut vars: Vec<Variable>) -> VarSet {
        vars.sort();
        vars.dedup();
        VarSet { vars: vars }
    }

    /// The set containing a single variable.
    pub fn singleton(var: Variable) -> VarSet {
        VarSet { vars: vec![ var ] }
    }

    /// Insert a variable, keeping the set sorted. Inserting a member is a no-op.
    pub fn insert(&mut self, var: Variable) {
        if let Err(pos) = self.vars.binary_search(&var) {
            self.vars.insert(pos, var);
        }
    }

    pub fn union(&self, other: &VarSet) -> VarSet {
        VarSet::from_vec(self.vars.iter().chain(other.vars.iter()).cloned().collect())
    }

    pub fn intersection(&self, other: &VarSet) -> VarSet {
        VarSet {
            vars: self.vars.iter().filter(|v| other.contains(v)).cloned().collect()
        }
    }

    pub fn difference(&self, other: &VarSet) -> VarSet {
        VarSet {
            vars: self.vars.iter().filter(|v| ! other.contains(v)).cloned().collect()
        }
    }

    pub fn contains(&self, var: &Variable) -> bool {
        self.vars.binary_search(var).is_ok()
    }

    /// The axis position of `var` within this scope, if present.
    pub fn position(&self, var: &Variable) -> Option<usize> {
        self.vars.binary_search(var).ok()
    }

    pub fn is_subset(&self, other: &VarSet) -> bool {
        self.vars.iter().all(|v| other.contains(v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn get(&self, idx: usize) -> Variable {
        self.vars[idx]
    }

    pub fn iter(&self) -> ::std::slice::Iter<Variable> {
        self.vars.iter()
    }

    /// The table shape induced by this scope: one axis per variable, in set order.
    pub fn shape(&self) -> Vec<usize> {
        self.vars.iter().map(|v| v.states()).collect()
    }

    /// The total number of joint states of the scope.
    pub fn num_states(&self) -> usize {
        self.vars.iter().map(|v| v.states()).product()
    }

}

impl fmt::Display for VarSet {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}}}", self.vars.iter().map(|v| v.to_string()).join(" "))
    }

}


/// A partial assignment of values to `Variable`s.
///
/// Backed by an insertion-ordered map so that iterating an `Assignment` is
/// deterministic.
#[derive(Clone, Debug, Default)]
pub struct Assignment {
    values: IndexMap<Variable, usize>
}

impl Assignment {

    pub fn new() -> Assignment {
        Assignment { values: IndexMap::new() }
    }

    /// Assign `value` to `var`, replacing any previous assignment.
    pub fn set(&mut self, var: &Variable, value: usize) {
        self.values.insert(*var, value);
    }

    pub fn get(&self, var: &Variable) -> Option<&usize> {
        self.values.get(var)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &usize)> {
        self.values.iter()
    }

}


/// Iterate every complete assignment to the given scope, in row-major order.
///
/// An empty scope yields no assignments.
pub fn all_assignments(scope: &VarSet) -> impl Iterator<Item = Assignment> {
    let vars: Vec<Variable> = scope.iter().cloned().collect();
    let states: Vec<::std::ops::Range<usize>> = vars.iter().map(|v| 0..v.states()).collect();

    states.into_iter().multi_cartesian_product().map(move |values| {
        let mut assn = Assignment::new();
        for (var, value) in vars.iter().zip(values) {
            assn.set(var, value);
        }
        assn
    })
}
