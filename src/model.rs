//! Defines a `GraphicalModel`, a collection of non-negative factors over discrete
//! variables representing the factorization of an unnormalized distribution P.
//!
//! The model is the immutable input of inference: once built it only answers lookups.
//! Variables are indexed densely from 0, and every variable must appear in the scope
//! of at least one factor.

use factor::Factor;
use init::Initialization;
use util::{IjgpError, Result};
use variable::{all_assignments, Assignment, VarSet, Variable};

use bidir_map::BidirMap;

pub struct GraphicalModel {

    /// The `Variable`s of the model, indexed by id
    vars: Vec<Variable>,

    /// The original factors of the model
    factors: Vec<Factor>,

    /// For each variable id, the indices of the factors whose scope contains it
    adjacency: Vec<Vec<usize>>

}


impl GraphicalModel {

    /// Build a model from its factors.
    ///
    /// The variables are collected from the factor scopes; their ids must form a
    /// dense range starting at 0.
    ///
    /// # Errors
    /// * `IjgpError::DuplicateVariable` if the same id appears with two cardinalities
    /// * `IjgpError::InvalidScope` if some id below the largest is not covered by any
    ///   factor
    pub fn new(factors: Vec<Factor>) -> Result<GraphicalModel> {
        let mut states: Vec<Option<usize>> = Vec::new();
        for f in factors.iter() {
            for v in f.scope().iter() {
                if v.id() >= states.len() {
                    states.resize(v.id() + 1, None);
                }
                match states[v.id()] {
                    None => states[v.id()] = Some(v.states()),
                    Some(s) if s != v.states() => return Err(IjgpError::DuplicateVariable),
                    Some(_) => ()
                }
            }
        }

        if states.iter().any(|s| s.is_none()) {
            return Err(IjgpError::InvalidScope);
        }

        let vars: Vec<Variable> = states.iter()
                                        .enumerate()
                                        .map(|(i, s)| Variable::new(i, s.unwrap()))
                                        .collect();

        let mut adjacency = vec![ Vec::new(); vars.len() ];
        for (fi, f) in factors.iter().enumerate() {
            for v in f.scope().iter() {
                adjacency[v.id()].push(fi);
            }
        }

        Ok(GraphicalModel { vars: vars, factors: factors, adjacency: adjacency })
    }


    /// The number of variables in the model.
    pub fn nvar(&self) -> usize {
        self.vars.len()
    }

    /// The variable with the given id.
    pub fn var(&self, id: usize) -> Variable {
        self.vars[id]
    }

    /// All variables of the model, indexed by id.
    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    /// The number of original factors.
    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    /// The i-th original factor.
    pub fn factor(&self, idx: usize) -> &Factor {
        &self.factors[idx]
    }

    /// All original factors.
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// The indices of the factors whose scope contains the given variable.
    pub fn factors_with(&self, var: Variable) -> &[usize] {
        &self.adjacency[var.id()]
    }


    /// The unnormalized value of a complete configuration, one entry per variable id.
    ///
    /// # Errors
    /// * `IjgpError::IncompleteAssignment` if the configuration has the wrong length
    /// * `IjgpError::InvalidScope` if some value is outside its variable's domain
    pub fn value(&self, config: &[usize]) -> Result<f64> {
        if config.len() != self.vars.len() {
            return Err(IjgpError::IncompleteAssignment);
        }
        if self.vars.iter().any(|v| config[v.id()] >= v.states()) {
            return Err(IjgpError::InvalidScope);
        }

        let mut value = 1.0;
        for f in self.factors.iter() {
            let idx: Vec<usize> = f.scope().iter().map(|v| config[v.id()]).collect();
            value *= f.value_at(&idx);
        }
        Ok(value)
    }


    /// The log value of a complete configuration. A configuration of value zero
    /// yields negative infinity rather than an error.
    pub fn log_p(&self, config: &[usize]) -> Result<f64> {
        if config.len() != self.vars.len() {
            return Err(IjgpError::IncompleteAssignment);
        }
        if self.vars.iter().any(|v| config[v.id()] >= v.states()) {
            return Err(IjgpError::InvalidScope);
        }

        let mut log_p = 0.0;
        for f in self.factors.iter() {
            let idx: Vec<usize> = f.scope().iter().map(|v| config[v.id()]).collect();
            log_p += f.value_at(&idx).ln();
        }
        Ok(log_p)
    }


    /// The exact partition function, by exhaustive enumeration.
    ///
    /// Exponential in the number of variables; intended for validation on small
    /// models only.
    pub fn partition(&self) -> f64 {
        if self.vars.is_empty() {
            return self.factors.iter().map(|f| f.value_at(&[])).product();
        }

        let scope = VarSet::from_vec(self.vars.clone());
        let assn_val = |a: Assignment| -> f64 {
            self.factors.iter().map(|f| f.value(&a).unwrap()).product()
        };
        all_assignments(&scope).map(assn_val).sum()
    }


    /// Condition the model on the given evidence.
    ///
    /// Every factor is conditioned on the observed values, the observed variables are
    /// dropped, and the survivors are renumbered densely. Returns the conditioned
    /// model together with the old→new index map needed to re-project results onto
    /// the original variable space. Factors whose scope is fully observed collapse to
    /// constants, which are folded into the first surviving factor so the conditioned
    /// model keeps the same total mass.
    ///
    /// # Errors
    /// * `IjgpError::InvalidScope` if the evidence mentions an unknown variable or an
    ///   out-of-domain value
    /// * `IjgpError::General` if the evidence observes every variable of the model
    pub fn assert_evidence(&self, evidence: &Assignment)
            -> Result<(GraphicalModel, BidirMap<usize, usize>)> {

        for (v, &val) in evidence.iter() {
            if v.id() >= self.nvar() || self.var(v.id()) != *v || val >= v.states() {
                return Err(IjgpError::InvalidScope);
            }
        }

        // old -> new index map over the surviving variables; renumbering is monotone,
        // so factor scopes stay sorted and table layouts are untouched
        let mut old2new = BidirMap::new();
        let mut next_id = 0;
        for v in self.vars.iter() {
            if evidence.get(v).is_none() {
                old2new.insert(v.id(), next_id);
                next_id += 1;
            }
        }

        let mut constant = 1.0;
        let mut conditioned: Vec<Factor> = Vec::new();
        for f in self.factors.iter() {
            let reduced = evidence.iter()
                                  .fold(f.clone(), |acc, (v, &val)| acc.condition(*v, val));
            if reduced.is_scalar() {
                constant *= reduced.value_at(&[]);
            } else {
                let scope = VarSet::from_vec(
                    reduced.scope()
                           .iter()
                           .map(|v| {
                               let id = *old2new.get_by_first(&v.id())
                                                .expect("unobserved variable missing from the index map");
                               Variable::new(id, v.states())
                           })
                           .collect()
                );
                conditioned.push(Factor::new(scope, reduced.table().clone())
                    .expect("conditioning preserved the table shape"));
            }
        }

        if conditioned.is_empty() {
            return Err(IjgpError::General(
                String::from("evidence observes every variable of the model")
            ));
        }
        if constant != 1.0 {
            conditioned[0] = conditioned[0].scaled(constant);
        }

        GraphicalModel::new(conditioned).map(|m| (m, old2new))
    }

}


/// An implementation of the [builder pattern] for creating a `GraphicalModel`.
///
/// [builder pattern]: https://en.wikipedia.org/wiki/Builder_pattern
pub struct GraphicalModelBuilder {

    /// The `Factor`s added to the model
    factors: Vec<Factor>,

    /// The error state of the builder, if any
    err: Option<IjgpError>

}

impl GraphicalModelBuilder {

    /// Construct a new `GraphicalModelBuilder`
    pub fn new() -> GraphicalModelBuilder {
        GraphicalModelBuilder {
            factors: Vec::new(),
            err: None
        }
    }


    /// Add a `Factor` to the model.
    ///
    /// # Arguments
    /// * `scope`: the `Variable`s in the scope of the `Factor`
    /// * `init`: the desired method of initializing the `Factor`
    pub fn with_factor(mut self, scope: VarSet, init: Initialization) -> Self {
        if self.err.is_some() {
            return self;
        }

        match init.build_factor(scope) {
            Ok(f) => {
                self.factors.push(f)
            },
            Err(e) => {
                self.err = Some(e);
            }
        };

        self
    }


    /// Build the `GraphicalModel`, ensuring consistency of the `Factor`s and
    /// `Variable`s.
    pub fn build(self) -> Result<GraphicalModel> {
        if let Some(e) = self.err {
            return Err(e);
        }

        GraphicalModel::new(self.factors)
    }

}
