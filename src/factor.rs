//! Definition of the factor module
//!
//! A `Factor` is a non-negative real-valued table over an ordered scope of discrete
//! variables. It is the value type flowing through every stage of inference: original
//! model factors, cluster potentials, and the messages exchanged along join-graph edges
//! are all `Factor`s. The table axes always follow the scope's `VarSet` order.

use util::{Result, IjgpError};
use variable::{Assignment, VarSet, Variable};

use ndarray::prelude as nd;
use ndarray::Dimension;

/// Alias f64 ndarray::Array as Table
pub type Table = nd::ArrayD<f64>;


/// Compute the axis position of every variable of `sub` within `sup`.
///
/// Panics if `sub` is not a subset of `sup`; callers maintain that invariant.
fn axis_positions(sub: &VarSet, sup: &VarSet) -> Vec<usize> {
    sub.iter()
       .map(|v| sup.position(v).expect("scope is not a subset of the enclosing scope"))
       .collect()
}


#[derive(Clone, Debug)]
pub struct Factor {
    /// The scope of the `Factor`, sorted ascending by variable index
    scope: VarSet,

    /// The values of the `Factor` table; one axis per scope variable, in scope order
    table: Table
}


impl Factor {

    /// Create a new `Factor` over the given scope.
    ///
    /// # Errors
    /// * `IjgpError::General` if the table shape does not match the scope, or if any
    ///   entry is negative or non-finite
    pub fn new(scope: VarSet, table: Table) -> Result<Self> {
        if scope.len() != table.ndim() {
            return Err(IjgpError::General(
                String::from("Invalid arguments. Cardinality of scope must match number of table dimensions")
            ));
        }

        for (v, t) in scope.shape().iter().zip(table.shape().iter()) {
            if v != t {
                return Err(IjgpError::General(
                    String::from("Invalid arguments. Table dimensions do not match variable cardinalities")
                ));
            }
        }

        // factors may not have negative values
        if table.iter().any(|&v| v < 0.0 || ! v.is_finite()) {
            return Err(IjgpError::General(
                String::from("Invalid arguments. Factor entries must be non-negative and finite")
            ));
        }

        Ok(Factor { scope: scope, table: table })
    }


    /// A `Factor` over no variables holding a single value.
    pub fn scalar(value: f64) -> Self {
        Factor {
            scope: VarSet::new(),
            table: Table::from_elem(nd::IxDyn(&[]), value)
        }
    }


    /// The multiplicative identity: the scalar factor 1.
    pub fn identity() -> Self {
        Factor::scalar(1.0)
    }


    /// Check if the `Factor` has an empty scope.
    pub fn is_scalar(&self) -> bool {
        self.scope.is_empty()
    }


    /// Retrieve the scope of the `Factor`.
    pub fn scope(&self) -> &VarSet {
        &self.scope
    }


    /// Read-only view of the underlying table.
    pub fn table(&self) -> &Table {
        &self.table
    }


    /// Retrieve the value at the given index, one component per scope variable in
    /// scope order. For a scalar factor pass an empty slice.
    pub fn value_at(&self, idx: &[usize]) -> f64 {
        self.table[nd::IxDyn(idx)]
    }


    /// Retrieve the value for a complete assignment over the scope of this `Factor`.
    ///
    /// # Args
    /// * `assignment`: a full assignment to the scope of the `Factor`. The assignment's
    ///   scope may be a superset of the `Factor`'s scope.
    ///
    /// # Errors
    /// * `IjgpError::IncompleteAssignment` if `assignment` does not cover the scope
    pub fn value(&self, assignment: &Assignment) -> Result<f64> {
        let idxs: Vec<Option<&usize>> = self.scope.iter().map(|v| assignment.get(v)).collect();
        if idxs.iter().any(|v| v.is_none()) {
            return Err(IjgpError::IncompleteAssignment);
        }

        let idxs: Vec<usize> = idxs.iter().map(|v| *(v.unwrap())).collect();
        Ok(self.table[nd::IxDyn(&idxs)])
    }


    /// Point-wise product of this `Factor` and another.
    ///
    /// The result has scope `union(self.scope(), other.scope())`. The scopes may
    /// overlap arbitrarily, including not at all: messages are routinely scalar or
    /// defined over a strict subset of a cluster scope.
    pub fn product(&self, other: &Self) -> Self {
        // scalars scale the other operand directly
        if self.is_scalar() {
            return other.scaled(self.value_at(&[]));
        } else if other.is_scalar() {
            return self.scaled(other.value_at(&[]));
        }

        let scope = self.scope.union(&other.scope);
        let lhs = axis_positions(&self.scope, &scope);
        let rhs = axis_positions(&other.scope, &scope);

        let mut table = Table::zeros(scope.shape());
        let mut li = vec![ 0; lhs.len() ];
        let mut ri = vec![ 0; rhs.len() ];

        for (idx, slot) in table.indexed_iter_mut() {
            let idx = idx.slice();
            for (k, &p) in lhs.iter().enumerate() {
                li[k] = idx[p];
            }
            for (k, &p) in rhs.iter().enumerate() {
                ri[k] = idx[p];
            }

            *slot = self.table[nd::IxDyn(&li)] * other.table[nd::IxDyn(&ri)];
        }

        Factor { scope: scope, table: table }
    }


    /// Eliminate the given variables by summation.
    ///
    /// Variables outside the scope are ignored. Eliminating every scope variable
    /// yields a scalar factor.
    pub fn sum_out(&self, vars: &VarSet) -> Self {
        self.eliminate(vars, false)
    }


    /// Eliminate the given variables by maximization.
    pub fn max_out(&self, vars: &VarSet) -> Self {
        self.eliminate(vars, true)
    }


    fn eliminate(&self, vars: &VarSet, maximize: bool) -> Self {
        let drop = self.scope.intersection(vars);
        if drop.is_empty() {
            return self.clone();
        }

        let axes = axis_positions(&drop, &self.scope);
        let mut table = self.table.clone();

        // remove axes from the highest position down so the remaining positions stay valid
        for &ax in axes.iter().rev() {
            table = if maximize {
                table.fold_axis(nd::Axis(ax), ::std::f64::NEG_INFINITY, |m, &v| m.max(v))
            } else {
                table.sum_axis(nd::Axis(ax))
            };
        }

        Factor { scope: self.scope.difference(vars), table: table }
    }


    /// Sum-marginalize the `Factor` down to the given subscope.
    pub fn marginal(&self, keep: &VarSet) -> Self {
        self.sum_out(&self.scope.difference(keep))
    }


    /// Max-marginalize the `Factor` down to the given subscope.
    pub fn max_marginal(&self, keep: &VarSet) -> Self {
        self.max_out(&self.scope.difference(keep))
    }


    /// Condition the `Factor` on `var = value`, removing `var` from the scope.
    ///
    /// A `Factor` whose scope does not contain `var` is returned unchanged.
    pub fn condition(&self, var: Variable, value: usize) -> Self {
        match self.scope.position(&var) {
            Some(ax) => {
                Factor {
                    scope: self.scope.difference(&VarSet::singleton(var)),
                    table: self.table.index_axis(nd::Axis(ax), value).to_owned()
                }
            },
            None => self.clone()
        }
    }


    /// Normalize the `Factor` so its entries sum to 1.
    ///
    /// An identically-zero factor is returned unchanged; the degeneracy is the
    /// caller's to interpret.
    pub fn normalized(&self) -> Self {
        let z = self.table.sum();
        if z > 0.0 {
            self.scaled(1.0 / z)
        } else {
            self.clone()
        }
    }


    /// Multiply every entry by the given constant.
    pub fn scaled(&self, by: f64) -> Self {
        Factor {
            scope: self.scope.clone(),
            table: self.table.mapv(|v| v * by)
        }
    }


    /// The sum of all entries.
    pub fn sum(&self) -> f64 {
        self.table.sum()
    }


    /// The largest entry.
    pub fn max(&self) -> f64 {
        self.table.iter().fold(::std::f64::NEG_INFINITY, |m, &v| m.max(v))
    }


    /// The flat (row-major) index of the largest entry. A flat maximum is resolved
    /// toward the lowest index, so the result is deterministic.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        let mut best_val = ::std::f64::NEG_INFINITY;
        for (i, &v) in self.table.iter().enumerate() {
            if v > best_val {
                best = i;
                best_val = v;
            }
        }
        best
    }

}
