//! Module containing initialization routines for factor tables.

use factor::{Factor, Table};
use util::{IjgpError, Result};
use variable::VarSet;

use ndarray::prelude as nd;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;

/// Defines possible ways to initialize a `Factor` over a scope.
pub enum Initialization {
    /// A uniform distribution over all joint states
    Uniform,

    /// Randomly initialize the entries of the table, then normalize
    Random,

    /// User defined table
    Table(Factor)
}


impl Initialization {

    /// Construct a `Factor`, initialized based on ```self```
    ///
    /// # Args
    /// * `scope`: the scope over which to build the `Factor`
    ///
    /// # Errors
    /// * `IjgpError::InvalidScope` if the scope is empty, or if a user-defined table
    ///   is not defined over the requested scope
    pub fn build_factor(self, scope: VarSet) -> Result<Factor> {
        if scope.is_empty() {
            return Err(IjgpError::InvalidScope);
        }

        let shape = scope.shape();
        let tbl = match self {
            // a user defined factor just needs to be verified and returned
            Initialization::Table(f) => {
                return if *f.scope() == scope {
                    Ok(f)
                } else {
                    Err(IjgpError::InvalidScope)
                };
            },
            Initialization::Uniform => {
                // normalizing constant is just the number of elements
                let z: usize = shape.iter().product();
                let val = 1.0 / (z as f64);
                Table::from_elem(nd::IxDyn(&shape), val)
            },
            Initialization::Random => {
                let mut tbl = nd::Array::random(nd::IxDyn(&shape), Uniform::new(0.0, 1.0));
                let z = tbl.sum();
                tbl.mapv_inplace(|e| e / z);
                tbl
            }
        };

        Factor::new(scope, tbl)
    }

}
