//! Defines the approximate inference engine and its configuration surface.
//!
//! The inference task fixes the elimination operator for the lifetime of a run:
//! PR and MAR are sum-product tasks, MAP is max-product. Options may be set
//! directly on `IjgpOptions` or supplied as a comma-separated property string in
//! the form accepted by `IjgpOptions::parse`.

use order::OrderMethod;
use util::{IjgpError, Result};

use std::fmt;
use std::str::FromStr;

pub mod join_graph;
pub mod ijgp;
pub use self::ijgp::Ijgp;


/// The inference tasks supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    /// Estimate the log partition function
    PR,

    /// Estimate single-variable marginals (and the log partition function)
    MAR,

    /// Estimate a maximum a-posteriori configuration
    MAP
}

impl Task {

    /// The elimination operator implied by the task. The coupling is fixed:
    /// mismatched combinations are unrepresentable.
    pub fn elim_op(&self) -> ElimOp {
        match *self {
            Task::PR | Task::MAR => ElimOp::Sum,
            Task::MAP => ElimOp::Max
        }
    }

}

impl FromStr for Task {

    type Err = IjgpError;

    fn from_str(s: &str) -> Result<Task> {
        match s {
            "PR" => Ok(Task::PR),
            "MAR" => Ok(Task::MAR),
            "MAP" => Ok(Task::MAP),
            _ => Err(IjgpError::InvalidConfig(format!("unknown task '{}'", s)))
        }
    }

}

impl fmt::Display for Task {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Task::PR => write!(f, "PR"),
            Task::MAR => write!(f, "MAR"),
            Task::MAP => write!(f, "MAP")
        }
    }

}


/// Elimination operators (sum, max).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElimOp {
    Sum,
    Max
}


/// Configuration of an `Ijgp` run.
#[derive(Clone, Debug)]
pub struct IjgpOptions {

    /// Maximum number of distinct variables per join-graph cluster; 0 means
    /// unbounded (an exact join tree)
    pub i_bound: usize,

    /// Maximum number of message-passing iterations
    pub num_iter: usize,

    /// The inference task
    pub task: Task,

    /// Heuristic used when no elimination order is supplied
    pub order_method: OrderMethod,

    /// Dump the join graph and the per-message trace to the log
    pub debug: bool

}

impl Default for IjgpOptions {

    fn default() -> IjgpOptions {
        IjgpOptions {
            i_bound: 4,
            num_iter: 10,
            task: Task::MAR,
            order_method: OrderMethod::MinFill,
            debug: false
        }
    }

}

impl IjgpOptions {

    /// Parse a comma-separated property string, e.g.
    /// `"iBound=4,Order=MinFill,Iter=10,Task=MAR,Debug=0"`.
    ///
    /// Recognised keys are exactly `iBound`, `Order`, `Iter`, `Task` and `Debug`;
    /// unspecified keys keep their defaults.
    ///
    /// # Errors
    /// * `IjgpError::InvalidConfig` on an unknown key or an unparseable value
    pub fn parse(s: &str) -> Result<IjgpOptions> {
        let mut opts = IjgpOptions::default();

        for entry in s.split(',').filter(|e| ! e.is_empty()) {
            let mut kv = entry.splitn(2, '=');
            let key = kv.next().unwrap().trim();
            let value = kv.next()
                          .ok_or_else(|| IjgpError::InvalidConfig(
                              format!("missing value for property '{}'", key)))?
                          .trim();

            match key {
                "iBound" => {
                    opts.i_bound = value.parse().map_err(|_| {
                        IjgpError::InvalidConfig(format!("invalid i-bound '{}'", value))
                    })?;
                },
                "Iter" => {
                    opts.num_iter = value.parse().map_err(|_| {
                        IjgpError::InvalidConfig(format!("invalid iteration count '{}'", value))
                    })?;
                },
                "Task" => {
                    opts.task = value.parse()?;
                },
                "Order" => {
                    opts.order_method = value.parse()?;
                },
                "Debug" => {
                    let flag: usize = value.parse().map_err(|_| {
                        IjgpError::InvalidConfig(format!("invalid debug flag '{}'", value))
                    })?;
                    opts.debug = flag != 0;
                },
                _ => {
                    return Err(IjgpError::InvalidConfig(format!("unknown property '{}'", key)));
                }
            }
        }

        Ok(opts)
    }

}
