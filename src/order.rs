//! Elimination orderings over the primal graph of a `GraphicalModel`.
//!
//! The quality of inference depends heavily on the variable elimination order; this
//! module provides the greedy heuristics the engine can choose from, plus the two
//! derived quantities the driver needs: the induced width of an order (which decides
//! whether the join-graph is exact) and the pseudo tree (parent vector) over it.

use model::GraphicalModel;
use util::{IjgpError, Result};

use std::collections::BTreeSet;
use std::str::FromStr;

/// The ordering heuristics supported for `Order=` in a property string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderMethod {
    /// Eliminate the variable introducing the fewest fill-in edges
    MinFill,

    /// Eliminate the variable of smallest current degree
    MinDegree,

    /// Maximum-cardinality search, reversed
    MaxCardinality
}

impl FromStr for OrderMethod {

    type Err = IjgpError;

    fn from_str(s: &str) -> Result<OrderMethod> {
        match s {
            "MinFill" => Ok(OrderMethod::MinFill),
            "MinDegree" => Ok(OrderMethod::MinDegree),
            "MaxCardinality" => Ok(OrderMethod::MaxCardinality),
            _ => Err(IjgpError::InvalidConfig(format!("unknown ordering heuristic '{}'", s)))
        }
    }

}


/// The adjacency sets of the primal (moral) graph: two variables are neighbors iff
/// they share a factor scope.
fn primal_graph(model: &GraphicalModel) -> Vec<BTreeSet<usize>> {
    let mut adj = vec![ BTreeSet::new(); model.nvar() ];
    for f in model.factors().iter() {
        let scope: Vec<usize> = f.scope().iter().map(|v| v.id()).collect();
        for i in 0..scope.len() {
            for j in (i + 1)..scope.len() {
                adj[scope[i]].insert(scope[j]);
                adj[scope[j]].insert(scope[i]);
            }
        }
    }
    adj
}


/// Connect all current neighbors of `v` pairwise, then remove `v` from the graph.
fn eliminate(adj: &mut Vec<BTreeSet<usize>>, v: usize) {
    let nbrs: Vec<usize> = adj[v].iter().cloned().collect();
    for (i, &a) in nbrs.iter().enumerate() {
        for &b in nbrs[i + 1..].iter() {
            adj[a].insert(b);
            adj[b].insert(a);
        }
    }
    for &a in nbrs.iter() {
        adj[a].remove(&v);
    }
    adj[v].clear();
}


/// The number of fill-in edges eliminating `v` would introduce.
fn fill_count(adj: &Vec<BTreeSet<usize>>, v: usize) -> usize {
    let nbrs: Vec<usize> = adj[v].iter().cloned().collect();
    let mut fill = 0;
    for (i, &a) in nbrs.iter().enumerate() {
        for &b in nbrs[i + 1..].iter() {
            if ! adj[a].contains(&b) {
                fill += 1;
            }
        }
    }
    fill
}


/// Compute an elimination order with the given heuristic.
///
/// Deterministic: ties are always broken toward the lowest variable id.
pub fn elimination_order(model: &GraphicalModel, method: OrderMethod) -> Vec<usize> {
    match method {
        OrderMethod::MinFill => greedy_order(model, fill_count),
        OrderMethod::MinDegree => greedy_order(model, |adj, v| adj[v].len()),
        OrderMethod::MaxCardinality => max_cardinality_order(model)
    }
}


fn greedy_order<F>(model: &GraphicalModel, cost: F) -> Vec<usize>
        where F: Fn(&Vec<BTreeSet<usize>>, usize) -> usize {

    let mut adj = primal_graph(model);
    let mut remaining: BTreeSet<usize> = (0..model.nvar()).collect();
    let mut order = Vec::with_capacity(model.nvar());

    while ! remaining.is_empty() {
        // remaining iterates ascending, so the strict comparison keeps the lowest id
        let mut best: Option<(usize, usize)> = None;
        for &v in remaining.iter() {
            let c = cost(&adj, v);
            match best {
                Some((_, bc)) if bc <= c => (),
                _ => best = Some((v, c))
            }
        }

        let (v, _) = best.expect("remaining is non-empty");
        eliminate(&mut adj, v);
        remaining.remove(&v);
        order.push(v);
    }

    order
}


/// Maximum-cardinality search: repeatedly pick the variable with the most already
/// selected neighbors, then reverse the selection order.
fn max_cardinality_order(model: &GraphicalModel) -> Vec<usize> {
    let adj = primal_graph(model);
    let n = model.nvar();

    let mut marked = vec![ false; n ];
    let mut order = Vec::with_capacity(n);

    for _ in 0..n {
        let mut best: Option<(usize, usize)> = None;
        for v in 0..n {
            if marked[v] {
                continue;
            }
            let ct = adj[v].iter().filter(|&&u| marked[u]).count();
            match best {
                Some((_, bc)) if bc >= ct => (),
                _ => best = Some((v, ct))
            }
        }

        let (v, _) = best.expect("some variable is unmarked");
        marked[v] = true;
        order.push(v);
    }

    order.reverse();
    order
}


/// Verify that `order` is a permutation of the model's variables.
///
/// # Errors
/// * `IjgpError::InvalidOrder` if any variable is missing, repeated, or unknown
pub fn check_order(model: &GraphicalModel, order: &[usize]) -> Result<()> {
    if order.len() != model.nvar() {
        return Err(IjgpError::InvalidOrder);
    }

    let mut seen = vec![ false; model.nvar() ];
    for &v in order.iter() {
        if v >= seen.len() || seen[v] {
            return Err(IjgpError::InvalidOrder);
        }
        seen[v] = true;
    }
    Ok(())
}


/// The induced width of the model along the given elimination order.
pub fn induced_width(model: &GraphicalModel, order: &[usize]) -> Result<usize> {
    check_order(model, order)?;

    let mut adj = primal_graph(model);
    let mut width = 0;
    for &x in order.iter() {
        width = ::std::cmp::max(width, adj[x].len());
        eliminate(&mut adj, x);
    }
    Ok(width)
}


/// The pseudo tree of the order: the parent of `x` is the variable among its induced
/// neighbors that is eliminated soonest after `x`. Roots have no parent.
pub fn pseudo_tree(model: &GraphicalModel, order: &[usize]) -> Result<Vec<Option<usize>>> {
    check_order(model, order)?;

    let mut pos = vec![ 0; model.nvar() ];
    for (i, &x) in order.iter().enumerate() {
        pos[x] = i;
    }

    let mut adj = primal_graph(model);
    let mut parents = vec![ None; model.nvar() ];
    for &x in order.iter() {
        parents[x] = adj[x].iter().cloned().min_by_key(|&u| pos[u]);
        eliminate(&mut adj, x);
    }
    Ok(parents)
}
