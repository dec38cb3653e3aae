//! Schematic mini-bucket construction of the join graph.
//!
//! The builder runs the mini-bucket algorithm symbolically: it tracks only factor
//! scopes, never tables, while partitioning each elimination bucket into mini-buckets
//! whose combined scope respects the i-bound. Every mini-bucket becomes a cluster;
//! edges connect a cluster to the bucket that later consumes its residual scope, and
//! sibling mini-buckets of the same bucket are chained so they can exchange
//! information. The result is in general cyclic, which is what makes the propagation
//! iterative and approximate.
//!
//! Clusters, edges and separators live in parallel vectors indexed by integer
//! handles; the structure is built once and never mutated afterwards.

use factor::Factor;
use model::GraphicalModel;
use order;
use util::Result;
use variable::{VarSet, Variable};

use indexmap::{IndexMap, IndexSet};

use std::cmp;
use std::mem;

/// A node of the join graph.
pub struct Cluster {

    /// The variables of the cluster
    pub scope: VarSet,

    /// The variable of the elimination bucket that gave birth to the cluster
    pub bucket_var: Variable,

    /// The original factors whose product forms the initial cluster potential
    pub originals: Vec<usize>,

    /// The initial cluster potential
    pub potential: Factor

}

/// A directed edge of the join graph, in forward-schedule direction.
pub struct Edge {

    pub from: usize,

    pub to: usize,

    /// The separator: the intersection of the endpoint scopes
    pub sep: VarSet

}

/// The static join graph: clusters, directed edges in schedule order, and the
/// derived adjacency used by message passing.
pub struct JoinGraph {

    pub clusters: Vec<Cluster>,

    /// Directed edges; their order is the forward propagation schedule, and its
    /// reverse is the backward schedule
    pub edges: Vec<Edge>,

    /// For each cluster, the ids of the edges pointing into it
    pub incoming: Vec<Vec<usize>>,

    /// For each cluster, the ids of the edges leaving it
    pub outgoing: Vec<Vec<usize>>,

    /// Clusters with no outgoing edge; always non-empty
    pub roots: Vec<usize>,

    /// For each variable id, the clusters born in its elimination bucket
    pub clusters_of: Vec<Vec<usize>>

}


fn pair_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}


/// Scoring function for mini-bucket aggregation.
///
/// Returns -3 if the pair cannot be combined under the i-bound, and otherwise
/// prefers merging small scopes. The effective bound for a pair is clamped up to
/// the larger operand: a slot already over the bound may still absorb scopes it
/// subsumes ("always OK to keep same size").
fn merge_score(live: &[VarSet], i_bound: usize, i: usize, j: usize) -> f64 {
    let (a, b) = (&live[i], &live[j]);
    let bound = cmp::max(i_bound,
                         cmp::max(a.len().saturating_sub(1), b.len().saturating_sub(1)));

    if a.union(b).len() > bound.saturating_add(1) {
        -3.0
    } else {
        1.0 / (a.len() + b.len()) as f64
    }
}


impl JoinGraph {

    /// Run the schematic mini-buckets along `elim_order` and assemble the join graph.
    ///
    /// An `i_bound` of zero is treated as unbounded, which produces an exact join
    /// tree. A single original factor wider than the i-bound is accepted as an
    /// oversized cluster (with a warning) rather than rejected.
    ///
    /// # Errors
    /// * `IjgpError::InvalidOrder` if `elim_order` is not a permutation of the
    ///   model's variables
    pub fn build(model: &GraphicalModel, elim_order: &[usize], i_bound: usize) -> Result<JoinGraph> {
        order::check_order(model, elim_order)?;
        let bound = if i_bound == 0 { usize::MAX } else { i_bound };

        let nf = model.num_factors();
        let nvar = model.nvar();

        // One slot per original factor. A slot carries its current ("live") scope:
        // first the factor's own scope, then, once its bucket is processed, the
        // residual message scope that participates in later buckets.
        let mut live: Vec<VarSet> = (0..nf).map(|i| model.factor(i).scope().clone()).collect();
        let mut originals: Vec<Vec<usize>> = (0..nf).map(|i| vec![ i ]).collect();
        let mut feeders: Vec<Vec<usize>> = vec![ Vec::new(); nf ];
        let mut vin: Vec<IndexSet<usize>> =
            (0..nvar).map(|v| model.factors_with(model.var(v)).iter().cloned().collect())
                     .collect();

        let mut clusters: Vec<Cluster> = Vec::new();
        let mut schedule: Vec<(usize, usize)> = Vec::new();
        let mut clusters_of: Vec<Vec<usize>> = vec![ Vec::new(); nvar ];

        for &x in elim_order.iter() {
            let var_x = model.var(x);
            if vin[x].is_empty() {
                continue;
            }

            let mut ids: Vec<usize> = vin[x].iter().cloned().collect();
            debug!("bucket {}: {} live factors", var_x, ids.len());

            // score every candidate pair in the bucket
            let mut scores: IndexMap<(usize, usize), f64> = IndexMap::new();
            for (i, &a) in ids.iter().enumerate() {
                for &b in ids[i + 1..].iter() {
                    let key = pair_key(a, b);
                    scores.insert(key, merge_score(&live, bound, key.0, key.1));
                }
            }

            // Repeatedly fold the best-scoring feasible pair (i, j), i < j, into j,
            // then rescore the pairs involving j. Ties go to the earliest-inserted
            // pair, so the partition is deterministic.
            loop {
                let mut best: Option<((usize, usize), f64)> = None;
                for (&key, &s) in scores.iter() {
                    match best {
                        Some((_, bs)) if bs >= s => (),
                        _ => best = Some((key, s))
                    }
                }
                let (i, j) = match best {
                    Some((key, s)) if s >= 0.0 => key,
                    _ => break
                };

                live[j] = live[i].union(&live[j]);
                for v in live[i].iter() {
                    vin[v.id()].shift_remove(&i);
                }
                live[i] = VarSet::new();

                let moved = mem::replace(&mut originals[i], Vec::new());
                originals[j].extend(moved);
                let moved = mem::replace(&mut feeders[i], Vec::new());
                feeders[j].extend(moved);

                ids.retain(|&k| k != i);
                scores.retain(|&(a, b), _| a != i && b != i);
                for &k in ids.iter() {
                    if k == j {
                        continue;
                    }
                    let key = pair_key(j, k);
                    scores.insert(key, merge_score(&live, bound, key.0, key.1));
                }
            }

            // each surviving mini-bucket becomes a cluster
            let mut alphas: Vec<usize> = Vec::new();
            for &m in ids.iter() {
                let alpha = clusters.len();
                let scope = live[m].clone();
                if scope.len() > bound.saturating_add(1) {
                    warn!("cluster {} over {} exceeds the i-bound ({} > {})",
                          alpha, scope, scope.len(), bound.saturating_add(1));
                }

                for &p in feeders[m].iter() {
                    schedule.push((p, alpha));
                }
                clusters_of[x].push(alpha);

                let orig = mem::replace(&mut originals[m], Vec::new());
                clusters.push(Cluster {
                    scope: scope,
                    bucket_var: var_x,
                    originals: orig,
                    potential: Factor::identity()
                });

                // The residual participates in later buckets, fed solely by alpha.
                // Re-register the slot for every variable of its reduced scope: a
                // merge may have grown the scope beyond the variables the slot was
                // registered under, and the loser's registrations are gone.
                live[m] = live[m].difference(&VarSet::singleton(var_x));
                for w in live[m].iter() {
                    vin[w.id()].insert(m);
                }
                feeders[m] = vec![ alpha ];
                alphas.push(alpha);
            }

            // chain the sibling mini-buckets of this bucket
            for w in alphas.windows(2) {
                schedule.push((w[0], w[1]));
            }
        }

        // separators and adjacency
        let mut edges: Vec<Edge> = Vec::with_capacity(schedule.len());
        let mut incoming: Vec<Vec<usize>> = vec![ Vec::new(); clusters.len() ];
        let mut outgoing: Vec<Vec<usize>> = vec![ Vec::new(); clusters.len() ];
        for (eid, &(from, to)) in schedule.iter().enumerate() {
            let sep = clusters[from].scope.intersection(&clusters[to].scope);
            edges.push(Edge { from: from, to: to, sep: sep });
            incoming[to].push(eid);
            outgoing[from].push(eid);
        }

        let roots: Vec<usize> = (0..clusters.len())
            .filter(|&c| outgoing[c].is_empty())
            .collect();

        // initial potentials: the product of each cluster's original factors
        for c in clusters.iter_mut() {
            let mut pot = Factor::identity();
            for &fi in c.originals.iter() {
                pot = pot.product(model.factor(fi));
            }
            c.potential = pot;
        }

        Ok(JoinGraph {
            clusters: clusters,
            edges: edges,
            incoming: incoming,
            outgoing: outgoing,
            roots: roots,
            clusters_of: clusters_of
        })
    }


    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn max_cluster_size(&self) -> usize {
        self.clusters.iter().map(|c| c.scope.len()).max().unwrap_or(0)
    }

    pub fn max_separator_size(&self) -> usize {
        self.edges.iter().map(|e| e.sep.len()).max().unwrap_or(0)
    }

}
