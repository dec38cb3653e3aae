//! Iterative join-graph propagation.
//!
//! The engine owns the conditioned model, the static join graph built by the
//! schematic mini-buckets, and the only mutable state of the algorithm: one forward
//! and one backward message slot per edge. A run alternates a forward (top-down)
//! pass over the schedule with a backward (bottom-up) pass over its reverse, then
//! refreshes the per-variable beliefs, and repeats until the iteration budget or a
//! stopping criterion is hit.
//!
//! The reported `log_z` is an estimate, not a bound: the cycles of the join graph
//! make the propagation overcount, so it must not be used for bounding.

use factor::Factor;
use model::GraphicalModel;
use order;
use super::join_graph::JoinGraph;
use super::{ElimOp, IjgpOptions, Task};
use util::{IjgpError, Result};
use variable::{Assignment, VarSet, Variable};

use bidir_map::BidirMap;

use std::io::Write;
use std::time::{Duration, Instant};

pub struct Ijgp {

    /// The model under inference (already conditioned on any evidence)
    model: GraphicalModel,

    options: IjgpOptions,

    /// Cached operator implied by the task
    elim_op: ElimOp,

    /// The variable elimination order; computed at `init` if not supplied
    elim_order: Vec<usize>,

    /// The pseudo tree over the order; computed at `init` if not supplied
    parents: Vec<Option<usize>>,

    /// Effective iteration budget; collapses to 1 when the join graph is a tree
    num_iter: usize,

    /// The static join graph; present after `init`
    graph: Option<JoinGraph>,

    /// Forward (top-down) messages, one per edge
    forward: Vec<Factor>,

    /// Backward (bottom-up) messages, one per edge
    backward: Vec<Factor>,

    /// Per-variable beliefs, refreshed every iteration
    beliefs: Vec<Factor>,

    /// The MAP configuration; populated iff the task is MAP
    best_config: Vec<usize>,

    /// log P of `best_config` under the model
    map_value: f64,

    /// Running estimate of the log partition function
    log_z: f64

}


impl Ijgp {

    /// Create an engine for the given model. No work happens until `init` or `run`.
    pub fn new(model: GraphicalModel, options: IjgpOptions) -> Ijgp {
        let elim_op = options.task.elim_op();
        let num_iter = options.num_iter;

        Ijgp {
            model: model,
            options: options,
            elim_op: elim_op,
            elim_order: Vec::new(),
            parents: Vec::new(),
            num_iter: num_iter,
            graph: None,
            forward: Vec::new(),
            backward: Vec::new(),
            beliefs: Vec::new(),
            best_config: Vec::new(),
            map_value: ::std::f64::NEG_INFINITY,
            log_z: 0.0
        }
    }


    /// Supply an elimination order instead of computing one. Invalidates any
    /// previously supplied pseudo tree.
    pub fn set_order(&mut self, elim_order: Vec<usize>) {
        self.elim_order = elim_order;
        self.parents.clear();
    }

    /// Supply a pseudo tree matching the elimination order.
    pub fn set_pseudo_tree(&mut self, parents: Vec<Option<usize>>) {
        self.parents = parents;
    }


    /// Build the join graph and reset all messages.
    ///
    /// Computes the elimination order and pseudo tree if they were not supplied. If
    /// the i-bound is at least the induced width of the order the join graph is a
    /// tree, a single iteration is exact, and the iteration budget collapses to 1.
    pub fn init(&mut self) -> Result<()> {
        if self.elim_order.is_empty() {
            self.elim_order = order::elimination_order(&self.model, self.options.order_method);
            self.parents.clear();
        }
        order::check_order(&self.model, &self.elim_order)?;
        if self.parents.is_empty() {
            self.parents = order::pseudo_tree(&self.model, &self.elim_order)?;
        }

        let width = order::induced_width(&self.model, &self.elim_order)?;
        let bound = if self.options.i_bound == 0 { ::std::usize::MAX } else { self.options.i_bound };
        let exact = bound >= width;
        self.num_iter = if exact { 1 } else { self.options.num_iter };

        info!("initialize inference engine: task {}, i-bound {}, iterations {}, ordering {:?}",
              self.options.task, self.options.i_bound, self.num_iter, self.options.order_method);
        info!("induced width {} (exact inference: {})", width, if exact { "yes" } else { "no" });

        let graph = JoinGraph::build(&self.model, &self.elim_order, self.options.i_bound)?;
        info!("join graph: {} clusters, {} edges, max cluster size {}, max separator size {}",
              graph.num_clusters(), graph.num_edges(),
              graph.max_cluster_size(), graph.max_separator_size());

        if self.options.debug {
            for (ci, c) in graph.clusters.iter().enumerate() {
                debug!("cluster {}: scope {} bucket {} originals {:?}",
                       ci, c.scope, c.bucket_var, c.originals);
            }
            for (eid, e) in graph.edges.iter().enumerate() {
                debug!("edge {}: {} -> {} sep {}", eid, e.from, e.to, e.sep);
            }
            debug!("roots: {:?}", graph.roots);
        }

        self.forward = vec![ Factor::identity(); graph.num_edges() ];
        self.backward = vec![ Factor::identity(); graph.num_edges() ];
        self.beliefs = vec![ Factor::identity(); self.model.nvar() ];
        self.best_config = vec![ 0; self.model.nvar() ];
        self.map_value = ::std::f64::NEG_INFINITY;
        self.log_z = 0.0;
        self.graph = Some(graph);

        Ok(())
    }


    /// Initialise, then propagate for the configured number of iterations.
    pub fn run(&mut self) -> Result<()> {
        self.init()?;
        let num_iter = self.num_iter;
        self.propagate(num_iter, None, None)
    }


    /// Eliminate a set of variables from a factor with the task's operator.
    fn elim(&self, f: &Factor, vars: &VarSet) -> Factor {
        match self.elim_op {
            ElimOp::Sum => f.sum_out(vars),
            ElimOp::Max => f.max_out(vars)
        }
    }

    /// Marginalize a factor down to a subscope with the task's operator.
    fn marg(&self, f: &Factor, keep: &VarSet) -> Factor {
        match self.elim_op {
            ElimOp::Sum => f.marginal(keep),
            ElimOp::Max => f.max_marginal(keep)
        }
    }


    fn graph(&self) -> &JoinGraph {
        self.graph.as_ref().expect("the join graph is built before propagation")
    }


    /// The belief of a cluster: its potential times every current incoming forward
    /// message and every current backward message from its children. When `skip` is
    /// given, messages exchanged with that neighbor are left out so a message never
    /// feeds back into itself along the same edge.
    fn cluster_belief(&self, a: usize, skip: Option<usize>) -> Factor {
        let graph = self.graph();
        let mut bel = graph.clusters[a].potential.clone();

        for &eid in graph.incoming[a].iter() {
            if skip == Some(graph.edges[eid].from) {
                continue;
            }
            bel = bel.product(&self.forward[eid]);
        }
        for &eid in graph.outgoing[a].iter() {
            if skip == Some(graph.edges[eid].to) {
                continue;
            }
            bel = bel.product(&self.backward[eid]);
        }

        bel
    }


    /// The belief of a cluster excluding all backward messages; used by the MAP
    /// back-substitution.
    fn incoming_belief(&self, a: usize) -> Factor {
        let graph = self.graph();
        let mut bel = graph.clusters[a].potential.clone();
        for &eid in graph.incoming[a].iter() {
            bel = bel.product(&self.forward[eid]);
        }
        bel
    }


    /// Forward (top-down) pass: refresh every forward message in schedule order and
    /// rebuild the `log_z` estimate from the message normalisers plus the roots.
    fn forward_pass(&mut self) {
        self.log_z = 0.0;

        let n = self.graph().num_edges();
        for eid in 0..n {
            let (a, b, vx) = {
                let graph = self.graph();
                let e = &graph.edges[eid];
                (e.from, e.to, graph.clusters[e.from].scope.difference(&e.sep))
            };

            let bel = self.cluster_belief(a, Some(b));
            let mut msg = self.elim(&bel, &vx);

            // rescale by the maximum for numerical stability and fold the scale into
            // log_z; an identically-zero message pins log_z at -inf rather than erring
            let mx = msg.max();
            if mx > 0.0 {
                msg = msg.scaled(1.0 / mx);
            }
            self.log_z += mx.ln();

            if self.options.debug {
                debug!("forward msg {} -> {}: eliminated {}, scale {:e}", a, b, vx, mx);
            }
            self.forward[eid] = msg;
        }

        // root contribution
        let roots = self.graph().roots.clone();
        let mut f = 0.0;
        for &r in roots.iter() {
            let bel = self.cluster_belief(r, None);
            f += match self.options.task {
                Task::MAP => bel.max().ln(),
                _ => bel.sum().ln()
            };
        }
        self.log_z += f;
    }


    /// Backward (bottom-up) pass: walk the schedule in reverse and refresh every
    /// backward message. `log_z` is not touched here.
    fn backward_pass(&mut self) {
        let n = self.graph().num_edges();
        for eid in (0..n).rev() {
            let (a, b, vx) = {
                let graph = self.graph();
                let e = &graph.edges[eid];
                (e.from, e.to, graph.clusters[e.to].scope.difference(&e.sep))
            };

            let bel = self.cluster_belief(b, Some(a));
            let mut msg = self.elim(&bel, &vx);

            let mx = msg.max();
            if mx > 0.0 {
                msg = msg.scaled(1.0 / mx);
            }

            if self.options.debug {
                debug!("backward msg {} -> {}: eliminated {}, scale {:e}", b, a, vx, mx);
            }
            self.backward[eid] = msg;
        }
    }


    /// Refresh the per-variable beliefs; for MAP, also recover a configuration by
    /// back-substitution along the reverse elimination order and score it against
    /// the model.
    fn update(&mut self) -> Result<()> {
        for v in 0..self.model.nvar() {
            let var = self.model.var(v);
            let c = self.graph().clusters_of[v][0];

            let bel = self.cluster_belief(c, None);
            let marg = self.marg(&bel, &VarSet::singleton(var));
            self.beliefs[v] = match self.options.task {
                Task::MAP => {
                    let mx = marg.max();
                    if mx > 0.0 { marg.scaled(1.0 / mx) } else { marg }
                },
                _ => marg.normalized()
            };
        }

        if self.options.task == Task::MAP {
            for idx in (0..self.elim_order.len()).rev() {
                let x = self.elim_order[idx];
                let a = self.graph().clusters_of[x][0];
                let mut bel = self.incoming_belief(a);

                // condition on the variables assigned earlier in the sweep, i.e.
                // those eliminated after x
                for later in (idx + 1)..self.elim_order.len() {
                    let y = self.model.var(self.elim_order[later]);
                    if self.graph().clusters[a].scope.contains(&y) {
                        bel = bel.condition(y, self.best_config[y.id()]);
                    }
                }

                self.best_config[x] = bel.argmax();
            }
            self.map_value = self.model.log_p(&self.best_config)?;
        }

        Ok(())
    }


    /// Iterative message passing over the join graph.
    ///
    /// Runs up to `num_iter` iterations of forward, backward, belief update. Stops
    /// early when the change in `log_z` drops below `stop_obj` or the elapsed wall
    /// time exceeds `stop_time`; both criteria are checked between iterations, and
    /// at least one iteration always runs.
    pub fn propagate(&mut self, num_iter: usize,
                     stop_time: Option<Duration>, stop_obj: Option<f64>) -> Result<()> {
        if self.graph.is_none() {
            return Err(IjgpError::General(
                String::from("propagate called before init")
            ));
        }

        let start = Instant::now();
        for iter in 1..(::std::cmp::max(num_iter, 1) + 1) {
            let prev = self.log_z;

            self.forward_pass();
            self.backward_pass();
            self.update()?;

            let delta = (self.log_z - prev).abs();
            info!("IJGP: {:.6} ({:.6e}) d={:.6e} time={:.3?} i={}",
                  self.log_z, self.log_z.exp(), delta, start.elapsed(), iter);

            if let Some(tol) = stop_obj {
                if delta < tol {
                    break;
                }
            }
            if let Some(limit) = stop_time {
                if start.elapsed() >= limit {
                    break;
                }
            }
        }

        Ok(())
    }


    /// The current estimate of the log partition function (MAR/PR) or of the MAP
    /// value (MAP). Not a bound in either direction.
    pub fn log_z(&self) -> f64 {
        self.log_z
    }

    /// The belief over a single variable.
    pub fn belief(&self, var: Variable) -> &Factor {
        &self.beliefs[var.id()]
    }

    /// All per-variable beliefs, indexed by variable id.
    pub fn beliefs(&self) -> &[Factor] {
        &self.beliefs
    }

    /// The belief over a set of variables. Only singleton sets are supported.
    pub fn joint_belief(&self, vars: &VarSet) -> Result<Factor> {
        if vars.len() != 1 {
            return Err(IjgpError::NotSupported(
                String::from("joint beliefs over more than one variable")
            ));
        }
        Ok(self.beliefs[vars.get(0).id()].clone())
    }

    /// The MAP configuration, one value per variable id. Meaningful iff the task
    /// is MAP.
    pub fn best_config(&self) -> &[usize] {
        &self.best_config
    }

    /// log P of the MAP configuration under the model.
    pub fn map_value(&self) -> f64 {
        self.map_value
    }

    /// IJGP overcounts through the cycles of the join graph and therefore bounds
    /// nothing.
    pub fn upper_bound(&self) -> Result<f64> {
        Err(IjgpError::NotSupported(
            String::from("IJGP does not compute an upper bound due to overcounting")
        ))
    }

    /// See `upper_bound`.
    pub fn lower_bound(&self) -> Result<f64> {
        Err(IjgpError::NotSupported(
            String::from("IJGP does not compute a lower bound due to overcounting")
        ))
    }

    /// The model under inference.
    pub fn model(&self) -> &GraphicalModel {
        &self.model
    }

    /// The elimination order in use; empty before `init` unless supplied.
    pub fn order(&self) -> &[usize] {
        &self.elim_order
    }

    /// The pseudo tree over the elimination order.
    pub fn pseudo_tree(&self) -> &[Option<usize>] {
        &self.parents
    }


    /// Write the solution in the result-file format.
    ///
    /// Results are re-projected onto the original (pre-evidence) variable space:
    /// `evidence` maps original variables to their observed values and `old2new`
    /// maps original ids to ids of the conditioned model this engine ran on.
    /// Evidence variables are written as degenerate distributions (MAR) or as their
    /// observed value (MAP).
    pub fn write_solution<W: Write>(&self, out: &mut W, evidence: &Assignment,
                                    old2new: &BidirMap<usize, usize>,
                                    orig: &GraphicalModel) -> Result<()> {
        match self.options.task {
            Task::PR | Task::MAR => {
                writeln!(out, "PR")?;
                writeln!(out, "{:.6} ({:.6e})", self.log_z, self.log_z.exp())?;
                writeln!(out, "MAR")?;

                write!(out, "{}", orig.nvar())?;
                for i in 0..orig.nvar() {
                    let v = orig.var(i);
                    write!(out, " {}", v.states())?;
                    match evidence.get(&v) {
                        Some(&val) => {
                            for k in 0..v.states() {
                                write!(out, " {:.6}", if k == val { 1.0 } else { 0.0 })?;
                            }
                        },
                        None => {
                            let j = *old2new.get_by_first(&i).ok_or_else(|| {
                                IjgpError::General(
                                    format!("variable {} missing from the old/new index map", i))
                            })?;
                            for k in 0..v.states() {
                                write!(out, " {:.6}", self.beliefs[j].value_at(&[k]))?;
                            }
                        }
                    }
                }
                writeln!(out, "")?;
            },
            Task::MAP => {
                writeln!(out, "MAP")?;
                write!(out, "{}", orig.nvar())?;
                for i in 0..orig.nvar() {
                    match evidence.get(&orig.var(i)) {
                        Some(&val) => write!(out, " {}", val)?,
                        None => {
                            let j = *old2new.get_by_first(&i).ok_or_else(|| {
                                IjgpError::General(
                                    format!("variable {} missing from the old/new index map", i))
                            })?;
                            write!(out, " {}", self.best_config[j])?;
                        }
                    }
                }
                writeln!(out, "")?;
            }
        }

        Ok(())
    }

}


#[cfg(test)]
mod tests {
    use super::*;
    use factor::Table;
    use order::OrderMethod;

    use ndarray::prelude as nd;
    use ndarray_rand::RandomExt;
    use ndarray_rand::rand_distr::Uniform;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pairwise(a: usize, b: usize, table: Table) -> Factor {
        Factor::new(
            VarSet::from_vec(vec![ Variable::binary(a), Variable::binary(b) ]),
            table
        ).unwrap()
    }

    fn options(task: Task, i_bound: usize, num_iter: usize) -> IjgpOptions {
        let mut opts = IjgpOptions::default();
        opts.task = task;
        opts.i_bound = i_bound;
        opts.num_iter = num_iter;
        opts
    }

    /// Two binary variables with phi(X, Y) = [[0.1, 0.9], [0.4, 0.6]].
    fn two_var_model() -> GraphicalModel {
        GraphicalModel::new(vec![
            pairwise(0, 1, array![[0.1, 0.9], [0.4, 0.6]].into_dyn())
        ]).unwrap()
    }

    /// A - B - C with the given pairwise table on both links.
    fn chain_model(table: Table) -> GraphicalModel {
        GraphicalModel::new(vec![
            pairwise(0, 1, table.clone()),
            pairwise(1, 2, table)
        ]).unwrap()
    }

    #[test]
    fn two_variable_marginals() {
        let mut engine = Ijgp::new(two_var_model(), options(Task::MAR, 2, 1));
        engine.run().unwrap();

        assert!((engine.log_z() - 2.0f64.ln()).abs() < 1e-9);

        let bx = engine.belief(engine.model().var(0));
        assert!((bx.value_at(&[0]) - 0.5).abs() < 1e-9);
        assert!((bx.value_at(&[1]) - 0.5).abs() < 1e-9);

        let by = engine.belief(engine.model().var(1));
        assert!((by.value_at(&[0]) - 0.25).abs() < 1e-9);
        assert!((by.value_at(&[1]) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn uniform_chain() {
        let mut engine = Ijgp::new(
            chain_model(Table::ones(vec![2, 2])),
            options(Task::MAR, 2, 1)
        );
        engine.run().unwrap();

        // eight equally likely configurations
        assert!((engine.log_z() - 8.0f64.ln()).abs() < 1e-9);
        for v in 0..3 {
            let b = engine.belief(engine.model().var(v));
            assert!((b.value_at(&[0]) - 0.5).abs() < 1e-9);
            assert!((b.value_at(&[1]) - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn attractive_chain_map() {
        let model = chain_model(array![[0.9, 0.1], [0.1, 0.9]].into_dyn());
        let mut engine = Ijgp::new(model, options(Task::MAP, 2, 1));
        engine.run().unwrap();

        // the two uniform configurations tie; the flat-maximum rule picks all-zero
        assert_eq!(engine.best_config(), &[ 0, 0, 0 ]);

        let expected = 2.0 * 0.9f64.ln();
        assert!((engine.map_value() - expected).abs() < 1e-9);

        // the mirrored configuration has exactly the same score
        let mirrored = engine.model().log_p(&[ 1, 1, 1 ]).unwrap();
        assert!((engine.map_value() - mirrored).abs() < 1e-12);
    }

    #[test]
    fn loopy_triangle_is_symmetric_but_inexact() {
        let table = array![[1.0, 0.1], [0.1, 1.0]];
        let model = GraphicalModel::new(vec![
            pairwise(0, 1, table.clone().into_dyn()),
            pairwise(1, 2, table.clone().into_dyn()),
            pairwise(0, 2, table.into_dyn())
        ]).unwrap();
        let exact = model.partition().ln();

        // i-bound 1 forces the triangle bucket apart, leaving a cycle through the
        // sibling mini-buckets
        let mut engine = Ijgp::new(model, options(Task::MAR, 1, 10));
        engine.run().unwrap();

        for v in 0..3 {
            let b = engine.belief(engine.model().var(v));
            assert!((b.value_at(&[0]) - 0.5).abs() < 1e-9);
            assert!((b.value_at(&[1]) - 0.5).abs() < 1e-9);
        }

        // the estimate overcounts through the cycle: close, but not a bound and
        // not exact
        assert!((engine.log_z() - exact).abs() > 1e-6);
    }

    #[test]
    fn message_scopes_match_separators() {
        let table = array![[1.0, 0.1], [0.1, 1.0]];
        let model = GraphicalModel::new(vec![
            pairwise(0, 1, table.clone().into_dyn()),
            pairwise(1, 2, table.clone().into_dyn()),
            pairwise(0, 2, table.into_dyn())
        ]).unwrap();

        let mut engine = Ijgp::new(model, options(Task::MAR, 1, 2));
        engine.run().unwrap();

        let graph = engine.graph.as_ref().unwrap();
        for (eid, e) in graph.edges.iter().enumerate() {
            assert_eq!(*engine.forward[eid].scope(), e.sep);
            assert_eq!(*engine.backward[eid].scope(), e.sep);
        }
    }

    #[test]
    fn deterministic_equality_map() {
        let a = Variable::binary(0);
        let b = Variable::binary(1);
        let unary = Factor::new(VarSet::singleton(a), array![0.3, 0.7].into_dyn()).unwrap();
        let equal = Factor::new(
            VarSet::from_vec(vec![ a, b ]),
            array![[1.0, 0.0], [0.0, 1.0]].into_dyn()
        ).unwrap();
        let model = GraphicalModel::new(vec![ unary, equal ]).unwrap();

        let mut engine = Ijgp::new(model, options(Task::MAP, 2, 1));
        engine.run().unwrap();

        assert_eq!(engine.best_config(), &[ 1, 1 ]);
        assert!((engine.map_value() - 0.7f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn exactness_at_large_i_bound() {
        let model = chain_model(array![[0.2, 0.8], [0.5, 0.5]].into_dyn());
        let exact = model.partition().ln();

        // brute-force marginal of the first variable
        let p0: f64 = iproduct!(0..2, 0..2)
            .map(|(b, c)| model.value(&[0, b, c]).unwrap())
            .sum();

        let mut engine = Ijgp::new(model, options(Task::MAR, 3, 1));
        engine.run().unwrap();

        assert!((engine.log_z() - exact).abs() < 1e-9);

        let belief = engine.belief(engine.model().var(0));
        assert!((belief.value_at(&[0]) - p0 / exact.exp()).abs() < 1e-9);
    }

    #[test]
    fn deterministic_across_runs() {
        let run = || {
            let mut rng = StdRng::seed_from_u64(23);
            let mut factors = Vec::new();
            for &(a, b) in [ (0, 1), (1, 2), (2, 3), (3, 0), (0, 2) ].iter() {
                let table = nd::Array::random_using(
                    nd::IxDyn(&[2, 2]), Uniform::new(0.1, 1.0), &mut rng);
                factors.push(pairwise(a, b, table));
            }

            let mut engine = Ijgp::new(
                GraphicalModel::new(factors).unwrap(),
                options(Task::MAR, 1, 5)
            );
            engine.run().unwrap();
            engine
        };

        let first = run();
        let second = run();

        assert_eq!(first.log_z().to_bits(), second.log_z().to_bits());
        for v in 0..4 {
            let (a, b) = (first.beliefs()[v].table(), second.beliefs()[v].table());
            assert!(a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
        }
    }

    #[test]
    fn supplied_order_is_respected() {
        let model = chain_model(Table::ones(vec![2, 2]));
        let mut engine = Ijgp::new(model, options(Task::MAR, 2, 1));
        engine.set_order(vec![ 2, 1, 0 ]);
        engine.run().unwrap();

        assert_eq!(engine.order(), &[ 2, 1, 0 ]);
        assert!((engine.log_z() - 8.0f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn hub_first_order_marginals() {
        // Eliminating the hub first folds both factors into one bucket-0 slot;
        // the leaf variables are served by residual clusters. Still exact, and
        // every variable must end up with a cluster to read its belief from.
        let model = GraphicalModel::new(vec![
            pairwise(0, 1, array![[0.9, 0.1], [0.2, 0.8]].into_dyn()),
            pairwise(0, 2, array![[0.5, 0.5], [0.3, 0.7]].into_dyn())
        ]).unwrap();
        let exact = model.partition().ln();

        let p1: f64 = iproduct!(0..2, 0..2)
            .map(|(a, c)| model.value(&[a, 0, c]).unwrap())
            .sum();

        let mut engine = Ijgp::new(model, options(Task::MAR, 4, 1));
        engine.set_order(vec![ 0, 1, 2 ]);
        engine.run().unwrap();

        assert!((engine.log_z() - exact).abs() < 1e-9);
        let b = engine.belief(engine.model().var(1));
        assert!((b.value_at(&[0]) - p1 / exact.exp()).abs() < 1e-9);
    }

    #[test]
    fn hub_first_order_map() {
        let model = GraphicalModel::new(vec![
            pairwise(0, 1, array![[0.9, 0.1], [0.2, 0.8]].into_dyn()),
            pairwise(0, 2, array![[0.5, 0.5], [0.3, 0.7]].into_dyn())
        ]).unwrap();

        // brute-force optimum
        let best: f64 = iproduct!(0..2, 0..2, 0..2)
            .map(|(a, b, c)| model.value(&[a, b, c]).unwrap())
            .fold(::std::f64::NEG_INFINITY, |m, v| m.max(v));

        let mut engine = Ijgp::new(model, options(Task::MAP, 4, 1));
        engine.set_order(vec![ 0, 1, 2 ]);
        engine.run().unwrap();

        // the recovered configuration is in-domain and attains the optimum
        let config = engine.best_config().to_vec();
        assert!(config.iter().enumerate()
                      .all(|(v, &val)| val < engine.model().var(v).states()));
        assert!((engine.map_value() - best.ln()).abs() < 1e-9);
        assert!((engine.model().log_p(&config).unwrap() - best.ln()).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_supplied_order() {
        let model = chain_model(Table::ones(vec![2, 2]));
        let mut engine = Ijgp::new(model, options(Task::MAR, 2, 1));
        engine.set_order(vec![ 0, 1 ]);

        match engine.run() {
            Err(IjgpError::InvalidOrder) => (),
            _ => panic!("expected InvalidOrder")
        };
    }

    #[test]
    fn bounds_are_not_supported() {
        let engine = Ijgp::new(two_var_model(), options(Task::MAR, 2, 1));

        match engine.upper_bound() {
            Err(IjgpError::NotSupported(_)) => (),
            _ => panic!("expected NotSupported")
        };
        match engine.lower_bound() {
            Err(IjgpError::NotSupported(_)) => (),
            _ => panic!("expected NotSupported")
        };
    }

    #[test]
    fn joint_beliefs_are_single_variable_only() {
        let mut engine = Ijgp::new(two_var_model(), options(Task::MAR, 2, 1));
        engine.run().unwrap();

        let x = engine.model().var(0);
        let y = engine.model().var(1);

        let single = engine.joint_belief(&VarSet::singleton(x)).unwrap();
        assert_eq!(single.table(), engine.belief(x).table());

        match engine.joint_belief(&VarSet::from_vec(vec![ x, y ])) {
            Err(IjgpError::NotSupported(_)) => (),
            _ => panic!("expected NotSupported")
        };
    }

    #[test]
    fn propagate_requires_init() {
        let mut engine = Ijgp::new(two_var_model(), options(Task::MAR, 2, 1));
        assert!(engine.propagate(1, None, None).is_err());
    }

    #[test]
    fn evidence_writes_degenerate_marginals() {
        let orig = two_var_model();
        let y = orig.var(1);

        let mut evidence = Assignment::new();
        evidence.set(&y, 1);
        let (conditioned, old2new) = orig.assert_evidence(&evidence).unwrap();

        let mut engine = Ijgp::new(conditioned, options(Task::MAR, 2, 1));
        engine.run().unwrap();

        // phi(X, Y = 1) = [0.9, 0.6]
        assert!((engine.log_z() - 1.5f64.ln()).abs() < 1e-9);

        let mut out: Vec<u8> = Vec::new();
        engine.write_solution(&mut out, &evidence, &old2new, &orig).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "PR");
        assert_eq!(lines[2], "MAR");
        assert_eq!(lines[3], "2 2 0.600000 0.400000 2 0.000000 1.000000");
    }

    #[test]
    fn map_solution_output() {
        let a = Variable::binary(0);
        let b = Variable::binary(1);
        let unary = Factor::new(VarSet::singleton(a), array![0.3, 0.7].into_dyn()).unwrap();
        let equal = Factor::new(
            VarSet::from_vec(vec![ a, b ]),
            array![[1.0, 0.0], [0.0, 1.0]].into_dyn()
        ).unwrap();
        let model = GraphicalModel::new(vec![ unary, equal ]).unwrap();

        let mut engine = Ijgp::new(model, options(Task::MAP, 2, 1));
        engine.run().unwrap();

        let mut old2new = BidirMap::new();
        old2new.insert(0, 0);
        old2new.insert(1, 1);

        let mut out: Vec<u8> = Vec::new();
        engine.write_solution(&mut out, &Assignment::new(), &old2new, engine.model()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text, "MAP\n2 1 1\n");
    }

    #[test]
    fn min_degree_ordering_runs() {
        let mut opts = options(Task::MAR, 2, 1);
        opts.order_method = OrderMethod::MinDegree;

        let mut engine = Ijgp::new(chain_model(Table::ones(vec![2, 2])), opts);
        engine.run().unwrap();
        assert!((engine.log_z() - 8.0f64.ln()).abs() < 1e-9);
    }
}
