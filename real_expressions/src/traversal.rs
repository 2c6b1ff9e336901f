//! Stack-based traversals over shared graphs.
//!
//! Every traversal keys its bookkeeping on [`NodeId`], so a node shared by many parents is
//! visited once and deep graphs never recurse on the call stack.

use core::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::GraphError;
use crate::real::{NodeId, Real, RealKind};

#[derive(Copy, Clone, PartialEq, Eq)]
enum Mark {
    Visiting,
    Visited,
}

/// Generic depth-first post-order (dependencies before dependents).
///
/// Nodes are identified by `key`. A node reached again while its own dependencies are still
/// being expanded closes a cycle; its key is returned as the error.
pub fn depth_first<N, K, I>(
    roots: impl IntoIterator<Item = N>,
    key: impl Fn(&N) -> K,
    mut dependencies: impl FnMut(&N) -> I,
) -> Result<Vec<N>, K>
where
    N: Clone,
    K: Copy + Eq + Hash,
    I: IntoIterator<Item = N>,
{
    let mut marks: FxHashMap<K, Mark> = FxHashMap::default();
    let mut order = Vec::new();
    let mut stack: Vec<(N, bool)> = roots.into_iter().map(|n| (n, false)).collect();
    stack.reverse();

    while let Some((node, expanded)) = stack.pop() {
        let k = key(&node);
        if expanded {
            marks.insert(k, Mark::Visited);
            order.push(node);
            continue;
        }
        match marks.get(&k) {
            Some(Mark::Visited) => continue,
            Some(Mark::Visiting) => return Err(k),
            None => {}
        }
        marks.insert(k, Mark::Visiting);
        let deps: Vec<N> = dependencies(&node).into_iter().collect();
        stack.push((node, true));
        stack.extend(deps.into_iter().rev().map(|d| (d, false)));
    }

    Ok(order)
}

/// All nodes reachable from `roots` through [`Real::dependencies`], dependencies first.
///
/// Follows parameter densities, so parameters that only appear in other parameters' priors are
/// included.
pub fn post_order_with_densities(roots: &[Real]) -> Result<Vec<Real>, GraphError> {
    depth_first(roots.iter().cloned(), Real::id, |n: &Real| {
        n.dependencies().into_iter().cloned().collect::<Vec<_>>()
    })
    .map_err(|node| GraphError::MalformedGraph { node })
}

/// Every distinct node reachable from `root` through [`Real::children`].
///
/// Densities are not followed. The result is in no particular order; sort by id for a
/// topological order.
pub fn reachable(root: &Real) -> Vec<Real> {
    let mut seen: FxHashSet<NodeId> = FxHashSet::default();
    let mut out = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if !seen.insert(node.id()) {
            continue;
        }
        stack.extend(node.children().into_iter().cloned());
        out.push(node);
    }

    out
}

/// Number of distinct nodes in the graph (shared sub-expressions count once).
pub fn count_nodes(root: &Real) -> usize {
    reachable(root).len()
}

/// Longest root-to-leaf path, counting nodes. A leaf has depth 1.
pub fn count_depth(root: &Real) -> usize {
    let mut nodes = reachable(root);
    nodes.sort_by_key(Real::id);
    let mut depth: FxHashMap<NodeId, usize> = FxHashMap::default();
    for n in &nodes {
        let d = n
            .children()
            .into_iter()
            .map(|c| depth[&c.id()])
            .max()
            .unwrap_or(0)
            + 1;
        depth.insert(n.id(), d);
    }
    depth[&root.id()]
}

/// Distinct parameters reachable from `roots`, including through densities, in id order.
pub fn collect_parameters(roots: &[Real]) -> Result<Vec<Real>, GraphError> {
    let mut params: Vec<Real> = post_order_with_densities(roots)?
        .into_iter()
        .filter(Real::is_parameter)
        .collect();
    params.sort_by_key(Real::id);
    Ok(params)
}

/// Distinct columns reachable from `root` (densities not followed), in id order.
pub fn collect_columns(root: &Real) -> Vec<Real> {
    let mut columns: Vec<Real> = reachable(root).into_iter().filter(Real::is_column).collect();
    columns.sort_by_key(Real::id);
    columns
}

/// Number of nodes of each kind, keyed by [`RealKind::name`].
pub fn count_kinds(root: &Real) -> FxHashMap<&'static str, usize> {
    let mut counts = FxHashMap::default();
    for n in reachable(root) {
        *counts.entry(n.kind().name()).or_insert(0) += 1;
    }
    counts
}

pub fn has_kind(root: &Real, pred: impl Fn(&RealKind) -> bool) -> bool {
    reachable(root).iter().any(|n| pred(n.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_first_orders_dependencies_first() {
        // 0 -> {1, 2}, 1 -> {3}, 2 -> {3}
        let edges: FxHashMap<u32, Vec<u32>> =
            [(0, vec![1, 2]), (1, vec![3]), (2, vec![3]), (3, vec![])].into_iter().collect();
        let order = depth_first([0u32], |n| *n, |n| edges[n].clone()).unwrap();
        assert_eq!(order.len(), 4);
        let pos = |k: u32| order.iter().position(|&n| n == k).unwrap();
        assert!(pos(3) < pos(1));
        assert!(pos(3) < pos(2));
        assert!(pos(1) < pos(0));
        assert!(pos(2) < pos(0));
    }

    #[test]
    fn depth_first_reports_cycles_instead_of_looping() {
        let edges: FxHashMap<u32, Vec<u32>> = [(0, vec![1]), (1, vec![2]), (2, vec![0])].into_iter().collect();
        let err = depth_first([0u32], |n| *n, |n| edges[n].clone()).unwrap_err();
        assert_eq!(err, 0);
    }

    #[test]
    fn duplicate_edges_are_not_cycles() {
        let edges: FxHashMap<u32, Vec<u32>> = [(0, vec![1, 1]), (1, vec![])].into_iter().collect();
        assert_eq!(depth_first([0u32], |n| *n, |n| edges[n].clone()).unwrap(), vec![1, 0]);
    }

    #[test]
    fn shared_nodes_count_once() {
        let x = Real::column();
        let s = x.exp();
        let e = &s * &s.sin() + &s;
        // x, exp(x), sin(exp(x)), exp * sin, line
        assert_eq!(count_nodes(&e), 5);
        assert_eq!(count_depth(&e), 5);
    }

    #[test]
    fn parameters_are_found_through_densities() {
        let p1 = Real::parameter(Real::constant(-1));
        let p2 = Real::parameter(p1.powi(2).scale(&crate::decimal::rational(-1, 2)));
        let col = Real::column();
        let out = &p2 * &col;
        assert_eq!(collect_parameters(&[out.clone()]).unwrap(), vec![p1, p2]);
        assert_eq!(collect_columns(&out), vec![col]);
    }

    #[test]
    fn kinds_are_counted_per_distinct_node() {
        let x = Real::column();
        let e = Real::if_(&Real::compare(&x, &Real::zero()), &x.exp(), &x.exp());
        let counts = count_kinds(&e);
        assert_eq!(counts["unary"], 2);
        assert_eq!(counts["column"], 1);
        assert!(has_kind(&e, |k| matches!(k, RealKind::Compare(_))));
        assert!(!has_kind(&e, |k| matches!(k, RealKind::Lookup(_))));
    }
}
