//! The undirected contact graph over agent indices. Built once per
//! population via small-world generation; the edge set never changes during
//! a run. Reduced social contact is expressed through the population's
//! scalar contact-rate multiplier, not by removing edges.

use rand::Rng;
use rustc_hash::FxHashSet;

/// A simple undirected graph keyed by agent index. No self-loops, no
/// duplicate edges.
#[derive(Clone, Debug)]
pub struct ContactNetwork {
    /// Neighbor lists, sorted so iteration order is deterministic.
    adjacency: Vec<Vec<usize>>,
    edge_count: usize,
}

impl ContactNetwork {
    /// Builds a Watts–Strogatz small-world graph: a ring lattice of `n`
    /// nodes each linked to its `k` nearest neighbors (`k / 2` per side),
    /// with each lattice edge independently rewired with probability `p` to
    /// a uniformly random non-adjacent node. High local clustering with a
    /// tunable fraction of long-range shortcuts.
    #[must_use]
    pub fn small_world<R: Rng>(n: usize, k: usize, p: f64, rng: &mut R) -> Self {
        assert!((0.0..=1.0).contains(&p), "rewire probability out of range: {p}");

        let half = k / 2;
        let mut edges: FxHashSet<(usize, usize)> = FxHashSet::default();
        let mut degree = vec![0usize; n];

        for i in 0..n {
            for j in 1..=half {
                let target = (i + j) % n;
                if target == i {
                    break;
                }
                if edges.insert(edge_key(i, target)) {
                    degree[i] += 1;
                    degree[target] += 1;
                }
            }
        }

        // Rewire the lattice edges in a fixed order so a seeded rng yields
        // the same graph every time.
        for i in 0..n {
            for j in 1..=half {
                let target = (i + j) % n;
                let key = edge_key(i, target);
                if !edges.contains(&key) || !rng.random_bool(p) {
                    continue;
                }
                if degree[i] >= n - 1 {
                    // Already adjacent to everyone; no valid rewiring target.
                    continue;
                }
                let replacement = loop {
                    let candidate = rng.random_range(0..n);
                    if candidate != i && !edges.contains(&edge_key(i, candidate)) {
                        break candidate;
                    }
                };
                edges.remove(&key);
                degree[target] -= 1;
                edges.insert(edge_key(i, replacement));
                degree[replacement] += 1;
            }
        }

        let mut adjacency = vec![Vec::new(); n];
        for &(a, b) in &edges {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
        }

        ContactNetwork {
            adjacency,
            edge_count: edges.len(),
        }
    }

    /// Builds a network from an explicit edge list. Panics on out-of-range
    /// endpoints or self-loops; duplicate edges collapse to one.
    #[must_use]
    pub fn from_edges(n: usize, edges: &[(usize, usize)]) -> Self {
        let mut edge_set: FxHashSet<(usize, usize)> = FxHashSet::default();
        for &(a, b) in edges {
            assert!(a < n && b < n, "edge ({a}, {b}) out of range for {n} nodes");
            assert_ne!(a, b, "self-loops are not allowed");
            edge_set.insert(edge_key(a, b));
        }
        let mut adjacency = vec![Vec::new(); n];
        for &(a, b) in &edge_set {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
        }
        ContactNetwork {
            adjacency,
            edge_count: edge_set.len(),
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Neighbor indices of `node`, in ascending order.
    #[must_use]
    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }

    #[must_use]
    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }

    #[must_use]
    pub fn contains_edge(&self, a: usize, b: usize) -> bool {
        a != b && self.adjacency[a].binary_search(&b).is_ok()
    }
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn pure_lattice_without_rewiring() {
        let mut rng = StdRng::seed_from_u64(1);
        let network = ContactNetwork::small_world(10, 4, 0.0, &mut rng);

        assert_eq!(network.node_count(), 10);
        assert_eq!(network.edge_count(), 20);
        for node in 0..10 {
            assert_eq!(network.degree(node), 4);
        }
        // Node 0 links to its two nearest neighbors on each side of the ring.
        assert_eq!(network.neighbors(0), &[1, 2, 8, 9]);
    }

    #[test]
    fn rewiring_preserves_edge_count_and_simplicity() {
        let mut rng = StdRng::seed_from_u64(7);
        let network = ContactNetwork::small_world(50, 6, 1.0, &mut rng);

        assert_eq!(network.edge_count(), 150);
        for node in 0..50 {
            // No self-loops, no duplicates.
            assert!(!network.neighbors(node).contains(&node));
            let mut deduped = network.neighbors(node).to_vec();
            deduped.dedup();
            assert_eq!(deduped.len(), network.degree(node));
        }
    }

    #[test]
    fn adjacency_is_symmetric() {
        let mut rng = StdRng::seed_from_u64(3);
        let network = ContactNetwork::small_world(30, 4, 0.5, &mut rng);

        for a in 0..30 {
            for &b in network.neighbors(a) {
                assert!(network.neighbors(b).contains(&a));
                assert!(network.contains_edge(a, b));
                assert!(network.contains_edge(b, a));
            }
        }
    }

    #[test]
    fn same_seed_same_graph() {
        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        let a = ContactNetwork::small_world(40, 4, 0.3, &mut rng_a);
        let b = ContactNetwork::small_world(40, 4, 0.3, &mut rng_b);

        for node in 0..40 {
            assert_eq!(a.neighbors(node), b.neighbors(node));
        }
    }

    #[test]
    fn odd_degree_rounds_down() {
        let mut rng = StdRng::seed_from_u64(5);
        let network = ContactNetwork::small_world(10, 5, 0.0, &mut rng);
        for node in 0..10 {
            assert_eq!(network.degree(node), 4);
        }
    }
}
