//! Groups of mutually intersecting obstacles

/// Disjoint-set forest over obstacle indices
#[derive(Debug, Clone)]
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut index: usize) -> usize {
        while self.parent[index] != index {
            self.parent[index] = self.parent[self.parent[index]];
            index = self.parent[index];
        }
        index
    }

    fn union(&mut self, a: usize, b: usize) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a == root_b {
            return;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
    }
}

/// Connected components of the intersection graph with at least two members.
///
/// Members are sorted and clusters are ordered by their smallest member.
pub fn intersection_clusters(len: usize, intersecting_pairs: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut set = DisjointSet::new(len);
    for &(a, b) in intersecting_pairs {
        if a < len && b < len {
            set.union(a, b);
        }
    }

    let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); len];
    for index in 0..len {
        let root = set.find(index);
        by_root[root].push(index);
    }

    let mut clusters: Vec<Vec<usize>> = by_root.into_iter().filter(|members| members.len() > 1).collect();
    clusters.sort_by_key(|members| members[0]);
    clusters
}
