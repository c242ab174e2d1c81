//! Adaptive-threshold clustering of chips into perceptually similar groups.

use crate::color::{delta_e, oklab_to_hex};
use crate::sampler::Chip;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A cluster of chips sharing one representative output color. Groups own no
/// pixels; they are a palette-level abstraction, and a group with zero
/// members is valid (it is skipped by grid classification).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub chip_ids: Vec<String>,
    pub rep_hex: String,
    pub rep_lab: [f32; 3],
    /// Sum of the member chips' shares.
    pub share: f32,
}

/// Index-based disjoint-set with path compression and union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let mut a = self.find(a);
        let mut b = self.find(b);
        if a == b {
            return;
        }
        if self.rank[a] < self.rank[b] {
            std::mem::swap(&mut a, &mut b);
        }
        self.parent[b] = a;
        if self.rank[a] == self.rank[b] {
            self.rank[a] += 1;
        }
    }
}

/// Partition chips into clusters and return one group per cluster, sorted by
/// descending aggregate share.
///
/// The merge threshold adapts to the palette: it is `similarity_pct`% of the
/// 95th-percentile pairwise distance. Every pair at or under the threshold is
/// unioned directly, which makes the result single-linkage: two colors can
/// share a group through a chain of below-threshold pairs even when they are
/// not close to each other.
pub fn auto_group(chips: &[Chip], similarity_pct: f32) -> Vec<Group> {
    let n = chips.len();
    if n == 0 {
        return Vec::new();
    }

    let threshold = if n > 1 {
        let mut dists = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                dists.push(delta_e(chips[i].lab, chips[j].lab));
            }
        }
        dists.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let p95 = dists[(0.95 * (dists.len() - 1) as f32).floor() as usize];
        (similarity_pct / 100.0) * p95
    } else {
        0.0
    };

    let mut uf = UnionFind::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if delta_e(chips[i].lab, chips[j].lab) <= threshold {
                uf.union(i, j);
            }
        }
    }

    // Collect clusters in first-seen member order so output is deterministic.
    let mut cluster_of_root: HashMap<usize, usize> = HashMap::new();
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for i in 0..n {
        let root = uf.find(i);
        let slot = *cluster_of_root.entry(root).or_insert_with(|| {
            clusters.push(Vec::new());
            clusters.len() - 1
        });
        clusters[slot].push(i);
    }

    let mut scored: Vec<(Vec<usize>, f32)> = clusters
        .into_iter()
        .map(|members| {
            let share: f32 = members.iter().map(|&i| chips[i].share).sum();
            (members, share)
        })
        .collect();
    // Stable sort keeps cluster-discovery order among equal shares.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .enumerate()
        .map(|(idx, (members, share))| {
            // Representative: count-weighted mean in Lab space.
            let mut weight_sum = 0.0f64;
            let mut acc = [0.0f64; 3];
            for &i in &members {
                let w = chips[i].count as f64;
                weight_sum += w;
                acc[0] += chips[i].lab[0] as f64 * w;
                acc[1] += chips[i].lab[1] as f64 * w;
                acc[2] += chips[i].lab[2] as f64 * w;
            }
            if weight_sum <= 0.0 {
                weight_sum = 1.0;
            }
            let rep_lab = [
                (acc[0] / weight_sum) as f32,
                (acc[1] / weight_sum) as f32,
                (acc[2] / weight_sum) as f32,
            ];
            Group {
                id: format!("g_{}", idx + 1),
                name: format!("Group {}", idx + 1),
                chip_ids: members.iter().map(|&i| chips[i].id.clone()).collect(),
                rep_hex: oklab_to_hex(rep_lab),
                rep_lab,
                share,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{hex_to_oklab, rgb_to_oklab};

    fn chip(id: usize, hex: &str, count: u64, share: f32) -> Chip {
        Chip {
            id: format!("c_{}", id),
            hex: hex.to_string(),
            count,
            share,
            lab: hex_to_oklab(hex).unwrap(),
        }
    }

    #[test]
    fn test_union_find_merges_transitively() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(1, 2);
        uf.union(3, 4);
        assert_eq!(uf.find(0), uf.find(2));
        assert_ne!(uf.find(0), uf.find(3));
    }

    #[test]
    fn test_zero_similarity_keeps_chips_apart() {
        let chips = vec![
            chip(0, "#FF0000", 4, 0.4),
            chip(1, "#00FF00", 3, 0.3),
            chip(2, "#0000FF", 3, 0.3),
        ];
        let groups = auto_group(&chips, 0.0);
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.chip_ids.len() == 1));
    }

    #[test]
    fn test_full_similarity_merges_within_p95_scale() {
        // Two tight red variants and a tight blue pair: at 100% the
        // threshold is the p95 distance, which spans everything here.
        let chips = vec![
            chip(0, "#FF0000", 4, 0.4),
            chip(1, "#FA0000", 2, 0.2),
            chip(2, "#0000FF", 2, 0.2),
            chip(3, "#0000FA", 2, 0.2),
        ];
        let groups = auto_group(&chips, 100.0);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].chip_ids.len(), 4);
    }

    #[test]
    fn test_moderate_similarity_splits_distant_hues() {
        let chips = vec![
            chip(0, "#FF0000", 4, 0.4),
            chip(1, "#FA0505", 2, 0.2),
            chip(2, "#0000FF", 2, 0.2),
            chip(3, "#0505FA", 2, 0.2),
        ];
        let groups = auto_group(&chips, 20.0);
        assert_eq!(groups.len(), 2);
        // Largest aggregate share first, named in output order.
        assert_eq!(groups[0].name, "Group 1");
        assert_eq!(groups[0].chip_ids, vec!["c_0", "c_1"]);
        assert!((groups[0].share - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_singleton_input() {
        let chips = vec![chip(0, "#123456", 10, 1.0)];
        let groups = auto_group(&chips, 50.0);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, "g_1");
        assert_eq!(groups[0].chip_ids, vec!["c_0"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(auto_group(&[], 50.0).is_empty());
    }

    #[test]
    fn test_representative_is_weighted_mean() {
        let a = rgb_to_oklab([255, 0, 0]);
        let b = rgb_to_oklab([250, 0, 0]);
        let chips = vec![
            chip(0, "#FF0000", 3, 0.75),
            chip(1, "#FA0000", 1, 0.25),
        ];
        let groups = auto_group(&chips, 100.0);
        assert_eq!(groups.len(), 1);
        let expect = [
            (a[0] * 3.0 + b[0]) / 4.0,
            (a[1] * 3.0 + b[1]) / 4.0,
            (a[2] * 3.0 + b[2]) / 4.0,
        ];
        for c in 0..3 {
            assert!((groups[0].rep_lab[c] - expect[c]).abs() < 1e-4);
        }
    }
}
