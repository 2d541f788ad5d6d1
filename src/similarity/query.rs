use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::{ident::PartitionPrefix, store::PairStore};

/// A neighbor of the query target.
///
/// Serializes as `[identifier, score]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor(pub String, pub f64);

impl Neighbor {
    pub fn ident(&self) -> &str {
        &self.0
    }

    pub fn score(&self) -> f64 {
        self.1
    }
}

/// All neighbors of `target` in `store`, best score first.
///
/// Both sides of every pair are qualified with `prefix` before comparing, so
/// the target may be given bare or qualified and may appear on either side of
/// a pair. Equal scores are ordered by identifier. A pair whose both sides
/// resolve to the target is ignored. An unknown target has no neighbors.
pub fn neighbors(store: &PairStore, target: &str, prefix: &PartitionPrefix) -> Vec<Neighbor> {
    let target = prefix.qualify(target);

    let mut found: Vec<Neighbor> = store
        .records()
        .iter()
        .filter_map(|record| {
            let a = prefix.qualify(&record.a);
            let b = prefix.qualify(&record.b);
            match (a == target, b == target) {
                (true, true) => {
                    log::warn!("ignoring self pair {}|{}", record.a, record.b);
                    None
                }
                (true, false) => Some(Neighbor(b, record.score)),
                (false, true) => Some(Neighbor(a, record.score)),
                (false, false) => None,
            }
        })
        .collect();

    found.sort_by(by_score_desc);

    log::debug!("found {} neighbors for {}", found.len(), prefix.bare(&target));

    found
}

fn by_score_desc(x: &Neighbor, y: &Neighbor) -> Ordering {
    y.score()
        .total_cmp(&x.score())
        .then_with(|| x.ident().cmp(y.ident()))
}
