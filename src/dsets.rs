/*!
Union-find over dense integer element IDs.

Used by the mapping layer to coalesce equivalence classes of signals and
shareable resources. Union-by-rank with full path compression; amortized
near-constant time per operation.

Caution on `union`:
- The arguments are element IDs bounds-checked against the element count,
  and the nodes stored at those indices are linked directly; there is no
  internal re-rooting. Callers are expected to pass the results of prior
  `find_set` calls; handing in non-root elements silently corrupts the
  forest and the set count. This permissive contract is deliberate and
  matches how the mapping layer allocates and merges classes.

This module intentionally avoids dependencies on the rest of the crate so
the structure stays portable.
*/

use crate::error::ModelError;

#[derive(Clone, Debug)]
struct Node {
    parent: Option<usize>,
    rank: u32,
}

/// A forest of disjoint sets over IDs `0..element_count`.
#[derive(Clone, Debug)]
pub struct DisjointSets {
    nodes: Vec<Node>,
    sets: usize,
}

impl DisjointSets {
    /// `n` singleton sets with IDs `0..n`.
    pub fn new(n: usize) -> DisjointSets {
        let mut ds = DisjointSets {
            nodes: Vec::new(),
            sets: 0,
        };
        ds.add_elements(n);
        ds
    }

    /// Append `k` new singleton sets; the new IDs are contiguous starting
    /// at the previous element count.
    ///
    /// The original interface took a signed count and rejected negatives
    /// with an out-of-range error; that state is unrepresentable here.
    pub fn add_elements(&mut self, k: usize) {
        self.nodes.reserve(k);
        for _ in 0..k {
            self.nodes.push(Node {
                parent: None,
                rank: 0,
            });
        }
        self.sets += k;
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn set_count(&self) -> usize {
        self.sets
    }

    fn check_id(&self, what: &'static str, id: usize) -> Result<(), ModelError> {
        if id >= self.nodes.len() {
            return Err(ModelError::OutOfRange {
                what,
                value: id as u128,
                limit: self.nodes.len() as u128,
            });
        }
        Ok(())
    }

    /// Current root representative for `id`.
    ///
    /// Logically read-only, but compresses the path it walks: afterwards
    /// every visited node points directly at the root.
    pub fn find_set(&mut self, id: usize) -> Result<usize, ModelError> {
        self.check_id("element id", id)?;
        let mut root = id;
        while let Some(p) = self.nodes[root].parent {
            root = p;
        }
        let mut cur = id;
        while cur != root {
            let p = self.nodes[cur].parent.take();
            self.nodes[cur].parent = Some(root);
            match p {
                Some(next) => cur = next,
                None => break,
            }
        }
        Ok(root)
    }

    /// Merge the sets rooted at `a` and `b` by rank. `union(x, x)` is a
    /// no-op. See the module caution: `a` and `b` are taken as roots on
    /// trust, not re-rooted.
    pub fn union(&mut self, a: usize, b: usize) -> Result<(), ModelError> {
        self.check_id("element id", a)?;
        self.check_id("element id", b)?;
        if a == b {
            return Ok(());
        }
        let (winner, loser) = if self.nodes[a].rank >= self.nodes[b].rank {
            (a, b)
        } else {
            (b, a)
        };
        self.nodes[loser].parent = Some(winner);
        if self.nodes[winner].rank == self.nodes[loser].rank {
            self.nodes[winner].rank += 1;
        }
        self.sets -= 1;
        Ok(())
    }
}
