//! Relation store and partial-relation graph (spec §4.G).
//!
//! The union-find-backed cycle detector is grounded on the teacher's
//! preference for arena-style ID-keyed structures over pointer graphs (spec
//! §9 "Back-references in the relation graph": "an arena of edge records
//! keyed by monotonic integer ID, with `(parent, rank)` arrays"). One graph
//! implementation covers both the baseline one-large-prime case and the
//! opt-in two-large-prime extension (SPEC_FULL.md's resolution of the
//! two-large-prime Open Question): a one-large-prime partial is just an
//! edge from its cofactor to the sentinel vertex `1`; a two-large-prime
//! partial is an edge between its two cofactors. The union-find doesn't
//! need to know which case it's looking at.

use rug::Integer;
use std::collections::HashMap;

/// A sieve relation (spec §3): `|Q(x)| = cofactor * prod P[i]^exponents[i]`.
/// `q_abs` and `x` are tracked as raw (unreduced) products so that merged
/// relations compose correctly — spec §4.I computes `y_prod_sq` as the
/// literal product of the constituent `Q(x)` magnitudes.
#[derive(Debug, Clone)]
pub struct Relation {
    /// Sieve abscissa, or product of abscissas for a merged relation
    /// (reduced mod `n` as it's built up).
    pub x: Integer,
    /// `true` iff the (combined) value is negative.
    pub sign: bool,
    /// Parity (0/1) of the exponent of `P[i]` in `|Q(x)|`, one entry per
    /// factor-base prime.
    pub exponents: Vec<u8>,
    /// `1` for a genuinely full relation.
    pub cofactor: u64,
    /// `|Q(x)|` (or the product of constituent `|Q(x_i)|` for a merged
    /// relation) — the value spec §4.I multiplies across a null-space
    /// vector before taking `integer_sqrt`.
    pub q_abs: Integer,
}

impl Relation {
    fn identity(factor_base_len: usize) -> Relation {
        Relation {
            x: Integer::from(1),
            sign: false,
            exponents: vec![0u8; factor_base_len],
            cofactor: 1,
            q_abs: Integer::from(1),
        }
    }

    fn combine(a: &Relation, b: &Relation, n: &Integer) -> Relation {
        let mut exponents = vec![0u8; a.exponents.len().max(b.exponents.len())];
        for (i, e) in exponents.iter_mut().enumerate() {
            let av = a.exponents.get(i).copied().unwrap_or(0);
            let bv = b.exponents.get(i).copied().unwrap_or(0);
            *e = av ^ bv;
        }
        Relation {
            x: (a.x.clone() * &b.x).rem_euc(n.clone()),
            sign: a.sign ^ b.sign,
            exponents,
            cofactor: 1,
            q_abs: a.q_abs.clone() * &b.q_abs,
        }
    }
}

/// Union-find over large-prime cofactors (spec §4.G), including the
/// sentinel vertex representing "no large prime" (cofactor `1`).
struct PartialGraph {
    vertex_of: HashMap<u64, usize>,
    parent: Vec<usize>,
    rank: Vec<u32>,
    /// Relation accumulated from this vertex to its immediate `parent`
    /// entry; `None` at a tree root.
    to_parent: Vec<Option<Relation>>,
    factor_base_len: usize,
    n: Integer,
}

impl PartialGraph {
    fn new(factor_base_len: usize, n: Integer) -> Self {
        let mut g = PartialGraph {
            vertex_of: HashMap::new(),
            parent: Vec::new(),
            rank: Vec::new(),
            to_parent: Vec::new(),
            factor_base_len,
            n,
        };
        g.vertex(1);
        g
    }

    fn vertex(&mut self, cofactor: u64) -> usize {
        if let Some(&id) = self.vertex_of.get(&cofactor) {
            return id;
        }
        let id = self.parent.len();
        self.parent.push(id);
        self.rank.push(0);
        self.to_parent.push(None);
        self.vertex_of.insert(cofactor, id);
        id
    }

    /// Returns `(root, relation accumulated from v to root)`.
    fn find(&mut self, v: usize) -> (usize, Relation) {
        if self.parent[v] == v {
            return (v, Relation::identity(self.factor_base_len));
        }
        let parent = self.parent[v];
        let (root, parent_to_root) = self.find(parent);
        let v_to_parent = self
            .to_parent
            .get(v)
            .cloned()
            .flatten()
            .expect("non-root vertex must have a to_parent edge");
        let v_to_root = Relation::combine(&v_to_parent, &parent_to_root, &self.n);
        self.parent[v] = root;
        self.to_parent[v] = Some(v_to_root.clone());
        (root, v_to_root)
    }

    /// Insert an edge between `cofactor_a` and `cofactor_b` carrying
    /// `relation`. Returns `Some(full_relation)` if this edge closed a
    /// cycle (spec §4.G step "closes a cycle").
    fn insert_edge(
        &mut self,
        cofactor_a: u64,
        cofactor_b: u64,
        relation: Relation,
    ) -> Option<Relation> {
        let va = self.vertex(cofactor_a);
        let vb = self.vertex(cofactor_b);
        let (ra, accum_a) = self.find(va);
        let (rb, accum_b) = self.find(vb);

        let combined = Relation::combine(&Relation::combine(&accum_a, &accum_b, &self.n), &relation, &self.n);

        if ra == rb {
            return Some(combined);
        }

        // Union by rank: attach the lower-rank root under the higher-rank
        // one, recording `combined` as the new child root's edge weight.
        if self.rank[ra] < self.rank[rb] {
            self.parent[ra] = rb;
            self.to_parent[ra] = Some(combined);
        } else if self.rank[ra] > self.rank[rb] {
            self.parent[rb] = ra;
            self.to_parent[rb] = Some(combined);
        } else {
            self.parent[rb] = ra;
            self.to_parent[rb] = Some(combined);
            self.rank[ra] += 1;
        }
        None
    }
}

/// Accumulates full and partial relations for one [`crate::find_divisor`]
/// run (spec §3 "Lifecycle", §4.G).
pub struct RelationStore {
    full: Vec<Relation>,
    graph: PartialGraph,
    seen_x: std::collections::HashSet<String>,
}

impl RelationStore {
    pub fn new(factor_base_len: usize, n: Integer) -> Self {
        RelationStore {
            full: Vec::new(),
            graph: PartialGraph::new(factor_base_len, n),
            seen_x: std::collections::HashSet::new(),
        }
    }

    pub fn full_count(&self) -> usize {
        self.full.len()
    }

    pub fn full_relations(&self) -> &[Relation] {
        &self.full
    }

    /// `true` once `full_count >= factor_base_len + surplus` (spec §4.G
    /// "enough").
    pub fn is_enough(&self, factor_base_len: usize, surplus: usize) -> bool {
        self.full.len() >= factor_base_len + surplus
    }

    /// Deduplicates on `x` equivalence, per spec §4.F "the store
    /// deduplicates".
    fn dedup_key(x: &Integer) -> String {
        x.to_string()
    }

    /// Insert a full relation (`cofactor == 1`) directly.
    pub fn insert_full(&mut self, relation: Relation) -> bool {
        debug_assert_eq!(relation.cofactor, 1);
        let key = Self::dedup_key(&relation.x);
        if !self.seen_x.insert(key) {
            return false;
        }
        self.full.push(relation);
        true
    }

    /// Insert a one-large-prime partial (`cofactor_b` defaults to the
    /// sentinel `1`) or, when the caller has split a cofactor into two
    /// primes, a two-large-prime partial. Returns `true` if this insertion
    /// produced (and stored) a new full relation.
    pub fn insert_partial(&mut self, relation: Relation, cofactor_a: u64, cofactor_b: u64) -> bool {
        if let Some(full) = self.graph.insert_edge(cofactor_a, cofactor_b, relation) {
            let key = Self::dedup_key(&full.x);
            if self.seen_x.insert(key) {
                self.full.push(full);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(x: i64, exps: &[u8], cofactor: u64, q_abs: i64) -> Relation {
        Relation {
            x: Integer::from(x),
            sign: false,
            exponents: exps.to_vec(),
            cofactor,
            q_abs: Integer::from(q_abs),
        }
    }

    #[test]
    fn full_relation_dedup_by_x() {
        let mut store = RelationStore::new(3, Integer::from(10_000));
        assert!(store.insert_full(rel(5, &[1, 0, 0], 1, 7)));
        assert!(!store.insert_full(rel(5, &[1, 0, 0], 1, 7)));
        assert_eq!(store.full_count(), 1);
    }

    #[test]
    fn single_partial_produces_no_full_relation_alone() {
        let mut store = RelationStore::new(2, Integer::from(10_000));
        let produced = store.insert_partial(rel(3, &[1, 0], 0, 11), 101, 1);
        assert!(!produced);
        assert_eq!(store.full_count(), 0);
    }

    #[test]
    fn two_matching_partials_close_a_cycle() {
        let mut store = RelationStore::new(2, Integer::from(1_000_003));
        assert!(!store.insert_partial(rel(3, &[1, 0], 0, 11), 101, 1));
        let produced = store.insert_partial(rel(7, &[0, 1], 0, 13), 101, 1);
        assert!(produced);
        assert_eq!(store.full_count(), 1);
        let merged = &store.full_relations()[0];
        assert_eq!(merged.exponents, vec![1, 1]);
        assert_eq!(merged.cofactor, 1);
        assert_eq!(merged.q_abs, Integer::from(11 * 13));
    }

    #[test]
    fn two_large_prime_partials_close_a_cycle_through_a_shared_second_prime() {
        // p=101 paired with q=211 in one relation, then q=211 paired with
        // the sentinel in another — closes via the shared vertex 211.
        let mut store = RelationStore::new(1, Integer::from(1_000_003));
        assert!(!store.insert_partial(rel(2, &[1], 0, 5), 101, 211));
        let produced = store.insert_partial(rel(3, &[0], 0, 9), 211, 1);
        assert!(produced);
        assert_eq!(store.full_count(), 1);
    }

    #[test]
    fn is_enough_respects_surplus() {
        let mut store = RelationStore::new(2, Integer::from(10_000));
        store.insert_full(rel(1, &[0, 0], 1, 1));
        store.insert_full(rel(2, &[0, 0], 1, 1));
        assert!(!store.is_enough(2, 1));
        store.insert_full(rel(3, &[0, 0], 1, 1));
        assert!(store.is_enough(2, 1));
    }
}
