//! Sparse bit matrix + structured Gaussian elimination (spec §4.H).
//!
//! Rows are indexed `0..=factor_base_len` (row 0 is the sign row); columns
//! are indexed by relation. The filter and merge passes shrink the matrix
//! by repeatedly folding light rows away; every fold is recorded as a
//! "provenance" set — the sorted list of *original* relation indices whose
//! XOR currently equals a working column — so that a null-space vector
//! found in the small dense residual expands back to a vector over the
//! original columns without a separate lifting pass (spec §4.H step 4):
//! provenance is just carried forward through every XOR, sparse or dense.
//!
//! Grounded on the teacher's `BitSieve` (`sieve.rs`) for the packed-`u64`
//! word convention used by the dense residual solve.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::relations::Relation;

/// Symmetric difference of two sorted, deduplicated index lists — the XOR
/// operation both the sparse working columns and their provenance sets use.
fn xor_sorted(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

#[derive(Clone, Debug)]
struct WorkingColumn {
    /// Sorted active-row indices currently set.
    rows: Vec<u32>,
    /// Sorted original relation indices whose XOR equals this column.
    provenance: Vec<u32>,
}

/// The sparse exponent-parity matrix (spec §3), with filter/merge state.
pub struct SparseMatrix {
    num_rows: usize,
    columns: Vec<Option<WorkingColumn>>,
    row_members: Vec<Vec<usize>>,
}

impl SparseMatrix {
    /// Build the matrix from a relation set: row 0 is the sign bit, rows
    /// `1..=factor_base_len` track the parity of each factor-base prime's
    /// exponent.
    pub fn build(relations: &[Relation], factor_base_len: usize) -> Self {
        let num_rows = factor_base_len + 1;
        let mut columns = Vec::with_capacity(relations.len());
        let mut row_members = vec![Vec::new(); num_rows];

        for (j, rel) in relations.iter().enumerate() {
            let mut rows = Vec::new();
            if rel.sign {
                rows.push(0);
            }
            for (i, &e) in rel.exponents.iter().enumerate() {
                if e & 1 == 1 {
                    rows.push((i + 1) as u32);
                }
            }
            for &r in &rows {
                row_members[r as usize].push(j);
            }
            columns.push(Some(WorkingColumn {
                rows,
                provenance: vec![j as u32],
            }));
        }

        SparseMatrix {
            num_rows,
            columns,
            row_members,
        }
    }

    fn remove_column_everywhere(&mut self, col_id: usize) -> WorkingColumn {
        let col = self.columns[col_id].take().expect("column already removed");
        for &r in &col.rows {
            let members = &mut self.row_members[r as usize];
            if let Some(pos) = members.iter().position(|&c| c == col_id) {
                members.swap_remove(pos);
            }
        }
        col
    }

    /// Repeatedly deletes any row with exactly one set bit, along with the
    /// column that bit belongs to (spec §4.H step 1).
    pub fn filter_pass(&mut self) {
        let mut queue: std::collections::VecDeque<usize> = (0..self.num_rows)
            .filter(|&r| self.row_members[r].len() == 1)
            .collect();

        while let Some(r) = queue.pop_front() {
            if self.row_members[r].len() != 1 {
                continue; // stale: already resolved by an earlier iteration
            }
            let col_id = self.row_members[r][0];
            let col = self.remove_column_everywhere(col_id);
            for &row in &col.rows {
                if row as usize != r && self.row_members[row as usize].len() == 1 {
                    queue.push_back(row as usize);
                }
            }
        }
    }

    /// While any row has at most `merge_limit` set bits, folds the lightest
    /// column touching the globally-lightest such row into every other
    /// column on that row, then deletes the row and the folded-in column
    /// (spec §4.H step 2).
    pub fn merge_pass(&mut self, merge_limit: usize) {
        loop {
            let mut best: Option<(usize, usize)> = None; // (row, weight)
            for (r, members) in self.row_members.iter().enumerate() {
                let w = members.len();
                if w == 0 || w > merge_limit {
                    continue;
                }
                if best.map(|(_, bw)| w < bw).unwrap_or(true) {
                    best = Some((r, w));
                }
            }
            let Some((r, _)) = best else { break };

            let members = self.row_members[r].clone();
            let pivot_id = members
                .iter()
                .copied()
                .min_by_key(|&c| self.columns[c].as_ref().unwrap().rows.len())
                .expect("row with nonzero weight has at least one member column");

            let pivot = self.columns[pivot_id].clone().unwrap();

            for &other_id in &members {
                if other_id == pivot_id {
                    continue;
                }
                self.fold_into(other_id, &pivot);
            }

            self.remove_column_everywhere(pivot_id);
        }
    }

    /// `target := target XOR pivot`, updating `row_members` incrementally
    /// for every row the pivot touches.
    fn fold_into(&mut self, target_id: usize, pivot: &WorkingColumn) {
        let target = self.columns[target_id].as_ref().unwrap();
        let old_rows = target.rows.clone();
        let new_rows = xor_sorted(&old_rows, &pivot.rows);
        let new_provenance = xor_sorted(&target.provenance, &pivot.provenance);

        for &r in &pivot.rows {
            let had = old_rows.binary_search(&r).is_ok();
            let has = new_rows.binary_search(&r).is_ok();
            let members = &mut self.row_members[r as usize];
            match (had, has) {
                (true, false) => {
                    if let Some(pos) = members.iter().position(|&c| c == target_id) {
                        members.swap_remove(pos);
                    }
                }
                (false, true) => members.push(target_id),
                _ => {}
            }
        }

        self.columns[target_id] = Some(WorkingColumn {
            rows: new_rows,
            provenance: new_provenance,
        });
    }

    /// Active (non-eliminated) row indices remaining after filter/merge.
    fn active_rows(&self) -> Vec<u32> {
        (0..self.num_rows)
            .filter(|&r| !self.row_members[r].is_empty())
            .map(|r| r as u32)
            .collect()
    }

    fn surviving_columns(&self) -> impl Iterator<Item = &WorkingColumn> {
        self.columns.iter().filter_map(|c| c.as_ref())
    }
}

#[derive(Clone)]
struct DenseColumn {
    words: Vec<u64>,
    provenance: Vec<u32>,
}

fn highest_set_bit(words: &[u64]) -> Option<usize> {
    for (i, &w) in words.iter().enumerate().rev() {
        if w != 0 {
            return Some(i * 64 + (63 - w.leading_zeros() as usize));
        }
    }
    None
}

fn xor_words(a: &mut [u64], b: &[u64]) {
    for (x, y) in a.iter_mut().zip(b) {
        *x ^= y;
    }
}

/// Dense GF(2) Gaussian elimination over the residual matrix (spec §4.H
/// step 3): finds every linear dependency among the surviving columns,
/// i.e. every null-space vector. Deterministic given a fixed column order
/// (spec §4.F "ordering... is deterministic given the same matrix").
fn dense_null_space(matrix: &SparseMatrix) -> Vec<Vec<u32>> {
    let active_rows = matrix.active_rows();
    let row_index: HashMap<u32, usize> = active_rows
        .iter()
        .enumerate()
        .map(|(dense_i, &r)| (r, dense_i))
        .collect();
    let word_count = active_rows.len().div_ceil(64).max(1);

    let mut columns: Vec<DenseColumn> = matrix
        .surviving_columns()
        .map(|c| {
            let mut words = vec![0u64; word_count];
            for &r in &c.rows {
                let dense_i = row_index[&r];
                words[dense_i / 64] |= 1u64 << (dense_i % 64);
            }
            DenseColumn {
                words,
                provenance: c.provenance.clone(),
            }
        })
        .collect();

    let mut pivots: HashMap<usize, usize> = HashMap::new();
    let mut null_vectors = Vec::new();

    for idx in 0..columns.len() {
        loop {
            match highest_set_bit(&columns[idx].words) {
                None => {
                    if !columns[idx].provenance.is_empty() {
                        null_vectors.push(columns[idx].provenance.clone());
                    }
                    break;
                }
                Some(bit) => {
                    if let Some(&pivot_idx) = pivots.get(&bit) {
                        let pivot_words = columns[pivot_idx].words.clone();
                        let pivot_prov = columns[pivot_idx].provenance.clone();
                        xor_words(&mut columns[idx].words, &pivot_words);
                        columns[idx].provenance =
                            xor_sorted(&columns[idx].provenance, &pivot_prov);
                    } else {
                        pivots.insert(bit, idx);
                        break;
                    }
                }
            }
        }
    }

    null_vectors
}

/// A lazy sequence of null-space vectors (spec §4.H output): each vector is
/// a sorted set of indices into the original relation slice whose XOR (of
/// the exponent-parity matrix's columns) is the zero row. The full set is
/// computed eagerly at construction (the dense residual is typically small
/// after filter/merge), and served out lazily to match the spec's
/// iteration contract.
pub struct NullSpaceVectors {
    vectors: std::vec::IntoIter<Vec<u32>>,
}

impl NullSpaceVectors {
    pub fn compute(relations: &[Relation], factor_base_len: usize, merge_limit: usize) -> Self {
        let mut matrix = SparseMatrix::build(relations, factor_base_len);
        matrix.filter_pass();
        matrix.merge_pass(merge_limit);
        let vectors = dense_null_space(&matrix);
        NullSpaceVectors {
            vectors: vectors.into_iter(),
        }
    }
}

impl Iterator for NullSpaceVectors {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Vec<u32>> {
        self.vectors.next()
    }
}
