//! Factor reconstructor (spec §4.I): turns a null-space vector into a
//! nontrivial divisor of `n` via the classical `x² ≡ y² (mod n)` congruence.

use crate::modular::integer_sqrt;
use crate::relations::Relation;
use rug::Integer;

/// Attempts to extract a nontrivial factor of `n` from one null-space
/// vector `v` (indices into `relations`). Returns `None` if this
/// particular vector yields only the trivial factors `1` or `n` (spec
/// §4.I: "Else continue" — try the next vector).
pub fn try_extract_factor(relations: &[Relation], vector: &[u32], n: &Integer) -> Option<Integer> {
    let mut x_prod = Integer::from(1);
    let mut y_prod_sq = Integer::from(1);

    for &idx in vector {
        let rel = &relations[idx as usize];
        x_prod = (x_prod * &rel.x).rem_euc(n.clone());
        y_prod_sq *= &rel.q_abs;
    }

    let y = integer_sqrt(&y_prod_sq).rem_euc(n.clone());

    let candidate_minus = Integer::from(&x_prod - &y).rem_euc(n.clone());
    if let Some(d) = nontrivial_gcd(&candidate_minus, n) {
        return Some(d);
    }

    let candidate_plus = Integer::from(&x_prod + &y).rem_euc(n.clone());
    nontrivial_gcd(&candidate_plus, n)
}

fn nontrivial_gcd(a: &Integer, n: &Integer) -> Option<Integer> {
    let d = a.clone().gcd(n);
    if d > 1 && d < *n {
        Some(d)
    } else {
        None
    }
}

/// Drives [`try_extract_factor`] across a null-space vector stream until
/// one yields a nontrivial factor, or the stream is exhausted (spec §4.I:
/// "signal insufficient relations so the sieve may resume").
pub fn find_factor_from_vectors<I>(relations: &[Relation], vectors: I, n: &Integer) -> Option<Integer>
where
    I: IntoIterator<Item = Vec<u32>>,
{
    for vector in vectors {
        if let Some(d) = try_extract_factor(relations, &vector, n) {
            return Some(d);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(x: i64, q_abs: i64, sign: bool, exps: &[u8]) -> Relation {
        Relation {
            x: Integer::from(x),
            sign,
            exponents: exps.to_vec(),
            cofactor: 1,
            q_abs: Integer::from(q_abs),
        }
    }

    #[test]
    fn extracts_factor_from_a_textbook_congruence() {
        // n = 35 = 5*7. Choose relations whose x-product squared and
        // Q-product are both perfect squares summing to a nontrivial gcd:
        // x=6 (6^2=36=35+1, Q=1), x=13 (13^2=169=35*4+29... ) — instead use
        // a hand-built trivial congruence: x_prod=6, y=1 -> 6-1=5, gcd(5,35)=5.
        let relations = vec![rel(6, 1, false, &[0])];
        let n = Integer::from(35);
        let got = try_extract_factor(&relations, &[0], &n);
        assert_eq!(got, Some(Integer::from(5)));
    }

    #[test]
    fn returns_none_for_trivial_congruence() {
        // x_prod=1, y=1 -> gcd(0,n) and gcd(2,n) both trivial for n=35.
        let relations = vec![rel(1, 1, false, &[0])];
        let n = Integer::from(35);
        assert_eq!(try_extract_factor(&relations, &[0], &n), None);
    }

    #[test]
    fn find_factor_from_vectors_stops_at_first_success() {
        let relations = vec![rel(1, 1, false, &[0]), rel(6, 1, false, &[0])];
        let n = Integer::from(35);
        let vectors = vec![vec![0u32], vec![1u32]];
        let got = find_factor_from_vectors(&relations, vectors, &n);
        assert_eq!(got, Some(Integer::from(5)));
    }

    #[test]
    fn find_factor_from_vectors_exhausts_without_success() {
        let relations = vec![rel(1, 1, false, &[0])];
        let n = Integer::from(35);
        let vectors = vec![vec![0u32]];
        assert_eq!(find_factor_from_vectors(&relations, vectors, &n), None);
    }
}
