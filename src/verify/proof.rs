//! Merkle membership proofs

use crate::model::Hash;

/// Checks sibling-hash proofs against a root
#[derive(Clone, Copy, Debug, Default)]
pub struct ProofVerifier;

impl ProofVerifier {
    /// Fold `claim` with each sibling in order
    pub fn compute_root(claim: &Hash, proof: &[Hash]) -> Hash {
        proof
            .iter()
            .fold(*claim, |acc, sibling| Hash::combine(&acc, sibling))
    }

    /// Whether `proof` leads from `claim` to `root`.
    ///
    /// An absent root or a zero claim never verifies.
    pub fn verify(root: Option<Hash>, claim: &Hash, proof: &[Hash]) -> bool {
        match root {
            Some(root) if !root.is_zero() && !claim.is_zero() => {
                Self::compute_root(claim, proof) == root
            }
            _ => false,
        }
    }
}
