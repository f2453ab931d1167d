use serde::{Deserialize, Serialize};

pub type TermId = u32;

/// Sparse vector with entries sorted by dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: Vec<(TermId, f32)>,
}

impl SparseVector {
    /// Build from unsorted entries; zero weights are dropped.
    pub fn from_entries(mut entries: Vec<(TermId, f32)>) -> Self {
        entries.retain(|(_, w)| *w != 0.0);
        entries.sort_by_key(|(t, _)| *t);
        Self { entries }
    }

    pub fn entries(&self) -> &[(TermId, f32)] { &self.entries }
    pub fn nnz(&self) -> usize { self.entries.len() }
    pub fn is_zero(&self) -> bool { self.entries.is_empty() }

    pub fn norm(&self) -> f32 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt()
    }

    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for (_, w) in self.entries.iter_mut() { *w /= norm; }
        }
    }

    /// Merge-join dot product over the sorted entries.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (a, b) = (&self.entries, &other.entries);
        let (mut i, mut j, mut sum) = (0, 0, 0.0f32);
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a[i].1 * b[j].1;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// A point in whichever space a similarity backend produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedding {
    Sparse(SparseVector),
    Dense(Vec<f32>),
}

impl Embedding {
    pub fn is_zero(&self) -> bool {
        match self {
            Embedding::Sparse(v) => v.is_zero(),
            Embedding::Dense(v) => v.iter().all(|x| *x == 0.0),
        }
    }

    /// Cosine similarity. Zero vectors and mismatched kinds score 0.
    pub fn cosine(&self, other: &Embedding) -> f32 {
        match (self, other) {
            (Embedding::Sparse(a), Embedding::Sparse(b)) => {
                let denom = a.norm() * b.norm();
                if denom == 0.0 { 0.0 } else { a.dot(b) / denom }
            }
            (Embedding::Dense(a), Embedding::Dense(b)) => dense_cosine(a, b),
            _ => 0.0,
        }
    }
}

pub(crate) fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-8 {
        for x in v.iter_mut() { *x /= norm; }
    }
}

fn dense_cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() { return 0.0; }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_dot_merges_by_dimension() {
        let a = SparseVector::from_entries(vec![(4, 1.0), (1, 2.0), (9, 0.0)]);
        let b = SparseVector::from_entries(vec![(1, 3.0), (7, 5.0), (4, 0.5)]);
        assert_eq!(a.nnz(), 2);
        assert!((a.dot(&b) - 6.5).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        let z = Embedding::Sparse(SparseVector::default());
        let v = Embedding::Sparse(SparseVector::from_entries(vec![(0, 1.0)]));
        assert_eq!(z.cosine(&v), 0.0);
        assert!((v.cosine(&v) - 1.0).abs() < 1e-6);
    }
}
