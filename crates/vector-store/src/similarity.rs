//! Vector norm and cosine similarity.
//!
//! Vectors of different lengths are compared over their common leading prefix. A zero norm
//! makes the similarity undefined and yields `NaN`.

/// Euclidean norm, `0.0` for an empty vector.
#[must_use]
pub fn normalize(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity over the common prefix of `a` and `b`.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);
    normalized_cosine_similarity(a, normalize(a), b, normalize(b))
}

/// Cosine similarity with precomputed norms.
#[must_use]
pub fn normalized_cosine_similarity(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return f32::NAN;
    }
    dot_product(a, b) / (norm_a * norm_b)
}

/// Descending order with `NaN` after every number.
pub fn rank_descending(a: f32, b: f32) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}
