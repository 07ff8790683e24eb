use ndarray::{Array1, ArrayView1};

pub(crate) fn average_vectors(vectors: &[ArrayView1<f32>], embedding_size: usize) -> Array1<f32> {
    if vectors.is_empty() {
        return Array1::zeros(embedding_size);
    }
    let sum = vectors.iter().fold(Array1::zeros(embedding_size), |acc, v| acc + v);
    sum / vectors.len() as f32
}

pub(crate) fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp = logits.mapv(|x| (x - max).exp());
    let total = exp.sum();
    exp / total
}

/// Index of the largest score. Ties resolve to the lowest index and NaN never wins.
pub(crate) fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            None if !score.is_nan() => best = Some((i, score)),
            Some((_, top)) if score > top => best = Some((i, score)),
            _ => {}
        }
    }
    best.map(|(i, _)| i)
}
