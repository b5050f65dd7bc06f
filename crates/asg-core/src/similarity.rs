//! Pairwise node similarity scoring for clone and near-duplicate detection.
//!
//! Similarity is defined per node-kind pair: `0.0` across kinds, otherwise
//! a per-attribute combination. String attributes compare by normalized
//! edit distance; any string pair scoring below the configured threshold
//! zeroes the whole result. Enum attributes contribute equality. The
//! combined score is rescaled into `[minimum, 1]`, so two same-kind nodes
//! never score below the floor unless a threshold fired. Kinds with no
//! comparable attributes score `1.0` on kind equality alone.

use crate::error::AsgError;
use crate::factory::Factory;
use crate::id::NodeId;

/// Tuning knobs for [`similarity`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityConfig {
    /// Floor of the rescaled score for same-kind pairs.
    pub minimum: f64,
    /// A string attribute pair scoring below this forces the result to 0.
    pub string_threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        SimilarityConfig {
            minimum: 0.1,
            string_threshold: 0.25,
        }
    }
}

/// Scores how alike two nodes are, in `[0, 1]`. Symmetric;
/// `similarity(a, a)` is `1.0`. Never fails on content, only on unknown
/// ids.
pub fn similarity(
    factory: &Factory,
    a: NodeId,
    b: NodeId,
    config: &SimilarityConfig,
) -> Result<f64, AsgError> {
    let node_a = factory.get(a)?;
    let node_b = factory.get(b)?;
    if node_a.kind() != node_b.kind() {
        return Ok(0.0);
    }

    let strings_a = node_a.data.string_attrs();
    let strings_b = node_b.data.string_attrs();
    let enums_a = node_a.data.enum_attrs();
    let enums_b = node_b.data.enum_attrs();

    let attr_count = strings_a.len() + enums_a.len();
    if attr_count == 0 {
        return Ok(1.0);
    }

    let mut total = 0.0;
    for ((_, key_a), (_, key_b)) in strings_a.iter().zip(strings_b.iter()) {
        let value_a = match key_a {
            Some(key) => factory.strings().lookup(*key)?,
            None => "",
        };
        let value_b = match key_b {
            Some(key) => factory.strings().lookup(*key)?,
            None => "",
        };
        let score = string_similarity(value_a, value_b);
        if score < config.string_threshold {
            return Ok(0.0);
        }
        total += score;
    }
    for ((_, tag_a), (_, tag_b)) in enums_a.iter().zip(enums_b.iter()) {
        if tag_a == tag_b {
            total += 1.0;
        }
    }

    // Rescale the mean attribute score into [minimum, 1].
    Ok(config.minimum + (1.0 - config.minimum) * (total / attr_count as f64))
}

/// `1 - edits / max(len)`, on characters. Two empty strings are identical.
fn string_similarity(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let longest = len_a.max(len_b);
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / longest as f64
}

/// Levenshtein distance, two-row dynamic programming over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b_chars.len()]
}
