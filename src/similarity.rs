use rayon::prelude::*;
use tracing::warn;

use crate::error::{DedupeError, Result};
use crate::signature::MediaRecord;

/// N signatures of equal length `dim`, stored row-major in one buffer.
#[derive(Debug, Clone)]
pub struct SignatureMatrix {
    rows: usize,
    dim: usize,
    data: Vec<f32>,
}

impl SignatureMatrix {
    pub fn from_rows<'a, I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [f32]>,
    {
        let mut data = Vec::new();
        let mut dim = None;
        let mut count = 0;

        for row in rows {
            match dim {
                None => dim = Some(row.len()),
                Some(d) if d != row.len() => {
                    return Err(DedupeError::InvalidConfig {
                        message: format!(
                            "signature {} has length {}, expected {}",
                            count,
                            row.len(),
                            d
                        ),
                    });
                }
                Some(_) => {}
            }
            data.extend_from_slice(row);
            count += 1;
        }

        Ok(Self {
            rows: count,
            dim: dim.unwrap_or(0),
            data,
        })
    }

    pub fn from_records(records: &[MediaRecord]) -> Result<Self> {
        Self::from_rows(records.iter().map(|r| r.signature.as_slice()))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.dim..(index + 1) * self.dim]
    }
}

/// Scale `row` to unit L2 norm. A zero row has no direction and cannot be compared.
pub fn normalize_row(index: usize, row: &[f32]) -> Result<Vec<f64>> {
    let norm = row
        .iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt();

    if norm == 0.0 {
        return Err(DedupeError::DegenerateSignature { index });
    }

    Ok(row.iter().map(|&v| f64::from(v) / norm).collect())
}

/// Dense pairwise cosine distances.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    size: usize,
    distances: Vec<f64>,
    degenerate: Vec<usize>,
}

impl DistanceMatrix {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.distances[i * self.size + j]
    }

    /// Rows that had zero norm and were kept out of matching.
    pub fn degenerate(&self) -> &[usize] {
        &self.degenerate
    }

    /// Duplicate iff the distance is strictly below `tau`.
    pub fn threshold(&self, tau: f64) -> DuplicateMatrix {
        DuplicateMatrix {
            size: self.size,
            cells: self.distances.iter().map(|&d| d < tau).collect(),
        }
    }
}

/// Compute `1 - U·Uᵗ` over the unit-normalised rows of `matrix`.
///
/// The diagonal is always 0. Degenerate (all-zero) rows sit at +∞ from
/// every other row, so they can only ever match themselves.
pub fn cosine_distances(matrix: &SignatureMatrix) -> DistanceMatrix {
    let n = matrix.rows();

    let units: Vec<Option<Vec<f64>>> = (0..n)
        .into_par_iter()
        .map(|i| normalize_row(i, matrix.row(i)).ok())
        .collect();

    let degenerate: Vec<usize> = units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.is_none())
        .map(|(i, _)| i)
        .collect();
    for &index in &degenerate {
        warn!(index = index, "zero-norm signature excluded from matching");
    }

    let distances: Vec<f64> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let units = &units;
            (0..n).map(move |j| {
                if i == j {
                    return 0.0;
                }
                match (&units[i], &units[j]) {
                    (Some(a), Some(b)) => 1.0 - dot(a, b),
                    _ => f64::INFINITY,
                }
            })
        })
        .collect();

    DistanceMatrix {
        size: n,
        distances,
        degenerate,
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Symmetric N×N "is duplicate" relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMatrix {
    size: usize,
    cells: Vec<bool>,
}

impl DuplicateMatrix {
    pub fn from_fn(size: usize, f: impl Fn(usize, usize) -> bool) -> Self {
        let cells = (0..size)
            .flat_map(|i| (0..size).map(move |j| (i, j)))
            .map(|(i, j)| f(i, j))
            .collect();
        Self { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> bool {
        self.cells[i * self.size + j]
    }

    pub fn row(&self, i: usize) -> &[bool] {
        &self.cells[i * self.size..(i + 1) * self.size]
    }

    /// Element-wise AND. Both matrices must describe the same batch.
    pub fn and(&self, other: &DuplicateMatrix) -> Result<DuplicateMatrix> {
        if self.size != other.size {
            return Err(DedupeError::InvalidConfig {
                message: format!(
                    "cannot combine a {0}x{0} matrix with a {1}x{1} one",
                    self.size, other.size
                ),
            });
        }
        Ok(DuplicateMatrix {
            size: self.size,
            cells: self
                .cells
                .iter()
                .zip(&other.cells)
                .map(|(&a, &b)| a && b)
                .collect(),
        })
    }
}

/// `F[i][j] = (frames[i] == frames[j])`.
pub fn frame_count_mask(frames: &[Option<u64>]) -> DuplicateMatrix {
    DuplicateMatrix::from_fn(frames.len(), |i, j| frames[i] == frames[j])
}

/// Full similarity stage for one folder batch. Returns the duplicate matrix and
/// the indices of degenerate signatures.
pub fn find_duplicates(
    records: &[MediaRecord],
    threshold: f64,
) -> Result<(DuplicateMatrix, Vec<usize>)> {
    let matrix = SignatureMatrix::from_records(records)?;
    let distances = cosine_distances(&matrix);
    let mut duplicates = distances.threshold(threshold);

    if records.iter().any(|r| r.aux.is_some()) {
        let frames: Vec<Option<u64>> = records.iter().map(|r| r.aux).collect();
        duplicates = duplicates.and(&frame_count_mask(&frames))?;
    }

    Ok((duplicates, distances.degenerate().to_vec()))
}
