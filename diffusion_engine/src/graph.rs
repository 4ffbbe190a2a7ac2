/// Weighted graph — the immutable adjacency structure a run diffuses over.
///
/// Dense row-major matrix with O(1) name→index lookup. Weights are i64
/// fixed-point (real * SCALE). Zero means "no edge".

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Malformed adjacency input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A node name is empty.
    EmptyName,
    /// The same node name appears twice.
    DuplicateName(String),
    /// The weight matrix is not n×n for n node names.
    NotSquare { rows: usize, expected: usize },
    /// `weights[i][j] != weights[j][i]` for the named pair.
    Asymmetric { a: String, b: String },
    /// A node has a non-zero self-weight.
    NonzeroDiagonal(String),
    /// A weight is negative.
    NegativeWeight { a: String, b: String },
    /// The name→index lookup disagrees with the node list (possible
    /// only for graphs arriving from deserialization).
    CorruptIndex(String),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::EmptyName => write!(f, "InvalidGraph: empty node name"),
            GraphError::DuplicateName(n) => {
                write!(f, "InvalidGraph: duplicate node name {:?}", n)
            }
            GraphError::NotSquare { rows, expected } => write!(
                f,
                "InvalidGraph: weight matrix has {} rows, expected {}",
                rows, expected
            ),
            GraphError::Asymmetric { a, b } => write!(
                f,
                "InvalidGraph: asymmetric weights between {:?} and {:?}",
                a, b
            ),
            GraphError::NonzeroDiagonal(n) => {
                write!(f, "InvalidGraph: non-zero self-weight on {:?}", n)
            }
            GraphError::NegativeWeight { a, b } => write!(
                f,
                "InvalidGraph: negative weight between {:?} and {:?}",
                a, b
            ),
            GraphError::CorruptIndex(n) => {
                write!(f, "InvalidGraph: index entry {:?} is out of sync", n)
            }
        }
    }
}

/// Symmetric weighted adjacency over a fixed, ordered set of named nodes.
///
/// Immutable for the duration of one diffusion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightedGraph {
    names: Vec<String>,
    index: BTreeMap<String, usize>,
    weights: Vec<i64>, // row-major, len = n*n
}

impl WeightedGraph {
    /// Build a graph from node names and an n×n weight matrix.
    ///
    /// Validates: unique non-empty names, square matrix, symmetry, zero
    /// diagonal, non-negative weights.
    pub fn from_matrix(
        names: Vec<String>,
        matrix: Vec<Vec<i64>>,
    ) -> Result<Self, GraphError> {
        let n = names.len();
        if matrix.len() != n {
            return Err(GraphError::NotSquare {
                rows: matrix.len(),
                expected: n,
            });
        }
        for row in &matrix {
            if row.len() != n {
                return Err(GraphError::NotSquare {
                    rows: row.len(),
                    expected: n,
                });
            }
        }

        let mut index = BTreeMap::new();
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(GraphError::EmptyName);
            }
            if index.insert(name.clone(), i).is_some() {
                return Err(GraphError::DuplicateName(name.clone()));
            }
        }

        let mut weights = Vec::with_capacity(n * n);
        for row in &matrix {
            weights.extend_from_slice(row);
        }

        let graph = Self {
            names,
            index,
            weights,
        };
        graph.try_validate()?;
        Ok(graph)
    }

    /// Re-run the structural checks. Used when a graph arrives from a
    /// deserialized snapshot rather than `from_matrix`.
    pub fn try_validate(&self) -> Result<(), GraphError> {
        let n = self.names.len();
        if self.weights.len() != n * n {
            return Err(GraphError::NotSquare {
                rows: self.weights.len() / n.max(1),
                expected: n,
            });
        }
        for (i, name) in self.names.iter().enumerate() {
            if name.is_empty() {
                return Err(GraphError::EmptyName);
            }
            if self.index.get(name) != Some(&i) {
                return Err(GraphError::CorruptIndex(name.clone()));
            }
        }
        if self.index.len() != n {
            for key in self.index.keys() {
                if !self.names.contains(key) {
                    return Err(GraphError::CorruptIndex(key.clone()));
                }
            }
        }
        for i in 0..n {
            if self.weights[i * n + i] != 0 {
                return Err(GraphError::NonzeroDiagonal(self.names[i].clone()));
            }
            for j in (i + 1)..n {
                let wij = self.weights[i * n + j];
                let wji = self.weights[j * n + i];
                if wij != wji {
                    return Err(GraphError::Asymmetric {
                        a: self.names[i].clone(),
                        b: self.names[j].clone(),
                    });
                }
                if wij < 0 {
                    return Err(GraphError::NegativeWeight {
                        a: self.names[i].clone(),
                        b: self.names[j].clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Node names in matrix order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name of the node at `i`. Panics if out of range.
    pub fn name(&self, i: usize) -> &str {
        &self.names[i]
    }

    /// O(1) name→index lookup.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Whether `name` is a node of this graph.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Weight between node indices `i` and `j`.
    pub fn weight(&self, i: usize, j: usize) -> i64 {
        self.weights[i * self.names.len() + j]
    }

    /// Weight between two named nodes, if both exist.
    pub fn weight_between(&self, a: &str, b: &str) -> Option<i64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.weight(i, j))
    }

    /// Neighbors of node `i` in index order: `(index, weight)` for every
    /// non-zero weight.
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = (usize, i64)> + '_ {
        let n = self.names.len();
        (0..n)
            .map(move |j| (j, self.weights[i * n + j]))
            .filter(|&(_, w)| w != 0)
    }

    /// Undirected edge list: `(i, j, weight)` for `i < j`, weight > 0.
    pub fn edges(&self) -> Vec<(usize, usize, i64)> {
        let n = self.names.len();
        let mut out = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let w = self.weights[i * n + j];
                if w != 0 {
                    out.push((i, j, w));
                }
            }
        }
        out
    }

    /// Largest edge weight, or 0 for an edgeless graph.
    pub fn max_weight(&self) -> i64 {
        self.weights.iter().copied().max().unwrap_or(0)
    }
}
