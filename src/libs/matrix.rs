use crate::libs::qtree::TreeError;
use intspan::NamedMatrix;
use tracing::warn;

/// Square matrix of pairwise distances with one label per row.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    names: Vec<String>,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Build a matrix from labels and rows.
    ///
    /// ```
    /// use quartree::libs::matrix::DistanceMatrix;
    ///
    /// let dm = DistanceMatrix::new(
    ///     vec!["A".to_string(), "B".to_string()],
    ///     vec![vec![0.0, 2.0], vec![2.0, 0.0]],
    /// )
    /// .unwrap();
    /// assert_eq!(dm.size(), 2);
    /// assert_eq!(dm.get(1, 0), 2.0);
    /// assert_eq!(dm.index_of("B"), Some(1));
    /// ```
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, TreeError> {
        let n = names.len();
        if rows.len() != n {
            return Err(TreeError::Matrix(format!(
                "{} labels but {} rows",
                n,
                rows.len()
            )));
        }

        let mut values = Vec::with_capacity(n * n);
        for (name, row) in names.iter().zip(rows) {
            if row.len() != n {
                return Err(TreeError::Matrix(format!(
                    "row {} has {} values, expected {}",
                    name,
                    row.len(),
                    n
                )));
            }
            if let Some(v) = row.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(TreeError::Matrix(format!("row {} holds invalid distance {}", name, v)));
            }
            values.extend(row);
        }

        let dm = Self { names, values };
        if !dm.is_symmetric() {
            warn!("Distance matrix is not symmetric, the upper triangle is used");
        }
        Ok(dm)
    }

    /// Read a matrix whose rows are `label d1 d2 ... dn`.
    ///
    /// A leading line holding only the row count (relaxed PHYLIP) is
    /// skipped. `infile` may be `stdin` or a gzipped file. Only the lower
    /// triangle is read, so the result is always symmetric.
    pub fn from_file(infile: &str) -> anyhow::Result<Self> {
        let named = NamedMatrix::from_relaxed_phylip(infile);
        Ok(Self::from_named(&named)?)
    }

    /// Widen an `intspan` matrix to `f64`, keeping its row order.
    pub fn from_named(named: &NamedMatrix) -> Result<Self, TreeError> {
        let n = named.size();
        let names = named.get_names().into_iter().cloned().collect();
        let rows = (0..n)
            .map(|i| (0..n).map(|j| named.get(i, j) as f64).collect())
            .collect();

        Self::new(names, rows)
    }

    pub fn size(&self) -> usize {
        self.names.len()
    }

    pub fn get_names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Distance between rows `i` and `j`, read from the upper triangle.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (i, j) = if i <= j { (i, j) } else { (j, i) };
        self.values[i * self.names.len() + j]
    }

    pub fn is_symmetric(&self) -> bool {
        let n = self.names.len();
        (0..n).all(|i| {
            (i + 1..n).all(|j| (self.values[i * n + j] - self.values[j * n + i]).abs() <= 1e-9)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_phylip() {
        let dir = tempfile::TempDir::new().unwrap();
        let plain = dir.path().join("plain.tsv");
        let phylip = dir.path().join("matrix.phy");
        std::fs::write(&plain, "A\t0\t1\t2\nB\t1\t0\t3\nC\t2\t3\t0\n").unwrap();
        std::fs::write(&phylip, "3\nA 0 1 2\nB 1 0 3\n\nC 2 3 0\n").unwrap();

        let dm = DistanceMatrix::from_file(plain.to_str().unwrap()).unwrap();
        assert_eq!(dm.get_names(), &["A", "B", "C"]);
        assert_eq!(dm.get(1, 2), 3.0);
        assert_eq!(DistanceMatrix::from_file(phylip.to_str().unwrap()).unwrap(), dm);
    }

    #[test]
    fn fixtures_match_named_matrix() {
        for (infile, n) in [("tests/data/six.tsv", 6), ("tests/data/eight.phy", 8)] {
            let named = NamedMatrix::from_relaxed_phylip(infile);
            let dm = DistanceMatrix::from_file(infile).unwrap();
            assert_eq!(dm.size(), n);
            assert_eq!(dm.get_names().len(), named.get_names().len());
            for (ours, theirs) in dm.get_names().iter().zip(named.get_names()) {
                assert_eq!(ours, theirs);
            }
            for i in 0..n {
                for j in 0..n {
                    assert_eq!(dm.get(i, j), named.get(i, j) as f64);
                }
            }
            assert!(dm.is_symmetric());
        }
    }

    #[test]
    fn lower_triangle_is_mirrored() {
        let dir = tempfile::TempDir::new().unwrap();
        let infile = dir.path().join("asym.tsv");
        std::fs::write(&infile, "A 0 9\nB 1 0\n").unwrap();

        let dm = DistanceMatrix::from_file(infile.to_str().unwrap()).unwrap();
        assert!(dm.is_symmetric());
        assert_eq!(dm.get(0, 1), 1.0);
    }

    #[test]
    fn invalid_distances() {
        let names = vec!["A".to_string(), "B".to_string()];
        assert!(DistanceMatrix::new(names.clone(), vec![vec![0.0, -1.0], vec![-1.0, 0.0]]).is_err());
        assert!(DistanceMatrix::new(names.clone(), vec![vec![0.0, f64::NAN], vec![1.0, 0.0]]).is_err());
        assert!(DistanceMatrix::new(names.clone(), vec![vec![0.0, 1.0]]).is_err());
        assert!(DistanceMatrix::new(names, vec![vec![0.0], vec![1.0, 0.0]]).is_err());

        let dir = tempfile::TempDir::new().unwrap();
        let infile = dir.path().join("negative.tsv");
        std::fs::write(&infile, "A 0 -1\nB -1 0\n").unwrap();
        assert!(DistanceMatrix::from_file(infile.to_str().unwrap()).is_err());
    }

    #[test]
    fn upper_triangle_wins() {
        let dm = DistanceMatrix::new(
            vec!["A".to_string(), "B".to_string()],
            vec![vec![0.0, 1.0], vec![5.0, 0.0]],
        )
        .unwrap();
        assert!(!dm.is_symmetric());
        assert_eq!(dm.get(1, 0), 1.0);
    }
}
