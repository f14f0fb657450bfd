use russell_lab::Matrix;

/// Holds a sparse matrix in triplet (COO) format
///
/// Repeated (i,j) entries are summed, thus elements may assemble their local
/// matrices without searching for existing positions.
pub struct SparseTriplet {
    nrow: usize,
    ncol: usize,
    indices_i: Vec<usize>,
    indices_j: Vec<usize>,
    values: Vec<f64>,
}

impl SparseTriplet {
    /// Allocates a new (empty) triplet
    pub fn new(nrow: usize, ncol: usize) -> Self {
        SparseTriplet {
            nrow,
            ncol,
            indices_i: Vec::new(),
            indices_j: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Erases all entries, keeping the matrix dimensions
    pub fn reset(&mut self) {
        self.indices_i.clear();
        self.indices_j.clear();
        self.values.clear();
    }

    /// Puts a new entry; (i,j) duplicates are summed upon conversion
    pub fn put(&mut self, i: usize, j: usize, value: f64) {
        assert!(i < self.nrow && j < self.ncol);
        self.indices_i.push(i);
        self.indices_j.push(j);
        self.values.push(value);
    }

    /// Returns the (nrow, ncol) dimensions
    pub fn dims(&self) -> (usize, usize) {
        (self.nrow, self.ncol)
    }

    /// Converts the triplet to a dense matrix, summing duplicates
    pub fn as_dense(&self) -> Matrix {
        let mut a = Matrix::new(self.nrow, self.ncol);
        for p in 0..self.values.len() {
            let (i, j) = (self.indices_i[p], self.indices_j[p]);
            a.set(i, j, a.get(i, j) + self.values[p]);
        }
        a
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::SparseTriplet;

    #[test]
    fn put_and_as_dense_work() {
        let mut kb = SparseTriplet::new(2, 2);
        kb.put(0, 0, 1.0);
        kb.put(0, 0, 2.0);
        kb.put(1, 0, -1.0);
        kb.put(1, 1, 4.0);
        let a = kb.as_dense();
        assert_eq!(a.get(0, 0), 3.0);
        assert_eq!(a.get(0, 1), 0.0);
        assert_eq!(a.get(1, 0), -1.0);
        assert_eq!(a.get(1, 1), 4.0);
        kb.reset();
        let b = kb.as_dense();
        assert_eq!(b.get(0, 0), 0.0);
        assert_eq!(kb.dims(), (2, 2));
    }
}
