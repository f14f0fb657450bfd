use russell_lab::{Matrix, Vector};

/// Holds interpolation data evaluated at one integration point
pub struct IpData {
    /// Shape functions Sᵐ
    pub s: Vector,

    /// Gradients Gᵐᵢ = ∂Sᵐ/∂xᵢ (real coordinates)
    pub g: Matrix,

    /// Integration coefficient det(J)·w
    pub coef: f64,

    /// Real coordinates of this integration point
    pub coords: Vec<f64>,

    /// Distance to the axis of revolution (axisymmetric analyses)
    pub radius: f64,
}

/// Holds interpolation data evaluated at one face integration point
pub struct FaceIp {
    /// Face shape functions Sfⁱ
    pub sf: Vector,

    /// Integration coefficient |Jf|·w
    pub coef: f64,
}

/// Holds the data of one face (edge in 2D)
pub struct Face {
    /// Local ids of the vertices on this face
    pub local_verts: Vec<usize>,

    /// Integration points on this face
    pub ips: Vec<FaceIp>,
}

/// Holds pre-computed interpolation operators of one element
///
/// All quantities are evaluated once at construction time since the
/// integration points are fixed and the analyses are geometrically linear.
pub struct Interp {
    /// Space dimension
    pub ndim: usize,

    /// Number of vertices
    pub nverts: usize,

    /// Data at each integration point
    pub ips: Vec<IpData>,

    /// Faces with their own integration points
    pub faces: Vec<Face>,

    /// Extrapolation matrix E[nverts][nip] mapping ip values to nodal values
    pub emat: Matrix,
}

impl Interp {
    /// Returns the number of integration points
    pub fn nip(&self) -> usize {
        self.ips.len()
    }
}
