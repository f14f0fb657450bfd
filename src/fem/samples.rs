use super::{Face, FaceIp, Interp, IpData};
use crate::base::Error;
use russell_lab::{mat_inverse, Matrix, Vector};

const GP: f64 = 0.577350269189625764509148780502; // 1/√3

impl Interp {
    /// Builds the interpolation data of a 3-node triangle
    ///
    /// Uses one integration point at the centroid and two Gauss points per
    /// edge. The vertices must be given in counter-clockwise order; the edges
    /// are (0,1), (1,2) and (2,0).
    pub fn tri3(xx: &[[f64; 2]; 3]) -> Result<Interp, Error> {
        let area = 0.5
            * ((xx[1][0] - xx[0][0]) * (xx[2][1] - xx[0][1]) - (xx[2][0] - xx[0][0]) * (xx[1][1] - xx[0][1]));
        if area < 1e-14 {
            return Err(Error::Config("tri3: vertices must be counter-clockwise and non-degenerate"));
        }

        // constant gradients
        let mut g = Matrix::new(3, 2);
        for m in 0..3 {
            let (j, k) = ((m + 1) % 3, (m + 2) % 3);
            g.set(m, 0, (xx[j][1] - xx[k][1]) / (2.0 * area));
            g.set(m, 1, (xx[k][0] - xx[j][0]) / (2.0 * area));
        }

        // single integration point at the centroid
        let mut s = Vector::new(3);
        s.fill(1.0 / 3.0);
        let xc = (xx[0][0] + xx[1][0] + xx[2][0]) / 3.0;
        let yc = (xx[0][1] + xx[1][1] + xx[2][1]) / 3.0;
        let ips = vec![IpData {
            s,
            g,
            coef: area,
            coords: vec![xc, yc],
            radius: xc,
        }];

        // edges with two Gauss points each
        let faces = edges_with_line2_ips(xx.iter().map(|x| x.to_vec()).collect(), &[[0, 1], [1, 2], [2, 0]]);

        // constant extrapolation
        let mut emat = Matrix::new(3, 1);
        emat.fill(1.0);

        Ok(Interp {
            ndim: 2,
            nverts: 3,
            ips,
            faces,
            emat,
        })
    }

    /// Builds the interpolation data of a 4-node quadrilateral
    ///
    /// Uses 2×2 Gauss integration and two Gauss points per edge. The vertices
    /// must be given in counter-clockwise order; the edges are (0,1), (1,2),
    /// (2,3) and (3,0).
    pub fn qua4(xx: &[[f64; 2]; 4]) -> Result<Interp, Error> {
        const XI: [f64; 4] = [-1.0, 1.0, 1.0, -1.0];
        const ET: [f64; 4] = [-1.0, -1.0, 1.0, 1.0];
        let ip_nat = [[-GP, -GP], [GP, -GP], [GP, GP], [-GP, GP]];

        let mut ips = Vec::with_capacity(4);
        let mut smat = Matrix::new(4, 4); // shape functions at ips, for the extrapolator
        for (idx, rst) in ip_nat.iter().enumerate() {
            let (r, t) = (rst[0], rst[1]);

            // shape functions and natural derivatives
            let mut s = Vector::new(4);
            let mut dn = Matrix::new(4, 2);
            for m in 0..4 {
                s[m] = 0.25 * (1.0 + r * XI[m]) * (1.0 + t * ET[m]);
                dn.set(m, 0, 0.25 * XI[m] * (1.0 + t * ET[m]));
                dn.set(m, 1, 0.25 * ET[m] * (1.0 + r * XI[m]));
                smat.set(idx, m, s[m]);
            }

            // Jacobian Jij = ∂xi/∂ξj
            let mut jac = [[0.0; 2]; 2];
            for m in 0..4 {
                for i in 0..2 {
                    for j in 0..2 {
                        jac[i][j] += xx[m][i] * dn.get(m, j);
                    }
                }
            }
            let det = jac[0][0] * jac[1][1] - jac[0][1] * jac[1][0];
            if det < 1e-14 {
                return Err(Error::Config("qua4: vertices must be counter-clockwise and non-degenerate"));
            }
            let jinv = [
                [jac[1][1] / det, -jac[0][1] / det],
                [-jac[1][0] / det, jac[0][0] / det],
            ];

            // real gradients
            let mut g = Matrix::new(4, 2);
            for m in 0..4 {
                for i in 0..2 {
                    g.set(m, i, dn.get(m, 0) * jinv[0][i] + dn.get(m, 1) * jinv[1][i]);
                }
            }

            // real coordinates of the ip
            let mut coords = vec![0.0, 0.0];
            for m in 0..4 {
                coords[0] += s[m] * xx[m][0];
                coords[1] += s[m] * xx[m][1];
            }
            let radius = coords[0];

            ips.push(IpData {
                s,
                g,
                coef: det, // weight = 1
                coords,
                radius,
            });
        }

        // edges with two Gauss points each
        let faces = edges_with_line2_ips(
            xx.iter().map(|x| x.to_vec()).collect(),
            &[[0, 1], [1, 2], [2, 3], [3, 0]],
        );

        // extrapolation matrix: inverse of the shape matrix at the ips
        let mut emat = Matrix::new(4, 4);
        mat_inverse(&mut emat, &smat).map_err(Error::Consistency)?;

        Ok(Interp {
            ndim: 2,
            nverts: 4,
            ips,
            faces,
            emat,
        })
    }
}

/// Builds the face data of straight edges using 2-point Gauss rules
fn edges_with_line2_ips(xx: Vec<Vec<f64>>, edges: &[[usize; 2]]) -> Vec<Face> {
    let mut faces = Vec::with_capacity(edges.len());
    for edge in edges {
        let (a, b) = (edge[0], edge[1]);
        let dx = xx[b][0] - xx[a][0];
        let dy = xx[b][1] - xx[a][1];
        let half_length = 0.5 * f64::sqrt(dx * dx + dy * dy);
        let mut ips = Vec::with_capacity(2);
        for xi in [-GP, GP] {
            let mut sf = Vector::new(2);
            sf[0] = 0.5 * (1.0 - xi);
            sf[1] = 0.5 * (1.0 + xi);
            ips.push(FaceIp {
                sf,
                coef: half_length, // weight = 1
            });
        }
        faces.push(Face {
            local_verts: vec![a, b],
            ips,
        });
    }
    faces
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::Interp;
    use russell_lab::approx_eq;

    #[test]
    fn tri3_works() {
        let xx = [[0.0, 0.0], [2.0, 0.0], [0.0, 2.0]];
        let interp = Interp::tri3(&xx).unwrap();
        assert_eq!(interp.nip(), 1);
        let ip = &interp.ips[0];
        approx_eq(ip.coef, 2.0, 1e-15); // area
        approx_eq(ip.s[0] + ip.s[1] + ip.s[2], 1.0, 1e-15);

        // gradients sum to zero and recover linear fields
        for i in 0..2 {
            let sum: f64 = (0..3).map(|m| ip.g.get(m, i)).sum();
            approx_eq(sum, 0.0, 1e-15);
        }
        // d(x)/dx = Σ Gm0·xm = 1
        let dxdx: f64 = (0..3).map(|m| ip.g.get(m, 0) * xx[m][0]).sum();
        approx_eq(dxdx, 1.0, 1e-15);

        // edge lengths
        approx_eq(interp.faces[0].ips[0].coef, 1.0, 1e-15);
        approx_eq(interp.faces[1].ips[0].coef, f64::sqrt(2.0), 1e-15);
    }

    #[test]
    fn tri3_captures_clockwise_vertices() {
        let xx = [[0.0, 0.0], [0.0, 2.0], [2.0, 0.0]];
        assert!(Interp::tri3(&xx).is_err());
    }

    #[test]
    fn qua4_works() {
        let (w, h) = (3.0, 2.0);
        let xx = [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]];
        let interp = Interp::qua4(&xx).unwrap();
        assert_eq!(interp.nip(), 4);

        // total "volume"
        let vol: f64 = interp.ips.iter().map(|ip| ip.coef).sum();
        approx_eq(vol, w * h, 1e-14);

        for ip in &interp.ips {
            // partition of unity
            let sum_s: f64 = (0..4).map(|m| ip.s[m]).sum();
            approx_eq(sum_s, 1.0, 1e-15);

            // gradients recover linear fields
            let dxdx: f64 = (0..4).map(|m| ip.g.get(m, 0) * xx[m][0]).sum();
            let dydy: f64 = (0..4).map(|m| ip.g.get(m, 1) * xx[m][1]).sum();
            let dxdy: f64 = (0..4).map(|m| ip.g.get(m, 1) * xx[m][0]).sum();
            approx_eq(dxdx, 1.0, 1e-14);
            approx_eq(dydy, 1.0, 1e-14);
            approx_eq(dxdy, 0.0, 1e-14);
        }

        // extrapolation of a linear field is exact at the nodes
        let f = |x: f64, y: f64| 1.0 + 2.0 * x - 3.0 * y;
        for m in 0..4 {
            let mut val = 0.0;
            for (idx, ip) in interp.ips.iter().enumerate() {
                val += interp.emat.get(m, idx) * f(ip.coords[0], ip.coords[1]);
            }
            approx_eq(val, f(xx[m][0], xx[m][1]), 1e-13);
        }

        // edge coefficients
        approx_eq(interp.faces[0].ips[0].coef, w / 2.0, 1e-15);
        approx_eq(interp.faces[1].ips[0].coef, h / 2.0, 1e-15);
    }
}
