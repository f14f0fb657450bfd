//! TpmFEM - finite element core for porous media mechanics
//!
//! This crate implements the constitutive and element-level machinery for
//! coupled simulations based on the Theory of Porous Media (TPM): a
//! deformable solid skeleton whose pores are filled by a compressible liquid
//! and, optionally, a compressible gas.
//!
//! The main components are:
//!
//! * [`models`] -- constitutive models: fluid compressibility, relative
//!   conductivity, liquid retention (including hysteresis) and the porous
//!   medium model combining them, with the implicit saturation update and
//!   its consistent derivatives;
//! * [`fem`] -- element routines: solid, seepage (liquid and liquid-gas) and
//!   the coupled solid-liquid and solid-liquid-gas elements, with residuals,
//!   consistent Jacobian blocks and natural boundary conditions including
//!   seepage faces;
//! * [`analytical`] -- closed-form solutions used for verification;
//! * [`base`] -- errors, parameter sets and scalar auxiliary functions.
//!
//! Mesh generation, shape-function evaluation and the outer nonlinear solver
//! are external collaborators: elements consume pre-computed interpolation
//! data ([`fem::Interp`]) and a nodal solution context ([`fem::Solution`]),
//! and write into a global residual vector and a sparse Jacobian triplet.
//!
//! References:
//!
//! 1. Pedroso DM (2015) A consistent u-p formulation for porous media with
//!    hysteresis. Int Journal for Numerical Methods in Engineering, 101(8):606-634
//! 2. Pedroso DM (2015) A solution to transient seepage in unsaturated porous
//!    media. Computer Methods in Applied Mechanics and Engineering, 285:791-816

/// Defines a function of time, f(t)
pub type FnTime = fn(t: f64) -> f64;

pub mod analytical;
pub mod base;
pub mod fem;
pub mod models;
