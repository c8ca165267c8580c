//! # gbsa-prep
//!
//! Prepares (QM/MM-)GBSA post-processing jobs for AMBER molecular-dynamics runs: strips
//! the solvated topology and trajectory with cpptraj, writes the MMPBSA.py input deck and
//! a SLURM script, and optionally submits it.
//!
//! - **[`core`]**: stateless value types such as residue ranges and the level of theory.
//! - **[`engine`]**: configuration validation, the error taxonomy, workspace layout,
//!   file templates and the seam to external executables.
//! - **[`workflows`]**: the end-to-end preparation pipeline.

pub mod core;
pub mod engine;
pub mod workflows;
