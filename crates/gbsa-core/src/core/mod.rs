//! Stateless value types: residue-range grammar and level of theory.

pub mod residues;
pub mod theory;
