//! Text renderers for every generated file.
//!
//! Each renderer is a pure function of the validated [`RunConfig`](super::config::RunConfig)
//! and the planned [`Workspace`](super::workspace::Workspace); nothing here touches the
//! filesystem.

pub mod cpptraj;
pub mod gbsa;
pub mod slurm;
