/*! Defines binding types */

pub mod uniform_set;
pub mod visible_to;

pub use uniform_set::{BoundUniform, BoundUniformSet, UniformSet, UniformSetLayout};
