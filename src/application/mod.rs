//! Application services layer: collaborator contracts and error mapping.

pub mod error;
pub mod repos;
