//! Domain model module declarations.

pub mod form;
pub mod launch;
pub mod report;
pub mod upload;
