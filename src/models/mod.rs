//! Domain models for the policy domains service.
//!
//! - [`DomainProperties`]: caller-supplied metadata used to create or update a domain.
//! - [`DomainView`]: a stored domain with its assigned identifier and root policy.
//! - [`PolicyRef`]: reference to a (possibly versioned) policy.
//! - [`Link`] / [`Resources`]: hyperlink representation of domain collections.

mod domain;
mod link;

pub use domain::*;
pub use link::*;
