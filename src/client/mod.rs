//! Azure Resource Manager client and authentication.
//!
//! This module provides the [`Transport`] seam the extraction engine talks
//! through, the [`ArmClient`] that implements it over HTTPS, the
//! [`ArmEndpoint`] used to build resource URLs, and authentication types
//! ([`Auth`], [`AuthType`]).

mod arm;
mod auth;
mod endpoint;
mod transport;

pub use arm::ArmClient;
pub use auth::{Auth, AuthType};
pub use endpoint::{ArmEndpoint, DEFAULT_API_VERSION, DEFAULT_ROOT, SOLUTIONS_API_VERSION};
pub use transport::{Accepted, Transport, fetch};
