//! SAML 2.0 types and data structures.
//!
//! Inbound messages are read into these types after parsing; outbound
//! requests are rendered directly by [`crate::authn`].

mod assertion;
mod constants;
mod name_id;
mod response;
mod status;

pub use assertion::*;
pub use constants::*;
pub use name_id::*;
pub use response::*;
pub use status::*;
