//! Tower middleware layers.
//!
//! [`IdentityLayer`] stamps each request with a correlation ID: it resolves
//! the caller's user ID, generates the ID ([`generator`]), writes it to the
//! configured request header and the request extensions ([`context`]), and
//! mirrors it onto the response. Settings are resolved once from the config
//! file into an [`IdentitySpec`] ([`spec`]).
//!
//! Downstream handlers read the ID with
//! [`RequestIdentity::from_request`] instead of re-parsing headers.

pub mod context;
pub mod generator;
pub mod identity;
pub mod spec;

pub use context::{RequestContext, RequestIdentity, ANONYMOUS};
pub use generator::{GeneratedId, IdSource, UuidSource};
pub use identity::{Identifier, IdentityLayer, IdentityMiddleware};
pub use spec::IdentitySpec;
