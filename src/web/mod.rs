//! HTTP surface: declarative route binding, dispatch, and response coercion.

pub mod binder;
pub mod request;
pub mod respond;
pub mod router;

pub use binder::{merge_args, Bound, RouteBinding, RouteSpec};
pub use request::RequestInfo;
pub use respond::{coerce, Reply, REDIRECT_MARKER, TEMPLATE_KEY};
pub use router::{RouteHandler, WebApp};
