//! Object model and runtime core for an embeddable JavaScript engine.
//!
//! Everything hangs off a [`Realm`]: objects are arena handles, and every
//! operation on them (property access, array algorithms, collections,
//! typed arrays, iteration) is a realm method returning [`JsResult`].

pub mod error;
pub mod runtime;
pub mod types;

pub use error::{ErrorKind, JsError, JsResult};
pub use runtime::{Realm, RealmConfig};
pub use types::{JsObject, JsString, JsSymbol, JsValue, PropertyKey};
