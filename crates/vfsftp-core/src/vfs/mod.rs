//! Turns client supplied virtual paths into user scoped store keys and decides which of them an
//! operation may touch.
//!
//! A [`VirtualPath`] is never used to address a store directly. It is first scoped to the calling
//! user with [`VirtualPath::scope`], which injects the user's namespace segment (administrators
//! see the whole store and get no prefix). The resulting [`ScopedKey`] is then checked against a
//! [`ShapeTable`] before the back-end issues any store call.

mod path;
pub use path::{DELIMITER, Namespace, ScopedKey, VirtualPath, scope};

mod shape;
pub use shape::{Segment, Shape, ShapeError, ShapeTable};
