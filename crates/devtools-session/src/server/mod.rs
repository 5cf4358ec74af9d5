//! Connection and correlation layer (internal)
//!
//! This module owns the WebSocket, the frame codec, the correlation tables and
//! the dispatch loop that feeds them.
//!
//! **Note**: This module is exposed publicly only for integration testing purposes.
//! The types and APIs in this module are considered internal implementation details
//! and may change without notice. Use [`crate::Session`] and [`crate::Browser`].

#[doc(hidden)]
pub mod codec;
#[doc(hidden)]
pub mod correlation;
#[doc(hidden)]
pub mod discovery;
#[doc(hidden)]
pub mod dispatch;
#[doc(hidden)]
pub mod identity;
#[doc(hidden)]
pub mod session;
#[doc(hidden)]
pub mod transport;
