// Public API types module
//
// Configuration for sessions and browser discovery, with builder-style setters.

pub mod browser_options;
pub mod session_options;

pub use browser_options::BrowserOptions;
pub use session_options::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_TIMEOUT, SessionOptions};
