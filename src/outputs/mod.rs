//! Output writers.
//!
//! # Submodules
//!
//! - [`html`]: Writes the final report document to its fixed path
//!
//! # Output Structure
//!
//! ```text
//! ./
//! └── index.html   # overwritten on every run
//! ```

pub mod html;
