//! Output for the one-shot `collect` command.
//!
//! # Submodules
//!
//! - [`json`]: writes an [`EditorialsResponse`](crate::models::EditorialsResponse)
//!   to a dated file or to stdout
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! ├── 2026-02-11.json
//! └── 2026-02-12.json
//! ```

pub mod json;
