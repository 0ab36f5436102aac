//! UI module for consistent CLI output
//!
//! Uses `cliclack` for styled output in interactive terminals, with
//! automatic fallback to plain output in CI/non-interactive environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use pkgfeed::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Pushing Foo.1.0.0.nupkg...");
//! // ... do work ...
//! spinner.stop("Pushed Foo 1.0.0");
//!
//! ui::step_warn_hint(&ctx, "Package not found: Foo 2.0.0", "Nothing was removed");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, section, step_info, step_ok, step_ok_detail,
    step_warn_hint,
};
pub use progress::TaskSpinner;
