//! Reusable widget components.

pub mod detail;
pub mod filter;
pub mod progress;
pub mod status;

pub use detail::DetailPanel;
pub use filter::{OptionBar, Pill};
pub use progress::ProgressBar;
pub use status::ActivityIndicator;
