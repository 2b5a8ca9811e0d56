//! Features Module - Feature Engineering
//!
//! Shared by the prediction server and the trainer so both build
//! identical rows from identical windows.

pub mod layout;
pub mod time;
pub mod window;

#[cfg(test)]
mod tests;

pub use layout::{FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION, LayoutInfo, layout_hash};
pub use time::{TimeContext, TimeFlags, TimeWindows};
pub use window::{engineer_window, FeatureRow, FeatureWindow, WindowStats};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("window is empty")]
    EmptyWindow,

    #[error("count at position {0} is not a finite number")]
    NonFiniteCount(usize),

    #[error("hour must be between 0 and 23, got {0}")]
    InvalidHour(u32),

    #[error("day_of_week must be between 0 and 6, got {0}")]
    InvalidDay(u32),
}
