//! # Utility Functions Module
//!
//! Helpers that keep external command lines readable.

/// Builds an argument vector from mixed values.
///
/// ```ignore
/// let args = args!["-preset", "slow", "-crf", 18];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$($item.to_string()),*]
    };
}
