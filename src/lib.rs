pub mod config;
pub mod domain;
pub mod infrastructure;

/// Returns the feedsink user agent string with the current version
///
/// Format: "feedsink/X.Y.Z"
///
/// The version is read from Cargo.toml at compile time, ensuring it's
/// always in sync with the package version.
pub fn user_agent() -> String {
    format!("feedsink/{}", env!("CARGO_PKG_VERSION"))
}
