//! Build identification captured by `build.rs`

pub const GIT_REVISION: &str = env!("FBK_GIT_REVISION");
pub const BUILD_TIMESTAMP: &str = env!("FBK_BUILD_TIMESTAMP");
pub const BUILD_PROFILE: &str = env!("FBK_BUILD_PROFILE");

/// Startup line logged by each binary
///
/// `version` is the binary's own `CARGO_PKG_VERSION`.
pub fn banner(title: &str, binary: &str, version: &str) -> String {
    format!(
        "Starting {} ({}) v{} [{}] built {} ({})",
        title, binary, version, GIT_REVISION, BUILD_TIMESTAMP, BUILD_PROFILE
    )
}
