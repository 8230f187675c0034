//! ---
//! flt_section: "01-core-functionality"
//! flt_subsection: "module"
//! flt_type: "source"
//! flt_scope: "code"
//! flt_description: "Build metadata provider stamped onto emitted steps."
//! flt_version: "v0.0.0-prealpha"
//! flt_owner: "tbd"
//! ---
use serde::Serialize;

/// Compile-time version metadata for the agent build.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    /// Workspace semantic version.
    pub semver: String,
    /// Git commit hash captured at build time, when available.
    pub git_sha: String,
    /// Build timestamp from the compilation environment.
    pub build_timestamp: String,
    /// Cargo profile used during compilation.
    pub profile: String,
}

impl VersionInfo {
    /// Construct a new [`VersionInfo`] instance using environment metadata.
    #[must_use]
    pub fn current() -> Self {
        Self {
            semver: env!("CARGO_PKG_VERSION").to_owned(),
            git_sha: option_env!("FLOTILLA_GIT_SHA").unwrap_or("UNKNOWN").to_owned(),
            build_timestamp: option_env!("FLOTILLA_BUILD_TIMESTAMP")
                .unwrap_or("UNKNOWN")
                .to_owned(),
            profile: if cfg!(debug_assertions) {
                "debug".to_owned()
            } else {
                "release".to_owned()
            },
        }
    }

    /// Human readable banner reported once at agent startup.
    #[must_use]
    pub fn banner(&self) -> String {
        format!("Flotilla v{} (git {})", self.semver, self.git_sha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semver_is_valid() {
        let info = VersionInfo::current();
        assert!(semver::Version::parse(&info.semver).is_ok());
    }

    #[test]
    fn banner_contains_semver() {
        let info = VersionInfo::current();
        assert!(info.banner().contains(&info.semver));
    }
}
