use thiserror::Error;

/// Fatal configuration errors that abort a build.
///
/// Data-quality problems (for example a curve binding with no current value
/// to seed the defaults clip) are logged with `log::warn!` instead and never
/// halt the build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("missing animation clip '{0}'")]
    MissingClip(String),

    #[error("object '{0}' not found in the rig")]
    MissingObject(String),

    #[error("blend shape '{0}' not found on any mesh of the rig")]
    MissingBlendShape(String),

    #[error("root menu has no room for the generated submenu")]
    RootMenuFull,

    /// Internal invariant violation: the driver declared two artifacts with
    /// the same generated name. A correct driver never produces this.
    #[error("duplicate generated name '{0}'")]
    DuplicateName(String),
}
