//! Storage key constants.

/// Storage keys used by the SDK
pub struct StorageKeys;

impl StorageKeys {
    /// Long-lived project credential provisioned by the host application
    pub const PROJECT_CREDENTIAL: &'static str = "PurLogProjectJWT";

    /// Short-lived session credential issued by the backend
    pub const SESSION_CREDENTIAL: &'static str = "PurLogSessionJWT";

    /// Per-installation device identity (UUID)
    pub const DEVICE_IDENTITY: &'static str = "PurLogSessionUUID";

    /// Every key the SDK writes.
    pub const ALL: [&'static str; 3] = [
        Self::PROJECT_CREDENTIAL,
        Self::SESSION_CREDENTIAL,
        Self::DEVICE_IDENTITY,
    ];
}
