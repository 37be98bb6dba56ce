use cfg_if::cfg_if;

/// Android releases from this API level on use scoped storage and no longer
/// need the legacy storage permission for the downloads directory.
pub const ANDROID_SCOPED_STORAGE_API_LEVEL: u32 = 29;

/// Stand-in used by [`PlatformCapabilities::detect`] on Android.
pub const UNKNOWN_ANDROID_API_LEVEL: u32 = 0;

/// What the host platform allows, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformCapabilities {
    /// Writing to public downloads needs a runtime consent prompt.
    pub needs_explicit_permission: bool,
    /// A native save/share sheet can be offered after a download.
    pub native_share_available: bool,
    /// Local file URIs arrive percent-encoded and must be decoded before use.
    pub percent_encoded_file_uris: bool,
}

impl PlatformCapabilities {
    pub fn android(api_level: u32) -> Self {
        Self {
            needs_explicit_permission: api_level < ANDROID_SCOPED_STORAGE_API_LEVEL,
            native_share_available: false,
            percent_encoded_file_uris: false,
        }
    }

    pub fn ios(share_available: bool) -> Self {
        Self {
            needs_explicit_permission: false,
            native_share_available: share_available,
            percent_encoded_file_uris: true,
        }
    }

    pub fn desktop() -> Self {
        Self::default()
    }

    /// Best guess from the compile target.
    ///
    /// The Android API level is not visible from here, so an Android build is
    /// treated as predating scoped storage and always asks for consent. Android
    /// hosts must call [`Self::android`] with the device's real API level to
    /// skip that prompt on newer releases.
    pub fn detect() -> Self {
        cfg_if! {
            if #[cfg(target_os = "android")] {
                Self::android(UNKNOWN_ANDROID_API_LEVEL)
            } else if #[cfg(target_os = "ios")] {
                Self::ios(true)
            } else {
                Self::desktop()
            }
        }
    }
}
