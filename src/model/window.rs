use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque OS-level window identifier. The OS owns the window; we only ever
/// hold the handle, and a handle must be dropped from every tree the moment
/// a destroy event arrives.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    pub const fn new(raw: u64) -> Self { Self(raw) }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "window#{}", self.0) }
}

/// What the event source could tell us about a window. Any field may be
/// absent; matching rules treat an absent field as a non-match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl WindowDescriptor {
    pub fn with_exe(exe: &str) -> Self {
        Self {
            exe: Some(exe.to_string()),
            ..Default::default()
        }
    }

    /// True when the source has not yet produced any identifying field.
    /// Slow-registering applications commonly deliver their first create
    /// event in this state.
    pub fn is_blank(&self) -> bool {
        self.exe.is_none() && self.class.is_none() && self.title.is_none() && self.path.is_none()
    }
}
