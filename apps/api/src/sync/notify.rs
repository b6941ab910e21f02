use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// User-facing outcome of a sync operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    Saved,
    SaveFailed { reason: String },
    PayloadTooLarge { size: usize, limit: usize },
    LoadFailed { reason: String },
    RefreshFailed { reason: String },
    /// Session is gone. The editor redirects to sign-in instead of showing a toast.
    SignInRequired,
}

impl Notification {
    pub fn severity(&self) -> Severity {
        match self {
            Notification::Saved => Severity::Success,
            Notification::PayloadTooLarge { .. } => Severity::Warning,
            Notification::SaveFailed { .. }
            | Notification::LoadFailed { .. }
            | Notification::RefreshFailed { .. }
            | Notification::SignInRequired => Severity::Error,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Notification::SignInRequired)
    }

    pub fn message(&self) -> &'static str {
        match self {
            Notification::Saved => "Your CV has been saved successfully!",
            Notification::SaveFailed { .. } => "Failed to save CV data. Please try again.",
            Notification::PayloadTooLarge { .. } => {
                "Your CV data is too large. Please keep it concise and avoid putting too much information in the fields."
            }
            Notification::LoadFailed { .. } => {
                "Failed to load CV data. Please try refreshing the page."
            }
            Notification::RefreshFailed { .. } => {
                "Could not refresh your CV from the server. Your local changes are kept."
            }
            Notification::SignInRequired => "Please sign in to continue.",
        }
    }
}
