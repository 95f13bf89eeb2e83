use super::site::Site;

/// Transitions reported by a browser. Sites are `None` when the tab has no url that can be
/// tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionEvent {
    /// Another tab became active.
    Activate(Option<Site>),
    /// Active tab navigated somewhere else.
    UrlChange(Option<Site>),
    /// Browser lost focus or was minimized.
    FocusLost,
    /// Browser window got focus back. Contains site of the active tab in that window.
    FocusGained(Option<Site>),
    /// Periodic checkpoint.
    Tick,
}
