use serde::Serialize;

/// Overall reachability of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SystemStatus {
    #[default]
    Checking,
    Healthy,
    Unhealthy,
}

impl SystemStatus {
    /// Whether moving from `self` to `to` is a legal change of status.
    ///
    /// Staying in the same status is not a transition.
    pub fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Checking, Self::Healthy | Self::Unhealthy)
                | (Self::Unhealthy | Self::Healthy, Self::Checking)
        )
    }
}
