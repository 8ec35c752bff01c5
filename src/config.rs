use std::time::Duration;

/// Settings for a [`crate::ProcessorController`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Upper bound on how long a split or merge may block the caller. Waits are unbounded when
    /// unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_operation_timeout: Option<Duration>,
}

impl ControllerSettings {
    #[allow(clippy::missing_const_for_fn)]
    pub fn with_segment_operation_timeout(self, timeout: Duration) -> Self {
        Self {
            segment_operation_timeout: Some(timeout),
            ..self
        }
    }
}
