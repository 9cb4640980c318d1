//! Registry configuration

/// Configuration for the connection registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Capacity of each connection's outbound queue
    pub outbound_capacity: usize,

    /// Consecutive frames a member may miss on a full queue before it is
    /// evicted (0 = never evict for a full queue)
    pub max_dropped_frames: u64,

    /// Deliver a reading back to the connection that sent it
    pub echo_to_sender: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            max_dropped_frames: 64,
            echo_to_sender: true,
        }
    }
}

impl RegistryConfig {
    /// Set outbound queue capacity (minimum 1)
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Set the eviction threshold for consecutive dropped frames
    pub fn max_dropped_frames(mut self, max: u64) -> Self {
        self.max_dropped_frames = max;
        self
    }

    /// Enable or disable echoing readings back to their sender
    pub fn echo_to_sender(mut self, echo: bool) -> Self {
        self.echo_to_sender = echo;
        self
    }
}
