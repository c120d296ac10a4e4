use std::time::Duration;

/// Spacing between consecutive outbound calls.
pub trait Pacer {
    async fn pause(&self);
}

/// Sleep a fixed interval between calls. A zero interval disables pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    #[cfg(test)]
    pub fn none() -> Self {
        Self(Duration::ZERO)
    }
}

impl Pacer for FixedDelay {
    async fn pause(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}
