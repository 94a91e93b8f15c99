use async_trait::async_trait;
use gm_contract::Delay;
use std::time::Duration;

/// Receipt poll timer backed by `setTimeout`.
pub struct GlooDelay;

#[async_trait(?Send)]
impl Delay for GlooDelay {
    async fn delay(&self, duration: Duration) {
        gloo_timers::future::sleep(duration).await;
    }
}
