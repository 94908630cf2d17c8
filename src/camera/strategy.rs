use crate::error::CaptureError;
use crate::frame::Frame;
use crate::lane::Lane;
use async_trait::async_trait;

/// One link in the frame source's fallback chain.
///
/// Implementations bound their own running time; an `Err` is a miss and the
/// next strategy is tried.
#[async_trait]
pub trait CaptureStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn capture(&self, lane: &Lane) -> Result<Frame, CaptureError>;
}
