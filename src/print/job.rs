use futures::channel::mpsc::Sender;
use log::{debug, info};
use tokio::time::{sleep, Duration};

use crate::device::types::{send_state, DeviceEvent, SessionState};
use crate::error::DeviceError;
use crate::print::segments::Segment;

/// Write endpoint for print segments. Implemented by `PrinterSession`; tests
/// substitute a recording sink.
#[allow(async_fn_in_trait)]
pub trait SegmentSink {
    async fn write_segment(&self, payload: &[u8]) -> Result<(), DeviceError>;
}

/// Sends all segments strictly in order, awaiting each write and pausing for
/// `delay` before the next. This is pacing, not flow control: a
/// write-without-response characteristic gives the printer no backpressure
/// channel, so the pause is all that keeps its buffer from flooding.
pub async fn run_job<S: SegmentSink>(
    sink: &S,
    segments: &[Segment],
    delay: Duration,
    events: &mut Sender<DeviceEvent>,
) -> Result<(), DeviceError> {
    send_state(events, SessionState::Printing).await;
    info!("Printing {} segment(s)", segments.len());

    for (index, segment) in segments.iter().enumerate() {
        debug!(
            "Writing segment {}/{} ({} bytes)",
            index + 1,
            segments.len(),
            segment.bytes().len()
        );
        sink.write_segment(segment.bytes()).await?;
        sleep(delay).await;
    }

    send_state(events, SessionState::Connected).await;
    Ok(())
}
