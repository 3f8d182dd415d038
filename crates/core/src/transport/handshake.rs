//! Sensor configuration handshake
//!
//! Three commands at fixed delays: enable configuration, set sensitivity,
//! end configuration. The sensor acknowledges each command but the ACKs are
//! not awaited; a failed write aborts the sequence and the next reconnect
//! runs it again.

use tokio::time::sleep;

use super::FrameWriter;
use crate::config::Timing;
use crate::protocol::FrameCodec;
use crate::types::CommandFrame;
use crate::{CoreError, Result};

/// The command sequence for a given sensitivity
pub fn commands(sensitivity: u8) -> [CommandFrame; 3] {
    [
        CommandFrame::enable_config(),
        CommandFrame::set_sensitivity(sensitivity),
        CommandFrame::end_config(),
    ]
}

/// Run the handshake on a freshly opened device
pub async fn run(mut writer: Box<dyn FrameWriter>, sensitivity: u8, timing: Timing) -> Result<()> {
    sleep(timing.settle_delay).await;

    for (step, cmd) in commands(sensitivity).iter().enumerate() {
        if step > 0 {
            sleep(timing.handshake_step).await;
        }

        let frame = FrameCodec::encode(cmd)?;
        let len = frame.len();
        let (returned, written) = write_blocking(writer, frame)
            .await
            .map_err(|e| CoreError::Serial(format!("{} write task failed: {}", cmd.name(), e)))?;
        writer = returned;
        written.map_err(|e| CoreError::Serial(format!("{} write failed: {}", cmd.name(), e)))?;
        tracing::debug!("Sent {} ({} bytes)", cmd.name(), len);
    }

    tracing::info!("Sensor sensitivity updated to {}%", sensitivity.min(100));
    Ok(())
}

/// Serial writes block, so they run on the blocking pool; the writer is
/// handed back with the outcome.
async fn write_blocking(
    writer: Box<dyn FrameWriter>,
    frame: Vec<u8>,
) -> std::result::Result<(Box<dyn FrameWriter>, std::io::Result<()>), tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || {
        let mut writer = writer;
        let written = writer.write_frame(&frame);
        (writer, written)
    })
    .await
}
