//! Output device contracts

use zenplay_shared_types::{AudioSpec, PlayerResult};

/// Supplier of PCM for the device callback
///
/// Implemented by the audio player. The callback runs on the OS audio
/// thread; implementations hold only short internal locks and must fill
/// the whole buffer (real data or silence) every call.
pub trait AudioSink: Send + Sync {
    /// Fills `output` with interleaved f32 samples
    fn fill(&self, output: &mut [f32]);
}

/// A shared-mode output endpoint
///
/// `open` negotiates a format and returns the actual one; everything the
/// player pushes afterwards is in that format.
pub trait AudioOutput: Send {
    /// The format the device was actually opened with
    fn spec(&self) -> AudioSpec;

    /// Starts callback delivery
    fn start(&self) -> PlayerResult<()>;

    /// Pauses the device through the platform's pause operation
    fn pause(&self) -> PlayerResult<()>;

    /// Resumes callback delivery after a pause
    fn resume(&self) -> PlayerResult<()>;

    /// Stops callback delivery
    fn stop(&self) -> PlayerResult<()>;

    /// Releases the device
    fn close(&mut self);

    /// Current device-buffer occupancy in sample frames
    ///
    /// Used to compensate the audio clock for submission-vs-playback
    /// latency on backends that expose it; `None` otherwise.
    fn buffered_frames(&self) -> Option<u64> {
        None
    }
}
