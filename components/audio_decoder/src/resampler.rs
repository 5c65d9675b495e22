//! Output-format adaptation

use crate::error::{AudioDecodeError, AudioDecodeResult};
use ffmpeg_next as ffmpeg;
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::format::Sample;
use ffmpeg::frame::Audio;
use ffmpeg::software::resampling;
use ffmpeg::ChannelLayout;
use tracing::debug;
use zenplay_shared_types::AudioSpec;

/// Converts decoded frames to the device's interleaved f32 format
///
/// Built lazily from the first frame's real format; rate-conversion
/// residue is buffered inside the library's context between calls, so
/// consecutive frames convert seamlessly. [`reset`](Resampler::reset)
/// drops that state on seek.
pub struct Resampler {
    context: Option<resampling::Context>,
    output: AudioSpec,
}

impl Resampler {
    /// Creates a resampler targeting the negotiated device format
    pub fn new(output: AudioSpec) -> Self {
        Self {
            context: None,
            output,
        }
    }

    /// The output format this resampler produces
    pub fn output_spec(&self) -> AudioSpec {
        self.output
    }

    /// Converts one frame, appending interleaved f32 samples to `out`
    ///
    /// Returns the number of sample frames appended.
    ///
    /// # Errors
    ///
    /// Returns [`AudioDecodeError::ResampleFailed`] when the conversion
    /// context cannot be built or run.
    pub fn convert(&mut self, frame: &Audio, out: &mut Vec<f32>) -> AudioDecodeResult<usize> {
        let context = match self.context.as_mut() {
            Some(context) => context,
            None => {
                let source_layout = if frame.channel_layout().channels() > 0 {
                    frame.channel_layout()
                } else {
                    ChannelLayout::default(frame.channels() as i32)
                };
                let built = resampling::Context::get(
                    frame.format(),
                    source_layout,
                    frame.rate(),
                    Sample::F32(SampleType::Packed),
                    output_layout(self.output.channels),
                    self.output.sample_rate,
                )
                .map_err(|error| AudioDecodeError::ResampleFailed {
                    details: error.to_string(),
                })?;
                debug!(
                    from_rate = frame.rate(),
                    from_channels = frame.channels(),
                    to_rate = self.output.sample_rate,
                    to_channels = self.output.channels,
                    "resampler initialized"
                );
                self.context.insert(built)
            }
        };

        let mut converted = Audio::empty();
        context
            .run(frame, &mut converted)
            .map_err(|error| AudioDecodeError::ResampleFailed {
                details: error.to_string(),
            })?;

        Ok(append_samples(&converted, self.output.channels, out))
    }

    /// Drains samples the context is still holding
    ///
    /// Called at end of stream so the tail of the audio is not lost.
    pub fn drain(&mut self, out: &mut Vec<f32>) -> AudioDecodeResult<usize> {
        let Some(context) = self.context.as_mut() else {
            return Ok(0);
        };
        let mut converted = Audio::empty();
        context
            .flush(&mut converted)
            .map_err(|error| AudioDecodeError::ResampleFailed {
                details: error.to_string(),
            })?;
        Ok(append_samples(&converted, self.output.channels, out))
    }

    /// Forgets source format and buffered residue
    ///
    /// The next [`convert`](Resampler::convert) rebuilds the context from
    /// its frame; used on seek.
    pub fn reset(&mut self) {
        self.context = None;
    }
}

fn output_layout(channels: u16) -> ChannelLayout {
    match channels {
        1 => ChannelLayout::MONO,
        2 => ChannelLayout::STEREO,
        other => ChannelLayout::default(other as i32),
    }
}

fn append_samples(converted: &Audio, channels: u16, out: &mut Vec<f32>) -> usize {
    let frames = converted.samples();
    if frames == 0 {
        return 0;
    }
    let values = frames * channels as usize;
    // Packed f32 output: every sample lives interleaved in plane 0. The
    // plane's slice is padded to the line size, so cut at the real count.
    let data = converted.data(0);
    let samples =
        unsafe { std::slice::from_raw_parts(data.as_ptr() as *const f32, values) };
    out.extend_from_slice(samples);
    frames
}
