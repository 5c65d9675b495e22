//! cpal-backed output endpoint

use crate::output::{AudioOutput, AudioSink};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};
use zenplay_shared_types::{AudioErrorKind, AudioSpec, PlayerError, PlayerResult};

enum Command {
    Start(Sender<PlayerResult<()>>),
    Pause(Sender<PlayerResult<()>>),
    Resume(Sender<PlayerResult<()>>),
    Stop(Sender<PlayerResult<()>>),
    Close,
}

/// Output endpoint over the host's default shared-mode device
///
/// A dedicated thread owns the stream handle and executes control
/// commands; the OS audio thread drives the data callback, which
/// forwards straight to the injected [`AudioSink`].
pub struct CpalOutput {
    commands: Sender<Command>,
    spec: AudioSpec,
    owner: Option<thread::JoinHandle<()>>,
}

impl CpalOutput {
    /// Opens the default output device as close to `requested` as it allows
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::Audio`] with
    /// [`AudioErrorKind::DeviceInitFailed`] when no device exists or the
    /// stream cannot be built.
    pub fn open(requested: AudioSpec, sink: Arc<dyn AudioSink>) -> PlayerResult<Self> {
        let (commands, command_rx) = bounded::<Command>(4);
        let (ready_tx, ready_rx) = bounded::<PlayerResult<AudioSpec>>(1);

        let owner = thread::Builder::new()
            .name("zenplay-audio-device".to_string())
            .spawn(move || device_owner_loop(requested, sink, command_rx, ready_tx))
            .map_err(|error| device_error(format!("device thread spawn failed: {error}")))?;

        let spec = ready_rx
            .recv()
            .map_err(|_| device_error("device thread exited during open"))??;

        info!(
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            "audio output opened"
        );
        Ok(Self {
            commands,
            spec,
            owner: Some(owner),
        })
    }

    fn roundtrip(&self, build: impl FnOnce(Sender<PlayerResult<()>>) -> Command) -> PlayerResult<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.commands
            .send(build(reply_tx))
            .map_err(|_| device_error("audio device thread is gone"))?;
        reply_rx
            .recv()
            .map_err(|_| device_error("audio device thread dropped reply"))?
    }
}

impl AudioOutput for CpalOutput {
    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn start(&self) -> PlayerResult<()> {
        self.roundtrip(Command::Start)
    }

    fn pause(&self) -> PlayerResult<()> {
        self.roundtrip(Command::Pause)
    }

    fn resume(&self) -> PlayerResult<()> {
        self.roundtrip(Command::Resume)
    }

    fn stop(&self) -> PlayerResult<()> {
        self.roundtrip(Command::Stop)
    }

    fn close(&mut self) {
        let _ = self.commands.send(Command::Close);
        if let Some(owner) = self.owner.take() {
            let _ = owner.join();
        }
        debug!("audio output closed");
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        if self.owner.is_some() {
            self.close();
        }
    }
}

fn device_owner_loop(
    requested: AudioSpec,
    sink: Arc<dyn AudioSink>,
    commands: Receiver<Command>,
    ready: Sender<PlayerResult<AudioSpec>>,
) {
    let built = build_stream(requested, sink);
    let (stream, spec) = match built {
        Ok(pair) => pair,
        Err(error) => {
            let _ = ready.send(Err(error));
            return;
        }
    };
    let _ = ready.send(Ok(spec));

    while let Ok(command) = commands.recv() {
        match command {
            Command::Start(reply) | Command::Resume(reply) => {
                let _ = reply.send(stream.play().map_err(|error| {
                    device_error(format!("stream start failed: {error}"))
                }));
            }
            Command::Pause(reply) | Command::Stop(reply) => {
                let _ = reply.send(stream.pause().map_err(|error| {
                    device_error(format!("stream pause failed: {error}"))
                }));
            }
            Command::Close => break,
        }
    }
    // Stream drops here, on the thread that created it.
}

fn build_stream(
    requested: AudioSpec,
    sink: Arc<dyn AudioSink>,
) -> PlayerResult<(cpal::Stream, AudioSpec)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| device_error("no output device available"))?;
    debug!(
        device = device.name().unwrap_or_else(|_| "unknown".to_string()),
        "using audio device"
    );

    let default_config = device.default_output_config().map_err(|error| {
        device_error(format!("no default output config: {error}"))
    })?;

    // Ask for the requested format; fall back to the device default when
    // the host rejects it.
    for spec in [
        requested,
        AudioSpec::new(
            default_config.sample_rate().0,
            default_config.channels(),
        ),
    ] {
        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: SampleRate(spec.sample_rate),
            buffer_size: BufferSize::Default,
        };
        let callback_sink = Arc::clone(&sink);
        let result = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                callback_sink.fill(data);
            },
            |error| error!(%error, "audio stream error"),
            None,
        );
        match result {
            Ok(stream) => return Ok((stream, spec)),
            Err(error) => {
                warn!(
                    sample_rate = spec.sample_rate,
                    channels = spec.channels,
                    %error,
                    "output config rejected"
                );
            }
        }
    }

    Err(PlayerError::Audio {
        kind: AudioErrorKind::FormatNotSupported,
        details: "no supported output configuration".to_string(),
    })
}

fn device_error(details: impl Into<String>) -> PlayerError {
    PlayerError::Audio {
        kind: AudioErrorKind::DeviceInitFailed,
        details: details.into(),
    }
}
