// Audio output using cpal
// A dedicated thread owns the output stream; feeders talk to it through a ring buffer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use crate::error::{AppError, AppResult};

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// Handle to the shared output device.
///
/// The cpal stream itself is not `Send`, so it lives on a parked thread for
/// the lifetime of the process; this handle carries the producer half of
/// the ring buffer plus the negotiated device parameters.
#[derive(Clone)]
pub struct OutputHandle {
    producer: Arc<Mutex<RingProducer>>,
    clear_flag: Arc<AtomicBool>,
    sample_rate: u32,
    channels: u16,
}

impl OutputHandle {
    /// Spawn the audio output thread and open the default device.
    ///
    /// The stream starts playing immediately and keeps running for the
    /// process lifetime, emitting silence whenever the ring buffer is
    /// empty, so playback never has to wait for a device resume.
    pub fn spawn() -> AppResult<Self> {
        let (tx, rx) = mpsc::channel();

        std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || match open_stream() {
                Ok((stream, handle)) => {
                    let _ = tx.send(Ok(handle));
                    // Keep the stream alive; the thread has nothing else to do.
                    let _keepalive = stream;
                    loop {
                        std::thread::park();
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                }
            })
            .map_err(|e| AppError::Playback(format!("failed to spawn audio thread: {}", e)))?;

        rx.recv()
            .map_err(|_| AppError::Playback("audio output thread exited during init".to_string()))?
    }

    /// Write samples to the output buffer.
    /// Returns the number of samples actually written.
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut producer = self.producer.lock();
        let mut written = 0;

        for &sample in samples {
            if producer.try_push(sample).is_ok() {
                written += 1;
            } else {
                // Buffer full, let the caller retry the rest
                break;
            }
        }

        written
    }

    /// Number of samples queued but not yet consumed by the device.
    pub fn queued(&self) -> usize {
        self.producer.lock().occupied_len()
    }

    /// Drop any queued samples.
    /// The audio callback drains the buffer on its next invocation.
    pub fn clear(&self) {
        self.clear_flag.store(true, Ordering::SeqCst);
    }

    /// Whether a clear request is still pending.
    pub fn clearing(&self) -> bool {
        self.clear_flag.load(Ordering::SeqCst)
    }

    /// Get the output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of output channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

fn open_stream() -> AppResult<(Stream, OutputHandle)> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| AppError::Playback("no output device available".to_string()))?;

    let config = device
        .default_output_config()
        .map_err(|e| AppError::Playback(format!("failed to get default output config: {}", e)))?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels();

    // ~250ms of audio at the device rate
    let ring_size = (sample_rate as usize * channels as usize) / 4;
    let rb = HeapRb::<f32>::new(ring_size.max(1024));
    let (producer, consumer) = rb.split();
    let producer = Arc::new(Mutex::new(producer));
    let consumer = Arc::new(Mutex::new(consumer));

    let clear_flag = Arc::new(AtomicBool::new(false));
    let clear_flag_clone = clear_flag.clone();

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            build_stream::<f32>(&device, &config.into(), consumer, clear_flag_clone)?
        }
        cpal::SampleFormat::I16 => {
            build_stream::<i16>(&device, &config.into(), consumer, clear_flag_clone)?
        }
        cpal::SampleFormat::U16 => {
            build_stream::<u16>(&device, &config.into(), consumer, clear_flag_clone)?
        }
        format => {
            return Err(AppError::Playback(format!(
                "unsupported sample format: {:?}",
                format
            )))
        }
    };

    stream
        .play()
        .map_err(|e| AppError::Playback(format!("failed to start stream: {}", e)))?;

    log::info!(
        "audio output ready: {} Hz, {} channel(s)",
        sample_rate,
        channels
    );

    Ok((
        stream,
        OutputHandle {
            producer,
            clear_flag,
            sample_rate,
            channels,
        },
    ))
}

fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
    device: &cpal::Device,
    config: &StreamConfig,
    consumer: Arc<Mutex<RingConsumer>>,
    clear_flag: Arc<AtomicBool>,
) -> AppResult<Stream> {
    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut consumer = consumer.lock();

                // If clear flag is set, drain the buffer and output silence
                if clear_flag.swap(false, Ordering::SeqCst) {
                    while consumer.try_pop().is_some() {}
                }

                for sample in data.iter_mut() {
                    let value = consumer.try_pop().unwrap_or(0.0);
                    *sample = T::from_sample(value);
                }
            },
            move |err| {
                log::error!("audio output error: {}", err);
            },
            None,
        )
        .map_err(|e| AppError::Playback(format!("failed to build output stream: {}", e)))?;

    Ok(stream)
}
