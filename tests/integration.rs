//! Integration tests for voice-link.
//!
//! Note: Tests that require actual audio hardware are marked with
//! `#[ignore]` and should be run manually.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;
use voice_link::playout::{fade_in, fade_out};
use voice_link::{
    capture_pipeline, playout_channel, AdaptiveLimit, AudioChunk, CaptureChunker, CaptureCommand,
    CaptureConfig, ChannelSink, ChunkMessage, MessageSink, MockSource, PlayoutBuffer,
    PlayoutConfig, RenderQuantizer, Router, Sink, SinkError, StreamConfig, VoiceLinkError,
    MIN_DELAY_SENTINEL,
};

const QUANTUM: usize = 128;

/// A test sink that counts writes.
struct CountingSink {
    name: String,
    count: AtomicUsize,
}

impl CountingSink {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            count: AtomicUsize::new(0),
        }
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for CountingSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, _chunk: &AudioChunk) -> Result<(), SinkError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Counts every tracing event emitted while installed.
struct EventCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for EventCounter {
    fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn tick(buffer: &mut PlayoutBuffer) -> Vec<f32> {
    let mut out = vec![f32::NAN; QUANTUM];
    buffer.render_tick(&mut out);
    out
}

/// Renders until the partial-buffer countdown after a start has elapsed.
fn skip_countdown(buffer: &mut PlayoutBuffer) {
    while buffer.remaining_partial_buffer_samples() > 0 {
        assert!(tick(buffer).iter().all(|&s| s == 0.0));
    }
}

#[test]
fn test_scenario_start_after_threshold_fades_in() {
    let mut buffer = PlayoutBuffer::new(&PlayoutConfig::default());
    assert_eq!(buffer.initial_buffer_samples(), 1920);

    buffer.push(vec![0.5; 640].into());
    buffer.push(vec![0.5; 640].into());
    assert!(!buffer.is_started());
    buffer.push(vec![0.5; 640].into());
    assert!(buffer.is_started());

    skip_countdown(&mut buffer);
    let out = tick(&mut buffer);
    assert!(out.iter().any(|&s| s != 0.0));
    assert_eq!(out[0], 0.0);
    assert!((out[QUANTUM - 1] - 0.5).abs() < 1e-6);
    assert!(out.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_scenario_overflow_trims_to_start_threshold() {
    let config = PlayoutConfig {
        max_buffer: AdaptiveLimit::new(1_000, 500, 6_000),
        ..PlayoutConfig::default()
    };
    let mut buffer = PlayoutBuffer::new(&config);
    let keep = buffer.initial_buffer_samples() + buffer.partial_buffer_samples();
    assert_eq!(buffer.max_buffer_samples(), 24_000);

    buffer.push(vec![0.1; 30_000].into());

    assert_eq!(buffer.available_samples(), keep);
    assert_eq!(buffer.max_buffer_samples(), 24_000 + 12_000);
    assert_eq!(buffer.stats().dropped_samples, (30_000 - keep) as u64);
}

#[test]
fn test_scenario_overflow_growth_clamps_oversized_default() {
    // Default above cap: the first growth step lands on the cap
    let config = PlayoutConfig {
        max_buffer: AdaptiveLimit::new(10_000, 500, 6_000),
        ..PlayoutConfig::default()
    };
    assert!(config.validate().is_ok());

    let mut buffer = PlayoutBuffer::new(&config);
    let keep = buffer.initial_buffer_samples() + buffer.partial_buffer_samples();
    buffer.push(vec![0.1; keep + 240_000].into());

    assert_eq!(buffer.available_samples(), keep);
    assert_eq!(buffer.max_buffer_samples(), 144_000);
}

#[test]
fn test_scenario_network_stall_fades_out_and_waits_longer() {
    let mut buffer = PlayoutBuffer::new(&PlayoutConfig::default());
    buffer.push(vec![0.5; 1920 + 50].into());
    skip_countdown(&mut buffer);

    while buffer.available_samples() >= QUANTUM {
        tick(&mut buffer);
    }
    assert_eq!(buffer.available_samples(), (1920 + 50) % QUANTUM);
    let partial_before = buffer.partial_buffer_samples();

    let out = tick(&mut buffer);
    let copied = (1920 + 50) % QUANTUM;
    assert_eq!(out[0], 0.5);
    assert_eq!(out[copied - 1], 0.0);
    assert!(out[..copied].windows(2).all(|w| w[0] >= w[1]));
    assert!(out[copied..].iter().all(|&s| s == 0.0));

    assert!(!buffer.is_started());
    assert_eq!(buffer.partial_buffer_samples(), partial_before + 12_000);

    // Stalled: silence until the start threshold is reached again
    assert!(tick(&mut buffer).iter().all(|&s| s == 0.0));
}

#[test]
fn test_scenario_chunker_halves_48k_with_nearest_neighbor() {
    let mut chunker = CaptureChunker::new(&CaptureConfig::default());
    chunker.start();

    let block: Vec<f32> = (0..3840)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48_000.0).sin())
        .collect();
    let chunks = chunker.process(&block, 48_000);

    assert_eq!(chunks.len(), 1);
    let samples = &chunks[0].samples;
    assert_eq!(samples.len(), block.len() / 2);
    for (i, &s) in samples.iter().enumerate() {
        assert_eq!(s, block[2 * i]);
    }
}

#[test]
fn test_no_drops_below_overflow_threshold() {
    let mut buffer = PlayoutBuffer::new(&PlayoutConfig {
        max_buffer: AdaptiveLimit::new(200, 500, 6_000),
        ..PlayoutConfig::default()
    });
    let threshold = buffer.initial_buffer_samples()
        + buffer.partial_buffer_samples()
        + buffer.max_buffer_samples();

    let mut pushed = 0;
    for len in [100, 1000, 7, 2500, 333].iter().cycle() {
        if pushed + len >= threshold {
            break;
        }
        buffer.push(vec![0.2; *len].into());
        pushed += len;
    }

    assert_eq!(buffer.available_samples(), pushed);
    assert_eq!(buffer.stats().overflows, 0);
}

#[test]
fn test_every_tick_fills_the_block() {
    let mut buffer = PlayoutBuffer::new(&PlayoutConfig::default());
    let mut mock = MockSource::assistant();
    mock.generate_tone(220.0, 0.4, 1_000);

    for frame in mock.into_frames(&[480, 0, 2400, 17, 960]) {
        buffer.push(frame);
        for _ in 0..3 {
            let out = tick(&mut buffer);
            assert_eq!(out.len(), QUANTUM);
            assert!(out.iter().all(|s| s.is_finite()));
        }
    }
}

#[test]
fn test_reset_enforces_start_threshold() {
    let mut buffer = PlayoutBuffer::new(&PlayoutConfig::default());
    buffer.push(vec![0.5; 4000].into());
    skip_countdown(&mut buffer);
    assert!(tick(&mut buffer).iter().any(|&s| s != 0.0));

    buffer.reset();
    assert_eq!(buffer.telemetry().min_delay, MIN_DELAY_SENTINEL);

    let mut pushed = 0;
    while pushed + 500 < buffer.initial_buffer_samples() {
        buffer.push(vec![0.5; 500].into());
        pushed += 500;
        assert!(tick(&mut buffer).iter().all(|&s| s == 0.0));
    }
}

#[test]
fn test_delay_bounds_while_playing() {
    let mut buffer = PlayoutBuffer::new(&PlayoutConfig::default());
    let mut mock = MockSource::assistant();
    mock.generate_noise(2_000, 0.3);
    let mut frames = mock.into_frames(&[960, 480, 1920, 240]).into_iter();

    for i in 0..400 {
        if i % 4 == 0 {
            if let Some(frame) = frames.next() {
                buffer.push(frame);
            }
        }
        let playing = buffer.is_started()
            && buffer.available_samples() > 0
            && buffer.remaining_partial_buffer_samples() == 0;
        let mut out = [0.0; QUANTUM];
        let t = buffer.render_tick(&mut out);
        if playing {
            assert!(t.min_delay <= t.delay && t.delay <= t.max_delay, "{t:?}");
        }
    }
}

#[test]
fn test_fades_are_monotonic_gains() {
    for len in [1, 2, 3, 128, 1000] {
        let mut up = vec![1.0f32; len];
        fade_in(&mut up);
        assert!(up.windows(2).all(|w| w[0] <= w[1]));
        assert!(up.iter().all(|&g| (0.0..=1.0).contains(&g)));

        let mut down = vec![1.0f32; len];
        fade_out(&mut down);
        assert!(down.windows(2).all(|w| w[0] >= w[1]));
        assert!(down.iter().all(|&g| (0.0..=1.0).contains(&g)));
    }
}

#[test]
fn test_chunks_are_always_full_size() {
    let mut chunker = CaptureChunker::new(&CaptureConfig::default());
    chunker.start();

    let mut mock = MockSource::new(44_100, 1);
    mock.generate_sine(300.0, 1_000);

    let mut total = 0;
    for block in mock.blocks(441) {
        for chunk in chunker.process(block, 44_100) {
            assert_eq!(chunk.sample_count(), 1920);
            total += 1;
        }
        assert!(chunker.pending_samples() < 1920);
    }
    // One second at 24kHz holds 12.5 chunks
    assert_eq!(total, 12);
}

#[test]
fn test_chunker_identity_at_matching_rate() {
    let mut chunker = CaptureChunker::new(&CaptureConfig::default());
    chunker.start();

    let mut mock = MockSource::assistant();
    mock.generate_noise(160, 0.8);
    let input = mock.take_samples();

    let output: Vec<f32> = input
        .chunks(128)
        .flat_map(|block| chunker.process(block, 24_000))
        .flat_map(|chunk| chunk.samples.to_vec())
        .collect();
    assert_eq!(output, input[..output.len()]);
    assert_eq!(output.len(), 3840);
}

/// Drives the capture side end to end without hardware: mock device blocks
/// through the callback processor, the chunk ring and the router.
#[tokio::test]
async fn test_capture_pipeline_with_mock_source() {
    let mut mock = MockSource::new(48_000, 2);
    mock.generate_sine(440.0, 500);

    let (mut processor, mut control, mut chunks) =
        capture_pipeline(&CaptureConfig::default(), 48_000, 2, 16);

    let (tx, mut rx) = mpsc::channel::<AudioChunk>(16);
    let (msg_tx, mut msg_rx) = mpsc::channel::<ChunkMessage>(16);
    let counter = Arc::new(CountingSink::new("counter"));
    let sinks: Vec<Arc<dyn Sink>> = vec![
        Arc::new(ChannelSink::new(tx)),
        Arc::new(MessageSink::new(msg_tx)),
        Arc::clone(&counter) as Arc<dyn Sink>,
    ];
    let router = Router::new(sinks, &StreamConfig::default());
    router.start_sinks().await.unwrap();

    assert!(control.send(CaptureCommand::Start));
    for block in mock.blocks(480) {
        processor.process(block);
    }
    control.send(CaptureCommand::Stop);
    processor.process(&[0.0; 960]);

    let captured = chunks.drain();
    // 500ms at 24kHz: 6 whole chunks, the remainder stays pending
    assert_eq!(captured.len(), 6);
    for chunk in &captured {
        assert_eq!(router.write_chunk(chunk).await, 3);
    }

    for (i, expected) in captured.iter().enumerate() {
        let chunk = rx.recv().await.unwrap();
        assert!((chunk.timestamp.as_secs_f64() - 0.08 * i as f64).abs() < 1e-6);
        assert_eq!(chunk.samples, expected.samples);

        let ChunkMessage::AudioChunk { sample_count, .. } = msg_rx.recv().await.unwrap();
        assert_eq!(sample_count, 1920);
    }
    assert_eq!(counter.count(), 6);
    router.stop_sinks().await;
}

/// Drives the playout side end to end without hardware: irregular frames
/// through the sender, renderer and a stereo quantizer.
#[test]
fn test_playout_pipeline_with_mock_frames() {
    let config = PlayoutConfig {
        output_sample_rate: 48_000,
        ..PlayoutConfig::default()
    };
    let (mut sender, mut renderer) = playout_channel(64, &config);
    let mut quantizer = RenderQuantizer::new(config.render_quantum, 2);

    // Replies at 24kHz, upsampled by the sender
    let mut mock = MockSource::assistant();
    mock.generate_tone(300.0, 0.5, 400);
    for frame in mock.into_frames(&[1200, 600, 2400]) {
        sender.send_frame_at(&frame, 24_000).unwrap();
    }

    let mut device = vec![0.0f32; 441 * 2];
    let mut heard = 0;
    for _ in 0..100 {
        quantizer.fill(&mut device, |block| {
            renderer.render(block);
        });
        assert!(device.chunks_exact(2).all(|f| f[0] == f[1]));
        heard += device.iter().filter(|&&s| s != 0.0).count();
    }

    let telemetry = renderer.buffer().telemetry();
    assert!(heard > 0);
    assert!((telemetry.actual_audio_played - 0.4).abs() < 1e-3);
    assert_eq!(renderer.buffer().available_samples(), 0);
}

/// Overflow, start, underrun, reset and a full chunk ring all happen on the
/// callback side without emitting a single log event.
#[test]
fn test_callback_paths_do_not_log() {
    let config = PlayoutConfig {
        output_sample_rate: 1000,
        render_quantum: 10,
        initial_buffer: Duration::from_millis(20),
        partial_buffer: AdaptiveLimit::new(5, 10, 50),
        max_buffer: AdaptiveLimit::new(30, 10, 60),
        silence_threshold: 1e-4,
    };
    let (mut sender, mut renderer) = playout_channel(8, &config);
    let capture_config = CaptureConfig {
        target_sample_rate: 1000,
        chunk_duration: Duration::from_millis(10),
    };
    let (mut processor, mut control, chunks) = capture_pipeline(&capture_config, 1000, 1, 1);
    control.send(CaptureCommand::Start);

    let events = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(EventCounter(Arc::clone(&events)));
    tracing::subscriber::with_default(subscriber, || {
        // 100 samples trim to 25: 5 countdown, 10, 10, then a 5-sample underrun
        sender.send_frame(vec![0.5; 100]).unwrap();
        let mut out = [0.0f32; 10];
        for _ in 0..6 {
            renderer.render(&mut out);
        }
        sender.reset().unwrap();
        renderer.render(&mut out);

        processor.process(&[0.1; 50]);
    });

    let stats = renderer.buffer().stats();
    assert_eq!(stats.overflows, 1);
    assert_eq!(stats.starts, 1);
    assert_eq!(stats.underruns, 1);
    assert_eq!(stats.resets, 1);
    assert_eq!(chunks.dropped(), 4);
    assert_eq!(events.load(Ordering::SeqCst), 0);
}

/// A network thread and a render thread share only the playout channel:
/// every sample comes out exactly once, in send order.
#[test]
fn test_threaded_sender_and_renderer_preserve_order() {
    const FRAMES: usize = 200;
    const FRAME_LEN: usize = 100;
    const TOTAL: usize = FRAMES * FRAME_LEN;

    // Nothing counts as audible, so running dry never fades real samples out
    let config = PlayoutConfig {
        silence_threshold: f32::MAX,
        ..PlayoutConfig::default()
    };
    let rate = f64::from(config.output_sample_rate);
    let (mut sender, mut renderer) = playout_channel(8, &config);

    let network = std::thread::spawn(move || {
        for i in 0..FRAMES {
            let frame = vec![(i + 1) as f32; FRAME_LEN];
            loop {
                match sender.send_frame(frame.clone()) {
                    Ok(()) => break,
                    Err(VoiceLinkError::PlayoutChannelFull { .. }) => std::thread::yield_now(),
                    Err(e) => panic!("unexpected send error: {e}"),
                }
            }
        }
    });

    let render = std::thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut heard = Vec::with_capacity(TOTAL);
        let mut block = [0.0f32; QUANTUM];
        let mut played = 0usize;
        while heard.len() < TOTAL && Instant::now() < deadline {
            let telemetry = renderer.render(&mut block);
            let now = (telemetry.actual_audio_played * rate).round() as usize;
            let copied = now - played;
            heard.extend_from_slice(&block[..copied]);
            played = now;
            if copied == 0 {
                std::thread::yield_now();
            }
        }
        heard
    });

    network.join().unwrap();
    let heard = render.join().unwrap();
    assert_eq!(heard.len(), TOTAL);

    let expected: Vec<f32> = (0..TOTAL).map(|k| (k / FRAME_LEN + 1) as f32).collect();
    // The first block is faded in; everything after it is bit-exact
    assert!(heard[..QUANTUM].iter().zip(&expected).all(|(h, e)| h <= e));
    assert_eq!(heard[QUANTUM..], expected[QUANTUM..]);
}

/// This test requires actual audio hardware and should be run manually.
#[tokio::test]
#[ignore = "requires audio hardware"]
async fn test_real_session() {
    use voice_link::VoiceLink;

    let (tx, mut rx) = mpsc::channel::<AudioChunk>(100);

    let mut session = VoiceLink::builder()
        .add_sink(ChannelSink::new(tx))
        .start()
        .await
        .expect("Failed to start session");

    let mut playout = session.take_playout_sender().unwrap();
    assert!(session.take_playout_sender().is_err());
    session.start_recording();

    // Loop captured audio straight back out
    let looped = tokio::time::timeout(Duration::from_secs(1), async {
        let mut chunks = 0;
        while let Some(chunk) = rx.recv().await {
            playout.send_frame_at(&chunk.samples, chunk.sample_rate).unwrap();
            chunks += 1;
            if chunks >= 10 {
                break;
            }
        }
        chunks
    })
    .await;

    let stats = session.stats();
    session.stop().await.expect("Failed to stop session");

    if let Ok(chunks) = looped {
        println!("Looped {chunks} chunks, stats: {stats:?}");
        assert!(chunks > 0, "Should have captured some audio");
    }
}
