//! Integration tests for dsd-bridge.
//!
//! Each test drives a real decoder thread through the public API, using
//! small purpose-built decoders to control timing and progress.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dsd_bridge::decoder::{AudioOut, Decoder, MockDecoder};
use dsd_bridge::format::{f32_to_i16, i16_to_f32};
use dsd_bridge::{
    BridgeError, BridgeEvent, BridgeOptions, DecodeBridge, DecoderConfig, FrameMode,
    ModulationMode, RfModulation, StopReason, StreamDriver,
};
use parking_lot::Mutex;
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Collects every event a bridge emits.
fn event_log() -> (
    Arc<Mutex<Vec<BridgeEvent>>>,
    impl Fn(BridgeEvent) + Send + Sync + 'static,
) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    (events, move |event| sink.lock().push(event))
}

/// A decoder that blocks in `decode` until the test releases it.
struct GatedDecoder {
    gate: mpsc::Receiver<()>,
    entered: Arc<AtomicBool>,
}

impl Decoder for GatedDecoder {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn decode(
        &mut self,
        _config: &DecoderConfig,
        input: &[f32],
        audio: &mut AudioOut<'_>,
    ) -> usize {
        self.entered.store(true, Ordering::SeqCst);
        let _ = self.gate.recv();
        audio.push_samples(&[1000; 40]);
        input.len()
    }
}

/// A decoder that counts its decode steps.
struct CountingDecoder {
    steps: Arc<AtomicUsize>,
}

impl Decoder for CountingDecoder {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn decode(
        &mut self,
        _config: &DecoderConfig,
        input: &[f32],
        _audio: &mut AudioOut<'_>,
    ) -> usize {
        self.steps.fetch_add(1, Ordering::SeqCst);
        input.len()
    }
}

/// A decoder that takes 100 samples per step but refuses tails shorter than 200.
struct StallingDecoder;

impl Decoder for StallingDecoder {
    fn name(&self) -> &'static str {
        "stalling"
    }

    fn decode(
        &mut self,
        _config: &DecoderConfig,
        input: &[f32],
        _audio: &mut AudioOut<'_>,
    ) -> usize {
        if input.len() < 200 {
            0
        } else {
            100
        }
    }
}

/// A decoder that panics on its first decode step.
struct PanickingDecoder;

impl Decoder for PanickingDecoder {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn decode(
        &mut self,
        _config: &DecoderConfig,
        _input: &[f32],
        _audio: &mut AudioOut<'_>,
    ) -> usize {
        panic!("decoder blew up");
    }
}

/// A decoder whose startup outlasts a short shutdown timeout.
struct SlowStartDecoder {
    startup: Duration,
}

impl Decoder for SlowStartDecoder {
    fn name(&self) -> &'static str {
        "slow-start"
    }

    fn on_start(&mut self, _config: &DecoderConfig) {
        thread::sleep(self.startup);
    }

    fn decode(
        &mut self,
        _config: &DecoderConfig,
        input: &[f32],
        _audio: &mut AudioOut<'_>,
    ) -> usize {
        input.len()
    }
}

#[test]
fn test_partial_output_is_returned_as_is() {
    init_tracing();
    let mut bridge = DecodeBridge::builder()
        .frame_mode(FrameMode::P25Phase1)
        .modulation(ModulationMode::C4fm)
        .decoder(MockDecoder::fixed(40))
        .start()
        .unwrap();

    let input = vec![0.0f32; 256];
    let mut output = vec![0.0f32; 160];
    let result = bridge.process(&input, &mut output).unwrap();

    assert_eq!(result.consumed, 256);
    assert_eq!(result.produced, 40);
    assert!(output[..40].iter().any(|&s| s != 0.0));
    bridge.close().unwrap();
}

#[test]
fn test_no_audio_yet_produces_zero() {
    init_tracing();
    let mut bridge = DecodeBridge::builder()
        .decoder(MockDecoder::silent())
        .start()
        .unwrap();

    let mut output = vec![0.5f32; 160];
    let result = bridge.process(&[0.1; 512], &mut output).unwrap();

    assert_eq!(result.consumed, 512);
    assert_eq!(result.produced, 0);
    // nothing written past produced
    assert!(output.iter().all(|&s| s == 0.5));
    bridge.close().unwrap();
}

#[test]
fn test_pass_through_reports_full_buffer() {
    init_tracing();
    let mut bridge = DecodeBridge::builder()
        .empty_frames(true)
        .decoder(MockDecoder::fixed(40))
        .start()
        .unwrap();
    assert_eq!(bridge.output_multiple(), None);

    let mut output = vec![9.0f32; 123];
    let result = bridge.process(&[0.0; 256], &mut output).unwrap();

    assert_eq!(result.produced, 123);
    assert!(output[40..].iter().all(|&s| s == 0.0));
    assert!(output[..40].iter().all(|&s| s != 9.0));

    let result = bridge.process(&[], &mut output).unwrap();
    assert_eq!(result.consumed, 0);
    assert_eq!(result.produced, 123);
    assert!(output.iter().all(|&s| s == 0.0));
    bridge.close().unwrap();
}

#[test]
fn test_forced_protocol_overrides_modulation() {
    init_tracing();
    let bridge = DecodeBridge::builder()
        .frame_mode(FrameMode::Nxdn96)
        .modulation(ModulationMode::Qpsk)
        .decoder(MockDecoder::silent())
        .start()
        .unwrap();

    let config = bridge.config();
    assert!(config.protocols.nxdn96);
    assert!(config.modulations.gfsk);
    assert!(!config.modulations.qpsk);
    assert!(!config.modulations.c4fm);
    assert_eq!(config.rf_modulation, RfModulation::Gfsk);
    assert_eq!(config.rf_modulation.as_u8(), 2);
    bridge.close().unwrap();
}

#[test]
fn test_each_call_sees_its_own_input() {
    init_tracing();
    let mut bridge = DecodeBridge::builder()
        .decoder(MockDecoder::echo())
        .start()
        .unwrap();

    let mut output = vec![0.0f32; 320];
    for call in 0..5 {
        let input: Vec<f32> = (0..256).map(|i| (call * 256 + i) as f32 / 4096.0).collect();
        let result = bridge.process(&input, &mut output).unwrap();

        assert_eq!(result.produced, 256);
        for (got, &sent) in output[..256].iter().zip(&input) {
            assert_eq!(*got, i16_to_f32(f32_to_i16(sent)));
        }
    }
    bridge.close().unwrap();
}

#[test]
fn test_leftover_audio_is_kept_in_order() {
    init_tracing();
    let mut bridge = DecodeBridge::builder()
        .decoder(MockDecoder::echo())
        .start()
        .unwrap();

    let input: Vec<f32> = (0..1024).map(|i| i as f32 / 2048.0).collect();
    let mut stream = Vec::new();
    let mut output = vec![0.0f32; 160];

    for chunk in input.chunks(256) {
        let result = bridge.process(chunk, &mut output).unwrap();
        assert_eq!(result.produced, 160);
        stream.extend_from_slice(&output[..result.produced]);
    }
    // 1024 decoded, 640 delivered; the rest comes out on later calls
    for _ in 0..3 {
        let result = bridge.process(&[], &mut output).unwrap();
        stream.extend_from_slice(&output[..result.produced]);
    }

    assert_eq!(stream.len(), 1024);
    let expected: Vec<f32> = input.iter().map(|&s| i16_to_f32(f32_to_i16(s))).collect();
    assert_eq!(stream, expected);
    bridge.close().unwrap();
}

#[test]
fn test_caller_blocks_until_decoder_publishes() {
    init_tracing();
    let (release, gate) = mpsc::channel();
    let entered = Arc::new(AtomicBool::new(false));
    let returned = Arc::new(AtomicBool::new(false));

    let mut bridge = DecodeBridge::builder()
        .decoder(GatedDecoder {
            gate,
            entered: Arc::clone(&entered),
        })
        .start()
        .unwrap();

    let host = {
        let returned = Arc::clone(&returned);
        thread::spawn(move || {
            let mut output = vec![0.0f32; 160];
            let result = bridge.process(&[0.0; 256], &mut output).unwrap();
            returned.store(true, Ordering::SeqCst);
            (bridge, result)
        })
    };

    while !entered.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(50));
    assert!(!returned.load(Ordering::SeqCst));

    release.send(()).unwrap();
    let (bridge, result) = host.join().unwrap();
    assert!(returned.load(Ordering::SeqCst));
    assert_eq!(result.produced, 40);
    bridge.close().unwrap();
}

#[test]
fn test_close_stops_decoder_thread() {
    init_tracing();
    let steps = Arc::new(AtomicUsize::new(0));
    let (events, on_event) = event_log();

    let mut bridge = DecodeBridge::builder()
        .instance(7)
        .decoder(CountingDecoder {
            steps: Arc::clone(&steps),
        })
        .on_event(on_event)
        .start()
        .unwrap();

    let mut output = vec![0.0f32; 160];
    for _ in 0..3 {
        bridge.process(&[0.0; 100], &mut output).unwrap();
    }
    assert_eq!(steps.load(Ordering::SeqCst), 3);
    assert!(bridge.is_running());

    bridge.close().unwrap();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(steps.load(Ordering::SeqCst), 3);

    let events = events.lock();
    assert_eq!(
        events.first(),
        Some(&BridgeEvent::DecoderStarted {
            instance: 7,
            decoder: "counting".to_string(),
        })
    );
    let stops: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, BridgeEvent::DecoderStopped { .. }))
        .collect();
    assert_eq!(
        stops,
        vec![&BridgeEvent::DecoderStopped {
            instance: 7,
            reason: StopReason::Cancelled,
        }]
    );
}

#[test]
fn test_drop_closes_bridge() {
    init_tracing();
    let (events, on_event) = event_log();
    {
        let _bridge = DecodeBridge::builder()
            .decoder(MockDecoder::silent())
            .on_event(on_event)
            .start()
            .unwrap();
    }

    let events = events.lock();
    assert!(events.iter().any(|e| matches!(
        e,
        BridgeEvent::DecoderStopped {
            reason: StopReason::Cancelled,
            ..
        }
    )));
}

#[test]
fn test_close_before_first_call() {
    init_tracing();
    let bridge = DecodeBridge::builder()
        .decoder(MockDecoder::silent())
        .start()
        .unwrap();
    bridge.close().unwrap();
}

#[test]
fn test_shutdown_timeout_is_reported() {
    init_tracing();
    let bridge = DecodeBridge::builder()
        .decoder(SlowStartDecoder {
            startup: Duration::from_millis(300),
        })
        .options(BridgeOptions {
            shutdown_timeout: Some(Duration::from_millis(20)),
            ..Default::default()
        })
        .instance(5)
        .start()
        .unwrap();

    let err = bridge.close().unwrap_err();
    assert!(matches!(
        err,
        BridgeError::ShutdownTimeout { instance: 5, waited } if waited == Duration::from_millis(20)
    ));
}

#[test]
fn test_decoder_panic_releases_caller() {
    init_tracing();
    let (events, on_event) = event_log();
    let mut bridge = DecodeBridge::builder()
        .instance(3)
        .decoder(PanickingDecoder)
        .on_event(on_event)
        .start()
        .unwrap();

    let mut output = vec![0.0f32; 160];
    let err = bridge.process(&[0.0; 64], &mut output).unwrap_err();
    assert!(matches!(err, BridgeError::DecoderStopped { instance: 3 }));

    let err = bridge.process(&[0.0; 64], &mut output).unwrap_err();
    assert!(matches!(err, BridgeError::DecoderStopped { instance: 3 }));

    bridge.close().unwrap();
    assert!(events.lock().contains(&BridgeEvent::DecoderStopped {
        instance: 3,
        reason: StopReason::Panicked,
    }));
}

#[test]
fn test_stalled_decoder_still_consumes_everything() {
    init_tracing();
    let (events, on_event) = event_log();
    let mut bridge = DecodeBridge::builder()
        .decoder(StallingDecoder)
        .on_event(on_event)
        .start()
        .unwrap();

    let mut output = vec![0.0f32; 160];
    let result = bridge.process(&[0.0; 256], &mut output).unwrap();
    assert_eq!(result.consumed, 256);
    assert_eq!(result.produced, 0);
    assert_eq!(bridge.stats().stalled_passes, 1);
    assert!(events.lock().contains(&BridgeEvent::InputStalled {
        instance: 0,
        discarded_samples: 156,
    }));
    bridge.close().unwrap();
}

#[test]
fn test_audio_overflow_is_counted() {
    init_tracing();
    let (events, on_event) = event_log();
    let mut bridge = DecodeBridge::builder()
        .decoder(MockDecoder::fixed(400))
        .options(BridgeOptions {
            audio_capacity: 100,
            ..Default::default()
        })
        .on_event(on_event)
        .start()
        .unwrap();

    let mut output = vec![0.0f32; 160];
    let result = bridge.process(&[0.0; 32], &mut output).unwrap();
    assert_eq!(result.produced, 100);
    assert_eq!(bridge.stats().overflowed_samples, 300);
    assert!(events.lock().contains(&BridgeEvent::AudioOverflow {
        instance: 0,
        dropped_samples: 300,
    }));
    bridge.close().unwrap();
}

#[test]
fn test_reset_clears_buffered_audio_and_counters() {
    init_tracing();
    let (events, on_event) = event_log();
    let mut bridge = DecodeBridge::builder()
        .decoder(MockDecoder::fixed(400))
        .on_event(on_event)
        .start()
        .unwrap();

    let mut output = vec![0.0f32; 160];
    bridge.process(&[0.0; 250], &mut output).unwrap();
    assert_eq!(bridge.counters().symbols, 25);

    bridge.reset_decoder().unwrap();
    assert_eq!(bridge.counters().symbols, 0);
    assert_eq!(bridge.stats().resets, 1);

    let result = bridge.process(&[], &mut output).unwrap();
    assert_eq!(result.produced, 0);
    let events = events.lock();
    assert!(events.contains(&BridgeEvent::DecoderReset { instance: 0 }));
    drop(events);
    bridge.close().unwrap();
}

#[test]
fn test_stats_track_calls() {
    init_tracing();
    let mut bridge = DecodeBridge::builder()
        .decoder(MockDecoder::voice_frames(960))
        .start()
        .unwrap();

    let input = vec![0.0f32; 9600];
    let audio = StreamDriver::new(960, 160)
        .run(&mut bridge, &input)
        .unwrap();
    assert_eq!(audio.len(), 1600);

    let stats = bridge.stats();
    assert_eq!(stats.calls, 10);
    assert_eq!(stats.samples_consumed, 9600);
    assert_eq!(stats.samples_produced, 1600);
    assert_eq!(stats.stalled_passes, 0);
    bridge.close().unwrap();
}

#[test]
fn test_slow_decoder_keeps_stream_consistent() {
    init_tracing();
    let mut bridge = DecodeBridge::builder()
        .decoder(
            MockDecoder::voice_frames(480)
                .with_step_limit(120)
                .with_delay(Duration::from_millis(1)),
        )
        .start()
        .unwrap();

    let input = vec![0.0f32; 2400];
    let driver = StreamDriver::new(600, 320);
    let audio = driver.run(&mut bridge, &input).unwrap();
    let rest = driver.flush(&mut bridge, 8).unwrap();
    assert_eq!(audio.len() + rest.len(), 5 * 160);
    bridge.close().unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_consumes_all_input_and_bounds_output(
        input_len in 0usize..2000,
        output_len in 0usize..800,
        per_step in 0usize..500,
    ) {
        let mut bridge = DecodeBridge::builder()
            .decoder(MockDecoder::fixed(per_step))
            .start()
            .unwrap();

        let input = vec![0.0f32; input_len];
        let mut output = vec![0.0f32; output_len];
        let result = bridge.process(&input, &mut output).unwrap();

        prop_assert_eq!(result.consumed, input_len);
        prop_assert!(result.produced <= output_len);
        bridge.close().unwrap();
    }

    #[test]
    fn prop_pass_through_fills_output(
        input_len in 0usize..2000,
        output_len in 0usize..800,
        per_step in 0usize..500,
    ) {
        let mut bridge = DecodeBridge::builder()
            .empty_frames(true)
            .decoder(MockDecoder::fixed(per_step))
            .start()
            .unwrap();

        let input = vec![0.0f32; input_len];
        let mut output = vec![1.0f32; output_len];
        let result = bridge.process(&input, &mut output).unwrap();

        prop_assert_eq!(result.consumed, input_len);
        prop_assert_eq!(result.produced, output_len);
        bridge.close().unwrap();
    }
}
