//! EQ Engine - Main Entry Point
//!
//! The EqEngine owns the parameter store and the control thread, and hands
//! out the audio-thread half (`EqProcessor`) on every `prepare()`.
//!
//! # Architecture
//!
//! ```text
//!   caller / host              control thread (60 Hz)          audio thread
//!   -------------              ----------------------          ------------
//!   set_parameter() ──► ParameterStore ──dirty──► Analyzer::tick
//!                                                   │ design + publish
//!                                                   ▼
//!                                          SharedCoefficients ──► EqProcessor
//!                                                                    │ filtered
//!                         Event::PathUpdate ◄── FFT + paths ◄── collector FIFOs
//! ```
//!
//! Parameter edits never block and never travel through the command
//! channel. The control thread only reacts to the dirty flag on its tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, error, info, warn};
use trieq_dsp::{ChainUpdate, Channel, FftOrder, Rect, SharedCoefficients};

use crate::analyzer::{AnalysisInputs, Analyzer};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::message::{Command, Event};
use crate::params::{ParameterId, ParameterSnapshot, ParameterStore};
use crate::processor::EqProcessor;
use crate::settings::EqSettings;

/// Lifecycle/state events the caller has not polled yet; newer ones are
/// dropped beyond this
const EVENT_QUEUE_DEPTH: usize = 64;

/// Display frames the caller has not polled yet; the oldest are dropped
/// beyond this
const FRAME_QUEUE_DEPTH: usize = 16;

/// Main EQ engine
pub struct EqEngine {
    /// Channel to send commands to the control thread
    command_sender: Sender<Command>,

    /// Channel to receive events from the control thread
    event_receiver: Receiver<Event>,

    /// Display frames (paths, spectra, response curves), freshest kept
    frame_receiver: Receiver<Event>,

    /// Handle to the control thread
    control_thread: Option<JoinHandle<()>>,

    /// Flag to signal shutdown
    shutdown_flag: Arc<AtomicBool>,

    /// Configuration of the current (or next) prepare session
    config: EngineConfig,

    params: Arc<ParameterStore>,
}

impl EqEngine {
    /// Create a new engine with default configuration
    pub fn new() -> EngineResult<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Create a new engine with custom configuration
    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;

        let (command_sender, command_receiver) = bounded::<Command>(32);
        let (event_sink, event_receiver, frame_receiver) =
            EventSink::new(EVENT_QUEUE_DEPTH, FRAME_QUEUE_DEPTH);

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let params = Arc::new(ParameterStore::new());

        // Clone for control thread
        let shutdown_clone = Arc::clone(&shutdown_flag);
        let params_clone = Arc::clone(&params);
        let config_clone = config.clone();

        let control_thread = thread::Builder::new()
            .name("trieq-control".into())
            .spawn(move || {
                Self::control_thread_main(
                    command_receiver,
                    event_sink,
                    shutdown_clone,
                    params_clone,
                    config_clone,
                );
            })
            .map_err(|e| EngineError::ThreadSpawnError(e.to_string()))?;

        Ok(Self {
            command_sender,
            event_receiver,
            frame_receiver,
            control_thread: Some(control_thread),
            shutdown_flag,
            config,
            params,
        })
    }

    /// Start a processing session at `sample_rate` with blocks of at most
    /// `max_block_size` frames
    ///
    /// Returns the processor to move onto the audio thread. Any processor
    /// from an earlier session stops receiving coefficient updates and its
    /// analysis blocks are no longer read.
    pub fn prepare(&mut self, sample_rate: u32, max_block_size: usize) -> EngineResult<EqProcessor> {
        let config = EngineConfig {
            sample_rate,
            max_block_size,
            ..self.config.clone()
        };
        config.validate().map_err(EngineError::ConfigError)?;

        let initial = ChainUpdate::design(&self.params.chain_settings(), sample_rate as f32)?;
        let (publisher, shared) = SharedCoefficients::new(&initial);
        let (processor, blocks) = EqProcessor::new(&config, &initial, shared)?;

        self.send_command(Command::Prepare(Box::new(AnalysisInputs {
            config: config.clone(),
            publisher,
            blocks,
        })))?;

        info!(
            "Prepared: {}Hz, max block {} ({:.1}ms)",
            config.sample_rate,
            config.max_block_size,
            config.latency_ms()
        );
        self.config = config;
        Ok(processor)
    }

    /// Set one parameter; returns the value actually stored
    pub fn set_parameter(&self, id: ParameterId, value: f32) -> f32 {
        self.params.set(id, value)
    }

    /// Set one parameter by its display name (e.g. "Peak Gain")
    pub fn set_parameter_by_name(&self, name: &str, value: f32) -> EngineResult<f32> {
        self.params.set_by_name(name, value)
    }

    pub fn parameter(&self, id: ParameterId) -> f32 {
        self.params.get(id)
    }

    /// Snapshot of every parameter keyed by name
    pub fn parameters(&self) -> ParameterSnapshot {
        self.params.snapshot()
    }

    /// Shared store, for hosts that write parameters from their own threads
    pub fn parameter_store(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Restore saved parameter values
    pub fn restore(&self, snapshot: &ParameterSnapshot) {
        self.params.restore(snapshot);
    }

    /// Restore parameters and analyzer preferences
    ///
    /// The silence floor and FIFO capacity take effect at the next `prepare()`.
    pub fn apply_settings(&mut self, settings: &EqSettings) -> EngineResult<()> {
        settings.analyzer.validate().map_err(EngineError::ConfigError)?;
        self.restore(&settings.parameters);

        self.change_fft_order(settings.analyzer.fft_order)?;
        self.set_path_stride(settings.analyzer.path_stride)?;
        self.set_analyzer_enabled(settings.analyzer.enabled)?;
        self.config.analyzer = settings.analyzer.clone();
        Ok(())
    }

    /// Current state, ready to be saved
    pub fn settings(&self) -> EqSettings {
        EqSettings {
            parameters: self.parameters(),
            analyzer: self.config.analyzer.clone(),
            saved_at: None,
        }
    }

    /// Display rectangle for analyzer paths
    pub fn set_analysis_bounds(&self, bounds: Rect) -> EngineResult<()> {
        self.send_command(Command::SetAnalysisBounds(bounds))
    }

    /// Pixel width of the response curve; 0 disables it
    pub fn set_response_width(&self, width: usize) -> EngineResult<()> {
        self.send_command(Command::SetResponseWidth(width))
    }

    pub fn change_fft_order(&mut self, order: FftOrder) -> EngineResult<()> {
        self.send_command(Command::ChangeFftOrder(order))?;
        self.config.analyzer.fft_order = order;
        Ok(())
    }

    pub fn set_path_stride(&mut self, stride: usize) -> EngineResult<()> {
        if stride == 0 {
            return Err(EngineError::ConfigError(
                "Path stride must be at least 1".to_string(),
            ));
        }
        self.send_command(Command::SetPathStride(stride))?;
        self.config.analyzer.path_stride = stride;
        Ok(())
    }

    pub fn set_analyzer_enabled(&mut self, enabled: bool) -> EngineResult<()> {
        self.send_command(Command::SetAnalyzerEnabled(enabled))?;
        self.config.analyzer.enabled = enabled;
        Ok(())
    }

    /// Ask for the newest FFT frame of `channel`
    ///
    /// Answered with `Event::SpectrumUpdate`, or not at all if no frame has
    /// been rendered yet.
    pub fn request_spectrum(&self, channel: Channel) -> EngineResult<()> {
        self.send_command(Command::RequestSpectrum(channel))
    }

    /// Request state update
    pub fn request_state(&self) -> EngineResult<()> {
        self.send_command(Command::RequestState)
    }

    /// Get next event (non-blocking)
    pub fn poll_event(&self) -> Option<Event> {
        self.event_receiver
            .try_recv()
            .or_else(|_| self.frame_receiver.try_recv())
            .ok()
    }

    /// Get next event, waiting at most `timeout`
    pub fn wait_event_timeout(&self, timeout: Duration) -> Option<Event> {
        if let Some(event) = self.poll_event() {
            return Some(event);
        }
        select! {
            recv(self.event_receiver) -> event => event.ok(),
            recv(self.frame_receiver) -> event => event.ok(),
            default(timeout) => None,
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Send command to control thread
    fn send_command(&self, command: Command) -> EngineResult<()> {
        self.command_sender
            .send(command)
            .map_err(|_| EngineError::ChannelSendError)
    }

    /// Control thread main loop
    fn control_thread_main(
        command_receiver: Receiver<Command>,
        events: EventSink,
        shutdown_flag: Arc<AtomicBool>,
        params: Arc<ParameterStore>,
        config: EngineConfig,
    ) {
        info!("Control thread started ({}Hz tick)", config.control_tick_hz);

        let mut analyzer = Analyzer::new(params, config.analyzer.clone());
        let tick_interval = config.tick_interval();
        let mut next_tick = Instant::now() + tick_interval;

        while !shutdown_flag.load(Ordering::SeqCst) {
            // Commands are handled as they arrive; the timeout doubles as the tick clock
            let timeout = next_tick.saturating_duration_since(Instant::now());
            match command_receiver.recv_timeout(timeout) {
                Ok(Command::Shutdown) => {
                    info!("Shutdown requested");
                    break;
                }
                Ok(command) => {
                    debug!("Command: {:?}", command);
                    Self::handle_command(command, &mut analyzer, &events);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Command channel disconnected");
                    break;
                }
            }

            let now = Instant::now();
            if now >= next_tick {
                Self::run_tick(&mut analyzer, &events);
                next_tick += tick_interval;
                if next_tick < now {
                    // Fell behind; skip the missed ticks
                    next_tick = now + tick_interval;
                }
            }
        }

        info!("Control thread shutting down");
    }

    fn handle_command(command: Command, analyzer: &mut Analyzer, events: &EventSink) {
        match command {
            Command::Prepare(inputs) => {
                let config = inputs.config.clone();
                match analyzer.prepare(*inputs) {
                    Ok(()) => {
                        events.emit(Event::Prepared(config));
                        if !analyzer.response_curve().is_empty() {
                            events.emit(Event::ResponseCurveUpdate {
                                magnitudes_db: analyzer.response_curve().to_vec(),
                            });
                        }
                    }
                    Err(e) => {
                        error!("Failed to prepare analyzer: {}", e);
                        events.emit(Event::error(e));
                    }
                }
            }
            Command::SetAnalysisBounds(bounds) => analyzer.set_bounds(bounds),
            Command::SetResponseWidth(width) => {
                analyzer.set_response_width(width);
                if analyzer.is_prepared() && width > 0 {
                    events.emit(Event::ResponseCurveUpdate {
                        magnitudes_db: analyzer.response_curve().to_vec(),
                    });
                }
            }
            Command::ChangeFftOrder(order) => analyzer.change_order(order),
            Command::SetPathStride(stride) => analyzer.set_path_stride(stride),
            Command::SetAnalyzerEnabled(enabled) => analyzer.set_enabled(enabled),
            Command::RequestSpectrum(channel) => {
                if let Some(frame) = analyzer.latest_frame(channel) {
                    events.emit(Event::SpectrumUpdate {
                        channel,
                        magnitudes_db: frame.to_vec(),
                    });
                }
            }
            Command::RequestState => events.emit(Event::StateUpdate {
                is_prepared: analyzer.is_prepared(),
                analyzer_enabled: analyzer.config().enabled,
                fft_order: analyzer.config().fft_order,
                parameters: analyzer.parameters(),
            }),
            Command::Shutdown => {}
        }
    }

    fn run_tick(analyzer: &mut Analyzer, events: &EventSink) {
        let report = match analyzer.tick() {
            Ok(report) => report,
            Err(e) => {
                warn!("Control tick failed: {}", e);
                events.emit(Event::error(e));
                return;
            }
        };

        for channel in Channel::ALL {
            if !report.paths_updated[channel.index()] {
                continue;
            }
            if let Some(path) = analyzer.latest_path(channel) {
                events.emit(Event::PathUpdate {
                    channel,
                    points: path.points().to_vec(),
                });
            }
        }

        if report.response_updated {
            events.emit(Event::ResponseCurveUpdate {
                magnitudes_db: analyzer.response_curve().to_vec(),
            });
        }
    }
}

/// Control-thread side of the two event queues
///
/// Lifecycle events (prepared, state, errors) are dropped when their queue
/// is full. Display frames replace the oldest queued frame instead, so a
/// caller that pauses and then drains still ends on the freshest one.
struct EventSink {
    events: Sender<Event>,
    frames: Sender<Event>,
    /// Lets the sender discard the oldest frame when the queue is full
    stale_frames: Receiver<Event>,
}

impl EventSink {
    fn new(event_depth: usize, frame_depth: usize) -> (Self, Receiver<Event>, Receiver<Event>) {
        let (events, event_receiver) = bounded(event_depth);
        let (frames, frame_receiver) = bounded(frame_depth);
        let sink = Self {
            events,
            frames,
            stale_frames: frame_receiver.clone(),
        };
        (sink, event_receiver, frame_receiver)
    }

    fn emit(&self, event: Event) {
        if event.is_display_frame() {
            self.emit_frame(event);
            return;
        }
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("Event queue full, dropping event"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn emit_frame(&self, mut event: Event) {
        loop {
            match self.frames.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(rejected)) => {
                    let _ = self.stale_frames.try_recv();
                    event = rejected;
                }
            }
        }
    }
}

impl Drop for EqEngine {
    fn drop(&mut self) {
        // Signal shutdown
        self.shutdown_flag.store(true, Ordering::SeqCst);

        // Send shutdown command
        let _ = self.command_sender.send(Command::Shutdown);

        // Wait for control thread to finish
        if let Some(handle) = self.control_thread.take() {
            let _ = handle.join();
        }
    }
}
