use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use irl_engine::{ControlEvent, ControlQueue, GameSession, IrlError, Result, SessionEvent};

use crate::sink::RenderSink;
use crate::source::VideoSource;

/// Single-threaded tick scheduler that wires a session to its collaborators.
///
/// Each tick drains queued controls, reads one frame, advances the turn cycle
/// and presents the annotated frame. Ticks never overlap; `run` sleeps the
/// configured delay after each completed tick.
pub struct SessionRunner<S: VideoSource, K: RenderSink> {
    session: GameSession,
    source: S,
    sink: K,
    controls: ControlQueue,
    end_turn_at: BTreeSet<u64>,
    stop: Arc<AtomicBool>,
    ticks: u64,
}

impl<S: VideoSource, K: RenderSink> SessionRunner<S, K> {
    /// Fails when the source's frame size differs from the session's surface.
    pub fn new(session: GameSession, source: S, sink: K) -> Result<Self> {
        if source.dimensions() != session.dimensions() {
            return Err(IrlError::FrameSize {
                expected: session.dimensions(),
                actual: source.dimensions(),
            });
        }
        Ok(Self {
            session,
            source,
            sink,
            controls: ControlQueue::new(),
            end_turn_at: BTreeSet::new(),
            stop: Arc::new(AtomicBool::new(false)),
            ticks: 0,
        })
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Queue a control signal for the start of the next tick.
    pub fn push_control(&mut self, event: ControlEvent) {
        self.controls.push(event);
    }

    /// Queue an end-turn signal for the start of tick `tick`.
    pub fn schedule_end_turn(&mut self, tick: u64) {
        self.end_turn_at.insert(tick);
    }

    /// Handle that stops `run` after the tick in progress.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run one tick and return the session events it produced.
    pub fn tick(&mut self) -> Result<Vec<SessionEvent>> {
        if self.end_turn_at.remove(&self.ticks) {
            self.controls.push(ControlEvent::EndTurn);
        }
        for event in self.controls.drain() {
            match event {
                ControlEvent::EndTurn => {
                    self.session.end_turn();
                }
            }
        }

        let frame = self.source.read_frame()?;
        let annotated = self.session.tick(&frame)?;
        self.sink.present(self.ticks, &annotated)?;
        self.ticks += 1;

        let events = self.session.drain_events();
        for event in &events {
            log::debug!("tick {}: {:?}", self.ticks, event);
        }
        Ok(events)
    }

    /// Tick until stopped or `max_ticks` more ticks have run. Returns the
    /// number of ticks run by this call.
    pub fn run(&mut self, max_ticks: Option<u64>) -> Result<u64> {
        let delay = Duration::from_millis(self.session.config().tick_delay_ms);
        let mut ran = 0;
        log::info!("Runner started");
        while !self.stop.load(Ordering::Relaxed) && max_ticks.map_or(true, |max| ran < max) {
            self.tick()?;
            ran += 1;
            std::thread::sleep(delay);
        }
        log::info!("Runner stopped after {} ticks", ran);
        Ok(ran)
    }

    /// Release the source and close the sink. Failures are logged, not returned.
    pub fn shutdown(mut self) -> GameSession {
        if let Err(e) = self.source.release() {
            log::error!("Failed to release video source: {}", e);
        }
        if let Err(e) = self.sink.close() {
            log::error!("Failed to close render sink: {}", e);
        }
        self.session
    }
}
