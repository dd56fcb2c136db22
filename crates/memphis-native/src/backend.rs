use memphis_core::audio::{
    AudioBackend, AudioError, DelaySettings, GraphParam, GraphSettings, NoteSpec,
};
use memphis_core::{Clock, ManualClock, Timbre};

/// Audio backend that writes every graph change and note to the logger.
/// The audio clock follows the scene clock so schedules stay readable.
pub struct LogBackend {
    clock: ManualClock,
    started: bool,
    graph: bool,
    closed: bool,
    next_voice: u32,
    pub notes: u64,
    pub voices_live: usize,
}

#[derive(Debug)]
pub struct LogVoice {
    id: u32,
    timbre: Timbre,
}

impl LogBackend {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            started: false,
            graph: false,
            closed: false,
            next_voice: 1,
            notes: 0,
            voices_live: 0,
        }
    }
}

impl AudioBackend for LogBackend {
    type Voice = LogVoice;

    fn resume(&mut self) -> Result<(), AudioError> {
        if self.closed {
            return Err(AudioError::Disposed);
        }
        self.started = true;
        log::info!("[audio] clock resumed at {:.3}s", self.current_time());
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.clock.now_ms() / 1000.0
    }

    fn build_graph(&mut self, settings: &GraphSettings) -> Result<(), AudioError> {
        if self.closed {
            return Err(AudioError::Disposed);
        }
        self.graph = true;
        log::info!(
            "[audio] graph: filter {:.0} Hz, live delay {:.2}s/{:.2}, reverb {:.2} ({}s), master {:.3}, limiter {} dB",
            settings.filter_hz,
            settings.live_delay.delay_sec,
            settings.live_delay.feedback,
            settings.reverb_wet,
            settings.reverb_decay_sec,
            settings.master_gain,
            settings.limiter_db
        );
        Ok(())
    }

    fn rebuild_freeze_delay(&mut self, delay: DelaySettings) -> Result<(), AudioError> {
        if !self.graph {
            return Err(AudioError::NoGraph);
        }
        log::info!(
            "[freeze] delay rebuilt: {:.2}s feedback {:.2} wet {:.2}",
            delay.delay_sec,
            delay.feedback,
            delay.wet
        );
        Ok(())
    }

    fn ramp(&mut self, param: GraphParam, value: f32, ramp_sec: f64) {
        log::trace!("[audio] ramp {:?} -> {:.3} over {:.3}s", param, value, ramp_sec);
    }

    fn create_voice(&mut self, timbre: Timbre) -> Result<Self::Voice, AudioError> {
        if self.closed {
            return Err(AudioError::Disposed);
        }
        if !self.graph {
            return Err(AudioError::NoGraph);
        }
        let id = self.next_voice;
        self.next_voice += 1;
        self.voices_live += 1;
        log::debug!("[audio] voice #{} ({:?})", id, timbre);
        Ok(LogVoice { id, timbre })
    }

    fn play_note(&mut self, voice: &mut Self::Voice, note: &NoteSpec) -> Result<(), AudioError> {
        if !self.started {
            return Err(AudioError::NotStarted);
        }
        self.notes += 1;
        log::info!(
            "[note] t={:.3}s voice #{} {:?} {:.1} Hz vel {:.2} gate {:.2}s release {:.2}s",
            note.start_time,
            voice.id,
            voice.timbre,
            note.frequency_hz,
            note.velocity,
            note.gate_sec,
            note.envelope.release
        );
        Ok(())
    }

    fn dispose_voice(&mut self, voice: Self::Voice) {
        self.voices_live = self.voices_live.saturating_sub(1);
        log::trace!("[audio] voice #{} released", voice.id);
    }

    fn dispose_graph(&mut self) {
        self.graph = false;
        log::info!("[audio] graph disposed");
    }

    fn close(&mut self) {
        self.closed = true;
        self.started = false;
        log::info!("[audio] closed after {} notes, {} voices live", self.notes, self.voices_live);
    }
}
