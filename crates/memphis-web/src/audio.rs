use memphis_core::audio::{
    AudioBackend, AudioError, DelaySettings, GraphParam, GraphSettings, NoteSpec,
};
use memphis_core::Timbre;
use wasm_bindgen::JsValue;
use web_sys as web;

// Voice tuning
const FAT_SAW_DETUNE_CENTS: [f32; 3] = [-12.0, 0.0, 12.0];
const FM_HARMONICITY: f32 = 2.0;
const FM_MODULATION_INDEX: f32 = 3.0;
const VOICE_LEVEL: f32 = 0.3;

// Graph tuning
const MAX_DELAY_SEC: f64 = 2.0;
const FILTER_Q: f32 = 0.7;
const LIMITER_RATIO: f32 = 20.0;
const LIMITER_ATTACK_SEC: f32 = 0.003;
const LIMITER_RELEASE_SEC: f32 = 0.25;

fn js_detail(e: JsValue) -> String {
    format!("{:?}", e)
}

fn node_err(node: &'static str) -> impl FnOnce(JsValue) -> AudioError {
    move |e| AudioError::NodeCreation {
        node,
        detail: js_detail(e),
    }
}

fn connect(
    from: &web::AudioNode,
    to: &web::AudioNode,
    labels: (&'static str, &'static str),
) -> Result<(), AudioError> {
    from.connect_with_audio_node(to)
        .map(|_| ())
        .map_err(|e| AudioError::Connection {
            from: labels.0,
            to: labels.1,
            detail: js_detail(e),
        })
}

fn create_gain(ctx: &web::AudioContext, value: f32, label: &'static str) -> Result<web::GainNode, AudioError> {
    let g = web::GainNode::new(ctx).map_err(node_err(label))?;
    g.gain().set_value(value);
    Ok(g)
}

fn create_lowpass(ctx: &web::AudioContext, hz: f32) -> Result<web::BiquadFilterNode, AudioError> {
    let f = web::BiquadFilterNode::new(ctx).map_err(node_err("lowpass"))?;
    f.set_type(web::BiquadFilterType::Lowpass);
    f.frequency().set_value(hz);
    f.q().set_value(FILTER_Q);
    Ok(f)
}

/// Cancel pending automation and glide to `value`.
fn ramp_param(param: &web::AudioParam, value: f32, now: f64, ramp_sec: f64) {
    let _ = param.cancel_scheduled_values(now);
    let _ = param.set_value_at_time(param.value(), now);
    let _ = param.linear_ramp_to_value_at_time(value, now + ramp_sec.max(0.0));
}

/// Stereo ping-pong echo: two delay lines feeding each other, summed into a
/// wet gain. `dry` is only present for the live echo.
struct PingPong {
    input: web::GainNode,
    left: web::DelayNode,
    right: web::DelayNode,
    cross_lr: web::GainNode,
    cross_rl: web::GainNode,
    merger: web::ChannelMergerNode,
    wet: web::GainNode,
    dry: Option<web::GainNode>,
}

impl PingPong {
    fn build(
        ctx: &web::AudioContext,
        settings: DelaySettings,
        with_dry: bool,
        out: &web::AudioNode,
    ) -> Result<Self, AudioError> {
        let input = create_gain(ctx, 1.0, "delay in")?;
        let left = ctx
            .create_delay_with_max_delay_time(MAX_DELAY_SEC)
            .map_err(node_err("delay"))?;
        let right = ctx
            .create_delay_with_max_delay_time(MAX_DELAY_SEC)
            .map_err(node_err("delay"))?;
        left.delay_time().set_value(settings.delay_sec);
        right.delay_time().set_value(settings.delay_sec);
        let cross_lr = create_gain(ctx, settings.feedback, "delay feedback")?;
        let cross_rl = create_gain(ctx, settings.feedback, "delay feedback")?;
        let merger = ctx
            .create_channel_merger_with_number_of_inputs(2)
            .map_err(node_err("channel merger"))?;
        let wet = create_gain(ctx, settings.wet, "delay wet")?;

        connect(&input, &left, ("delay in", "delay"))?;
        connect(&left, &cross_lr, ("delay", "delay feedback"))?;
        connect(&cross_lr, &right, ("delay feedback", "delay"))?;
        connect(&right, &cross_rl, ("delay", "delay feedback"))?;
        connect(&cross_rl, &left, ("delay feedback", "delay"))?;
        for (line, channel) in [(&left, 0), (&right, 1)] {
            line.connect_with_audio_node_and_output_and_input(&merger, 0, channel)
                .map_err(|e| AudioError::Connection {
                    from: "delay",
                    to: "channel merger",
                    detail: js_detail(e),
                })?;
        }
        connect(&merger, &wet, ("channel merger", "delay wet"))?;
        connect(&wet, out, ("delay wet", "delay out"))?;

        let dry = if with_dry {
            let dry = create_gain(ctx, 1.0 - settings.wet, "delay dry")?;
            connect(&input, &dry, ("delay in", "delay dry"))?;
            connect(&dry, out, ("delay dry", "delay out"))?;
            Some(dry)
        } else {
            None
        };

        Ok(Self {
            input,
            left,
            right,
            cross_lr,
            cross_rl,
            merger,
            wet,
            dry,
        })
    }

    fn disconnect(&self) {
        let _ = self.input.disconnect();
        let _ = self.left.disconnect();
        let _ = self.right.disconnect();
        let _ = self.cross_lr.disconnect();
        let _ = self.cross_rl.disconnect();
        let _ = self.merger.disconnect();
        let _ = self.wet.disconnect();
        if let Some(dry) = &self.dry {
            let _ = dry.disconnect();
        }
    }
}

struct Graph {
    input_gate: web::GainNode,
    filters: [web::BiquadFilterNode; 2],
    live_delay: PingPong,
    freeze_in_gate: web::GainNode,
    freeze_delay: PingPong,
    reverb_in: web::GainNode,
    convolver: web::ConvolverNode,
    reverb_wet: web::GainNode,
    reverb_dry: web::GainNode,
    master: web::GainNode,
    limiter: web::DynamicsCompressorNode,
}

impl Graph {
    fn disconnect(&self) {
        let _ = self.input_gate.disconnect();
        for f in &self.filters {
            let _ = f.disconnect();
        }
        self.live_delay.disconnect();
        let _ = self.freeze_in_gate.disconnect();
        self.freeze_delay.disconnect();
        let _ = self.reverb_in.disconnect();
        let _ = self.convolver.disconnect();
        let _ = self.reverb_wet.disconnect();
        let _ = self.reverb_dry.disconnect();
        let _ = self.master.disconnect();
        let _ = self.limiter.disconnect();
    }
}

/// Persistent synth voice: oscillator stack -> envelope -> tremolo -> graph.
pub struct WebVoice {
    oscillators: Vec<web::OscillatorNode>,
    fm: Option<(web::OscillatorNode, web::GainNode)>,
    envelope: web::GainNode,
    tremolo: web::GainNode,
    lfo: web::OscillatorNode,
    lfo_depth: web::GainNode,
}

impl WebVoice {
    fn release(self) {
        for osc in &self.oscillators {
            let _ = osc.stop();
            let _ = osc.disconnect();
        }
        if let Some((modulator, depth)) = &self.fm {
            let _ = modulator.stop();
            let _ = modulator.disconnect();
            let _ = depth.disconnect();
        }
        let _ = self.lfo.stop();
        let _ = self.lfo.disconnect();
        let _ = self.lfo_depth.disconnect();
        let _ = self.envelope.disconnect();
        let _ = self.tremolo.disconnect();
    }
}

/// WebAudio implementation of the routing graph and voices.
pub struct WebAudioBackend {
    ctx: web::AudioContext,
    graph: Option<Graph>,
}

impl WebAudioBackend {
    pub fn new() -> Result<Self, AudioError> {
        let ctx = web::AudioContext::new().map_err(node_err("AudioContext"))?;
        Ok(Self { ctx, graph: None })
    }

    fn is_closed(&self) -> bool {
        self.ctx.state() == web::AudioContextState::Closed
    }

    fn graph(&self) -> Result<&Graph, AudioError> {
        if self.is_closed() {
            return Err(AudioError::Disposed);
        }
        self.graph.as_ref().ok_or(AudioError::NoGraph)
    }

    fn params(&self, param: GraphParam) -> Vec<web::AudioParam> {
        let Some(g) = &self.graph else {
            return Vec::new();
        };
        match param {
            GraphParam::InputGate => vec![g.input_gate.gain()],
            GraphParam::FreezeInputGate => vec![g.freeze_in_gate.gain()],
            GraphParam::FilterCutoff => g.filters.iter().map(|f| f.frequency()).collect(),
            GraphParam::ReverbWet => vec![g.reverb_wet.gain()],
            GraphParam::FreezeFeedback => {
                vec![g.freeze_delay.cross_lr.gain(), g.freeze_delay.cross_rl.gain()]
            }
            GraphParam::FreezeWet => vec![g.freeze_delay.wet.gain()],
            GraphParam::MasterGain => vec![g.master.gain()],
        }
    }

    /// Procedural stereo impulse response: exponentially decaying noise.
    fn build_impulse(&self, decay_sec: f32) -> Result<web::AudioBuffer, AudioError> {
        let sr = self.ctx.sample_rate();
        let seconds = decay_sec.max(0.1);
        let len = (sr * seconds) as u32;
        let ir = self
            .ctx
            .create_buffer(2, len.max(1), sr)
            .map_err(node_err("impulse buffer"))?;
        let mut seeds: [u32; 2] = [0x1234ABCD, 0x7890FEDC];
        let dt = 1.0 / sr;
        for (ch, seed) in seeds.iter_mut().enumerate() {
            let mut buf = vec![0.0_f32; len as usize];
            for (i, sample) in buf.iter_mut().enumerate() {
                // xorshift32
                let mut x = *seed;
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                *seed = x;
                let noise = (x as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let t = i as f32 * dt;
                *sample = noise * (1.0 - t / seconds).max(0.0).powi(2);
            }
            ir.copy_to_channel(&mut buf, ch as i32)
                .map_err(node_err("impulse buffer"))?;
        }
        Ok(ir)
    }
}

impl AudioBackend for WebAudioBackend {
    type Voice = WebVoice;

    fn resume(&mut self) -> Result<(), AudioError> {
        if self.is_closed() {
            return Err(AudioError::Disposed);
        }
        self.ctx
            .resume()
            .map(|_| ())
            .map_err(|e| AudioError::NodeCreation {
                node: "AudioContext",
                detail: js_detail(e),
            })
    }

    fn current_time(&self) -> f64 {
        self.ctx.current_time()
    }

    fn build_graph(&mut self, settings: &GraphSettings) -> Result<(), AudioError> {
        if let Some(old) = self.graph.take() {
            old.disconnect();
        }
        let ctx = &self.ctx;

        let limiter = web::DynamicsCompressorNode::new(ctx).map_err(node_err("limiter"))?;
        limiter.threshold().set_value(settings.limiter_db);
        limiter.knee().set_value(0.0);
        limiter.ratio().set_value(LIMITER_RATIO);
        limiter.attack().set_value(LIMITER_ATTACK_SEC);
        limiter.release().set_value(LIMITER_RELEASE_SEC);
        connect(&limiter, &ctx.destination(), ("limiter", "destination"))?;

        let master = create_gain(ctx, settings.master_gain, "master")?;
        connect(&master, &limiter, ("master", "limiter"))?;

        let reverb_in = create_gain(ctx, 1.0, "reverb in")?;
        let convolver = web::ConvolverNode::new(ctx).map_err(node_err("convolver"))?;
        convolver.set_normalize(true);
        convolver.set_buffer(Some(&self.build_impulse(settings.reverb_decay_sec)?));
        let reverb_wet = create_gain(ctx, settings.reverb_wet, "reverb wet")?;
        let reverb_dry = create_gain(ctx, 1.0, "reverb dry")?;
        connect(&reverb_in, &convolver, ("reverb in", "convolver"))?;
        connect(&convolver, &reverb_wet, ("convolver", "reverb wet"))?;
        connect(&reverb_wet, &master, ("reverb wet", "master"))?;
        connect(&reverb_in, &reverb_dry, ("reverb in", "reverb dry"))?;
        connect(&reverb_dry, &master, ("reverb dry", "master"))?;

        let live_delay = PingPong::build(ctx, settings.live_delay, true, &reverb_in)?;
        let freeze_delay = PingPong::build(ctx, settings.freeze_delay, false, &reverb_in)?;
        let freeze_in_gate = create_gain(ctx, 0.0, "freeze in")?;
        connect(&freeze_in_gate, &freeze_delay.input, ("freeze in", "delay in"))?;

        let filters = [
            create_lowpass(ctx, settings.filter_hz)?,
            create_lowpass(ctx, settings.filter_hz)?,
        ];
        connect(&filters[0], &filters[1], ("lowpass", "lowpass"))?;
        connect(&filters[1], &live_delay.input, ("lowpass", "delay in"))?;
        connect(&filters[1], &freeze_in_gate, ("lowpass", "freeze in"))?;

        let input_gate = create_gain(ctx, 1.0, "input gate")?;
        connect(&input_gate, &filters[0], ("input gate", "lowpass"))?;

        log::info!(
            "[audio] graph built (filter {:.0} Hz, reverb {:.2}, master {:.2})",
            settings.filter_hz,
            settings.reverb_wet,
            settings.master_gain
        );
        self.graph = Some(Graph {
            input_gate,
            filters,
            live_delay,
            freeze_in_gate,
            freeze_delay,
            reverb_in,
            convolver,
            reverb_wet,
            reverb_dry,
            master,
            limiter,
        });
        Ok(())
    }

    fn rebuild_freeze_delay(&mut self, delay: DelaySettings) -> Result<(), AudioError> {
        let ctx = self.ctx.clone();
        let graph = self.graph.as_mut().ok_or(AudioError::NoGraph)?;
        let _ = graph.freeze_in_gate.disconnect();
        graph.freeze_delay.disconnect();
        graph.freeze_delay = PingPong::build(&ctx, delay, false, &graph.reverb_in)?;
        connect(
            &graph.freeze_in_gate,
            &graph.freeze_delay.input,
            ("freeze in", "delay in"),
        )
    }

    fn ramp(&mut self, param: GraphParam, value: f32, ramp_sec: f64) {
        let now = self.ctx.current_time();
        for p in self.params(param) {
            ramp_param(&p, value, now, ramp_sec);
        }
        if param == GraphParam::ReverbWet {
            if let Some(g) = &self.graph {
                ramp_param(&g.reverb_dry.gain(), 1.0 - value, now, ramp_sec);
            }
        }
    }

    fn create_voice(&mut self, timbre: Timbre) -> Result<Self::Voice, AudioError> {
        let input = self.graph()?.input_gate.clone();
        let ctx = &self.ctx;

        let envelope = create_gain(ctx, 0.0, "envelope")?;
        let tremolo = create_gain(ctx, 1.0, "tremolo")?;
        let lfo = web::OscillatorNode::new(ctx).map_err(node_err("lfo"))?;
        lfo.set_type(web::OscillatorType::Sine);
        let lfo_depth = create_gain(ctx, 0.0, "lfo depth")?;
        lfo.connect_with_audio_node(&lfo_depth)
            .map_err(|e| AudioError::Connection {
                from: "lfo",
                to: "lfo depth",
                detail: js_detail(e),
            })?;
        lfo_depth
            .connect_with_audio_param(&tremolo.gain())
            .map_err(|e| AudioError::Connection {
                from: "lfo depth",
                to: "tremolo",
                detail: js_detail(e),
            })?;

        let (kind, detunes): (web::OscillatorType, &[f32]) = match timbre {
            Timbre::Sine => (web::OscillatorType::Sine, &[0.0]),
            Timbre::Triangle | Timbre::FmTriangle => (web::OscillatorType::Triangle, &[0.0]),
            Timbre::Sawtooth => (web::OscillatorType::Sawtooth, &[0.0]),
            Timbre::Square => (web::OscillatorType::Square, &[0.0]),
            Timbre::FatSawtooth => (web::OscillatorType::Sawtooth, &FAT_SAW_DETUNE_CENTS),
        };
        let stack_gain = VOICE_LEVEL / detunes.len() as f32;
        let stack = create_gain(ctx, stack_gain, "voice stack")?;
        let mut oscillators = Vec::with_capacity(detunes.len());
        for cents in detunes {
            let osc = web::OscillatorNode::new(ctx).map_err(node_err("oscillator"))?;
            osc.set_type(kind);
            osc.detune().set_value(*cents);
            connect(&osc, &stack, ("oscillator", "voice stack"))?;
            oscillators.push(osc);
        }

        let fm = if timbre == Timbre::FmTriangle {
            let modulator = web::OscillatorNode::new(ctx).map_err(node_err("fm modulator"))?;
            modulator.set_type(web::OscillatorType::Sine);
            let depth = create_gain(ctx, 0.0, "fm depth")?;
            connect(&modulator, &depth, ("fm modulator", "fm depth"))?;
            for osc in &oscillators {
                depth
                    .connect_with_audio_param(&osc.frequency())
                    .map_err(|e| AudioError::Connection {
                        from: "fm depth",
                        to: "oscillator",
                        detail: js_detail(e),
                    })?;
            }
            Some((modulator, depth))
        } else {
            None
        };

        connect(&stack, &envelope, ("voice stack", "envelope"))?;
        connect(&envelope, &tremolo, ("envelope", "tremolo"))?;
        connect(&tremolo, &input, ("tremolo", "input gate"))?;

        for osc in oscillators.iter().chain(fm.as_ref().map(|(m, _)| m)).chain([&lfo]) {
            osc.start().map_err(node_err("oscillator"))?;
        }
        log::debug!("[audio] voice created ({:?})", timbre);
        Ok(WebVoice {
            oscillators,
            fm,
            envelope,
            tremolo,
            lfo,
            lfo_depth,
        })
    }

    fn play_note(&mut self, voice: &mut Self::Voice, note: &NoteSpec) -> Result<(), AudioError> {
        let t0 = note.start_time.max(self.ctx.current_time());
        let freq = note.frequency_hz;
        for osc in &voice.oscillators {
            osc.frequency()
                .set_value_at_time(freq, t0)
                .map_err(node_err("oscillator"))?;
        }
        if let Some((modulator, depth)) = &voice.fm {
            let _ = modulator
                .frequency()
                .set_value_at_time(freq * FM_HARMONICITY, t0);
            let _ = depth
                .gain()
                .set_value_at_time(freq * FM_HARMONICITY * FM_MODULATION_INDEX, t0);
        }

        let half_depth = note.tremolo_depth.clamp(0.0, 1.0) * 0.5;
        let _ = voice.lfo.frequency().set_value_at_time(note.tremolo_hz, t0);
        let _ = voice.lfo_depth.gain().set_value_at_time(half_depth, t0);
        let _ = voice.tremolo.gain().set_value_at_time(1.0 - half_depth, t0);

        let env = voice.envelope.gain();
        let _ = env.cancel_scheduled_values(t0);
        env.set_value_at_time(0.0, t0)
            .map_err(node_err("envelope"))?;
        for (t, level) in note
            .envelope
            .breakpoints(note.gate_sec, note.velocity)
            .iter()
            .skip(1)
        {
            env.linear_ramp_to_value_at_time(*level, t0 + *t as f64)
                .map_err(node_err("envelope"))?;
        }
        Ok(())
    }

    fn dispose_voice(&mut self, voice: Self::Voice) {
        voice.release();
    }

    fn dispose_graph(&mut self) {
        if let Some(g) = self.graph.take() {
            g.disconnect();
            log::info!("[audio] graph disposed");
        }
    }
    fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        if let Err(e) = self.ctx.close() {
            log::warn!("[audio] closing the context failed: {}", js_detail(e));
        } else {
            log::info!("[audio] context closed");
        }
    }
}
