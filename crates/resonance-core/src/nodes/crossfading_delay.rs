//! Click-free variable delay, with optional feedback, as a graph node.

use crate::crossfade_delay::CrossfadingDelayLine;
use crate::graph::node::{NodeBehavior, ProcessContext};
use crate::graph::property::{PropertyRange, PropertyTable, PropertyValue};

/// Property tag: delay time in seconds.
pub const DELAY: &str = "delay";
/// Property tag: delay time in samples (kept in sync with `delay`; writing
/// either updates the other).
pub const DELAY_SAMPLES: &str = "delay_samples";
/// Property tag: feedback gain fed from output back into input, `[0, 0.99]`.
pub const FEEDBACK: &str = "feedback";

/// Per-channel crossfading delay line with feedback, operating on
/// `channels` independent channels (each its own [`CrossfadingDelayLine`]).
/// `delay`/`delay_samples` mirror each other: writing one recomputes and
/// writes the other via [`NodeBehavior::on_property_changed`], guarded
/// against feedback loops between the two writes.
pub struct CrossfadingDelayNode {
    lines: Vec<CrossfadingDelayLine>,
    sample_rate: f32,
    syncing: bool,
}

impl CrossfadingDelayNode {
    /// Builds the property table: `delay` (seconds, `[0, max_delay]`),
    /// `delay_samples` (integer samples, same range), `feedback`
    /// (`[0, 0.99]`).
    pub fn properties(max_delay_seconds: f32, sample_rate: f32) -> PropertyTable {
        let mut table = PropertyTable::new();
        table.declare_ranged(
            DELAY,
            PropertyValue::Float(0.0),
            PropertyRange::Continuous { min: 0.0, max: max_delay_seconds as f64 },
        );
        table.declare_ranged(
            DELAY_SAMPLES,
            PropertyValue::Int(0),
            PropertyRange::Continuous { min: 0.0, max: (max_delay_seconds * sample_rate) as f64 },
        );
        table.declare_ranged(FEEDBACK, PropertyValue::Float(0.0), PropertyRange::Continuous { min: 0.0, max: 0.99 });
        table
    }

    /// Creates a delay node for `channels` channels at `sample_rate`, able
    /// to hold up to `max_delay_seconds`.
    pub fn new(channels: usize, max_delay_seconds: f32, sample_rate: f32) -> Self {
        Self {
            lines: (0..channels).map(|_| CrossfadingDelayLine::new(max_delay_seconds, sample_rate)).collect(),
            sample_rate,
            syncing: false,
        }
    }
}

impl NodeBehavior for CrossfadingDelayNode {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) {
        let feedback = ctx.properties.get(FEEDBACK).ok().and_then(|p| p.value().as_float()).unwrap_or(0.0);
        let Some(input) = ctx.inputs.first() else { return };
        let Some(output) = ctx.outputs.first_mut() else { return };
        for (ch, line) in self.lines.iter_mut().enumerate() {
            let Some(in_ch) = input.get(ch) else { continue };
            let Some(out_ch) = output.get_mut(ch) else { continue };
            for (x, y) in in_ch.iter().zip(out_ch.iter_mut()) {
                let sample = line.compute_sample();
                *y = sample;
                line.advance(*x + sample * feedback);
            }
        }
    }

    fn on_property_changed(&mut self, tag: &'static str, properties: &mut PropertyTable) {
        if self.syncing {
            return;
        }
        self.syncing = true;
        match tag {
            DELAY => {
                if let Ok(p) = properties.get(DELAY) {
                    if let Some(seconds) = p.value().as_float() {
                        for line in &mut self.lines {
                            line.set_delay(seconds);
                        }
                        let samples = (seconds * self.sample_rate).round() as i64;
                        if let Ok(p) = properties.get_mut(DELAY_SAMPLES) {
                            let _ = p.set(DELAY_SAMPLES, PropertyValue::Int(samples));
                        }
                    }
                }
            }
            DELAY_SAMPLES => {
                if let Ok(p) = properties.get(DELAY_SAMPLES) {
                    if let Some(samples) = p.value().as_int() {
                        let seconds = samples as f32 / self.sample_rate;
                        for line in &mut self.lines {
                            line.set_delay(seconds);
                        }
                        if let Ok(p) = properties.get_mut(DELAY) {
                            let _ = p.set(DELAY, PropertyValue::Float(seconds));
                        }
                    }
                }
            }
            _ => {}
        }
        self.syncing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Simulation;

    struct Impulse;
    impl NodeBehavior for Impulse {
        fn process(&mut self, ctx: &mut ProcessContext<'_>) {
            ctx.outputs[0][0][0] = 1.0;
        }
    }

    #[test]
    fn setting_delay_updates_delay_samples() {
        let sim = Simulation::new(48_000.0, 4);
        let node = sim.create_node(
            "delay",
            Box::new(CrossfadingDelayNode::new(1, 1.0, 48_000.0)),
            &[1],
            &[1],
            CrossfadingDelayNode::properties(1.0, 48_000.0),
        );
        sim.set_property(node, DELAY, PropertyValue::Float(0.25)).unwrap();
        assert_eq!(sim.get_property(node, DELAY_SAMPLES).unwrap(), PropertyValue::Int(12_000));
    }

    #[test]
    fn setting_delay_samples_updates_delay() {
        let sim = Simulation::new(48_000.0, 4);
        let node = sim.create_node(
            "delay",
            Box::new(CrossfadingDelayNode::new(1, 1.0, 48_000.0)),
            &[1],
            &[1],
            CrossfadingDelayNode::properties(1.0, 48_000.0),
        );
        sim.set_property(node, DELAY_SAMPLES, PropertyValue::Int(4_800)).unwrap();
        let seconds = sim.get_property(node, DELAY).unwrap().as_float().unwrap();
        assert!((seconds - 0.1).abs() < 1e-4);
    }
}
