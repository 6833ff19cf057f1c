//! Flavor text for cultivation ticks.
use rand::Rng;

const SUCCESS_LINES: &[&str] = &[
    "Spiritual qi gathers in your dantian like a quiet tide.",
    "Your meridians hum as the heavens and earth answer your breath.",
    "A faint glow surrounds you; the method flows without obstruction.",
    "Insight blooms like a lotus breaking the surface of still water.",
    "The cycle of breathing completes, and your foundation grows steadier.",
];

const DEVIATION_LINES: &[&str] = &[
    "Your qi surges out of control and scatters through your meridians.",
    "A stray thought clouds your mind; the circulation falters.",
    "Inner demons whisper and your breathing breaks its rhythm.",
    "Blood rushes to your head as the energy reverses its course.",
];

/// Pick a line describing a smooth cultivation cycle.
pub fn success_line<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(SUCCESS_LINES, rng)
}

/// Pick a line describing a cultivation deviation.
pub fn deviation_line<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(DEVIATION_LINES, rng)
}

fn pick<R: Rng + ?Sized>(lines: &'static [&'static str], rng: &mut R) -> &'static str {
    let index = rng.gen_range(0..lines.len());
    lines.get(index).copied().unwrap_or_default()
}
