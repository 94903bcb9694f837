//! Linear fade ramps applied at playback transitions.

/// Gain of a linear 0→1 ramp at `index` of `len` samples.
///
/// The ramp spans the whole slice: first sample 0, last sample 1.
/// A single-sample ramp is fully open.
#[inline]
fn ramp_gain(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }
    index as f32 / (len - 1) as f32
}

/// Applies a linear fade-in (gain 0 → 1) across `samples`.
pub fn fade_in(samples: &mut [f32]) {
    let len = samples.len();
    for (i, sample) in samples.iter_mut().enumerate() {
        *sample *= ramp_gain(i, len);
    }
}

/// Applies a linear fade-out (gain 1 → 0) across `samples`.
///
/// A single sample is silenced.
pub fn fade_out(samples: &mut [f32]) {
    let len = samples.len();
    for (i, sample) in samples.iter_mut().enumerate() {
        *sample *= 1.0 - ramp_gain(i, len);
    }
}
