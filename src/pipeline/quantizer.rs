//! Fixed-quantum adaptation for host output callbacks.

use crate::format::upmix_mono;

/// Presents a host callback of arbitrary size as a sequence of fixed render quanta.
///
/// The host asks for whatever buffer size its driver uses; the playout
/// buffer always renders exactly one quantum. Rendered mono samples the host
/// has not consumed yet are carried over into the next callback.
pub struct RenderQuantizer {
    quantum: Vec<f32>,
    position: usize,
    channels: u16,
}

impl RenderQuantizer {
    /// Creates a quantizer for `quantum_size`-sample quanta and `channels` interleaved device channels.
    pub fn new(quantum_size: usize, channels: u16) -> Self {
        let quantum_size = quantum_size.max(1);
        Self {
            quantum: vec![0.0; quantum_size],
            // Start exhausted so the first fill renders immediately
            position: quantum_size,
            channels,
        }
    }

    /// Samples in one render quantum.
    pub fn quantum_size(&self) -> usize {
        self.quantum.len()
    }

    /// Interleaved device channels filled per mono sample.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Fills an interleaved device buffer, calling `render` once per quantum consumed.
    ///
    /// A trailing partial frame (fewer samples than channels) is zeroed.
    pub fn fill<F>(&mut self, interleaved: &mut [f32], mut render: F)
    where
        F: FnMut(&mut [f32]),
    {
        if self.channels == 0 {
            interleaved.fill(0.0);
            return;
        }

        let channels = usize::from(self.channels);
        let frames = interleaved.len() / channels;
        let mut written = 0;

        while written < frames {
            if self.position == self.quantum.len() {
                render(&mut self.quantum);
                self.position = 0;
            }

            let take = (self.quantum.len() - self.position).min(frames - written);
            let source = &self.quantum[self.position..self.position + take];
            upmix_mono(
                source,
                self.channels,
                &mut interleaved[written * channels..(written + take) * channels],
            );
            self.position += take;
            written += take;
        }

        interleaved[frames * channels..].fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_render(counter: &mut f32) -> impl FnMut(&mut [f32]) + '_ {
        move |block: &mut [f32]| {
            for sample in block.iter_mut() {
                *sample = *counter;
                *counter += 1.0;
            }
        }
    }

    #[test]
    fn test_renders_whole_quanta_only() {
        let mut quantizer = RenderQuantizer::new(4, 1);
        let mut next = 0.0;
        let mut calls = 0;

        let mut out = [0.0; 6];
        quantizer.fill(&mut out, |block| {
            calls += 1;
            counting_render(&mut next)(block);
        });
        assert_eq!(calls, 2);
        assert_eq!(out, [0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

        // Leftover samples 6 and 7 are used before rendering again
        let mut out = [0.0; 2];
        quantizer.fill(&mut out, counting_render(&mut next));
        assert_eq!(out, [6.0, 7.0]);
    }

    #[test]
    fn test_upmixes_to_stereo() {
        let mut quantizer = RenderQuantizer::new(3, 2);
        let mut next = 1.0;
        let mut out = [0.0; 6];
        quantizer.fill(&mut out, counting_render(&mut next));
        assert_eq!(out, [1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn test_partial_trailing_frame_is_zeroed() {
        let mut quantizer = RenderQuantizer::new(4, 2);
        let mut out = [9.0; 5];
        quantizer.fill(&mut out, |block| block.fill(0.5));
        assert_eq!(out, [0.5, 0.5, 0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_zero_channels_outputs_silence() {
        let mut quantizer = RenderQuantizer::new(4, 0);
        let mut out = [9.0; 4];
        quantizer.fill(&mut out, |_| panic!("should not render"));
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_zero_quantum_is_one_sample() {
        let quantizer = RenderQuantizer::new(0, 1);
        assert_eq!(quantizer.quantum_size(), 1);
    }
}
