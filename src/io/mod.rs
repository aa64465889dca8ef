// Purpose - host-facing audio buffers

/// Non-interleaved multi-channel sample buffer, one `Vec` per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn new(num_channels: usize, num_frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; num_frames]; num_channels],
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    /// Add `value` to frame `frame` of every channel.
    #[inline]
    pub fn add_frame(&mut self, frame: usize, value: f32) {
        for channel in &mut self.channels {
            channel[frame] += value;
        }
    }

    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Interleave into `out` (frame-major), as audio device callbacks expect.
    pub fn write_interleaved(&self, out: &mut [f32]) {
        let num_channels = self.num_channels();
        if num_channels == 0 {
            return;
        }
        for (frame, samples) in out.chunks_mut(num_channels).enumerate() {
            for (ch, sample) in samples.iter_mut().enumerate() {
                *sample = self.channels[ch].get(frame).copied().unwrap_or(0.0);
            }
        }
    }
}
