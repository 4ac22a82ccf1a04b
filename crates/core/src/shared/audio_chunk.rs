/// A chunk of captured audio: interleaved PCM samples normalized to [-1.0, 1.0].
#[derive(Clone, Debug)]
pub struct AudioChunk {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// A chunk of silence lasting `frames` sample frames.
    pub fn silence(frames: usize, sample_rate: u32, channels: u16) -> Self {
        Self::new(vec![0.0; frames * channels as usize], sample_rate, channels)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Downmixes to a single channel by averaging each sample frame.
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks(self.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_mono() {
        let chunk = AudioChunk::new(vec![0.0; 1600], 16000, 1);
        assert_eq!(chunk.duration(), 0.1);
    }

    #[test]
    fn test_duration_stereo() {
        let chunk = AudioChunk::new(vec![0.0; 96000], 48000, 2);
        assert_eq!(chunk.frame_count(), 48000);
        assert_eq!(chunk.duration(), 1.0);
    }

    #[test]
    fn test_to_mono_averages_channels() {
        let chunk = AudioChunk::new(vec![1.0, 0.0, 0.5, 0.5], 16000, 2);
        assert_eq!(chunk.to_mono(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_silence() {
        let chunk = AudioChunk::silence(160, 16000, 1);
        assert_eq!(chunk.samples().len(), 160);
        assert!(chunk.samples().iter().all(|&s| s == 0.0));
    }
}
