// src/audio_buffer.rs

/// Left/right output planes for one block.
#[derive(Debug, Default, Clone)]
pub struct StereoBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl StereoBuffer {
    pub fn new(frames: usize) -> Self {
        Self {
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    /// Reallocate to `frames`. Not real-time safe.
    pub fn resize(&mut self, frames: usize) {
        self.left.resize(frames, 0.0);
        self.right.resize(frames, 0.0);
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }

    #[inline]
    pub fn left(&self) -> &[f32] {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Both planes, mutably, restricted to `range`.
    #[inline]
    pub fn planes_mut(&mut self, range: std::ops::Range<usize>) -> (&mut [f32], &mut [f32]) {
        (&mut self.left[range.clone()], &mut self.right[range])
    }

    /// Write the block as interleaved L/R frames.
    ///
    /// Returns the number of frames written, limited by `out.len() / 2`.
    pub fn write_interleaved(&self, out: &mut [f32]) -> usize {
        let frames = self.frames().min(out.len() / 2);
        for (i, frame) in out.chunks_exact_mut(2).take(frames).enumerate() {
            frame[0] = self.left[i];
            frame[1] = self.right[i];
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave() {
        let mut buf = StereoBuffer::new(3);
        let (l, r) = buf.planes_mut(0..3);
        l.copy_from_slice(&[1.0, 2.0, 3.0]);
        r.copy_from_slice(&[-1.0, -2.0, -3.0]);

        let mut out = [0.0; 6];
        assert_eq!(buf.write_interleaved(&mut out), 3);
        assert_eq!(out, [1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);

        let mut short = [0.0; 3];
        assert_eq!(buf.write_interleaved(&mut short), 1);
        assert_eq!(short, [1.0, -1.0, 0.0]);
    }
}
