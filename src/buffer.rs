//! An owned pixel rectangle.
//!
//! Capture and compositing threads shuttle frames around as flat byte
//! buffers: usually RGBA, sometimes bare RGB or a single-channel plane.
//! [`FrameBuffer`] owns the storage and knows its geometry, so producers and
//! consumers agree on pitch and size without passing them alongside.

/// Interleaved pixel buffer with `channels` bytes per pixel.
pub struct FrameBuffer {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
}

impl FrameBuffer {
    /// Allocate a zeroed buffer. `channels` is bytes per pixel: 4 for RGBA,
    /// 3 for RGB, 1 for a bare plane.
    pub fn new(width: usize, height: usize, channels: usize) -> FrameBuffer {
        FrameBuffer {
            data: vec![0; width * height * channels],
            width,
            height,
            channels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Bytes per row.
    pub fn pitch(&self) -> usize {
        self.width * self.channels
    }

    /// Total size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Change the geometry. The storage is reallocated (zero-filled) only
    /// when the byte size actually changes; a same-size change — say 640×480
    /// RGB to 480×640 RGB — just reinterprets the existing bytes.
    pub fn resize(&mut self, width: usize, height: usize, channels: usize) {
        let new_len = width * height * channels;
        if new_len != self.data.len() {
            self.data = vec![0; new_len];
        }
        self.width = width;
        self.height = height;
        self.channels = channels;
    }

    /// Zero every byte.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Whole-buffer blit.
    ///
    /// # Panics
    ///
    /// Panics if `data` is not exactly [`len`](Self::len) bytes.
    pub fn copy_from(&mut self, data: &[u8]) {
        self.data.copy_from_slice(data);
    }

    /// Fill from separate color and alpha planes.
    ///
    /// For a 4-channel buffer, interleaves 3-byte color pixels with a
    /// 1-byte-per-pixel alpha plane; a missing plane leaves color untouched
    /// or forces alpha to 0xFF respectively. A 3-channel buffer takes only
    /// the color plane, a 1-channel buffer only the alpha plane.
    ///
    /// # Panics
    ///
    /// Panics if a provided plane doesn't cover `width * height` pixels.
    pub fn fill_interleaved(&mut self, color: Option<&[u8]>, alpha: Option<&[u8]>) {
        let pixels = self.width * self.height;
        if let Some(color) = color {
            assert_eq!(color.len(), pixels * 3, "color plane size mismatch");
        }
        if let Some(alpha) = alpha {
            assert_eq!(alpha.len(), pixels, "alpha plane size mismatch");
        }

        match self.channels {
            n if n >= 4 => {
                for i in 0..pixels {
                    let out = &mut self.data[i * n..i * n + 4];
                    if let Some(color) = color {
                        out[..3].copy_from_slice(&color[i * 3..i * 3 + 3]);
                    }
                    out[3] = match alpha {
                        Some(alpha) => alpha[i],
                        None => 0xFF,
                    };
                }
            }
            3 => {
                if let Some(color) = color {
                    self.data.copy_from_slice(color);
                }
            }
            1 => {
                if let Some(alpha) = alpha {
                    self.data.copy_from_slice(alpha);
                }
            }
            _ => {}
        }
    }
}

impl AsRef<[u8]> for FrameBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
