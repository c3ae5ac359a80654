use serde::{Deserialize, Serialize};

/// Decoded RGBA pixels of the current video image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterFrame {
    pub width: u32,
    pub height: u32,
    /// Raw RGBA8 pixel buffer, row-major.
    pub data: Vec<u8>,
}

impl RasterFrame {
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    pub fn empty() -> Self {
        Self::from_rgba(0, 0, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// True when the buffer length matches `width * height * 4`.
    pub fn is_consistent(&self) -> bool {
        self.data.len() as u64 == self.width as u64 * self.height as u64 * 4
    }
}
