use ndarray::{Array2, ArrayView3, Axis};

/// A single decoded video frame: contiguous 8-bit pixels in row-major order.
///
/// Format conversion happens at the decoder boundary; everything downstream
/// only sees `(height, width, channels)` bytes.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Builds a frame with every channel of every pixel set to `value`.
    pub fn filled(width: u32, height: u32, channels: u8, value: u8, index: usize) -> Self {
        let len = (width as usize) * (height as usize) * (channels as usize);
        Self::new(vec![value; len], width, height, channels, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies one channel out as a `(height, width)` plane.
    ///
    /// Single-channel frames return their only plane whatever `channel` is.
    pub fn channel_plane(&self, channel: usize) -> Array2<u8> {
        let channel = if self.channels <= 1 {
            0
        } else {
            channel.min(self.channels as usize - 1)
        };
        self.as_ndarray().index_axis(Axis(2), channel).to_owned()
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
