/// A captured video frame: tightly packed RGB24 pixels in row-major order.
///
/// Pixel format conversion happens at device and writer boundaries only;
/// the pipeline treats pixel data as opaque.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl VideoFrame {
    pub const CHANNELS: usize = 3;

    pub fn new(pixels: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            pixels.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "pixel length must equal width * height * 3"
        );
        Self {
            pixels,
            width,
            height,
            index,
        }
    }

    /// A single-color frame, handy for synthetic sources.
    pub fn filled(width: u32, height: u32, value: u8, index: usize) -> Self {
        let len = (width as usize) * (height as usize) * Self::CHANNELS;
        Self::new(vec![value; len], width, height, index)
    }

    pub fn from_rgb_image(image: image::RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, index)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sequence number assigned by the capture source (decode order).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * Self::CHANNELS;
        let start = y as usize * stride;
        &self.pixels[start..start + stride]
    }
}
