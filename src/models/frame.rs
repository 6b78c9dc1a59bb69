use crate::error::DecodeError;

/// Native pixel layout of a camera frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// YUV 4:2:0, full Y plane followed by interleaved V/U (Android camera default)
    #[default]
    Nv21,
    /// YUV 4:2:0, full Y plane followed by separate U and V planes
    I420,
    /// Single-channel 8-bit luminance
    Gray8,
}

impl PixelFormat {
    /// Expected buffer length for a frame of the given size
    ///
    /// For the 4:2:0 formats this is `w * h * 3 / 2` on even dimensions; odd
    /// dimensions round the chroma planes up.
    pub fn frame_len(&self, width: usize, height: usize) -> usize {
        let luma = width * height;
        match self {
            PixelFormat::Gray8 => luma,
            PixelFormat::Nv21 | PixelFormat::I420 => {
                luma + 2 * width.div_ceil(2) * height.div_ceil(2)
            }
        }
    }
}

/// Owned snapshot of one camera frame
///
/// The buffer is always a private copy: frame sources reuse their buffers as
/// soon as the delivery callback returns.
#[derive(Debug, Clone)]
pub struct PixelFrame {
    data: Vec<u8>,
    width: usize,
    height: usize,
    format: PixelFormat,
}

impl PixelFrame {
    /// Copy `data` into a new frame, validating its length against `format`
    pub fn copy_from(
        data: &[u8],
        width: usize,
        height: usize,
        format: PixelFormat,
    ) -> Result<Self, DecodeError> {
        let expected = format.frame_len(width, height);
        if width == 0 || height == 0 || data.len() < expected {
            return Err(DecodeError::InvalidFrame {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data: data[..expected].to_vec(),
            width,
            height,
            format,
        })
    }

    /// Frame width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Native pixel format
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw frame bytes in the native format
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The luminance plane; every supported format stores it first
    pub fn luma_plane(&self) -> &[u8] {
        &self.data[..self.width * self.height]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_len() {
        assert_eq!(PixelFormat::Nv21.frame_len(640, 480), 640 * 480 * 3 / 2);
        assert_eq!(PixelFormat::I420.frame_len(4, 2), 12);
        assert_eq!(PixelFormat::Gray8.frame_len(10, 10), 100);
        assert_eq!(PixelFormat::Nv21.frame_len(3, 3), 9 + 8);
    }

    #[test]
    fn test_copy_is_independent_of_source_buffer() {
        let mut producer_buffer = vec![7u8; PixelFormat::Nv21.frame_len(4, 4)];
        let frame = PixelFrame::copy_from(&producer_buffer, 4, 4, PixelFormat::Nv21).unwrap();

        producer_buffer.fill(0);

        assert!(frame.data().iter().all(|&b| b == 7));
        assert_eq!(frame.luma_plane().len(), 16);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let err = PixelFrame::copy_from(&[0u8; 10], 4, 4, PixelFormat::Gray8).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidFrame {
                expected: 16,
                actual: 10,
                ..
            }
        ));
    }
}
