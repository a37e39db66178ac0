//! Gifloom Core - Animated GIF encoding library
//!
//! This crate provides the core encoding functionality for Gifloom: NeuQuant
//! color quantization, palette-index mapping, GIF-variant LZW compression,
//! and GIF89a container serialization. Frames go in as raw RGBA buffers and
//! one immutable GIF byte stream comes out.

pub mod encoder;
pub mod index;
pub mod lzw;
pub mod quantize;
pub mod writer;

pub use encoder::{EncodeError, GifEncoder, RenderProgress, Renderer};
pub use quantize::NeuQuant;

/// Loop behavior for the encoded animation.
///
/// GIF itself plays an animation once; looping is requested through the
/// Netscape2.0 application extension, which is only written when looping
/// is wanted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Repeat {
    /// Play the animation once (no Netscape extension is written).
    #[default]
    None,
    /// Loop forever (Netscape loop count 0).
    Infinite,
    /// Loop a fixed number of times.
    Finite(u16),
}

impl Repeat {
    /// Build a `Repeat` from the conventional signed loop-count encoding:
    /// `-1` plays once, `0` loops forever, `N > 0` loops N times.
    pub fn from_loop_count(count: i32) -> Self {
        match count {
            c if c < 0 => Repeat::None,
            0 => Repeat::Infinite,
            c => Repeat::Finite(c.min(i32::from(u16::MAX)) as u16),
        }
    }

    /// The loop-count field for the Netscape extension, or `None` when the
    /// extension should not be written at all.
    pub fn loop_field(self) -> Option<u16> {
        match self {
            Repeat::None => None,
            Repeat::Infinite => Some(0),
            Repeat::Finite(n) => Some(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_default_plays_once() {
        assert_eq!(Repeat::default(), Repeat::None);
        assert_eq!(Repeat::default().loop_field(), None);
    }

    #[test]
    fn test_repeat_from_loop_count_negative() {
        assert_eq!(Repeat::from_loop_count(-1), Repeat::None);
        assert_eq!(Repeat::from_loop_count(-100), Repeat::None);
    }

    #[test]
    fn test_repeat_from_loop_count_zero_is_infinite() {
        assert_eq!(Repeat::from_loop_count(0), Repeat::Infinite);
        assert_eq!(Repeat::Infinite.loop_field(), Some(0));
    }

    #[test]
    fn test_repeat_from_loop_count_positive() {
        assert_eq!(Repeat::from_loop_count(3), Repeat::Finite(3));
        assert_eq!(Repeat::Finite(3).loop_field(), Some(3));
    }

    #[test]
    fn test_repeat_from_loop_count_saturates_at_u16_max() {
        assert_eq!(Repeat::from_loop_count(1_000_000), Repeat::Finite(u16::MAX));
    }
}
