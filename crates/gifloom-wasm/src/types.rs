//! WASM-compatible wrapper types for render progress.
//!
//! This module provides JavaScript-friendly types that wrap the core
//! Gifloom types, handling the conversion between Rust and JavaScript data
//! representations.

use gifloom_core::RenderProgress;
use wasm_bindgen::prelude::*;

/// Progress of a stepped render, for JavaScript.
///
/// After each `step()` call, `fraction` holds the completed share of the
/// queued frames. Once `done` is true, `bytes` carries the finished GIF
/// exactly once.
///
/// # Memory Management
///
/// The encoded bytes are stored in WASM memory. Calling `bytes()` copies
/// them to JavaScript memory as a `Uint8Array`; the wrapper can then be
/// dropped and wasm-bindgen's finalizer reclaims the WASM side.
#[wasm_bindgen]
pub struct JsRenderProgress {
    completed: usize,
    total: usize,
    fraction: f32,
    bytes: Option<Vec<u8>>,
}

#[wasm_bindgen]
impl JsRenderProgress {
    /// Number of frames encoded so far
    #[wasm_bindgen(getter)]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Total number of queued frames
    #[wasm_bindgen(getter)]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Completed fraction in [0, 1]
    #[wasm_bindgen(getter)]
    pub fn fraction(&self) -> f32 {
        self.fraction
    }

    /// Whether the render has finished and `bytes` is available
    #[wasm_bindgen(getter)]
    pub fn done(&self) -> bool {
        self.bytes.is_some()
    }

    /// The encoded GIF as a Uint8Array, or undefined while rendering.
    ///
    /// Note: This creates a copy of the encoded data.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.bytes.clone()
    }
}

impl JsRenderProgress {
    /// Create a JsRenderProgress from a core progress report.
    ///
    /// This is an internal constructor used by the encode bindings.
    pub(crate) fn from_progress(progress: RenderProgress, total: usize) -> Self {
        match progress {
            RenderProgress::Frame {
                completed,
                total,
                fraction,
            } => Self {
                completed,
                total,
                fraction,
                bytes: None,
            },
            RenderProgress::Done { bytes } => Self {
                completed: total,
                total,
                fraction: 1.0,
                bytes: Some(bytes),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_progress_is_not_done() {
        let progress = JsRenderProgress::from_progress(
            RenderProgress::Frame {
                completed: 1,
                total: 4,
                fraction: 0.25,
            },
            4,
        );
        assert!(!progress.done());
        assert_eq!(progress.completed(), 1);
        assert_eq!(progress.total(), 4);
        assert_eq!(progress.bytes(), None);
    }

    #[test]
    fn test_done_progress_carries_bytes() {
        let progress =
            JsRenderProgress::from_progress(RenderProgress::Done { bytes: vec![1, 2, 3] }, 2);
        assert!(progress.done());
        assert_eq!(progress.fraction(), 1.0);
        assert_eq!(progress.completed(), 2);
        assert_eq!(progress.bytes(), Some(vec![1, 2, 3]));
    }
}
