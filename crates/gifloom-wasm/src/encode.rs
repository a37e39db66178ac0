//! GIF encoding WASM bindings.
//!
//! This module exposes the gifloom-core render queue to JavaScript. A page
//! queues captured frames, then either drives the encode one frame per
//! animation tick with [`JsGifRenderer::step`] (so the UI never freezes) or
//! runs it in one call with [`JsGifRenderer::render`] and a progress
//! callback.

use crate::types::JsRenderProgress;
use gifloom_core::Renderer;
use wasm_bindgen::prelude::*;

/// Render options as passed from JavaScript.
///
/// All fields are optional; missing ones leave the current setting alone.
#[derive(serde::Deserialize)]
struct RenderOptionsJs {
    /// `-1` play once, `0` loop forever, `N > 0` loop N times
    repeat: Option<i32>,
    /// Quantizer sampling factor (1-30, 1 = best)
    quality: Option<i32>,
    /// RGB color to render as transparent
    transparent: Option<[u8; 3]>,
}

/// An animated GIF render queue for JavaScript.
///
/// Frames are RGBA `Uint8Array`s of width × height × 4 bytes. Each renderer
/// produces its output once; after the render completes, further calls
/// return an error.
#[wasm_bindgen]
pub struct JsGifRenderer {
    inner: Option<Renderer>,
}

#[wasm_bindgen]
impl JsGifRenderer {
    /// Create a renderer for frames of the given dimensions.
    ///
    /// # Arguments
    /// * `width` - frame width in pixels (all frames share it)
    /// * `height` - frame height in pixels
    #[wasm_bindgen(constructor)]
    pub fn new(width: u16, height: u16) -> Result<JsGifRenderer, JsValue> {
        let inner = Renderer::new(width, height).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(JsGifRenderer { inner: Some(inner) })
    }

    /// Set the loop behavior: `-1` play once, `0` loop forever, `N > 0`
    /// loop N times.
    pub fn set_repeat(&mut self, loop_count: i32) {
        if let Some(inner) = self.inner.as_mut() {
            inner.set_repeat(loop_count);
        }
    }

    /// Set the quantizer sampling factor (1-30). 1 is the highest fidelity
    /// and slowest; 10 is a good default for screen captures.
    pub fn set_quality(&mut self, sample_factor: i32) {
        if let Some(inner) = self.inner.as_mut() {
            inner.set_quality(sample_factor);
        }
    }

    /// Render pixels of this color as transparent.
    pub fn set_transparent(&mut self, r: u8, g: u8, b: u8) {
        if let Some(inner) = self.inner.as_mut() {
            inner.set_transparent(Some([r, g, b]));
        }
    }

    /// Apply several options at once from a plain JavaScript object:
    /// `{ repeat?: number, quality?: number, transparent?: [r, g, b] }`.
    pub fn set_options(&mut self, options: JsValue) -> Result<(), JsValue> {
        let options: RenderOptionsJs = serde_wasm_bindgen::from_value(options)
            .map_err(|e| JsValue::from_str(&format!("Invalid options: {e}")))?;
        if let Some(repeat) = options.repeat {
            self.set_repeat(repeat);
        }
        if let Some(quality) = options.quality {
            self.set_quality(quality);
        }
        if let Some([r, g, b]) = options.transparent {
            self.set_transparent(r, g, b);
        }
        Ok(())
    }

    /// Queue one frame.
    ///
    /// # Arguments
    /// * `rgba` - RGBA pixel data (4 bytes per pixel, row-major order),
    ///   e.g. from `CanvasRenderingContext2D.getImageData().data`
    /// * `delay_ms` - display time in milliseconds (rounded to 10 ms units)
    pub fn add_frame(&mut self, rgba: Vec<u8>, delay_ms: u32) -> Result<(), JsValue> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(|| JsValue::from_str("renderer already produced its output"))?;
        inner
            .add_frame(rgba, delay_ms)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Number of queued frames
    #[wasm_bindgen(getter)]
    pub fn frame_count(&self) -> usize {
        self.inner.as_ref().map_or(0, Renderer::frame_count)
    }

    /// Encode one queued frame and report progress.
    ///
    /// Call once per animation tick until the returned progress reports
    /// `done`; its `bytes` then holds the finished GIF. Frames are atomic,
    /// so the page only blocks for one frame's worth of work per call.
    pub fn step(&mut self) -> Result<JsRenderProgress, JsValue> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(|| JsValue::from_str("renderer already produced its output"))?;
        let total = inner.frame_count();
        let progress = inner.step().map_err(|e| JsValue::from_str(&e.to_string()))?;
        let progress = JsRenderProgress::from_progress(progress, total);
        if progress.done() {
            self.inner = None;
        }
        Ok(progress)
    }

    /// Run the full encode synchronously and return the GIF bytes.
    ///
    /// The progress callback receives a fraction in [0, 1] once per frame
    /// plus a final 1.0. Prefer [`Self::step`] for large animations; this
    /// call blocks until every frame is encoded.
    pub fn render(&mut self, on_progress: &js_sys::Function) -> Result<Vec<u8>, JsValue> {
        let inner = self
            .inner
            .take()
            .ok_or_else(|| JsValue::from_str("renderer already produced its output"))?;
        inner
            .render_with_progress(|fraction| {
                let _ = on_progress.call1(&JsValue::NULL, &JsValue::from_f64(f64::from(fraction)));
            })
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

/// Tests for encode bindings.
///
/// Note: Methods returning `Result<T, JsValue>` only work on wasm32
/// targets. For comprehensive encoding tests, see `gifloom_core::encoder`
/// which tests the underlying functionality on all targets.
#[cfg(test)]
mod tests {
    // The binding layer is a thin pass-through; its observable behavior
    // (progress cadence, one-shot output, error mapping) is covered by the
    // core Renderer tests.
}
