//! Gifloom WASM - WebAssembly bindings for Gifloom
//!
//! This crate exposes the gifloom-core animated GIF encoder to
//! JavaScript/TypeScript applications, typically to turn captured canvas
//! frames into a downloadable GIF without leaving the page.
//!
//! # Module Structure
//!
//! - `encode` - The render queue binding (`JsGifRenderer`)
//! - `types` - WASM-compatible progress/result wrapper types
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsGifRenderer } from '@gifloom/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const renderer = new JsGifRenderer(canvas.width, canvas.height);
//! renderer.set_repeat(0); // loop forever
//! for (const frame of frames) {
//!   renderer.add_frame(frame.rgba, frame.delayMs);
//! }
//!
//! // One frame per step keeps the page responsive
//! const tick = () => {
//!   const progress = renderer.step();
//!   progressBar.value = progress.fraction;
//!   if (progress.done) {
//!     save(progress.bytes);
//!   } else {
//!     requestAnimationFrame(tick);
//!   }
//! };
//! tick();
//! ```

use wasm_bindgen::prelude::*;

mod encode;
mod types;

// Re-export public types
pub use encode::JsGifRenderer;
pub use types::JsRenderProgress;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    // Future: Set up panic hook for better error messages in browser console
    // when console_error_panic_hook feature is added
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
