//! FFmpeg video filter definitions.

/// Scale into a `width`x`height` canvas keeping aspect ratio, then pad with
/// bars centered on both axes.
pub fn filter_letterbox(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
        w = width,
        h = height
    )
}
