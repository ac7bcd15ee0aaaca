use crate::utils::error::{FolioError, Result};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{fontdb, Options, Tree};
use std::sync::Arc;

/// Rasterizes SVG markup to PNG at a fixed output height.
pub struct CardRenderer {
    fontdb: Arc<fontdb::Database>,
    target_height: u32,
}

impl CardRenderer {
    /// Loads the system font database once; it is shared by every render.
    pub fn new(target_height: u32) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!("Loaded {} font faces for card rendering", db.len());
        Self {
            fontdb: Arc::new(db),
            target_height,
        }
    }

    pub fn render_png(&self, svg: &str) -> Result<Vec<u8>> {
        let mut options = Options::default();
        options.fontdb = Arc::clone(&self.fontdb);

        let tree = Tree::from_str(svg, &options).map_err(|e| FolioError::RenderError {
            message: format!("invalid SVG: {}", e),
        })?;

        let size = tree.size();
        let scale = self.target_height as f32 / size.height();
        let width = (size.width() * scale).round().max(1.0) as u32;

        let mut pixmap =
            Pixmap::new(width, self.target_height).ok_or_else(|| FolioError::RenderError {
                message: format!("cannot allocate {}x{} canvas", width, self.target_height),
            })?;
        resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

        pixmap.encode_png().map_err(|e| FolioError::RenderError {
            message: format!("PNG encoding failed: {}", e),
        })
    }

    /// Runs [`render_png`](Self::render_png) on the blocking pool.
    pub async fn render_png_blocking(self: &Arc<Self>, svg: String) -> Result<Vec<u8>> {
        let renderer = Arc::clone(self);
        tokio::task::spawn_blocking(move || renderer.render_png(&svg))
            .await
            .map_err(|e| FolioError::RenderError {
                message: format!("render task failed: {}", e),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r##"<svg width="100" height="50" viewBox="0 0 100 50" xmlns="http://www.w3.org/2000/svg"><rect width="100" height="50" fill="#89b4fa"/></svg>"##;

    #[test]
    fn test_render_scales_to_target_height() {
        let renderer = CardRenderer::new(200);
        let png = renderer.render_png(SQUARE).unwrap();

        assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
        // IHDR width and height follow the 8-byte signature and chunk header
        let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
        let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
        assert_eq!((width, height), (400, 200));
    }

    #[test]
    fn test_invalid_svg_is_render_error() {
        let renderer = CardRenderer::new(100);
        let err = renderer.render_png("<not-svg").unwrap_err();
        assert!(matches!(err, FolioError::RenderError { .. }));
    }

    #[tokio::test]
    async fn test_render_on_blocking_pool() {
        let renderer = Arc::new(CardRenderer::new(50));
        let png = renderer.render_png_blocking(SQUARE.to_string()).await.unwrap();
        assert!(!png.is_empty());
    }
}
