use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use image::{ImageFormat, Rgba, RgbaImage};
use tracing::debug;
use crate::constants::{AMBIENT_INTENSITY, KEY_LIGHT_POSITION, MAX_THUMBNAIL_SIZE, MIN_THUMBNAIL_SIZE};
use crate::error::{GalleryError, Result};
use crate::types::ThumbnailImage;
use super::camera::{Camera, Projected};
use super::geometry::{Aabb, Vec3};

// ボックスの6面（corners() のインデックスと外向き法線）
const BOX_FACES: [([usize; 4], Vec3); 6] = [
    ([0, 3, 2, 1], Vec3::new(0.0, 0.0, -1.0)),
    ([4, 5, 6, 7], Vec3::new(0.0, 0.0, 1.0)),
    ([0, 4, 7, 3], Vec3::new(-1.0, 0.0, 0.0)),
    ([1, 2, 6, 5], Vec3::new(1.0, 0.0, 0.0)),
    ([0, 1, 5, 4], Vec3::new(0.0, -1.0, 0.0)),
    ([3, 7, 6, 2], Vec3::new(0.0, 1.0, 0.0)),
];

/// 使用中のレンダーターゲット数（リーク検出用）
#[derive(Debug, Clone, Default)]
pub struct RenderTracker(Arc<AtomicUsize>);

impl RenderTracker {
    pub fn live(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

// サムネイルサイズ検証
pub fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    let range = MIN_THUMBNAIL_SIZE..=MAX_THUMBNAIL_SIZE;
    if !range.contains(&width) || !range.contains(&height) {
        return Err(GalleryError::Render(format!(
            "無効なサムネイルサイズ: {}x{} (範囲: {}..={})",
            width, height, MIN_THUMBNAIL_SIZE, MAX_THUMBNAIL_SIZE
        )));
    }
    Ok(())
}

/// オフスクリーンのレンダーターゲット
/// Drop で必ず解放されるので、成功・失敗どちらの経路でもリークしない
pub struct RenderSession {
    frame: RgbaImage,
    depth: Vec<f32>,
    tracker: RenderTracker,
}

impl RenderSession {
    pub fn new(width: u32, height: u32, tracker: &RenderTracker) -> Result<Self> {
        validate_dimensions(width, height)?;
        tracker.0.fetch_add(1, Ordering::SeqCst);
        debug!(width, height, "レンダーターゲットを確保");
        Ok(Self {
            frame: RgbaImage::new(width, height),
            depth: vec![f32::INFINITY; (width * height) as usize],
            tracker: tracker.clone(),
        })
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    pub fn clear(&mut self, [r, g, b]: [u8; 3]) {
        for pixel in self.frame.pixels_mut() {
            *pixel = Rgba([r, g, b, 255]);
        }
        self.depth.fill(f32::INFINITY);
    }

    /// ボックスをフラットシェーディングで描画（キーライト + 環境光）
    /// 1ピクセル以上描いた面の数を返す
    pub fn draw_box(&mut self, bounds: &Aabb, camera: &Camera, color: [u8; 3]) -> usize {
        let corners = bounds.corners();
        let light = Vec3::from_array(KEY_LIGHT_POSITION);
        let mut drawn = 0;

        for (face, normal) in BOX_FACES {
            let quad = face.map(|i| corners[i]);
            let face_center = (quad[0] + quad[1] + quad[2] + quad[3]) * 0.25;

            // 背面カリング
            if normal.dot(camera.position - face_center) <= 0.0 {
                continue;
            }

            let diffuse = normal.dot((light - face_center).normalize()).max(0.0);
            let intensity = AMBIENT_INTENSITY + (1.0 - AMBIENT_INTENSITY) * diffuse;
            let shaded = color.map(|c| (c as f32 * intensity).round().min(255.0) as u8);

            let projected = quad.map(|p| camera.project(p, self.width(), self.height()));
            if let [Some(a), Some(b), Some(c), Some(d)] = projected {
                let painted = self.fill_triangle(a, b, c, shaded) + self.fill_triangle(a, c, d, shaded);
                if painted > 0 {
                    drawn += 1;
                }
            }
        }

        drawn
    }

    // 書き込んだピクセル数を返す
    fn fill_triangle(&mut self, a: Projected, b: Projected, c: Projected, [r, g, bl]: [u8; 3]) -> usize {
        let area = edge(a, b, c.x, c.y);
        if area.abs() <= f32::EPSILON {
            return 0;
        }
        let mut painted = 0;

        let (w, h) = (self.width() as f32, self.height() as f32);
        let min_x = a.x.min(b.x).min(c.x).floor().clamp(0.0, w) as u32;
        let max_x = a.x.max(b.x).max(c.x).ceil().clamp(0.0, w) as u32;
        let min_y = a.y.min(b.y).min(c.y).floor().clamp(0.0, h) as u32;
        let max_y = a.y.max(b.y).max(c.y).ceil().clamp(0.0, h) as u32;

        for y in min_y..max_y {
            for x in min_x..max_x {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(b, c, px, py) / area;
                let w1 = edge(c, a, px, py) / area;
                let w2 = edge(a, b, px, py) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * a.depth + w1 * b.depth + w2 * c.depth;
                let index = (y * self.width() + x) as usize;
                if depth < self.depth[index] {
                    self.depth[index] = depth;
                    self.frame.put_pixel(x, y, Rgba([r, g, bl, 255]));
                    painted += 1;
                }
            }
        }

        painted
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.frame.get_pixel(x, y).0
    }

    // PNG形式で出力（可逆圧縮）
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.frame.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    /// エンコードしてターゲットを解放
    pub fn finish(self) -> Result<ThumbnailImage> {
        let png = self.encode_png()?;
        Ok(ThumbnailImage::new(png, self.width(), self.height()))
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.tracker.0.fetch_sub(1, Ordering::SeqCst);
        debug!(width = self.frame.width(), height = self.frame.height(), "レンダーターゲットを解放");
    }
}

fn edge(a: Projected, b: Projected, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// 単色のプレースホルダー（読み込み中・エラー表示用）
pub fn placeholder_tile(size: u32, color: [u8; 3]) -> Result<ThumbnailImage> {
    let tracker = RenderTracker::default();
    let mut session = RenderSession::new(size, size, &tracker)?;
    session.clear(color);

    // エラー表示用の白い×印
    let inset = size / 4;
    for i in inset..size - inset {
        session.frame.put_pixel(i, i, Rgba([255, 255, 255, 255]));
        session.frame.put_pixel(size - 1 - i, i, Rgba([255, 255, 255, 255]));
    }

    session.finish()
}
