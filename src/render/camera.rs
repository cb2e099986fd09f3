use serde::Serialize;
use crate::constants::{CAMERA_DIRECTION, CAMERA_DISTANCE_FACTOR, CAMERA_FOV_DEG, CAMERA_NEAR};
use super::geometry::{Aabb, Vec3};

/// 透視投影カメラ（アスペクト比1のサムネイル用）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_deg: f32,
}

// スクリーン座標に投影された頂点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
}

impl Camera {
    /// バウンディングボックス全体が収まるように配置
    /// 距離 = 最大辺 × CAMERA_DISTANCE_FACTOR、中心を斜め上から見下ろす
    pub fn frame(bounds: &Aabb) -> Self {
        let center = bounds.center();
        let distance = bounds.max_extent() * CAMERA_DISTANCE_FACTOR;
        Self {
            position: center + Vec3::from_array(CAMERA_DIRECTION) * distance,
            target: center,
            fov_deg: CAMERA_FOV_DEG,
        }
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).length()
    }

    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.position).normalize();
        let right = forward.cross(Vec3::new(0.0, 1.0, 0.0)).normalize();
        let up = right.cross(forward);
        (forward, right, up)
    }

    /// ニアクリップより手前の点は None
    pub fn project(&self, point: Vec3, width: u32, height: u32) -> Option<Projected> {
        let (forward, right, up) = self.basis();
        let rel = point - self.position;
        let depth = rel.dot(forward);
        if depth <= CAMERA_NEAR {
            return None;
        }

        let focal = 1.0 / (self.fov_deg.to_radians() * 0.5).tan();
        let aspect = width as f32 / height as f32;
        let ndc_x = rel.dot(right) * focal / (depth * aspect);
        let ndc_y = rel.dot(up) * focal / depth;

        Some(Projected {
            x: (ndc_x + 1.0) * 0.5 * width as f32,
            y: (1.0 - ndc_y) * 0.5 * height as f32,
            depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_at_two_and_a_half_extents() {
        let bounds = Aabb::new(Vec3::new(-1.0, -0.5, -0.25), Vec3::new(1.0, 0.5, 0.25));
        let camera = Camera::frame(&bounds);
        let distance = 2.0 * CAMERA_DISTANCE_FACTOR;

        assert_eq!(camera.target, Vec3::default());
        assert_eq!(camera.position, Vec3::new(0.8, 0.6, 0.8) * distance);
    }

    #[test]
    fn target_projects_to_image_center() {
        let camera = Camera::frame(&Aabb::unit());
        let p = camera.project(camera.target, 256, 256).unwrap();
        assert!((p.x - 128.0).abs() < 1e-3);
        assert!((p.y - 128.0).abs() < 1e-3);
        assert!(p.depth > 0.0);

        // カメラの背後は投影されない
        let behind = camera.position + (camera.position - camera.target);
        assert!(camera.project(behind, 256, 256).is_none());
    }

    #[test]
    fn framed_box_stays_inside_the_image() {
        let bounds = Aabb::unit().fit_to_view();
        let camera = Camera::frame(&bounds);
        for corner in bounds.corners() {
            let p = camera.project(corner, 256, 256).unwrap();
            assert!((0.0..=256.0).contains(&p.x), "x out of frame: {}", p.x);
            assert!((0.0..=256.0).contains(&p.y), "y out of frame: {}", p.y);
        }
    }
}
