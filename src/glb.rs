use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::constants::{GLB_CHUNK_JSON, GLB_HEADER_LEN, GLB_MAGIC, GLB_VERSION};
use crate::error::{GalleryError, Result};
use crate::render::{Aabb, Vec3};

/// GLBヘッダーとJSONチャンクから読み取った情報
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlbInfo {
    pub version: u32,
    pub length: u32,
    pub mesh_count: usize,
    /// POSITION アクセサの min/max の和集合（ノード変換は考慮しない）
    pub bounds: Option<Aabb>,
}

// JSONチャンクのうち境界計算に必要な部分だけ
#[derive(Debug, Default, Deserialize)]
struct GltfDocument {
    #[serde(default)]
    accessors: Vec<Accessor>,
    #[serde(default)]
    meshes: Vec<Mesh>,
}

#[derive(Debug, Deserialize)]
struct Accessor {
    #[serde(default)]
    min: Option<Vec<f32>>,
    #[serde(default)]
    max: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct Mesh {
    #[serde(default)]
    primitives: Vec<Primitive>,
}

#[derive(Debug, Deserialize)]
struct Primitive {
    #[serde(default)]
    attributes: HashMap<String, usize>,
}

impl GltfDocument {
    fn position_bounds(&self) -> Option<Aabb> {
        self.meshes
            .iter()
            .flat_map(|m| &m.primitives)
            .filter_map(|p| p.attributes.get("POSITION"))
            .filter_map(|&index| self.accessors.get(index))
            .filter_map(Accessor::bounds)
            .reduce(Aabb::union)
    }
}

impl Accessor {
    fn bounds(&self) -> Option<Aabb> {
        let min = vec3(self.min.as_deref()?)?;
        let max = vec3(self.max.as_deref()?)?;
        Some(Aabb::new(min, max))
    }
}

fn vec3(values: &[f32]) -> Option<Vec3> {
    match values {
        [x, y, z, ..] if x.is_finite() && y.is_finite() && z.is_finite() => {
            Some(Vec3::new(*x, *y, *z))
        }
        _ => None,
    }
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Option<u32> {
    let mut buf = [0u8; 4];
    cursor.read_exact(&mut buf).ok()?;
    Some(u32::from_le_bytes(buf))
}

/// GLBファイルを検証し、メッシュ数と境界を読み取る
/// バイナリチャンク（頂点データ・テクスチャ）は読まない
pub fn inspect_glb(path: &Path, data: &[u8]) -> Result<GlbInfo> {
    let invalid = |reason: String| GalleryError::invalid_glb(path, reason);
    let mut cursor = Cursor::new(data);

    // ヘッダー: magic(4) + version(4) + length(4)
    let magic = read_u32(&mut cursor).ok_or_else(|| invalid("ヘッダーが短すぎます".into()))?;
    if magic != GLB_MAGIC {
        return Err(invalid(format!("マジックナンバー不一致: {:#010x}", magic)));
    }

    let version = read_u32(&mut cursor).ok_or_else(|| invalid("ヘッダーが短すぎます".into()))?;
    if version != GLB_VERSION {
        return Err(invalid(format!("未対応のバージョン: {}", version)));
    }

    let length = read_u32(&mut cursor).ok_or_else(|| invalid("ヘッダーが短すぎます".into()))?;
    if (length as usize) > data.len() {
        return Err(invalid(format!(
            "ファイルが途中で切れています: 宣言 {} バイト / 実際 {} バイト",
            length,
            data.len()
        )));
    }
    if (length as usize) < GLB_HEADER_LEN + 8 {
        return Err(invalid(format!("宣言長が短すぎます: {}", length)));
    }

    // 最初のチャンクは必ずJSON
    let chunk_len = read_u32(&mut cursor).ok_or_else(|| invalid("チャンクヘッダーがありません".into()))?;
    let chunk_type = read_u32(&mut cursor).ok_or_else(|| invalid("チャンクヘッダーがありません".into()))?;
    if chunk_type != GLB_CHUNK_JSON {
        return Err(invalid(format!("先頭チャンクがJSONではありません: {:#010x}", chunk_type)));
    }

    let start = cursor.position() as usize;
    let end = start
        .checked_add(chunk_len as usize)
        .filter(|&end| end <= length as usize)
        .ok_or_else(|| invalid(format!("JSONチャンク長が不正: {}", chunk_len)))?;

    let document: GltfDocument = serde_json::from_slice(&data[start..end])
        .map_err(|e| GalleryError::json(format!("{} のJSONチャンク", path.display()), e))?;

    Ok(GlbInfo {
        version,
        length,
        mesh_count: document.meshes.len(),
        bounds: document.position_bounds(),
    })
}
