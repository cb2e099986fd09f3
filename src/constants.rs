// サムネイル設定（グリッド1セル分・PNG形式）
pub const THUMBNAIL_SIZE: u32 = 256;

// サムネイルサイズの許容範囲
pub const MIN_THUMBNAIL_SIZE: u32 = 16;
pub const MAX_THUMBNAIL_SIZE: u32 = 2048;

// ギャラリー読み込み（UIスレッドを塞がないようバッチ分割）
pub const BATCH_SIZE: usize = 6;
pub const BATCH_PAUSE_MS: u64 = 100;

// モデル配置: 最大辺をこの値に収める
pub const MAX_MODEL_EXTENT: f32 = 3.0;

// 平面モデル（厚み0の軸）にも面が出るよう、最大辺に対する最小の厚み
pub const MIN_THICKNESS_RATIO: f32 = 0.02;

// カメラ配置: 距離 = 最大辺 × 係数、方向は斜め上から
pub const CAMERA_DISTANCE_FACTOR: f32 = 2.5;
pub const CAMERA_DIRECTION: [f32; 3] = [0.8, 0.6, 0.8];
pub const CAMERA_FOV_DEG: f32 = 50.0;
pub const CAMERA_NEAR: f32 = 0.1;

// ライティング
pub const KEY_LIGHT_POSITION: [f32; 3] = [3.0, 3.0, 3.0];
pub const AMBIENT_INTENSITY: f32 = 0.35;

// 色（RGB）
pub const BACKGROUND_COLOR: [u8; 3] = [0x2a, 0x2a, 0x3e];
pub const MODEL_COLOR: [u8; 3] = [0x4a, 0x90, 0xe2];
pub const ERROR_COLOR: [u8; 3] = [0xff, 0x6b, 0x6b];

// GLBヘッダー
pub const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
pub const GLB_VERSION: u32 = 2;
pub const GLB_HEADER_LEN: usize = 12;
pub const GLB_CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"

// サポートする拡張子
pub const SUPPORTED_EXTENSIONS: &[&str] = &["glb"];
