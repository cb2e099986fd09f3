use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

// モデルファイル情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFile {
    pub name: String,
    pub display_name: String,
    /// キャッシュキーを兼ねる（一意）
    pub path: String,
    pub size: u64,
    pub file_type: String,
    /// UNIXエポックからのミリ秒
    pub modified_time: u64,
}

// ギャラリーの並び替え基準
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Date,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "size" => Ok(Self::Size),
            "date" => Ok(Self::Date),
            other => Err(format!("不明な並び替え基準: {} (name | size | date)", other)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Size => "size",
            Self::Date => "date",
        };
        f.write_str(s)
    }
}
