use std::path::PathBuf;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use glb_gallery::cache::{DiskCache, ExportReport};
use glb_gallery::files::{format_date, format_file_size};
use glb_gallery::glb::inspect_glb;
use glb_gallery::render::{Aabb, Camera};
use glb_gallery::{AppState, GalleryConfig, GalleryItem, SortKey};

#[derive(Parser, Debug)]
#[command(name = "glb-gallery", version, about = "GLBモデルのサムネイル生成・ギャラリー管理")]
struct Cli {
    /// 設定ファイル（省略時は <config_dir>/glb-gallery/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// デバッグログを出力
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// モデル一覧を表示
    List {
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = SortKey::Name)]
        sort: SortKey,
        #[arg(long)]
        json: bool,
    },
    /// GLBファイルのヘッダーと境界を表示
    Inspect { file: PathBuf },
    /// サムネイルPNGを書き出す（書き出し済みはスキップ）
    Thumbnails {
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// ギャラリーを読み込んで統計を表示
    Stats {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn init_tracing(debug: bool) -> Result<()> {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

fn load_config(path: Option<&PathBuf>, dir: Option<PathBuf>) -> Result<GalleryConfig> {
    let mut config = match path {
        Some(path) => GalleryConfig::load_from(path)
            .with_context(|| format!("設定ファイル読み込みエラー: {}", path.display()))?,
        None => GalleryConfig::load().context("設定ファイル読み込みエラー")?,
    };
    if let Some(dir) = dir {
        config.models_dir = dir;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    match cli.command {
        Command::List { dir, search, sort, json } => {
            let config = load_config(cli.config.as_ref(), dir)?;
            let mut state = AppState::from_config(config)?;
            if let Some(query) = search {
                state.files.search(&query);
            }
            let files = state.files.sort(sort);

            if json {
                println!("{}", serde_json::to_string_pretty(files)?);
            } else {
                for file in files {
                    println!(
                        "{:<40} {:>10}  {}",
                        file.display_name,
                        format_file_size(file.size),
                        format_date(file.modified_time)
                    );
                }
            }
        }
        Command::Inspect { file } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("ファイル読み込みエラー: {}", file.display()))?;
            let info = inspect_glb(&file, &data)?;
            let bounds = info.bounds.unwrap_or_else(Aabb::unit).fit_to_view();
            let camera = Camera::frame(&bounds);

            let report = serde_json::json!({
                "file": file,
                "glb": info,
                "view_bounds": bounds,
                "camera": camera,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Thumbnails { dir, out } => {
            let config = load_config(cli.config.as_ref(), dir)?;
            let disk = DiskCache::new(out.unwrap_or_else(|| config.disk_cache_dir()))?;
            let size = config.thumbnail_size;
            let state = AppState::from_config(config)?;

            // 書き出し済みは生成しない
            let mut export = ExportReport::default();
            let mut missing = Vec::new();
            for file in state.files.files() {
                match disk.lookup(file, size) {
                    Some(hit) => export.stored.push(hit),
                    None => missing.push(file.clone()),
                }
            }

            let mut grid: Vec<GalleryItem> = Vec::new();
            let report = state.gallery.load(&missing, &mut grid).await;
            disk.store_items(&grid, &mut export)?;

            println!("{}", serde_json::to_string_pretty(&export)?);
            info!(
                out = %disk.cache_dir.display(),
                generated = report.ready,
                failed = report.failed,
                "サムネイル書き出し完了"
            );
        }
        Command::Stats { dir } => {
            let config = load_config(cli.config.as_ref(), dir)?;
            let state = AppState::from_config(config)?;
            let mut grid: Vec<GalleryItem> = Vec::new();
            let report = state.gallery.load(state.files.files(), &mut grid).await;

            let summary = serde_json::json!({
                "stats": state.stats(),
                "load": report,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
