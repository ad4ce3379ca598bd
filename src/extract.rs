use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use scdump_sc::{
    chunk::{Chunk, PixelLayout, TextureInfo},
    csv, ScFile, SC_MAGIC,
};
use scdump_texture::{format::Channels, format::PixelFormat, sctx, Texture};
use tracing::{debug, error, info};

use crate::filetype::FileType;

/// Writes the contents of `.sc` and `.csv` files into a directory.
pub struct Extractor {
    output_dir: PathBuf,
    /// Inputs carry the `*_dl.sc` preamble
    legacy: bool,
}

impl Extractor {
    pub fn new(output_dir: PathBuf, legacy: bool) -> Self {
        Self { output_dir, legacy }
    }

    /// Extracts a single file, returning the number of files written.
    pub fn extract_file(&self, path: &Path) -> anyhow::Result<usize> {
        let file_name = path
            .file_name()
            .with_context(|| format!("'{}' is not a file", path.display()))?;
        info!("{}", file_name.to_string_lossy());

        let data = std::fs::read(path).context("Failed to read file")?;
        match FileType::detect(&data)? {
            FileType::Csv => self.write_csv(path, &data),
            FileType::Sc => self.extract_sc(path, &data),
            FileType::Signed => {
                let inner = csv::strip_signature(&data);
                if inner.starts_with(SC_MAGIC) {
                    self.extract_sc(path, inner)
                } else {
                    self.write_csv(path, inner)
                }
            }
        }
    }

    fn write_csv(&self, path: &Path, data: &[u8]) -> anyhow::Result<usize> {
        let table = csv::decode(data)?;

        let out_path = self.output_dir.join(path.file_name().unwrap_or_default());
        ensure!(
            !is_same_file(path, &out_path)?,
            "Refusing to overwrite the input file, pick another output directory"
        );

        std::fs::write(&out_path, table)
            .with_context(|| format!("Failed to write '{}'", out_path.display()))?;
        Ok(1)
    }

    fn extract_sc(&self, path: &Path, data: &[u8]) -> anyhow::Result<usize> {
        let base_dir = path.parent().unwrap_or(Path::new(""));
        let base_name = path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let sc = ScFile::parse(data)?;
        let mut count = 0;
        for chunk in sc.chunks(self.legacy)? {
            let texture = match chunk? {
                Chunk::Texture {
                    tag,
                    length,
                    info,
                    layout,
                    pixels,
                } => {
                    log_texture(tag, length, &info);
                    decode_texture(&info, layout, pixels)
                }
                Chunk::EmbeddedSctx { length, info, data } => {
                    log_texture(45, length, &info);
                    sctx::decode_sctx(data)
                }
                Chunk::ExternalSctx {
                    length,
                    file_name,
                    info,
                } => {
                    log_texture(47, length, &info);
                    info!("{file_name}");
                    let sctx_path = base_dir.join(&file_name);
                    std::fs::read(&sctx_path)
                        .with_context(|| format!("Failed to read '{}'", sctx_path.display()))
                        .and_then(|bytes| sctx::decode_sctx(&bytes))
                }
                Chunk::Matrix(matrix) => {
                    debug!("matrix: {matrix:?}");
                    continue;
                }
                Chunk::Skipped { tag, length } => {
                    debug!("Skipping file_type: {tag}, file_size: {length}");
                    continue;
                }
                Chunk::Unknown { tag, .. } => {
                    error!("Unknown file_type: {tag}");
                    continue;
                }
            }
            .with_context(|| format!("Failed to decode texture {count}"))?;

            let out_path = self.output_dir.join(format!("{base_name}_{count}.png"));
            save_png(texture, &out_path)?;
            count += 1;
        }

        Ok(count)
    }
}

fn log_texture(tag: u8, length: u32, info: &TextureInfo) {
    info!(
        "file_type: {tag}, file_size: {length}, sub_type: {}, width: {}, height: {}",
        info.sub_type, info.width, info.height
    );
}

fn decode_texture(
    info: &TextureInfo,
    layout: PixelLayout,
    pixels: &[u8],
) -> anyhow::Result<Texture> {
    let format = PixelFormat::from_sub_type(info.sub_type)?;
    let decode = match layout {
        PixelLayout::Linear => scdump_texture::decode_linear,
        PixelLayout::Tiled => scdump_texture::decode_tiled,
    };
    decode(format, info.width, info.height, pixels)
}

fn save_png(texture: Texture, path: &Path) -> anyhow::Result<()> {
    let Texture {
        width,
        height,
        channels,
        pixels,
    } = texture;

    let image = match channels {
        Channels::L => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        Channels::La => {
            GrayAlphaImage::from_raw(width, height, pixels).map(DynamicImage::ImageLumaA8)
        }
        Channels::Rgb => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        Channels::Rgba => RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8),
    }
    .context("Pixel buffer does not match the texture size")?;

    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write '{}'", path.display()))
}

fn is_same_file(a: &Path, b: &Path) -> anyhow::Result<bool> {
    if !b.exists() {
        return Ok(false);
    }

    Ok(std::fs::canonicalize(a)? == std::fs::canonicalize(b)?)
}
