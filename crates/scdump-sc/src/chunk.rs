use anyhow::{ensure, Context};

/// Tag byte + u32 body length.
pub const CHUNK_HEADER_SIZE: usize = 5;

/// How texture pixels are laid out inside a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// Plain row-major pixels.
    Linear,
    /// Row-major 32x32 blocks.
    Tiled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub sub_type: u8,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug)]
pub enum Chunk<'a> {
    Texture {
        tag: u8,
        length: u32,
        info: TextureInfo,
        layout: PixelLayout,
        pixels: &'a [u8],
    },
    /// SCTX blob stored inline.
    EmbeddedSctx {
        length: u32,
        info: TextureInfo,
        data: &'a [u8],
    },
    /// SCTX blob stored in a sibling file.
    ExternalSctx {
        length: u32,
        file_name: String,
        info: TextureInfo,
    },
    Matrix([i32; 6]),
    Skipped {
        tag: u8,
        length: u32,
    },
    Unknown {
        tag: u8,
        length: u32,
    },
}

/// Walks the tag/length/body stream of a decompressed container.
pub struct ChunkReader<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            failed: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn next_chunk(&mut self) -> anyhow::Result<Option<Chunk<'a>>> {
        loop {
            if self.remaining() < CHUNK_HEADER_SIZE {
                return Ok(None);
            }

            let start = self.offset;
            let tag = self.data[start];
            let length = u32::from_le_bytes([
                self.data[start + 1],
                self.data[start + 2],
                self.data[start + 3],
                self.data[start + 4],
            ]);

            let body_start = start + CHUNK_HEADER_SIZE;
            let body_end = body_start
                .checked_add(length as usize)
                .filter(|&end| end <= self.data.len())
                .with_context(|| {
                    format!(
                        "Chunk with tag {tag} at offset 0x{start:X} claims {length} bytes, \
                         only {} left",
                        self.data.len() - body_start
                    )
                })?;
            self.offset = body_end;

            if length == 0 {
                continue;
            }

            let body = &self.data[body_start..body_end];
            return parse_body(tag, length, body)
                .with_context(|| {
                    format!("Failed to parse chunk with tag {tag} at offset 0x{start:X}")
                })
                .map(Some);
        }
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = anyhow::Result<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.next_chunk() {
            Ok(chunk) => chunk.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn parse_body(tag: u8, length: u32, body: &[u8]) -> anyhow::Result<Chunk<'_>> {
    let mut r = BodyReader { body, offset: 0 };

    Ok(match tag {
        8 => {
            let mut matrix = [0i32; 6];
            for v in matrix.iter_mut() {
                *v = r.read_u32()? as i32;
            }
            Chunk::Matrix(matrix)
        }
        12 | 49 => Chunk::Skipped { tag, length },
        1 | 24 | 27 | 28 => {
            let info = r.read_texture_info()?;
            let layout = if matches!(tag, 27 | 28) {
                PixelLayout::Tiled
            } else {
                PixelLayout::Linear
            };

            Chunk::Texture {
                tag,
                length,
                info,
                layout,
                pixels: r.rest(),
            }
        }
        45 => {
            let length = r.read_u32()?;
            let info = r.read_texture_info()?;
            Chunk::EmbeddedSctx {
                length,
                info,
                data: r.rest(),
            }
        }
        47 => {
            let file_name = r.read_string()?;
            let info = r.read_texture_info()?;
            Chunk::ExternalSctx {
                length,
                file_name,
                info,
            }
        }
        _ => Chunk::Unknown { tag, length },
    })
}

struct BodyReader<'a> {
    body: &'a [u8],
    offset: usize,
}

impl<'a> BodyReader<'a> {
    fn take(&mut self, len: usize) -> anyhow::Result<&'a [u8]> {
        ensure!(
            self.body.len() - self.offset >= len,
            "Chunk body ends at {} bytes, {} more needed at offset {}",
            self.body.len(),
            len,
            self.offset
        );
        let bytes = &self.body[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> anyhow::Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> anyhow::Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> anyhow::Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_string(&mut self) -> anyhow::Result<String> {
        let len = self.read_u8()? as usize;
        let bytes = self.take(len)?;
        Ok(std::str::from_utf8(bytes)
            .context("String is not valid UTF-8")?
            .to_string())
    }

    fn read_texture_info(&mut self) -> anyhow::Result<TextureInfo> {
        Ok(TextureInfo {
            sub_type: self.read_u8()?,
            width: self.read_u16()?,
            height: self.read_u16()?,
        })
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.body[self.offset..];
        self.offset = self.body.len();
        rest
    }
}
