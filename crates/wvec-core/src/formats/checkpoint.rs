/// Binary checkpoint format (WVCK v1)
///
/// Layout, little-endian, no padding:
///
/// ```text
/// magic         4 bytes  "WVCK"
/// version       i32      = 1
/// vocab_size    i32
/// dim           i32
/// epoch         i32
/// learning_rate f32
/// W_in          f32[dim * vocab_size]  column-major
/// W_out         f32[dim * vocab_size]  column-major
/// ```
///
/// Saving is not atomic: a failed write leaves a partial file behind. Callers
/// that need atomic replacement write to a temporary path and rename.
use crate::error::{Error, Result};
use crate::matrix::EmbeddingMatrix;
use crate::model::{Model, ModelState};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

pub const CHECKPOINT_MAGIC: [u8; 4] = *b"WVCK";
pub const CHECKPOINT_VERSION: i32 = 1;

/// Size of the fixed header in bytes
pub const HEADER_LEN: usize = 24;

/// Floats moved per I/O call when streaming matrices
const IO_CHUNK: usize = 16 * 1024;

/// Checkpoint header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointHeader {
    pub version: i32,
    pub vocab_size: i32,
    pub dim: i32,
    pub epoch: i32,
    pub learning_rate: f32,
}

impl CheckpointHeader {
    /// Read and validate a header.
    ///
    /// Magic is checked before version, and both before the sizes are
    /// trusted. Nothing outside `reader` is touched.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != CHECKPOINT_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let version = read_i32(reader)?;
        if version != CHECKPOINT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let vocab_size = read_i32(reader)?;
        let dim = read_i32(reader)?;
        let epoch = read_i32(reader)?;
        let learning_rate = read_f32(reader)?;

        if vocab_size <= 0 || dim <= 0 {
            return Err(Error::InvalidSize(format!(
                "checkpoint declares vocab_size={}, dim={}",
                vocab_size, dim
            )));
        }

        Ok(Self { version, vocab_size, dim, epoch, learning_rate })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&CHECKPOINT_MAGIC)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.vocab_size.to_le_bytes())?;
        writer.write_all(&self.dim.to_le_bytes())?;
        writer.write_all(&self.epoch.to_le_bytes())?;
        writer.write_all(&self.learning_rate.to_le_bytes())?;
        Ok(())
    }

    /// Bytes of one matrix payload
    pub fn matrix_bytes(&self) -> u64 {
        self.vocab_size as u64 * self.dim as u64 * 4
    }

    /// Size of a complete file with this header. Saturates on absurd sizes.
    pub fn file_len(&self) -> u64 {
        self.matrix_bytes().saturating_mul(2).saturating_add(HEADER_LEN as u64)
    }
}

/// Serialize `model` with its training position.
pub fn write_checkpoint<W: Write>(
    writer: &mut W,
    model: &Model,
    epoch: i32,
    learning_rate: f32,
) -> Result<()> {
    let header = CheckpointHeader {
        version: CHECKPOINT_VERSION,
        vocab_size: to_i32(model.vocab_size(), "vocab_size")?,
        dim: to_i32(model.dim(), "dim")?,
        epoch,
        learning_rate,
    };
    header.write_to(writer)?;
    write_matrix(writer, model.input())?;
    write_matrix(writer, model.output())?;
    Ok(())
}

/// Deserialize a checkpoint into `state`, returning `(epoch, learning_rate)`.
///
/// The header is validated before `state` is touched. After that the current
/// model is freed; any later failure leaves `state` uninitialized.
pub fn read_checkpoint<R: Read>(reader: &mut R, state: &mut ModelState) -> Result<(i32, f32)> {
    let header = CheckpointHeader::read_from(reader)?;
    state.free();
    read_body(reader, &header, state)
}

fn read_body<R: Read>(
    reader: &mut R,
    header: &CheckpointHeader,
    state: &mut ModelState,
) -> Result<(i32, f32)> {
    let model = Model::zeroed(header.vocab_size as usize, header.dim as usize)?;
    read_matrix(reader, model.input())?;
    read_matrix(reader, model.output())?;
    state.install(model);

    Ok((header.epoch, header.learning_rate))
}

/// Write the live model to `path`.
pub fn save<P: AsRef<Path>>(
    path: P,
    state: &ModelState,
    epoch: i32,
    learning_rate: f32,
) -> Result<()> {
    let path = path.as_ref();
    let model = state.model()?;

    let mut writer = BufWriter::new(File::create(path)?);
    write_checkpoint(&mut writer, model, epoch, learning_rate)?;
    writer.flush()?;

    log::info!(
        "Saved checkpoint {}: vocab_size={}, dim={}, epoch={}, lr={}",
        path.display(),
        model.vocab_size(),
        model.dim(),
        epoch,
        learning_rate
    );
    Ok(())
}

/// Replace the live model with the one stored at `path`.
///
/// A file whose length disagrees with its header fails with `FileIo`
/// before any matrix is allocated.
pub fn load<P: AsRef<Path>>(path: P, state: &mut ModelState) -> Result<(i32, f32)> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let actual = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let header = CheckpointHeader::read_from(&mut reader)?;
    state.free();

    let expected = header.file_len();
    if actual != expected {
        let kind = if actual < expected {
            io::ErrorKind::UnexpectedEof
        } else {
            io::ErrorKind::InvalidData
        };
        return Err(Error::FileIo(io::Error::new(
            kind,
            format!("{}: {} bytes, header implies {}", path.display(), actual, expected),
        )));
    }
    let (epoch, learning_rate) = read_body(&mut reader, &header, state)?;

    let (vocab_size, dim) = state.dims();
    log::info!(
        "Loaded checkpoint {}: vocab_size={}, dim={}, epoch={}, lr={}",
        path.display(),
        vocab_size,
        dim,
        epoch,
        learning_rate
    );
    Ok((epoch, learning_rate))
}

/// Read only the header of the checkpoint at `path`.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<CheckpointHeader> {
    let mut reader = BufReader::new(File::open(path)?);
    CheckpointHeader::read_from(&mut reader)
}

// Helper functions

fn to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| Error::InvalidSize(format!("{} {} does not fit in i32", what, value)))
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_f32<R: Read>(reader: &mut R) -> Result<f32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn write_matrix<W: Write>(writer: &mut W, matrix: &EmbeddingMatrix) -> Result<()> {
    let mut bytes = Vec::with_capacity(IO_CHUNK.min(matrix.len()) * 4);
    let mut values = matrix.values().peekable();

    while values.peek().is_some() {
        bytes.clear();
        for value in values.by_ref().take(IO_CHUNK) {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        writer.write_all(&bytes)?;
    }
    Ok(())
}

fn read_matrix<R: Read>(reader: &mut R, matrix: &EmbeddingMatrix) -> Result<()> {
    let total = matrix.len();
    let mut bytes = vec![0u8; IO_CHUNK.min(total) * 4];
    let mut floats = Vec::with_capacity(IO_CHUNK.min(total));
    let mut offset = 0;

    while offset < total {
        let n = IO_CHUNK.min(total - offset);
        let chunk = &mut bytes[..n * 4];
        reader.read_exact(chunk)?;

        floats.clear();
        floats.extend(
            chunk.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
        matrix.store_flat(offset, &floats);
        offset += n;
    }
    Ok(())
}
