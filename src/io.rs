//! Safetensors I/O.
//!
//! Reader: [`StFile`] parses a safetensors container and hands out tensors
//! as `ndarray` arrays; [`RawRecording`] uses it to pull the four raw
//! arrays out of a recording file.
//!
//! Writer: [`StWriter`] builds a safetensors file from named tensors; the
//! cache and the CLI batch output both go through it.
use anyhow::{bail, ensure, Context, Result};
use ndarray::{Array1, Array2, ArrayD, ArrayViewD, IxDyn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Extension appended to recording and cache names.
pub const EXTENSION: &str = "safetensors";

// ── Low-level safetensors parser ──────────────────────────────────────────────

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = u64::from_le_bytes(len) as usize;
    ensure!(8 + n <= bytes.len(), "header length {n} exceeds file size {}", bytes.len());
    let header: HashMap<String, serde_json::Value> =
        serde_json::from_slice(&bytes[8..8 + n])
            .context("failed to parse safetensors header")?;
    Ok((header, 8 + n))
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("tensor entry has no shape")?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("non-integer dimension"))
        .collect()
}

fn offsets_of(entry: &serde_json::Value) -> Result<(usize, usize)> {
    let offsets = entry["data_offsets"].as_array().context("tensor entry has no data_offsets")?;
    ensure!(offsets.len() == 2, "data_offsets must hold two values");
    let s = offsets[0].as_u64().context("bad start offset")? as usize;
    let e = offsets[1].as_u64().context("bad end offset")? as usize;
    ensure!(s <= e, "data_offsets out of order");
    Ok((s, e))
}

/// Decode little-endian bytes of `dtype` into `f64`.
fn decode(dtype: &str, raw: &[u8]) -> Result<Vec<f64>> {
    let width = match dtype {
        "F64" | "I64" => 8,
        "F32" | "I32" => 4,
        "U8" => 1,
        other => bail!("unsupported dtype {other}"),
    };
    ensure!(raw.len() % width == 0, "{} bytes is not a whole number of {dtype} values", raw.len());
    let vals = raw.chunks_exact(width).map(|b| {
        let mut w = [0u8; 8];
        w[..width].copy_from_slice(b);
        match dtype {
            "F64" => f64::from_le_bytes(w),
            "I64" => i64::from_le_bytes(w) as f64,
            "F32" => f32::from_le_bytes([w[0], w[1], w[2], w[3]]) as f64,
            "I32" => i32::from_le_bytes([w[0], w[1], w[2], w[3]]) as f64,
            _ => w[0] as f64,
        }
    });
    Ok(vals.collect())
}

// ── Reader ────────────────────────────────────────────────────────────────────

/// An in-memory safetensors file.
pub struct StFile {
    bytes: Vec<u8>,
    header: HashMap<String, serde_json::Value>,
    data_start: usize,
}

impl StFile {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_bytes(bytes).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let (header, data_start) = parse_header(&bytes)?;
        Ok(Self { bytes, header, data_start })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.header.contains_key(name)
    }

    /// Tensor `name` widened to `f64`, in its stored shape.
    pub fn tensor_f64(&self, name: &str) -> Result<ArrayD<f64>> {
        let entry = self.header.get(name).with_context(|| format!("missing '{name}' key"))?;
        let dtype = entry["dtype"].as_str().context("tensor entry has no dtype")?;
        let shape = shape_of(entry)?;
        let (s, e) = offsets_of(entry)?;
        let (s, e) = (self.data_start + s, self.data_start + e);
        ensure!(e <= self.bytes.len(), "tensor '{name}' runs past end of file");
        let vals = decode(dtype, &self.bytes[s..e])?;
        ArrayD::from_shape_vec(IxDyn(&shape), vals)
            .with_context(|| format!("tensor '{name}' does not match shape {shape:?}"))
    }

    pub fn tensor_f32(&self, name: &str) -> Result<ArrayD<f32>> {
        Ok(self.tensor_f64(name)?.mapv(|v| v as f32))
    }

    /// Tensor `name` as a 2-D array; rank-1 tensors become a single row.
    pub fn matrix_f32(&self, name: &str) -> Result<Array2<f32>> {
        let t = self.tensor_f32(name)?;
        match t.ndim() {
            1 => {
                let n = t.len();
                Ok(t.into_shape_with_order((1, n))?)
            }
            2 => Ok(t.into_dimensionality()?),
            d => bail!("tensor '{name}' has rank {d}, expected 2"),
        }
    }
}

// ── Raw recording ─────────────────────────────────────────────────────────────

/// The four raw arrays of one reaching session.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecording {
    /// Spike counts, [C, T] or spike-sorted [C, U, T].
    pub spikes: ArrayD<f32>,
    /// Timestamps in seconds, [T].
    pub t: Array1<f64>,
    /// Cursor position, [2, T].
    pub cursor_pos: Array2<f32>,
    /// Target position, [2, T].
    pub target_pos: Array2<f32>,
}

impl RawRecording {
    /// Resolve `dir/filename`, appending `.safetensors` when the name has no
    /// such suffix.
    pub fn resolve_path(dir: &Path, filename: &str) -> PathBuf {
        let suffix = format!(".{EXTENSION}");
        if filename.ends_with(&suffix) {
            dir.join(filename)
        } else {
            dir.join(format!("{filename}{suffix}"))
        }
    }

    pub fn open(dir: &Path, filename: &str) -> Result<Self> {
        Self::load(&Self::resolve_path(dir, filename))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let st = StFile::open(path)?;
        let spikes = st.tensor_f32("spikes")?;
        let t = st.tensor_f64("t")?;
        // Stored as [T], [1, T] or [T, 1].
        let n_t = t.len();
        let t: Array1<f64> = t.into_shape_with_order(n_t)?;
        let cursor_pos = st.matrix_f32("cursor_pos")?;
        let target_pos = st.matrix_f32("target_pos")?;
        Ok(Self { spikes, t, cursor_pos, target_pos })
    }

    /// Number of time points, from `t`.
    pub fn n_times(&self) -> usize {
        self.t.len()
    }

    /// Write the recording in the layout [`RawRecording::load`] reads.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = StWriter::new();
        w.add_array("spikes", &self.spikes.view());
        w.add("t", &self.t.to_vec(), &[self.t.len()]);
        w.add_array("cursor_pos", &self.cursor_pos.view().into_dyn());
        w.add_array("target_pos", &self.target_pos.view().into_dyn());
        w.write(path)
    }
}

// ── Writer ────────────────────────────────────────────────────────────────────

/// Element types [`StWriter`] can store.
pub trait StElement: Copy {
    const DTYPE: &'static str;
    fn extend_le(self, out: &mut Vec<u8>);
}

macro_rules! st_element {
    ($($t:ty => $tag:literal),*) => {$(
        impl StElement for $t {
            const DTYPE: &'static str = $tag;
            fn extend_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    )*};
}
st_element!(f32 => "F32", f64 => "F64", i32 => "I32");

struct Entry {
    name: String,
    dtype: &'static str,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

/// Collects named tensors and writes them as one safetensors file.
///
/// ```rust,no_run
/// use reachprep::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add("samples_0", &[1.0f32, 2.0, 3.0], &[1, 3]);
/// w.add("train_0", &[0i32, 2, 3], &[3]);
/// w.write(Path::new("/tmp/batch.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<Entry>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `data` (row-major) under `name` with the given `shape`.
    pub fn add<T: StElement>(&mut self, name: &str, data: &[T], shape: &[usize]) {
        let mut bytes = Vec::with_capacity(data.len() * std::mem::size_of::<T>());
        for &v in data {
            v.extend_le(&mut bytes);
        }
        self.entries.push(Entry {
            name: name.to_string(),
            dtype: T::DTYPE,
            shape: shape.to_vec(),
            bytes,
        });
    }

    /// Any-rank `f32` array, in logical order regardless of memory layout.
    pub fn add_array(&mut self, name: &str, arr: &ArrayViewD<f32>) {
        let data: Vec<f32> = arr.iter().copied().collect();
        self.add(name, &data, arr.shape());
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut header = serde_json::Map::new();
        let mut offset = 0;
        for e in &self.entries {
            let end = offset + e.bytes.len();
            header.insert(
                e.name.clone(),
                serde_json::json!({ "dtype": e.dtype, "shape": e.shape, "data_offsets": [offset, end] }),
            );
            offset = end;
        }
        let mut head = serde_json::to_vec(&header)?;
        // Pad with spaces so the data section starts 8-byte aligned.
        head.resize(head.len().next_multiple_of(8), b' ');

        let mut out = Vec::with_capacity(8 + head.len() + offset);
        out.extend_from_slice(&(head.len() as u64).to_le_bytes());
        out.extend_from_slice(&head);
        for e in &self.entries {
            out.extend_from_slice(&e.bytes);
        }
        std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))
    }
}
