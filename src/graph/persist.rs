//! Persisting graphs: a versioned binary encoding plus a JSON rendering.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::errors::{GraphError, Result};

use super::builder::GraphBuilder;
use super::core::Graph;

/// Magic bytes at the start of every persisted graph.
pub const MAGIC: &[u8; 4] = b"PGRF";

/// Version of the binary layout that follows the magic bytes.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = MAGIC.len() + std::mem::size_of::<u16>();

/// Values that can be written to and read back from bytes or files.
pub trait Persistable: Sized {
    /// Encodes the value.
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Decodes and validates a value produced by [`Persistable::to_bytes`].
    fn from_bytes(bytes: &[u8]) -> Result<Self>;

    /// Writes the encoded value to `path`, replacing any existing file.
    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        log::debug!("wrote {} bytes to {}", bytes.len(), path.as_ref().display());
        Ok(())
    }

    /// Reads and decodes a value from `path`.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }
}

impl Persistable for Graph {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(GraphError::validation("data is not a persisted graph"));
        }
        let version = u16::from_le_bytes([bytes[MAGIC.len()], bytes[MAGIC.len() + 1]]);
        if version != FORMAT_VERSION {
            return Err(GraphError::validation(format!(
                "unsupported graph format version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }
        let decoded: Graph = bincode::deserialize(&bytes[HEADER_LEN..])?;
        revalidate(decoded)
    }
}

/// Runs a decoded graph back through the builder.
///
/// Decoded data bypasses construction, so the stored slot information must
/// agree with what the builder infers from the nodes. Payload values are not
/// compared; they may hold NaN.
fn revalidate(decoded: Graph) -> Result<Graph> {
    let mut builder = GraphBuilder::new(decoded.name())
        .opset(decoded.opset_version())
        .nodes(decoded.nodes().to_vec());
    for slot in decoded.inputs() {
        builder = builder.input(slot.clone());
    }
    for slot in decoded.outputs() {
        builder = builder.output(slot.clone());
    }
    let rebuilt = builder.build()?;
    if rebuilt.value_info() != decoded.value_info() {
        return Err(GraphError::validation(
            "stored slot information disagrees with the nodes",
        ));
    }
    Ok(rebuilt)
}

impl Graph {
    /// Renders the graph as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and validates a graph from its JSON rendering.
    pub fn from_json(json: &str) -> Result<Self> {
        let decoded: Graph = serde_json::from_str(json)?;
        revalidate(decoded)
    }
}
