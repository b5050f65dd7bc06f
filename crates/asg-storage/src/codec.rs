//! The versioned binary codec for whole-factory save/load.
//!
//! Stream layout:
//!
//! ```text
//! [ formatVersion: u32 ]
//! [ stringCount: u32 ] ( key: u32, byteLen: u32, utf8 bytes )*
//! [ nodeCount: u32 ]
//! [ nodeRecord ]*        # ascending id, renumbered densely from 1
//! ```
//!
//! Each node record is written base-first: kind tag, filtered flag,
//! optional position, then the kind-specific scalars and finally the edge
//! slots in declared order — single edges as one u32 (0 = absent), multi
//! edges length-prefixed. All integers are little-endian.
//!
//! Neither node ids nor string keys are identity: save renumbers ids
//! densely (ascending order preserved, so relative positions survive) and
//! load re-interns every string into the new factory's table. The
//! persisted string set is the explicitly tagged entries plus every key a
//! stored node references.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tracing::{debug, info};

use asg_core::edge::{edges_of, Cardinality};
use asg_core::node::{BinaryOperator, LiteralKind, Node, NodeData};
use asg_core::{
    AsgError, EdgeKind, Factory, FactoryOptions, NodeId, NodeKind, SourcePosition, StringKey,
};

use crate::error::StorageError;

/// Version written at the head of every stream. Bumped on any layout
/// change; there is no cross-version compatibility.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

/// Serializes the whole factory, filtered nodes included.
pub fn save(factory: &Factory) -> Result<Vec<u8>, StorageError> {
    let nodes: Vec<&Node> = factory.stored_nodes().collect();
    let id_map: HashMap<NodeId, u32> = nodes
        .iter()
        .enumerate()
        .map(|(ordinal, node)| (node.id, ordinal as u32 + 1))
        .collect();

    // Records are buffered first so the string section can list every key
    // they reference before them in the stream.
    let mut referenced: BTreeSet<u32> = BTreeSet::new();
    let mut records = Vec::new();
    for node in &nodes {
        write_node(&mut records, node, &id_map, &mut referenced)?;
    }
    for (key, _) in factory.strings().persistent_entries() {
        referenced.insert(key.0);
    }

    let mut out = Vec::new();
    write_u32(&mut out, FORMAT_VERSION);
    write_u32(&mut out, referenced.len() as u32);
    for &key in &referenced {
        let value = factory.strings().lookup(StringKey(key))?;
        write_u32(&mut out, key);
        write_u32(&mut out, value.len() as u32);
        out.extend_from_slice(value.as_bytes());
    }
    write_u32(&mut out, nodes.len() as u32);
    out.extend_from_slice(&records);

    debug!(
        nodes = nodes.len(),
        strings = referenced.len(),
        bytes = out.len(),
        "factory serialized"
    );
    Ok(out)
}

/// Serializes the factory to a file.
pub fn save_to_file(factory: &Factory, path: &Path) -> Result<(), StorageError> {
    let bytes = save(factory)?;
    std::fs::write(path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "factory saved");
    Ok(())
}

fn write_node(
    out: &mut Vec<u8>,
    node: &Node,
    id_map: &HashMap<NodeId, u32>,
    referenced: &mut BTreeSet<u32>,
) -> Result<(), StorageError> {
    write_u32(out, node.kind().tag());

    // Base fields.
    out.push(node.is_filtered() as u8);
    match node.position() {
        Some(pos) => {
            out.push(1);
            write_key(out, pos.path, referenced);
            write_u32(out, pos.line);
            write_u32(out, pos.column);
            write_u32(out, pos.end_line);
            write_u32(out, pos.end_column);
        }
        None => out.push(0),
    }

    // Kind-specific scalars.
    match &node.data {
        NodeData::CompilationUnit(d) => write_key(out, d.path, referenced),
        NodeData::Function(d) => write_key(out, d.name, referenced),
        NodeData::Parameter(d) => write_key(out, d.name, referenced),
        NodeData::Identifier(d) => write_key(out, d.name, referenced),
        NodeData::BinaryExpression(d) => write_u32(out, d.operator.tag()),
        NodeData::Literal(d) => {
            write_u32(out, d.literal_kind.tag());
            write_key(out, d.text, referenced);
        }
        NodeData::Block(_)
        | NodeData::While(_)
        | NodeData::If(_)
        | NodeData::ExpressionStatement(_)
        | NodeData::Return(_)
        | NodeData::Call(_) => {}
    }

    // Edge slots, declared order. The raw slots are used on purpose:
    // filtered targets are live nodes and must persist.
    for decl in edges_of(node.kind()) {
        match decl.cardinality {
            Cardinality::Single => {
                let target = node.data.single_slot(decl.kind).flatten();
                write_u32(out, remap(target, id_map)?);
            }
            Cardinality::Multi => {
                let targets = node.data.multi_slot(decl.kind).expect("declared slot");
                write_u32(out, targets.len() as u32);
                for &target in targets {
                    write_u32(out, remap(Some(target), id_map)?);
                }
            }
        }
    }
    Ok(())
}

fn remap(target: Option<NodeId>, id_map: &HashMap<NodeId, u32>) -> Result<u32, StorageError> {
    match target {
        Some(id) => id_map
            .get(&id)
            .copied()
            .ok_or(StorageError::Core(AsgError::DanglingReference { id })),
        None => Ok(0),
    }
}

fn write_key(out: &mut Vec<u8>, key: Option<StringKey>, referenced: &mut BTreeSet<u32>) {
    match key {
        Some(key) => {
            referenced.insert(key.0);
            write_u32(out, key.0);
        }
        None => write_u32(out, 0),
    }
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Rebuilds a factory from a stream produced by [`save`]. The loaded
/// factory comes back with the reverse-edge index enabled; edges are wired
/// through the factory's own choke-point, so parent links and the index
/// rebuild themselves.
pub fn load(bytes: &[u8]) -> Result<Factory, StorageError> {
    let mut reader = Reader::new(bytes);

    let version = reader.u32()?;
    if version != FORMAT_VERSION {
        return Err(StorageError::FormatVersionMismatch {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let mut factory = Factory::with_options(FactoryOptions {
        reverse_edges: true,
        filtered_as_missing: false,
    });

    // String table first. Values are re-interned (keys are not identity)
    // and every loaded entry is re-tagged for the next save.
    let string_count = reader.u32()?;
    let mut values: HashMap<u32, String> = HashMap::with_capacity(string_count as usize);
    for _ in 0..string_count {
        let key = reader.u32()?;
        let len = reader.u32()? as usize;
        let raw = reader.bytes(len)?;
        let value = std::str::from_utf8(raw).map_err(|_| StorageError::InvalidUtf8 { key })?;
        let new_key = factory.strings_mut().intern(value);
        factory.strings_mut().mark_for_persistence(new_key)?;
        values.insert(key, value.to_string());
    }

    // Pass 1: materialize every node with its base fields and scalars.
    // Edge targets may point forward, so wiring waits for pass 2.
    let node_count = reader.u32()?;
    let mut pending: Vec<(NodeId, EdgeKind, Vec<u32>)> = Vec::new();
    for ordinal in 0..node_count {
        let tag = reader.u32()?;
        let kind = NodeKind::from_tag(tag).ok_or(StorageError::UnsupportedNodeKind { tag })?;
        let id = factory.create_with_id(NodeId(ordinal + 1), kind)?;

        if reader.u8()? != 0 {
            factory.set_filtered(id, true)?;
        }
        if reader.u8()? != 0 {
            let path_key = reader.u32()?;
            let path = match path_key {
                0 => None,
                key => {
                    let value = resolve(&values, key)?;
                    Some(factory.strings_mut().intern(value))
                }
            };
            let line = reader.u32()?;
            let column = reader.u32()?;
            let end_line = reader.u32()?;
            let end_column = reader.u32()?;
            factory.set_position(id, SourcePosition::new(path, line, column, end_line, end_column))?;
        }

        match kind {
            NodeKind::CompilationUnit => {
                if let Some(value) = read_string(&mut reader, &values)? {
                    factory.set_path(id, &value)?;
                }
            }
            NodeKind::Function | NodeKind::Parameter | NodeKind::Identifier => {
                if let Some(value) = read_string(&mut reader, &values)? {
                    factory.set_name(id, &value)?;
                }
            }
            NodeKind::BinaryExpression => {
                let tag = reader.u32()?;
                let operator = BinaryOperator::from_tag(tag)
                    .ok_or(StorageError::UnsupportedEnumTag { attribute: "operator", tag })?;
                factory.set_operator(id, operator)?;
            }
            NodeKind::Literal => {
                let tag = reader.u32()?;
                let literal_kind = LiteralKind::from_tag(tag).ok_or(
                    StorageError::UnsupportedEnumTag { attribute: "literal_kind", tag },
                )?;
                factory.set_literal_kind(id, literal_kind)?;
                if let Some(value) = read_string(&mut reader, &values)? {
                    factory.set_text(id, &value)?;
                }
            }
            NodeKind::Block
            | NodeKind::While
            | NodeKind::If
            | NodeKind::ExpressionStatement
            | NodeKind::Return
            | NodeKind::Call => {}
        }

        for decl in edges_of(kind) {
            match decl.cardinality {
                Cardinality::Single => {
                    let target = reader.u32()?;
                    if target != 0 {
                        pending.push((id, decl.kind, vec![target]));
                    }
                }
                Cardinality::Multi => {
                    let count = reader.u32()?;
                    let mut targets = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        targets.push(reader.u32()?);
                    }
                    if !targets.is_empty() {
                        pending.push((id, decl.kind, targets));
                    }
                }
            }
        }
    }

    // Pass 2: wire edges. A target id the stream never defined surfaces as
    // DanglingReference from the factory itself.
    for (source, edge, targets) in pending {
        for target in targets {
            factory.add_edge(source, edge, NodeId(target))?;
        }
    }

    debug!(
        nodes = node_count,
        strings = string_count,
        bytes = bytes.len(),
        "factory deserialized"
    );
    Ok(factory)
}

/// Reads a factory back from a file.
pub fn load_from_file(path: &Path) -> Result<Factory, StorageError> {
    let bytes = std::fs::read(path)?;
    let factory = load(&bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "factory loaded");
    Ok(factory)
}

fn resolve<'a>(values: &'a HashMap<u32, String>, key: u32) -> Result<&'a str, StorageError> {
    values
        .get(&key)
        .map(String::as_str)
        .ok_or(StorageError::Core(AsgError::UnknownKey {
            key: StringKey(key),
        }))
}

/// Reads a string-key field and resolves it against the stream's table.
fn read_string(
    reader: &mut Reader<'_>,
    values: &HashMap<u32, String>,
) -> Result<Option<String>, StorageError> {
    match reader.u32()? {
        0 => Ok(None),
        key => Ok(Some(resolve(values, key)?.to_string())),
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Reader<'a> {
        Reader { buf, pos: 0 }
    }

    fn u8(&mut self) -> Result<u8, StorageError> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or(StorageError::TruncatedStream { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn u32(&mut self) -> Result<u32, StorageError> {
        let raw = self.bytes(4)?;
        Ok(u32::from_le_bytes(raw.try_into().expect("4 bytes")))
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], StorageError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or(StorageError::TruncatedStream { offset: self.pos })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}
