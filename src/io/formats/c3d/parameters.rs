// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! C3D parameter section.
//!
//! The section starts with a 4-byte header (first block, key, number of
//! blocks, processor type) followed by a linked list of entries. Each entry
//! is a group (negative id) or a parameter (positive id) and stores the
//! distance from its offset word to the next entry; an offset of 0 marks
//! the last entry. Parameters belong to the group whose id is the opposite
//! of theirs.

use crate::io::binary::{BinaryStream, SeekOrigin};
use crate::metadata::{MetaData, MetaDataFormat, MetaDataInfo, MetaDataValues};
use crate::{MocapError, Result};

use super::C3D_FORMAT;

/// Size of a C3D block.
pub(crate) const BLOCK_SIZE: u64 = 512;

/// Parameter-section key (also the header key).
pub(crate) const PARAMETER_KEY: u8 = 80;

/// Groups and parameters decoded from a parameter section.
#[derive(Debug)]
pub(crate) struct ParameterSection {
    /// Groups in file order, with their parameters attached
    pub groups: Vec<MetaData>,
    /// First block stored in the section header
    pub first_block: u8,
    /// Number of blocks of the section (corrected to the blocks read)
    pub block_count: usize,
}

fn format_error(cause: impl Into<String>) -> MocapError {
    MocapError::format(C3D_FORMAT, cause)
}

/// Decode the parameter section starting at the current position.
pub(crate) fn read_section(stream: &mut BinaryStream) -> Result<ParameterSection> {
    let section_start = stream.tell()?;
    let first_block = stream.read_u8()?;
    let _key = stream.read_i8()?;
    let declared_blocks = stream.read_u8()?;
    let _processor = stream.read_u8()?;
    if first_block > 1 {
        stream.seek(BLOCK_SIZE as i64 * (i64::from(first_block) - 1) - 4, SeekOrigin::Current)?;
    }
    let section_end = section_start + BLOCK_SIZE * u64::from(declared_blocks);

    let mut groups: Vec<(i8, MetaData)> = Vec::new();
    let mut parameters: Vec<(i8, MetaData)> = Vec::new();
    loop {
        let label_len = stream.read_i8()?;
        if label_len == 0 {
            break;
        }
        let id = stream.read_i8()?;
        if id == 0 {
            return Err(format_error(
                "Error during the ID extraction in the parameter section - ID equal to 0",
            ));
        }
        let label = stream.read_string(label_len.unsigned_abs() as usize)?;
        let offset_position = stream.tell()?;
        let offset = stream.read_u16()?;
        let last_entry = offset == 0;
        let unlocked = label_len > 0;

        if id < 0 {
            let description_len = stream.read_u8()?;
            let description = stream.read_string(description_len as usize)?;
            groups.push((
                id,
                MetaData::new(label)
                    .with_description(description)
                    .with_unlock(unlocked),
            ));
        } else {
            let type_code = stream.read_i8()?;
            let dim_count = stream.read_u8()?;
            let dims = stream.read_bytes(dim_count as usize)?;
            let format = MetaDataFormat::from_type_code(type_code)
                .ok_or_else(|| format_error("Data parameter type unknown"))?;
            let count: usize = dims.iter().map(|&d| d as usize).product();
            let remaining = i64::from(offset) - (stream.tell()? - offset_position) as i64;
            if !last_entry && (count * format.byte_size()) as i64 >= remaining {
                return Err(format_error(
                    "Error in the number of elements in the parameter's data. The number is superior to the offset",
                ));
            }
            let info = read_values(stream, format, &dims)?;
            let description_len = stream.read_u8()?;
            let description = stream.read_string(description_len as usize)?;
            parameters.push((
                id,
                MetaData::new(label)
                    .with_description(description)
                    .with_unlock(unlocked)
                    .with_info(info),
            ));
        }

        if last_entry {
            break;
        }
        let next = offset_position + u64::from(offset);
        if next < stream.tell()? {
            return Err(format_error(
                "Error during the pointing of another parameter|group",
            ));
        }
        if next > section_end {
            tracing::warn!(
                "The next parameter is pointing in the data section. Parameters' extraction is stopped."
            );
            break;
        }
        stream.seek(next as i64, SeekOrigin::Begin)?;
    }

    let bytes_read = stream.tell()? - section_start;
    let blocks_read = bytes_read.div_ceil(BLOCK_SIZE) as usize;
    let block_count = if blocks_read != declared_blocks as usize {
        tracing::warn!(
            declared = declared_blocks,
            read = blocks_read,
            "The number of blocks of the parameter section differs from the number of blocks read. The number of blocks read is kept."
        );
        blocks_read
    } else {
        declared_blocks as usize
    };

    let mut orphans = 0usize;
    for (id, parameter) in parameters {
        match groups.iter_mut().find(|(gid, _)| *gid == -id) {
            Some((_, group)) => group.append_child(parameter),
            None => orphans += 1,
        }
    }
    if orphans > 0 {
        tracing::warn!(
            orphans,
            "Some parameters are orphans. No group has the same id. These parameters are lost."
        );
    }

    Ok(ParameterSection {
        groups: groups.into_iter().map(|(_, g)| g).collect(),
        first_block,
        block_count,
    })
}

fn read_values(stream: &mut BinaryStream, format: MetaDataFormat, dims: &[u8]) -> Result<MetaDataInfo> {
    let count: usize = dims.iter().map(|&d| d as usize).product();
    match format {
        MetaDataFormat::Char => {
            let (len, shape) = match dims.split_first() {
                Some((&len, rest)) => (len as usize, rest.to_vec()),
                None => (1, Vec::new()),
            };
            let strings_count: usize = shape.iter().map(|&d| d as usize).product();
            let strings = stream.read_strings(strings_count, len)?;
            let mut info = MetaDataInfo::new(shape, strings)?;
            // Keep the declared length even when every string is shorter.
            let mut declared = info.dimensions().to_vec();
            if let Some(first) = declared.first_mut() {
                *first = len as u8;
            }
            info.set_dimensions(declared);
            Ok(info)
        }
        MetaDataFormat::Byte => MetaDataInfo::new(dims.to_vec(), stream.read_i8_vec(count)?),
        MetaDataFormat::Integer => MetaDataInfo::new(dims.to_vec(), stream.read_i16_vec(count)?),
        MetaDataFormat::Real => MetaDataInfo::new(dims.to_vec(), stream.read_f32_vec(count)?),
    }
}

/// Byte length of a label or description once clamped.
fn clamp_len(text: &str, max: usize) -> usize {
    text.chars().count().min(max)
}

fn values_len(info: &MetaDataInfo) -> usize {
    info.dimensions_product() * info.format().byte_size()
}

fn entry_len(node: &MetaData, is_group: bool) -> usize {
    let head = 2 + clamp_len(node.label(), 127) + 2;
    let description = 1 + clamp_len(node.description(), 255);
    if is_group {
        head + description
    } else {
        let dims = node.info().map_or(0, |i| i.dimensions().len());
        let values = node.info().map_or(0, values_len);
        head + 2 + dims + values + description
    }
}

/// Size in bytes of the encoded section, including its 4-byte header.
pub(crate) fn section_len(root: &MetaData) -> usize {
    let entries: usize = root
        .children()
        .iter()
        .map(|group| {
            entry_len(group, true)
                + group
                    .children()
                    .iter()
                    .filter(|p| p.has_info())
                    .map(|p| entry_len(p, false))
                    .sum::<usize>()
        })
        .sum();
    // An empty section still needs its terminating byte.
    4 + entries.max(1)
}

/// Encode the section (header included) for the children of `root`.
///
/// Groups are numbered from 1 in order; parameters without values are
/// skipped. The caller pads the stream to the block boundary.
pub(crate) fn write_section(
    stream: &mut BinaryStream,
    root: &MetaData,
    block_count: u8,
    processor: u8,
) -> Result<()> {
    if root.child_count() > 127 {
        return Err(format_error("Too many parameter groups (maximum 127)."));
    }
    stream.write_u8(1)?;
    stream.write_u8(PARAMETER_KEY)?;
    stream.write_u8(block_count)?;
    stream.write_u8(processor)?;

    let mut entries: Vec<(i8, &MetaData)> = Vec::new();
    for (index, group) in root.children().iter().enumerate() {
        let id = index as i8 + 1;
        entries.push((-id, group));
        entries.extend(group.children().iter().filter(|p| p.has_info()).map(|p| (id, p)));
    }
    if entries.is_empty() {
        stream.write_u8(0)?;
        return Ok(());
    }

    let last = entries.len() - 1;
    for (position, (id, node)) in entries.into_iter().enumerate() {
        let label: String = node.label().chars().take(127).collect();
        let label_len = label.chars().count() as i8;
        stream.write_i8(if node.is_unlocked() { label_len } else { -label_len })?;
        stream.write_i8(id)?;
        stream.write_string(&label)?;
        let is_group = id < 0;
        let next = if position == last {
            0
        } else {
            entry_len(node, is_group) - 2 - label.chars().count()
        };
        stream.write_u16(next as u16)?;
        if let (false, Some(info)) = (is_group, node.info()) {
            write_values(stream, info)?;
        }
        let description: String = node.description().chars().take(255).collect();
        stream.write_u8(description.chars().count() as u8)?;
        stream.write_string(&description)?;
    }
    Ok(())
}

fn write_values(stream: &mut BinaryStream, info: &MetaDataInfo) -> Result<()> {
    stream.write_i8(info.format().type_code())?;
    stream.write_u8(info.dimensions().len() as u8)?;
    stream.write_bytes(info.dimensions())?;
    match info.values() {
        MetaDataValues::Char(strings) => {
            let len = info.dimensions().first().copied().unwrap_or(0) as usize;
            for s in strings {
                stream.write_padded_string(s, len, b' ')?;
            }
        }
        MetaDataValues::Byte(values) => {
            for &v in values {
                stream.write_i8(v)?;
            }
        }
        MetaDataValues::Integer(values) => {
            for &v in values {
                stream.write_i16(v)?;
            }
        }
        MetaDataValues::Real(values) => {
            for &v in values {
                stream.write_f32(v)?;
            }
        }
    }
    Ok(())
}
