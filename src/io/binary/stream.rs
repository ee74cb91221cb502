// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Binary stream over a file or an in-memory buffer.

use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::vax;
use super::{ByteOrderFormat, FailureKind, FailureMask, OpenMode, SeekOrigin, StreamFailure};

/// Backing device of a stream.
enum Device {
    Closed,
    /// Read-only memory-mapped file
    Mapped(Cursor<memmap2::Mmap>),
    /// In-memory buffer, readable and writable
    Memory(Cursor<Vec<u8>>),
    /// Regular file handle
    File(File),
}

/// Reads and writes primitive values under one byte-order format.
///
/// The format is fixed for the lifetime of the stream. Every read and write
/// returns a `Result`; failures whose kind is escalated (all kinds by
/// default, see [`BinaryStream::set_exceptions`]) become a
/// [`StreamFailure`], the others only set the corresponding state flag and
/// yield zero.
///
/// # Example
///
/// ```rust
/// use mocapcodec::io::binary::{BinaryStream, ByteOrderFormat};
///
/// let mut stream = BinaryStream::from_bytes(Vec::new(), ByteOrderFormat::IeeeBigEndian);
/// stream.write_u16(0x0102)?;
/// assert_eq!(stream.into_bytes(), vec![0x01, 0x02]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct BinaryStream {
    device: Device,
    format: ByteOrderFormat,
    mode: OpenMode,
    exceptions: FailureMask,
    state: FailureMask,
}

impl std::fmt::Debug for BinaryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryStream")
            .field("format", &self.format)
            .field("mode", &self.mode)
            .field("open", &self.is_open())
            .field("state", &self.state)
            .finish()
    }
}

impl BinaryStream {
    /// Open a file.
    ///
    /// Files opened for reading are memory-mapped. Failing to open the file
    /// returns a failure flagged as not open.
    pub fn open<P: AsRef<Path>>(
        path: P,
        mode: OpenMode,
        format: ByteOrderFormat,
    ) -> Result<Self, StreamFailure> {
        let path = path.as_ref();
        let device = match mode {
            OpenMode::Read => {
                let file = File::open(path).map_err(|e| StreamFailure::from_io(&e, false))?;
                let len = file
                    .metadata()
                    .map_err(|e| StreamFailure::from_io(&e, false))?
                    .len();
                if len == 0 {
                    Device::Memory(Cursor::new(Vec::new()))
                } else {
                    // The map is owned by the stream and never handed out mutably.
                    let mmap = unsafe { memmap2::Mmap::map(&file) }
                        .map_err(|e| StreamFailure::from_io(&e, false))?;
                    Device::Mapped(Cursor::new(mmap))
                }
            }
            OpenMode::Write => {
                Device::File(File::create(path).map_err(|e| StreamFailure::from_io(&e, false))?)
            }
            OpenMode::ReadWrite => Device::File(
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(path)
                    .map_err(|e| StreamFailure::from_io(&e, false))?,
            ),
        };
        tracing::debug!(path = %path.display(), ?mode, ?format, "opened binary stream");
        Ok(Self {
            device,
            format: format.resolve(),
            mode,
            exceptions: FailureMask::ALL,
            state: FailureMask::NONE,
        })
    }

    /// Create a read-write stream over an in-memory buffer, positioned at 0.
    pub fn from_bytes(bytes: Vec<u8>, format: ByteOrderFormat) -> Self {
        Self {
            device: Device::Memory(Cursor::new(bytes)),
            format: format.resolve(),
            mode: OpenMode::ReadWrite,
            exceptions: FailureMask::ALL,
            state: FailureMask::NONE,
        }
    }

    /// Consume the stream and return the in-memory buffer.
    ///
    /// File-backed streams return an empty buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        match self.device {
            Device::Memory(cursor) => cursor.into_inner(),
            _ => Vec::new(),
        }
    }

    /// Byte-order format of the stream.
    pub fn format(&self) -> ByteOrderFormat {
        self.format
    }

    /// Rewind to the start and decode everything again under `format`.
    ///
    /// Used when the byte order is only known once a header was read.
    pub(crate) fn restart_with(&mut self, format: ByteOrderFormat) -> Result<(), StreamFailure> {
        self.format = format.resolve();
        self.clear_state();
        self.seek(0, SeekOrigin::Begin)
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.device, Device::Closed)
    }

    /// Flush and close the stream. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), StreamFailure> {
        let device = std::mem::replace(&mut self.device, Device::Closed);
        if let Device::File(mut file) = device {
            file.flush().map_err(|e| StreamFailure::from_io(&e, true))?;
        }
        Ok(())
    }

    /// Choose which failure kinds are escalated into errors.
    pub fn set_exceptions(&mut self, mask: FailureMask) {
        self.exceptions = mask;
    }

    pub fn exceptions(&self) -> FailureMask {
        self.exceptions
    }

    /// Failures that occurred since the last [`clear_state`](Self::clear_state).
    pub fn state(&self) -> FailureMask {
        self.state
    }

    pub fn clear_state(&mut self) {
        self.state = FailureMask::NONE;
    }

    pub fn is_eof(&self) -> bool {
        self.state.contains(FailureKind::EndOfFile)
    }

    /// Check whether no failure flag is set.
    pub fn is_good(&self) -> bool {
        self.state.is_empty()
    }

    /// Record a failure and escalate it when requested.
    fn fail(&mut self, kind: FailureKind) -> Result<(), StreamFailure> {
        self.state.insert(kind);
        if self.exceptions.contains(kind) {
            Err(StreamFailure::new(kind, self.is_open()))
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Positioning
    // =========================================================================

    /// Move the position. Seeking before the start is a logic failure.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<(), StreamFailure> {
        let target = match origin {
            SeekOrigin::Begin => {
                if offset < 0 {
                    return self.fail(FailureKind::Logic);
                }
                SeekFrom::Start(offset as u64)
            }
            SeekOrigin::Current => SeekFrom::Current(offset),
            SeekOrigin::End => SeekFrom::End(offset),
        };
        let result = match &mut self.device {
            Device::Closed => return self.fail(FailureKind::Logic),
            Device::Mapped(cursor) => cursor.seek(target),
            Device::Memory(cursor) => cursor.seek(target),
            Device::File(file) => file.seek(target),
        };
        match result {
            Ok(_) => Ok(()),
            Err(_) => self.fail(FailureKind::Logic),
        }
    }

    /// Current position from the start.
    pub fn tell(&mut self) -> Result<u64, StreamFailure> {
        let result = match &mut self.device {
            Device::Closed => {
                self.fail(FailureKind::Logic)?;
                return Ok(0);
            }
            Device::Mapped(cursor) => Ok(cursor.position()),
            Device::Memory(cursor) => Ok(cursor.position()),
            Device::File(file) => file.stream_position(),
        };
        match result {
            Ok(pos) => Ok(pos),
            Err(_) => {
                self.fail(FailureKind::Fault)?;
                Ok(0)
            }
        }
    }

    /// Total size of the underlying source.
    pub fn len(&mut self) -> Result<u64, StreamFailure> {
        let result = match &mut self.device {
            Device::Closed => {
                self.fail(FailureKind::Logic)?;
                return Ok(0);
            }
            Device::Mapped(cursor) => Ok(cursor.get_ref().len() as u64),
            Device::Memory(cursor) => Ok(cursor.get_ref().len() as u64),
            Device::File(file) => file.metadata().map(|m| m.len()),
        };
        match result {
            Ok(len) => Ok(len),
            Err(_) => {
                self.fail(FailureKind::Fault)?;
                Ok(0)
            }
        }
    }

    /// Check whether the source has no bytes left to read.
    pub fn at_end(&mut self) -> Result<bool, StreamFailure> {
        let pos = self.tell()?;
        Ok(pos >= self.len()?)
    }

    /// Number of bytes between the current position and the end.
    pub fn remaining(&mut self) -> Result<u64, StreamFailure> {
        let pos = self.tell()?;
        Ok(self.len()?.saturating_sub(pos))
    }

    // =========================================================================
    // Raw access
    // =========================================================================

    /// Fill `buf` completely. On a masked failure the buffer is zeroed.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), StreamFailure> {
        if !self.mode.can_read() {
            buf.fill(0);
            return self.fail(FailureKind::Logic);
        }
        let result = match &mut self.device {
            Device::Closed => {
                buf.fill(0);
                return self.fail(FailureKind::Logic);
            }
            Device::Mapped(cursor) => cursor.read_exact(buf),
            Device::Memory(cursor) => cursor.read_exact(buf),
            Device::File(file) => file.read_exact(buf),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                buf.fill(0);
                self.fail(StreamFailure::from_io(&e, true).kind)
            }
        }
    }

    fn write_from(&mut self, buf: &[u8]) -> Result<usize, StreamFailure> {
        if !self.mode.can_write() {
            self.fail(FailureKind::Logic)?;
            return Ok(0);
        }
        let result = match &mut self.device {
            Device::Closed | Device::Mapped(_) => {
                self.fail(FailureKind::Logic)?;
                return Ok(0);
            }
            Device::Memory(cursor) => cursor.write_all(buf),
            Device::File(file) => file.write_all(buf),
        };
        match result {
            Ok(()) => Ok(buf.len()),
            Err(e) => {
                self.fail(StreamFailure::from_io(&e, true).kind)?;
                Ok(0)
            }
        }
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, StreamFailure> {
        let mut buf = vec![0u8; n];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Write raw bytes and return the number written.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize, StreamFailure> {
        self.write_from(bytes)
    }

    /// Write `n` zero bytes.
    pub fn fill(&mut self, n: usize) -> Result<usize, StreamFailure> {
        self.write_from(&vec![0u8; n])
    }

    // =========================================================================
    // Integers
    // =========================================================================

    pub fn read_u8(&mut self) -> Result<u8, StreamFailure> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, StreamFailure> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, StreamFailure> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;
        Ok(if self.format.is_big_endian() {
            BigEndian::read_u16(&buf)
        } else {
            LittleEndian::read_u16(&buf)
        })
    }

    pub fn read_i16(&mut self) -> Result<i16, StreamFailure> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, StreamFailure> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(if self.format.is_big_endian() {
            BigEndian::read_u32(&buf)
        } else {
            LittleEndian::read_u32(&buf)
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, StreamFailure> {
        Ok(self.read_u32()? as i32)
    }

    /// Read `n` consecutive signed bytes.
    pub fn read_i8_vec(&mut self, n: usize) -> Result<Vec<i8>, StreamFailure> {
        Ok(self.read_bytes(n)?.into_iter().map(|b| b as i8).collect())
    }

    /// Read `n` consecutive signed 16-bit integers.
    pub fn read_i16_vec(&mut self, n: usize) -> Result<Vec<i16>, StreamFailure> {
        (0..n).map(|_| self.read_i16()).collect()
    }

    /// Read `n` consecutive unsigned 16-bit integers.
    pub fn read_u16_vec(&mut self, n: usize) -> Result<Vec<u16>, StreamFailure> {
        (0..n).map(|_| self.read_u16()).collect()
    }

    pub fn write_u8(&mut self, value: u8) -> Result<usize, StreamFailure> {
        self.write_from(&[value])
    }

    pub fn write_i8(&mut self, value: i8) -> Result<usize, StreamFailure> {
        self.write_from(&[value as u8])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<usize, StreamFailure> {
        let mut buf = [0u8; 2];
        if self.format.is_big_endian() {
            BigEndian::write_u16(&mut buf, value);
        } else {
            LittleEndian::write_u16(&mut buf, value);
        }
        self.write_from(&buf)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<usize, StreamFailure> {
        self.write_u16(value as u16)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<usize, StreamFailure> {
        let mut buf = [0u8; 4];
        if self.format.is_big_endian() {
            BigEndian::write_u32(&mut buf, value);
        } else {
            LittleEndian::write_u32(&mut buf, value);
        }
        self.write_from(&buf)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<usize, StreamFailure> {
        self.write_u32(value as u32)
    }

    // =========================================================================
    // Floating point
    // =========================================================================

    pub fn read_f32(&mut self) -> Result<f32, StreamFailure> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(match self.format {
            ByteOrderFormat::VaxLittleEndian => vax::vax_f_to_f32(buf),
            f if f.is_big_endian() => BigEndian::read_f32(&buf),
            _ => LittleEndian::read_f32(&buf),
        })
    }

    pub fn read_f64(&mut self) -> Result<f64, StreamFailure> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(match self.format {
            ByteOrderFormat::VaxLittleEndian => vax::vax_d_to_f64(buf),
            f if f.is_big_endian() => BigEndian::read_f64(&buf),
            _ => LittleEndian::read_f64(&buf),
        })
    }

    /// Read `n` consecutive floats.
    pub fn read_f32_vec(&mut self, n: usize) -> Result<Vec<f32>, StreamFailure> {
        (0..n).map(|_| self.read_f32()).collect()
    }

    pub fn write_f32(&mut self, value: f32) -> Result<usize, StreamFailure> {
        let buf = match self.format {
            ByteOrderFormat::VaxLittleEndian => vax::f32_to_vax_f(value),
            f if f.is_big_endian() => value.to_be_bytes(),
            _ => value.to_le_bytes(),
        };
        self.write_from(&buf)
    }

    pub fn write_f64(&mut self, value: f64) -> Result<usize, StreamFailure> {
        let buf = match self.format {
            ByteOrderFormat::VaxLittleEndian => vax::f64_to_vax_d(value),
            f if f.is_big_endian() => value.to_be_bytes(),
            _ => value.to_le_bytes(),
        };
        self.write_from(&buf)
    }

    // =========================================================================
    // Strings
    // =========================================================================

    /// Read a fixed-length string. Bytes are taken as Latin-1, untrimmed.
    pub fn read_string(&mut self, n: usize) -> Result<String, StreamFailure> {
        Ok(self.read_bytes(n)?.into_iter().map(char::from).collect())
    }

    /// Read `count` fixed-length strings of `len` bytes each.
    pub fn read_strings(&mut self, count: usize, len: usize) -> Result<Vec<String>, StreamFailure> {
        (0..count).map(|_| self.read_string(len)).collect()
    }

    /// Write the bytes of a string (characters above U+00FF become `?`).
    pub fn write_string(&mut self, value: &str) -> Result<usize, StreamFailure> {
        let bytes: Vec<u8> = value
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect();
        self.write_from(&bytes)
    }

    /// Write a string truncated or right-padded with `pad` to `len` bytes.
    pub fn write_padded_string(
        &mut self,
        value: &str,
        len: usize,
        pad: u8,
    ) -> Result<usize, StreamFailure> {
        let mut bytes: Vec<u8> = value
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .take(len)
            .collect();
        bytes.resize(len, pad);
        self.write_from(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_integers() {
        let mut stream = BinaryStream::from_bytes(Vec::new(), ByteOrderFormat::IeeeLittleEndian);
        assert_eq!(stream.write_u16(0x0102).unwrap(), 2);
        assert_eq!(stream.write_i32(-2).unwrap(), 4);
        stream.seek(0, SeekOrigin::Begin).unwrap();
        assert_eq!(stream.read_u8().unwrap(), 0x02);
        assert_eq!(stream.read_u8().unwrap(), 0x01);
        assert_eq!(stream.read_i32().unwrap(), -2);
    }

    #[test]
    fn test_big_endian_float() {
        let mut stream = BinaryStream::from_bytes(Vec::new(), ByteOrderFormat::IeeeBigEndian);
        stream.write_f32(1.0).unwrap();
        assert_eq!(stream.into_bytes(), vec![0x3F, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_vax_float() {
        let mut stream = BinaryStream::from_bytes(Vec::new(), ByteOrderFormat::VaxLittleEndian);
        stream.write_f32(1.0).unwrap();
        stream.write_i16(-3).unwrap();
        stream.seek(0, SeekOrigin::Begin).unwrap();
        assert_eq!(stream.read_f32().unwrap(), 1.0);
        assert_eq!(stream.read_i16().unwrap(), -3);
        assert_eq!(stream.into_bytes(), vec![0x80, 0x40, 0x00, 0x00, 0xFD, 0xFF]);
    }

    #[test]
    fn test_restart_with_other_format() {
        let mut stream = BinaryStream::from_bytes(vec![0x01, 0x02], ByteOrderFormat::IeeeLittleEndian);
        assert_eq!(stream.read_u16().unwrap(), 0x0201);
        stream.restart_with(ByteOrderFormat::IeeeBigEndian).unwrap();
        assert_eq!(stream.format(), ByteOrderFormat::IeeeBigEndian);
        assert_eq!(stream.read_u16().unwrap(), 0x0102);
    }

    #[test]
    fn test_read_past_end_escalates() {
        let mut stream = BinaryStream::from_bytes(vec![1], ByteOrderFormat::IeeeLittleEndian);
        let err = stream.read_u16().unwrap_err();
        assert_eq!(err.kind, FailureKind::EndOfFile);
        assert!(err.is_open);
        assert!(stream.is_eof());
    }

    #[test]
    fn test_masked_end_of_file_yields_zero() {
        let mut stream = BinaryStream::from_bytes(vec![1], ByteOrderFormat::IeeeLittleEndian);
        stream.set_exceptions(FailureMask::FAULT | FailureMask::LOGIC);
        assert_eq!(stream.read_u32().unwrap(), 0);
        assert!(stream.is_eof());
        assert!(!stream.is_good());
        stream.clear_state();
        assert!(stream.is_good());
    }

    #[test]
    fn test_seek_before_start_is_logic_failure() {
        let mut stream = BinaryStream::from_bytes(vec![0; 4], ByteOrderFormat::Native);
        let err = stream.seek(-1, SeekOrigin::Begin).unwrap_err();
        assert_eq!(err.kind, FailureKind::Logic);
    }

    #[test]
    fn test_seek_and_tell() {
        let mut stream = BinaryStream::from_bytes(vec![0; 16], ByteOrderFormat::Native);
        stream.seek(4, SeekOrigin::Begin).unwrap();
        stream.seek(2, SeekOrigin::Current).unwrap();
        assert_eq!(stream.tell().unwrap(), 6);
        stream.seek(-2, SeekOrigin::End).unwrap();
        assert_eq!(stream.tell().unwrap(), 14);
        assert_eq!(stream.remaining().unwrap(), 2);
        assert!(!stream.at_end().unwrap());
    }

    #[test]
    fn test_strings() {
        let mut stream = BinaryStream::from_bytes(Vec::new(), ByteOrderFormat::Native);
        stream.write_padded_string("LASI", 8, b' ').unwrap();
        stream.seek(0, SeekOrigin::Begin).unwrap();
        assert_eq!(stream.read_string(8).unwrap(), "LASI    ");
    }

    #[test]
    fn test_closed_stream_reports_invalid_path() {
        let mut stream = BinaryStream::from_bytes(vec![0; 4], ByteOrderFormat::Native);
        stream.close().unwrap();
        let err = stream.read_u8().unwrap_err();
        assert_eq!(err.cause(), "Invalid file path.");
    }

    #[test]
    fn test_open_missing_file() {
        let err = BinaryStream::open(
            "/nonexistent/dir/file.bin",
            OpenMode::Read,
            ByteOrderFormat::Native,
        )
        .unwrap_err();
        assert!(!err.is_open);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.bin");
        let mut out = BinaryStream::open(&path, OpenMode::Write, ByteOrderFormat::IeeeBigEndian)
            .unwrap();
        out.write_f64(-0.25).unwrap();
        out.write_u16(7).unwrap();
        out.close().unwrap();

        let mut input =
            BinaryStream::open(&path, OpenMode::Read, ByteOrderFormat::IeeeBigEndian).unwrap();
        assert_eq!(input.len().unwrap(), 10);
        assert_eq!(input.read_f64().unwrap(), -0.25);
        assert_eq!(input.read_u16().unwrap(), 7);
        assert!(input.at_end().unwrap());
        assert!(input.write_u8(1).is_err());
    }
}
