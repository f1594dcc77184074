//! Locates spectrum records by scan number in line-oriented spectrum files.
//!
//! Records start with an `S` line (`S <low scan> <high scan> [charge] <precursor m/z>`)
//! and are stored in ascending low-scan order. Records have variable length,
//! so the search bisects byte offsets instead of record indices.

use crate::errors::{
    PsmSeekError,
    Result,
};
use std::fs::File;
use std::io::{
    BufRead,
    BufReader,
    Read,
    Seek,
    SeekFrom,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumRecordHeader {
    pub offset: u64,
    pub first_scan: u32,
    pub last_scan: u32,
    pub charge: Option<u8>,
    pub precursor_mz: f64,
}

impl SpectrumRecordHeader {
    /// Parses an `S` line. Fields may be separated by tabs or spaces.
    pub fn parse_line(line: &str, offset: u64) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first() != Some(&"S") || fields.len() < 4 {
            return Err(PsmSeekError::ParseError {
                msg: format!("malformed spectrum header at byte {}: '{}'", offset, line.trim_end()),
            });
        }
        let first_scan: u32 = fields[1].parse()?;
        let last_scan: u32 = fields[2].parse()?;
        let charge = if fields.len() >= 5 {
            Some(fields[3].parse::<u8>()?)
        } else {
            None
        };
        let precursor_mz: f64 = fields[fields.len() - 1].parse()?;
        Ok(Self {
            offset,
            first_scan,
            last_scan,
            charge,
            precursor_mz,
        })
    }
}

/// Binary search over an open spectrum file.
///
/// Single-threaded. The reader position is unspecified after any call.
pub struct ScanIndex<R: Read + Seek> {
    reader: R,
    file_len: u64,
    path: Option<PathBuf>,
}

impl ScanIndex<File> {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| PsmSeekError::Io {
            source: e,
            path: Some(path.to_path_buf()),
        })?;
        let mut out = Self::new(file)?;
        out.path = Some(path.to_path_buf());
        Ok(out)
    }
}

impl<R: Read + Seek> ScanIndex<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        Ok(Self {
            reader,
            file_len,
            path: None,
        })
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn io_err(&self, source: std::io::Error) -> PsmSeekError {
        PsmSeekError::Io {
            source,
            path: self.path.clone(),
        }
    }

    /// Byte offset of the record whose first scan is `scan`, if any.
    pub fn find_scan_offset(&mut self, scan: u32) -> Result<Option<u64>> {
        Ok(self.find_record(scan)?.map(|x| x.offset))
    }

    /// Header of the record whose first scan is `scan`, if any.
    pub fn find_record(&mut self, scan: u32) -> Result<Option<SpectrumRecordHeader>> {
        if self.file_len == 0 {
            return Ok(None);
        }

        // Signed bounds, `high` can drop below `low` (or zero) to end the search.
        let mut low: i64 = 0;
        let mut high: i64 = self.file_len as i64;
        let mut probes = 0usize;

        while low <= high {
            probes += 1;
            let mid = (low + high) / 2;
            match self.first_header_from(mid as u64, high as u64)? {
                Some(header) => {
                    if header.first_scan == scan {
                        debug!("Found scan {} at byte {} after {} probes", scan, header.offset, probes);
                        return Ok(Some(header));
                    } else if scan < header.first_scan {
                        high = mid - 1;
                    } else {
                        low = mid + 1;
                    }
                }
                None => {
                    high = mid - 1;
                }
            }
        }

        debug!("Scan {} not found after {} probes", scan, probes);
        Ok(None)
    }

    /// Parses the header of the record starting at `offset`.
    pub fn read_header_at(&mut self, offset: u64) -> Result<Option<SpectrumRecordHeader>> {
        self.first_header_from(offset, self.file_len)
    }

    /// First `S` line starting at or after `pos`, giving up once line starts
    /// pass `limit`.
    fn first_header_from(&mut self, pos: u64, limit: u64) -> Result<Option<SpectrumRecordHeader>> {
        let start = if pos == 0 { 0 } else { pos - 1 };
        if let Err(e) = self.reader.seek(SeekFrom::Start(start)) {
            return Err(self.io_err(e));
        }

        let mut reader = BufReader::new(&mut self.reader);
        let mut line = String::new();
        let mut line_start = start;

        // Skip the remainder of the line `pos` lands in, unless `pos` is
        // already at a line start.
        if pos > 0 {
            let n = match reader.read_line(&mut line) {
                Ok(n) => n,
                Err(e) => {
                    return Err(PsmSeekError::Io {
                        source: e,
                        path: self.path.clone(),
                    });
                }
            };
            line_start += n as u64;
        }

        loop {
            if line_start > limit || line_start >= self.file_len {
                return Ok(None);
            }
            line.clear();
            let n = match reader.read_line(&mut line) {
                Ok(n) => n,
                Err(e) => {
                    return Err(PsmSeekError::Io {
                        source: e,
                        path: self.path.clone(),
                    });
                }
            };
            if n == 0 {
                return Ok(None);
            }
            if line.starts_with('S') {
                return SpectrumRecordHeader::parse_line(&line, line_start).map(Some);
            }
            line_start += n as u64;
        }
    }
}
