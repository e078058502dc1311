//! Backward, lazy, encoding-aware line reading.
//!
//! `ReverseLineScanner` yields the lines of a text file last-first without
//! ever holding the whole file in memory. It reads fixed-size blocks backward
//! from the end-of-file position captured at open, reassembling lines across
//! block boundaries, which makes it safe to run against a log another process
//! is actively appending to: bytes written after open are simply outside the
//! scanned region.
//!
//! The file's byte-order mark selects the text encoding (UTF-8 or UTF-16
//! LE/BE); without one the default is UTF-8. Malformed sequences decode
//! lossily rather than failing the scan.
//!
//! The iterator is finite and not restartable — rescanning means opening a
//! fresh scanner. Dropping it early stops all I/O, which is the entire point
//! of reading backward: the interesting lines of a status log are the most
//! recent ones, and a multi-megabyte file must not be read front-to-back to
//! find them.

use std::{
    collections::VecDeque,
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

const DEFAULT_BLOCK_SIZE: usize = 4096;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Text encoding selected by the file's byte-order mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    /// Size of one code unit in bytes. Block boundaries and newline scans
    /// stay aligned to this grid.
    fn unit(self) -> usize {
        match self {
            TextEncoding::Utf8 => 1,
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => 2,
        }
    }

    /// Whether the code unit at `i` (unit-aligned) is a line feed.
    fn is_newline(self, bytes: &[u8], i: usize) -> bool {
        match self {
            TextEncoding::Utf8 => bytes[i] == b'\n',
            TextEncoding::Utf16Le => bytes[i] == 0x0A && bytes[i + 1] == 0x00,
            TextEncoding::Utf16Be => bytes[i] == 0x00 && bytes[i + 1] == 0x0A,
        }
    }

    /// Decodes one line's bytes, best effort, stripping a trailing `\r`.
    fn decode(self, bytes: &[u8]) -> String {
        let mut line = match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Utf16Le => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            TextEncoding::Utf16Be => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
        };
        if line.ends_with('\r') {
            line.pop();
        }
        line
    }
}

/// Lazy last-first line iterator over a text file.
pub struct ReverseLineScanner {
    file: File,
    encoding: TextEncoding,
    block_size: usize,

    /// First content byte (after any byte-order mark).
    data_start: u64,

    /// Lower bound of the region not yet read; shrinks toward `data_start`.
    pos: u64,

    /// Bytes of the earliest partial line seen so far — the segment that
    /// continues into the still-unread region.
    carry: Vec<u8>,

    /// Complete lines decoded-ready, most recent first.
    ready: VecDeque<Vec<u8>>,

    /// The file had content at open; the final carry flush yields a line
    /// even when that line is empty.
    has_content: bool,

    flushed: bool,
    failed: bool,
}

impl ReverseLineScanner {
    /// Opens the file for shared read and captures the scan region.
    ///
    /// # Errors
    /// Any I/O error from opening or sizing the file. A missing file is the
    /// caller's "no data" case, not a panic.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::with_block_size(path, DEFAULT_BLOCK_SIZE)
    }

    /// Opens with an explicit block size. Small blocks exercise boundary
    /// reassembly in tests; production uses the default.
    pub fn with_block_size(path: impl AsRef<Path>, block_size: usize) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();

        let mut bom = [0u8; 3];
        let sniff_len = len.min(3) as usize;
        if sniff_len > 0 {
            file.read_exact(&mut bom[..sniff_len])?;
        }

        let (encoding, data_start) = if sniff_len >= 3 && bom == UTF8_BOM {
            (TextEncoding::Utf8, 3)
        } else if sniff_len >= 2 && bom[..2] == UTF16_LE_BOM {
            (TextEncoding::Utf16Le, 2)
        } else if sniff_len >= 2 && bom[..2] == UTF16_BE_BOM {
            (TextEncoding::Utf16Be, 2)
        } else {
            (TextEncoding::Utf8, 0)
        };

        let unit = encoding.unit() as u64;
        // Align the scan region to the code-unit grid; a stray trailing byte
        // in a malformed UTF-16 file is left out rather than mis-splitting
        // every unit after it.
        let mut end = data_start + ((len.saturating_sub(data_start)) / unit) * unit;
        let has_content = end > data_start;

        // A trailing newline terminates the last line instead of opening an
        // extra empty one; skip it up front.
        if end > data_start {
            let mut last = vec![0u8; unit as usize];
            file.seek(SeekFrom::Start(end - unit))?;
            file.read_exact(&mut last)?;
            if encoding.is_newline(&last, 0) {
                end -= unit;
            }
        }

        let block_size = block_size.max(encoding.unit());
        let block_size = block_size - (block_size % encoding.unit());

        Ok(Self {
            file,
            encoding,
            block_size,
            data_start,
            pos: end,
            carry: Vec::new(),
            ready: VecDeque::new(),
            has_content,
            flushed: false,
            failed: false,
        })
    }

    /// Reads the next block backward and splits out any complete lines.
    fn pull_block(&mut self) -> io::Result<()> {
        let take = (self.pos - self.data_start).min(self.block_size as u64) as usize;
        let new_pos = self.pos - take as u64;

        let mut combined = vec![0u8; take];
        self.file.seek(SeekFrom::Start(new_pos))?;
        self.file.read_exact(&mut combined)?;
        self.pos = new_pos;

        // The carry holds bytes *later* in the file than this block.
        combined.append(&mut self.carry);

        let unit = self.encoding.unit();
        let separators: Vec<usize> = (0..combined.len())
            .step_by(unit)
            .filter(|&i| self.encoding.is_newline(&combined, i))
            .collect();

        if separators.is_empty() {
            self.carry = combined;
            return Ok(());
        }

        // Segments after each separator are complete lines; queue them most
        // recent first. The segment before the first separator continues
        // into the unread region and becomes the new carry.
        let mut end = combined.len();
        for &sep in separators.iter().rev() {
            self.ready.push_back(combined[sep + unit..end].to_vec());
            end = sep;
        }
        self.carry = combined[..separators[0]].to_vec();
        Ok(())
    }
}

impl Iterator for ReverseLineScanner {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if let Some(bytes) = self.ready.pop_front() {
                return Some(Ok(self.encoding.decode(&bytes)));
            }

            if self.pos > self.data_start {
                if let Err(e) = self.pull_block() {
                    self.failed = true;
                    return Some(Err(e));
                }
                continue;
            }

            // Region exhausted: the remaining carry is the earliest line.
            if self.has_content && !self.flushed {
                self.flushed = true;
                let bytes = std::mem::take(&mut self.carry);
                return Some(Ok(self.encoding.decode(&bytes)));
            }
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        File::create(&path).unwrap().write_all(bytes).unwrap();
        path
    }

    fn scan_all(path: &Path, block_size: usize) -> Vec<String> {
        ReverseLineScanner::with_block_size(path, block_size)
            .unwrap()
            .map(|line| line.unwrap())
            .collect()
    }

    fn utf16le(text: &str) -> Vec<u8> {
        let mut bytes = UTF16_LE_BOM.to_vec();
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    fn utf16be(text: &str) -> Vec<u8> {
        let mut bytes = UTF16_BE_BOM.to_vec();
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        bytes
    }

    #[test]
    fn yields_lines_in_strict_reverse_order() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "log.txt", b"first\nsecond\nthird\n");
        assert_eq!(scan_all(&path, 4096), vec!["third", "second", "first"]);
    }

    #[test]
    fn empty_file_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "log.txt", b"");
        assert!(scan_all(&path, 4096).is_empty());
    }

    #[test]
    fn missing_final_newline_still_yields_last_line() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "log.txt", b"first\nsecond");
        assert_eq!(scan_all(&path, 4096), vec!["second", "first"]);
    }

    #[test]
    fn crlf_endings_are_stripped() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "log.txt", b"first\r\nsecond\r\n");
        assert_eq!(scan_all(&path, 4096), vec!["second", "first"]);
    }

    #[test]
    fn blank_lines_are_preserved() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "log.txt", b"first\n\nthird\n");
        assert_eq!(scan_all(&path, 4096), vec!["third", "", "first"]);
    }

    #[test]
    fn lone_newline_is_one_empty_line() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "log.txt", b"\n");
        assert_eq!(scan_all(&path, 4096), vec![""]);
    }

    #[test]
    fn reassembles_lines_across_every_block_boundary() {
        let dir = TempDir::new().unwrap();
        let content = b"alpha\nthe quick brown fox\n\nbeta gamma delta\nomega";
        let path = write_file(&dir, "log.txt", content);
        let expected = vec!["omega", "beta gamma delta", "", "the quick brown fox", "alpha"];
        for block_size in 1..=64 {
            assert_eq!(scan_all(&path, block_size), expected, "block size {block_size}");
        }
    }

    #[test]
    fn utf8_bom_is_not_part_of_the_first_line() {
        let dir = TempDir::new().unwrap();
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"first\nsecond\n");
        let path = write_file(&dir, "log.txt", &bytes);
        assert_eq!(scan_all(&path, 4096), vec!["second", "first"]);
    }

    #[test]
    fn decodes_utf16_little_endian() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "log.txt", &utf16le("héllo\nwörld\n"));
        for block_size in [2, 4, 6, 4096] {
            assert_eq!(scan_all(&path, block_size), vec!["wörld", "héllo"]);
        }
    }

    #[test]
    fn decodes_utf16_big_endian_with_crlf() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "log.txt", &utf16be("one\r\ntwo\r\nthree"));
        assert_eq!(scan_all(&path, 8), vec!["three", "two", "one"]);
    }

    #[test]
    fn invalid_utf8_degrades_to_lossy_decoding() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "log.txt", b"ok\n\xFF\xFEbroken\xC3\n");
        let lines = scan_all(&path, 4096);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("broken"));
        assert_eq!(lines[1], "ok");
    }

    #[test]
    fn missing_file_surfaces_as_open_error() {
        let dir = TempDir::new().unwrap();
        let result = ReverseLineScanner::open(dir.path().join("nope.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn early_termination_reads_only_the_tail() {
        let dir = TempDir::new().unwrap();
        let mut content = Vec::new();
        for i in 0..10_000 {
            content.extend_from_slice(format!("line number {i}\n").as_bytes());
        }
        let path = write_file(&dir, "log.txt", &content);

        // Tiny blocks over a large file: laziness is what keeps this fast.
        let mut scanner = ReverseLineScanner::with_block_size(&path, 64).unwrap();
        assert_eq!(scanner.next().unwrap().unwrap(), "line number 9999");
        drop(scanner);

        let first_three: Vec<String> = ReverseLineScanner::with_block_size(&path, 64)
            .unwrap()
            .take(3)
            .map(|line| line.unwrap())
            .collect();
        assert_eq!(
            first_three,
            vec!["line number 9999", "line number 9998", "line number 9997"]
        );
    }

    #[test]
    fn bytes_appended_after_open_are_outside_the_scan() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "log.txt", b"old one\nold two\n");

        let scanner = ReverseLineScanner::open(&path).unwrap();
        let mut appender = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        appender.write_all(b"new line\n").unwrap();

        let lines: Vec<String> = scanner.map(|line| line.unwrap()).collect();
        assert_eq!(lines, vec!["old two", "old one"]);
    }
}
