use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use noodles::bgzf;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::EvalResult;
use crate::record::AlignmentRecord;

/// Open an alignment file, decompressing by extension, returning a boxed BufRead
pub fn open_alignment_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    match ext {
        "bgz" => Ok(Box::new(BufReader::new(bgzf::io::reader::Reader::new(file)))),
        "gz" => Ok(Box::new(BufReader::new(MultiGzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

/// Streaming reader over JSON-lines alignment output
///
/// Yields one `(record_index, result)` per non-blank line; `record_index`
/// is the 1-based line number. Parse failures are returned per record so
/// the caller can skip and count them.
pub struct AlignmentReader<R: Read> {
    reader: BufReader<R>,
    line: String,
    line_number: usize,
}

impl<R: Read> AlignmentReader<R> {
    pub fn new(reader: R) -> Self {
        AlignmentReader {
            reader: BufReader::new(reader),
            line: String::new(),
            line_number: 0,
        }
    }

    pub fn read_record(&mut self) -> Result<Option<(usize, EvalResult<AlignmentRecord>)>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed = AlignmentRecord::from_json_line(trimmed, self.line_number);
            return Ok(Some((self.line_number, parsed)));
        }
    }
}

impl<R: Read> Iterator for AlignmentReader<R> {
    type Item = Result<(usize, EvalResult<AlignmentRecord>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Open an alignment file and return a record reader over it
pub fn read_alignment_file<P: AsRef<Path>>(
    path: P,
) -> Result<AlignmentReader<Box<dyn BufRead + Send>>> {
    Ok(AlignmentReader::new(open_alignment_input(path)?))
}
