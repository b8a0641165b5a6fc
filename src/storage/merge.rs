//! Segment merge
//!
//! One linear pass over two sorted segments. On equal keys the newer
//! segment's record wins and both cursors advance; otherwise the smaller key
//! is written and only its cursor advances.

use std::cmp::Ordering;
use std::path::Path;

use crate::error::Result;

use super::segment::{SegmentBuilder, SegmentIterator, SegmentLine, SegmentMeta, SegmentReader};

/// Read position in one input, with its own exhausted flag
struct Cursor {
    lines: SegmentIterator,
    head: Option<SegmentLine>,
    exhausted: bool,
}

impl Cursor {
    fn open(reader: &SegmentReader) -> Result<Self> {
        let mut cursor = Self {
            lines: reader.iter()?,
            head: None,
            exhausted: false,
        };
        cursor.advance()?;
        Ok(cursor)
    }

    fn advance(&mut self) -> Result<()> {
        match self.lines.next() {
            Some(line) => self.head = Some(line?),
            None => {
                self.head = None;
                self.exhausted = true;
            }
        }
        Ok(())
    }

    fn key(&self) -> &[u8] {
        self.head.as_ref().map(|l| l.key.as_slice()).unwrap_or_default()
    }
}

/// Merge `older` and `newer` into a new segment at `output`, named `name`
pub fn merge_segments(
    older: &SegmentReader,
    newer: &SegmentReader,
    output: &Path,
    name: &str,
) -> Result<SegmentMeta> {
    let mut a = Cursor::open(older)?;
    let mut b = Cursor::open(newer)?;
    let mut builder = SegmentBuilder::new(output, name)?;

    loop {
        match (a.exhausted, b.exhausted) {
            (true, true) => break,
            (false, true) => {
                write_head(&mut builder, &a)?;
                a.advance()?;
            }
            (true, false) => {
                write_head(&mut builder, &b)?;
                b.advance()?;
            }
            (false, false) => match a.key().cmp(b.key()) {
                Ordering::Equal => {
                    write_head(&mut builder, &b)?;
                    a.advance()?;
                    b.advance()?;
                }
                Ordering::Less => {
                    write_head(&mut builder, &a)?;
                    a.advance()?;
                }
                Ordering::Greater => {
                    write_head(&mut builder, &b)?;
                    b.advance()?;
                }
            },
        }
    }

    builder.finish()
}

fn write_head(builder: &mut SegmentBuilder, cursor: &Cursor) -> Result<()> {
    if let Some(line) = &cursor.head {
        builder.add_line(&line.key, &line.line)?;
    }
    Ok(())
}
