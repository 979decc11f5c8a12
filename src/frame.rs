//! Result frames and pagination.
//!
//! A [`Frame`] is one page of result rows. Frames arrive from the server with an
//! offset that, depending on the encoding, may be a 64-bit integer, a numeric
//! string or a plain number; [`normalize_frame`] coerces all of these to a `u64`
//! and guarantees `rows` is present.
//!
//! [`ResultPages`] drives the fetch loop for one result set: it yields the first
//! frame carried by the execute response, then fetches at
//! `offset + rows.len()` until a frame reports `done` or the server returns no
//! frame. Fetches are strictly sequential.
use log::debug;
use thiserror::Error;

use crate::{
    auth::TokenSource,
    error::Result,
    protocol::{
        Transport,
        proto::{self, Signature},
    },
    row::{Record, materialize},
    session::{ResultSet, Session},
};

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("invalid frame offset '{0}'")]
    InvalidOffset(String),
    #[error("frame at offset {offset} with {rows} rows runs past the last addressable row")]
    OffsetOverflow { offset: u64, rows: usize },
}

/// Offset as it may appear in a wire frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Offset {
    Long(i64),
    Unsigned(u64),
    Text(String),
    Number(f64),
}

impl Offset {
    /// Coerces to a plain row index.
    pub fn to_u64(&self) -> std::result::Result<u64, FrameError> {
        let invalid = || FrameError::InvalidOffset(self.to_string());
        match self {
            Offset::Unsigned(n) => Ok(*n),
            Offset::Long(n) => u64::try_from(*n).map_err(|_| invalid()),
            Offset::Number(n) => number_to_u64(*n).ok_or_else(invalid),
            Offset::Text(s) => {
                let s = s.trim();
                s.parse::<u64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(number_to_u64))
                    .ok_or_else(invalid)
            }
        }
    }
}

fn number_to_u64(n: f64) -> Option<u64> {
    (n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64).then_some(n as u64)
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Offset::Long(n) => write!(f, "{n}"),
            Offset::Unsigned(n) => write!(f, "{n}"),
            Offset::Text(s) => f.write_str(s),
            Offset::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<u64> for Offset {
    fn from(value: u64) -> Self {
        Offset::Unsigned(value)
    }
}

impl From<i64> for Offset {
    fn from(value: i64) -> Self {
        Offset::Long(value)
    }
}

impl From<f64> for Offset {
    fn from(value: f64) -> Self {
        Offset::Number(value)
    }
}

impl From<&str> for Offset {
    fn from(value: &str) -> Self {
        Offset::Text(value.to_string())
    }
}

/// A frame as received, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub offset: Offset,
    pub done: bool,
    pub rows: Option<Vec<proto::Row>>,
}

impl From<proto::Frame> for RawFrame {
    fn from(value: proto::Frame) -> Self {
        Self {
            offset: Offset::Unsigned(value.offset),
            done: value.done,
            rows: Some(value.rows),
        }
    }
}

/// One normalized page of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Absolute index of the first row in this page.
    pub offset: u64,
    /// No page follows this one.
    pub done: bool,
    pub rows: Vec<proto::Row>,
}

impl Frame {
    /// Offset to request the following page at. Exact for frames that came
    /// through [`normalize_frame`].
    pub fn next_offset(&self) -> u64 {
        self.offset.saturating_add(self.rows.len() as u64)
    }
}

/// Normalizes a received frame. An absent frame stays absent.
pub fn normalize_frame(
    frame: Option<RawFrame>,
) -> std::result::Result<Option<Frame>, FrameError> {
    let Some(frame) = frame else {
        return Ok(None);
    };
    let offset = frame.offset.to_u64()?;
    let rows = frame.rows.unwrap_or_default();
    if offset.checked_add(rows.len() as u64).is_none() {
        return Err(FrameError::OffsetOverflow {
            offset,
            rows: rows.len(),
        });
    }
    Ok(Some(Frame {
        offset,
        done: frame.done,
        rows,
    }))
}

/// Pull-based pager over one result set.
///
/// Borrows the session mutably for its lifetime, so no other operation can
/// interleave with a fetch. Closing the statement stays with the caller.
pub struct ResultPages<'a, T, S> {
    session: &'a mut Session<T, S>,
    statement_id: u32,
    signature: Option<Signature>,
    pending: Option<Frame>,
    next_offset: u64,
    max_rows: u32,
    finished: bool,
}

impl<'a, T: Transport, S: TokenSource> ResultPages<'a, T, S> {
    pub(crate) fn new(session: &'a mut Session<T, S>, result: ResultSet, max_rows: u32) -> Self {
        let finished = result.first_frame.is_none();
        Self {
            session,
            statement_id: result.statement_id,
            signature: result.signature,
            pending: result.first_frame,
            next_offset: 0,
            max_rows,
            finished,
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn statement_id(&self) -> u32 {
        self.statement_id
    }

    /// Returns the next frame, or `None` once the result is exhausted.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(frame) = self.pending.take() {
            self.advance(&frame);
            return Ok(Some(frame));
        }
        if self.finished {
            return Ok(None);
        }

        debug!(
            "fetching statement {} at offset {}",
            self.statement_id, self.next_offset
        );
        match self
            .session
            .fetch(self.statement_id, self.next_offset, self.max_rows)
            .await?
        {
            Some(frame) => {
                self.advance(&frame);
                Ok(Some(frame))
            }
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    /// Returns the next page of materialized rows.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>> {
        Ok(self
            .next_frame()
            .await?
            .map(|frame| materialize(self.signature.as_ref(), &frame.rows)))
    }

    /// Drains every remaining page.
    pub async fn collect(mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await? {
            records.extend(page);
        }
        Ok(records)
    }

    fn advance(&mut self, frame: &Frame) {
        self.next_offset = frame.next_offset();
        self.finished = frame.done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(offset: impl Into<Offset>, rows: Option<usize>) -> RawFrame {
        RawFrame {
            offset: offset.into(),
            done: false,
            rows: rows.map(|n| vec![proto::Row::default(); n]),
        }
    }

    #[test]
    fn absent_frame_passes_through() {
        assert_eq!(normalize_frame(None), Ok(None));
    }

    #[test]
    fn offsets_normalize_to_plain_integers() {
        for offset in [
            Offset::Long(4),
            Offset::Unsigned(4),
            Offset::Text("4".into()),
            Offset::Text(" 4 ".into()),
            Offset::Number(4.0),
        ] {
            let frame = normalize_frame(Some(RawFrame {
                offset,
                done: true,
                rows: None,
            }))
            .unwrap()
            .unwrap();
            assert_eq!(frame.offset, 4);
            assert!(frame.done);
        }
    }

    #[test]
    fn large_offsets_survive() {
        let big = 9_007_199_254_740_993_u64;
        let frame = normalize_frame(Some(raw(big, Some(0)))).unwrap().unwrap();
        assert_eq!(frame.offset, big);

        let frame = normalize_frame(Some(raw(big.to_string().as_str(), Some(0))))
            .unwrap()
            .unwrap();
        assert_eq!(frame.offset, big);
    }

    #[test]
    fn missing_rows_default_to_empty() {
        let frame = normalize_frame(Some(raw(0_u64, None))).unwrap().unwrap();
        assert!(frame.rows.is_empty());
        assert_eq!(frame.next_offset(), 0);
    }

    #[test]
    fn next_offset_adds_row_count() {
        let frame = normalize_frame(Some(raw(2_u64, Some(2)))).unwrap().unwrap();
        assert_eq!(frame.next_offset(), 4);
    }

    #[test]
    fn invalid_offsets_are_rejected() {
        for offset in [
            Offset::Long(-1),
            Offset::Text("abc".into()),
            Offset::Number(1.5),
            Offset::Number(f64::NAN),
        ] {
            assert!(normalize_frame(Some(raw(offset, None))).is_err());
        }
    }

    #[test]
    fn offset_past_last_row_is_rejected() {
        let frame: RawFrame = proto::Frame {
            offset: u64::MAX,
            done: false,
            rows: vec![proto::Row::default()],
        }
        .into();
        assert_eq!(
            normalize_frame(Some(frame)),
            Err(FrameError::OffsetOverflow {
                offset: u64::MAX,
                rows: 1
            })
        );

        let last = normalize_frame(Some(raw(u64::MAX, Some(0)))).unwrap().unwrap();
        assert_eq!(last.next_offset(), u64::MAX);
    }

    #[test]
    fn wire_frames_convert() {
        let frame: RawFrame = proto::Frame {
            offset: 10,
            done: true,
            rows: vec![proto::Row::default()],
        }
        .into();
        let frame = normalize_frame(Some(frame)).unwrap().unwrap();
        assert_eq!((frame.offset, frame.done, frame.rows.len()), (10, true, 1));
    }
}
