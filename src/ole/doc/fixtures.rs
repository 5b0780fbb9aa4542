//! Synthetic `.doc` containers for tests.

use super::package::WORD_DOCUMENT_STREAM;
use super::parts::fib::fib_bytes;
use crate::ole::consts::{SUMMARY_INFORMATION, VT_I2, VT_LPSTR};
use crate::ole::metadata::{build_property_stream, lpstr};
use crate::ole::CompoundFileBuilder;

/// Offset of the text body inside the generated WordDocument stream
pub(crate) const BODY_OFFSET: usize = 0x800;

pub(crate) struct DocFixture {
    flags: u16,
    ccp_text: u32,
    body: Vec<u8>,
    clx: Option<Vec<u8>>,
    summary: Vec<(u32, u16, Vec<u8>)>,
    streams: Vec<(String, Vec<u8>)>,
}

impl DocFixture {
    /// Non-complex document whose text bytes sit at `fcMin = 0x800`.
    pub(crate) fn simple(text: &[u8]) -> Self {
        Self {
            flags: 0,
            ccp_text: text.len() as u32,
            body: text.to_vec(),
            clx: None,
            summary: Vec::new(),
            streams: Vec::new(),
        }
    }

    /// Complex document: `body` at 0x800, `clx` alone in `1Table`.
    pub(crate) fn complex(body: &[u8], clx: Vec<u8>, ccp_text: u32) -> Self {
        Self {
            flags: 0x0204,
            ccp_text,
            body: body.to_vec(),
            clx: Some(clx),
            summary: Vec::new(),
            streams: Vec::new(),
        }
    }

    pub(crate) fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub(crate) fn with_ccp_text(mut self, ccp_text: u32) -> Self {
        self.ccp_text = ccp_text;
        self
    }

    /// Declare a codepage in SummaryInformation.
    pub(crate) fn with_codepage(mut self, codepage: u16) -> Self {
        self.summary.push((1, VT_I2, codepage.to_le_bytes().to_vec()));
        self
    }

    pub(crate) fn with_author(mut self, author: &[u8]) -> Self {
        self.summary.push((4, VT_LPSTR, lpstr(author)));
        self
    }

    pub(crate) fn with_stream(mut self, name: &str, data: &[u8]) -> Self {
        self.streams.push((name.to_string(), data.to_vec()));
        self
    }

    pub(crate) fn word_document(&self) -> Vec<u8> {
        let mut word = fib_bytes(BODY_OFFSET + self.body.len(), self.flags, BODY_OFFSET as u32, self.ccp_text);
        word[BODY_OFFSET..BODY_OFFSET + self.body.len()].copy_from_slice(&self.body);
        if let Some(clx) = &self.clx {
            word[0x1A2..0x1A6].copy_from_slice(&0u32.to_le_bytes());
            word[0x1A6..0x1AA].copy_from_slice(&(clx.len() as u32).to_le_bytes());
        }
        word
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut builder = CompoundFileBuilder::new();
        builder.create_stream(WORD_DOCUMENT_STREAM, &self.word_document()).unwrap();
        if let Some(clx) = &self.clx {
            builder.create_stream("1Table", clx).unwrap();
        }
        if !self.summary.is_empty() {
            builder
                .create_stream(SUMMARY_INFORMATION, &build_property_stream(&self.summary))
                .unwrap();
        }
        for (name, data) in &self.streams {
            builder.create_stream(name, data).unwrap();
        }
        builder.build().unwrap()
    }
}
