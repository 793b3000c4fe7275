//! Raw block record encoding.
//!
//! A record is the bincode encoding of a [`Block`] with fixed-width integers.
//! Every variable-length field carries its own length prefix, so records are
//! self-delimiting and a stream of concatenated records needs no separators.

use super::Block;
use crate::{Error, Result};
use bincode::Options;
use std::io::{BufRead, BufReader, Read};

/// Upper bound for a single encoded record.
pub const MAX_RECORD_SIZE: u64 = 16 * 1024 * 1024;

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_RECORD_SIZE)
}

impl Block {
    /// Encodes the block into its raw record form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        codec()
            .serialize(self)
            .map_err(|err| Error::Encode(err.to_string()))
    }

    /// Decodes exactly one record; trailing bytes are rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(codec().reject_trailing_bytes().deserialize(bytes)?)
    }
}

/// Reads consecutive block records from a byte stream.
///
/// Iteration ends at a clean end of stream. A truncated or corrupt record
/// yields one error and ends the iteration.
pub struct BlockReader<R> {
    inner: BufReader<R>,
    records: u64,
    failed: bool,
}

impl<R: Read> BlockReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            records: 0,
            failed: false,
        }
    }

    /// Number of records decoded so far.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    fn read_next(&mut self) -> Result<Option<Block>> {
        if self.inner.fill_buf()?.is_empty() {
            return Ok(None);
        }
        let block: Block = codec().deserialize_from(&mut self.inner).map_err(|err| {
            Error::Decode(format!("record {}: {}", self.records, err))
        })?;
        self.records += 1;
        Ok(Some(block))
    }
}

impl<R: Read> Iterator for BlockReader<R> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_next() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockHash, BlockHeader};

    fn block(number: u64, txs: usize) -> Block {
        Block {
            header: BlockHeader {
                parent_hash: BlockHash::ZERO,
                number,
                timestamp: number * 15,
                difficulty: 131_072,
                nonce: number,
                extra_data: vec![number as u8; (number % 5) as usize],
                transactions_root: BlockHash::ZERO,
            },
            transactions: Vec::new(),
        }
        .with_transactions((0..txs).map(|i| vec![i as u8; i + 1]).collect())
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut bytes = block(1, 2).encode().unwrap();
        bytes.push(0);
        assert!(matches!(Block::decode(&bytes), Err(Error::Decode(_))));
    }

    #[test]
    fn reader_splits_concatenated_records() {
        let blocks: Vec<Block> = (0..6).map(|n| block(n, n as usize)).collect();
        let mut stream = Vec::new();
        for block in &blocks {
            stream.extend(block.encode().unwrap());
        }

        let mut reader = BlockReader::new(stream.as_slice());
        let decoded: Vec<Block> = reader.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(decoded, blocks);
        assert_eq!(reader.records_read(), 6);
    }

    #[test]
    fn reader_reports_truncated_record_once() {
        let mut stream = block(0, 1).encode().unwrap();
        let second = block(1, 3).encode().unwrap();
        stream.extend(&second[..second.len() - 2]);

        let mut reader = BlockReader::new(stream.as_slice());
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next(), Some(Err(Error::Decode(_)))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let mut reader = BlockReader::new(&[][..]);
        assert!(reader.next().is_none());
    }
}
