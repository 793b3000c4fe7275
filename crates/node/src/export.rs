//! Block segment export.
//!
//! Stored records are copied byte for byte, in ascending block order and
//! without separators. The output can be read back with
//! [`BlockReader`](ethapp_ledger::BlockReader).

use crate::error::NodeError;
use crate::registry::ServiceRegistry;
use crate::services::{ChainService, DbService, CHAIN, DB};
use std::io;
use std::ops::RangeInclusive;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Blocks between two progress messages.
pub const PROGRESS_INTERVAL: u64 = 50_000;

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("--from must not be negative (got {0})")]
    NegativeFrom(i64),

    #[error("--to ({to}) must not be lower than --from ({from})")]
    ToBeforeFrom { from: i64, to: i64 },

    #[error("block {to} is not known yet; the current head is {head}")]
    UnknownTo { to: i64, head: u64 },

    #[error("no stored record for block {number}")]
    MissingRecord { number: u64 },

    #[error("required service '{0}' is not registered")]
    MissingService(&'static str),

    #[error("failed to write export: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Ledger(#[from] ethapp_ledger::Error),

    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Validated, inclusive range of block numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRange {
    from: u64,
    to: u64,
}

impl ExportRange {
    /// Checks the requested bounds against the chain head. `from` defaults to
    /// 0 and `to` to the head.
    pub fn resolve(from: Option<i64>, to: Option<i64>, head: u64) -> Result<Self, ExportError> {
        let from = from.unwrap_or(0);
        if from < 0 {
            return Err(ExportError::NegativeFrom(from));
        }
        let to = to.unwrap_or_else(|| i64::try_from(head).unwrap_or(i64::MAX));
        if to < from {
            return Err(ExportError::ToBeforeFrom { from, to });
        }
        if to as u64 > head {
            return Err(ExportError::UnknownTo { to, head });
        }
        Ok(Self {
            from: from as u64,
            to: to as u64,
        })
    }

    pub fn from(&self) -> u64 {
        self.from
    }

    pub fn to(&self) -> u64 {
        self.to
    }

    /// Number of blocks in the range.
    pub fn len(&self) -> u64 {
        self.to - self.from + 1
    }

    /// A resolved range holds at least one block.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn numbers(&self) -> RangeInclusive<u64> {
        self.from..=self.to
    }
}

/// Progress message due at `number`, as the announced sub-range.
pub fn progress_marker(range: &ExportRange, interval: u64, number: u64) -> Option<(u64, u64)> {
    let interval = interval.max(1);
    ((number - range.from) % interval == 0)
        .then(|| (number, number.saturating_add(interval).min(range.to)))
}

/// Totals of a finished export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub blocks: u64,
    pub bytes: u64,
}

/// Streams raw block records out of storage.
pub struct BlockSegmentExporter {
    chain: Arc<ChainService>,
    db: Arc<DbService>,
    progress_interval: u64,
}

impl BlockSegmentExporter {
    /// Fails unless both the `db` and `chain` services are registered.
    pub fn new(registry: &ServiceRegistry) -> Result<Self, ExportError> {
        for required in [DB, CHAIN] {
            if !registry.contains(required) {
                return Err(ExportError::MissingService(required));
            }
        }
        let db = registry.get::<DbService>(DB).map_err(NodeError::from)?;
        let chain = registry
            .get::<ChainService>(CHAIN)
            .map_err(NodeError::from)?;
        Ok(Self {
            chain,
            db,
            progress_interval: PROGRESS_INTERVAL,
        })
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn head_number(&self) -> u64 {
        self.chain.chain().head_number()
    }

    /// Validates the requested bounds against the current head.
    pub fn resolve_range(
        &self,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<ExportRange, ExportError> {
        ExportRange::resolve(from, to, self.head_number())
    }

    /// Writes the records of `range` to `out`.
    pub async fn export<W>(
        &self,
        range: ExportRange,
        out: &mut W,
    ) -> Result<ExportSummary, ExportError>
    where
        W: AsyncWrite + Unpin,
    {
        let index = self.chain.chain().index();
        let mut summary = ExportSummary::default();

        for number in range.numbers() {
            if let Some((from, to)) = progress_marker(&range, self.progress_interval, number) {
                info!(target: "export", from, to, "exporting blocks");
            }

            let hash = index
                .hash_by_number(number)?
                .ok_or(ExportError::MissingRecord { number })?;
            let record = self
                .db
                .get_record(hash.as_bytes())?
                .ok_or(ExportError::MissingRecord { number })?;
            debug!(target: "export", number, %hash, bytes = record.len(), "exporting block");

            out.write_all(&record).await?;
            summary.blocks += 1;
            summary.bytes += record.len() as u64;
        }
        out.flush().await?;

        info!(
            target: "export",
            from = range.from(),
            to = range.to(),
            blocks = summary.blocks,
            bytes = summary.bytes,
            "export finished"
        );
        Ok(summary)
    }
}
