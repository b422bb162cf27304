//! Batch replay of charge/use operations from CSV.
//!
//! Rows are applied in file order through a [`PointService`]. Rejected and
//! malformed rows are logged at warn level and skipped; they never abort the
//! run.

use crate::clock::TimeSource;
use crate::error::Result;
use crate::service::PointService;
use crate::store::LedgerStore;
use csv::{ReaderBuilder, Trim};
use log::warn;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::{Read, Write};

/// Raw operation row as read from CSV: `op,user,amount`.
#[derive(Debug, Deserialize)]
pub struct OperationRecord {
    /// Operation name: `charge` or `use`
    pub op: String,

    /// Target user id
    pub user: u64,

    /// Integer amount, kept as text so bad values are reported per row
    pub amount: Option<String>,
}

impl OperationRecord {
    /// Parses the raw row into a typed operation.
    ///
    /// Returns `None` for unknown operations and missing or non-integer
    /// amounts. Negative amounts parse; the service rejects them.
    pub fn parse(&self) -> Option<Operation> {
        let amount = self.amount.as_deref()?.trim().parse::<i64>().ok()?;

        let kind = match self.op.trim().to_lowercase().as_str() {
            "charge" => OperationKind::Charge,
            "use" => OperationKind::Use,
            _ => return None,
        };

        Some(Operation {
            user_id: self.user,
            kind,
            amount,
        })
    }
}

/// A parsed operation ready to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub user_id: u64,
    pub kind: OperationKind,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Charge,
    Use,
}

/// Counts from one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Operations that changed state.
    pub applied: usize,

    /// Well-formed operations the ledger refused.
    pub rejected: usize,

    /// Rows that could not be read or parsed.
    pub malformed: usize,
}

/// Drives a [`PointService`] from CSV input and reports final state.
pub struct LedgerReplay<S, C> {
    service: PointService<S, C>,
    users: BTreeSet<u64>,
}

impl<S: LedgerStore, C: TimeSource> LedgerReplay<S, C> {
    pub fn new(service: PointService<S, C>) -> Self {
        LedgerReplay {
            service,
            users: BTreeSet::new(),
        }
    }

    /// Applies every row of `reader` in order.
    pub fn process_csv<R: Read>(&mut self, reader: R) -> Result<ReplaySummary> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);
        let mut summary = ReplaySummary::default();

        for (row_idx, result) in csv_reader.deserialize::<OperationRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, after the header row

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                    summary.malformed += 1;
                    continue;
                }
            };

            let Some(op) = record.parse() else {
                warn!("Row {}: Failed to parse operation record", row_num);
                summary.malformed += 1;
                continue;
            };

            match self.apply(op) {
                Ok(()) => summary.applied += 1,
                Err(e) if e.is_rejection() => {
                    warn!("Row {}: {}", row_num, e);
                    summary.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }

    /// Applies a single operation.
    pub fn apply(&mut self, op: Operation) -> Result<()> {
        self.users.insert(op.user_id);
        match op.kind {
            OperationKind::Charge => self.service.charge(op.user_id, op.amount)?,
            OperationKind::Use => self.service.use_points(op.user_id, op.amount)?,
        };
        Ok(())
    }

    /// Writes `id,point` for every user seen, ascending by id.
    pub fn write_balances<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(["id", "point"])?;

        for &user_id in &self.users {
            csv_writer.serialize(self.service.user_point(user_id))?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes every user's history, users ascending, entries most recent first.
    pub fn write_histories<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(["userId", "amount", "type", "updateMillis"])?;

        for &user_id in &self.users {
            for entry in self.service.histories(user_id) {
                csv_writer.serialize(&entry)?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn service(&self) -> &PointService<S, C> {
        &self.service
    }
}
