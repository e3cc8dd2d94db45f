//! OWD record export as a comma-separated table.

use std::io::{self, Write};

use super::class::SliceType;
use crate::sim::SimTime;

pub const OWD_CSV_HEADER: &str = "PacketArrivalTime(s),OWD(ms),SliceId,SliceType";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwdRow {
    pub arrival: SimTime,
    pub owd: SimTime,
    pub slice_id: u32,
    pub class: SliceType,
}

/// Stable sort by arrival time; rows with equal arrival keep their input order.
pub fn sort_rows(rows: &mut [OwdRow]) {
    rows.sort_by_key(|r| r.arrival);
}

/// Writes the header and one line per row, in the given order.
pub fn write_owd_csv<W: Write>(mut w: W, rows: &[OwdRow]) -> io::Result<()> {
    writeln!(w, "{OWD_CSV_HEADER}")?;
    for r in rows {
        writeln!(
            w,
            "{},{},{},{}",
            r.arrival.as_secs_f64(),
            r.owd.as_millis_f64(),
            r.slice_id,
            r.class.name()
        )?;
    }
    w.flush()
}
