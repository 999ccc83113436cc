//! CSV export of the visible ranking table

use crate::drilldown::Session;
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, session: &Session) -> io::Result<()> {
    writeln!(writer, "risk_rank,asin,pct_neg,n_reviews,n_neg")?;

    if let Some(view) = session.view() {
        for r in &view.visible {
            writeln!(
                writer,
                "{},{},{:.4},{},{}",
                r.risk_rank,
                csv_escape(&r.asin),
                r.pct_neg,
                r.n_reviews,
                r.n_neg
            )?;
        }
    }

    Ok(())
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
