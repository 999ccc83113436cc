//! JSON dump of a dashboard session

use crate::drilldown::Session;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
pub struct DashboardReport<'a> {
    pub generated: String,
    pub session: &'a Session,
}

impl<'a> DashboardReport<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { generated: chrono::Local::now().to_rfc3339(), session }
    }
}

pub fn write<W: Write>(writer: &mut W, session: &Session) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &DashboardReport::new(session))?;
    writeln!(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_session_dump() {
        let mut out = Vec::new();
        write(&mut out, &Session::new()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["session"]["stage"]["state"], "no_period");
        assert!(value["generated"].as_str().is_some());
    }
}
