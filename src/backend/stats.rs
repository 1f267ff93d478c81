// stats.rs
//
// This file contains the end-of-run statistics of a simulation.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Default, Clone, Serialize)]
pub struct SimStats {
    pub cycles: u64,
    pub instructions_dispatched: u64,
    pub instructions_committed: u64,
    pub cdb_broadcasts: u64,
    pub dmem_transactions: u64,
    pub dmem_hits: u64,
    pub dmem_misses: u64,
}

impl SimStats {
    pub fn ipc(&self) -> f64 {
        if self.cycles > 0 {
            self.instructions_committed as f64 / self.cycles as f64
        } else {
            0.0
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let serde_json::Value::Object(map) = &mut value {
            let _ = map.insert(
                "ipc".to_string(),
                serde_json::json!((self.ipc() * 1000.0).round() / 1000.0),
            );
        }
        value
    }
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation Statistics:")?;
        writeln!(f, "  Cycles: {}", self.cycles)?;
        writeln!(f, "  Instructions Dispatched: {}", self.instructions_dispatched)?;
        writeln!(f, "  Instructions Committed: {}", self.instructions_committed)?;
        writeln!(f, "  Instructions Per Cycle (IPC): {:.2}", self.ipc())?;
        writeln!(f, "  CDB Broadcasts: {}", self.cdb_broadcasts)?;
        writeln!(
            f,
            "  DMEM Transactions: {} ({} hits, {} misses)",
            self.dmem_transactions, self.dmem_hits, self.dmem_misses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipc() {
        let stats = SimStats {
            cycles: 10,
            instructions_committed: 5,
            ..SimStats::default()
        };
        assert!((stats.ipc() - 0.5).abs() < f64::EPSILON);
        assert_eq!(SimStats::default().ipc(), 0.0);
    }

    #[test]
    fn test_json_includes_ipc() {
        let stats = SimStats {
            cycles: 4,
            instructions_committed: 2,
            ..SimStats::default()
        };
        let json = stats.to_json();
        assert_eq!(json["cycles"], 4);
        assert_eq!(json["ipc"], 0.5);
    }
}
