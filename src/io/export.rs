//! CSV export of per-terminal trace results and JSON export of equipment trees.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::network::model::{Network, TerminalId};
use crate::network::phase::{PhaseCode, SinglePhaseKind};
use crate::network::state::{CURRENT, NORMAL, StateOperators};
use crate::trace::tree::TreeSnapshot;

/// Column header for the terminal directions CSV.
pub const HEADER: &str = "terminal,equipment,sequence,phases,normal_direction,\
                          current_direction,normal_phases,current_phases";

/// Exports one row per equipment terminal to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_directions_csv(network: &Network, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_directions_csv(network, buf)
}

/// Writes terminal directions and traced phases as CSV to any writer.
///
/// Rows follow terminal creation order, so identical networks produce
/// identical output. Detached terminals are skipped.
///
/// # Arguments
///
/// * `network` - Network whose terminals have been traced
/// * `writer` - Destination implementing `Write`
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_directions_csv(network: &Network, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for id in network.terminal_ids() {
        let terminal = network.terminal(id);
        let Some(equipment) = terminal.equipment() else {
            continue;
        };
        wtr.write_record(&[
            terminal.mrid().to_string(),
            network.equipment(equipment).mrid().to_string(),
            terminal.sequence_number().to_string(),
            terminal.phases().to_string(),
            NORMAL.feeder_direction(terminal).get().to_string(),
            CURRENT.feeder_direction(terminal).get().to_string(),
            traced_phases(network, id, NORMAL),
            traced_phases(network, id, CURRENT),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Traced phase per nominal phase, e.g. `A=A;B=B;C=-`.
fn traced_phases(network: &Network, id: TerminalId, state: &dyn StateOperators) -> String {
    let terminal = network.terminal(id);
    let status = state.phase_status(terminal);
    if status.traced() == PhaseCode::NONE {
        return String::new();
    }
    terminal
        .phases()
        .iter()
        .map(|phase| {
            let traced = status.get(phase);
            if traced == SinglePhaseKind::None {
                format!("{phase}=-")
            } else {
                format!("{phase}={traced}")
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Writes a tree snapshot as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `io::Error` if serialization or writing fails.
pub fn write_tree_json(tree: &TreeSnapshot, mut writer: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, tree)?;
    writeln!(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::trace::set_direction::assign_feeder_directions;
    use crate::trace::set_phases::energize_sources;

    fn traced_linear() -> Network {
        let network = NetworkConfig::linear().build_network().expect("build");
        assign_feeder_directions(&network, NORMAL);
        assign_feeder_directions(&network, CURRENT);
        energize_sources(&network, NORMAL);
        energize_sources(&network, CURRENT);
        network
    }

    #[test]
    fn header_matches_columns() {
        let network = traced_linear();
        let mut buf = Vec::new();
        write_directions_csv(&network, &mut buf).expect("csv");
        let output = String::from_utf8(buf).expect("utf8");
        assert_eq!(
            output.lines().next(),
            Some(
                "terminal,equipment,sequence,phases,normal_direction,\
                 current_direction,normal_phases,current_phases"
            )
        );
    }

    #[test]
    fn one_row_per_terminal() {
        let network = traced_linear();
        let mut buf = Vec::new();
        write_directions_csv(&network, &mut buf).expect("csv");

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let records: Vec<csv::StringRecord> = rdr.records().collect::<Result<_, _>>().expect("rows");
        assert_eq!(records.len(), network.terminal_count());

        let l1t1 = records.iter().find(|r| &r[0] == "l1-t1").expect("l1-t1 row");
        assert_eq!(&l1t1[1], "l1");
        assert_eq!(&l1t1[2], "1");
        assert_eq!(&l1t1[3], "ABC");
        assert_eq!(&l1t1[4], "UPSTREAM");
        assert_eq!(&l1t1[6], "A=A;B=B;C=C");
    }

    #[test]
    fn deterministic_output() {
        let network = traced_linear();
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_directions_csv(&network, &mut buf1).expect("first");
        write_directions_csv(&network, &mut buf2).expect("second");
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn tree_json_shape() {
        let tree = TreeSnapshot {
            mrid: "cb".into(),
            children: vec![TreeSnapshot {
                mrid: "l1".into(),
                children: Vec::new(),
            }],
        };
        let mut buf = Vec::new();
        write_tree_json(&tree, &mut buf).expect("json");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("parse");
        assert_eq!(value["mrid"], "cb");
        assert_eq!(value["children"][0]["mrid"], "l1");
    }
}
