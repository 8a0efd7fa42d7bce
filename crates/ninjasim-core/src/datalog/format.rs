//! CSV export

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::LogEntry;

/// Column headers after the leading `Time` column
pub const CSV_CHANNELS: [&str; 12] = [
    "RPM",
    "Throttle",
    "Speed",
    "Power",
    "Torque",
    "EngineTemp",
    "AFR",
    "AFRTarget",
    "FuelMs",
    "Ignition",
    "Gear",
    "Clutch",
];

/// Write log entries to a CSV file
pub fn write_csv<'a, P, I>(path: P, entries: I) -> io::Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a LogEntry>,
{
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    write!(writer, "Time")?;
    for channel in CSV_CHANNELS {
        write!(writer, ",{}", channel)?;
    }
    writeln!(writer)?;

    for entry in entries {
        let t = &entry.telemetry;
        write!(writer, "{:.3}", entry.timestamp.as_secs_f64())?;
        for value in [
            t.rpm,
            t.throttle_position,
            t.speed,
            t.power,
            t.torque,
            t.engine_temp,
            t.afr_current,
            t.afr_target,
            t.fuel_injection_ms,
            t.ignition_advance_deg,
        ] {
            write!(writer, ",{:.4}", value)?;
        }
        writeln!(writer, ",{},{:.4}", t.gear, t.clutch_position)?;
    }

    writer.flush()?;
    Ok(())
}
