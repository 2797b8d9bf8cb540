use chrono::{DateTime, Utc};

use crate::{
    fill::{self, ClampPolicy},
    req::{BinRow, GraphEntry},
    window::Timestamped,
};

/// One timestamped sensor sample of one bin, with the bin height it was taken against.
#[derive(Debug, Clone, PartialEq)]
pub struct BinReading {
    pub bin_id: String,
    pub timestamp: DateTime<Utc>,
    pub fill_depth_cm: f64,
    pub bin_height_cm: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub gas_ppm: f64,
    pub battery_pct: f64,
}

impl BinReading {
    pub fn fill_level_pct(&self, policy: ClampPolicy) -> i32 {
        fill::normalize(Some(self.fill_depth_cm), Some(self.bin_height_cm), policy)
    }

    /// Chart point. Sensor values are floored to whole units.
    pub fn graph_entry(&self, policy: ClampPolicy) -> GraphEntry {
        GraphEntry {
            time: self.timestamp,
            level: self.fill_level_pct(policy),
            temperature: self.temperature_c.floor() as i32,
            humidity: self.humidity_pct.floor() as i32,
            gas_production: self.gas_ppm.floor() as i32,
            battery_charge: self.battery_pct.floor() as i32,
        }
    }
}

impl Timestamped for BinReading {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// What a bin card shows. Derived from the latest reading on every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct BinSummary {
    pub bin_id: String,
    pub name: String,
    pub location: String,
    pub fill_level_pct: i32,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub gas_ppm: f64,
    pub battery_pct: f64,
    pub last_updated: DateTime<Utc>,
}

impl BinSummary {
    /// The fill level is taken as computed by the server.
    pub fn from_row(row: &BinRow) -> Self {
        Self {
            bin_id: row.bin.clone(),
            name: row.binname.clone(),
            location: row.address.clone(),
            fill_level_pct: row.fillpct,
            temperature_c: row.temperature,
            humidity_pct: row.humidity,
            gas_ppm: row.gasppm,
            battery_pct: row.battery,
            last_updated: row.updatetime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(fill: f64) -> BinReading {
        BinReading {
            bin_id: "bin-1".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2024, 4, 2, 7, 30, 0).unwrap(),
            fill_depth_cm: fill,
            bin_height_cm: 200.0,
            temperature_c: 21.7,
            humidity_pct: 44.2,
            gas_ppm: 13.9,
            battery_pct: 87.5,
        }
    }

    #[test]
    fn graph_entry_floors_sensors() {
        let entry = reading(100.0).graph_entry(ClampPolicy::Clamp);
        assert_eq!(entry.level, 50);
        assert_eq!(entry.temperature, 21);
        assert_eq!(entry.humidity, 44);
        assert_eq!(entry.gas_production, 13);
        assert_eq!(entry.battery_charge, 87);
    }

    #[test]
    fn summary_from_row() {
        let row = BinRow {
            bin: "bin-1".to_owned(),
            binname: "Cafeteria".to_owned(),
            address: "Employee Cafeteria".to_owned(),
            fillcm: 0.0,
            binheight: 200.0,
            fillpct: 0,
            temperature: 24.0,
            humidity: 40.0,
            gasppm: 10.0,
            battery: 90.0,
            updatetime: Utc.with_ymd_and_hms(2024, 4, 2, 7, 30, 0).unwrap(),
        };
        let summary = BinSummary::from_row(&row);
        assert_eq!(summary.fill_level_pct, 0);
        assert_eq!(summary.location, "Employee Cafeteria");
    }
}
