use crate::schema::*;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use common::{
    error::ValidationError,
    fill::ClampPolicy,
    reading::BinReading,
    req::{BinInfo, BinRow, HistoricalReading, SensorReading, StoredReading},
};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Integer, Text};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name=bins)]
pub struct NewBin {
    pub bin_id: String,
    pub name: String,
    pub address: String,
    pub bin_height: f64, // cm
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name=bins)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Bin {
    pub bin_id: String,
    pub name: String,
    pub address: String,
    pub bin_height: f64,
}

impl From<Bin> for BinInfo {
    fn from(bin: Bin) -> Self {
        Self {
            bin_id: bin.bin_id,
            name: bin.name,
            address: bin.address,
            bin_height: bin.bin_height,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name=sensor_data)]
pub struct NewSensorData {
    pub bin_id: String,
    pub fill_cm: f64,     // cm
    pub temperature: f64, // °C
    pub humidity: f64,    // percent
    pub gas_ppm: f64,     // ppm
    pub battery: f64,     // percent
    pub update_time: i64, // ms since epoch
}

impl NewSensorData {
    pub fn from_upload(reading: &SensorReading, received: DateTime<Utc>) -> Self {
        Self {
            bin_id: reading.bin_id.clone(),
            fill_cm: reading.fill_level,
            temperature: reading.temperature,
            humidity: reading.humidity,
            gas_ppm: reading.gas_production,
            battery: reading.battery_charge,
            update_time: received.timestamp_millis(),
        }
    }

    pub fn from_history(bin_id: &str, reading: &HistoricalReading) -> Self {
        Self {
            bin_id: bin_id.to_owned(),
            fill_cm: reading.fill_level,
            temperature: reading.temperature,
            humidity: reading.humidity,
            gas_ppm: reading.gas_production,
            battery: reading.battery_charge,
            update_time: reading.time.timestamp_millis(),
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name=sensor_data)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SensorRow {
    pub id: i32,
    pub bin_id: String,
    pub fill_cm: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub gas_ppm: f64,
    pub battery: f64,
    pub update_time: i64,
}

impl SensorRow {
    /// Typed reading, or the reason the stored row does not make sense.
    pub fn into_reading(self, bin_height: f64) -> Result<BinReading, ValidationError> {
        if !(bin_height.is_finite() && bin_height > 0.0) {
            return Err(ValidationError::NotPositive {
                field: "bin_height",
                value: bin_height,
            });
        }
        let timestamp = DateTime::from_timestamp_millis(self.update_time)
            .ok_or(ValidationError::Timestamp(self.update_time))?;

        Ok(BinReading {
            bin_id: self.bin_id,
            timestamp,
            fill_depth_cm: self.fill_cm,
            bin_height_cm: bin_height,
            temperature_c: self.temperature,
            humidity_pct: self.humidity,
            gas_ppm: self.gas_ppm,
            battery_pct: self.battery,
        })
    }

    fn stored(&self) -> Result<StoredReading, ValidationError> {
        Ok(StoredReading {
            id: self.id,
            bin_id: self.bin_id.clone(),
            time: DateTime::from_timestamp_millis(self.update_time)
                .ok_or(ValidationError::Timestamp(self.update_time))?,
        })
    }
}

// latest reading per bin, ties on update_time go to the later insert
const LATEST_READINGS: &str = "
    SELECT b.bin_id, b.name, b.address, b.bin_height,
           s.id, s.fill_cm, s.temperature, s.humidity, s.gas_ppm, s.battery, s.update_time
    FROM bins b
    INNER JOIN sensor_data s ON s.id = (
        SELECT id FROM sensor_data
        WHERE bin_id = b.bin_id
        ORDER BY update_time DESC, id DESC
        LIMIT 1
    )";

#[derive(Debug, QueryableByName)]
struct LatestRow {
    #[diesel(sql_type = Text)]
    bin_id: String,
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Text)]
    address: String,
    #[diesel(sql_type = Double)]
    bin_height: f64,
    #[diesel(sql_type = Integer)]
    id: i32,
    #[diesel(sql_type = Double)]
    fill_cm: f64,
    #[diesel(sql_type = Double)]
    temperature: f64,
    #[diesel(sql_type = Double)]
    humidity: f64,
    #[diesel(sql_type = Double)]
    gas_ppm: f64,
    #[diesel(sql_type = Double)]
    battery: f64,
    #[diesel(sql_type = BigInt)]
    update_time: i64,
}

impl LatestRow {
    fn into_bin_row(self, policy: ClampPolicy) -> Result<BinRow, ValidationError> {
        let (name, address) = (self.name, self.address);
        let reading = SensorRow {
            id: self.id,
            bin_id: self.bin_id,
            fill_cm: self.fill_cm,
            temperature: self.temperature,
            humidity: self.humidity,
            gas_ppm: self.gas_ppm,
            battery: self.battery,
            update_time: self.update_time,
        }
        .into_reading(self.bin_height)?;
        let fillpct = reading.fill_level_pct(policy);

        Ok(BinRow {
            bin: reading.bin_id,
            binname: name,
            address,
            fillcm: reading.fill_depth_cm,
            binheight: reading.bin_height_cm,
            fillpct,
            temperature: reading.temperature_c,
            humidity: reading.humidity_pct,
            gasppm: reading.gas_ppm,
            battery: reading.battery_pct,
            updatetime: reading.timestamp,
        })
    }
}

pub struct Db {
    conn: SqliteConnection,
}

impl Db {
    /// Opens the database and brings the schema up to date.
    pub fn connect(database_url: &str) -> Result<Self> {
        let mut conn = SqliteConnection::establish(database_url)
            .with_context(|| format!("cannot open database {database_url}"))?;
        conn.batch_execute(
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;",
        )?;
        let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| anyhow!(e))?;
        if !applied.is_empty() {
            info!("applied {} migration(s) to {database_url}", applied.len());
        }

        Ok(Self { conn })
    }

    pub fn upsert_bin(&mut self, bin: &NewBin) -> Result<()> {
        debug!("upsert bin {}", bin.bin_id);
        diesel::insert_into(bins::table)
            .values(bin)
            .on_conflict(bins::bin_id)
            .do_update()
            .set(bin)
            .execute(&mut self.conn)?;
        Ok(())
    }

    pub fn bin(&mut self, id: &str) -> Result<Option<Bin>> {
        Ok(bins::table
            .find(id)
            .select(Bin::as_select())
            .first(&mut self.conn)
            .optional()?)
    }

    pub fn bins(&mut self) -> Result<Vec<Bin>> {
        Ok(bins::table
            .order(bins::name.asc())
            .select(Bin::as_select())
            .load(&mut self.conn)?)
    }

    pub fn insert_reading(&mut self, reading: &NewSensorData) -> Result<StoredReading> {
        let row = diesel::insert_into(sensor_data::table)
            .values(reading)
            .returning(SensorRow::as_returning())
            .get_result(&mut self.conn)?;
        Ok(row.stored()?)
    }

    /// All or nothing.
    pub fn insert_readings(&mut self, readings: &[NewSensorData]) -> Result<usize> {
        let inserted = self.conn.transaction(|conn| {
            diesel::insert_into(sensor_data::table)
                .values(readings)
                .execute(conn)
        })?;
        Ok(inserted)
    }

    /// One row per bin that has at least one reading.
    pub fn latest_readings(&mut self, policy: ClampPolicy) -> Result<Vec<BinRow>> {
        let rows = diesel::sql_query(LATEST_READINGS).load::<LatestRow>(&mut self.conn)?;
        rows.into_iter()
            .map(|row| {
                let id = row.id;
                row.into_bin_row(policy)
                    .with_context(|| format!("stored reading {id} is invalid"))
            })
            .collect()
    }

    /// Full series of a bin, oldest first.
    pub fn history(&mut self, id: &str) -> Result<Vec<BinReading>> {
        let rows: Vec<(SensorRow, f64)> = sensor_data::table
            .inner_join(bins::table)
            .filter(sensor_data::bin_id.eq(id))
            .order((sensor_data::update_time.asc(), sensor_data::id.asc()))
            .select((SensorRow::as_select(), bins::bin_height))
            .load(&mut self.conn)?;

        rows.into_iter()
            .map(|(row, bin_height)| {
                let row_id = row.id;
                row.into_reading(bin_height)
                    .with_context(|| format!("stored reading {row_id} is invalid"))
            })
            .collect()
    }
}
