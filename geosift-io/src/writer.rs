//! CSV export for search results and clusters.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geosift_core::{Cluster, PhotoLocation, SearchHit};

use crate::error::Result;

/// Writer for result exports in CSV form.
pub struct CsvWriter {
    writer: BufWriter<File>,
}

impl CsvWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error when the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Writes ordered search hits.
    ///
    /// Columns: path, latitude, longitude, distance_km, timestamp,
    /// accuracy_m. Coordinates use six decimal places so a reparse recovers
    /// them within 1e-6 degrees.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_search_hits(&mut self, hits: &[SearchHit]) -> Result<()> {
        writeln!(
            self.writer,
            "path,latitude,longitude,distance_km,timestamp,accuracy_m"
        )?;
        for hit in hits {
            let record = &hit.record;
            writeln!(
                self.writer,
                "{},{:.6},{:.6},{:.4},{},{}",
                escape(&record.path_str()),
                record.point.latitude,
                record.point.longitude,
                hit.distance_km,
                timestamp_column(record),
                accuracy_column(record),
            )?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes clusters, one row per member record.
    ///
    /// Columns: path, latitude, longitude, cluster, timestamp, accuracy_m.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_clusters(&mut self, clusters: &[Cluster]) -> Result<()> {
        writeln!(
            self.writer,
            "path,latitude,longitude,cluster,timestamp,accuracy_m"
        )?;
        for cluster in clusters {
            let name = cluster.display_name();
            for record in &cluster.members {
                writeln!(
                    self.writer,
                    "{},{:.6},{:.6},{},{},{}",
                    escape(&record.path_str()),
                    record.point.latitude,
                    record.point.longitude,
                    escape(&name),
                    timestamp_column(record),
                    accuracy_column(record),
                )?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

fn timestamp_column(record: &PhotoLocation) -> String {
    record
        .taken
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn accuracy_column(record: &PhotoLocation) -> String {
    record
        .accuracy_m
        .map(|a| format!("{a:.1}"))
        .unwrap_or_default()
}

/// Quotes a field when it contains a delimiter, quote, or newline.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use geosift_core::GeoPoint;
    use tempfile::NamedTempFile;

    fn hit(path: &str, lat: f64, lon: f64, distance_km: f64) -> SearchHit {
        SearchHit {
            record: PhotoLocation::new(path, GeoPoint::new(lat, lon).unwrap()),
            distance_km,
        }
    }

    #[test]
    fn test_search_csv_round_trips_coordinates() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = CsvWriter::create(file.path()).unwrap();

        let hits = vec![
            hit("/p/a.jpg", 40.712823, -74.006012, 0.0),
            hit("/p/b.jpg", 40.713891, -74.007034, 0.152),
        ];
        writer.write_search_hits(&hits).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "path,latitude,longitude,distance_km,timestamp,accuracy_m"
        );

        for (line, expected) in lines.zip(&hits) {
            let cols: Vec<&str> = line.split(',').collect();
            assert_eq!(cols[0], expected.record.path_str());
            let lat: f64 = cols[1].parse().unwrap();
            let lon: f64 = cols[2].parse().unwrap();
            assert!((lat - expected.record.point.latitude).abs() < 1e-6);
            assert!((lon - expected.record.point.longitude).abs() < 1e-6);
        }
    }

    #[test]
    fn test_cluster_csv_contains_names_and_members() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = CsvWriter::create(file.path()).unwrap();

        let point = GeoPoint::new(40.7128, -74.0060).unwrap();
        let record = PhotoLocation::new("/p/a.jpg", point).with_taken(
            NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(12, 30, 0)
                .unwrap(),
        );
        let mut cluster = Cluster::seeded(0, record);
        cluster.name = Some("Manhattan".to_string());

        writer.write_clusters(&[cluster]).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("Manhattan"));
        assert!(content.contains("/p/a.jpg"));
        assert!(content.contains("2024-06-01 12:30:00"));
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = CsvWriter::create(file.path()).unwrap();

        let hits = vec![hit("/p/odd, name.jpg", 1.0, 2.0, 0.5)];
        writer.write_search_hits(&hits).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("\"/p/odd, name.jpg\""));
    }

    #[test]
    fn test_missing_optionals_leave_columns_empty() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = CsvWriter::create(file.path()).unwrap();

        writer
            .write_search_hits(&[hit("/p/a.jpg", 1.0, 2.0, 0.0)])
            .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let data_line = content.lines().nth(1).unwrap();
        assert!(data_line.ends_with(",,"));
    }
}
