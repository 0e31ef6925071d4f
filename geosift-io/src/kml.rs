//! KML export for search results and clusters.
//!
//! One placemark per record with point geometry; clustering output groups
//! placemarks into one folder per cluster.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geosift_core::{Cluster, GeoPoint, PhotoLocation, SearchHit};

use crate::error::Result;

/// LookAt range for the search center placemark, in meters.
const CENTER_VIEW_RANGE_M: u32 = 200;
/// LookAt range for individual photo placemarks, in meters.
const POINT_VIEW_RANGE_M: u32 = 50;

/// Writer for KML exports.
pub struct KmlWriter {
    writer: BufWriter<File>,
}

impl KmlWriter {
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

    /// Writes a search result document, optionally marking the center.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_search_hits(
        &mut self,
        hits: &[SearchHit],
        center: Option<GeoPoint>,
    ) -> Result<()> {
        let body = build_search_document(hits, center);
        self.writer.write_all(body.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes a cluster document with one folder per cluster.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_clusters(&mut self, clusters: &[Cluster]) -> Result<()> {
        let body = build_cluster_document(clusters);
        self.writer.write_all(body.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Builds the KML document for a search result set.
#[must_use]
pub fn build_search_document(hits: &[SearchHit], center: Option<GeoPoint>) -> String {
    let mut kml = document_header("Search Results");
    let _ = writeln!(kml, "    <Folder>");
    let _ = writeln!(kml, "      <name>Images</name>");
    let _ = writeln!(
        kml,
        "      <description>Found {} GPS-tagged images</description>",
        hits.len()
    );

    if let Some(center) = center {
        push_placemark(
            &mut kml,
            "Center Point",
            &format!("Center at {center}"),
            center,
            CENTER_VIEW_RANGE_M,
        );
    }

    for hit in hits {
        let description = format!("{:.3} km from center", hit.distance_km);
        push_record_placemark(&mut kml, &hit.record, &description);
    }

    let _ = writeln!(kml, "    </Folder>");
    kml + document_footer()
}

/// Builds the KML document for a cluster partition.
#[must_use]
pub fn build_cluster_document(clusters: &[Cluster]) -> String {
    let mut kml = document_header("Location Clusters");

    for cluster in clusters {
        let _ = writeln!(kml, "    <Folder>");
        let _ = writeln!(kml, "      <name>{}</name>", escape_xml(&cluster.display_name()));
        let _ = writeln!(
            kml,
            "      <description>{} images near {}</description>",
            cluster.len(),
            cluster.centroid
        );
        for record in &cluster.members {
            let description = match record.taken {
                Some(taken) => format!("Taken {}", taken.format("%Y-%m-%d %H:%M:%S")),
                None => String::new(),
            };
            push_record_placemark(&mut kml, record, &description);
        }
        let _ = writeln!(kml, "    </Folder>");
    }

    kml + document_footer()
}

fn document_header(name: &str) -> String {
    let mut kml = String::new();
    let _ = writeln!(kml, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(kml, r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#);
    let _ = writeln!(kml, "  <Document>");
    let _ = writeln!(kml, "    <name>{}</name>", escape_xml(name));
    kml
}

fn document_footer() -> &'static str {
    "  </Document>\n</kml>\n"
}

fn push_record_placemark(kml: &mut String, record: &PhotoLocation, description: &str) {
    let name = record
        .path
        .file_name()
        .map_or_else(|| record.path_str(), |n| n.to_string_lossy().into_owned());
    push_placemark(kml, &name, description, record.point, POINT_VIEW_RANGE_M);
}

fn push_placemark(kml: &mut String, name: &str, description: &str, point: GeoPoint, range_m: u32) {
    let _ = writeln!(kml, "    <Placemark>");
    let _ = writeln!(kml, "      <name>{}</name>", escape_xml(name));
    if !description.is_empty() {
        let _ = writeln!(
            kml,
            "      <description>{}</description>",
            escape_xml(description)
        );
    }
    let _ = writeln!(kml, "      <LookAt>");
    let _ = writeln!(kml, "        <latitude>{:.6}</latitude>", point.latitude);
    let _ = writeln!(kml, "        <longitude>{:.6}</longitude>", point.longitude);
    let _ = writeln!(kml, "        <range>{range_m}</range>");
    let _ = writeln!(kml, "      </LookAt>");
    let _ = writeln!(kml, "      <Point>");
    // KML coordinates are longitude,latitude[,altitude].
    let _ = writeln!(
        kml,
        "        <coordinates>{:.6},{:.6},0</coordinates>",
        point.longitude, point.latitude
    );
    let _ = writeln!(kml, "      </Point>");
    let _ = writeln!(kml, "    </Placemark>");
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
