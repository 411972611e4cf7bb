//! Map Renderer - grouped postcodes as a standalone Leaflet HTML map

use crate::assembler::{ResultRow, ResultTable};
use crate::coordinate::Coordinate;
use crate::error::Result;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Initial view: centre of Great Britain at national zoom.
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    latitude: 54.0,
    longitude: -2.0,
};
pub const DEFAULT_ZOOM: u8 = 6;

const MARKER_RADIUS: u32 = 5;
const FILL_OPACITY: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NamedColor {
    pub name: &'static str,
    pub hex: &'static str,
}

/// Group colours in assignment order; groups past the end wrap around.
pub const PALETTE: [NamedColor; 10] = [
    NamedColor { name: "red", hex: "#d63e2a" },
    NamedColor { name: "blue", hex: "#38aadd" },
    NamedColor { name: "green", hex: "#72b026" },
    NamedColor { name: "purple", hex: "#d252b9" },
    NamedColor { name: "orange", hex: "#f69730" },
    NamedColor { name: "darkred", hex: "#a23336" },
    NamedColor { name: "lightred", hex: "#ff8e7f" },
    NamedColor { name: "beige", hex: "#ffcb92" },
    NamedColor { name: "darkblue", hex: "#0067a3" },
    NamedColor { name: "darkgreen", hex: "#728224" },
];

pub fn group_color(group: usize) -> NamedColor {
    PALETTE[group % PALETTE.len()]
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub postcode: String,
    pub group: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub color: NamedColor,
    pub popup: String,
}

/// A row that could not be placed on the map.
#[derive(Debug, Clone)]
pub struct RenderError {
    pub postcode: String,
    pub reason: String,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error adding point for postcode {}: {}", self.postcode, self.reason)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MapArtifact {
    pub center: Coordinate,
    pub zoom: u8,
    pub markers: Vec<Marker>,
    #[serde(skip)]
    pub skipped: Vec<RenderError>,
}

impl MapArtifact {
    pub fn new(center: Coordinate, zoom: u8) -> Self {
        Self {
            center,
            zoom,
            markers: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Serialize to a self-contained HTML document.
    pub fn to_html(&self) -> Result<String> {
        #[derive(Serialize)]
        struct JsMarker<'a> {
            lat: f64,
            lng: f64,
            color: &'a str,
            popup: &'a str,
        }

        let markers: Vec<JsMarker> = self
            .markers
            .iter()
            .map(|m| JsMarker {
                lat: m.latitude,
                lng: m.longitude,
                color: m.color.hex,
                popup: &m.popup,
            })
            .collect();
        // keep embedded data from terminating the script element
        let data = serde_json::to_string(&markers)?.replace("</", "<\\/");

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<title>Grouped postcodes</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map {{ width: 100%; height: 100%; margin: 0; padding: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map("map").setView([{lat}, {lng}], {zoom});
L.tileLayer("https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
    maxZoom: 19,
    attribution: "&copy; OpenStreetMap contributors"
}}).addTo(map);
var markers = {data};
markers.forEach(function (m) {{
    L.circleMarker([m.lat, m.lng], {{
        radius: {radius},
        color: m.color,
        fill: true,
        fillColor: m.color,
        fillOpacity: {opacity}
    }}).bindPopup(m.popup).addTo(map);
}});
</script>
</body>
</html>
"#,
            lat = self.center.latitude,
            lng = self.center.longitude,
            zoom = self.zoom,
            data = data,
            radius = MARKER_RADIUS,
            opacity = FILL_OPACITY,
        ))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_html()?)?;
        Ok(())
    }
}

pub struct MapRenderer {
    center: Coordinate,
    zoom: u8,
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl MapRenderer {
    pub fn render(&self, table: &ResultTable) -> MapArtifact {
        info!("Creating map with {} points", table.len());
        let mut map = MapArtifact::new(self.center, self.zoom);

        for row in table.rows() {
            match Self::marker(row) {
                Ok(marker) => map.markers.push(marker),
                Err(e) => {
                    warn!("{}", e);
                    map.skipped.push(e);
                }
            }
        }

        info!("Successfully added {} points to the map", map.markers.len());
        map
    }

    fn marker(row: &ResultRow) -> std::result::Result<Marker, RenderError> {
        let coordinate = Coordinate::new(row.latitude, row.longitude);
        if !coordinate.is_valid() {
            return Err(RenderError {
                postcode: row.postcode.clone(),
                reason: format!("invalid location ({}, {})", row.latitude, row.longitude),
            });
        }

        Ok(Marker {
            postcode: row.postcode.clone(),
            group: row.group,
            latitude: row.latitude,
            longitude: row.longitude,
            color: group_color(row.group),
            popup: format!(
                "Postcode: {}<br>Group: {}",
                escape_html(&row.postcode),
                row.group
            ),
        })
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
