//! GeoJSON layer reading/writing

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::feature::Id;
use geojson::{GeoJson, JsonObject, JsonValue};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Read a GeoJSON file into a feature collection.
///
/// Accepts a FeatureCollection, a single Feature or a bare Geometry.
pub fn read_layer<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let mut text = String::new();
    BufReader::new(File::open(path.as_ref())?).read_to_string(&mut text)?;
    read_layer_from_str(&text)
}

/// Parse GeoJSON text into a feature collection
pub fn read_layer_from_str(text: &str) -> Result<FeatureCollection> {
    let geojson: GeoJson = text.parse()?;
    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![geojson::Feature {
            bbox: None,
            geometry: Some(g),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    };

    features.into_iter().map(convert_feature).collect()
}

/// Write a feature collection to a GeoJSON file
pub fn write_layer<P: AsRef<Path>>(path: P, layer: &FeatureCollection) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write_layer_to_writer(&mut writer, layer)?;
    writer.flush()?;
    Ok(())
}

/// Serialize a feature collection as GeoJSON into any writer
pub fn write_layer_to_writer<W: Write>(writer: W, layer: &FeatureCollection) -> Result<()> {
    let fc = geojson::FeatureCollection {
        bbox: None,
        features: layer.iter().map(to_geojson_feature).collect(),
        foreign_members: None,
    };
    serde_json::to_writer(writer, &fc)
        .map_err(|e| Error::Other(format!("GeoJSON encode error: {}", e)))
}

fn convert_feature(feature: geojson::Feature) -> Result<Feature> {
    let geometry = match feature.geometry {
        Some(g) => Some(geo_types::Geometry::<f64>::try_from(g)?),
        None => None,
    };

    let properties = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, attribute_from_json(v)))
        .collect::<HashMap<_, _>>();

    let id = feature.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

fn to_geojson_feature(feature: &Feature) -> geojson::Feature {
    let geometry = feature
        .geometry
        .as_ref()
        .map(|g| geojson::Geometry::new(geojson::Value::from(g)));

    let properties: JsonObject = feature
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), attribute_to_json(v)))
        .collect();

    let id = feature.id.as_ref().map(|s| match s.parse::<i64>() {
        Ok(n) => Id::Number(n.into()),
        Err(_) => Id::String(s.clone()),
    });

    geojson::Feature {
        bbox: None,
        geometry,
        id,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn attribute_from_json(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => AttributeValue::String(s),
        // Nested values are kept verbatim as their JSON text
        other => AttributeValue::String(other.to_string()),
    }
}

fn attribute_to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => JsonValue::from(*i),
        AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}
