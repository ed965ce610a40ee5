use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product scraped from one supermarket listing page, held in memory for
/// the duration of a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Display name of the supermarket, e.g. `"Jumbo"`.
    pub store_name: String,
    pub name: String,
    /// Either a dedicated brand element, the first token of `name`, or a
    /// generic placeholder.
    pub brand: String,
    /// Text destined for the fixture's `descripcion` field.
    pub description: String,
    /// Normalized price in whole CLP.
    pub price: u64,
    /// Absolute product page URL.
    pub source_url: String,
    pub image_url: Option<String>,
    pub available: bool,
    pub captured_at: DateTime<Utc>,
}

/// Key used by the final dedup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    SourceUrl,
    /// For stores whose hrefs are unreliable identifiers.
    NameAndPrice,
}

impl ProductRecord {
    /// Returns the dedup key for this record under `strategy`.
    #[must_use]
    pub fn dedup_key(&self, strategy: DedupStrategy) -> String {
        match strategy {
            DedupStrategy::SourceUrl => self.source_url.clone(),
            // Unit separator cannot appear in rendered text.
            DedupStrategy::NameAndPrice => format!("{}\u{1f}{}", self.name, self.price),
        }
    }
}

/// One entry of the exported fixture file: `{model, pk, fields}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRecord {
    pub model: String,
    /// 1-based position in the deduplicated list; not stable across runs.
    pub pk: u64,
    pub fields: FixtureFields,
}

/// Field names match the downstream import schema, hence Spanish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureFields {
    pub nombre: String,
    pub marca: String,
    pub tipo: String,
    pub descripcion: String,
    pub supermercado: u32,
    pub precio: u64,
    pub moneda: String,
    /// Empty string when the listing had no usable image.
    pub imagen_url: String,
    pub producto_url: String,
    pub disponible: bool,
    /// `YYYY-MM-DDTHH:MM:SSZ`, UTC.
    pub fecha_actualizacion: String,
}
