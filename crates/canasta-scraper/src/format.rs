//! Maps deduplicated records into the fixture export shape.

use canasta_core::{FixtureFields, FixtureRecord, ProductRecord};
use chrono::{DateTime, Utc};

pub const NAME_MAX_CHARS: usize = 200;
pub const BRAND_MAX_CHARS: usize = 100;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Values shared by every fixture of one run.
#[derive(Debug, Clone)]
pub struct FixtureContext {
    /// `app_label.model` of the import target, e.g. `"tucanasta.producto"`.
    pub model: String,
    pub store_id: u32,
    /// Written into `tipo`.
    pub category: String,
    pub currency: String,
    /// Stamped into every `fecha_actualizacion`.
    pub exported_at: DateTime<Utc>,
}

/// Builds fixtures with `pk` running from 1 in input order.
#[must_use]
pub fn format_fixtures(records: &[ProductRecord], ctx: &FixtureContext) -> Vec<FixtureRecord> {
    let stamp = ctx.exported_at.format(TIMESTAMP_FORMAT).to_string();

    records
        .iter()
        .zip(1_u64..)
        .map(|(record, pk)| FixtureRecord {
            model: ctx.model.clone(),
            pk,
            fields: FixtureFields {
                nombre: truncate_chars(&record.name, NAME_MAX_CHARS),
                marca: truncate_chars(&record.brand, BRAND_MAX_CHARS),
                tipo: ctx.category.clone(),
                descripcion: record.description.clone(),
                supermercado: ctx.store_id,
                precio: record.price,
                moneda: ctx.currency.clone(),
                imagen_url: record.image_url.clone().unwrap_or_default(),
                producto_url: record.source_url.clone(),
                disponible: record.available,
                fecha_actualizacion: stamp.clone(),
            },
        })
        .collect()
}

fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((cut, _)) => value[..cut].to_string(),
        None => value.to_string(),
    }
}
