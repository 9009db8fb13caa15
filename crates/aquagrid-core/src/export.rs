//! CSV and JSON writers for the displayed records.
use csv::{Terminator, WriterBuilder};

use crate::error::ExportError;
use crate::record::CellRecord;
use crate::risk::compute_risk;

/// Metals given their own CSV column, in column order.
pub const CSV_METALS: [&str; 7] = ["As", "Pb", "Cr", "Cd", "Hg", "Fe", "Mn"];

const CSV_HEADER: [&str; 10] = [
    "Raster_ID",
    "Lat_Center",
    "Lon_Center",
    "Region_State",
    "Region_District",
    "Population_Density",
    "Land_Use_Type",
    "Exceedance_Flag",
    "Health_Risk_Score",
    "Risk_Index",
];

/// One row per record with its risk index to three decimals. Metals missing
/// from a record leave their column empty.
pub fn to_csv(records: &[CellRecord]) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER.iter().chain(CSV_METALS.iter()))?;

    for r in records {
        let mut row = vec![
            r.id.clone(),
            r.lat.to_string(),
            r.lon.to_string(),
            r.state.clone(),
            r.district.clone(),
            r.population_density.to_string(),
            r.land_use.to_string(),
            r.exceedance_flag.to_string(),
            r.health_risk_score.to_string(),
            format!("{:.3}", compute_risk(r)),
        ];
        row.extend(
            CSV_METALS
                .iter()
                .map(|m| r.metals.get(*m).map(f64::to_string).unwrap_or_default()),
        );
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Pretty-printed array using the ingestion field names, so the output can
/// be loaded again.
pub fn to_json(records: &[CellRecord]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(records)?)
}
