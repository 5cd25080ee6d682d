use crate::aggregate::{self, AggregateResult};
use crate::config::{AppConfig, ProcessingConfig};
use crate::data;
use crate::error::PipelineError;
use crate::filter;
use crate::types::{BoundaryRecord, JoinedRecord, PopulationRecord, RegionSelection, SubzoneKey};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{info, warn};

/// Left-joins census rows onto boundaries by subzone key.
///
/// Every boundary yields exactly one record, in input order; boundaries
/// without a census row keep `population: None`. Fails only when the
/// result is empty.
pub fn join(
    boundaries: Vec<BoundaryRecord>,
    population: Vec<PopulationRecord>,
) -> Result<Vec<JoinedRecord>, PipelineError> {
    let population_rows = population.len();
    let mut by_key: HashMap<SubzoneKey, PopulationRecord> = population
        .into_iter()
        .map(|record| (record.subzone.clone(), record))
        .collect();

    let joined: Vec<JoinedRecord> = boundaries
        .into_iter()
        .map(|boundary| JoinedRecord {
            population: by_key.remove(&boundary.subzone),
            subzone: boundary.subzone,
            geometry: boundary.geometry,
        })
        .collect();

    if joined.is_empty() {
        return Err(PipelineError::MergeIntegrity {
            boundaries: 0,
            population: population_rows,
        });
    }

    let matched = joined.iter().filter(|r| r.population.is_some()).count();
    if matched == 0 {
        warn!(
            boundaries = joined.len(),
            population = population_rows,
            "no boundary matched a census row; check the join columns"
        );
    } else {
        info!(
            records = joined.len(),
            matched,
            unmatched_census = by_key.len(),
            "joined census data onto boundaries"
        );
    }

    Ok(joined)
}

/// Joined reference data, built once at startup and only read afterwards.
#[derive(Debug, Clone)]
pub struct CensusDataset {
    records: Vec<JoinedRecord>,
    nationwide_total: f64,
}

impl CensusDataset {
    pub fn new(records: Vec<JoinedRecord>) -> Self {
        let all: Vec<&JoinedRecord> = records.iter().collect();
        let nationwide_total = aggregate::total_population(&all);
        Self {
            records,
            nationwide_total,
        }
    }

    /// Loads both inputs and joins them.
    pub fn load(config: &AppConfig) -> Result<Self, PipelineError> {
        let (boundaries, population) = data::load_data(&config.input)?;
        Ok(Self::new(join(boundaries, population)?))
    }

    pub fn records(&self) -> &[JoinedRecord] {
        &self.records
    }

    pub fn nationwide_total(&self) -> f64 {
        self.nationwide_total
    }

    pub fn regions(&self) -> Vec<String> {
        filter::regions(&self.records)
    }

    pub fn filter(&self, selection: &RegionSelection) -> Vec<&JoinedRecord> {
        filter::filter_region(&self.records, selection)
    }

    /// Dashboard metrics for one selection.
    pub fn summarize(
        &self,
        selection: &RegionSelection,
        processing: &ProcessingConfig,
    ) -> AggregateResult {
        let filtered = self.filter(selection);
        aggregate::aggregate(&filtered, self.nationwide_total, selection, processing)
    }

    /// One summary per distinct region, in region order.
    pub fn region_summaries(&self, processing: &ProcessingConfig) -> Vec<AggregateResult> {
        self.regions()
            .into_par_iter()
            .map(|region| self.summarize(&RegionSelection::Region(region), processing))
            .collect()
    }
}
