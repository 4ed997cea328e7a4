//! Application state management

use crate::error::{CarPriceError, Result};
use crate::inference::PredictionService;
use crate::ingestion::{read_raw_dataset, DatasetProvider, COMPANY, NAME};
use polars::prelude::*;
use std::collections::HashSet;

/// Companies and their car names, in first-appearance order
#[derive(Debug, Clone, Default)]
pub struct CarCatalog {
    companies: Vec<String>,
    /// `(company, names)`, parallel to `companies`
    names: Vec<Vec<String>>,
}

impl CarCatalog {
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let companies = df
            .column(COMPANY)
            .map_err(|_| CarPriceError::FeatureNotFound(COMPANY.to_string()))?
            .cast(&DataType::String)?;
        let names = df
            .column(NAME)
            .map_err(|_| CarPriceError::FeatureNotFound(NAME.to_string()))?
            .cast(&DataType::String)?;

        let mut catalog = CarCatalog::default();
        let mut seen: HashSet<(usize, &str)> = HashSet::new();
        for (company, name) in companies.str()?.into_iter().zip(names.str()?.into_iter()) {
            let Some(company) = company else { continue };
            let idx = match catalog.companies.iter().position(|c| c == company) {
                Some(idx) => idx,
                None => {
                    catalog.companies.push(company.to_string());
                    catalog.names.push(Vec::new());
                    catalog.companies.len() - 1
                }
            };
            if let Some(name) = name {
                if seen.insert((idx, name)) {
                    catalog.names[idx].push(name.to_string());
                }
            }
        }
        Ok(catalog)
    }

    pub fn from_provider(provider: &dyn DatasetProvider) -> Result<Self> {
        Self::from_dataframe(&read_raw_dataset(provider)?)
    }

    pub fn companies(&self) -> &[String] {
        &self.companies
    }

    /// Unique names of every company matching `company`, ignoring case
    pub fn names_for(&self, company: &str) -> Vec<String> {
        let wanted = company.to_lowercase();
        let mut seen = HashSet::new();
        self.companies
            .iter()
            .zip(self.names.iter())
            .filter(|(c, _)| c.to_lowercase() == wanted)
            .flat_map(|(_, names)| names.iter())
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect()
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub service: PredictionService,
    pub catalog: CarCatalog,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(service: PredictionService, catalog: CarCatalog) -> Self {
        Self {
            service,
            catalog,
            started_at: chrono::Utc::now(),
        }
    }
}
