//! Outlier Classifier
//!
//! Trains an isolation forest once at startup on synthetic nominal readings
//! and confirms or rejects suspect readings against a fixed threshold: the
//! `(1 - contamination)` quantile of the training sample's own scores.

use rand::prelude::*;
use statrs::statistics::{Data, OrderStatistics};
use tracing::info;

use super::isolation_forest::{IsolationForest, TrainingError};
use crate::acquisition::sample_nominal;
use crate::config::MlModelConfig;
use crate::types::{ClassifierVerdict, FeatureVector, Reading};

/// Scoring contract the coordinator depends on
pub trait AnomalyClassifier: Send + Sync {
    /// Score a reading and decide whether it is anomalous. Never fails for a
    /// constructed `Reading`.
    fn classify(&self, reading: &Reading) -> ClassifierVerdict;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct OutlierClassifier {
    forest: IsolationForest,
    threshold: f64,
}

impl OutlierClassifier {
    /// Generate the nominal training sample and fit the forest.
    pub fn fit(config: &MlModelConfig) -> Result<Self, TrainingError> {
        if config.n_samples < 2 {
            return Err(TrainingError::TooFewSamples(config.n_samples));
        }
        let mut rng = StdRng::seed_from_u64(config.seed);
        let rows: Vec<FeatureVector> = (0..config.n_samples).map(|_| sample_nominal(&mut rng)).collect();
        Self::fit_rows(&rows, config, &mut rng)
    }

    fn fit_rows(
        rows: &[FeatureVector],
        config: &MlModelConfig,
        rng: &mut StdRng,
    ) -> Result<Self, TrainingError> {
        if !(config.contamination > 0.0 && config.contamination <= 0.5) {
            return Err(TrainingError::InvalidContamination(config.contamination));
        }

        let forest = IsolationForest::fit(rows, config.n_estimators, config.max_samples, rng)?;
        let scores: Vec<f64> = rows.iter().map(|r| forest.score(r)).collect();
        let threshold = Data::new(scores).quantile(1.0 - config.contamination);

        info!(
            rows = rows.len(),
            trees = forest.n_estimators(),
            subsample = forest.subsample(),
            threshold,
            "Outlier classifier trained"
        );

        Ok(Self { forest, threshold })
    }

    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn score(&self, features: &FeatureVector) -> f64 {
        self.forest.score(features)
    }
}

impl AnomalyClassifier for OutlierClassifier {
    fn classify(&self, reading: &Reading) -> ClassifierVerdict {
        let score = self.score(&reading.features());
        ClassifierVerdict {
            score,
            threshold: self.threshold,
            confirmed: score > self.threshold,
        }
    }

    fn name(&self) -> &'static str {
        "isolation_forest"
    }
}
