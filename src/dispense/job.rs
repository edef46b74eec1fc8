//! Job planning: recipe + registry snapshot → per-line run times.
//!
//! A [`DispenseJob`] is built from a *copy* of everything it needs, so a
//! configuration change made while the job runs cannot affect it.

use std::time::Duration;

use log::warn;

use crate::drivers::led_patterns::{CLEANING, POURING, Pattern};
use crate::error::UnresolvedIngredient;
use crate::recipes::Recipe;
use crate::registry::PumpRegistry;

/// One pump's share of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRun {
    pub slot: String,
    pub ingredient: Option<String>,
    pub line: u32,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispenseJob {
    label: String,
    runs: Vec<PlannedRun>,
    unresolved: Vec<UnresolvedIngredient>,
    pattern: Pattern,
}

impl DispenseJob {
    /// Resolve every ingredient of `recipe` against `registry`.
    /// Ingredients with no pump are collected in
    /// [`unresolved`](Self::unresolved), not treated as errors.
    pub fn for_recipe(recipe: &Recipe, registry: &PumpRegistry, flow_rate_secs_per_unit: f64) -> Self {
        let mut runs = Vec::new();
        let mut unresolved = Vec::new();

        for (ingredient, quantity) in &recipe.ingredients {
            match registry.resolve(ingredient) {
                Some(slot) => runs.push(PlannedRun {
                    slot: slot.key().to_owned(),
                    ingredient: Some(ingredient.clone()),
                    line: slot.line(),
                    duration: run_time(*quantity, flow_rate_secs_per_unit),
                }),
                None => unresolved.push(UnresolvedIngredient {
                    ingredient: ingredient.clone(),
                }),
            }
        }

        Self {
            label: recipe.name.clone(),
            runs,
            unresolved,
            pattern: POURING,
        }
    }

    /// Run every slot, assigned or not, for the same `duration`.
    pub fn flush_all(registry: &PumpRegistry, duration: Duration) -> Self {
        Self {
            label: "Clean".to_owned(),
            runs: registry
                .slots()
                .iter()
                .map(|slot| PlannedRun {
                    slot: slot.key().to_owned(),
                    ingredient: slot.ingredient().map(str::to_owned),
                    line: slot.line(),
                    duration,
                })
                .collect(),
            unresolved: Vec::new(),
            pattern: CLEANING,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn runs(&self) -> &[PlannedRun] {
        &self.runs
    }

    pub fn unresolved(&self) -> &[UnresolvedIngredient] {
        &self.unresolved
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Pumps run concurrently, so the job takes as long as its longest run.
    pub fn total(&self) -> Duration {
        self.runs
            .iter()
            .map(|r| r.duration)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// True when no pump needs to switch on at all.
    pub fn is_complete(&self) -> bool {
        self.runs.iter().all(|r| r.duration.is_zero())
    }

    pub(crate) fn into_parts(self) -> (String, Vec<PlannedRun>, Vec<UnresolvedIngredient>) {
        (self.label, self.runs, self.unresolved)
    }
}

/// `quantity × flow rate`, never negative.
pub fn run_time(quantity: f64, flow_rate_secs_per_unit: f64) -> Duration {
    let secs = quantity * flow_rate_secs_per_unit;
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
        warn!("Run time of {secs}s is out of range; pump will not run");
        Duration::ZERO
    })
}
