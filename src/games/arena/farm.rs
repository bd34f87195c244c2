//! Farm plots. Growth runs on wall-clock time so crops keep growing while
//! the tab is closed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ActionError;
use super::state::SimulationContext;
use super::tables::{crop_info, CropKind, ItemKind};

pub const PLOT_COUNT: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    pub crop: Option<CropKind>,
    /// Wall-clock epoch ms.
    pub planted_at: f64,
}

impl Plot {
    /// Growth in [0, 1]; empty plots report 0.
    pub fn progress(&self, wall_ms: f64) -> f64 {
        match self.crop {
            Some(crop) => ((wall_ms - self.planted_at) / crop_info(crop).grow_ms).clamp(0.0, 1.0),
            None => 0.0,
        }
    }

    pub fn is_ready(&self, wall_ms: f64) -> bool {
        self.crop.is_some() && self.progress(wall_ms) >= 1.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Farm {
    pub plots: Vec<Plot>,
}

impl Default for Farm {
    fn default() -> Self {
        Self {
            plots: vec![Plot::default(); PLOT_COUNT],
        }
    }
}

/// Plant a seed from the inventory into an empty plot.
pub fn plant(ctx: &mut SimulationContext, plot: usize, crop: CropKind) -> Result<(), ActionError> {
    let slot = ctx
        .farm
        .plots
        .get(plot)
        .ok_or(ActionError::PlotUnavailable(plot))?;
    if slot.crop.is_some() {
        return Err(ActionError::PlotUnavailable(plot));
    }
    if !ctx.inventory.remove(&ItemKind::Seed(crop), 1) {
        return Err(ActionError::ItemMissing);
    }
    let wall_ms = ctx.wall_ms;
    if let Some(slot) = ctx.farm.plots.get_mut(plot) {
        slot.crop = Some(crop);
        slot.planted_at = wall_ms;
    }
    debug!(plot, ?crop, "planted");
    Ok(())
}

/// Harvest a grown plot into food. Returns the food gained.
pub fn harvest(ctx: &mut SimulationContext, plot: usize) -> Result<(ItemKind, u32), ActionError> {
    let slot = ctx
        .farm
        .plots
        .get(plot)
        .copied()
        .ok_or(ActionError::PlotUnavailable(plot))?;
    let Some(crop) = slot.crop else {
        return Err(ActionError::PlotUnavailable(plot));
    };
    if !slot.is_ready(ctx.wall_ms) {
        return Err(ActionError::CropNotReady);
    }
    let info = crop_info(crop);
    let food = ItemKind::Food(info.yields);
    ctx.inventory.add(food, info.amount);
    if let Some(slot) = ctx.farm.plots.get_mut(plot) {
        *slot = Plot::default();
    }
    Ok((food, info.amount))
}
