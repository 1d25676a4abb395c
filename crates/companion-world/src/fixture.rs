//! Production fixtures: smelters, kilns and similar converters.
//!
//! A fixture queues raw input ("ore"), optionally burns fuel, and turns one
//! queued unit into one finished unit every `seconds_per_product`. Finished
//! units wait inside the fixture until someone triggers a release at its
//! output side.

use companion_types::Vec3;
use serde::{Deserialize, Serialize};

/// One input-to-output rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    /// Accepted input item name.
    pub input: String,
    /// Produced output item name.
    pub output: String,
}

/// Why an insert was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertRefusal {
    /// The ore queue or fuel tank is at capacity.
    Full,
    /// The item is neither an accepted input nor the fuel.
    NotAccepted,
}

/// Runtime state of a production fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// Accepted inputs and their outputs.
    pub conversions: Vec<Conversion>,
    /// Fuel item name, `None` for fixtures that need no fuel.
    pub fuel_item: Option<String>,
    /// Maximum queued input units.
    pub max_ore: u32,
    /// Maximum fuel units.
    pub max_fuel: u32,
    /// Fuel units burned per finished product.
    pub fuel_per_product: u32,
    /// Processing time per product, in seconds.
    pub seconds_per_product: f32,
    /// Queued input names, front is processed first.
    pub queued: Vec<String>,
    /// Fuel units loaded.
    pub fuel: u32,
    /// Seconds spent on the current unit.
    pub progress: f32,
    /// Finished output names waiting for release.
    pub ready: Vec<String>,
    /// Where inputs are fed, relative to the fixture position.
    pub control_offset: Vec3,
    /// Where output is released, relative to the fixture position.
    pub output_offset: Vec3,
}

impl Fixture {
    /// A fixture with the given rules and capacities, empty.
    pub fn new(
        conversions: Vec<Conversion>,
        fuel_item: Option<String>,
        max_ore: u32,
        max_fuel: u32,
        fuel_per_product: u32,
        seconds_per_product: f32,
    ) -> Self {
        Self {
            conversions,
            fuel_item,
            max_ore,
            max_fuel,
            fuel_per_product,
            seconds_per_product,
            queued: Vec::new(),
            fuel: 0,
            progress: 0.0,
            ready: Vec::new(),
            control_offset: Vec3::new(0.0, 1.0, 1.2),
            output_offset: Vec3::new(1.2, 0.0, 0.0),
        }
    }

    /// Whether this fixture burns fuel.
    pub const fn needs_fuel(&self) -> bool {
        self.fuel_item.is_some()
    }

    /// Queued input units.
    pub fn ore_count(&self) -> u32 {
        u32::try_from(self.queued.len()).unwrap_or(u32::MAX)
    }

    /// Finished units waiting for release.
    pub fn ready_count(&self) -> u32 {
        u32::try_from(self.ready.len()).unwrap_or(u32::MAX)
    }

    /// Whether the input queue is at capacity.
    pub fn is_ore_full(&self) -> bool {
        self.ore_count() >= self.max_ore
    }

    /// Whether `name` is an accepted input.
    pub fn accepts(&self, name: &str) -> bool {
        self.conversions.iter().any(|c| c.input == name)
    }

    /// Whether `name` is an output of this fixture.
    pub fn produces(&self, name: &str) -> bool {
        self.conversions.iter().any(|c| c.output == name)
    }

    /// Output produced from `input`.
    pub fn output_for(&self, input: &str) -> Option<&str> {
        self.conversions
            .iter()
            .find(|c| c.input == input)
            .map(|c| c.output.as_str())
    }

    /// Whether fuel is at least one product's worth (always true when no
    /// fuel is needed).
    pub const fn has_fuel_for_one(&self) -> bool {
        !self.needs_fuel() || self.fuel >= self.fuel_per_product
    }

    /// Whether the fixture is currently converting.
    pub fn is_processing(&self) -> bool {
        !self.queued.is_empty() && self.has_fuel_for_one()
    }

    /// Feed one unit.
    pub fn insert(&mut self, name: &str, is_fuel: bool) -> Result<(), InsertRefusal> {
        if is_fuel {
            if self.fuel_item.as_deref() != Some(name) {
                return Err(InsertRefusal::NotAccepted);
            }
            if self.fuel >= self.max_fuel {
                return Err(InsertRefusal::Full);
            }
            self.fuel = self.fuel.saturating_add(1);
            return Ok(());
        }
        if !self.accepts(name) {
            return Err(InsertRefusal::NotAccepted);
        }
        if self.is_ore_full() {
            return Err(InsertRefusal::Full);
        }
        self.queued.push(name.to_owned());
        Ok(())
    }

    /// Advance processing by `dt` seconds. Returns the number of units
    /// finished during this step.
    pub fn advance(&mut self, dt: f32) -> u32 {
        let mut finished: u32 = 0;
        if !self.is_processing() {
            self.progress = 0.0;
            return finished;
        }
        self.progress += dt;
        while self.is_processing() && self.progress >= self.seconds_per_product {
            self.progress -= self.seconds_per_product;
            if self.queued.is_empty() {
                break;
            }
            let input = self.queued.remove(0);
            if self.needs_fuel() {
                self.fuel = self.fuel.saturating_sub(self.fuel_per_product);
            }
            if let Some(output) = self.output_for(&input).map(str::to_owned) {
                self.ready.push(output);
                finished = finished.saturating_add(1);
            }
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smelter() -> Fixture {
        Fixture::new(
            vec![Conversion {
                input: String::from("CopperOre"),
                output: String::from("Copper"),
            }],
            Some(String::from("Coal")),
            2,
            4,
            1,
            10.0,
        )
    }

    #[test]
    fn insert_respects_capacity() {
        let mut f = smelter();
        assert!(f.insert("CopperOre", false).is_ok());
        assert!(f.insert("CopperOre", false).is_ok());
        assert_eq!(f.insert("CopperOre", false), Err(InsertRefusal::Full));
        assert_eq!(f.insert("Wood", false), Err(InsertRefusal::NotAccepted));
        assert_eq!(f.insert("Wood", true), Err(InsertRefusal::NotAccepted));
    }

    #[test]
    fn no_processing_without_fuel() {
        let mut f = smelter();
        assert!(f.insert("CopperOre", false).is_ok());
        assert!(!f.is_processing());
        assert_eq!(f.advance(30.0), 0);
    }

    #[test]
    fn converts_and_burns_fuel() {
        let mut f = smelter();
        assert!(f.insert("CopperOre", false).is_ok());
        assert!(f.insert("Coal", true).is_ok());
        assert!(f.is_processing());
        assert_eq!(f.advance(10.0), 1);
        assert_eq!(f.ready, vec![String::from("Copper")]);
        assert_eq!(f.fuel, 0);
        assert_eq!(f.ore_count(), 0);
    }

    #[test]
    fn kiln_needs_no_fuel() {
        let mut kiln = Fixture::new(
            vec![Conversion {
                input: String::from("Wood"),
                output: String::from("Coal"),
            }],
            None,
            5,
            0,
            0,
            5.0,
        );
        assert!(kiln.insert("Wood", false).is_ok());
        assert!(kiln.is_processing());
        assert_eq!(kiln.advance(5.0), 1);
    }
}
