//! Contraction profiles: a vehicle paired with the metric its edge weights
//! are computed for.
//!
//! Names follow `<vehicle>` for the fastest metric and `<vehicle>.shortest`
//! for the shortest metric, resolved case-insensitively.

use std::fmt;

use crate::{VehicleProfile, VehicleRegistry};

/// Quantity minimised by a contraction profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Travel time at the vehicle's nominal speed.
    Fastest,
    /// Geometric length.
    Shortest,
}

/// A resolved contraction profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractionProfile {
    vehicle: &'static VehicleProfile,
    metric: Metric,
}

impl ContractionProfile {
    /// Vehicle whose access and speed rules feed this profile.
    pub const fn vehicle(&self) -> &'static VehicleProfile {
        self.vehicle
    }

    /// Metric used for edge weights.
    pub const fn metric(&self) -> Metric {
        self.metric
    }

    /// Canonical name of the profile.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContractionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.metric {
            Metric::Fastest => f.write_str(self.vehicle.name()),
            Metric::Shortest => write!(f, "{}.shortest", self.vehicle.name()),
        }
    }
}

/// Resolves contraction profile names against a vehicle registry.
///
/// # Examples
/// ```
/// use routeforge_core::{ContractionRegistry, Metric};
///
/// let registry = ContractionRegistry::builtin();
/// let profile = registry.get("Bicycle.Shortest").expect("known profile");
/// assert_eq!(profile.metric(), Metric::Shortest);
/// assert_eq!(profile.name(), "bicycle.shortest");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContractionRegistry {
    vehicles: VehicleRegistry,
}

impl ContractionRegistry {
    /// Registry over the built-in vehicles.
    pub fn builtin() -> Self {
        Self::new(VehicleRegistry::builtin())
    }

    /// Registry over an explicit vehicle set.
    pub const fn new(vehicles: VehicleRegistry) -> Self {
        Self { vehicles }
    }

    /// Resolve a profile by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<ContractionProfile> {
        let name = name.trim();
        let (vehicle, metric) = match name.rsplit_once('.') {
            Some((vehicle, suffix)) if suffix.eq_ignore_ascii_case("shortest") => {
                (vehicle, Metric::Shortest)
            }
            Some((vehicle, suffix)) if suffix.eq_ignore_ascii_case("fastest") => {
                (vehicle, Metric::Fastest)
            }
            Some(_) => return None,
            None => (name, Metric::Fastest),
        };
        self.vehicles
            .get(vehicle)
            .map(|vehicle| ContractionProfile { vehicle, metric })
    }

    /// Every resolvable profile, fastest before shortest for each vehicle.
    pub fn iter(&self) -> impl Iterator<Item = ContractionProfile> + '_ {
        self.vehicles.iter().flat_map(|vehicle| {
            [Metric::Fastest, Metric::Shortest]
                .into_iter()
                .map(move |metric| ContractionProfile { vehicle, metric })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("car", "car", Metric::Fastest)]
    #[case("CAR.fastest", "car", Metric::Fastest)]
    #[case("pedestrian.shortest", "pedestrian.shortest", Metric::Shortest)]
    fn resolves_names(#[case] raw: &str, #[case] canonical: &str, #[case] metric: Metric) {
        let profile = ContractionRegistry::builtin()
            .get(raw)
            .expect("profile should resolve");
        assert_eq!(profile.name(), canonical);
        assert_eq!(profile.metric(), metric);
    }

    #[rstest]
    #[case("boat")]
    #[case("car.scenic")]
    #[case("")]
    fn rejects_unknown_names(#[case] raw: &str) {
        assert!(ContractionRegistry::builtin().get(raw).is_none());
    }

    #[test]
    fn iterates_every_vehicle_and_metric() {
        let names: Vec<_> = ContractionRegistry::builtin()
            .iter()
            .map(|profile| profile.name())
            .collect();
        assert_eq!(
            names,
            [
                "car",
                "car.shortest",
                "bicycle",
                "bicycle.shortest",
                "pedestrian",
                "pedestrian.shortest"
            ]
        );
    }
}
