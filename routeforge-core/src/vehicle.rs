//! Vehicle profiles: which ways a vehicle may use, in which direction, and
//! how fast.
//!
//! Profiles are resolved by case-insensitive unique name through a
//! [`VehicleRegistry`]. The built-in set covers `car`, `bicycle` and
//! `pedestrian`.

use std::fmt;

use crate::Tags;

/// Directions in which a way may be traversed, relative to its node order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    /// Travel in node order is allowed.
    pub forward: bool,
    /// Travel against node order is allowed.
    pub backward: bool,
}

impl Access {
    const BOTH: Self = Self {
        forward: true,
        backward: true,
    };

    /// Whether any direction is open.
    pub const fn any(self) -> bool {
        self.forward || self.backward
    }
}

/// Static description of how a vehicle interprets way tags.
#[derive(Debug, PartialEq, Eq)]
pub struct VehicleProfile {
    name: &'static str,
    /// `highway` values the vehicle may use, with the nominal speed in km/h.
    speeds: &'static [(&'static str, u16)],
    /// Access keys consulted, most specific first.
    access_keys: &'static [&'static str],
    respects_oneway: bool,
}

const DENIED: [&str; 3] = ["no", "private", "agricultural"];

impl VehicleProfile {
    /// Unique, lower-case profile name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Nominal speed on a way, or `None` when the way is not routable for
    /// this vehicle by its `highway` class.
    pub fn speed_kmh(&self, tags: &Tags) -> Option<u16> {
        let highway = tags.get("highway")?;
        self.speeds
            .iter()
            .find(|(class, _)| *class == highway.as_str())
            .map(|(_, speed)| *speed)
    }

    /// Directions in which this vehicle may traverse a way with `tags`.
    ///
    /// # Examples
    /// ```
    /// use routeforge_core::{Tags, VehicleRegistry};
    ///
    /// let registry = VehicleRegistry::builtin();
    /// let car = registry.get("car").expect("built-in profile");
    /// let tags = Tags::from([
    ///     ("highway".into(), "primary".into()),
    ///     ("oneway".into(), "yes".into()),
    /// ]);
    /// let access = car.access(&tags);
    /// assert!(access.forward && !access.backward);
    /// ```
    pub fn access(&self, tags: &Tags) -> Access {
        let closed = Access {
            forward: false,
            backward: false,
        };
        if self.speed_kmh(tags).is_none() {
            return closed;
        }
        // The most specific access key that is present decides.
        let decisive = self
            .access_keys
            .iter()
            .find_map(|key| tags.get(*key).map(String::as_str));
        if decisive.is_some_and(|value| DENIED.contains(&value)) {
            return closed;
        }
        if !self.respects_oneway {
            return Access::BOTH;
        }
        match tags.get("oneway").map(String::as_str) {
            Some("yes" | "1" | "true") => Access {
                forward: true,
                backward: false,
            },
            Some("-1" | "reverse") => Access {
                forward: false,
                backward: true,
            },
            Some(_) => Access::BOTH,
            None => {
                let implied = matches!(
                    tags.get("highway").map(String::as_str),
                    Some("motorway" | "motorway_link")
                ) || tags.get("junction").is_some_and(|value| value == "roundabout");
                if implied {
                    Access {
                        forward: true,
                        backward: false,
                    }
                } else {
                    Access::BOTH
                }
            }
        }
    }
}

impl fmt::Display for VehicleProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

static CAR: VehicleProfile = VehicleProfile {
    name: "car",
    speeds: &[
        ("motorway", 110),
        ("motorway_link", 60),
        ("trunk", 90),
        ("trunk_link", 50),
        ("primary", 70),
        ("primary_link", 40),
        ("secondary", 60),
        ("secondary_link", 40),
        ("tertiary", 50),
        ("tertiary_link", 30),
        ("unclassified", 50),
        ("residential", 30),
        ("service", 20),
        ("living_street", 10),
    ],
    access_keys: &["motorcar", "motor_vehicle", "vehicle", "access"],
    respects_oneway: true,
};

static BICYCLE: VehicleProfile = VehicleProfile {
    name: "bicycle",
    speeds: &[
        ("cycleway", 18),
        ("primary", 15),
        ("primary_link", 15),
        ("secondary", 16),
        ("secondary_link", 16),
        ("tertiary", 16),
        ("tertiary_link", 16),
        ("unclassified", 16),
        ("residential", 16),
        ("service", 14),
        ("living_street", 12),
        ("track", 12),
        ("path", 12),
    ],
    access_keys: &["bicycle", "vehicle", "access"],
    respects_oneway: true,
};

static PEDESTRIAN: VehicleProfile = VehicleProfile {
    name: "pedestrian",
    speeds: &[
        ("footway", 5),
        ("pedestrian", 5),
        ("path", 5),
        ("steps", 3),
        ("track", 5),
        ("living_street", 5),
        ("residential", 5),
        ("service", 5),
        ("unclassified", 5),
        ("tertiary", 5),
        ("tertiary_link", 5),
        ("secondary", 5),
        ("secondary_link", 5),
        ("primary", 5),
        ("primary_link", 5),
        ("cycleway", 5),
    ],
    access_keys: &["foot", "access"],
    respects_oneway: false,
};

/// Name-indexed set of vehicle profiles.
#[derive(Debug, Clone)]
pub struct VehicleRegistry {
    profiles: Vec<&'static VehicleProfile>,
}

impl VehicleRegistry {
    /// Name of the profile a graph is built for when none is requested.
    pub const DEFAULT: &'static str = "car";

    /// Registry holding the built-in profiles.
    pub fn builtin() -> Self {
        Self {
            profiles: vec![&CAR, &BICYCLE, &PEDESTRIAN],
        }
    }

    /// Resolve a profile by case-insensitive unique name.
    pub fn get(&self, name: &str) -> Option<&'static VehicleProfile> {
        self.profiles
            .iter()
            .copied()
            .find(|profile| profile.name.eq_ignore_ascii_case(name.trim()))
    }

    /// The profile used when no vehicle is requested.
    pub fn default_profile(&self) -> Option<&'static VehicleProfile> {
        self.get(Self::DEFAULT)
    }

    /// Iterate the registered profiles in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &'static VehicleProfile> + '_ {
        self.profiles.iter().copied()
    }
}

impl Default for VehicleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry() -> VehicleRegistry {
        VehicleRegistry::builtin()
    }

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        crate::collect_tags(pairs.iter().copied())
    }

    #[rstest]
    #[case("car")]
    #[case("CAR")]
    #[case(" Bicycle ")]
    #[case("pedestrian")]
    fn lookup_is_case_insensitive(registry: VehicleRegistry, #[case] name: &str) {
        assert!(registry.get(name).is_some(), "expected {name} to resolve");
    }

    #[rstest]
    fn unknown_names_do_not_resolve(registry: VehicleRegistry) {
        assert!(registry.get("hovercraft").is_none());
    }

    #[rstest]
    fn default_profile_is_car(registry: VehicleRegistry) {
        let profile = registry.default_profile().expect("default profile");
        assert_eq!(profile.name(), "car");
    }

    #[rstest]
    #[case(&[("highway", "residential")], true, true)]
    #[case(&[("highway", "residential"), ("oneway", "yes")], true, false)]
    #[case(&[("highway", "residential"), ("oneway", "-1")], false, true)]
    #[case(&[("highway", "motorway")], true, false)]
    #[case(&[("highway", "primary"), ("junction", "roundabout")], true, false)]
    #[case(&[("highway", "primary"), ("access", "private")], false, false)]
    #[case(&[("highway", "primary"), ("access", "no"), ("motor_vehicle", "yes")], true, true)]
    #[case(&[("highway", "footway")], false, false)]
    #[case(&[("building", "yes")], false, false)]
    fn car_access_rules(
        registry: VehicleRegistry,
        #[case] pairs: &[(&str, &str)],
        #[case] forward: bool,
        #[case] backward: bool,
    ) {
        let car = registry.get("car").expect("car");
        assert_eq!(car.access(&tags(pairs)), Access { forward, backward });
    }

    #[rstest]
    fn pedestrians_ignore_oneway(registry: VehicleRegistry) {
        let pedestrian = registry.get("pedestrian").expect("pedestrian");
        let access = pedestrian.access(&tags(&[("highway", "residential"), ("oneway", "yes")]));
        assert_eq!(access, Access::BOTH);
    }

    #[rstest]
    fn speeds_follow_highway_class(registry: VehicleRegistry) {
        let car = registry.get("car").expect("car");
        assert_eq!(car.speed_kmh(&tags(&[("highway", "motorway")])), Some(110));
        assert_eq!(car.speed_kmh(&tags(&[("highway", "steps")])), None);
    }
}
