// weather_stack - Instrumented demo weather, recommendation, and alert services
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::predictor::Condition;
use serde::{Deserialize, Serialize};

/// Description used for an activity missing from the description catalog.
pub const FALLBACK_DESCRIPTION: &str = "Recommended activity";

const SUNNY: &[(&str, u8)] = &[("beach", 9), ("hiking", 8), ("city_tour", 6), ("outdoor_café", 8)];
const CLOUDY: &[(&str, u8)] = &[("city_tour", 8), ("museum", 9), ("indoor_shopping", 8), ("café", 8)];
const RAINY: &[(&str, u8)] = &[("museum", 9), ("indoor_shopping", 8), ("cinema", 9), ("spa", 8)];
const SNOWY: &[(&str, u8)] = &[
    ("skiing", 10),
    ("winter_sports", 10),
    ("hot_spring", 9),
    ("indoor_activities", 7),
];
const FOGGY: &[(&str, u8)] = &[
    ("hiking_scenic", 6),
    ("city_walk", 5),
    ("indoor_activities", 8),
    ("photography", 7),
];

const DESCRIPTIONS: &[(&str, &str)] = &[
    ("beach", "Perfect for beach activities"),
    ("hiking", "Great for hiking trails"),
    ("city_tour", "Good for exploring the city"),
    ("outdoor_café", "Enjoy outdoor dining"),
    ("museum", "Perfect for museum visits"),
    ("indoor_shopping", "Great for shopping"),
    ("café", "Relax in a café"),
    ("skiing", "Excellent skiing conditions"),
    ("winter_sports", "Great for winter sports"),
    ("hot_spring", "Enjoy hot springs"),
    ("indoor_activities", "Indoor activities recommended"),
    ("hiking_scenic", "Scenic hiking possible"),
    ("city_walk", "City walking tours"),
    ("photography", "Good for photography"),
    ("cinema", "Perfect for movie watching"),
    ("spa", "Great for spa and relaxation"),
];

/// A scored suggestion for something to do in the current weather.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecommendation {
    pub activity: String,
    pub score: u8,
    pub description: String,
    pub rationale: String,
}

/// Static mapping from weather condition to scored activities.
///
/// Every `Condition` has an entry. Conditions that can't be parsed map to no
/// activities at all rather than an error.
#[derive(Debug, Clone, Default)]
pub struct RuleTable;

impl RuleTable {
    pub fn new() -> Self {
        RuleTable
    }

    /// Activities and their scores for a condition, in declaration order.
    pub fn scores(&self, condition: Condition) -> &'static [(&'static str, u8)] {
        match condition {
            Condition::Sunny => SUNNY,
            Condition::Cloudy => CLOUDY,
            Condition::Rainy => RAINY,
            Condition::Snowy => SNOWY,
            Condition::Foggy => FOGGY,
        }
    }

    /// Description of an activity from the catalog, or a generic description.
    pub fn description(&self, activity: &str) -> &'static str {
        DESCRIPTIONS
            .iter()
            .find(|(a, _)| *a == activity)
            .map(|(_, d)| *d)
            .unwrap_or(FALLBACK_DESCRIPTION)
    }

    /// All recommendations for `condition`, best first.
    ///
    /// Sorting is stable so activities with equal scores keep the order they
    /// are declared in. The condition is matched ignoring case and anything
    /// unrecognized results in an empty list.
    pub fn lookup(&self, condition: &str, temperature_celsius: f64) -> Vec<ActivityRecommendation> {
        let parsed = match condition.parse::<Condition>() {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        let mut scores = self.scores(parsed).to_vec();
        scores.sort_by(|a, b| b.1.cmp(&a.1));

        scores
            .into_iter()
            .map(|(activity, score)| ActivityRecommendation {
                activity: activity.to_owned(),
                score,
                description: self.description(activity).to_owned(),
                rationale: format!(
                    "{} is great with {} weather at {:.1}°C",
                    humanize(activity),
                    parsed,
                    temperature_celsius
                ),
            })
            .collect()
    }

    /// At most `n` of the best recommendations for `condition`.
    pub fn top(&self, condition: &str, temperature_celsius: f64, n: usize) -> Vec<ActivityRecommendation> {
        let mut recs = self.lookup(condition, temperature_celsius);
        recs.truncate(n);
        recs
    }
}

/// Turn an activity key like `outdoor_café` into `Outdoor Café`.
pub fn humanize(activity: &str) -> String {
    activity
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{humanize, RuleTable, DESCRIPTIONS, FALLBACK_DESCRIPTION};
    use crate::predictor::Condition;

    #[test]
    fn test_lookup_sorted_stable() {
        let table = RuleTable::new();
        let recs = table.lookup("sunny", 20.0);
        let order: Vec<&str> = recs.iter().map(|r| r.activity.as_str()).collect();

        // hiking and outdoor_café tie at 8 and keep their declared order
        assert_eq!(vec!["beach", "hiking", "outdoor_café", "city_tour"], order);
    }

    #[test]
    fn test_lookup_rainy() {
        let table = RuleTable::new();
        let recs = table.top("rainy", 12.0, 3);
        let order: Vec<(&str, u8)> = recs.iter().map(|r| (r.activity.as_str(), r.score)).collect();

        assert_eq!(vec![("museum", 9), ("cinema", 9), ("indoor_shopping", 8)], order);
    }

    #[test]
    fn test_lookup_unknown_condition() {
        let table = RuleTable::new();
        assert!(table.lookup("unknown", 10.0).is_empty());
        assert!(table.top("", 10.0, 3).is_empty());
    }

    #[test]
    fn test_top_every_condition() {
        let table = RuleTable::new();

        for condition in Condition::ALL {
            let recs = table.top(condition.as_str(), 5.0, 3);
            assert!(!recs.is_empty());
            assert!(recs.len() <= 3);
            assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));

            for rec in &recs {
                assert!(rec.score <= 10);
                assert!(DESCRIPTIONS.iter().any(|(_, d)| *d == rec.description));
            }
        }
    }

    #[test]
    fn test_lookup_deterministic() {
        let table = RuleTable::new();

        for condition in Condition::ALL {
            assert_eq!(table.top(condition.as_str(), 1.5, 3), table.top(condition.as_str(), 1.5, 3));
        }
    }

    #[test]
    fn test_every_scored_activity_has_description() {
        let table = RuleTable::new();

        for condition in Condition::ALL {
            for (activity, _) in table.scores(condition) {
                assert_ne!(FALLBACK_DESCRIPTION, table.description(activity));
            }
        }
        assert_eq!(FALLBACK_DESCRIPTION, table.description("juggling"));
    }

    #[test]
    fn test_rationale() {
        let table = RuleTable::new();
        let recs = table.top("snowy", -3.27, 1);

        assert_eq!("Skiing is great with snowy weather at -3.3°C", recs[0].rationale);
    }

    #[test]
    fn test_rationale_condition_lowercase() {
        let table = RuleTable::new();
        let recs = table.top("Rainy", 12.0, 1);

        assert_eq!("Museum is great with rainy weather at 12.0°C", recs[0].rationale);
    }

    #[test]
    fn test_humanize() {
        assert_eq!("Outdoor Café", humanize("outdoor_café"));
        assert_eq!("City Tour", humanize("city_tour"));
        assert_eq!("Spa", humanize("spa"));
    }
}
