// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tag-driven catalog pre-filtering.
//!
//! Classification tags are mapped to catalog query terms through a static
//! rule table. Rules are grouped in blocks: in an [`RuleBlock::Every`] block
//! each matching rule contributes its terms, in a [`RuleBlock::FirstMatch`]
//! block only the first matching rule does.

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::tags::{split_terms, Classification};

/// Holds when tag `tag` is truthy and, if `any_of` is non-empty, one of its
/// split terms equals one of `any_of`.
#[derive(Debug, Clone, Copy)]
pub struct Condition {
    pub tag: &'static str,
    pub any_of: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// At least one must hold
    pub when: &'static [Condition],
    /// Must also hold when present
    pub and: Option<Condition>,
    /// Rule is skipped when this tag is truthy
    pub unless: Option<&'static str>,
    pub terms: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub enum RuleBlock {
    Every(&'static [Rule]),
    FirstMatch(&'static [Rule]),
}

const fn on(tag: &'static str, any_of: &'static [&'static str]) -> Condition {
    Condition { tag, any_of }
}

const fn rule(when: &'static [Condition], terms: &'static [&'static str]) -> Rule {
    Rule {
        when,
        and: None,
        unless: None,
        terms,
    }
}

const fn rule_unless(
    when: &'static [Condition],
    unless: &'static str,
    terms: &'static [&'static str],
) -> Rule {
    Rule {
        when,
        and: None,
        unless: Some(unless),
        terms,
    }
}

const LIGHTING: &[&str] = &["46", "lights", "light"];
const RADIO_TOWER: &[&str] = &["radio tower", "telecom tower"];
const MOSQUE: &[&str] = &["minaret", "mosque"];
const STORAGE: &[&str] = &["gasometer", "storage_tank", "fuel", "tank"];

/// The keyword rule table
pub static RULES: &[RuleBlock] = &[
    RuleBlock::Every(&[rule(
        &[on("leisure", &["stadium", "ice_rink", "sports_centre", "sports_hall"]), on("sport", &[])],
        &["66", "sport"],
    )]),
    RuleBlock::FirstMatch(&[
        rule(&[on("religion", &["muslim"])], MOSQUE),
        rule(&[on("religion", &["jewish"])], &["synagogue"]),
        rule(&[on("religion", &["christian"])], &["church", "presbytery", "cathedral", "chapel"]),
        rule(&[on("religion", &["buddhist", "shinto"])], &["temple", "shrine", "monastery"]),
        rule(&[on("religion", &[])], &["7", "40"]),
    ]),
    RuleBlock::FirstMatch(&[
        rule(&[on("building", &["hangar"])], &["has", "hangar", "ft shelter"]),
        rule(&[on("building", &["mosque", "minaret", "muslim"])], MOSQUE),
    ]),
    RuleBlock::Every(&[
        rule(
            &[on("building", &["cathedral", "chapel", "presbytery"])],
            &["church", "presbytery", "cathedral", "chapel", "monastery"],
        ),
        rule(&[on("building", &["warehouse"])], &["12", "warehouse"]),
        rule(&[on("building", &["synagogue"])], &["synagogue"]),
        rule(&[on("building", &["shrine"])], &["shrine"]),
        rule(&[on("building", &["temple"])], &["temple", "monastery"]),
    ]),
    RuleBlock::Every(&[
        rule(&[on("aeroway", &["terminal"])], &["terminal"]),
        rule(
            &[on("aeroway", &["apron"])],
            &["39", "45", "hangar", "terminal", "depot", "warehouse"],
        ),
    ]),
    RuleBlock::FirstMatch(&[
        rule(&[on("aeroway", &["heliport", "helipad"])], &["helipad", "13"]),
        rule(&[on("aeroway", &["windsock"])], &["windsock"]),
        rule(&[on("aeroway", &["arresting_gear"])], &["68"]),
        rule(&[on("aeroway", &["navigationaid"])], &["25", "localizer", "tacan", "beacon"]),
        rule(&[on("aeroway", &["tower"])], &["2"]),
    ]),
    RuleBlock::Every(&[
        rule(&[on("barrier", &["border_control"])], &["55"]),
        rule(&[on("barrier", &["fence"])], &["49"]),
    ]),
    RuleBlock::FirstMatch(&[
        rule(&[on("man_made", &["beacon"])], &["beacon"]),
        rule(&[on("man_made", &["flare", "chimney"])], &["61", "51", "release value"]),
        rule(&[on("man_made", &["lighting"])], LIGHTING),
    ]),
    RuleBlock::Every(&[
        rule(&[on("tower", &["watchtower", "observation"])], &["watchtower"]),
        rule(&[on("tower", &["monitoring", "communication", "na"])], RADIO_TOWER),
        rule(&[on("tower", &["lighting"])], LIGHTING),
        rule(&[on("tower", &["minaret"])], MOSQUE),
        rule(&[on("tower", &["radar"])], &["radar"]),
        rule(&[on("tower", &["control", "traffic"])], &["2"]),
    ]),
    // man_made towers only count when there is no dedicated tower tag
    RuleBlock::FirstMatch(&[
        Rule {
            when: &[on("man_made", &["tower"])],
            and: Some(on("service", &["aircraft_control"])),
            unless: Some("tower"),
            terms: &["2"],
        },
        rule_unless(&[on("man_made", &["tower"])], "tower", &["61", "tower"]),
    ]),
    RuleBlock::Every(&[
        rule_unless(&[on("man_made", &["cooling_tower"])], "tower", &["53"]),
        rule_unless(
            &[on("man_made", &["communications_tower", "antenna", "satellite_dish", "telescope"])],
            "tower",
            &["29", "43", "antenna", "33", "28", "satellite"],
        ),
        rule_unless(&[on("man_made", &["communications_tower"])], "tower", RADIO_TOWER),
    ]),
    RuleBlock::Every(&[
        rule(
            &[on("power", &["compensator", "plant", "substation", "busbar"])],
            &["23", "converter", "32", "processor", "Generator", "Forge"],
        ),
        rule(&[on("power", &["tower", "terminal", "connection"])], &["20"]),
        rule(&[on("power", &["converter"])], &["converter"]),
        rule(&[on("power", &["transformer"])], &["transformer"]),
        rule(&[on("power", &["heliostat"])], &["Solar Mirrors"]),
    ]),
    RuleBlock::Every(&[
        rule(
            &[on("man_made", &["pump", "pumping_station", "works"]), on("building", &["industrial"])],
            &["32", "53", "60", "56", "23", "6"],
        ),
        rule(&[on("man_made", &["pipeline"])], &["piping"]),
        rule(&[on("building", STORAGE), on("man_made", STORAGE)], &["48", "fuel", "gas"]),
        rule(&[on("building", &["silo"]), on("man_made", &["silo"])], &["silo"]),
        rule(&[on("building", &["water_tower"]), on("man_made", &["water_tower"])], &["37"]),
        rule(
            &[on("building", &["bridge", "bridges"]), on("man_made", &["bridge", "bridges"]), on("bridge", &[])],
            &["16"],
        ),
        rule(&[on("building", &["hospital"]), on("amenity", &["hospital"])], &["62"]),
        rule(&[on("military", &["bunker"]), on("building", &["bunker"])], &["4", "bunker"]),
        rule(
            &[on("building", &["barrack", "barracks"]), on("military", &["barrack", "barracks"])],
            &["12", "35", "10"],
        ),
        rule(
            &[on("military", &["ammo", "ammunition", "munition"])],
            &["ammo", "ammunition", "munition", "bunker"],
        ),
    ]),
];

impl Condition {
    pub fn holds(&self, class: &Classification) -> bool {
        let Some(text) = class.text(self.tag) else {
            return false;
        };
        if self.any_of.is_empty() {
            return true;
        }
        split_terms(&text).iter().any(|term| self.any_of.contains(&term.as_str()))
    }
}

impl Rule {
    pub fn matches(&self, class: &Classification) -> bool {
        if self.unless.is_some_and(|tag| class.text(tag).is_some()) {
            return false;
        }
        self.when.iter().any(|c| c.holds(class)) && self.and.map_or(true, |c| c.holds(class))
    }
}

/// Catalog query terms implied by a structure's classification tags.
pub fn filter_terms(class: &Classification) -> Vec<&'static str> {
    let mut terms = Vec::new();
    for block in RULES {
        match block {
            RuleBlock::Every(rules) => {
                for rule in rules.iter().filter(|r| r.matches(class)) {
                    terms.extend_from_slice(rule.terms);
                }
            }
            RuleBlock::FirstMatch(rules) => {
                if let Some(rule) = rules.iter().find(|r| r.matches(class)) {
                    terms.extend_from_slice(rule.terms);
                }
            }
        }
    }
    terms
}

/// Narrow `catalog` for one structure.
///
/// A truthy `bms` tag is used as a direct catalog query first. Otherwise the
/// rule table terms are joined into one query. `None` means the caller should
/// fall back to its full catalog.
pub fn preselect(catalog: &Catalog, class: &Classification) -> Option<Catalog> {
    if let Some(direct) = class.text("bms") {
        let models = catalog.query(&direct);
        if !models.is_empty() {
            debug!(query = %direct, models = models.len(), "direct bms type");
            return Some(models);
        }
        warn!(query = %direct, "no models for direct bms type");
    }

    let terms = filter_terms(class);
    if terms.is_empty() {
        debug!("no catalog filters apply");
        return None;
    }

    let query = terms.join(", ");
    let models = catalog.query(&query);
    if models.is_empty() {
        warn!(query = %query, "auto selection found no models");
        None
    } else {
        debug!(query = %query, models = models.len(), "auto selected models");
        Some(models)
    }
}
