// 🏛️ State Registry - closed set of 28 entities
//
// Source tables spell state names inconsistently ("TAMIL NADU", "Orissa",
// " Goa "). Every label goes through `resolve_state` so the cleaned data only
// ever carries canonical names.

use std::collections::HashMap;
use std::sync::LazyLock;

// ============================================================================
// STATE ENTITY
// ============================================================================

/// A recognized state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct State {
    /// Canonical name (the one written to cleaned data)
    pub name: &'static str,

    /// Two-letter code used for bar labels
    pub initials: &'static str,

    /// Alternative spellings seen in older RBI/CAG tables
    pub aliases: &'static [&'static str],
}

impl State {
    const fn new(name: &'static str, initials: &'static str) -> Self {
        State {
            name,
            initials,
            aliases: &[],
        }
    }

    const fn with_aliases(
        name: &'static str,
        initials: &'static str,
        aliases: &'static [&'static str],
    ) -> Self {
        State {
            name,
            initials,
            aliases,
        }
    }

    /// Check if a label names this state (canonical name or any alias)
    pub fn matches(&self, label: &str) -> bool {
        let key = normalize_key(label);
        normalize_key(self.name) == key || self.aliases.iter().any(|a| normalize_key(a) == key)
    }
}

/// The 28 states, in registry order
pub static STATES: [State; 28] = [
    State::new("Andhra Pradesh", "AP"),
    State::new("Arunachal Pradesh", "AR"),
    State::new("Assam", "AS"),
    State::new("Bihar", "BR"),
    State::with_aliases("Chhattisgarh", "CG", &["Chattisgarh"]),
    State::new("Goa", "GA"),
    State::new("Gujarat", "GJ"),
    State::new("Haryana", "HR"),
    State::new("Himachal Pradesh", "HP"),
    State::new("Jharkhand", "JH"),
    State::new("Karnataka", "KA"),
    State::new("Kerala", "KL"),
    State::new("Madhya Pradesh", "MP"),
    State::new("Maharashtra", "MH"),
    State::new("Manipur", "MN"),
    State::new("Meghalaya", "ML"),
    State::new("Mizoram", "MZ"),
    State::new("Nagaland", "NL"),
    State::with_aliases("Odisha", "OR", &["Orissa"]),
    State::new("Punjab", "PB"),
    State::new("Rajasthan", "RJ"),
    State::new("Sikkim", "SK"),
    State::new("Tamil Nadu", "TN"),
    State::with_aliases("Telangana", "TS", &["Telengana"]),
    State::new("Tripura", "TR"),
    State::new("Uttar Pradesh", "UP"),
    State::with_aliases("Uttarakhand", "UK", &["Uttaranchal"]),
    State::new("West Bengal", "WB"),
];

/// Row labels that mean "sum over all states"
const GRAND_TOTAL_LABELS: &[&str] = &["total", "all states", "india total", "grand total"];

static LOOKUP: LazyLock<HashMap<String, &'static State>> = LazyLock::new(|| {
    let mut lookup = HashMap::new();
    for state in STATES.iter() {
        lookup.insert(normalize_key(state.name), state);
        for alias in state.aliases {
            lookup.insert(normalize_key(alias), state);
        }
    }
    lookup
});

// ============================================================================
// LOOKUPS
// ============================================================================

/// Lowercase and collapse internal whitespace
fn normalize_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolve a raw label to its registry entry
pub fn resolve_state(label: &str) -> Option<&'static State> {
    LOOKUP.get(&normalize_key(label)).copied()
}

/// Canonical name for a raw label, if it is a known state
pub fn canonical_name(label: &str) -> Option<&'static str> {
    resolve_state(label).map(|s| s.name)
}

/// Two-letter code for a canonical (or alias) state name
pub fn initials(label: &str) -> Option<&'static str> {
    resolve_state(label).map(|s| s.initials)
}

/// Canonical names in registry order
pub fn state_names() -> impl Iterator<Item = &'static str> {
    STATES.iter().map(|s| s.name)
}

/// True for any case/whitespace variant of a grand-total label
pub fn is_grand_total(label: &str) -> bool {
    let key = normalize_key(label);
    GRAND_TOTAL_LABELS.contains(&key.as_str())
}
