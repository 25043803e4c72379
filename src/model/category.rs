//! The static catalog of spending categories.

/// The fallback category applied when an extraction carries no category or one
/// that is not in the catalog.
const OTHERS: &str = "💳 Others";

/// The full catalog, in the order categories are shown in the picker.
const STANDARD: &[&str] = &[
    "🍔 Food & Dining",
    "🚗 Transportation",
    "🛍️ Shopping",
    "🏠 Bills & Utilities",
    "💊 Healthcare",
    "🎬 Entertainment",
    "✈️ Travel",
    "🎓 Education",
    "💰 Investments",
    "🎁 Gifts",
    "👕 Clothing",
    "🏋️ Fitness",
    "💻 Technology",
    "🔧 Maintenance",
    "📱 Subscriptions",
    "🍺 Social",
    "🐕 Pets",
    "📚 Books",
    "💇 Personal Care",
    "🎮 Gaming",
    "☕ Coffee/Drinks",
    "🏪 Groceries",
    "⛽ Fuel",
    "🅿️ Parking",
    "🚕 Ride-sharing",
    "📦 Delivery",
    OTHERS,
];

/// An ordered, read-only catalog of spending categories. Pure lookup; holds no
/// state beyond the static entries it points at.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CategoryRegistry {
    entries: &'static [&'static str],
    fallback: &'static str,
}

impl CategoryRegistry {
    /// The standard catalog used by the bot.
    pub const fn standard() -> Self {
        Self {
            entries: STANDARD,
            fallback: OTHERS,
        }
    }

    pub fn entries(&self) -> &'static [&'static str] {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The entry at `index`, or `None` when the index is out of bounds.
    pub fn get(&self, index: usize) -> Option<&'static str> {
        self.entries.get(index).copied()
    }

    pub fn fallback(&self) -> &'static str {
        self.fallback
    }

    /// Maps a claimed category name to a catalog entry, falling back to
    /// [`CategoryRegistry::fallback`] when the name is absent or unknown. The
    /// returned string is always one of the catalog entries.
    pub fn resolve(&self, name: Option<&str>) -> &'static str {
        match name {
            Some(name) => {
                let name = name.trim();
                self.entries
                    .iter()
                    .find(|entry| **entry == name)
                    .copied()
                    .unwrap_or_else(|| self.fallback())
            }
            None => self.fallback(),
        }
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_index() {
        let registry = CategoryRegistry::standard();
        assert_eq!(registry.get(0), Some("🍔 Food & Dining"));
        assert_eq!(registry.get(registry.len() - 1), Some("💳 Others"));
        assert_eq!(registry.get(registry.len()), None);
    }

    #[test]
    fn test_resolve_known_name() {
        let registry = CategoryRegistry::standard();
        assert_eq!(registry.resolve(Some("☕ Coffee/Drinks")), "☕ Coffee/Drinks");
        assert_eq!(registry.resolve(Some("  🏪 Groceries ")), "🏪 Groceries");
    }

    #[test]
    fn test_resolve_unknown_falls_back() {
        let registry = CategoryRegistry::standard();
        assert_eq!(registry.resolve(Some("Lottery")), "💳 Others");
        assert_eq!(registry.resolve(None), "💳 Others");
        assert_eq!(registry.resolve(Some("")), "💳 Others");
    }

    #[test]
    fn test_fallback_is_a_catalog_entry() {
        let registry = CategoryRegistry::standard();
        assert!(registry.entries().contains(&registry.fallback()));
    }
}
