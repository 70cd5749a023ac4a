//! Gift catalog
//!
//! Immutable registry of gift definitions. The catalog is built once and then
//! shared behind `Arc`; there is no mutation API, so score reconstruction from
//! an event log always sees the same point values.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Gift rarity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Full-screen effect played when the gift lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    Sparkle,
    Hearts,
    Fireworks,
    Flames,
    Galaxy,
}

/// One purchasable gift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftDefinition {
    pub id: String,
    pub name: String,
    /// SoftPoints added to the recipient's score per unit
    pub point_value: u64,
    /// Nominal real-currency value per unit (display only)
    pub usd_value: f64,
    pub rarity: Rarity,
    /// None for gifts without a special effect
    pub effect_type: Option<EffectType>,
}

impl GiftDefinition {
    pub fn new(id: &str, name: &str, point_value: u64, usd_value: f64, rarity: Rarity) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            point_value,
            usd_value,
            rarity,
            effect_type: None,
        }
    }

    pub fn with_effect(mut self, effect: EffectType) -> Self {
        self.effect_type = Some(effect);
        self
    }

    pub fn has_special_effect(&self) -> bool {
        self.effect_type.is_some()
    }
}

/// Builder for a GiftCatalog
#[derive(Debug, Default)]
pub struct GiftCatalogBuilder {
    gifts: Vec<GiftDefinition>,
}

impl GiftCatalogBuilder {
    /// Register a gift; ids must be unique and point values positive
    pub fn register(mut self, gift: GiftDefinition) -> Result<Self> {
        if gift.id.trim().is_empty() {
            return Err(Error::Validation("gift id must not be empty".to_string()));
        }
        if gift.point_value == 0 {
            return Err(Error::Validation(format!(
                "gift {} must have a positive point value",
                gift.id
            )));
        }
        if self.gifts.iter().any(|g| g.id == gift.id) {
            return Err(Error::Validation(format!("duplicate gift id: {}", gift.id)));
        }
        self.gifts.push(gift);
        Ok(self)
    }

    pub fn build(self) -> GiftCatalog {
        let index = self
            .gifts
            .iter()
            .enumerate()
            .map(|(i, g)| (g.id.clone(), i))
            .collect();
        GiftCatalog {
            gifts: self.gifts,
            index,
        }
    }
}

/// Read-only gift lookup table
#[derive(Debug, Clone)]
pub struct GiftCatalog {
    /// Registration order, used for listing
    gifts: Vec<GiftDefinition>,
    index: HashMap<String, usize>,
}

impl GiftCatalog {
    pub fn builder() -> GiftCatalogBuilder {
        GiftCatalogBuilder::default()
    }

    /// The platform's standard gift set
    pub fn standard() -> Self {
        let gifts = [
            GiftDefinition::new("rose", "Rose", 1, 0.01, Rarity::Common),
            GiftDefinition::new("heart", "Heart", 5, 0.05, Rarity::Common),
            GiftDefinition::new("star", "Star", 10, 0.10, Rarity::Common)
                .with_effect(EffectType::Sparkle),
            GiftDefinition::new("crown", "Crown", 50, 0.50, Rarity::Rare)
                .with_effect(EffectType::Hearts),
            GiftDefinition::new("rocket", "Rocket", 100, 1.00, Rarity::Epic)
                .with_effect(EffectType::Fireworks),
            GiftDefinition::new("dragon", "Dragon", 500, 5.00, Rarity::Legendary)
                .with_effect(EffectType::Flames),
            GiftDefinition::new("universe", "Universe", 1000, 10.00, Rarity::Legendary)
                .with_effect(EffectType::Galaxy),
        ];

        GiftCatalogBuilder {
            gifts: gifts.into_iter().collect(),
        }
        .build()
    }

    /// Look up a gift; unknown ids are a ValidationError
    pub fn lookup(&self, gift_id: &str) -> Result<&GiftDefinition> {
        self.index
            .get(gift_id)
            .map(|&i| &self.gifts[i])
            .ok_or_else(|| Error::Validation(format!("unknown gift id: {}", gift_id)))
    }

    pub fn contains(&self, gift_id: &str) -> bool {
        self.index.contains_key(gift_id)
    }

    /// All gifts in registration order
    pub fn gifts(&self) -> &[GiftDefinition] {
        &self.gifts
    }

    pub fn len(&self) -> usize {
        self.gifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gifts.is_empty()
    }
}

impl Default for GiftCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_lookup() {
        let catalog = GiftCatalog::standard();
        let dragon = catalog.lookup("dragon").expect("dragon exists");
        assert_eq!(dragon.point_value, 500);
        assert_eq!(dragon.rarity, Rarity::Legendary);
        assert!(dragon.has_special_effect());

        let rose = catalog.lookup("rose").expect("rose exists");
        assert!(!rose.has_special_effect());
    }

    #[test]
    fn test_standard_catalog_passes_registration_rules() {
        let standard = GiftCatalog::standard();
        let rebuilt = standard
            .gifts()
            .iter()
            .cloned()
            .try_fold(GiftCatalog::builder(), |b, g| b.register(g))
            .expect("standard set is valid")
            .build();
        assert_eq!(rebuilt.len(), standard.len());
    }

    #[test]
    fn test_unknown_gift_is_validation_error() {
        let catalog = GiftCatalog::standard();
        assert!(matches!(catalog.lookup("unicorn"), Err(Error::Validation(_))));
        assert!(!catalog.contains("unicorn"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = GiftCatalog::builder()
            .register(GiftDefinition::new("a", "A", 1, 0.01, Rarity::Common))
            .and_then(|b| b.register(GiftDefinition::new("a", "A2", 2, 0.02, Rarity::Rare)));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_point_value_rejected() {
        let result = GiftCatalog::builder().register(GiftDefinition::new("free", "Free", 0, 0.0, Rarity::Common));
        assert!(result.is_err());
    }

    #[test]
    fn test_listing_preserves_registration_order() {
        let catalog = GiftCatalog::builder()
            .register(GiftDefinition::new("b", "B", 2, 0.02, Rarity::Common))
            .and_then(|b| b.register(GiftDefinition::new("a", "A", 1, 0.01, Rarity::Common)))
            .expect("valid")
            .build();
        let ids: Vec<&str> = catalog.gifts().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
