//! Recipe catalog and the list of ingredients a pump can be loaded with.
//!
//! The catalog is static for the life of the process: either the built-in
//! bar menu or a JSON file named by `recipes_path`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A named mapping from ingredient to quantity (mL).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub ingredients: BTreeMap<String, f64>,
}

/// An ingredient a slot can be configured with.  `value` is what gets
/// stored in the pump table and matched against recipe ingredients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientOption {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
    options: Vec<IngredientOption>,
}

/// Ingredient comparison used everywhere a recipe meets a pump.
pub fn same_ingredient(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl RecipeCatalog {
    pub fn new(
        recipes: Vec<Recipe>,
        options: Vec<IngredientOption>,
    ) -> Result<Self, ConfigError> {
        let catalog = Self { recipes, options };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a `{ "recipes": [..], "options": [..] }` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let catalog: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (i, recipe) in self.recipes.iter().enumerate() {
            if recipe.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("recipe #{i} has no name")));
            }
            if self.recipes[..i]
                .iter()
                .any(|r| same_ingredient(&r.name, &recipe.name))
            {
                return Err(ConfigError::Invalid(format!(
                    "duplicate recipe '{}'",
                    recipe.name
                )));
            }
            if recipe.ingredients.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "recipe '{}' has no ingredients",
                    recipe.name
                )));
            }
            let names: Vec<&String> = recipe.ingredients.keys().collect();
            for (j, (ingredient, qty)) in recipe.ingredients.iter().enumerate() {
                if !qty.is_finite() || *qty <= 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "recipe '{}': quantity of '{ingredient}' must be > 0",
                        recipe.name
                    )));
                }
                if names[..j].iter().any(|n| same_ingredient(n, ingredient)) {
                    return Err(ConfigError::Invalid(format!(
                        "recipe '{}' lists '{ingredient}' twice",
                        recipe.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn options(&self) -> &[IngredientOption] {
        &self.options
    }

    /// Exact lookup by name.
    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.name == name)
    }

    /// Case- and whitespace-insensitive lookup, for free-text commands.
    pub fn find(&self, text: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| same_ingredient(&r.name, text))
    }
}

impl Default for RecipeCatalog {
    fn default() -> Self {
        fn recipe(name: &str, parts: &[(&str, f64)]) -> Recipe {
            Recipe {
                name: name.to_owned(),
                ingredients: parts.iter().map(|(i, q)| ((*i).to_owned(), *q)).collect(),
            }
        }
        fn option(name: &str, value: &str) -> IngredientOption {
            IngredientOption {
                name: name.to_owned(),
                value: value.to_owned(),
            }
        }

        Self {
            recipes: vec![
                recipe("Gin & Tonic", &[("gin", 50.0), ("tonic", 150.0)]),
                recipe("Rum & Coke", &[("rum", 50.0), ("coke", 150.0)]),
                recipe("Screwdriver", &[("vodka", 50.0), ("oj", 150.0)]),
                recipe("Margarita", &[("tequila", 50.0), ("mmix", 150.0)]),
                recipe("Vodka Tonic", &[("vodka", 50.0), ("tonic", 150.0)]),
                recipe("Tequila Sunrise", &[("tequila", 50.0), ("oj", 150.0)]),
                recipe(
                    "Long Island",
                    &[
                        ("gin", 15.0),
                        ("rum", 15.0),
                        ("vodka", 15.0),
                        ("tequila", 15.0),
                        ("coke", 100.0),
                        ("oj", 30.0),
                    ],
                ),
            ],
            options: vec![
                option("Gin", "gin"),
                option("Rum", "rum"),
                option("Vodka", "vodka"),
                option("Tequila", "tequila"),
                option("Tonic Water", "tonic"),
                option("Coke", "coke"),
                option("Orange Juice", "oj"),
                option("Margarita Mix", "mmix"),
            ],
        }
    }
}
