//! Builds the dispenser menu from the recipe catalog and pump registry,
//! and recomputes its visibility and labels.

use crate::menu::{LeafAction, MenuTree};
use crate::recipes::{RecipeCatalog, same_ingredient};
use crate::registry::PumpRegistry;

pub const ROOT_LABEL: &str = "Main Menu";
pub const CONFIGURE_LABEL: &str = "Configure";
pub const CLEAN_LABEL: &str = "Clean";
pub const TEST_PUMPS_LABEL: &str = "Test Pumps";
/// Option that leaves a slot empty.
pub const EMPTY_OPTION: &str = "Empty";
/// Suffix marking the option currently loaded in a slot.
pub const SELECTED_MARKER: &str = " *";

/// ```text
/// Main Menu
///   <one leaf per recipe>
///   Configure
///     <one sub-menu per slot>
///       <one leaf per ingredient option>, Empty, Back
///     Clean
///     Test Pumps
///     Back
/// ```
///
/// Labels and visibility are left at their defaults; call
/// [`apply_filters`] before the first render.
pub fn build_menu(catalog: &RecipeCatalog, registry: &PumpRegistry) -> MenuTree {
    let mut tree = MenuTree::new(ROOT_LABEL);
    let root = tree.root();

    for recipe in catalog.recipes() {
        tree.add_leaf(
            root,
            recipe.name.clone(),
            LeafAction::Drink {
                recipe: recipe.name.clone(),
            },
        );
    }

    let configure = tree.add_submenu(root, CONFIGURE_LABEL);
    for slot in registry.slots() {
        let pump = tree.add_submenu(configure, slot.name());
        for option in catalog.options() {
            tree.add_leaf(
                pump,
                option.name.clone(),
                LeafAction::AssignPump {
                    slot: slot.key().to_owned(),
                    ingredient: Some(option.value.clone()),
                    option: option.name.clone(),
                },
            );
        }
        tree.add_leaf(
            pump,
            EMPTY_OPTION,
            LeafAction::AssignPump {
                slot: slot.key().to_owned(),
                ingredient: None,
                option: EMPTY_OPTION.to_owned(),
            },
        );
        tree.add_back(pump);
    }
    tree.add_leaf(configure, CLEAN_LABEL, LeafAction::Clean);
    tree.add_leaf(configure, TEST_PUMPS_LABEL, LeafAction::TestPumps);
    tree.add_back(configure);

    tree
}

/// Recompute drink visibility and option labels from the registry.
///
/// * A drink is visible iff every one of its ingredients is loaded in
///   some slot.  Drinks no longer in the catalog are hidden.
/// * An option is labelled `"<name> *"` when it is what the slot holds.
///
/// Pure in `(catalog, registry)`: applying it twice changes nothing.
pub fn apply_filters(tree: &mut MenuTree, catalog: &RecipeCatalog, registry: &PumpRegistry) {
    let updates: Vec<_> = tree
        .leaves()
        .map(|(id, action)| match action {
            LeafAction::Drink { recipe } => {
                let available = catalog.get(recipe).is_some_and(|r| {
                    r.ingredients
                        .keys()
                        .all(|ingredient| registry.resolve(ingredient).is_some())
                });
                (id, available, None)
            }
            LeafAction::AssignPump {
                slot,
                ingredient,
                option,
            } => {
                let loaded = registry.slot(slot).map(|s| s.ingredient());
                let selected = match (loaded, ingredient) {
                    (Some(Some(current)), Some(wanted)) => same_ingredient(current, wanted),
                    (Some(None), None) => true,
                    _ => false,
                };
                let label = if selected {
                    format!("{option}{SELECTED_MARKER}")
                } else {
                    option.clone()
                };
                (id, true, Some(label))
            }
            LeafAction::Clean | LeafAction::TestPumps => (id, true, None),
        })
        .collect();

    for (id, visible, label) in updates {
        tree.set_visible(id, visible);
        if let Some(label) = label {
            tree.set_label(id, label);
        }
    }
}
