// Copyright 2023 Remi Bernotavicius

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub unit: String,
    pub amount: i64,
}

impl fmt::Display for ShoppingListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) — {}", self.name, self.unit, self.amount)
    }
}

/// Ingredient totals across every recipe in a shopping list, in the order each name first appears.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShoppingList {
    items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    /// Sums `(name, unit, amount)` rows by ingredient name. Units are not reconciled: when one
    /// name shows up with different units, the amounts still add up and the unit seen last is the
    /// one displayed.
    pub fn aggregate<I, N, U>(rows: I) -> Self
    where
        I: IntoIterator<Item = (N, U, i32)>,
        N: Into<String> + AsRef<str>,
        U: Into<String>,
    {
        let mut items: Vec<ShoppingListItem> = vec![];
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (name, unit, amount) in rows {
            if let Some(&index) = by_name.get(name.as_ref()) {
                let item = &mut items[index];
                item.amount += i64::from(amount);
                item.unit = unit.into();
            } else {
                let name = name.into();
                by_name.insert(name.clone(), items.len());
                items.push(ShoppingListItem {
                    name,
                    unit: unit.into(),
                    amount: amount.into(),
                });
            }
        }
        Self { items }
    }

    pub fn items(&self) -> &[ShoppingListItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The downloadable `cart.txt` body, one item per line.
impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{item} ")?;
        }
        Ok(())
    }
}

#[test]
fn shopping_list_item() {
    let item = ShoppingListItem {
        name: "Sugar".into(),
        unit: "g".into(),
        amount: 150,
    };
    assert_eq!(item.to_string(), "Sugar (g) — 150");
}

#[test]
fn amounts_sum_by_name() {
    let list = ShoppingList::aggregate([("Sugar", "g", 100), ("Milk", "ml", 200), ("Sugar", "g", 50)]);
    assert_eq!(list.to_string(), "Sugar (g) — 150 \nMilk (ml) — 200 \n");
}

#[test]
fn first_seen_order() {
    let list = ShoppingList::aggregate([
        ("Eggs", "pcs", 2),
        ("Flour", "g", 300),
        ("Eggs", "pcs", 1),
        ("Butter", "g", 40),
    ]);
    let names: Vec<_> = list.items().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["Eggs", "Flour", "Butter"]);
    assert_eq!(list.items()[0].amount, 3);
}

#[test]
fn empty_list_renders_nothing() {
    let list = ShoppingList::aggregate(Vec::<(String, String, i32)>::new());
    assert!(list.is_empty());
    assert_eq!(list.to_string(), "");
}

#[test]
fn mismatched_units_keep_last() {
    let list = ShoppingList::aggregate([("Salt", "g", 5), ("Salt", "tsp", 1)]);
    assert_eq!(
        list.items(),
        [ShoppingListItem {
            name: "Salt".into(),
            unit: "tsp".into(),
            amount: 6,
        }]
    );
}

#[test]
fn totals_do_not_overflow_i32() {
    let list = ShoppingList::aggregate([("Rice", "g", i32::MAX), ("Rice", "g", i32::MAX)]);
    assert_eq!(list.items()[0].amount, 2 * i64::from(i32::MAX));
}
