// Copyright 2023 Remi Bernotavicius

use crate::database::models::{IngredientId, TagId};
use std::collections::HashSet;

pub const MAX_RECIPE_NAME_LEN: usize = 200;
pub const MAX_USERNAME_LEN: usize = 150;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Checks a submitted ingredient list and narrows the amounts to what the database stores.
pub fn recipe_ingredients(entries: &[(IngredientId, i64)]) -> Result<Vec<(IngredientId, i32)>> {
    if entries.is_empty() {
        return Err(ValidationError::new("a recipe needs at least one ingredient"));
    }
    let mut seen = HashSet::new();
    let mut checked = Vec::with_capacity(entries.len());
    for &(id, amount) in entries {
        if !seen.insert(id) {
            return Err(ValidationError::new("ingredients must not repeat"));
        }
        if amount <= 0 {
            return Err(ValidationError::new(
                "ingredient amount must be greater than 0",
            ));
        }
        let amount = i32::try_from(amount)
            .map_err(|_| ValidationError::new(format!("ingredient amount {amount} is too large")))?;
        checked.push((id, amount));
    }
    Ok(checked)
}

pub fn cooking_time(minutes: i64) -> Result<i32> {
    if minutes < 1 {
        return Err(ValidationError::new("cooking time must be at least 1 minute"));
    }
    i32::try_from(minutes)
        .map_err(|_| ValidationError::new(format!("cooking time {minutes} is too large")))
}

pub fn recipe_tags(ids: &[TagId]) -> Result<()> {
    if ids.is_empty() {
        return Err(ValidationError::new("a recipe needs at least one tag"));
    }
    let unique: HashSet<_> = ids.iter().collect();
    if unique.len() != ids.len() {
        return Err(ValidationError::new("tags must not repeat"));
    }
    Ok(())
}

pub fn recipe_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("recipe name must not be empty"));
    }
    if name.chars().count() > MAX_RECIPE_NAME_LEN {
        return Err(ValidationError::new(format!(
            "recipe name must be at most {MAX_RECIPE_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn recipe_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ValidationError::new("recipe text must not be empty"));
    }
    Ok(())
}

fn is_alpha(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | 'а'..='я' | 'А'..='Я')
}

/// Names and usernames may only hold Latin or Cyrillic letters.
pub fn alpha(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || !value.chars().all(is_alpha) {
        return Err(ValidationError::new(format!(
            "{field} must consist of letters only"
        )));
    }
    Ok(())
}

pub fn username(value: &str) -> Result<()> {
    alpha("username", value)?;
    if value.chars().count() > MAX_USERNAME_LEN {
        return Err(ValidationError::new(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn email(value: &str) -> Result<()> {
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::new(format!(
            "{value:?} is not a valid email address"
        ))),
    }
}

pub fn password(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ValidationError::new("password must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(id: i32) -> IngredientId {
        id.into()
    }

    fn tag(id: i32) -> TagId {
        id.into()
    }

    #[test]
    fn duplicate_ingredient_rejected() {
        let err = recipe_ingredients(&[(ingredient(1), 10), (ingredient(1), 5)]).unwrap_err();
        assert_eq!(err.to_string(), "ingredients must not repeat");
    }

    #[test]
    fn non_positive_amount_rejected() {
        for amount in [0, -3] {
            let err = recipe_ingredients(&[(ingredient(1), amount)]).unwrap_err();
            assert_eq!(err.to_string(), "ingredient amount must be greater than 0");
        }
        assert!(recipe_ingredients(&[(ingredient(1), i64::from(i32::MAX) + 1)]).is_err());
    }

    #[test]
    fn valid_ingredients_keep_order() {
        let checked = recipe_ingredients(&[(ingredient(3), 1), (ingredient(1), 250)]).unwrap();
        assert_eq!(checked, [(ingredient(3), 1), (ingredient(1), 250)]);
        assert!(recipe_ingredients(&[]).is_err());
    }

    #[test]
    fn tags() {
        assert!(recipe_tags(&[tag(1), tag(2)]).is_ok());
        assert!(recipe_tags(&[tag(1), tag(1)]).is_err());
        assert!(recipe_tags(&[]).is_err());
    }

    #[test]
    fn cooking_time_positive() {
        assert_eq!(cooking_time(15), Ok(15));
        assert!(cooking_time(0).is_err());
        assert!(cooking_time(-1).is_err());
    }

    #[test]
    fn alpha_only() {
        assert!(alpha("first name", "Anna").is_ok());
        assert!(alpha("first name", "Анна").is_ok());
        assert!(alpha("first name", "anna1").is_err());
        assert!(alpha("first name", "an na").is_err());
        assert!(alpha("first name", "").is_err());
        assert!(username(&"a".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }

    #[test]
    fn emails() {
        assert!(email("cook@example.com").is_ok());
        assert!(email("cook").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("cook@localhost").is_err());
    }

    #[test]
    fn names() {
        assert!(recipe_name("Borscht").is_ok());
        assert!(recipe_name("  ").is_err());
        assert!(recipe_name(&"x".repeat(MAX_RECIPE_NAME_LEN + 1)).is_err());
    }
}
