// Copyright 2023 Remi Bernotavicius

use derive_more::{Display, From};
use diesel::associations::{Associations, Identifiable};
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel::prelude::{AsChangeset, Insertable};
use diesel_derive_newtype::DieselNewType;
use serde::{Deserialize, Serialize};

#[derive(
    DieselNewType, Debug, Display, From, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone,
    Serialize, Deserialize,
)]
pub struct UserId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(table_name = crate::database::schema::users)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
}

/// Only the digest of an issued token is stored, never the token itself.
#[derive(Associations, Queryable, Selectable, Identifiable, Insertable, Clone, Debug)]
#[diesel(belongs_to(User))]
#[diesel(primary_key(digest))]
#[diesel(table_name = crate::database::schema::auth_tokens)]
pub struct AuthToken {
    pub digest: String,
    pub user_id: UserId,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(
    DieselNewType, Debug, Display, From, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone,
    Serialize, Deserialize,
)]
pub struct TagId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::tags)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Insertable, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::database::schema::tags)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(
    DieselNewType, Debug, Display, From, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone,
    Serialize, Deserialize,
)]
pub struct IngredientId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Insertable, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(
    DieselNewType, Debug, Display, From, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone,
    Serialize, Deserialize,
)]
pub struct RecipeId(i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(belongs_to(User, foreign_key = author_id))]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct Recipe {
    pub id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub text: String,
    pub image: Option<String>,
    pub pub_date: chrono::NaiveDateTime,
    pub cooking_time: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct NewRecipe<'a> {
    pub author_id: UserId,
    pub name: &'a str,
    pub text: &'a str,
    pub image: Option<&'a str>,
    pub pub_date: chrono::NaiveDateTime,
    pub cooking_time: i32,
}

/// Fields left as `None` are not touched by the update.
#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct RecipeChanges<'a> {
    pub name: Option<&'a str>,
    pub text: Option<&'a str>,
    pub image: Option<&'a str>,
    pub cooking_time: Option<i32>,
}

impl RecipeChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.text.is_none()
            && self.image.is_none()
            && self.cooking_time.is_none()
    }
}

#[derive(Associations, Queryable, Selectable, Insertable, Clone, Copy, Debug)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Tag))]
#[diesel(table_name = crate::database::schema::recipe_tags)]
pub struct RecipeTag {
    pub recipe_id: RecipeId,
    pub tag_id: TagId,
}

#[derive(
    DieselNewType, Debug, Display, From, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone,
    Serialize, Deserialize,
)]
pub struct RecipeIngredientId(i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Ingredient))]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct RecipeIngredient {
    pub id: RecipeIngredientId,
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub amount: i32,
}

#[derive(Insertable, Clone, Copy, Debug)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct NewRecipeIngredient {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub amount: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::subscriptions)]
pub struct NewSubscription {
    pub user_id: UserId,
    pub author_id: UserId,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::favorites)]
pub struct NewFavorite {
    pub user_id: UserId,
    pub recipe_id: RecipeId,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::shopping_list_entries)]
pub struct NewShoppingListEntry {
    pub user_id: UserId,
    pub recipe_id: RecipeId,
    pub created_at: chrono::NaiveDateTime,
}
