// Copyright 2023 Remi Bernotavicius

//! JSON representations. Reads are nested (a recipe embeds its author, tags and ingredients);
//! writes are flat (a recipe takes tag ids and ingredient id/amount pairs).

use crate::database;
use crate::database::models::{
    Ingredient, IngredientId, Recipe, RecipeId, Tag, TagId, User, UserId,
};
use crate::query::{self, RecipeSet};
use diesel::QueryResult;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// URL prefix recipe images are served under.
pub const MEDIA_URL: &str = "/media/";

fn image_url(image: &Option<String>) -> Option<String> {
    image.as_ref().map(|path| format!("{MEDIA_URL}{path}"))
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub email: String,
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn new(user: User, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }

    pub fn load(
        conn: &mut database::Connection,
        requester: Option<UserId>,
        users: Vec<User>,
    ) -> QueryResult<Vec<Self>> {
        let subscribed = match requester {
            Some(requester) => {
                let ids: Vec<_> = users.iter().map(|u| u.id).collect();
                query::subscribed_among(conn, requester, &ids)?
            }
            None => HashSet::new(),
        };
        Ok(users
            .into_iter()
            .map(|u| {
                let is_subscribed = subscribed.contains(&u.id);
                Self::new(u, is_subscribed)
            })
            .collect())
    }
}

/// What registration responds with.
#[derive(Serialize, Debug)]
pub struct RegisteredUserView {
    pub email: String,
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for RegisteredUserView {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TagView {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<Tag> for TagView {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IngredientView {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientView {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredientView {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Serialize, Debug, Clone)]
pub struct RecipeView {
    pub id: RecipeId,
    pub tags: Vec<TagView>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeView {
    /// Builds the views for a page of recipes with a fixed number of queries, whatever the page
    /// size. The per-requester flags are all `false` for anonymous requests.
    pub fn load(
        conn: &mut database::Connection,
        requester: Option<UserId>,
        recipes: Vec<Recipe>,
    ) -> QueryResult<Vec<Self>> {
        let recipe_ids: Vec<_> = recipes.iter().map(|r| r.id).collect();

        let mut tags: HashMap<RecipeId, Vec<TagView>> = HashMap::new();
        for (recipe_id, tag) in query::tags_for_recipes(conn, &recipe_ids)? {
            tags.entry(recipe_id).or_default().push(tag.into());
        }

        let mut ingredients: HashMap<RecipeId, Vec<RecipeIngredientView>> = HashMap::new();
        for (usage, ingredient) in query::ingredients_for_recipes(conn, &recipe_ids)? {
            ingredients
                .entry(usage.recipe_id)
                .or_default()
                .push(RecipeIngredientView {
                    id: ingredient.id,
                    name: ingredient.name,
                    measurement_unit: ingredient.measurement_unit,
                    amount: usage.amount,
                });
        }

        let mut author_ids: Vec<_> = recipes.iter().map(|r| r.author_id).collect();
        author_ids.sort();
        author_ids.dedup();
        let authors = query::get_users(conn, &author_ids)?;
        let authors: HashMap<UserId, UserView> = UserView::load(conn, requester, authors)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let (favorited, in_cart) = match requester {
            Some(user) => (
                query::recipes_in_set(conn, RecipeSet::Favorites, user, &recipe_ids)?,
                query::recipes_in_set(conn, RecipeSet::ShoppingList, user, &recipe_ids)?,
            ),
            None => (HashSet::new(), HashSet::new()),
        };

        recipes
            .into_iter()
            .map(|recipe| {
                let author = authors
                    .get(&recipe.author_id)
                    .cloned()
                    .ok_or(diesel::result::Error::NotFound)?;
                Ok(Self {
                    id: recipe.id,
                    tags: tags.remove(&recipe.id).unwrap_or_default(),
                    author,
                    ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                    is_favorited: favorited.contains(&recipe.id),
                    is_in_shopping_cart: in_cart.contains(&recipe.id),
                    image: image_url(&recipe.image),
                    name: recipe.name,
                    text: recipe.text,
                    cooking_time: recipe.cooking_time,
                })
            })
            .collect()
    }

    pub fn load_one(
        conn: &mut database::Connection,
        requester: Option<UserId>,
        recipe: Recipe,
    ) -> QueryResult<Self> {
        Self::load(conn, requester, vec![recipe])?
            .pop()
            .ok_or(diesel::result::Error::NotFound)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeShortView {
    pub id: RecipeId,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl From<Recipe> for RecipeShortView {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            image: image_url(&recipe.image),
            name: recipe.name,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// An author as seen from the subscriptions pages.
#[derive(Serialize, Debug, Clone)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub user: UserView,
    pub recipes: Vec<RecipeShortView>,
    pub recipes_count: i64,
}

impl SubscriptionView {
    pub fn load(
        conn: &mut database::Connection,
        requester: UserId,
        authors: Vec<User>,
        recipes_limit: Option<i64>,
    ) -> QueryResult<Vec<Self>> {
        UserView::load(conn, Some(requester), authors)?
            .into_iter()
            .map(|user| {
                let recipes = query::recipes_by_author(conn, user.id, recipes_limit)?
                    .into_iter()
                    .map(RecipeShortView::from)
                    .collect();
                let recipes_count = query::count_recipes_by_author(conn, user.id)?;
                Ok(Self {
                    user,
                    recipes,
                    recipes_count,
                })
            })
            .collect()
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct IngredientAmountWrite {
    pub id: IngredientId,
    pub amount: i64,
}

/// The flat write shape of a recipe. Every field is optional so that updates only touch what was
/// sent; creation checks for each one.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct RecipeWrite {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub tags: Option<Vec<TagId>>,
    pub ingredients: Option<Vec<IngredientAmountWrite>>,
    pub image: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewUserWrite {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TokenLogin {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct TokenView {
    pub auth_token: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SetPasswordWrite {
    pub new_password: String,
    pub current_password: String,
}
