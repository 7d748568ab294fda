// Copyright 2023 Remi Bernotavicius

use crate::database;
use crate::database::models::{
    AuthToken, Ingredient, IngredientId, NewFavorite, NewIngredient, NewRecipe,
    NewRecipeIngredient, NewShoppingListEntry, NewSubscription, NewTag, NewUser, Recipe,
    RecipeChanges, RecipeId, RecipeIngredient, RecipeTag, Tag, TagId, User, UserId,
};
use database::schema::{
    auth_tokens, favorites, ingredients, recipe_ingredients, recipe_tags, recipes,
    shopping_list_entries, subscriptions, tags, users,
};
use derive_more::Display;
use diesel::dsl::sql;
use diesel::expression_methods::EscapeExpressionMethods as _;
use diesel::expression_methods::TextExpressionMethods as _;
use diesel::prelude::OptionalExtension as _;
use diesel::sqlite::Sqlite;
use diesel::BoolExpressionMethods as _;
use diesel::ExpressionMethods as _;
use diesel::JoinOnDsl as _;
use diesel::QueryDsl as _;
use diesel::QueryResult;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::collections::HashSet;
use strum::EnumIter;

/// One page of a listing, `number` starting at 1.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub size: i64,
}

impl Page {
    /// `PageRequest::page` only builds pages whose offset fits in an `i64`.
    fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }
}

/// The row `last_insert_rowid()` refers to is the last insert made on this connection.
fn last_insert_rowid() -> diesel::expression::SqlLiteral<diesel::sql_types::Integer> {
    sql::<diesel::sql_types::Integer>("last_insert_rowid()")
}

pub fn insert_user(conn: &mut database::Connection, new_user: NewUser<'_>) -> QueryResult<User> {
    diesel::insert_into(users::table)
        .values(&new_user)
        .execute(conn)?;
    users::table
        .select(User::as_select())
        .filter(users::id.eq(last_insert_rowid()))
        .get_result(conn)
}

pub fn get_user(conn: &mut database::Connection, user_id: UserId) -> QueryResult<Option<User>> {
    users::table
        .select(User::as_select())
        .filter(users::id.eq(user_id))
        .get_result(conn)
        .optional()
}

pub fn get_users(conn: &mut database::Connection, ids: &[UserId]) -> QueryResult<Vec<User>> {
    users::table
        .select(User::as_select())
        .filter(users::id.eq_any(ids))
        .load(conn)
}

pub fn find_user_by_email(
    conn: &mut database::Connection,
    user_email: &str,
) -> QueryResult<Option<User>> {
    users::table
        .select(User::as_select())
        .filter(users::email.eq(user_email))
        .get_result(conn)
        .optional()
}

pub fn email_or_username_taken(
    conn: &mut database::Connection,
    user_email: &str,
    user_name: &str,
) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        users::table.filter(users::email.eq(user_email).or(users::username.eq(user_name))),
    ))
    .get_result(conn)
}

pub fn list_users(conn: &mut database::Connection, page: Page) -> QueryResult<(Vec<User>, i64)> {
    let count = users::table.count().get_result(conn)?;
    let results = users::table
        .select(User::as_select())
        .order_by(users::username)
        .limit(page.size)
        .offset(page.offset())
        .load(conn)?;
    Ok((results, count))
}

pub fn set_password_hash(
    conn: &mut database::Connection,
    user_id: UserId,
    new_hash: &str,
) -> QueryResult<()> {
    diesel::update(users::table.filter(users::id.eq(user_id)))
        .set(users::password_hash.eq(new_hash))
        .execute(conn)?;
    Ok(())
}

pub fn insert_token(conn: &mut database::Connection, token: &AuthToken) -> QueryResult<()> {
    diesel::insert_into(auth_tokens::table)
        .values(token)
        .execute(conn)?;
    Ok(())
}

pub fn user_for_token(conn: &mut database::Connection, digest: &str) -> QueryResult<Option<User>> {
    auth_tokens::table
        .inner_join(users::table)
        .select(User::as_select())
        .filter(auth_tokens::digest.eq(digest))
        .get_result(conn)
        .optional()
}

pub fn delete_token(conn: &mut database::Connection, digest: &str) -> QueryResult<usize> {
    diesel::delete(auth_tokens::table.filter(auth_tokens::digest.eq(digest))).execute(conn)
}

pub fn list_tags(conn: &mut database::Connection) -> QueryResult<Vec<Tag>> {
    tags::table
        .select(Tag::as_select())
        .order_by(tags::id)
        .load(conn)
}

pub fn get_tag(conn: &mut database::Connection, tag_id: TagId) -> QueryResult<Option<Tag>> {
    tags::table
        .select(Tag::as_select())
        .filter(tags::id.eq(tag_id))
        .get_result(conn)
        .optional()
}

pub fn existing_tag_ids(
    conn: &mut database::Connection,
    ids: &[TagId],
) -> QueryResult<HashSet<TagId>> {
    Ok(tags::table
        .select(tags::id)
        .filter(tags::id.eq_any(ids))
        .load::<TagId>(conn)?
        .into_iter()
        .collect())
}

/// Inserts the tag unless one with the same slug already exists. Returns whether it was inserted.
pub fn add_tag(conn: &mut database::Connection, new_tag: &NewTag) -> QueryResult<bool> {
    let inserted = diesel::insert_or_ignore_into(tags::table)
        .values(new_tag)
        .execute(conn)?;
    Ok(inserted > 0)
}

pub fn search_ingredients(
    conn: &mut database::Connection,
    query: Option<&str>,
) -> QueryResult<Vec<Ingredient>> {
    let mut select = ingredients::table
        .select(Ingredient::as_select())
        .order_by(ingredients::name)
        .into_boxed();
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        select = select.filter(ingredients::name.like(format!("%{escaped}%")).escape('\\'));
    }
    select.load(conn)
}

pub fn get_ingredient(
    conn: &mut database::Connection,
    ingredient_id: IngredientId,
) -> QueryResult<Option<Ingredient>> {
    ingredients::table
        .select(Ingredient::as_select())
        .filter(ingredients::id.eq(ingredient_id))
        .get_result(conn)
        .optional()
}

pub fn existing_ingredient_ids(
    conn: &mut database::Connection,
    ids: &[IngredientId],
) -> QueryResult<HashSet<IngredientId>> {
    Ok(ingredients::table
        .select(ingredients::id)
        .filter(ingredients::id.eq_any(ids))
        .load::<IngredientId>(conn)?
        .into_iter()
        .collect())
}

/// Inserts the ingredient unless one with the same name and unit already exists. Returns whether
/// it was inserted.
pub fn add_ingredient(
    conn: &mut database::Connection,
    new_ingredient: &NewIngredient,
) -> QueryResult<bool> {
    let existing: i64 = ingredients::table
        .filter(ingredients::name.eq(&new_ingredient.name))
        .filter(ingredients::measurement_unit.eq(&new_ingredient.measurement_unit))
        .count()
        .get_result(conn)?;
    if existing > 0 {
        return Ok(false);
    }
    diesel::insert_into(ingredients::table)
        .values(new_ingredient)
        .execute(conn)?;
    Ok(true)
}

#[derive(Debug, Default, Clone)]
pub struct RecipeFilter {
    pub author: Option<UserId>,
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<UserId>,
    pub in_shopping_cart_of: Option<UserId>,
}

fn filtered_recipes(filter: &RecipeFilter) -> recipes::BoxedQuery<'_, Sqlite> {
    let mut query = recipes::table.into_boxed();
    if let Some(author) = filter.author {
        query = query.filter(recipes::author_id.eq(author));
    }
    if !filter.tag_slugs.is_empty() {
        query = query.filter(
            recipes::id.eq_any(
                recipe_tags::table
                    .inner_join(tags::table)
                    .filter(tags::slug.eq_any(&filter.tag_slugs))
                    .select(recipe_tags::recipe_id),
            ),
        );
    }
    if let Some(user) = filter.favorited_by {
        query = query.filter(
            recipes::id.eq_any(
                favorites::table
                    .filter(favorites::user_id.eq(user))
                    .select(favorites::recipe_id),
            ),
        );
    }
    if let Some(user) = filter.in_shopping_cart_of {
        query = query.filter(
            recipes::id.eq_any(
                shopping_list_entries::table
                    .filter(shopping_list_entries::user_id.eq(user))
                    .select(shopping_list_entries::recipe_id),
            ),
        );
    }
    query
}

pub fn list_recipes(
    conn: &mut database::Connection,
    filter: &RecipeFilter,
    page: Page,
) -> QueryResult<(Vec<Recipe>, i64)> {
    let count = filtered_recipes(filter).count().get_result(conn)?;
    let results = filtered_recipes(filter)
        .select(Recipe::as_select())
        .order_by((recipes::pub_date.desc(), recipes::id.desc()))
        .limit(page.size)
        .offset(page.offset())
        .load(conn)?;
    Ok((results, count))
}

pub fn get_recipe(
    conn: &mut database::Connection,
    recipe_id: RecipeId,
) -> QueryResult<Option<Recipe>> {
    recipes::table
        .select(Recipe::as_select())
        .filter(recipes::id.eq(recipe_id))
        .get_result(conn)
        .optional()
}

pub fn recipes_by_author(
    conn: &mut database::Connection,
    author: UserId,
    limit: Option<i64>,
) -> QueryResult<Vec<Recipe>> {
    let mut query = recipes::table
        .select(Recipe::as_select())
        .filter(recipes::author_id.eq(author))
        .order_by((recipes::pub_date.desc(), recipes::id.desc()))
        .into_boxed();
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    query.load(conn)
}

pub fn count_recipes_by_author(conn: &mut database::Connection, author: UserId) -> QueryResult<i64> {
    recipes::table
        .filter(recipes::author_id.eq(author))
        .count()
        .get_result(conn)
}

pub fn insert_recipe(
    conn: &mut database::Connection,
    new_recipe: NewRecipe<'_>,
) -> QueryResult<RecipeId> {
    diesel::insert_into(recipes::table)
        .values(&new_recipe)
        .execute(conn)?;
    recipes::table
        .select(recipes::id)
        .filter(recipes::id.eq(last_insert_rowid()))
        .get_result(conn)
}

pub fn update_recipe(
    conn: &mut database::Connection,
    recipe_id: RecipeId,
    changes: &RecipeChanges<'_>,
) -> QueryResult<()> {
    if changes.is_empty() {
        return Ok(());
    }
    diesel::update(recipes::table.filter(recipes::id.eq(recipe_id)))
        .set(changes)
        .execute(conn)?;
    Ok(())
}

/// Dependent ingredient, tag, favorite and shopping-list rows go with it through `ON DELETE
/// CASCADE`.
pub fn delete_recipe(conn: &mut database::Connection, recipe_id: RecipeId) -> QueryResult<usize> {
    diesel::delete(recipes::table.filter(recipes::id.eq(recipe_id))).execute(conn)
}

pub fn set_recipe_tags(
    conn: &mut database::Connection,
    recipe_id: RecipeId,
    tag_ids: &[TagId],
) -> QueryResult<()> {
    diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(recipe_id)))
        .execute(conn)?;
    let rows: Vec<_> = tag_ids
        .iter()
        .map(|&tag_id| RecipeTag { recipe_id, tag_id })
        .collect();
    if !rows.is_empty() {
        diesel::insert_into(recipe_tags::table)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(())
}

pub fn set_recipe_ingredients(
    conn: &mut database::Connection,
    recipe_id: RecipeId,
    amounts: &[(IngredientId, i32)],
) -> QueryResult<()> {
    diesel::delete(recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)))
        .execute(conn)?;
    let rows: Vec<_> = amounts
        .iter()
        .map(|&(ingredient_id, amount)| NewRecipeIngredient {
            recipe_id,
            ingredient_id,
            amount,
        })
        .collect();
    if !rows.is_empty() {
        diesel::insert_into(recipe_ingredients::table)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(())
}

pub fn tags_for_recipes(
    conn: &mut database::Connection,
    ids: &[RecipeId],
) -> QueryResult<Vec<(RecipeId, Tag)>> {
    recipe_tags::table
        .inner_join(tags::table)
        .select((recipe_tags::recipe_id, Tag::as_select()))
        .filter(recipe_tags::recipe_id.eq_any(ids))
        .order_by(tags::id)
        .load(conn)
}

pub fn ingredients_for_recipes(
    conn: &mut database::Connection,
    ids: &[RecipeId],
) -> QueryResult<Vec<(RecipeIngredient, Ingredient)>> {
    recipe_ingredients::table
        .inner_join(ingredients::table)
        .select((RecipeIngredient::as_select(), Ingredient::as_select()))
        .filter(recipe_ingredients::recipe_id.eq_any(ids))
        .order_by(recipe_ingredients::id)
        .load(conn)
}

/// The two per-user recipe collections. Both are keyed by (user, recipe) and behave the same way
/// apart from uniqueness, which only the favorites table enforces.
#[derive(Debug, Display, EnumIter, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RecipeSet {
    #[display("favorites")]
    Favorites,
    #[display("shopping list")]
    ShoppingList,
}

impl RecipeSet {
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }

    /// Adding a recipe a second time is an error for favorites. The shopping list takes the
    /// duplicate, and its ingredients then count twice in the export.
    pub fn rejects_duplicates(self) -> bool {
        match self {
            Self::Favorites => true,
            Self::ShoppingList => false,
        }
    }
}

pub fn in_recipe_set(
    conn: &mut database::Connection,
    set: RecipeSet,
    user: UserId,
    recipe: RecipeId,
) -> QueryResult<bool> {
    Ok(!recipes_in_set(conn, set, user, &[recipe])?.is_empty())
}

/// The subset of `ids` that `user` has in `set`.
pub fn recipes_in_set(
    conn: &mut database::Connection,
    set: RecipeSet,
    user: UserId,
    ids: &[RecipeId],
) -> QueryResult<HashSet<RecipeId>> {
    let found: Vec<RecipeId> = match set {
        RecipeSet::Favorites => favorites::table
            .select(favorites::recipe_id)
            .filter(favorites::user_id.eq(user))
            .filter(favorites::recipe_id.eq_any(ids))
            .load(conn)?,
        RecipeSet::ShoppingList => shopping_list_entries::table
            .select(shopping_list_entries::recipe_id)
            .filter(shopping_list_entries::user_id.eq(user))
            .filter(shopping_list_entries::recipe_id.eq_any(ids))
            .load(conn)?,
    };
    Ok(found.into_iter().collect())
}

pub fn add_to_recipe_set(
    conn: &mut database::Connection,
    set: RecipeSet,
    user_id: UserId,
    recipe_id: RecipeId,
) -> QueryResult<()> {
    match set {
        RecipeSet::Favorites => diesel::insert_into(favorites::table)
            .values(NewFavorite { user_id, recipe_id })
            .execute(conn)?,
        RecipeSet::ShoppingList => diesel::insert_into(shopping_list_entries::table)
            .values(NewShoppingListEntry {
                user_id,
                recipe_id,
                created_at: chrono::Utc::now().naive_utc(),
            })
            .execute(conn)?,
    };
    Ok(())
}

/// Returns the number of rows removed.
pub fn remove_from_recipe_set(
    conn: &mut database::Connection,
    set: RecipeSet,
    user: UserId,
    recipe: RecipeId,
) -> QueryResult<usize> {
    match set {
        RecipeSet::Favorites => diesel::delete(
            favorites::table
                .filter(favorites::user_id.eq(user))
                .filter(favorites::recipe_id.eq(recipe)),
        )
        .execute(conn),
        RecipeSet::ShoppingList => diesel::delete(
            shopping_list_entries::table
                .filter(shopping_list_entries::user_id.eq(user))
                .filter(shopping_list_entries::recipe_id.eq(recipe)),
        )
        .execute(conn),
    }
}

/// Every ingredient row of every recipe in the user's shopping list, as (name, unit, amount).
/// Rows come in shopping-list order, then in the order the ingredients were added to the recipe.
pub fn shopping_list_rows(
    conn: &mut database::Connection,
    user: UserId,
) -> QueryResult<Vec<(String, String, i32)>> {
    shopping_list_entries::table
        .inner_join(
            recipe_ingredients::table
                .on(recipe_ingredients::recipe_id.eq(shopping_list_entries::recipe_id)),
        )
        .inner_join(ingredients::table.on(ingredients::id.eq(recipe_ingredients::ingredient_id)))
        .select((
            ingredients::name,
            ingredients::measurement_unit,
            recipe_ingredients::amount,
        ))
        .filter(shopping_list_entries::user_id.eq(user))
        .order_by((shopping_list_entries::id, recipe_ingredients::id))
        .load(conn)
}

pub fn subscribe(
    conn: &mut database::Connection,
    user_id: UserId,
    author_id: UserId,
) -> QueryResult<()> {
    diesel::insert_into(subscriptions::table)
        .values(NewSubscription { user_id, author_id })
        .execute(conn)?;
    Ok(())
}

pub fn unsubscribe(
    conn: &mut database::Connection,
    user: UserId,
    author: UserId,
) -> QueryResult<usize> {
    diesel::delete(
        subscriptions::table
            .filter(subscriptions::user_id.eq(user))
            .filter(subscriptions::author_id.eq(author)),
    )
    .execute(conn)
}

pub fn is_subscribed(
    conn: &mut database::Connection,
    user: UserId,
    author: UserId,
) -> QueryResult<bool> {
    Ok(!subscribed_among(conn, user, &[author])?.is_empty())
}

/// The subset of `authors` that `user` follows.
pub fn subscribed_among(
    conn: &mut database::Connection,
    user: UserId,
    authors: &[UserId],
) -> QueryResult<HashSet<UserId>> {
    Ok(subscriptions::table
        .select(subscriptions::author_id)
        .filter(subscriptions::user_id.eq(user))
        .filter(subscriptions::author_id.eq_any(authors))
        .load::<UserId>(conn)?
        .into_iter()
        .collect())
}

/// The authors `user` follows, ordered by username.
pub fn subscribed_authors(
    conn: &mut database::Connection,
    user: UserId,
    page: Page,
) -> QueryResult<(Vec<User>, i64)> {
    let following = || {
        users::table.inner_join(
            subscriptions::table.on(subscriptions::author_id
                .eq(users::id)
                .and(subscriptions::user_id.eq(user))),
        )
    };
    let count = following().count().get_result(conn)?;
    let results = following()
        .select(User::as_select())
        .order_by(users::username)
        .limit(page.size)
        .offset(page.offset())
        .load(conn)?;
    Ok((results, count))
}
