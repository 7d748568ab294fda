// Copyright 2023 Remi Bernotavicius

use super::auth::{AuthUser, MaybeUser};
use super::error::{ApiError, Result};
use super::pagination::{query_param, PageRequest, Paginated};
use super::views::{RecipeShortView, RecipeView, RecipeWrite};
use super::{AppState, Json};
use crate::database;
use crate::database::models::{
    IngredientId, NewRecipe, Recipe, RecipeChanges, RecipeId, TagId, UserId,
};
use crate::image;
use crate::query::{self, RecipeFilter, RecipeSet};
use crate::shopping_list::ShoppingList;
use crate::validate;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

pub const CART_FILE_NAME: &str = "cart.txt";

fn flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "True")
}

fn recipe_filter(pairs: &[(String, String)], requester: Option<UserId>) -> Result<RecipeFilter> {
    let wants = |key: &str| pairs.iter().any(|(k, v)| k == key && flag(v));
    Ok(RecipeFilter {
        author: query_param::<i32>(pairs, "author")?.map(UserId::from),
        tag_slugs: pairs
            .iter()
            .filter(|(k, _)| k == "tags")
            .map(|(_, v)| v.clone())
            .collect(),
        favorited_by: requester.filter(|_| wants("is_favorited")),
        in_shopping_cart_of: requester.filter(|_| wants("is_in_shopping_cart")),
    })
}

pub async fn list(
    State(state): State<AppState>,
    requester: MaybeUser,
    OriginalUri(uri): OriginalUri,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Paginated<RecipeView>>> {
    let page = PageRequest::from_pairs(&pairs)?.page(state.config.page_size)?;
    let requester = requester.id();
    let filter = recipe_filter(&pairs, requester)?;

    let (count, views) = state
        .run(move |conn| {
            let (recipes, count) = query::list_recipes(conn, &filter, page)?;
            Ok((count, RecipeView::load(conn, requester, recipes)?))
        })
        .await?;
    Ok(Json(Paginated::new(&uri, page, count, views)?))
}

fn require_recipe(conn: &mut database::Connection, id: RecipeId) -> Result<Recipe> {
    query::get_recipe(conn, id)?.ok_or_else(|| ApiError::not_found(format!("recipe {id}")))
}

pub async fn retrieve(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<RecipeId>,
) -> Result<Json<RecipeView>> {
    let requester = requester.id();
    let view = state
        .run(move |conn| {
            let recipe = require_recipe(conn, id)?;
            Ok(RecipeView::load_one(conn, requester, recipe)?)
        })
        .await?;
    Ok(Json(view))
}

/// A recipe write that passed validation. `None` fields were not sent.
#[derive(Debug, Default)]
struct CheckedRecipe {
    name: Option<String>,
    text: Option<String>,
    cooking_time: Option<i32>,
    tags: Option<Vec<TagId>>,
    ingredients: Option<Vec<(IngredientId, i32)>>,
}

/// A checked write carrying every field creation needs.
#[derive(Debug)]
struct CompleteRecipe {
    name: String,
    text: String,
    cooking_time: i32,
    tags: Vec<TagId>,
    ingredients: Vec<(IngredientId, i32)>,
}

fn required<T>(field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| ApiError::Validation(format!("{field}: this field is required")))
}

impl CheckedRecipe {
    fn check(conn: &mut database::Connection, write: RecipeWrite) -> Result<Self> {
        if let Some(name) = &write.name {
            validate::recipe_name(name)?;
        }
        if let Some(text) = &write.text {
            validate::recipe_text(text)?;
        }
        let cooking_time = write.cooking_time.map(validate::cooking_time).transpose()?;

        if let Some(tags) = &write.tags {
            validate::recipe_tags(tags)?;
            let existing = query::existing_tag_ids(conn, tags)?;
            if let Some(unknown) = tags.iter().find(|id| !existing.contains(*id)) {
                return Err(ApiError::Validation(format!("tag {unknown} does not exist")));
            }
        }

        let ingredients = match &write.ingredients {
            Some(entries) => {
                let entries: Vec<_> = entries.iter().map(|e| (e.id, e.amount)).collect();
                let checked = validate::recipe_ingredients(&entries)?;
                let ids: Vec<_> = checked.iter().map(|&(id, _)| id).collect();
                let existing = query::existing_ingredient_ids(conn, &ids)?;
                if let Some(unknown) = ids.iter().find(|id| !existing.contains(*id)) {
                    return Err(ApiError::not_found(format!("ingredient {unknown}")));
                }
                Some(checked)
            }
            None => None,
        };

        Ok(Self {
            name: write.name,
            text: write.text,
            cooking_time,
            tags: write.tags,
            ingredients,
        })
    }

    fn complete(self) -> Result<CompleteRecipe> {
        Ok(CompleteRecipe {
            name: required("name", self.name)?,
            text: required("text", self.text)?,
            cooking_time: required("cooking_time", self.cooking_time)?,
            tags: required("tags", self.tags)?,
            ingredients: required("ingredients", self.ingredients)?,
        })
    }

    fn apply_relations(&self, conn: &mut database::Connection, id: RecipeId) -> Result<()> {
        if let Some(tags) = &self.tags {
            query::set_recipe_tags(conn, id, tags)?;
        }
        if let Some(ingredients) = &self.ingredients {
            query::set_recipe_ingredients(conn, id, ingredients)?;
        }
        Ok(())
    }
}

/// Stores the submitted image, then runs `write` in a transaction with the stored path. The file
/// is removed again unless the transaction commits.
async fn with_new_image<T, F>(state: &AppState, data: Option<String>, write: F) -> Result<T>
where
    F: FnOnce(&mut database::Connection, Option<&str>) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let media_root = state.config.media_root.clone();
    let stored = match data {
        Some(data) => {
            let media_root = media_root.clone();
            Some(
                tokio::task::spawn_blocking(move || image::store_data_uri(&media_root, &data))
                    .await??,
            )
        }
        None => None,
    };

    let path = stored.clone();
    let result = state
        .transaction(move |conn| write(conn, path.as_deref()))
        .await;
    if let (Err(_), Some(path)) = (&result, &stored) {
        image::remove(&media_root, path);
    }
    result
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Json(mut write): Json<RecipeWrite>,
) -> Result<(StatusCode, Json<RecipeView>)> {
    let data = required("image", write.image.take())?;
    let view = with_new_image(&state, Some(data), move |conn, stored| {
        let recipe = CheckedRecipe::check(conn, write)?.complete()?;
        let id = query::insert_recipe(
            conn,
            NewRecipe {
                author_id: user.id,
                name: &recipe.name,
                text: &recipe.text,
                image: stored,
                pub_date: chrono::Utc::now().naive_utc(),
                cooking_time: recipe.cooking_time,
            },
        )?;
        query::set_recipe_tags(conn, id, &recipe.tags)?;
        query::set_recipe_ingredients(conn, id, &recipe.ingredients)?;
        log::info!("{} created recipe {id}", user.username);

        let recipe = require_recipe(conn, id)?;
        Ok(RecipeView::load_one(conn, Some(user.id), recipe)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

fn require_own_recipe(
    conn: &mut database::Connection,
    id: RecipeId,
    user: UserId,
) -> Result<Recipe> {
    let recipe = require_recipe(conn, id)?;
    if recipe.author_id != user {
        return Err(ApiError::Forbidden);
    }
    Ok(recipe)
}

/// Serves both PUT and PATCH: only the fields present in the body change, and tags or
/// ingredients are replaced wholesale when sent.
pub async fn update(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<RecipeId>,
    Json(mut write): Json<RecipeWrite>,
) -> Result<Json<RecipeView>> {
    let data = write.image.take();
    let (view, replaced) = with_new_image(&state, data, move |conn, stored| {
        let previous = require_own_recipe(conn, id, user.id)?;
        let checked = CheckedRecipe::check(conn, write)?;
        let changes = RecipeChanges {
            name: checked.name.as_deref(),
            text: checked.text.as_deref(),
            image: stored,
            cooking_time: checked.cooking_time,
        };
        query::update_recipe(conn, id, &changes)?;
        checked.apply_relations(conn, id)?;
        log::info!("{} updated recipe {id}", user.username);

        let recipe = require_recipe(conn, id)?;
        let view = RecipeView::load_one(conn, Some(user.id), recipe)?;
        Ok((view, previous.image.filter(|_| stored.is_some())))
    })
    .await?;

    if let Some(old) = replaced {
        image::remove(&state.config.media_root, &old);
    }
    Ok(Json(view))
}

pub async fn destroy(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<RecipeId>,
) -> Result<StatusCode> {
    let removed = state
        .transaction(move |conn| {
            let recipe = require_own_recipe(conn, id, user.id)?;
            query::delete_recipe(conn, id)?;
            log::info!("{} deleted recipe {id}", user.username);
            Ok(recipe.image)
        })
        .await?;

    if let Some(path) = removed {
        image::remove(&state.config.media_root, &path);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_set(
    state: AppState,
    user: UserId,
    id: RecipeId,
    set: RecipeSet,
) -> Result<(StatusCode, Json<RecipeShortView>)> {
    let recipe = state
        .transaction(move |conn| {
            let recipe = require_recipe(conn, id)?;
            if set.rejects_duplicates() && query::in_recipe_set(conn, set, user, id)? {
                return Err(ApiError::Validation(format!(
                    "recipe is already in {set}"
                )));
            }
            query::add_to_recipe_set(conn, set, user, id)?;
            Ok(recipe)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(recipe.into())))
}

async fn remove_from_set(
    state: AppState,
    user: UserId,
    id: RecipeId,
    set: RecipeSet,
) -> Result<StatusCode> {
    state
        .run(move |conn| {
            require_recipe(conn, id)?;
            if query::remove_from_recipe_set(conn, set, user, id)? == 0 {
                return Err(ApiError::NotFound(format!("recipe is not in {set}")));
            }
            log::debug!("recipe {id} removed from {set} of user {user}");
            Ok(())
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<RecipeId>,
) -> Result<(StatusCode, Json<RecipeShortView>)> {
    add_to_set(state, user.id, id, RecipeSet::Favorites).await
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<RecipeId>,
) -> Result<StatusCode> {
    remove_from_set(state, user.id, id, RecipeSet::Favorites).await
}

pub async fn add_to_shopping_cart(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<RecipeId>,
) -> Result<(StatusCode, Json<RecipeShortView>)> {
    add_to_set(state, user.id, id, RecipeSet::ShoppingList).await
}

pub async fn remove_from_shopping_cart(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<RecipeId>,
) -> Result<StatusCode> {
    remove_from_set(state, user.id, id, RecipeSet::ShoppingList).await
}

pub async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
) -> Result<impl IntoResponse> {
    let user_id = user.id;
    let rows = state
        .run(move |conn| Ok(query::shopping_list_rows(conn, user_id)?))
        .await?;
    let list = ShoppingList::aggregate(rows);
    if list.is_empty() {
        log::debug!("shopping list of user {user_id} is empty");
    } else {
        log::debug!("exporting {} shopping list items", list.items().len());
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CART_FILE_NAME}\""),
            ),
        ],
        list.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::TestApp;
    use crate::database::models::{IngredientId, TagId};
    use crate::image::PIXEL_PNG;
    use crate::query::tests::{ingredient, tag};
    use axum::http::{header, Method, StatusCode};
    use serde_json::{json, Value};

    struct Fixtures {
        sugar: IngredientId,
        flour: IngredientId,
        lunch: TagId,
        dinner: TagId,
    }

    async fn fixtures(app: &TestApp) -> Fixtures {
        app.state
            .run(|conn| {
                Ok(Fixtures {
                    sugar: ingredient(conn, "Sugar", "g"),
                    flour: ingredient(conn, "Flour", "g"),
                    lunch: tag(conn, "lunch"),
                    dinner: tag(conn, "dinner"),
                })
            })
            .await
            .unwrap()
    }

    fn recipe_body(name: &str, tags: &[TagId], ingredients: &[(IngredientId, i64)]) -> Value {
        json!({
            "name": name,
            "text": "Mix everything.",
            "cooking_time": 20,
            "image": PIXEL_PNG,
            "tags": tags,
            "ingredients": ingredients
                .iter()
                .map(|(id, amount)| json!({ "id": id, "amount": amount }))
                .collect::<Vec<_>>(),
        })
    }

    fn stored_images(app: &TestApp) -> usize {
        let dir = app.state.config.media_root.join(crate::image::RECIPE_IMAGE_DIR);
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    fn image_file(app: &TestApp, recipe: &Value) -> std::path::PathBuf {
        let url = recipe["image"].as_str().unwrap();
        app.state
            .config
            .media_root
            .join(url.strip_prefix("/media/").unwrap())
    }

    async fn create(app: &TestApp, token: &str, body: Value) -> i64 {
        let (status, recipe) = app
            .json(Method::POST, "/api/recipes/", Some(token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{recipe}");
        recipe["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn create_and_retrieve() {
        let app = TestApp::new();
        let f = fixtures(&app).await;
        let (author, token) = app.sign_up("alice").await;

        let (status, recipe) = app
            .json(
                Method::POST,
                "/api/recipes/",
                Some(&token),
                Some(recipe_body("Pancakes", &[f.lunch], &[(f.flour, 200), (f.sugar, 30)])),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{recipe}");
        assert_eq!(recipe["author"]["id"].as_i64(), Some(author));
        assert_eq!(recipe["tags"][0]["slug"], "lunch");
        assert_eq!(recipe["ingredients"][0]["name"], "Flour");
        assert_eq!(recipe["ingredients"][1]["amount"], 30);
        assert_eq!(recipe["is_favorited"], false);
        let image = recipe["image"].as_str().unwrap();
        assert!(image.starts_with("/media/recipes/images/"), "{image}");

        let uri = format!("/api/recipes/{}/", recipe["id"]);
        let (status, anonymous) = app.json(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(anonymous["name"], "Pancakes");
        assert_eq!(anonymous["is_in_shopping_cart"], false);

        let (status, _) = app.json(Method::GET, "/api/recipes/999/", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_requires_login_and_fields() {
        let app = TestApp::new();
        let f = fixtures(&app).await;
        let (_, token) = app.sign_up("alice").await;

        let body = recipe_body("Pancakes", &[f.lunch], &[(f.flour, 200)]);
        let (status, _) = app
            .json(Method::POST, "/api/recipes/", None, Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut missing = body;
        missing.as_object_mut().unwrap().remove("text");
        let (status, error) = app
            .json(Method::POST, "/api/recipes/", Some(&token), Some(missing))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["errors"][0], "text: this field is required");

        let mut mistyped = recipe_body("Pancakes", &[f.lunch], &[(f.flour, 200)]);
        mistyped["cooking_time"] = json!("abc");
        let (status, error) = app
            .json(Method::POST, "/api/recipes/", Some(&token), Some(mistyped))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["errors"][0].as_str().unwrap().contains("cooking_time"), "{error}");

        let mut fractional = recipe_body("Pancakes", &[f.lunch], &[(f.flour, 200)]);
        fractional["ingredients"][0]["amount"] = json!(1.5);
        let (status, _) = app
            .json(Method::POST, "/api/recipes/", Some(&token), Some(fractional))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(stored_images(&app), 0);
    }

    #[tokio::test]
    async fn invalid_ingredients_rejected() {
        let app = TestApp::new();
        let f = fixtures(&app).await;
        let (_, token) = app.sign_up("alice").await;

        for (ingredients, expected) in [
            (vec![(f.sugar, 10), (f.sugar, 5)], StatusCode::BAD_REQUEST),
            (vec![(f.sugar, 0)], StatusCode::BAD_REQUEST),
            (vec![], StatusCode::BAD_REQUEST),
            (vec![(IngredientId::from(999), 5)], StatusCode::NOT_FOUND),
        ] {
            let body = recipe_body("Cake", &[f.lunch], &ingredients);
            let (status, error) = app
                .json(Method::POST, "/api/recipes/", Some(&token), Some(body))
                .await;
            assert_eq!(status, expected, "{ingredients:?}: {error}");
        }

        let body = recipe_body("Cake", &[TagId::from(999)], &[(f.sugar, 5)]);
        let (status, _) = app
            .json(Method::POST, "/api/recipes/", Some(&token), Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, list) = app.json(Method::GET, "/api/recipes/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["count"], 0);
    }

    #[tokio::test]
    async fn only_author_may_change() {
        let app = TestApp::new();
        let f = fixtures(&app).await;
        let (_, alice) = app.sign_up("alice").await;
        let (_, bob) = app.sign_up("bob").await;
        let id = create(&app, &alice, recipe_body("Soup", &[f.lunch], &[(f.flour, 1)])).await;
        let uri = format!("/api/recipes/{id}/");

        let patch = json!({ "name": "Better soup" });
        let (status, _) = app
            .json(Method::PATCH, &uri, Some(&bob), Some(patch.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.json(Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, updated) = app.json(Method::PATCH, &uri, Some(&alice), Some(patch)).await;
        assert_eq!(status, StatusCode::OK, "{updated}");
        assert_eq!(updated["name"], "Better soup");
        assert_eq!(updated["text"], "Mix everything.");
        assert_eq!(updated["ingredients"][0]["name"], "Flour");

        let replace = json!({
            "tags": [f.dinner],
            "ingredients": [{ "id": f.sugar, "amount": 7 }],
        });
        let (status, updated) = app.json(Method::PUT, &uri, Some(&alice), Some(replace)).await;
        assert_eq!(status, StatusCode::OK, "{updated}");
        assert_eq!(updated["tags"][0]["slug"], "dinner");
        assert_eq!(updated["ingredients"].as_array().unwrap().len(), 1);
        assert_eq!(updated["ingredients"][0]["amount"], 7);

        let (status, _) = app.json(Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.json(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn image_files_follow_the_recipe() {
        let app = TestApp::new();
        let f = fixtures(&app).await;
        let (_, alice) = app.sign_up("alice").await;
        let (_, bob) = app.sign_up("bob").await;

        let (_, created) = app
            .json(
                Method::POST,
                "/api/recipes/",
                Some(&alice),
                Some(recipe_body("Soup", &[f.lunch], &[(f.flour, 1)])),
            )
            .await;
        let first = image_file(&app, &created);
        assert!(first.exists());
        let uri = format!("/api/recipes/{}/", created["id"]);

        let (status, _) = app
            .json(Method::PATCH, &uri, Some(&bob), Some(json!({ "image": PIXEL_PNG })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(stored_images(&app), 1);

        let (status, _) = app
            .json(Method::PATCH, &uri, Some(&alice), Some(json!({ "name": "Stew" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(first.exists());

        let (status, updated) = app
            .json(Method::PATCH, &uri, Some(&alice), Some(json!({ "image": PIXEL_PNG })))
            .await;
        assert_eq!(status, StatusCode::OK);
        let second = image_file(&app, &updated);
        assert_ne!(first, second);
        assert!(!first.exists());
        assert!(second.exists());

        let (status, _) = app.json(Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!second.exists());
        assert_eq!(stored_images(&app), 0);
    }

    #[tokio::test]
    async fn favorites() {
        let app = TestApp::new();
        let f = fixtures(&app).await;
        let (_, token) = app.sign_up("alice").await;
        let id = create(&app, &token, recipe_body("Soup", &[f.lunch], &[(f.flour, 1)])).await;
        let uri = format!("/api/recipes/{id}/favorite/");

        let (status, short) = app.json(Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(short["name"], "Soup");
        assert_eq!(short["cooking_time"], 20);

        let (status, _) = app.json(Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, list) = app
            .json(Method::GET, "/api/recipes/?is_favorited=1", Some(&token), None)
            .await;
        assert_eq!(list["count"], 1);
        assert_eq!(list["results"][0]["is_favorited"], true);

        let (status, _) = app.json(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.json(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .json(Method::POST, "/api/recipes/999/favorite/", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn shopping_cart_download() {
        let app = TestApp::new();
        let f = fixtures(&app).await;
        let (_, token) = app.sign_up("alice").await;
        let cake = create(&app, &token, recipe_body("Cake", &[f.lunch], &[(f.sugar, 100)])).await;
        let tea = create(&app, &token, recipe_body("Tea", &[f.lunch], &[(f.sugar, 50)])).await;

        for id in [cake, tea] {
            let uri = format!("/api/recipes/{id}/shopping_cart/");
            let (status, _) = app.json(Method::POST, &uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body, headers) = app
            .request(
                Method::GET,
                "/api/recipes/download_shopping_cart/",
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"cart.txt\""
        );
        assert_eq!(String::from_utf8(body).unwrap(), "Sugar (g) — 150 \n");

        let (_, list) = app
            .json(
                Method::GET,
                "/api/recipes/?is_in_shopping_cart=1",
                Some(&token),
                None,
            )
            .await;
        assert_eq!(list["count"], 2);

        let (status, _) = app
            .json(Method::GET, "/api/recipes/download_shopping_cart/", None, None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn list_filters_and_pages() {
        let app = TestApp::new();
        let f = fixtures(&app).await;
        let (alice_id, alice) = app.sign_up("alice").await;
        let (_, bob) = app.sign_up("bob").await;
        for n in 0..7 {
            let tag = if n % 2 == 0 { f.lunch } else { f.dinner };
            create(&app, &alice, recipe_body(&format!("Dish {n}"), &[tag], &[(f.flour, 1)])).await;
        }
        create(&app, &bob, recipe_body("Bob's", &[f.lunch], &[(f.flour, 1)])).await;

        let (_, page) = app.json(Method::GET, "/api/recipes/", None, None).await;
        assert_eq!(page["count"], 8);
        assert_eq!(page["results"].as_array().unwrap().len(), 6);
        assert_eq!(page["results"][0]["name"], "Bob's");
        assert_eq!(page["next"], "/api/recipes/?page=2");
        assert!(page["previous"].is_null());

        let uri = format!("/api/recipes/?author={alice_id}&tags=dinner&limit=2");
        let (_, page) = app.json(Method::GET, &uri, None, None).await;
        assert_eq!(page["count"], 3);
        assert_eq!(page["results"].as_array().unwrap().len(), 2);

        let (_, page) = app
            .json(Method::GET, "/api/recipes/?tags=lunch&tags=dinner", None, None)
            .await;
        assert_eq!(page["count"], 8);

        let (_, page) = app
            .json(Method::GET, "/api/recipes/?is_favorited=1", None, None)
            .await;
        assert_eq!(page["count"], 8);

        let (status, _) = app
            .json(Method::GET, "/api/recipes/?page=9", None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, page) = app
            .json(Method::GET, "/api/recipes/?tags=lunch&page=2&limit=2", None, None)
            .await;
        assert_eq!(page["next"], "/api/recipes/?tags=lunch&limit=2&page=3");
        assert_eq!(page["previous"], "/api/recipes/?tags=lunch&limit=2&page=1");

        let (status, _) = app
            .json(Method::GET, "/api/recipes/?page=9223372036854775807", None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
