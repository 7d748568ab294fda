// Copyright 2023 Remi Bernotavicius

//! Tags and ingredients are seeded by the importer and only read through the API. Neither listing
//! is paginated.

use super::error::{ApiError, Result};
use super::pagination::query_param;
use super::views::{IngredientView, TagView};
use super::{AppState, Json};
use crate::database::models::{IngredientId, TagId};
use crate::query;
use axum::extract::{Path, Query, State};

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagView>>> {
    let tags = state.run(|conn| Ok(query::list_tags(conn)?)).await?;
    Ok(Json(tags.into_iter().map(TagView::from).collect()))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<TagId>,
) -> Result<Json<TagView>> {
    let tag = state
        .run(move |conn| Ok(query::get_tag(conn, id)?))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("tag {id}")))?;
    Ok(Json(tag.into()))
}

pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<IngredientView>>> {
    let search: Option<String> = query_param(&pairs, "search")?;
    let ingredients = state
        .run(move |conn| Ok(query::search_ingredients(conn, search.as_deref())?))
        .await?;
    Ok(Json(
        ingredients.into_iter().map(IngredientView::from).collect(),
    ))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<IngredientId>,
) -> Result<Json<IngredientView>> {
    let ingredient = state
        .run(move |conn| Ok(query::get_ingredient(conn, id)?))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("ingredient {id}")))?;
    Ok(Json(ingredient.into()))
}
