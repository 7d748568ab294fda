// Copyright 2023 Remi Bernotavicius

use super::error::ApiError;
use crate::config::MAX_PAGE_SIZE;
use crate::query::Page;
use axum::http::Uri;
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Query pairs with `page` and `limit` pulled out and parsed.
#[derive(Debug, Default)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageRequest {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        Ok(Self {
            page: query_param(pairs, "page")?,
            limit: query_param(pairs, "limit")?,
        })
    }

    pub fn page(&self, default_size: i64) -> Result<Page, ApiError> {
        let number = self.page.unwrap_or(1);
        if number < 1 {
            return Err(ApiError::not_found("page"));
        }
        let size = self.limit.unwrap_or(default_size);
        if size < 1 {
            return Err(ApiError::Validation("limit must be a positive integer".into()));
        }
        let size = size.min(MAX_PAGE_SIZE);
        if (number - 1).checked_mul(size).is_none() {
            return Err(ApiError::NotFound("invalid page".into()));
        }
        Ok(Page { number, size })
    }
}

/// The last value given for `key`, parsed.
pub fn query_param<T: std::str::FromStr>(
    pairs: &[(String, String)],
    key: &str,
) -> Result<Option<T>, ApiError> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, value)| {
            value
                .parse()
                .map_err(|_| ApiError::Validation(format!("invalid value {value:?} for {key}")))
        })
        .transpose()
}

fn page_link(uri: &Uri, number: i64) -> String {
    let mut query: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("page="))
        .map(str::to_owned)
        .collect();
    query.push(format!("page={number}"));
    format!("{}?{}", uri.path(), query.join("&"))
}

impl<T> Paginated<T> {
    /// Asking for a page past the end is an error, except for page 1 of an empty listing.
    pub fn new(uri: &Uri, page: Page, count: i64, results: Vec<T>) -> Result<Self, ApiError> {
        let last = ((count + page.size - 1) / page.size).max(1);
        if page.number > last {
            return Err(ApiError::NotFound("invalid page".into()));
        }
        Ok(Self {
            count,
            next: (page.number < last).then(|| page_link(uri, page.number + 1)),
            previous: (page.number > 1).then(|| page_link(uri, page.number - 1)),
            results,
        })
    }
}

#[test]
fn links() {
    let uri: Uri = "/api/recipes/?tags=lunch&page=2&limit=2".parse().unwrap();
    let page = Page { number: 2, size: 2 };
    let paginated = Paginated::new(&uri, page, 5, vec![(), ()]).unwrap();
    assert_eq!(
        paginated.next.as_deref(),
        Some("/api/recipes/?tags=lunch&limit=2&page=3")
    );
    assert_eq!(
        paginated.previous.as_deref(),
        Some("/api/recipes/?tags=lunch&limit=2&page=1")
    );

    let last = Paginated::new(&uri, Page { number: 3, size: 2 }, 5, vec![()]).unwrap();
    assert!(last.next.is_none());
    assert!(Paginated::new(&uri, Page { number: 4, size: 2 }, 5, Vec::<()>::new()).is_err());
}

#[test]
fn empty_listing_has_one_page() {
    let uri: Uri = "/api/users/".parse().unwrap();
    let paginated = Paginated::<()>::new(&uri, Page { number: 1, size: 6 }, 0, vec![]).unwrap();
    assert_eq!(paginated.count, 0);
    assert!(paginated.next.is_none() && paginated.previous.is_none());
}

#[test]
fn page_request() {
    let pairs = vec![
        ("page".to_owned(), "3".to_owned()),
        ("limit".to_owned(), "1000".to_owned()),
        ("tags".to_owned(), "lunch".to_owned()),
    ];
    let request = PageRequest::from_pairs(&pairs).unwrap();
    assert_eq!(
        request.page(6).unwrap(),
        Page {
            number: 3,
            size: MAX_PAGE_SIZE
        }
    );
    assert_eq!(
        PageRequest::default().page(6).unwrap(),
        Page { number: 1, size: 6 }
    );
    assert!(PageRequest::from_pairs(&[("page".into(), "x".into())]).is_err());

    let huge = PageRequest {
        page: Some(i64::MAX),
        limit: None,
    };
    assert!(matches!(huge.page(6), Err(ApiError::NotFound(_))));
    let largest = PageRequest {
        page: Some(i64::MAX / MAX_PAGE_SIZE),
        limit: Some(MAX_PAGE_SIZE),
    };
    assert!(largest.page(6).is_ok());
}

#[test]
fn last_value_wins() {
    let pairs = vec![
        ("recipes_limit".to_owned(), "1".to_owned()),
        ("recipes_limit".to_owned(), "3".to_owned()),
    ];
    assert_eq!(query_param::<i64>(&pairs, "recipes_limit").unwrap(), Some(3));
    assert_eq!(query_param::<i64>(&pairs, "page").unwrap(), None);
}
