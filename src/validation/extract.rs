use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Json, Query, Request};
use axum::http::request::Parts;
use axum::http::Uri;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::form_urlencoded;
use validator::Validate;

use super::{check, offending_key, validate, SchemaError};
use crate::error::ApiError;

/// JSON body decoded into `T` and checked against its rules.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(raw) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| SchemaError::single(None, "invalid_json", rejection.body_text()))?;
        Ok(ValidatedJson(validate(raw)?))
    }
}

/// Query string decoded into `T` (strings coerced to numbers, dates, ids and
/// enums) and checked against its rules.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = match Query::<T>::try_from_uri(&parts.uri) {
            Ok(Query(value)) => value,
            Err(rejection) => {
                let text = rejection.body_text();
                let field = query_field::<T>(parts.uri.query().unwrap_or_default(), &text);
                return Err(SchemaError::single(field, "invalid_query", text).into());
            }
        };
        check(&value)?;
        Ok(ValidatedQuery(value))
    }
}

/// Finds the query parameter behind a rejection by decoding without each one in turn.
fn query_field<T: DeserializeOwned>(query: &str, error: &str) -> Option<String> {
    let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes()).into_owned().collect();
    let mut keys: Vec<&str> = Vec::new();
    for (key, _) in &pairs {
        if !keys.contains(&key.as_str()) {
            keys.push(key.as_str());
        }
    }
    offending_key(keys, error, |skip| {
        let rest = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter().filter(|(key, _)| key != skip))
            .finish();
        let uri: Uri = format!("/?{}", rest).parse().ok()?;
        Query::<T>::try_from_uri(&uri).err().map(|rejection| rejection.body_text())
    })
}
