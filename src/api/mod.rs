use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::api::input_types::SortInput;
use crate::application::ServerData;
use crate::infrastructure::server_impl::request::Request;
use crate::infrastructure::server_impl::server::Outcome;
use crate::AnyResult;

pub mod input_types;

/// GET /headers, echoes the request's own header block back as json.
pub fn request_headers(_data: &ServerData, req: &Request<'_>) -> AnyResult<Outcome> {
    let headers = serde_json::to_value(&req.headers)?;
    Ok(Outcome::Found(headers))
}

/// GET /movies/{title}, looks the title up in the movie database.
pub fn movie_by_title(data: &ServerData, req: &Request<'_>) -> AnyResult<Outcome> {
    let title = req.resource.split('/').next_back().unwrap_or_default();

    match data.movies.find_by_title(title)? {
        Some(row) => Ok(Outcome::Found(Value::Object(row))),
        None => Ok(Outcome::NoResult),
    }
}

/// POST /sort, answers the body's `input` numbers in ascending order.
/// A blank body of any shape sorts to an empty list.
pub fn sort_numbers(_data: &ServerData, req: &Request<'_>) -> AnyResult<Outcome> {
    let Some(body) = req.body.as_ref().filter(|body| !is_falsy(body)) else {
        return Ok(Outcome::Found(Value::Array(Vec::new())));
    };

    let SortInput { mut input } = serde_json::from_value(body.clone())?;
    input.sort_by(compare_numbers);

    let sorted = input.into_iter().map(Value::Number).collect();
    Ok(Outcome::Found(Value::Array(sorted)))
}

/// Integers compare exactly, the f64 key alone would collapse values
/// past 2^53.
fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    match (exact_int(a), exact_int(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a
            .as_f64()
            .unwrap_or_default()
            .total_cmp(&b.as_f64().unwrap_or_default()),
    }
}

fn exact_int(number: &Number) -> Option<i128> {
    number
        .as_i64()
        .map(i128::from)
        .or_else(|| number.as_u64().map(i128::from))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
    }
}
