//! Stateless HTTP request builder and response parser for the Splitwise API.
//!
//! # Design
//! `SplitwiseClient` holds only a base URL and an auth provider and carries
//! no mutable state between calls. Each endpoint is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. A `Transport` executes the round-trip in between; see
//! `Splitwise` for the combined form.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::auth::AuthProvider;
use crate::compose::{compose_by_share, validate_shares};
use crate::error::{check_status, ApiError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Category, Currency, CurrentUser, Expense, ExpenseRecord, ExpenseSplitEqually, Friend, Group,
    User, UserShare,
};
use crate::update::UserUpdate;

/// Production address of the service.
pub const SERVER_ADDRESS: &str = "https://secure.splitwise.com";

const API_PREFIX: &str = "/api/v3.0";

/// Request builder and response parser for every Splitwise endpoint.
#[derive(Clone)]
pub struct SplitwiseClient {
    base_url: String,
    auth: Arc<dyn AuthProvider>,
}

impl fmt::Debug for SplitwiseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitwiseClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// Response envelopes. Every payload sits under one named key.

#[derive(Deserialize)]
struct CategoriesEnvelope {
    categories: Vec<Category>,
}

#[derive(Deserialize)]
struct CurrenciesEnvelope {
    currencies: Vec<Currency>,
}

#[derive(Deserialize)]
struct FriendsEnvelope {
    friends: Vec<Friend>,
}

#[derive(Deserialize)]
struct SuccessEnvelope {
    success: bool,
    #[serde(default)]
    errors: Value,
}

#[derive(Deserialize)]
struct GroupsEnvelope {
    groups: Vec<Group>,
}

#[derive(Deserialize)]
struct GroupEnvelope {
    group: Group,
}

#[derive(Deserialize)]
struct UserEnvelope<T> {
    user: T,
}

#[derive(Deserialize)]
struct ExpensesEnvelope {
    expenses: Vec<ExpenseRecord>,
}

#[derive(Deserialize)]
struct ExpenseEnvelope {
    expense: ExpenseRecord,
}

#[derive(Deserialize)]
struct CreatedExpensesEnvelope {
    #[serde(default)]
    expenses: Vec<ExpenseRecord>,
    #[serde(default)]
    errors: Value,
}

impl SplitwiseClient {
    pub fn new(base_url: &str, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// Client for the production service.
    pub fn production(auth: Arc<dyn AuthProvider>) -> Self {
        Self::new(SERVER_ADDRESS, auth)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- categories / currencies ---

    pub fn build_categories(&self) -> Result<HttpRequest, ApiError> {
        self.get("get_categories")
    }

    pub fn parse_categories(&self, response: HttpResponse) -> Result<Vec<Category>, ApiError> {
        decode::<CategoriesEnvelope>(&response).map(|e| e.categories)
    }

    pub fn build_currencies(&self) -> Result<HttpRequest, ApiError> {
        self.get("get_currencies")
    }

    pub fn parse_currencies(&self, response: HttpResponse) -> Result<Vec<Currency>, ApiError> {
        decode::<CurrenciesEnvelope>(&response).map(|e| e.currencies)
    }

    // --- friends ---

    pub fn build_friends(&self) -> Result<HttpRequest, ApiError> {
        self.get("get_friends")
    }

    pub fn parse_friends(&self, response: HttpResponse) -> Result<Vec<Friend>, ApiError> {
        decode::<FriendsEnvelope>(&response).map(|e| e.friends)
    }

    pub fn build_delete_friend(&self, id: u64) -> Result<HttpRequest, ApiError> {
        self.post_empty(&format!("delete_friend/{id}"))
    }

    /// `Ok(false)` only when the service declines without saying why; a
    /// failure that carries `errors` is `Rejected`.
    pub fn parse_delete_friend(&self, response: HttpResponse) -> Result<bool, ApiError> {
        let envelope = decode::<SuccessEnvelope>(&response)?;
        if !envelope.success && has_errors(&envelope.errors) {
            warn!(errors = %envelope.errors, "delete_friend rejected");
            return Err(ApiError::Rejected(envelope.errors));
        }
        Ok(envelope.success)
    }

    // --- groups ---

    pub fn build_groups(&self) -> Result<HttpRequest, ApiError> {
        self.get("get_groups")
    }

    pub fn parse_groups(&self, response: HttpResponse) -> Result<Vec<Group>, ApiError> {
        decode::<GroupsEnvelope>(&response).map(|e| e.groups)
    }

    pub fn build_group_by_id(&self, id: u64) -> Result<HttpRequest, ApiError> {
        self.get(&format!("get_group/{id}"))
    }

    pub fn parse_group_by_id(&self, response: HttpResponse) -> Result<Group, ApiError> {
        decode::<GroupEnvelope>(&response).map(|e| e.group)
    }

    // --- users ---

    pub fn build_current_user(&self) -> Result<HttpRequest, ApiError> {
        self.get("get_current_user")
    }

    pub fn parse_current_user(&self, response: HttpResponse) -> Result<CurrentUser, ApiError> {
        decode::<UserEnvelope<CurrentUser>>(&response).map(|e| e.user)
    }

    pub fn build_user_by_id(&self, id: u64) -> Result<HttpRequest, ApiError> {
        self.get(&format!("get_user/{id}"))
    }

    pub fn parse_user_by_id(&self, response: HttpResponse) -> Result<User, ApiError> {
        decode::<UserEnvelope<User>>(&response).map(|e| e.user)
    }

    pub fn build_update_user(&self, id: u64, update: &UserUpdate) -> Result<HttpRequest, ApiError> {
        self.post_json(&format!("update_user/{id}"), update)
    }

    pub fn parse_update_user(&self, response: HttpResponse) -> Result<CurrentUser, ApiError> {
        decode::<UserEnvelope<CurrentUser>>(&response).map(|e| e.user)
    }

    // --- expenses ---

    pub fn build_expenses(&self) -> Result<HttpRequest, ApiError> {
        self.get("get_expenses")
    }

    pub fn parse_expenses(&self, response: HttpResponse) -> Result<Vec<ExpenseRecord>, ApiError> {
        decode::<ExpensesEnvelope>(&response).map(|e| e.expenses)
    }

    pub fn build_expense_by_id(&self, id: u64) -> Result<HttpRequest, ApiError> {
        self.get(&format!("get_expense/{id}"))
    }

    pub fn parse_expense_by_id(&self, response: HttpResponse) -> Result<ExpenseRecord, ApiError> {
        decode::<ExpenseEnvelope>(&response).map(|e| e.expense)
    }

    pub fn build_create_expense_split_equally(
        &self,
        expense: &ExpenseSplitEqually,
    ) -> Result<HttpRequest, ApiError> {
        self.post_json("create_expense", expense)
    }

    /// Validates `shares`, then encodes them after `expense` as indexed keys.
    pub fn build_create_expense_by_share(
        &self,
        expense: &Expense,
        shares: &[UserShare],
    ) -> Result<HttpRequest, ApiError> {
        validate_shares(shares)?;
        self.post_json("create_expense", &compose_by_share(expense, shares))
    }

    /// A 200 from `create_expense` only means success when `errors` is empty.
    pub fn parse_create_expense(&self, response: HttpResponse) -> Result<Vec<ExpenseRecord>, ApiError> {
        let envelope = decode::<CreatedExpensesEnvelope>(&response)?;
        if has_errors(&envelope.errors) {
            warn!(errors = %envelope.errors, "expense rejected");
            return Err(ApiError::Rejected(envelope.errors));
        }
        Ok(envelope.expenses)
    }

    // --- request plumbing ---

    fn url(&self, endpoint: &str) -> String {
        format!("{}{API_PREFIX}/{endpoint}", self.base_url)
    }

    fn authorization(&self) -> Result<(String, String), ApiError> {
        let token = self.auth.auth().map_err(|e| ApiError::Auth(e.to_string()))?;
        Ok(("authorization".to_string(), format!("Bearer {token}")))
    }

    fn get(&self, endpoint: &str) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            path: self.url(endpoint),
            headers: vec![self.authorization()?],
            body: None,
        })
    }

    fn post_empty(&self, endpoint: &str) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.url(endpoint),
            headers: vec![self.authorization()?],
            body: None,
        })
    }

    fn post_json<T: Serialize + ?Sized>(&self, endpoint: &str, input: &T) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.url(endpoint),
            headers: vec![
                self.authorization()?,
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        })
    }
}

/// Classify the status, then decode the success body.
fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// The service reports `errors` as `{}`, `[]`, or `null` when there are none.
fn has_errors(errors: &Value) -> bool {
    match errors {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
