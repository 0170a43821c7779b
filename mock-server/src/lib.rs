use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const DEFAULT_API_KEY: &str = "api-key";
pub const CURRENT_USER_ID: u64 = 1313;
pub const FRIEND_ID: u64 = 1314;
/// Known to the service but not a friend of the current user.
pub const STRANGER_ID: u64 = 2000;
pub const APARTMENT_GROUP_ID: u64 = 110;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub registration_status: String,
    pub locale: String,
    pub default_currency: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
    pub members: Vec<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Share {
    pub user_id: u64,
    pub paid_share: String,
    pub owed_share: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expense {
    pub id: u64,
    pub group_id: u64,
    pub description: String,
    pub details: String,
    pub cost: String,
    pub currency_code: String,
    pub category_id: u64,
    pub date: String,
    pub users: Vec<Share>,
}

#[derive(Debug)]
pub struct Store {
    api_key: String,
    users: BTreeMap<u64, User>,
    friends: Vec<u64>,
    groups: BTreeMap<u64, Group>,
    expenses: BTreeMap<u64, Expense>,
    next_expense_id: u64,
    next_user_id: u64,
}

impl Store {
    pub fn seeded(api_key: &str) -> Self {
        let user = |id: u64, first: &str, last: &str| User {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            registration_status: "confirmed".to_string(),
            locale: "en".to_string(),
            default_currency: "USD".to_string(),
        };
        let users = [
            user(CURRENT_USER_ID, "John", "Petrucci"),
            user(FRIEND_ID, "Jane", "Doe"),
            user(STRANGER_ID, "Ada", "Lovelace"),
        ]
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
        let groups = [
            Group {
                id: 0,
                name: "Non-group expenses".to_string(),
                members: vec![CURRENT_USER_ID, FRIEND_ID],
            },
            Group {
                id: APARTMENT_GROUP_ID,
                name: "Apartment".to_string(),
                members: vec![CURRENT_USER_ID, FRIEND_ID],
            },
        ]
        .into_iter()
        .map(|g| (g.id, g))
        .collect();
        Self {
            api_key: api_key.to_string(),
            users,
            friends: vec![FRIEND_ID],
            groups,
            expenses: BTreeMap::new(),
            next_expense_id: 51023,
            next_user_id: 3000,
        }
    }

    /// Id of the user with `email`, inviting a new one when nobody has it.
    fn user_for_email(&mut self, email: &str, first_name: &str, last_name: &str) -> u64 {
        if let Some(user) = self.users.values().find(|u| u.email == email) {
            return user.id;
        }
        let id = self.next_user_id;
        self.next_user_id += 1;
        self.users.insert(
            id,
            User {
                id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
                registration_status: "invited".to_string(),
                locale: "en".to_string(),
                default_currency: "USD".to_string(),
            },
        );
        id
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Error response: a status plus a JSON body in the service's loose style.
pub struct Failure(StatusCode, Value);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

type ApiResult = Result<Json<Value>, Failure>;

pub fn app() -> Router {
    app_with_key(DEFAULT_API_KEY)
}

pub fn app_with_key(api_key: &str) -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded(api_key)));
    Router::new()
        .route("/api/v3.0/get_current_user", get(get_current_user))
        .route("/api/v3.0/get_user/{id}", get(get_user))
        .route("/api/v3.0/update_user/{id}", post(update_user))
        .route("/api/v3.0/get_groups", get(get_groups))
        .route("/api/v3.0/get_group/{id}", get(get_group))
        .route("/api/v3.0/get_friends", get(get_friends))
        .route("/api/v3.0/delete_friend/{id}", post(delete_friend))
        .route("/api/v3.0/get_expenses", get(get_expenses))
        .route("/api/v3.0/get_expense/{id}", get(get_expense))
        .route("/api/v3.0/create_expense", post(create_expense))
        .route("/api/v3.0/get_currencies", get(get_currencies))
        .route("/api/v3.0/get_categories", get(get_categories))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_key(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_key(api_key)).await
}

fn authorize(store: &Store, headers: &HeaderMap) -> Result<(), Failure> {
    let expected = format!("Bearer {}", store.api_key);
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(Failure(
            StatusCode::UNAUTHORIZED,
            json!({"error": "Invalid API Request: you are not logged in"}),
        )),
    }
}

fn not_found() -> Failure {
    Failure(
        StatusCode::NOT_FOUND,
        json!({"errors": {"base": ["Invalid API Request: record not found"]}}),
    )
}

fn forbidden() -> Failure {
    Failure(
        StatusCode::FORBIDDEN,
        json!({"errors": {"base": ["Invalid API Request: you do not have permission to perform that action"]}}),
    )
}

fn bad_field(field: &str, message: &str) -> Failure {
    let mut errors = Map::new();
    errors.insert(field.to_string(), json!([message]));
    Failure(StatusCode::BAD_REQUEST, json!({ "errors": errors }))
}

fn user_json(user: &User) -> Value {
    json!({
        "id": user.id,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "picture": {
            "small": format!("https://example.com/avatar/{}/small.png", user.id),
            "medium": format!("https://example.com/avatar/{}/medium.png", user.id),
            "large": format!("https://example.com/avatar/{}/large.png", user.id)
        },
        "custom_picture": false,
        "email": user.email,
        "registration_status": user.registration_status,
    })
}

fn current_user_json(user: &User) -> Value {
    let mut value = user_json(user);
    if let Value::Object(map) = &mut value {
        map.insert("force_refresh_at".to_string(), Value::Null);
        map.insert("locale".to_string(), json!(user.locale));
        map.insert("country_code".to_string(), json!("FR"));
        map.insert("date_format".to_string(), json!("MM/DD/YYYY"));
        map.insert("default_currency".to_string(), json!(user.default_currency));
        map.insert("default_group_id".to_string(), json!(-1));
        map.insert("notifications_read".to_string(), json!("2021-10-23T07:15:37Z"));
        map.insert("notifications_count".to_string(), json!(0));
        map.insert(
            "notifications".to_string(),
            json!({"added_as_friend": true, "expense_added": false, "bills": true}),
        );
    }
    value
}

fn group_json(store: &Store, group: &Group) -> Value {
    let members: Vec<Value> = group
        .members
        .iter()
        .filter_map(|id| store.users.get(id))
        .map(|user| {
            let mut value = user_json(user);
            if let Value::Object(map) = &mut value {
                map.insert("balance".to_string(), json!([]));
            }
            value
        })
        .collect();
    json!({
        "id": group.id,
        "name": group.name,
        "created_at": "2019-09-08T10:06:05Z",
        "updated_at": "2021-11-25T18:31:14Z",
        "members": members,
        "simplify_by_default": false,
        "original_debts": [],
        "simplified_debts": [],
        "avatar": {"original": null, "small": "https://example.com/group/small.png"},
        "custom_avatar": false
    })
}

fn expense_json(store: &Store, expense: &Expense) -> Value {
    let users: Vec<Value> = expense
        .users
        .iter()
        .map(|share| {
            let user = store.users.get(&share.user_id);
            json!({
                "user": {
                    "id": share.user_id,
                    "first_name": user.map(|u| u.first_name.as_str()),
                    "last_name": user.map(|u| u.last_name.as_str()),
                    "picture": {"medium": "image_url"}
                },
                "user_id": share.user_id,
                "paid_share": share.paid_share,
                "owed_share": share.owed_share,
                "net_balance": format_amount(amount(&share.paid_share) - amount(&share.owed_share)),
            })
        })
        .collect();
    let group_id = (expense.group_id != 0).then_some(expense.group_id);
    json!({
        "id": expense.id,
        "group_id": group_id,
        "description": expense.description,
        "details": expense.details,
        "cost": expense.cost,
        "currency_code": expense.currency_code,
        "category": {"id": expense.category_id, "name": "General"},
        "date": expense.date,
        "repeats": false,
        "repeat_interval": "never",
        "email_reminder": false,
        "email_reminder_in_advance": null,
        "comments_count": 0,
        "payment": false,
        "transaction_confirmed": false,
        "repayments": [],
        "created_at": expense.date,
        "created_by": user_json(&store.users[&CURRENT_USER_ID]),
        "deleted_at": null,
        "users": users,
        "comments": []
    })
}

fn amount(raw: &str) -> f64 {
    raw.parse().unwrap_or(0.0)
}

fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

// --- users ---

async fn get_current_user(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    Ok(Json(json!({"user": current_user_json(&store.users[&CURRENT_USER_ID])})))
}

async fn get_user(State(db): State<Db>, headers: HeaderMap, Path(id): Path<u64>) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let user = store.users.get(&id).ok_or_else(not_found)?;
    if id != CURRENT_USER_ID && !store.friends.contains(&id) {
        return Err(forbidden());
    }
    Ok(Json(json!({"user": user_json(user)})))
}

async fn update_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(fields): Json<Map<String, Value>>,
) -> ApiResult {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    if !store.users.contains_key(&id) {
        return Err(not_found());
    }
    if id != CURRENT_USER_ID {
        return Err(forbidden());
    }
    let user = store.users.get_mut(&id).ok_or_else(not_found)?;
    for (key, value) in fields {
        let Some(value) = value.as_str().map(str::to_string) else {
            return Err(bad_field(&key, "must be a string"));
        };
        match key.as_str() {
            "first_name" => user.first_name = value,
            "last_name" => user.last_name = value,
            "email" => user.email = value,
            "locale" => user.locale = value,
            "default_currency" => user.default_currency = value,
            "password" => {}
            _ => return Err(bad_field(&key, "is not an updatable field")),
        }
    }
    let user = user.clone();
    Ok(Json(json!({"user": current_user_json(&user)})))
}

// --- groups ---

async fn get_groups(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let groups: Vec<Value> = store.groups.values().map(|g| group_json(&store, g)).collect();
    Ok(Json(json!({"groups": groups})))
}

async fn get_group(State(db): State<Db>, headers: HeaderMap, Path(id): Path<u64>) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let group = store.groups.get(&id).ok_or_else(not_found)?;
    Ok(Json(json!({"group": group_json(&store, group)})))
}

// --- friends ---

async fn get_friends(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let friends: Vec<Value> = store
        .friends
        .iter()
        .filter_map(|id| store.users.get(id))
        .map(|user| {
            let mut value = user_json(user);
            if let Value::Object(map) = &mut value {
                map.insert("groups".to_string(), json!([{"group_id": APARTMENT_GROUP_ID, "balance": []}]));
                map.insert("balance".to_string(), json!([]));
                map.insert("updated_at".to_string(), json!("2021-11-25T18:31:14Z"));
            }
            value
        })
        .collect();
    Ok(Json(json!({"friends": friends})))
}

async fn delete_friend(State(db): State<Db>, headers: HeaderMap, Path(id): Path<u64>) -> ApiResult {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    match store.friends.iter().position(|friend| *friend == id) {
        Some(index) => {
            store.friends.remove(index);
            Ok(Json(json!({"success": true, "errors": []})))
        }
        None => Ok(Json(json!({"success": false, "errors": ["not a friend"]}))),
    }
}

// --- expenses ---

async fn get_expenses(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let expenses: Vec<Value> = store.expenses.values().map(|e| expense_json(&store, e)).collect();
    Ok(Json(json!({"expenses": expenses})))
}

async fn get_expense(State(db): State<Db>, headers: HeaderMap, Path(id): Path<u64>) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let expense = store.expenses.get(&id).ok_or_else(not_found)?;
    Ok(Json(json!({"expense": expense_json(&store, expense)})))
}

/// How a submitted share names its participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShareUser {
    Id(u64),
    Email {
        email: String,
        first_name: String,
        last_name: String,
    },
}

#[derive(Clone, Debug)]
pub struct ShareInput {
    pub user: ShareUser,
    pub paid_share: String,
    pub owed_share: String,
}

/// Reads `users__<i>__*` keys for i = 0, 1, ... until an index names nobody.
pub fn parse_shares(body: &Map<String, Value>) -> Result<Vec<ShareInput>, String> {
    let mut shares = Vec::new();
    for i in 0.. {
        let text = |field: &str| {
            body.get(&format!("users__{i}__{field}"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let user = if let Some(user_id) = body.get(&format!("users__{i}__user_id")) {
            let id = user_id
                .as_u64()
                .or_else(|| user_id.as_str().and_then(|s| s.parse().ok()))
                .ok_or_else(|| format!("users__{i}__user_id is not an id"))?;
            ShareUser::Id(id)
        } else if let Some(email) = text("email") {
            ShareUser::Email {
                email,
                first_name: text("first_name").unwrap_or_default(),
                last_name: text("last_name").unwrap_or_default(),
            }
        } else {
            break;
        };
        let required = |field: &str| text(field).ok_or_else(|| format!("users__{i}__{field} is missing"));
        shares.push(ShareInput {
            user,
            paid_share: required("paid_share")?,
            owed_share: required("owed_share")?,
        });
    }
    Ok(shares)
}

fn rejected(message: String) -> Json<Value> {
    Json(json!({"expenses": [], "errors": {"base": [message]}}))
}

async fn create_expense(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult {
    let mut store = db.write().await;
    authorize(&store, &headers)?;

    let text = |key: &str| body.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    let number = |key: &str| body.get(key).and_then(Value::as_u64).unwrap_or_default();
    let cost = text("cost");
    let group_id = number("group_id");
    let split_equally = body.get("split_equally").and_then(Value::as_bool).unwrap_or(false);

    let shares: Vec<Share> = if split_equally {
        let Some(group) = store.groups.get(&group_id).filter(|g| g.id != 0) else {
            return Ok(rejected("split_equally requires a group".to_string()));
        };
        let each = format_amount(amount(&cost) / group.members.len() as f64);
        group
            .members
            .iter()
            .enumerate()
            .map(|(i, id)| Share {
                user_id: *id,
                paid_share: if i == 0 { cost.clone() } else { "0".to_string() },
                owed_share: each.clone(),
            })
            .collect()
    } else {
        let inputs = match parse_shares(&body) {
            Ok(inputs) if inputs.is_empty() => {
                return Ok(rejected("an expense needs shares or split_equally".to_string()))
            }
            Ok(inputs) => inputs,
            Err(message) => return Ok(rejected(message)),
        };

        let paid: f64 = inputs.iter().map(|s| amount(&s.paid_share)).sum();
        let owed: f64 = inputs.iter().map(|s| amount(&s.owed_share)).sum();
        let total = amount(&cost);
        if (paid - total).abs() > 0.005 {
            return Ok(rejected("The total of everyone's paid shares must equal the cost".to_string()));
        }
        if (owed - total).abs() > 0.005 {
            return Ok(rejected("The total of everyone's owed shares must equal the cost".to_string()));
        }
        if let Some(ShareUser::Id(unknown)) = inputs
            .iter()
            .map(|s| &s.user)
            .find(|user| matches!(user, ShareUser::Id(id) if !store.users.contains_key(id)))
        {
            return Ok(rejected(format!("user {unknown} does not exist")));
        }

        inputs
            .into_iter()
            .map(|input| Share {
                user_id: match &input.user {
                    ShareUser::Id(id) => *id,
                    ShareUser::Email {
                        email,
                        first_name,
                        last_name,
                    } => store.user_for_email(email, first_name, last_name),
                },
                paid_share: input.paid_share,
                owed_share: input.owed_share,
            })
            .collect()
    };

    let id = store.next_expense_id;
    store.next_expense_id += 1;
    let date = Some(text("date"))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "2024-01-01T00:00:00Z".to_string());
    let expense = Expense {
        id,
        group_id,
        description: text("description"),
        details: text("details"),
        cost,
        currency_code: text("currency_code"),
        category_id: number("category_id"),
        date,
        users: shares,
    };
    store.expenses.insert(id, expense.clone());
    Ok(Json(json!({"expenses": [expense_json(&store, &expense)], "errors": {}})))
}

// --- reference data ---

async fn get_currencies(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    authorize(&*db.read().await, &headers)?;
    Ok(Json(json!({"currencies": [
        {"currency_code": "USD", "unit": "$"},
        {"currency_code": "EUR", "unit": "€"},
        {"currency_code": "IRR", "unit": "IRR"},
        {"currency_code": "BTC", "unit": "฿"}
    ]})))
}

async fn get_categories(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    authorize(&*db.read().await, &headers)?;
    Ok(Json(json!({"categories": [
        {
            "id": 1,
            "name": "Utilities",
            "icon": "https://example.com/icons/utilities.png",
            "icon_types": {
                "slim": {"small": "https://example.com/slim/small.png", "large": "https://example.com/slim/large.png"},
                "square": {"large": "https://example.com/square/large.png", "xlarge": "https://example.com/square/xlarge.png"}
            },
            "subcategories": [
                {"id": 48, "name": "Cleaning", "icon": "https://example.com/icons/cleaning.png"},
                {"id": 5, "name": "Electricity", "icon": "https://example.com/icons/electricity.png"}
            ]
        },
        {
            "id": 2,
            "name": "Uncategorized",
            "subcategories": [{"id": 15, "name": "General"}]
        }
    ]})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_shares_reads_indexed_keys_in_order() {
        let body: Map<String, Value> = serde_json::from_value(json!({
            "cost": "25",
            "users__0__user_id": 54123,
            "users__0__paid_share": "25",
            "users__0__owed_share": "15",
            "users__1__user_id": "34262",
            "users__1__paid_share": "0",
            "users__1__owed_share": "10"
        }))
        .unwrap();
        let shares = parse_shares(&body).unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].user, ShareUser::Id(54123));
        assert_eq!(shares[1].user, ShareUser::Id(34262));
        assert_eq!(shares[1].owed_share, "10");
    }

    #[test]
    fn parse_shares_reads_invitees_by_email() {
        let body: Map<String, Value> = serde_json::from_value(json!({
            "users__0__email": "ada@example.com",
            "users__0__first_name": "Ada",
            "users__0__last_name": "Lovelace",
            "users__0__paid_share": "0",
            "users__0__owed_share": "10"
        }))
        .unwrap();
        let shares = parse_shares(&body).unwrap();
        assert_eq!(
            shares[0].user,
            ShareUser::Email {
                email: "ada@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
            }
        );
    }

    #[test]
    fn email_resolves_to_existing_or_invited_user() {
        let mut store = Store::seeded("k");
        assert_eq!(store.user_for_email("jane@example.com", "", ""), FRIEND_ID);

        let invited = store.user_for_email("grace@example.com", "Grace", "Hopper");
        assert_eq!(store.users[&invited].registration_status, "invited");
        assert_eq!(store.user_for_email("grace@example.com", "", ""), invited);
    }

    #[test]
    fn parse_shares_stops_at_first_gap() {
        let body: Map<String, Value> = serde_json::from_value(json!({
            "users__0__user_id": 1,
            "users__0__paid_share": "1",
            "users__0__owed_share": "1",
            "users__2__user_id": 3
        }))
        .unwrap();
        assert_eq!(parse_shares(&body).unwrap().len(), 1);
    }

    #[test]
    fn parse_shares_reports_missing_amount() {
        let body: Map<String, Value> =
            serde_json::from_value(json!({"users__0__user_id": 1, "users__0__paid_share": "1"})).unwrap();
        let err = parse_shares(&body).unwrap_err();
        assert!(err.contains("owed_share"));
    }

    #[test]
    fn seeded_store_has_current_user_and_friend() {
        let store = Store::seeded("k");
        assert!(store.users.contains_key(&CURRENT_USER_ID));
        assert_eq!(store.friends, vec![FRIEND_ID]);
        assert_eq!(store.groups[&APARTMENT_GROUP_ID].members.len(), 2);
    }

    #[test]
    fn expense_json_computes_net_balance() {
        let store = Store::seeded("k");
        let expense = Expense {
            id: 1,
            group_id: 0,
            description: "Brunch".to_string(),
            details: String::new(),
            cost: "25".to_string(),
            currency_code: "USD".to_string(),
            category_id: 15,
            date: "2012-05-02T13:00:00Z".to_string(),
            users: vec![Share {
                user_id: CURRENT_USER_ID,
                paid_share: "25".to_string(),
                owed_share: "15".to_string(),
            }],
        };
        let json = expense_json(&store, &expense);
        assert_eq!(json["users"][0]["net_balance"], "10.00");
        assert!(json["group_id"].is_null());
    }
}
