//! Blocking per-resource clients.
//!
//! # Design
//! `Splitwise` pairs a `SplitwiseClient` with a `Transport`. Every method
//! is build, execute, parse: one outbound call, no retries, no caching. The
//! value holds only immutable configuration, so one instance can serve many
//! threads at once. Each resource family is its own trait so callers can
//! depend on (and fake) only what they use.

use std::sync::Arc;

use crate::auth::{ApiKeyAuth, AuthProvider};
use crate::client::SplitwiseClient;
use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::error::ApiError;
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    Category, Currency, CurrentUser, Expense, ExpenseRecord, ExpenseSplitEqually, Friend, Group,
    User, UserShare,
};
use crate::update::UserUpdate;

/// Access to user profiles.
pub trait Users {
    fn current_user(&self, ctx: &CallContext) -> Result<CurrentUser, ApiError>;
    fn user_by_id(&self, ctx: &CallContext, id: u64) -> Result<User, ApiError>;
    fn update_user(&self, ctx: &CallContext, id: u64, update: &UserUpdate) -> Result<CurrentUser, ApiError>;
}

/// Groups of users who share expenses.
pub trait Groups {
    fn groups(&self, ctx: &CallContext) -> Result<Vec<Group>, ApiError>;
    fn group_by_id(&self, ctx: &CallContext, id: u64) -> Result<Group, ApiError>;
}

pub trait Friends {
    fn friends(&self, ctx: &CallContext) -> Result<Vec<Friend>, ApiError>;
    /// Breaks off the friendship with user `id`. A refusal that carries
    /// `errors` is `ApiError::Rejected`.
    fn delete_friend(&self, ctx: &CallContext, id: u64) -> Result<bool, ApiError>;
}

pub trait Expenses {
    fn expenses(&self, ctx: &CallContext) -> Result<Vec<ExpenseRecord>, ApiError>;
    fn expense_by_id(&self, ctx: &CallContext, id: u64) -> Result<ExpenseRecord, ApiError>;
    fn create_expense_split_equally(
        &self,
        ctx: &CallContext,
        expense: &ExpenseSplitEqually,
    ) -> Result<Vec<ExpenseRecord>, ApiError>;
    fn create_expense_by_share(
        &self,
        ctx: &CallContext,
        expense: &Expense,
        shares: &[UserShare],
    ) -> Result<Vec<ExpenseRecord>, ApiError>;
}

pub trait Currencies {
    fn currencies(&self, ctx: &CallContext) -> Result<Vec<Currency>, ApiError>;
}

pub trait Categories {
    fn categories(&self, ctx: &CallContext) -> Result<Vec<Category>, ApiError>;
}

/// Executing client for the whole API.
#[derive(Debug, Clone)]
pub struct Splitwise<T = UreqTransport> {
    client: SplitwiseClient,
    transport: T,
}

impl Splitwise<UreqTransport> {
    /// Production client authenticated with a static API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::from_config(&ClientConfig::new(api_key))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let auth: Arc<dyn AuthProvider> = Arc::new(ApiKeyAuth::new(config.api_key.clone()));
        Self::new(
            SplitwiseClient::new(&config.base_url, auth),
            UreqTransport::with_timeout(config.timeout),
        )
    }
}

impl<T: Transport> Splitwise<T> {
    pub fn new(client: SplitwiseClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &SplitwiseClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Users for Splitwise<T> {
    fn current_user(&self, ctx: &CallContext) -> Result<CurrentUser, ApiError> {
        let response = self.transport.execute(self.client.build_current_user()?, ctx)?;
        self.client.parse_current_user(response)
    }

    fn user_by_id(&self, ctx: &CallContext, id: u64) -> Result<User, ApiError> {
        let response = self.transport.execute(self.client.build_user_by_id(id)?, ctx)?;
        self.client.parse_user_by_id(response)
    }

    fn update_user(&self, ctx: &CallContext, id: u64, update: &UserUpdate) -> Result<CurrentUser, ApiError> {
        let response = self.transport.execute(self.client.build_update_user(id, update)?, ctx)?;
        self.client.parse_update_user(response)
    }
}

impl<T: Transport> Groups for Splitwise<T> {
    fn groups(&self, ctx: &CallContext) -> Result<Vec<Group>, ApiError> {
        let response = self.transport.execute(self.client.build_groups()?, ctx)?;
        self.client.parse_groups(response)
    }

    fn group_by_id(&self, ctx: &CallContext, id: u64) -> Result<Group, ApiError> {
        let response = self.transport.execute(self.client.build_group_by_id(id)?, ctx)?;
        self.client.parse_group_by_id(response)
    }
}

impl<T: Transport> Friends for Splitwise<T> {
    fn friends(&self, ctx: &CallContext) -> Result<Vec<Friend>, ApiError> {
        let response = self.transport.execute(self.client.build_friends()?, ctx)?;
        self.client.parse_friends(response)
    }

    fn delete_friend(&self, ctx: &CallContext, id: u64) -> Result<bool, ApiError> {
        let response = self.transport.execute(self.client.build_delete_friend(id)?, ctx)?;
        self.client.parse_delete_friend(response)
    }
}

impl<T: Transport> Expenses for Splitwise<T> {
    fn expenses(&self, ctx: &CallContext) -> Result<Vec<ExpenseRecord>, ApiError> {
        let response = self.transport.execute(self.client.build_expenses()?, ctx)?;
        self.client.parse_expenses(response)
    }

    fn expense_by_id(&self, ctx: &CallContext, id: u64) -> Result<ExpenseRecord, ApiError> {
        let response = self.transport.execute(self.client.build_expense_by_id(id)?, ctx)?;
        self.client.parse_expense_by_id(response)
    }

    fn create_expense_split_equally(
        &self,
        ctx: &CallContext,
        expense: &ExpenseSplitEqually,
    ) -> Result<Vec<ExpenseRecord>, ApiError> {
        let request = self.client.build_create_expense_split_equally(expense)?;
        let response = self.transport.execute(request, ctx)?;
        self.client.parse_create_expense(response)
    }

    fn create_expense_by_share(
        &self,
        ctx: &CallContext,
        expense: &Expense,
        shares: &[UserShare],
    ) -> Result<Vec<ExpenseRecord>, ApiError> {
        let request = self.client.build_create_expense_by_share(expense, shares)?;
        let response = self.transport.execute(request, ctx)?;
        self.client.parse_create_expense(response)
    }
}

impl<T: Transport> Currencies for Splitwise<T> {
    fn currencies(&self, ctx: &CallContext) -> Result<Vec<Currency>, ApiError> {
        let response = self.transport.execute(self.client.build_currencies()?, ctx)?;
        self.client.parse_currencies(response)
    }
}

impl<T: Transport> Categories for Splitwise<T> {
    fn categories(&self, ctx: &CallContext) -> Result<Vec<Category>, ApiError> {
        let response = self.transport.execute(self.client.build_categories()?, ctx)?;
        self.client.parse_categories(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};
    use std::sync::Mutex;

    /// Serves one canned response and records the request it was given.
    struct CannedTransport {
        response: HttpResponse,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl CannedTransport {
        fn new(status: u16, body: &str) -> Self {
            Self {
                response: HttpResponse::new(status, body),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Transport for CannedTransport {
        fn execute(&self, request: HttpRequest, ctx: &CallContext) -> Result<HttpResponse, ApiError> {
            ctx.check()?;
            self.seen.lock().unwrap().push(request);
            Ok(self.response.clone())
        }
    }

    fn splitwise(status: u16, body: &str) -> Splitwise<CannedTransport> {
        let auth: Arc<dyn AuthProvider> = Arc::new(ApiKeyAuth::new("api-key"));
        Splitwise::new(
            SplitwiseClient::new("http://localhost:3000", auth),
            CannedTransport::new(status, body),
        )
    }

    #[test]
    fn current_user_decodes_identifier() {
        let sw = splitwise(200, r#"{"user":{"id":1313,"first_name":"John","last_name":"Petrucci"}}"#);
        let user = sw.current_user(&CallContext::background()).unwrap();
        assert_eq!(user.id(), 1313);

        let seen = sw.transport().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, HttpMethod::Get);
        assert_eq!(seen[0].header("authorization"), Some("Bearer api-key"));
    }

    #[test]
    fn invalid_token_regardless_of_body() {
        for body in ["", "{}", r#"{"error":"Invalid API Request: you are not logged in"}"#] {
            let sw = splitwise(401, body);
            let err = sw.groups(&CallContext::background()).unwrap_err();
            assert!(matches!(err, ApiError::InvalidToken), "{body:?}");
        }
    }

    #[test]
    fn create_by_share_sends_one_flat_body() {
        let sw = splitwise(200, r#"{"expenses":[{"id":1}],"errors":{}}"#);
        let expense = Expense {
            cost: "10".to_string(),
            ..Expense::default()
        };
        let shares = [UserShare::new(1, "10", "5"), UserShare::new(2, "0", "5")];
        let created = sw
            .create_expense_by_share(&CallContext::background(), &expense, &shares)
            .unwrap();
        assert_eq!(created[0].id, 1);

        let seen = sw.transport().seen.lock().unwrap();
        let body: serde_json::Value = serde_json::from_str(seen[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body.as_object().unwrap().len(), 8 + 6);
    }

    #[test]
    fn invalid_share_fails_before_sending() {
        let sw = splitwise(200, "{}");
        let err = sw
            .create_expense_by_share(
                &CallContext::background(),
                &Expense::default(),
                &[UserShare::new(0, "1", "1")],
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidShare { .. }));
        assert!(sw.transport().seen.lock().unwrap().is_empty());
    }

    #[test]
    fn cancelled_call_fails_promptly() {
        let sw = splitwise(200, r#"{"currencies":[]}"#);
        let ctx = CallContext::background();
        ctx.cancel_handle().cancel();
        let err = sw.currencies(&ctx).unwrap_err();
        assert!(matches!(err, ApiError::Cancelled));
    }

    #[test]
    fn client_is_shareable_across_threads() {
        let sw = Arc::new(splitwise(200, r#"{"categories":[{"id":1,"name":"Utilities"}]}"#));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sw = Arc::clone(&sw);
                std::thread::spawn(move || sw.categories(&CallContext::background()).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap()[0].name, "Utilities");
        }
        assert_eq!(sw.transport().seen.lock().unwrap().len(), 4);
    }
}
