//! Domain DTOs for the Splitwise API.
//!
//! # Design
//! Response types mirror the service's JSON but tolerate its gaps: fields the
//! service may omit or send as `null` are `Option` or `#[serde(default)]`.
//! They are defined independently from the mock-server crate; integration
//! tests catch schema drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Request records
// ---------------------------------------------------------------------------

/// Base fields of an expense to create.
///
/// Every field is always serialized, empty or not, so the key set of an
/// encoded expense is fixed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Expense {
    pub cost: String,
    pub description: String,
    pub details: String,
    pub date: String,
    pub repeat_interval: String,
    pub currency_code: String,
    pub category_id: u64,
    pub group_id: u64,
}

/// How a by-share expense names one participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Participant {
    /// A user the service already knows.
    Id { user_id: u64 },
    /// Someone named by email; the service matches an existing account or
    /// invites a new one.
    Invitee {
        email: String,
        first_name: String,
        last_name: String,
    },
}

/// One participant's part of a by-share expense.
///
/// Amounts are sent verbatim. The service requires the paid shares and the
/// owed shares to each add up to the expense cost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserShare {
    #[serde(flatten)]
    pub participant: Participant,
    pub paid_share: String,
    pub owed_share: String,
}

impl UserShare {
    pub fn new(user_id: u64, paid_share: impl Into<String>, owed_share: impl Into<String>) -> Self {
        Self {
            participant: Participant::Id { user_id },
            paid_share: paid_share.into(),
            owed_share: owed_share.into(),
        }
    }

    /// Share for someone without a known user id.
    pub fn invite(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        paid_share: impl Into<String>,
        owed_share: impl Into<String>,
    ) -> Self {
        Self {
            participant: Participant::Invitee {
                email: email.into(),
                first_name: first_name.into(),
                last_name: last_name.into(),
            },
            paid_share: paid_share.into(),
            owed_share: owed_share.into(),
        }
    }

    pub fn user_id(&self) -> Option<u64> {
        match self.participant {
            Participant::Id { user_id } => Some(user_id),
            Participant::Invitee { .. } => None,
        }
    }
}

/// Expense split equally among the members of `expense.group_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpenseSplitEqually {
    #[serde(flatten)]
    pub expense: Expense,
    pub split_equally: bool,
}

impl ExpenseSplitEqually {
    pub fn new(expense: Expense) -> Self {
        Self {
            expense,
            split_equally: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

/// Image URLs at the sizes the service publishes. Each resource uses a subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImageLinks {
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
    pub xlarge: Option<String>,
    pub xxlarge: Option<String>,
    pub original: Option<String>,
}

/// An amount in one currency.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Balance {
    pub currency_code: String,
    pub amount: String,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Public profile of a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub picture: ImageLinks,
    #[serde(default)]
    pub custom_picture: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub registration_status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationSettings {
    pub added_as_friend: bool,
    pub added_to_group: bool,
    pub expense_added: bool,
    pub expense_updated: bool,
    pub bills: bool,
    pub payments: bool,
    pub monthly_summary: bool,
    pub announcements: bool,
}

/// The authenticated user, with account settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CurrentUser {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub force_refresh_at: Option<Value>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default)]
    pub default_currency: Option<String>,
    #[serde(default)]
    pub default_group_id: Option<i64>,
    #[serde(default)]
    pub notifications_read: Option<String>,
    #[serde(default)]
    pub notifications_count: u32,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl CurrentUser {
    pub fn id(&self) -> u64 {
        self.user.id
    }
}

// ---------------------------------------------------------------------------
// Friends
// ---------------------------------------------------------------------------

/// Balance with a friend inside one group.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendGroupBalance {
    pub group_id: u64,
    #[serde(default)]
    pub balance: Vec<Balance>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Friend {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub groups: Vec<FriendGroupBalance>,
    #[serde(default)]
    pub balance: Vec<Balance>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMember {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub balance: Vec<Balance>,
}

/// Amount `from` owes `to` inside a group.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Debt {
    pub currency_code: String,
    pub from: u64,
    pub to: u64,
    pub amount: String,
}

/// A collection of users who share expenses. Id 0 is the implicit
/// "non-group expenses" group.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Group {
    pub id: u64,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub members: Vec<GroupMember>,
    pub simplify_by_default: bool,
    pub original_debts: Vec<Debt>,
    pub simplified_debts: Vec<Debt>,
    pub avatar: ImageLinks,
    pub tall_avatar: ImageLinks,
    pub custom_avatar: bool,
    pub cover_photo: ImageLinks,
}

// ---------------------------------------------------------------------------
// Expenses
// ---------------------------------------------------------------------------

/// Minimal user reference embedded in expense records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserRef {
    pub id: u64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub registration_status: Option<String>,
    pub picture: ImageLinks,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repayment {
    pub from: u64,
    pub to: u64,
    pub amount: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// A participant's part of a stored expense.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExpenseShare {
    pub user: UserRef,
    pub user_id: u64,
    pub paid_share: String,
    pub owed_share: String,
    pub net_balance: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Comment {
    pub id: u64,
    pub content: String,
    pub comment_type: String,
    pub relation_type: String,
    pub relation_id: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub user: Option<UserRef>,
}

/// An expense as stored by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExpenseRecord {
    pub id: u64,
    pub group_id: Option<u64>,
    pub friendship_id: Option<u64>,
    pub expense_bundle_id: Option<u64>,
    pub description: String,
    pub details: Option<String>,
    pub cost: String,
    pub currency_code: String,
    pub date: Option<DateTime<Utc>>,
    pub repeats: bool,
    pub repeat_interval: Option<String>,
    pub email_reminder: bool,
    pub email_reminder_in_advance: Option<i32>,
    pub next_repeat: Option<String>,
    pub comments_count: u32,
    pub payment: bool,
    pub transaction_confirmed: bool,
    pub repayments: Vec<Repayment>,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserRef>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<UserRef>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<UserRef>,
    pub category: Option<CategoryRef>,
    pub receipt: ImageLinks,
    pub users: Vec<ExpenseShare>,
    pub comments: Vec<Comment>,
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IconTypes {
    pub slim: ImageLinks,
    pub square: ImageLinks,
    pub transparent: ImageLinks,
}

/// Expense category. Expenses must use a subcategory, never a parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub icon_types: IconTypes,
    #[serde(default)]
    pub subcategories: Vec<Category>,
}

/// A currency the service accepts, mostly ISO 4217 codes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Currency {
    pub currency_code: String,
    pub unit: String,
}
