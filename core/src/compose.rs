//! Flat request body for by-share expenses.
//!
//! # Design
//! The service expects each participant as top-level keys indexed by
//! position: `users__<i>__user_id` (or `users__<i>__email`,
//! `users__<i>__first_name` and `users__<i>__last_name` for someone without a
//! known id), then `users__<i>__paid_share` and `users__<i>__owed_share`. The
//! number of keys therefore depends on the share list, so instead of a fixed
//! struct the payload is written straight into one JSON map: the base
//! `Expense` fields first, then every share's keys in list order. Shares are
//! never sorted or deduplicated.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::ApiError;
use crate::types::{Expense, Participant, UserShare};

/// Base expense plus its indexed participant shares, encoded as one flat
/// JSON object.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ExpenseByShare<'a> {
    #[serde(flatten)]
    expense: &'a Expense,
    #[serde(flatten)]
    shares: IndexedShares<'a>,
}

impl<'a> ExpenseByShare<'a> {
    pub fn expense(&self) -> &'a Expense {
        self.expense
    }

    pub fn shares(&self) -> &'a [UserShare] {
        self.shares.0
    }
}

#[derive(Debug, Clone, Copy)]
struct IndexedShares<'a>(&'a [UserShare]);

impl Serialize for IndexedShares<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (i, share) in self.0.iter().enumerate() {
            match &share.participant {
                Participant::Id { user_id } => {
                    map.serialize_entry(&share_key(i, "user_id"), user_id)?;
                }
                Participant::Invitee {
                    email,
                    first_name,
                    last_name,
                } => {
                    map.serialize_entry(&share_key(i, "email"), email)?;
                    map.serialize_entry(&share_key(i, "first_name"), first_name)?;
                    map.serialize_entry(&share_key(i, "last_name"), last_name)?;
                }
            }
            map.serialize_entry(&share_key(i, "paid_share"), &share.paid_share)?;
            map.serialize_entry(&share_key(i, "owed_share"), &share.owed_share)?;
        }
        map.end()
    }
}

/// Wire key for field `field` of the share at `index`.
pub fn share_key(index: usize, field: &str) -> String {
    format!("users__{index}__{field}")
}

/// Pair `expense` with `shares` for encoding. Pure; never fails.
pub fn compose_by_share<'a>(expense: &'a Expense, shares: &'a [UserShare]) -> ExpenseByShare<'a> {
    ExpenseByShare {
        expense,
        shares: IndexedShares(shares),
    }
}

/// Reject shares that do not identify their participant.
///
/// A share needs a non-zero user id, or a non-blank email when it names an
/// invitee. Amounts are left to the service, and duplicate participants are
/// passed through untouched.
pub fn validate_shares(shares: &[UserShare]) -> Result<(), ApiError> {
    for (index, share) in shares.iter().enumerate() {
        let reason = match &share.participant {
            Participant::Id { user_id: 0 } => "user_id must be non-zero",
            Participant::Invitee { email, .. } if email.trim().is_empty() => "email must not be blank",
            _ => continue,
        };
        return Err(ApiError::InvalidShare {
            index,
            reason: reason.to_string(),
        });
    }
    Ok(())
}
