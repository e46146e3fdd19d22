//! Bonus ledger rules: redemption eligibility and referral codes.
//!
//! Bonus is funded only by referrals and converts into balance in fixed
//! chunks of `redeem_amount` once it reaches the threshold. The storage layer
//! applies this rule to the bonus it reads under the user's row lock, so this
//! module is the single definition of the rule and of the error it produces.

use crate::error::{TaskError, TaskResult};
use crate::settings::PlatformSettings;

/// Length of generated referral codes.
pub const REFERRAL_CODE_LEN: usize = 8;

/// Amount a user with `bonus` may redeem right now under the fixed-chunk policy.
pub fn redeemable_amount(bonus: i64, settings: &PlatformSettings) -> TaskResult<i64> {
    if bonus < settings.redeem_floor() {
        return Err(TaskError::ThresholdNotMet {
            bonus,
            threshold: settings.redeem_floor(),
        });
    }
    Ok(settings.redeem_amount)
}

/// Fresh referral code: uppercase hex from a v4 UUID.
pub fn generate_referral_code() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    raw[..REFERRAL_CODE_LEN].to_ascii_uppercase()
}

/// Canonical form of a user-supplied referral code, or None if blank.
pub fn clean_referral_code(code: Option<&str>) -> Option<String> {
    code.map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| !c.is_empty())
}
