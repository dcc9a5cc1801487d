use super::EntitlementService;
use util::ResultExt;

impl EntitlementService {
    /// Takes one credit from the club. Returns false when the club has no credits left, has no
    /// plan, or the store can't be reached.
    pub async fn consume_credit(&self, club_id: &str) -> bool {
        if club_id.is_empty() {
            log::warn!("refusing to consume a credit without a club id");
            return false;
        }
        let Some(db) = self.db.as_ref() else {
            log::warn!("no database connection; can't consume a credit for club {club_id}");
            return false;
        };

        let consumed = db
            .consume_club_credit(club_id)
            .await
            .warn_on_err()
            .unwrap_or(false);
        log::debug!("consume credit for club {club_id}: {consumed}");
        consumed
    }

    /// Adds `amount` credits to the club. Non-positive amounts are rejected; corrections that
    /// take credits away go through [`EntitlementService::consume_credit`].
    pub async fn grant_credits(&self, club_id: &str, amount: i32) -> bool {
        if amount <= 0 {
            log::warn!("refusing to grant {amount} credits to club {club_id}");
            return false;
        }
        if club_id.is_empty() {
            log::warn!("refusing to grant credits without a club id");
            return false;
        }
        let Some(db) = self.db.as_ref() else {
            log::warn!("no database connection; can't grant credits to club {club_id}");
            return false;
        };

        let granted = db
            .grant_club_credits(club_id, amount)
            .await
            .warn_on_err()
            .unwrap_or(false);
        log::debug!("grant {amount} credits to club {club_id}: {granted}");
        granted
    }
}
