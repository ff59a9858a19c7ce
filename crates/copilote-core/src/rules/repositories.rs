use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Row, params};
use thiserror::Error;

use crate::db::{Database, DbError};

use super::types::{GeneralRule, NewGeneralRule, NewPersonalRule, PersonalRule};

const GENERAL_RULE_COLUMNS: &str =
    "id, keyword, clean_label, category, subcategory, created_at, updated_at";
const PERSONAL_RULE_COLUMNS: &str =
    "id, user_id, keyword, clean_label, category, subcategory, created_at, updated_at";

#[derive(Debug, Error)]
pub enum GeneralRuleError {
    #[error("database error: {0}")]
    Database(#[from] DbError),
    #[error("sql error: {0}")]
    Sql(#[from] libsql::Error),
    #[error("datetime parse error: {0}")]
    DateTimeParse(#[from] chrono::ParseError),
}

#[derive(Debug, Error)]
pub enum PersonalRuleError {
    #[error("database error: {0}")]
    Database(#[from] DbError),
    #[error("sql error: {0}")]
    Sql(#[from] libsql::Error),
    #[error("datetime parse error: {0}")]
    DateTimeParse(#[from] chrono::ParseError),
    #[error("upsert returned no row for user {user_id} keyword {keyword}")]
    UpsertFailed { user_id: i64, keyword: String },
}

#[derive(Clone)]
pub struct GeneralRuleRepository {
    db: Database,
}

impl GeneralRuleRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new shared rule. Returns false when the keyword already has
    /// a rule: general rules are append-only and the first writer wins.
    pub async fn upsert(&self, new_rule: NewGeneralRule) -> Result<bool, GeneralRuleError> {
        let now = now_rfc3339();
        let keyword = new_rule.keyword.to_uppercase();
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                "INSERT INTO general_rules (keyword, clean_label, category, subcategory, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT (keyword) DO NOTHING
                 RETURNING id",
                params![
                    keyword,
                    new_rule.clean_label,
                    new_rule.category,
                    new_rule.subcategory,
                    now
                ],
            )
            .await?;

        Ok(rows.next().await?.is_some())
    }

    /// Lowest-id rule whose keyword is contained in `upper_label`.
    pub async fn find_match(
        &self,
        upper_label: &str,
    ) -> Result<Option<GeneralRule>, GeneralRuleError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {GENERAL_RULE_COLUMNS}
                     FROM general_rules
                     WHERE instr(?1, keyword) > 0
                     ORDER BY id
                     LIMIT 1"
                ),
                params![upper_label],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_general_rule(row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_keyword(
        &self,
        keyword: &str,
    ) -> Result<Option<GeneralRule>, GeneralRuleError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {GENERAL_RULE_COLUMNS}
                     FROM general_rules
                     WHERE keyword = ?1"
                ),
                params![keyword.to_uppercase()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_general_rule(row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<GeneralRule>, GeneralRuleError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {GENERAL_RULE_COLUMNS}
                     FROM general_rules
                     ORDER BY id"
                ),
                (),
            )
            .await?;

        let mut rules = Vec::new();
        while let Some(row) = rows.next().await? {
            rules.push(row_to_general_rule(row)?);
        }
        Ok(rules)
    }
}

#[derive(Clone)]
pub struct PersonalRuleRepository {
    db: Database,
}

impl PersonalRuleRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or replace the rule for `(user_id, keyword)` in one atomic
    /// statement; the latest write wins.
    pub async fn upsert(
        &self,
        new_rule: NewPersonalRule,
    ) -> Result<PersonalRule, PersonalRuleError> {
        let now = now_rfc3339();
        let keyword = new_rule.keyword.to_uppercase();
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!(
                    "INSERT INTO personal_rules (user_id, keyword, clean_label, category, subcategory, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                     ON CONFLICT (user_id, keyword) DO UPDATE SET
                         clean_label = excluded.clean_label,
                         category = excluded.category,
                         subcategory = excluded.subcategory,
                         updated_at = excluded.updated_at
                     RETURNING {PERSONAL_RULE_COLUMNS}"
                ),
                params![
                    new_rule.user_id,
                    keyword.as_str(),
                    new_rule.clean_label,
                    new_rule.category,
                    new_rule.subcategory,
                    now
                ],
            )
            .await?;

        match rows.next().await? {
            Some(row) => row_to_personal_rule(row),
            None => Err(PersonalRuleError::UpsertFailed {
                user_id: new_rule.user_id,
                keyword,
            }),
        }
    }

    /// Lowest-id rule of `user_id` whose keyword is contained in
    /// `upper_label`.
    pub async fn find_match(
        &self,
        user_id: i64,
        upper_label: &str,
    ) -> Result<Option<PersonalRule>, PersonalRuleError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {PERSONAL_RULE_COLUMNS}
                     FROM personal_rules
                     WHERE user_id = ?1 AND instr(?2, keyword) > 0
                     ORDER BY id
                     LIMIT 1"
                ),
                params![user_id, upper_label],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_personal_rule(row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<PersonalRule>, PersonalRuleError> {
        let conn = self.db.connection().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {PERSONAL_RULE_COLUMNS}
                     FROM personal_rules
                     WHERE user_id = ?1
                     ORDER BY id"
                ),
                params![user_id],
            )
            .await?;

        let mut rules = Vec::new();
        while let Some(row) = rows.next().await? {
            rules.push(row_to_personal_rule(row)?);
        }
        Ok(rules)
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn row_to_general_rule(row: Row) -> Result<GeneralRule, GeneralRuleError> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(GeneralRule {
        id: row.get(0)?,
        keyword: row.get(1)?,
        clean_label: row.get(2)?,
        category: row.get(3)?,
        subcategory: row.get(4)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn row_to_personal_rule(row: Row) -> Result<PersonalRule, PersonalRuleError> {
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(PersonalRule {
        id: row.get(0)?,
        user_id: row.get(1)?,
        keyword: row.get(2)?,
        clean_label: row.get(3)?,
        category: row.get(4)?,
        subcategory: row.get(5)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use tempfile::TempDir;

    async fn setup_db() -> (Database, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let db_path = dir.path().join("db.sqlite");
        let db = Database::new(&db_path).await.expect("create db");
        run_migrations(&db).await.expect("migrations");
        (db, dir)
    }

    fn sample_general(keyword: &str, category: &str) -> NewGeneralRule {
        NewGeneralRule {
            keyword: keyword.into(),
            clean_label: "Achat Fnac".into(),
            category: category.into(),
            subcategory: "Analysé par IA".into(),
        }
    }

    fn sample_personal(user_id: i64, keyword: &str, category: &str) -> NewPersonalRule {
        NewPersonalRule {
            user_id,
            keyword: keyword.into(),
            clean_label: "Fnac".into(),
            category: category.into(),
            subcategory: "Validé (Utilisateur)".into(),
        }
    }

    #[tokio::test]
    async fn general_upsert_is_append_only() {
        let (db, _dir) = setup_db().await;
        let repo = GeneralRuleRepository::new(db);

        let inserted = repo
            .upsert(sample_general("FNAC", "Shopping"))
            .await
            .expect("first upsert");
        assert!(inserted);

        let second = repo
            .upsert(sample_general("FNAC", "Sorties"))
            .await
            .expect("second upsert");
        assert!(!second, "duplicate keyword should be a no-op");

        let rule = repo
            .get_by_keyword("FNAC")
            .await
            .expect("fetch")
            .expect("rule exists");
        assert_eq!(rule.category, "Shopping", "first writer wins");
    }

    #[tokio::test]
    async fn general_upsert_uppercases_keyword() {
        let (db, _dir) = setup_db().await;
        let repo = GeneralRuleRepository::new(db);

        repo.upsert(sample_general("fnac darty", "Shopping"))
            .await
            .expect("upsert");

        let rule = repo
            .get_by_keyword("fnac darty")
            .await
            .expect("fetch")
            .expect("rule exists");
        assert_eq!(rule.keyword, "FNAC DARTY");
    }

    #[tokio::test]
    async fn general_find_match_uses_substring_containment() {
        let (db, _dir) = setup_db().await;
        let repo = GeneralRuleRepository::new(db);

        // Seeded base rule: AXA -> Charges Fixes.
        let matched = repo
            .find_match("PRLV SEPA AXA ASSURANCES IARD")
            .await
            .expect("find")
            .expect("match");
        assert_eq!(matched.keyword, "AXA");
        assert_eq!(matched.category, "Charges Fixes");

        let miss = repo
            .find_match("CB BOULANGERIE DU COIN")
            .await
            .expect("find");
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn general_find_match_prefers_lowest_id() {
        let (db, _dir) = setup_db().await;
        let repo = GeneralRuleRepository::new(db);

        repo.upsert(sample_general("FNAC", "Shopping"))
            .await
            .expect("first rule");
        repo.upsert(sample_general("FNAC PARIS", "Sorties"))
            .await
            .expect("second rule");

        // Both keywords are contained in the label; the older rule wins.
        let matched = repo
            .find_match("CB FNAC PARIS 75")
            .await
            .expect("find")
            .expect("match");
        assert_eq!(matched.keyword, "FNAC");
        assert_eq!(matched.category, "Shopping");
    }

    #[tokio::test]
    async fn general_list_all_includes_seeded_rules_in_id_order() {
        let (db, _dir) = setup_db().await;
        let repo = GeneralRuleRepository::new(db);

        let rules = repo.list_all().await.expect("list");
        assert_eq!(rules.len(), 8);
        assert!(rules.windows(2).all(|pair| pair[0].id < pair[1].id));
        assert!(rules.iter().any(|rule| rule.keyword == "NETFLIX"));
    }

    #[tokio::test]
    async fn personal_upsert_replaces_existing_rule() {
        let (db, _dir) = setup_db().await;
        let repo = PersonalRuleRepository::new(db);

        let created = repo
            .upsert(sample_personal(7, "FNAC", "Shopping"))
            .await
            .expect("create");

        let mut replacement = sample_personal(7, "FNAC", "Sorties");
        replacement.clean_label = "Fnac Spectacles".into();
        let updated = repo.upsert(replacement).await.expect("update");

        assert_eq!(updated.id, created.id, "same row is updated in place");
        assert_eq!(updated.category, "Sorties");
        assert_eq!(updated.clean_label, "Fnac Spectacles");

        let rules = repo.list_for_user(7).await.expect("list");
        assert_eq!(rules.len(), 1, "no duplicate keyword rows for the user");
    }

    #[tokio::test]
    async fn personal_rules_are_scoped_per_user() {
        let (db, _dir) = setup_db().await;
        let repo = PersonalRuleRepository::new(db);

        repo.upsert(sample_personal(1, "FNAC", "Shopping"))
            .await
            .expect("user 1 rule");
        repo.upsert(sample_personal(2, "FNAC", "Sorties"))
            .await
            .expect("user 2 rule");

        let user1 = repo
            .find_match(1, "CB FNAC PARIS")
            .await
            .expect("find")
            .expect("match");
        assert_eq!(user1.category, "Shopping");

        let user2 = repo
            .find_match(2, "CB FNAC PARIS")
            .await
            .expect("find")
            .expect("match");
        assert_eq!(user2.category, "Sorties");

        let user3 = repo.find_match(3, "CB FNAC PARIS").await.expect("find");
        assert!(user3.is_none());
    }

    #[tokio::test]
    async fn personal_find_match_prefers_lowest_id() {
        let (db, _dir) = setup_db().await;
        let repo = PersonalRuleRepository::new(db);

        repo.upsert(sample_personal(1, "CARTE", "Autres"))
            .await
            .expect("first");
        repo.upsert(sample_personal(1, "CARTE FNAC", "Shopping"))
            .await
            .expect("second");

        let matched = repo
            .find_match(1, "CARTE FNAC 1234")
            .await
            .expect("find")
            .expect("match");
        assert_eq!(matched.keyword, "CARTE");
    }
}
