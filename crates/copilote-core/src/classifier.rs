use thiserror::Error;
use tracing::{info, warn};

use crate::categories::USER_VALIDATED_SUBCATEGORY;
use crate::db::Database;
use crate::llm::AiCategorizer;
use crate::rules::repositories::{
    GeneralRuleError, GeneralRuleRepository, PersonalRuleError, PersonalRuleRepository,
};
use crate::rules::types::{NewGeneralRule, NewPersonalRule, PersonalRule};
use crate::transactions::{ClassificationMethod, ClassifiedTransaction, Transaction};

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("personal rule lookup failed: {0}")]
    PersonalRules(#[from] PersonalRuleError),
    #[error("general rule lookup failed: {0}")]
    GeneralRules(#[from] GeneralRuleError),
}

/// Three-tier classifier: personal rules, then general rules, then the AI
/// adapter with auto-learning of confident results.
pub struct TransactionClassifier {
    personal_rules: PersonalRuleRepository,
    general_rules: GeneralRuleRepository,
    categorizer: AiCategorizer,
}

impl TransactionClassifier {
    pub fn new(db: Database, categorizer: AiCategorizer) -> Self {
        Self {
            personal_rules: PersonalRuleRepository::new(db.clone()),
            general_rules: GeneralRuleRepository::new(db),
            categorizer,
        }
    }

    /// Classify one transaction for one user. Errs only on rule-store read
    /// failures; an AI failure comes back as a successful review-sentinel
    /// classification.
    pub async fn classify(
        &self,
        transaction: Transaction,
        user_id: i64,
    ) -> Result<ClassifiedTransaction, ClassifyError> {
        let upper_label = transaction.upper_label();

        if let Some(rule) = self.personal_rules.find_match(user_id, &upper_label).await? {
            return Ok(classified(
                transaction,
                rule.clean_label,
                rule.category,
                rule.subcategory,
                ClassificationMethod::RulePersonal,
            ));
        }

        if let Some(rule) = self.general_rules.find_match(&upper_label).await? {
            return Ok(classified(
                transaction,
                rule.clean_label,
                rule.category,
                rule.subcategory,
                ClassificationMethod::RuleGeneral,
            ));
        }

        let analysis = self.categorizer.categorize(&transaction, user_id).await;

        let method = if analysis.needs_review() {
            ClassificationMethod::AiNeedsReview
        } else {
            // Classification already succeeded in memory; a failed learning
            // write must not fail the call.
            let learned = NewGeneralRule {
                keyword: upper_label.clone(),
                clean_label: analysis.clean_label.clone(),
                category: analysis.category.clone(),
                subcategory: analysis.subcategory.clone(),
            };
            match self.general_rules.upsert(learned).await {
                Ok(true) => {
                    info!(keyword = %upper_label, category = %analysis.category, "learned general rule");
                }
                Ok(false) => {
                    // A concurrent miss learned the same keyword first.
                }
                Err(err) => {
                    warn!(error = %err, keyword = %upper_label, "failed to persist learned rule");
                }
            }
            ClassificationMethod::AiAutoLearned
        };

        Ok(classified(
            transaction,
            analysis.clean_label,
            analysis.category,
            analysis.subcategory,
            method,
        ))
    }

    /// Record a user-validated personal rule. Overrides the general rule for
    /// every future transaction whose label contains the keyword.
    pub async fn learn_personal_rule(
        &self,
        user_id: i64,
        keyword: &str,
        category: &str,
    ) -> Result<PersonalRule, PersonalRuleError> {
        let new_rule = NewPersonalRule {
            user_id,
            keyword: keyword.to_uppercase(),
            clean_label: capitalize(keyword),
            category: category.to_string(),
            subcategory: USER_VALIDATED_SUBCATEGORY.to_string(),
        };
        self.personal_rules.upsert(new_rule).await
    }
}

fn classified(
    transaction: Transaction,
    clean_label: String,
    category: String,
    subcategory: String,
    method: ClassificationMethod,
) -> ClassifiedTransaction {
    ClassifiedTransaction {
        transaction,
        clean_label,
        category,
        subcategory,
        method,
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
