use crate::categories::{AI_CATEGORIES, NEEDS_REVIEW};
use crate::llm::types::{ChatMessage, ChatRole};
use crate::transactions::Transaction;

/// Builds the categorization prompt sent to the model.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, transaction: &Transaction) -> Vec<ChatMessage> {
        vec![self.system_message(), self.user_message(transaction)]
    }

    fn system_message(&self) -> ChatMessage {
        let content = [
            "Tu es un expert en finances personnelles.",
            "Ta réponse DOIT commencer par { et finir par }.",
            "Ne réponds RIEN d'autre. Pas de prose, pas de markdown.",
            "SEULEMENT l'objet JSON.",
        ]
        .join("\n");

        ChatMessage {
            role: ChatRole::System,
            content,
        }
    }

    fn user_message(&self, transaction: &Transaction) -> ChatMessage {
        let categories =
            serde_json::to_string(AI_CATEGORIES).unwrap_or_else(|_| "[]".to_string());
        let content = format!(
            "Analyse la transaction : \"{label}\"\n\
             \n\
             Tâches :\n\
             1. Propose un \"libelle_nettoye\" clair (ex: \"Achat Fnac\").\n\
             2. Choisis la \"categorie\" la plus pertinente parmi cette liste : {categories}\n\
             \n\
             Si tu ne peux pas deviner, utilise la catégorie \"{NEEDS_REVIEW}\".",
            label = transaction.label,
        );

        ChatMessage {
            role: ChatRole::User,
            content,
        }
    }
}
