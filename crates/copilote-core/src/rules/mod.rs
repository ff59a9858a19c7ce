pub mod repositories;
pub mod types;

pub use repositories::{
    GeneralRuleError, GeneralRuleRepository, PersonalRuleError, PersonalRuleRepository,
};
pub use types::{GeneralRule, NewGeneralRule, NewPersonalRule, PersonalRule};
