pub mod compiler;
pub mod store;
mod sync;

pub use compiler::{
    compile_rules, normalize_site, CompiledRuleSet, NetworkRule, ResourceType, RULES_PER_SITE,
};
pub use store::{JsonRuleStore, RuleStore, RuleUpdate};
pub use sync::sync_rules;
